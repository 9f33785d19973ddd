mod error;
mod mutations;
mod queries;
mod store;

pub use error::StoreError;
pub use store::BookingStore;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Drain all immediately available Appends (the batch window).
/// 3. Single flush_sync for the whole batch, then answer every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!("booking log flush failed: {e}");
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

/// All-or-nothing: on any error the batch is rolled back out of the file, so
/// no event that was answered with `Err` can come back on replay.
fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event))
        .and_then(|()| wal.flush_sync());
    if result.is_err()
        && let Err(e) = wal.rollback()
    {
        tracing::error!("booking log rollback failed, refusing further writes: {e}");
    }
    result
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// In-memory booking store backed by the append-only booking log.
///
/// Each resource's bookings and waitlist live behind their own `RwLock`;
/// a separate per-resource mutex is the transaction boundary handed out by
/// [`BookingStore::lock_resource`].
pub struct Engine {
    pub(super) state: DashMap<Ulid, SharedResourceState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: booking id → resource id.
    pub(super) booking_to_resource: DashMap<Ulid, Ulid>,
    pub(super) admission_locks: DashMap<Ulid, Arc<Mutex<()>>>,
    /// Writers hold it shared, compaction exclusively. Always taken before
    /// any resource lock.
    pub(super) compact_gate: Arc<RwLock<()>>,
}

/// Write access to one resource, with the compaction gate held shared.
pub(super) struct ResourceWrite {
    _gate: OwnedRwLockReadGuard<()>,
    guard: OwnedRwLockWriteGuard<ResourceState>,
}

impl std::ops::Deref for ResourceWrite {
    type Target = ResourceState;

    fn deref(&self) -> &ResourceState {
        &self.guard
    }
}

impl std::ops::DerefMut for ResourceWrite {
    fn deref_mut(&mut self) -> &mut ResourceState {
        &mut self.guard
    }
}

/// Apply an event to a ResourceState. The caller holds the lock.
fn apply_to_resource(rs: &mut ResourceState, event: &Event, booking_map: &DashMap<Ulid, Ulid>) {
    match event {
        Event::ResourceUpdated {
            title,
            booking_policy,
            publication_state,
            ..
        } => {
            rs.resource.title = title.clone();
            rs.resource.booking_policy = *booking_policy;
            rs.resource.publication_state = *publication_state;
        }
        Event::BookingCreated { booking } => {
            booking_map.insert(booking.id, booking.resource_id);
            rs.insert_booking(booking.clone());
        }
        Event::BookingStatusChanged { id, status, at, .. } => {
            if let Some(b) = rs.booking_mut(*id) {
                b.status = *status;
                b.updated_at = *at;
            }
        }
        Event::WaitlistJoined { entry } => rs.waitlist.push(entry.clone()),
        Event::WaitlistLeft { id, .. } => rs.waitlist.retain(|e| e.id != *id),
        Event::WaitlistFlagged { ids, notice, .. } => {
            for entry in rs.waitlist.iter_mut().filter(|e| ids.contains(&e.id)) {
                entry.notice = *notice;
            }
        }
        // Handled at the DashMap level.
        Event::ResourceCreated { .. } => {}
    }
}

impl Engine {
    /// Replay the booking log at `wal_path` and start the group-commit writer.
    /// Must be called from within a tokio runtime.
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::recover(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            state: DashMap::new(),
            wal_tx,
            booking_to_resource: DashMap::new(),
            admission_locks: DashMap::new(),
            compact_gate: Arc::new(RwLock::new(())),
        };

        // We're the sole owner of these Arcs during replay, so try_write always
        // succeeds. Never block here: this may run inside an async context.
        for event in &events {
            match event {
                Event::ResourceCreated { resource } => {
                    let rs = ResourceState::new(resource.clone());
                    engine.state.insert(resource.id, Arc::new(RwLock::new(rs)));
                }
                other => {
                    if let Some(entry) = engine.state.get(&other.resource_id()) {
                        let rs_arc = entry.clone();
                        let mut guard = rs_arc.try_write().expect("replay: uncontended write");
                        apply_to_resource(&mut guard, other, &engine.booking_to_resource);
                    }
                }
            }
        }
        tracing::debug!(
            "replayed {} events into {} resources",
            events.len(),
            engine.state.len()
        );

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    pub(super) fn shared_state(&self, id: &Ulid) -> Option<SharedResourceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub(super) fn resource_for_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_to_resource.get(booking_id).map(|e| *e.value())
    }

    /// WAL-append then apply. The in-memory state only changes once the event is durable.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut ResourceState,
        event: &Event,
    ) -> Result<(), StoreError> {
        self.wal_append(event).await?;
        apply_to_resource(rs, event, &self.booking_to_resource);
        Ok(())
    }

    /// Lookup booking → resource, then acquire the resource for writing.
    pub(super) async fn resolve_booking_write(&self, booking_id: &Ulid) -> Result<ResourceWrite, StoreError> {
        let resource_id = self
            .resource_for_booking(booking_id)
            .ok_or(StoreError::NotFound(*booking_id))?;
        self.resource_write(&resource_id).await
    }

    pub(super) async fn resource_write(&self, resource_id: &Ulid) -> Result<ResourceWrite, StoreError> {
        let rs = self
            .shared_state(resource_id)
            .ok_or(StoreError::NotFound(*resource_id))?;
        let gate = self.compact_gate.clone().read_owned().await;
        Ok(ResourceWrite {
            _gate: gate,
            guard: rs.write_owned().await,
        })
    }
}
