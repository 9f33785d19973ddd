use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use tokio::sync::{oneshot, RwLock};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Engine, StoreError, WalCommand};

impl Engine {
    /// Register a resource. Listings are edited outside the scheduler; this is
    /// how their policy and publication state reach the store.
    pub async fn create_resource(&self, resource: Resource) -> Result<(), StoreError> {
        if let Some(ref t) = resource.title
            && t.len() > MAX_TITLE_LEN
        {
            return Err(StoreError::LimitExceeded("resource title too long"));
        }

        let _gate = self.compact_gate.read().await;
        let id = resource.id;
        // Claim the id with a write-locked state so readers wait for the log
        // append; a losing concurrent create sees the claim and stops.
        let rs = Arc::new(RwLock::new(ResourceState::new(resource.clone())));
        let claim = rs.clone().write_owned().await;
        match self.state.entry(id) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(rs);
            }
        }

        let event = Event::ResourceCreated { resource };
        if let Err(e) = self.wal_append(&event).await {
            self.state.remove(&id);
            return Err(e);
        }
        drop(claim);
        tracing::info!("registered resource {id}");
        Ok(())
    }

    pub async fn update_resource(
        &self,
        id: Ulid,
        title: Option<String>,
        booking_policy: BookingPolicy,
        publication_state: PublicationState,
    ) -> Result<Resource, StoreError> {
        if let Some(ref t) = title
            && t.len() > MAX_TITLE_LEN
        {
            return Err(StoreError::LimitExceeded("resource title too long"));
        }
        let mut guard = self.resource_write(&id).await?;
        let event = Event::ResourceUpdated {
            id,
            title,
            booking_policy,
            publication_state,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(guard.resource.clone())
    }

    /// Insert a booking, enforcing the exclusion constraint that no two
    /// approved bookings of a resource overlap.
    pub(super) async fn create_booking_record(&self, booking: Booking) -> Result<Booking, StoreError> {
        if self.booking_to_resource.contains_key(&booking.id) {
            return Err(StoreError::AlreadyExists(booking.id));
        }
        let mut guard = self.resource_write(&booking.resource_id).await?;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_RESOURCE {
            return Err(StoreError::LimitExceeded("too many bookings on resource"));
        }
        if booking.status == BookingStatus::Approved {
            check_exclusion(&guard, &booking.span, booking.id)?;
        }

        let event = Event::BookingCreated { booking: booking.clone() };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(booking)
    }

    pub(super) async fn set_booking_status(
        &self,
        booking_id: Ulid,
        status: BookingStatus,
        at: Ms,
    ) -> Result<Booking, StoreError> {
        let mut guard = self.resolve_booking_write(&booking_id).await?;
        let current = guard
            .booking(booking_id)
            .ok_or(StoreError::NotFound(booking_id))?;
        let resource_id = current.resource_id;
        if status == BookingStatus::Approved && current.status != BookingStatus::Approved {
            let span = current.span;
            check_exclusion(&guard, &span, booking_id)?;
        }

        let event = Event::BookingStatusChanged {
            id: booking_id,
            resource_id,
            status,
            at,
        };
        self.persist_and_apply(&mut guard, &event).await?;
        guard
            .booking(booking_id)
            .cloned()
            .ok_or(StoreError::NotFound(booking_id))
    }

    pub(super) async fn add_waitlist_entry(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, StoreError> {
        let mut guard = self.resource_write(&entry.resource_id).await?;
        if let Some(existing) = guard.waitlist.iter().find(|e| e.user_id == entry.user_id) {
            return Err(StoreError::AlreadyExists(existing.id));
        }
        if guard.waitlist.len() >= MAX_WAITLIST_PER_RESOURCE {
            return Err(StoreError::LimitExceeded("waitlist full"));
        }
        let event = Event::WaitlistJoined { entry: entry.clone() };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(entry)
    }

    pub(super) async fn drop_waitlist_entry(
        &self,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<WaitlistEntry, StoreError> {
        let mut guard = self.resource_write(&resource_id).await?;
        let entry = guard
            .waitlist
            .iter()
            .find(|e| e.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound(user_id))?;
        let event = Event::WaitlistLeft { id: entry.id, resource_id };
        self.persist_and_apply(&mut guard, &event).await?;
        Ok(entry)
    }

    pub(super) async fn set_waitlist_notice(
        &self,
        resource_id: Ulid,
        ids: Vec<Ulid>,
        notice: WaitlistNotice,
    ) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut guard = self.resource_write(&resource_id).await?;
        let event = Event::WaitlistFlagged { ids, resource_id, notice };
        self.persist_and_apply(&mut guard, &event).await
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate the current state.
    pub async fn compact_wal(&self) -> Result<(), StoreError> {
        // Exclusive gate: no append can land between the snapshot and the swap.
        let _gate = self.compact_gate.write().await;
        let mut events = Vec::new();
        let resource_ids: Vec<Ulid> = self.state.iter().map(|e| *e.key()).collect();
        for id in resource_ids {
            let Some(rs) = self.shared_state(&id) else { continue };
            let guard = rs.read().await;
            events.push(Event::ResourceCreated {
                resource: guard.resource.clone(),
            });
            // Bookings are snapshotted with their current status and timestamps.
            events.extend(
                guard
                    .bookings
                    .iter()
                    .map(|b| Event::BookingCreated { booking: b.clone() }),
            );
            events.extend(
                guard
                    .waitlist
                    .iter()
                    .map(|e| Event::WaitlistJoined { entry: e.clone() }),
            );
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| StoreError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

fn check_exclusion(rs: &ResourceState, span: &Span, self_id: Ulid) -> Result<(), StoreError> {
    match rs
        .overlapping(span)
        .find(|b| b.id != self_id && b.status == BookingStatus::Approved)
    {
        Some(other) => Err(StoreError::Conflict(other.id)),
        None => Ok(()),
    }
}
