use tracing::{info, warn};
use ulid::Ulid;

use crate::engine::{BookingStore, StoreError};
use crate::model::*;
use crate::observability;

use super::conflict::validate_span;
use super::{Scheduler, SchedulerError};

impl Scheduler {
    /// Put a user on a resource's waitlist, optionally for a preferred window.
    pub async fn join_waitlist<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
        user_id: Ulid,
        preferred: Option<Span>,
    ) -> Result<WaitlistEntry, SchedulerError> {
        if let Some(span) = &preferred {
            validate_span(span, None)?;
        }
        let _txn = store.lock_resource(resource_id).await?;
        if store
            .list_waitlist(resource_id)
            .await?
            .iter()
            .any(|e| e.user_id == user_id)
        {
            return Err(SchedulerError::AlreadyWaitlisted(user_id));
        }

        let entry = WaitlistEntry {
            id: Ulid::new(),
            resource_id,
            user_id,
            preferred,
            created_at: self.now(),
            notice: WaitlistNotice::Waiting,
        };
        match store.insert_waitlist_entry(entry).await {
            Ok(entry) => Ok(entry),
            Err(StoreError::AlreadyExists(_)) => Err(SchedulerError::AlreadyWaitlisted(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn leave_waitlist<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<WaitlistEntry, SchedulerError> {
        let _txn = store.lock_resource(resource_id).await?;
        Ok(store.remove_waitlist_entry(resource_id, user_id).await?)
    }

    /// Waitlist of a resource, earliest joiner first. Ties keep store order.
    pub async fn waitlist<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
    ) -> Result<Vec<WaitlistEntry>, SchedulerError> {
        let mut entries = store.list_waitlist(resource_id).await?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Mark waiting entries whose preferred window has ended as expired.
    /// Returns how many entries were flagged.
    pub async fn expire_waitlist<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
    ) -> Result<usize, SchedulerError> {
        let now = self.now();
        let _txn = store.lock_resource(resource_id).await?;
        let stale: Vec<Ulid> = store
            .list_waitlist(resource_id)
            .await?
            .iter()
            .filter(|e| e.notice == WaitlistNotice::Waiting && e.preferred.is_some_and(|p| p.end <= now))
            .map(|e| e.id)
            .collect();
        let count = stale.len();
        store
            .flag_waitlist(resource_id, stale, WaitlistNotice::Expired)
            .await?;
        Ok(count)
    }

    /// Flag waiting entries interested in a slot that `freed` just released.
    /// Runs after the transition has committed, so a failure here is logged
    /// rather than unwinding the cancellation.
    pub(super) async fn flag_freed_slot<S: BookingStore>(&self, store: &S, freed: &Booking) {
        let resource_id = freed.resource_id;
        let result = async {
            let ids: Vec<Ulid> = store
                .list_waitlist(resource_id)
                .await?
                .iter()
                .filter(|e| e.wants(&freed.span))
                .map(|e| e.id)
                .collect();
            let count = ids.len();
            store
                .flag_waitlist(resource_id, ids, WaitlistNotice::Notified)
                .await?;
            Ok::<_, StoreError>(count)
        }
        .await;

        match result {
            Ok(0) => {}
            Ok(n) => {
                info!("slot freed by {} flagged {n} waitlist entries on {resource_id}", freed.id);
                metrics::counter!(observability::WAITLIST_NOTIFIED_TOTAL).increment(n as u64);
            }
            Err(e) => warn!("failed to flag waitlist for {resource_id} after {}: {e}", freed.id),
        }
    }
}
