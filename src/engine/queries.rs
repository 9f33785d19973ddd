use ulid::Ulid;

use crate::model::*;

use super::{Engine, SharedResourceState, StoreError};

impl Engine {
    async fn read_state<T>(
        &self,
        resource_id: Ulid,
        f: impl FnOnce(&ResourceState) -> T,
    ) -> Result<T, StoreError> {
        let rs = self
            .shared_state(&resource_id)
            .ok_or(StoreError::NotFound(resource_id))?;
        let guard = rs.read().await;
        Ok(f(&guard))
    }

    /// Clone every resource handle out of the map, so no shard lock is held across awaits.
    fn all_states(&self) -> Vec<SharedResourceState> {
        self.state.iter().map(|e| e.value().clone()).collect()
    }

    pub async fn resource(&self, resource_id: Ulid) -> Result<Resource, StoreError> {
        self.read_state(resource_id, |rs| rs.resource.clone()).await
    }

    pub async fn booking(&self, booking_id: Ulid) -> Result<Booking, StoreError> {
        let resource_id = self
            .resource_for_booking(&booking_id)
            .ok_or(StoreError::NotFound(booking_id))?;
        self.read_state(resource_id, |rs| rs.booking(booking_id).cloned())
            .await?
            .ok_or(StoreError::NotFound(booking_id))
    }

    pub async fn active_bookings(&self, resource_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        self.read_state(resource_id, |rs| rs.active_bookings().cloned().collect())
            .await
    }

    pub async fn waitlist(&self, resource_id: Ulid) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.read_state(resource_id, |rs| rs.waitlist.clone()).await
    }

    /// Every booking of a resource regardless of status, ordered by start.
    pub async fn bookings_for_resource(&self, resource_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        self.read_state(resource_id, |rs| rs.bookings.clone()).await
    }

    /// A requester's bookings across all resources, latest start first.
    pub async fn bookings_for_requester(&self, requester_id: Ulid) -> Vec<Booking> {
        let mut out = Vec::new();
        for rs in self.all_states() {
            let guard = rs.read().await;
            out.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| b.requester_id == requester_id)
                    .cloned(),
            );
        }
        out.sort_by(|a, b| b.span.start.cmp(&a.span.start).then(a.id.cmp(&b.id)));
        out
    }

    /// Pending bookings awaiting a decision, oldest request first.
    pub async fn pending_queue(&self) -> Vec<Booking> {
        let mut out = Vec::new();
        for rs in self.all_states() {
            let guard = rs.read().await;
            out.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| b.status == BookingStatus::Pending)
                    .cloned(),
            );
        }
        out.sort_by_key(|b| (b.created_at, b.id));
        out
    }

    pub async fn list_resources(&self) -> Vec<Resource> {
        let mut out = Vec::with_capacity(self.state.len());
        for rs in self.all_states() {
            out.push(rs.read().await.resource.clone());
        }
        out
    }

    /// Approved bookings whose end has passed, as `(booking_id, resource_id)`.
    pub async fn collect_elapsed_approved(&self, now: Ms) -> Vec<(Ulid, Ulid)> {
        let mut elapsed = Vec::new();
        for rs in self.all_states() {
            let guard = rs.read().await;
            let resource_id = guard.resource.id;
            elapsed.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| b.status == BookingStatus::Approved && b.span.end <= now)
                    .map(|b| (b.id, resource_id)),
            );
        }
        elapsed
    }
}
