use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::model::*;

use super::{Engine, StoreError};

/// Storage collaborator the scheduler reads and writes through.
///
/// Handles are passed into every scheduler call; the scheduler keeps nothing
/// between calls. Implementations must make [`lock_resource`](Self::lock_resource)
/// a serializable boundary: while a guard for a resource is alive, no other
/// guard for that resource can be obtained.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Held across a read-check-write cycle; released on drop.
    type Guard: Send;

    async fn lock_resource(&self, resource_id: Ulid) -> Result<Self::Guard, StoreError>;

    async fn get_resource(&self, resource_id: Ulid) -> Result<Resource, StoreError>;

    async fn get_booking(&self, booking_id: Ulid) -> Result<Booking, StoreError>;

    /// Pending and approved bookings of a resource, sorted by start.
    async fn list_active_bookings(&self, resource_id: Ulid) -> Result<Vec<Booking>, StoreError>;

    /// Persist a new booking. May fail with [`StoreError::Conflict`].
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError>;

    /// Persist a status change. Legality is the caller's responsibility.
    async fn update_booking_status(
        &self,
        booking_id: Ulid,
        status: BookingStatus,
        at: Ms,
    ) -> Result<Booking, StoreError>;

    /// Waitlist entries of a resource in join order.
    async fn list_waitlist(&self, resource_id: Ulid) -> Result<Vec<WaitlistEntry>, StoreError>;

    /// At most one entry per (resource, user); a duplicate fails `AlreadyExists`.
    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, StoreError>;

    async fn remove_waitlist_entry(
        &self,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<WaitlistEntry, StoreError>;

    async fn flag_waitlist(
        &self,
        resource_id: Ulid,
        ids: Vec<Ulid>,
        notice: WaitlistNotice,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl BookingStore for Engine {
    type Guard = OwnedMutexGuard<()>;

    async fn lock_resource(&self, resource_id: Ulid) -> Result<Self::Guard, StoreError> {
        if !self.state.contains_key(&resource_id) {
            return Err(StoreError::NotFound(resource_id));
        }
        // Clone the Arc out so no DashMap shard lock is held across the await.
        let lock = self
            .admission_locks
            .entry(resource_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Ok(lock.lock_owned().await)
    }

    async fn get_resource(&self, resource_id: Ulid) -> Result<Resource, StoreError> {
        self.resource(resource_id).await
    }

    async fn get_booking(&self, booking_id: Ulid) -> Result<Booking, StoreError> {
        self.booking(booking_id).await
    }

    async fn list_active_bookings(&self, resource_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        self.active_bookings(resource_id).await
    }

    async fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        self.create_booking_record(booking).await
    }

    async fn update_booking_status(
        &self,
        booking_id: Ulid,
        status: BookingStatus,
        at: Ms,
    ) -> Result<Booking, StoreError> {
        self.set_booking_status(booking_id, status, at).await
    }

    async fn list_waitlist(&self, resource_id: Ulid) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.waitlist(resource_id).await
    }

    async fn insert_waitlist_entry(&self, entry: WaitlistEntry) -> Result<WaitlistEntry, StoreError> {
        self.add_waitlist_entry(entry).await
    }

    async fn remove_waitlist_entry(
        &self,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<WaitlistEntry, StoreError> {
        self.drop_waitlist_entry(resource_id, user_id).await
    }

    async fn flag_waitlist(
        &self,
        resource_id: Ulid,
        ids: Vec<Ulid>,
        notice: WaitlistNotice,
    ) -> Result<(), StoreError> {
        self.set_waitlist_notice(resource_id, ids, notice).await
    }
}
