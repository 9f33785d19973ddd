//! Booking admission and lifecycle decisions.
//!
//! The scheduler owns no booking state. Every operation takes the store
//! handle it should work against and runs one bounded lock-read-check-write
//! cycle scoped to a single resource.

mod conflict;
mod error;
mod transition;
mod waitlist;
#[cfg(test)]
mod tests;

pub use conflict::find_conflict;
pub use error::SchedulerError;

use std::sync::Arc;

use tracing::{debug, info};
use ulid::Ulid;

use crate::engine::BookingStore;
use crate::model::*;
use crate::observability;

use conflict::{checked_span, now_ms, validate_span};
use transition::check_transition;

/// Which bookings hold a slot against new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictScope {
    /// Pending and approved bookings both block. A slot awaiting a decision
    /// cannot be requested twice.
    #[default]
    Active,
    /// Only approved bookings block; overlapping requests may queue up as
    /// pending and are settled at approval time.
    ApprovedOnly,
}

impl ConflictScope {
    pub fn blocks(self, status: BookingStatus) -> bool {
        match self {
            ConflictScope::Active => status.is_active(),
            ConflictScope::ApprovedOnly => status == BookingStatus::Approved,
        }
    }
}

pub type Clock = Arc<dyn Fn() -> Ms + Send + Sync>;

#[derive(Clone)]
pub struct Scheduler {
    scope: ConflictScope,
    clock: Clock,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(ConflictScope::default())
    }
}

impl Scheduler {
    pub fn new(scope: ConflictScope) -> Self {
        Self {
            scope,
            clock: Arc::new(now_ms),
        }
    }

    /// Replace the wall clock, e.g. to drive completion in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> Ms + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn scope(&self) -> ConflictScope {
        self.scope
    }

    /// Current time as seen by this scheduler's clock.
    pub fn now(&self) -> Ms {
        (self.clock)()
    }

    async fn sorted_active<S: BookingStore>(
        store: &S,
        resource_id: Ulid,
    ) -> Result<Vec<Booking>, SchedulerError> {
        let mut bookings = store.list_active_bookings(resource_id).await?;
        bookings.sort_by_key(|b| b.span.start);
        Ok(bookings)
    }

    /// True if `[start, end)` overlaps a blocking booking of the resource.
    /// `exclude` skips one booking, e.g. the one being re-validated.
    pub async fn has_conflict<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
        span: Span,
        exclude: Option<Ulid>,
    ) -> Result<bool, SchedulerError> {
        let active = Self::sorted_active(store, resource_id).await?;
        Ok(find_conflict(&active, &span, exclude, |s| self.scope.blocks(s)).is_some())
    }

    /// Admit a booking request for `[start, end)`.
    ///
    /// Open resources approve on admission; restricted ones queue the booking
    /// as pending. Fails without writing anything if the resource is not
    /// published, the interval is malformed or in the past, or the slot is taken.
    pub async fn create_booking<S: BookingStore>(
        &self,
        store: &S,
        resource_id: Ulid,
        requester_id: Ulid,
        start: Ms,
        end: Ms,
    ) -> Result<Booking, SchedulerError> {
        let now = self.now();
        let span = checked_span(start, end)?;
        validate_span(&span, Some(now))?;

        let _txn = store.lock_resource(resource_id).await?;
        let resource = store.get_resource(resource_id).await?;
        if !resource.is_bookable() {
            return Err(SchedulerError::NotBookable {
                resource_id,
                state: resource.publication_state,
            });
        }

        let active = Self::sorted_active(store, resource_id).await?;
        if let Some(existing) = find_conflict(&active, &span, None, |s| self.scope.blocks(s)) {
            debug!("booking request on {resource_id} [{start}, {end}) conflicts with {existing}");
            metrics::counter!(observability::CONFLICTS_TOTAL, "phase" => "admission").increment(1);
            return Err(SchedulerError::Conflict(existing));
        }

        let status = match resource.booking_policy {
            BookingPolicy::Open => BookingStatus::Approved,
            BookingPolicy::Restricted => BookingStatus::Pending,
        };
        let booking = Booking {
            id: Ulid::new(),
            resource_id,
            requester_id,
            span,
            status,
            created_at: now,
            updated_at: now,
        };
        let booking = store.insert_booking(booking).await.map_err(|e| {
            let e = SchedulerError::from(e);
            if matches!(e, SchedulerError::Conflict(_)) {
                metrics::counter!(observability::CONFLICTS_TOTAL, "phase" => "store").increment(1);
            }
            e
        })?;

        info!("booking {} on {resource_id} admitted as {status}", booking.id);
        metrics::counter!(observability::BOOKINGS_ADMITTED_TOTAL, "status" => status.as_str())
            .increment(1);
        Ok(booking)
    }

    /// Approve a pending booking, re-checking it against approved bookings.
    /// On overlap the booking stays pending for a manual decision.
    pub async fn approve<S: BookingStore>(
        &self,
        store: &S,
        booking_id: Ulid,
    ) -> Result<Booking, SchedulerError> {
        self.transition(store, booking_id, BookingStatus::Approved).await
    }

    pub async fn reject<S: BookingStore>(
        &self,
        store: &S,
        booking_id: Ulid,
    ) -> Result<Booking, SchedulerError> {
        self.transition(store, booking_id, BookingStatus::Rejected).await
    }

    /// Cancel a pending or approved booking. The slot is free as soon as this returns.
    pub async fn cancel<S: BookingStore>(
        &self,
        store: &S,
        booking_id: Ulid,
    ) -> Result<Booking, SchedulerError> {
        self.transition(store, booking_id, BookingStatus::Cancelled).await
    }

    /// Mark an approved booking whose end has passed as completed.
    pub async fn complete<S: BookingStore>(
        &self,
        store: &S,
        booking_id: Ulid,
    ) -> Result<Booking, SchedulerError> {
        self.transition(store, booking_id, BookingStatus::Completed).await
    }

    async fn transition<S: BookingStore>(
        &self,
        store: &S,
        booking_id: Ulid,
        to: BookingStatus,
    ) -> Result<Booking, SchedulerError> {
        let resource_id = store.get_booking(booking_id).await?.resource_id;
        let _txn = store.lock_resource(resource_id).await?;
        // Re-read under the lock; the status may have moved since.
        let booking = store.get_booking(booking_id).await?;
        let now = self.now();
        check_transition(&booking, to, now)?;

        if to == BookingStatus::Approved {
            let active = Self::sorted_active(store, resource_id).await?;
            let approved = |s: BookingStatus| s == BookingStatus::Approved;
            if let Some(other) = find_conflict(&active, &booking.span, Some(booking_id), approved) {
                debug!("approval of {booking_id} blocked by approved booking {other}");
                metrics::counter!(observability::CONFLICTS_TOTAL, "phase" => "approval").increment(1);
                return Err(SchedulerError::Conflict(other));
            }
        }

        let updated = store.update_booking_status(booking_id, to, now).await?;
        info!("booking {booking_id} {} -> {to}", booking.status);
        metrics::counter!(observability::TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);

        if matches!(to, BookingStatus::Cancelled | BookingStatus::Rejected) {
            self.flag_freed_slot(store, &updated).await;
        }
        Ok(updated)
    }
}
