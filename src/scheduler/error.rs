use ulid::Ulid;

use crate::engine::StoreError;
use crate::model::{BookingStatus, PublicationState};

#[derive(Debug)]
pub enum SchedulerError {
    /// Empty, inverted, past or out-of-range interval.
    InvalidInterval(&'static str),
    NotBookable {
        resource_id: Ulid,
        state: PublicationState,
    },
    /// Overlaps the given active booking.
    Conflict(Ulid),
    InvalidTransition {
        id: Ulid,
        from: BookingStatus,
        to: BookingStatus,
    },
    AlreadyWaitlisted(Ulid),
    NotFound(Ulid),
    LimitExceeded(&'static str),
    Store(StoreError),
}

impl std::fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerError::InvalidInterval(why) => write!(f, "invalid interval: {why}"),
            SchedulerError::NotBookable { resource_id, state } => {
                write!(f, "resource {resource_id} is not bookable ({state:?})")
            }
            SchedulerError::Conflict(id) => write!(f, "conflict with booking: {id}"),
            SchedulerError::InvalidTransition { id, from, to } => {
                write!(f, "booking {id} cannot move from {from} to {to}")
            }
            SchedulerError::AlreadyWaitlisted(user_id) => {
                write!(f, "user {user_id} is already on the waitlist")
            }
            SchedulerError::NotFound(id) => write!(f, "not found: {id}"),
            SchedulerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            SchedulerError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchedulerError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SchedulerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(id) => SchedulerError::Conflict(id),
            StoreError::NotFound(id) => SchedulerError::NotFound(id),
            StoreError::LimitExceeded(msg) => SchedulerError::LimitExceeded(msg),
            other => SchedulerError::Store(other),
        }
    }
}
