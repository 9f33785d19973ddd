use crate::model::*;

use super::SchedulerError;

/// Gate a status change against the lifecycle table. Completion additionally
/// requires the booking to have ended by `now`.
pub(crate) fn check_transition(booking: &Booking, to: BookingStatus, now: Ms) -> Result<(), SchedulerError> {
    let legal = booking.status.can_transition_to(to)
        && (to != BookingStatus::Completed || booking.span.end <= now);
    if legal {
        Ok(())
    } else {
        Err(SchedulerError::InvalidTransition {
            id: booking.id,
            from: booking.status,
            to,
        })
    }
}
