use ulid::Ulid;

use crate::model::*;

use super::SchedulerError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as Ms)
}

/// Build a span from caller-supplied bounds.
pub(crate) fn checked_span(start: Ms, end: Ms) -> Result<Span, SchedulerError> {
    Span::try_new(start, end).ok_or(SchedulerError::InvalidInterval("start must be before end"))
}

/// Range and duration limits. `not_before` rejects spans starting in the past.
pub(crate) fn validate_span(span: &Span, not_before: Option<Ms>) -> Result<(), SchedulerError> {
    use crate::limits::*;
    if span.start >= span.end {
        return Err(SchedulerError::InvalidInterval("start must be before end"));
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(SchedulerError::InvalidInterval("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(SchedulerError::LimitExceeded("span too wide"));
    }
    if let Some(now) = not_before
        && span.start < now
    {
        return Err(SchedulerError::InvalidInterval("start is in the past"));
    }
    Ok(())
}

/// First booking that blocks `span` under `blocks`, skipping `exclude`.
///
/// `bookings` must be sorted by start; everything from the first booking
/// starting at or after `span.end` onward is skipped.
pub fn find_conflict(
    bookings: &[Booking],
    span: &Span,
    exclude: Option<Ulid>,
    blocks: impl Fn(BookingStatus) -> bool,
) -> Option<Ulid> {
    let right_bound = bookings.partition_point(|b| b.span.start < span.end);
    bookings[..right_bound]
        .iter()
        .filter(|b| Some(b.id) != exclude && blocks(b.status))
        .find(|b| b.span.overlaps(span))
        .map(|b| b.id)
}
