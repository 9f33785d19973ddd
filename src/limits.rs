use crate::model::Ms;

/// 2000-01-01T00:00:00Z.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2200-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// A single booking may not exceed 31 days.
pub const MAX_SPAN_DURATION_MS: Ms = 31 * 24 * 3_600_000;

pub const MAX_BOOKINGS_PER_RESOURCE: usize = 100_000;
pub const MAX_WAITLIST_PER_RESOURCE: usize = 1_000;
pub const MAX_TITLE_LEN: usize = 256;
