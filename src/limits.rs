//! Hard input limits. Everything a caller can control is bounded so a single
//! bad request cannot blow up memory or the WAL.

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PHONE_LEN: usize = 40;
pub const MAX_MATTER_TYPE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_REASON_LEN: usize = 200;

/// Staff bookings may span several slots but never a whole day.
pub const MAX_DURATION_MINUTES: i64 = 240;

/// Civil-time sanity window for booking starts and availability queries.
pub const MIN_VALID_YEAR: i32 = 2000;
pub const MAX_VALID_YEAR: i32 = 2100;

pub const MAX_BOOKINGS: usize = 100_000;
pub const MAX_BLACKOUT_RULES: usize = 10_000;
