//! Wall clock helper for "current processing time" timestamps.

use time::{OffsetDateTime, PrimitiveDateTime};

/// The current processing time as a naive timestamp.
///
/// Bank alerts carry naive local timestamps, so the rest of the crate works
/// in [PrimitiveDateTime]. Falls back to UTC when the local offset cannot be
/// determined, which happens in multi-threaded processes on some platforms.
pub fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

    PrimitiveDateTime::new(now.date(), now.time())
}
