//! Uptime and wall clock
//!
//! There is no RTC. The wall clock is learned from the `Date` header of
//! HTTP responses and kept as an offset from uptime.

use embassy_time::Instant;
use portable_atomic::{AtomicI64, Ordering};

use doorbell_core::calendar::days_from_civil;
use doorbell_core::Now;

/// Offset marker for a clock that has never been set
const UNSET: i64 = i64::MIN;

/// Unix time minus uptime, in seconds
static WALL_OFFSET: AtomicI64 = AtomicI64::new(UNSET);

/// Seconds since boot
pub fn uptime() -> u32 {
    Instant::now().as_secs() as u32
}

/// Current uptime and wall clock
pub fn now() -> Now {
    let uptime = uptime();
    let offset = WALL_OFFSET.load(Ordering::Relaxed);
    let wall = (offset != UNSET).then(|| offset + i64::from(uptime));
    Now::new(uptime, wall)
}

/// Set the wall clock to `unix` seconds
pub fn set_wall(unix: i64) {
    WALL_OFFSET.store(unix - i64::from(uptime()), Ordering::Relaxed);
}

/// Parse an IMF-fixdate such as `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn parse_http_date(text: &str) -> Option<i64> {
    let mut fields = text.split_ascii_whitespace().skip(1);
    let day: u8 = fields.next()?.parse().ok()?;
    let month = match fields.next()? {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let year: i32 = fields.next()?.parse().ok()?;

    let mut hms = fields.next()?.split(':');
    let hour: i64 = hms.next()?.parse().ok()?;
    let minute: i64 = hms.next()?.parse().ok()?;
    let second: i64 = hms.next()?.parse().ok()?;
    if fields.next()? != "GMT" || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 60 {
        return None;
    }

    Some(days_from_civil(year, month, day) * 86_400 + hour * 3600 + minute * 60 + second)
}
