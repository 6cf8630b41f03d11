//! Time and calendar helpers
//!
//! Two clocks are in play. Deadlines are kept in seconds of uptime so they
//! are immune to the wall clock being set or stepped. Idle buckets, seasons
//! and the `If-Modified-Since` hint use the wall clock, which is unknown until
//! the network has set it.

use alloc::format;
use alloc::string::String;

/// Seconds per day
const DAY: i64 = 86_400;

/// A known new moon, 2000-01-06 18:14 UTC
const NEW_MOON_EPOCH: i64 = 947_182_440;

/// Mean synodic month, seconds
const SYNODIC_MONTH: i64 = 2_551_443;

/// Either side of full moon that still counts as full moon
const FULL_MOON_WINDOW: i64 = 12 * 3600;

/// Time sample taken once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Now {
    /// Seconds since boot
    pub uptime: u32,
    /// Unix time, once the clock has been set
    pub wall: Option<i64>,
}

impl Now {
    pub fn new(uptime: u32, wall: Option<i64>) -> Self {
        Self { uptime, wall }
    }

    /// Local time in seconds, applying `offset_minutes`
    pub fn local(&self, offset_minutes: i32) -> Option<i64> {
        self.wall.map(|w| w + i64::from(offset_minutes) * 60)
    }
}

/// Broken-down calendar time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: i32,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Sunday
    pub weekday: u8,
}

impl DateTime {
    /// Break down seconds since 1970-01-01 00:00
    pub fn from_unix(secs: i64) -> Self {
        let days = secs.div_euclid(DAY);
        let rem = secs.rem_euclid(DAY);
        let (year, month, day) = civil_from_days(days);
        Self {
            year,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem / 60 % 60) as u8,
            second: (rem % 60) as u8,
            // 1970-01-01 was a Thursday
            weekday: (days + 4).rem_euclid(7) as u8,
        }
    }

    /// Day of the year, 1 January = 0
    fn ordinal(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day) - days_from_civil(self.year, 1, 1)
    }
}

/// Civil date from days since 1970-01-01 (proleptic Gregorian)
pub fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year as i32, month, day)
}

/// Days since 1970-01-01 for a civil date
pub fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let m = i64::from(month);
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Easter Sunday for `year` as (month, day)
pub fn easter(year: i32) -> (u8, u8) {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    (month as u8, day as u8)
}

/// Whether `unix` is within twelve hours of a full moon
pub fn is_full_moon(unix: i64) -> bool {
    let phase = (unix - NEW_MOON_EPOCH).rem_euclid(SYNODIC_MONTH);
    (phase - SYNODIC_MONTH / 2).abs() <= FULL_MOON_WINDOW
}

/// Seasons with their own idle artwork
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Season {
    /// 1-30 December
    Christmas,
    /// 31 December - 3 January
    NewYear,
    /// 25-31 October
    Halloween,
    /// Good Friday - Easter Monday
    Easter,
}

/// Season for a local time, if any
pub fn season(local: i64) -> Option<Season> {
    let dt = DateTime::from_unix(local);
    match (dt.month, dt.day) {
        (12, 31) | (1, 1..=3) => return Some(Season::NewYear),
        (12, _) => return Some(Season::Christmas),
        (10, 25..=31) => return Some(Season::Halloween),
        _ => {}
    }

    let (month, day) = easter(dt.year);
    let sunday = days_from_civil(dt.year, month, day) - days_from_civil(dt.year, 1, 1);
    if (sunday - 2..=sunday + 1).contains(&dt.ordinal()) {
        return Some(Season::Easter);
    }
    None
}

/// RFC 7231 HTTP-date for a unix time
pub fn http_date(unix: i64) -> String {
    const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let dt = DateTime::from_unix(unix);
    format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        DAYS[dt.weekday as usize],
        dt.day,
        MONTHS[(dt.month - 1) as usize],
        dt.year,
        dt.hour,
        dt.minute,
        dt.second
    )
}

/// `YYYY-MM-DD HH:MM` for the QR stamp
pub fn stamp(local: i64) -> String {
    let dt = DateTime::from_unix(local);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute
    )
}

/// `YYYY-MM-DD HH:MM:SS` for notifications
pub fn timestamp(local: i64) -> String {
    let dt = DateTime::from_unix(local);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
    )
}
