//! Idle artwork selection
//!
//! The first rule that matches and has artwork configured wins:
//!
//! | rule | artwork |
//! |---|---|
//! | away | `image_away` |
//! | busy | `image_busy` |
//! | full moon | `image_moon` |
//! | Christmas | `image_xmas` |
//! | New Year | `image_year` |
//! | Halloween | `image_hall` |
//! | Easter | `image_east` |
//! | otherwise | `image_idle` |

use alloc::string::String;

use crate::calendar::{is_full_moon, season, Season};
use crate::config::Settings;

/// Remote lamp derived presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Presence {
    pub away: bool,
    pub busy: bool,
}

/// Pick the idle artwork
///
/// `wall` is UTC for the moon, `local` the local time for seasons. Without a
/// clock only presence and the default apply.
pub fn idle_name<'a>(
    settings: &'a Settings,
    presence: Presence,
    wall: Option<i64>,
    local: Option<i64>,
) -> &'a str {
    let configured = |name: &'a String| (!name.is_empty()).then_some(name.as_str());

    if presence.away {
        if let Some(name) = configured(&settings.image_away) {
            return name;
        }
    }
    if presence.busy {
        if let Some(name) = configured(&settings.image_busy) {
            return name;
        }
    }
    if wall.is_some_and(is_full_moon) {
        if let Some(name) = configured(&settings.image_moon) {
            return name;
        }
    }

    let seasonal = match local.and_then(season) {
        Some(Season::Christmas) => configured(&settings.image_xmas),
        Some(Season::NewYear) => configured(&settings.image_year),
        Some(Season::Halloween) => configured(&settings.image_hall),
        Some(Season::Easter) => configured(&settings.image_east),
        None => None,
    };
    seasonal.unwrap_or(&settings.image_idle)
}

/// Active artwork for a presence state
pub fn active_name(settings: &Settings, presence: Presence) -> &str {
    if presence.away {
        &settings.image_away
    } else if presence.busy {
        &settings.image_busy
    } else {
        &settings.image_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::days_from_civil;

    fn at(year: i32, month: u8, day: u8) -> i64 {
        days_from_civil(year, month, day) * 86_400 + 12 * 3600
    }

    fn seasonal() -> Settings {
        Settings {
            image_moon: "Moon".into(),
            image_xmas: "R:Xmas".into(),
            image_year: "Fireworks".into(),
            image_hall: "O:Pumpkin".into(),
            image_east: "Egg".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_without_clock() {
        let settings = seasonal();
        assert_eq!(idle_name(&settings, Presence::default(), None, None), "Example");
    }

    #[test]
    fn test_seasons_select_art() {
        let settings = seasonal();
        let p = Presence::default();
        let xmas = at(2025, 12, 10);
        assert_eq!(idle_name(&settings, p, Some(xmas), Some(xmas)), "R:Xmas");
        let hall = at(2025, 10, 31);
        assert_eq!(idle_name(&settings, p, Some(hall), Some(hall)), "O:Pumpkin");
        let june = at(2025, 6, 20);
        assert_eq!(idle_name(&settings, p, Some(june), Some(june)), "Example");
    }

    #[test]
    fn test_unconfigured_season_falls_through() {
        let settings = Settings::default();
        let xmas = at(2025, 12, 10);
        assert_eq!(
            idle_name(&settings, Presence::default(), Some(xmas), Some(xmas)),
            "Example"
        );
    }

    #[test]
    fn test_presence_beats_season() {
        let settings = seasonal();
        let xmas = at(2025, 12, 10);
        let away = Presence { away: true, busy: true };
        assert_eq!(idle_name(&settings, away, Some(xmas), Some(xmas)), "R:Away");
        let busy = Presence { away: false, busy: true };
        assert_eq!(idle_name(&settings, busy, Some(xmas), Some(xmas)), "Y:Busy");
    }

    #[test]
    fn test_active_name() {
        let settings = Settings::default();
        assert_eq!(active_name(&settings, Presence::default()), "G:Wait");
        assert_eq!(active_name(&settings, Presence { away: true, busy: true }), "R:Away");
        assert_eq!(active_name(&settings, Presence { away: false, busy: true }), "Y:Busy");
    }
}
