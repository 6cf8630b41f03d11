//! Asset names
//!
//! An asset name as configured or commanded may carry two prefixes ahead of
//! the logical name:
//!
//! ```text
//! *RB:Alarm
//! │└┬┘ └─── logical name
//! │ └────── colour tag, LED colour letters ended by ':'
//! └──────── force refresh marker
//! ```
//!
//! Both prefixes are stripped before the name is used for the cache key, the
//! remote URL or the local path.

use alloc::format;
use alloc::string::String;
use heapless::Vec;
use smart_leds::RGB8;

/// Longest colour tag, in letters
pub const MAX_TAG: usize = 8;

/// Force refresh marker
pub const FORCE_MARKER: char = '*';

/// Colour sequence decoded from a tag
///
/// One colour is a steady target; several are cycled as a blink pattern.
pub type ColourSequence = Vec<RGB8, MAX_TAG>;

/// Map a colour letter to a colour
///
/// Lower case is the same hue at half intensity.
pub fn colour(letter: char) -> Option<RGB8> {
    let full = match letter.to_ascii_uppercase() {
        'K' => RGB8::new(0, 0, 0),
        'R' => RGB8::new(255, 0, 0),
        'G' => RGB8::new(0, 255, 0),
        'B' => RGB8::new(0, 0, 255),
        'C' => RGB8::new(0, 255, 255),
        'M' => RGB8::new(255, 0, 255),
        'Y' => RGB8::new(255, 255, 0),
        'W' => RGB8::new(255, 255, 255),
        'O' => RGB8::new(255, 128, 0),
        _ => return None,
    };
    if letter.is_ascii_lowercase() {
        Some(RGB8::new(full.r / 2, full.g / 2, full.b / 2))
    } else {
        Some(full)
    }
}

/// Decode a string of colour letters
///
/// Returns `None` if the string is empty, too long, or holds anything that
/// is not a colour letter.
pub fn colours(letters: &str) -> Option<ColourSequence> {
    if letters.is_empty() {
        return None;
    }
    let mut seq = ColourSequence::new();
    for letter in letters.chars() {
        seq.push(colour(letter)?).ok()?;
    }
    Some(seq)
}

/// A single steady colour
pub fn solid(letter: char) -> ColourSequence {
    let mut seq = ColourSequence::new();
    // Capacity is at least one
    let _ = seq.push(colour(letter).unwrap_or_default());
    seq
}

/// An asset name split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetName<'a> {
    /// Logical name with prefixes removed
    pub name: &'a str,
    /// Colour tag letters, without the `:`
    pub tag: Option<&'a str>,
    /// Skip the freshness horizon and the conditional hint
    pub force: bool,
}

impl<'a> AssetName<'a> {
    /// Split `raw` into marker, tag and logical name
    pub fn parse(raw: &'a str) -> Self {
        let (force, rest) = match raw.strip_prefix(FORCE_MARKER) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if let Some((tag, name)) = rest.split_once(':') {
            if colours(tag).is_some() {
                return Self {
                    name,
                    tag: Some(tag),
                    force,
                };
            }
        }

        Self {
            name: rest,
            tag: None,
            force,
        }
    }

    /// Whether there is a name left after stripping the prefixes
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// LED colours from the tag
    pub fn colours(&self) -> Option<ColourSequence> {
        self.tag.and_then(colours)
    }

    /// Remote location: `<base>/<name>.<ext>`
    pub fn url(&self, base: &str, ext: &str) -> String {
        format!("{}/{}.{}", base.trim_end_matches('/'), self.name, ext)
    }

    /// Local store path: `<mount>/<sanitized trailing segment>.<ext>`
    pub fn local_path(&self, mount: &str, ext: &str) -> String {
        let segment = self.name.rsplit('/').next().unwrap_or("");
        format!(
            "{}/{}.{}",
            mount.trim_end_matches('/'),
            sanitize(segment),
            ext
        )
    }
}

/// Make a path segment safe for the local store
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`; an empty segment becomes
/// `_`.
pub fn sanitize(segment: &str) -> String {
    if segment.is_empty() {
        return String::from("_");
    }
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let asset = AssetName::parse("Example");
        assert_eq!(asset.name, "Example");
        assert_eq!(asset.tag, None);
        assert!(!asset.force);
    }

    #[test]
    fn test_tag_and_marker() {
        let asset = AssetName::parse("*RB:Alarm");
        assert_eq!(asset.name, "Alarm");
        assert_eq!(asset.tag, Some("RB"));
        assert!(asset.force);

        let colours = asset.colours().unwrap();
        assert_eq!(colours.len(), 2);
        assert_eq!(colours[0], RGB8::new(255, 0, 0));
        assert_eq!(colours[1], RGB8::new(0, 0, 255));
    }

    #[test]
    fn test_half_intensity() {
        assert_eq!(colour('g'), Some(RGB8::new(0, 127, 0)));
        assert_eq!(colour('Q'), None);
    }

    #[test]
    fn test_non_colour_prefix_is_part_of_name() {
        let asset = AssetName::parse("Lunch:Break");
        assert_eq!(asset.name, "Lunch:Break");
        assert_eq!(asset.tag, None);

        let asset = AssetName::parse(":Empty");
        assert_eq!(asset.name, ":Empty");
    }

    #[test]
    fn test_url_and_path() {
        let asset = AssetName::parse("G:seasonal/Wait here");
        assert_eq!(
            asset.url("http://art.example/doorbell/", "png"),
            "http://art.example/doorbell/seasonal/Wait here.png"
        );
        assert_eq!(asset.local_path("/assets", "png"), "/assets/Wait_here.png");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a.b-c_D9"), "a.b-c_D9");
        assert_eq!(sanitize("x?y&z"), "x_y_z");
        assert_eq!(sanitize(""), "_");
        assert_eq!(sanitize("é"), "_");
    }

    #[test]
    fn test_marker_only() {
        let asset = AssetName::parse("*");
        assert!(asset.force);
        assert!(asset.is_empty());
    }
}
