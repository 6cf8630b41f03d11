//! Build script for doorbell-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates doorbell.toml at compile time
//! - Checks the network credentials and radio firmware location

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keys holding text
const STRING_KEYS: &[&str] = &[
    "hostname",
    "app_name",
    "image_url",
    "image_ext",
    "mount",
    "image_idle",
    "image_wait",
    "image_busy",
    "image_away",
    "image_moon",
    "image_xmas",
    "image_east",
    "image_year",
    "image_hall",
    "mirror_colours",
    "postcode",
    "toot",
    "tas_bell",
    "tas_away",
    "tas_busy",
    "idle_text",
    "wait_text",
    "upgrade_text",
];

/// Keys holding non-negative integers
const INTEGER_KEYS: &[&str] = &[
    "hold_time",
    "refresh",
    "refetch",
    "retry",
    "leds",
    "led_idle_start",
    "led_idle_end",
    "mirror_secs",
    "panel_width",
    "panel_height",
];

/// Keys holding signed integers
const SIGNED_KEYS: &[&str] = &["utc_offset_minutes"];

const BOOL_KEYS: &[&str] = &["invert"];

const COLOUR_LETTERS: &str = "KRGBCMYWOkrgbcmywo";

/// Build-time environment the firmware embeds
const REQUIRED_ENV: &[&str] = &["WIFI_SSID", "WIFI_PASSWORD", "CYW43_FIRMWARE_DIR"];

fn main() {
    setup_linker();
    validate_config();
    check_environment();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate doorbell.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=doorbell.toml");

    let config_path = Path::new("doorbell.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: doorbell.toml not found!                                 ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds doorbell.toml as its default settings.      ║\n\
            ║  Please create one in the doorbell-firmware directory.           ║\n\
            ║  Every key is optional; an empty file is valid.                  ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read doorbell.toml                             ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Table = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in doorbell.toml                     ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = validate_keys(&config);
    errors.extend(validate_values(&config));

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid settings in doorbell.toml                        ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=doorbell.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every key must be known and of the right type
fn validate_keys(config: &toml::Table) -> Vec<String> {
    let mut errors = Vec::new();

    for (key, value) in config {
        if STRING_KEYS.contains(&key.as_str()) {
            if !value.is_str() {
                errors.push(format!("'{}' must be a string", key));
            }
        } else if INTEGER_KEYS.contains(&key.as_str()) {
            match value.as_integer() {
                Some(n) if (0..=i64::from(u32::MAX)).contains(&n) => {}
                Some(_) => errors.push(format!("'{}' out of range", key)),
                None => errors.push(format!("'{}' must be an integer", key)),
            }
        } else if SIGNED_KEYS.contains(&key.as_str()) {
            if !value.is_integer() {
                errors.push(format!("'{}' must be an integer", key));
            }
        } else if BOOL_KEYS.contains(&key.as_str()) {
            if !value.is_bool() {
                errors.push(format!("'{}' must be true or false", key));
            }
        } else {
            errors.push(format!("unknown key '{}'", key));
        }
    }

    errors
}

/// Cross-field and value checks
fn validate_values(config: &toml::Table) -> Vec<String> {
    let mut errors = Vec::new();
    let int = |key: &str| config.get(key).and_then(|v| v.as_integer());

    if int("hold_time") == Some(0) {
        errors.push("'hold_time' must be at least 1".to_string());
    }

    let leds = int("leds").unwrap_or(24);
    let start = int("led_idle_start").unwrap_or(0);
    let end = int("led_idle_end").unwrap_or(0);
    if start > end || end > leds {
        errors.push("idle LED range must satisfy start <= end <= leds".to_string());
    }

    if let Some(offset) = int("utc_offset_minutes") {
        if !(-14 * 60..=14 * 60).contains(&offset) {
            errors.push("'utc_offset_minutes' must be within +/-14h".to_string());
        }
    }

    if let Some(colours) = config.get("mirror_colours").and_then(|v| v.as_str()) {
        if colours.is_empty() || colours.len() > 8 {
            errors.push("'mirror_colours' must be 1 to 8 letters".to_string());
        } else if !colours.chars().all(|c| COLOUR_LETTERS.contains(c)) {
            errors.push(format!("'mirror_colours' letters must be from {}", COLOUR_LETTERS));
        }
    }

    if let Some(url) = config.get("image_url").and_then(|v| v.as_str()) {
        if !url.is_empty() && !url.starts_with("http://") {
            errors.push("'image_url' must be a plain http:// URL".to_string());
        }
    }

    errors
}

/// Credentials and radio blobs come from the environment
fn check_environment() {
    for key in REQUIRED_ENV {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    let missing: Vec<&str> = REQUIRED_ENV
        .iter()
        .copied()
        .filter(|key| env::var(key).is_err())
        .collect();
    if !missing.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Missing build environment                                ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ║                                                                  ║\n\
            ║  CYW43_FIRMWARE_DIR must hold 43439A0.bin and 43439A0_clm.bin    ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            missing
                .iter()
                .map(|key| format!("║  • {:<62} ║", key))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    if let Ok(dir) = env::var("CYW43_FIRMWARE_DIR") {
        for blob in ["43439A0.bin", "43439A0_clm.bin"] {
            let path = Path::new(&dir).join(blob);
            println!("cargo:rerun-if-changed={}", path.display());
            if !path.exists() {
                panic!("radio firmware blob not found: {}", path.display());
            }
        }
    }
}
