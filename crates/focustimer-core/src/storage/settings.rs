//! Timer settings: phase lengths and completion behaviour.
//!
//! Every value is clamped to its documented range on read and on write;
//! out-of-range input is never rejected.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const FOCUS_MINUTES_RANGE: (u32, u32) = (1, 60);
pub const SHORT_BREAK_MINUTES_RANGE: (u32, u32) = (1, 30);
pub const LONG_BREAK_MINUTES_RANGE: (u32, u32) = (1, 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_true")]
    pub auto_start_next: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            auto_start_next: true,
            sound_enabled: true,
            vibration_enabled: true,
        }
    }
}

fn clamp_to(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

impl Settings {
    pub const KEYS: [&'static str; 6] = [
        "focus_minutes",
        "short_break_minutes",
        "long_break_minutes",
        "auto_start_next",
        "sound_enabled",
        "vibration_enabled",
    ];

    /// Copy with every duration pulled into range.
    pub fn clamped(self) -> Self {
        Self {
            focus_minutes: clamp_to(self.focus_minutes.into(), FOCUS_MINUTES_RANGE),
            short_break_minutes: clamp_to(
                self.short_break_minutes.into(),
                SHORT_BREAK_MINUTES_RANGE,
            ),
            long_break_minutes: clamp_to(self.long_break_minutes.into(), LONG_BREAK_MINUTES_RANGE),
            ..self
        }
    }

    pub fn with_focus_minutes(mut self, minutes: i64) -> Self {
        self.focus_minutes = clamp_to(minutes, FOCUS_MINUTES_RANGE);
        self
    }

    pub fn with_short_break_minutes(mut self, minutes: i64) -> Self {
        self.short_break_minutes = clamp_to(minutes, SHORT_BREAK_MINUTES_RANGE);
        self
    }

    pub fn with_long_break_minutes(mut self, minutes: i64) -> Self {
        self.long_break_minutes = clamp_to(minutes, LONG_BREAK_MINUTES_RANGE);
        self
    }

    /// Get a setting as a string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "focus_minutes" => self.focus_minutes.to_string(),
            "short_break_minutes" => self.short_break_minutes.to_string(),
            "long_break_minutes" => self.long_break_minutes.to_string(),
            "auto_start_next" => self.auto_start_next.to_string(),
            "sound_enabled" => self.sound_enabled.to_string(),
            "vibration_enabled" => self.vibration_enabled.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a setting from its string form. Minutes are clamped, never rejected;
    /// only unknown keys and unparseable values are errors.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "focus_minutes" => *self = self.with_focus_minutes(parse_minutes(key, value)?),
            "short_break_minutes" => {
                *self = self.with_short_break_minutes(parse_minutes(key, value)?)
            }
            "long_break_minutes" => {
                *self = self.with_long_break_minutes(parse_minutes(key, value)?)
            }
            "auto_start_next" => self.auto_start_next = parse_bool(key, value)?,
            "sound_enabled" => self.sound_enabled = parse_bool(key, value)?,
            "vibration_enabled" => self.vibration_enabled = parse_bool(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse_minutes(key: &str, value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as minutes"),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "true" | "on" | "1" => Ok(true),
        "false" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{value}' as bool"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.focus_minutes, 25);
        assert_eq!(s.short_break_minutes, 5);
        assert_eq!(s.long_break_minutes, 15);
        assert!(s.auto_start_next);
        assert!(s.sound_enabled);
        assert!(s.vibration_enabled);
    }

    #[test]
    fn clamped_pulls_values_into_range() {
        let s = Settings {
            focus_minutes: 0,
            short_break_minutes: 90,
            long_break_minutes: 61,
            ..Settings::default()
        }
        .clamped();
        assert_eq!(s.focus_minutes, 1);
        assert_eq!(s.short_break_minutes, 30);
        assert_eq!(s.long_break_minutes, 60);
    }

    #[test]
    fn set_clamps_instead_of_rejecting() {
        let mut s = Settings::default();
        s.set("focus_minutes", "500").unwrap();
        assert_eq!(s.focus_minutes, 60);
        s.set("short_break_minutes", "-3").unwrap();
        assert_eq!(s.short_break_minutes, 1);
        s.set("auto_start_next", "false").unwrap();
        assert!(!s.auto_start_next);
    }

    #[test]
    fn set_rejects_unknown_keys_and_garbage() {
        let mut s = Settings::default();
        assert!(matches!(
            s.set("theme", "dark"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(s.set("focus_minutes", "soon").is_err());
        assert!(s.set("sound_enabled", "loud").is_err());
    }

    #[test]
    fn get_covers_every_key() {
        let s = Settings::default();
        for key in Settings::KEYS {
            assert!(s.get(key).is_some(), "missing {key}");
        }
        assert_eq!(s.get("focus_minutes").as_deref(), Some("25"));
        assert!(s.get("nope").is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"focus_minutes": 40}"#).unwrap();
        assert_eq!(s.focus_minutes, 40);
        assert_eq!(s.long_break_minutes, 15);
    }
}
