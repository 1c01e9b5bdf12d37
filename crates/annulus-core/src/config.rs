//! Runtime configuration
//!
//! Only the deployment-specific values live here; the look of the face is the
//! static table in [`crate::style`].

extern crate alloc;

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::time::{MAX_UTC_OFFSET_SECS, WallClock};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    /// Local offset east of UTC, in seconds
    pub utc_offset_secs: i32,
    pub link: LinkConfig<'a>,
}

/// Names used on the link to the paired device
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig<'a> {
    /// Capability advertised by devices able to serve snapshots
    pub capability: &'a str,
    /// Message path of weather refresh requests
    pub weather_path: &'a str,
    /// Message path of calendar refresh requests
    pub calendar_path: &'a str,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            utc_offset_secs: 0,
            link: LinkConfig::default(),
        }
    }
}

impl Default for LinkConfig<'_> {
    fn default() -> Self {
        Self {
            capability: "annulus_weather_data",
            weather_path: "/annulus_weather_data",
            calendar_path: "/annulus_calendar_data",
        }
    }
}

impl<'a> Config<'a> {
    /// Decode a configuration blob, borrowing its strings
    pub fn from_postcard(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(ConfigError::Encode)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_secs.unsigned_abs() >= MAX_UTC_OFFSET_SECS.unsigned_abs() {
            return Err(ConfigError::InvalidUtcOffset {
                seconds: self.utc_offset_secs,
            });
        }
        Ok(())
    }

    pub fn wall_clock(&self) -> WallClock {
        WallClock::from_offset_secs(self.utc_offset_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert_eq!(config.link.weather_path, "/annulus_weather_data");
        assert_eq!(config.link.calendar_path, "/annulus_calendar_data");
        assert_eq!(config.link.capability, "annulus_weather_data");
        assert_eq!(config.wall_clock(), WallClock::utc());
    }

    #[test]
    fn test_postcard_roundtrip_borrows_strings() {
        let config = Config {
            utc_offset_secs: 3600,
            link: LinkConfig {
                capability: "cap",
                weather_path: "/w",
                calendar_path: "/c",
            },
        };
        let bytes = config.to_postcard().unwrap();
        let decoded = Config::from_postcard(&bytes).unwrap();
        assert_eq!(decoded, config);
        assert_eq!(decoded.wall_clock().offset_secs(), 3600);
    }

    #[test]
    fn test_rejects_offset_beyond_a_day() {
        let config = Config {
            utc_offset_secs: -MAX_UTC_OFFSET_SECS,
            ..Default::default()
        };
        let bytes = config.to_postcard().unwrap();
        assert!(matches!(
            Config::from_postcard(&bytes),
            Err(ConfigError::InvalidUtcOffset { seconds }) if seconds == -MAX_UTC_OFFSET_SECS
        ));
    }

    #[test]
    fn test_rejects_most_negative_offset() {
        let config = Config {
            utc_offset_secs: i32::MIN,
            ..Default::default()
        };
        let bytes = config.to_postcard().unwrap();
        assert!(matches!(
            Config::from_postcard(&bytes),
            Err(ConfigError::InvalidUtcOffset { seconds }) if seconds == i32::MIN
        ));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        assert!(matches!(
            Config::from_postcard(&[0xff]),
            Err(ConfigError::Decode(_))
        ));
    }
}
