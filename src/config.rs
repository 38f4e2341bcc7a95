//! Render configuration.
//!
//! [`RenderConfig`] gathers the knobs of the renderer and the terminal app. It is
//! (de)serializable with `serde`; every field falls back to its default when missing, so a
//! configuration file only needs to mention what it changes:
//!
//! ```rust
//! use asciiterm::config::RenderConfig;
//!
//! let config = RenderConfig::from_json_str(r#"{ "target_fps": 30 }"#).unwrap();
//! assert_eq!(config.target_fps, 30);
//! assert_eq!(config.cache_capacity, RenderConfig::default().cache_capacity);
//! ```

use crate::error::ConfigError;
use crate::rendering::cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of glyph bitmaps kept in the image cache.
    pub cache_capacity: usize,
    /// Cached bitmaps not used for this many milliseconds are dropped. `None` keeps them until
    /// evicted by capacity.
    pub cache_expiry_ms: Option<u64>,
    /// Half period of blinking tiles in milliseconds. 0 disables blinking.
    pub blink_interval_ms: u64,
    pub target_fps: u32,
    /// Paint straight into the visible buffer even when double buffering is available.
    pub prefer_single_buffer: bool,
    /// How often a frame is repainted after the surface lost its contents before giving up.
    pub max_present_attempts: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            cache_capacity: cache.capacity.get(),
            cache_expiry_ms: cache.expire_after.map(|expiry| expiry.as_millis() as u64),
            blink_interval_ms: 500,
            target_fps: 60,
            prefer_single_buffer: false,
            max_present_attempts: 3,
        }
    }
}

impl RenderConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be at least 1".into()));
        }
        if self.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be at least 1".into()));
        }
        if self.max_present_attempts == 0 {
            return Err(ConfigError::Invalid("max_present_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN),
            expire_after: self.cache_expiry_ms.map(Duration::from_millis),
        }
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    /// Time budget of a single frame.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}
