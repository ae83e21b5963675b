//! Configuration file support for exambook-pdf
//!
//! Supports TOML configuration files with the following search order:
//! 1. `--config <path>` - explicitly specified path
//! 2. `./exambook.toml` - current directory
//! 3. `~/.config/exambook-pdf/config.toml` - user config
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [cropping]
//! padding = 2
//! brightness_threshold = 200
//!
//! [layout]
//! overflow_tolerance = 1.0
//!
//! [covers]
//! numbered = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::answer_key::AnswerKeyLayout;
use crate::session::RenderOptions;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// File not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Whitespace cropping configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CroppingConfig {
    /// Enable whitespace cropping
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Content padding in pixels
    #[serde(default)]
    pub padding: Option<u32>,

    /// Background brightness threshold (0-255)
    #[serde(default)]
    pub brightness_threshold: Option<u8>,

    /// Background alpha threshold (0-255)
    #[serde(default)]
    pub alpha_threshold: Option<u8>,

    /// Per-crop image load timeout in milliseconds
    #[serde(default)]
    pub load_timeout_ms: Option<u64>,
}

/// Flow/layout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// Overflow tolerance in layout units
    #[serde(default)]
    pub overflow_tolerance: Option<f32>,

    /// Vertical spacing between blocks
    #[serde(default)]
    pub block_spacing: Option<f32>,

    /// Fallback box height for failed images
    #[serde(default)]
    pub fallback_image_height: Option<f32>,

    /// Per-block image readiness timeout in milliseconds
    #[serde(default)]
    pub image_ready_timeout_ms: Option<u64>,
}

/// Viewport fitting configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewportConfig {
    /// Width above which pages render unscaled
    #[serde(default)]
    pub breakpoint: Option<f32>,

    /// Minimum scale clamp
    #[serde(default)]
    pub min_scale: Option<f32>,

    /// Viewport width to fit after layout
    #[serde(default)]
    pub width: Option<f32>,
}

/// Cover page policy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoversConfig {
    /// Whether covers consume page numbers
    #[serde(default)]
    pub numbered: Option<bool>,

    /// Whether covers advance the odd/even parity sequence
    #[serde(default)]
    pub in_parity: Option<bool>,
}

/// Answer-key configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnswerKeyConfig {
    /// Page layout policy
    #[serde(default)]
    pub layout: Option<AnswerKeyLayout>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Cropping settings
    #[serde(default)]
    pub cropping: CroppingConfig,

    /// Layout settings
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Viewport settings
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// Cover page settings
    #[serde(default)]
    pub covers: CoversConfig,

    /// Answer-key settings
    #[serde(default)]
    pub answer_key: AnswerKeyConfig,
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default search path
    ///
    /// Search order:
    /// 1. `./exambook.toml`
    /// 2. `~/.config/exambook-pdf/config.toml`
    /// 3. Default values (if no file found)
    pub fn load() -> Result<Self, ConfigError> {
        let current_dir_config = PathBuf::from("exambook.toml");
        if current_dir_config.exists() {
            return Self::load_from_path(&current_dir_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("exambook-pdf").join("config.toml");
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert to RenderOptions
    pub fn to_render_options(&self) -> RenderOptions {
        let mut options = RenderOptions::default();

        if let Some(enabled) = self.cropping.enabled {
            options.crop.enabled = enabled;
        }
        if let Some(padding) = self.cropping.padding {
            options.crop.padding = padding;
        }
        if let Some(threshold) = self.cropping.brightness_threshold {
            options.crop.brightness_threshold = threshold;
        }
        if let Some(threshold) = self.cropping.alpha_threshold {
            options.crop.alpha_threshold = threshold;
        }
        if let Some(ms) = self.cropping.load_timeout_ms {
            options.crop.load_timeout = Duration::from_millis(ms);
        }

        if let Some(tolerance) = self.layout.overflow_tolerance {
            options.overflow_tolerance = tolerance;
        }
        if let Some(spacing) = self.layout.block_spacing {
            options.metrics.block_spacing = spacing;
        }
        if let Some(height) = self.layout.fallback_image_height {
            options.metrics.fallback_image_height = height;
        }
        if let Some(ms) = self.layout.image_ready_timeout_ms {
            options.image_ready_timeout = Duration::from_millis(ms);
        }

        if let Some(breakpoint) = self.viewport.breakpoint {
            options.fit.breakpoint = breakpoint;
        }
        if let Some(min_scale) = self.viewport.min_scale {
            options.fit.min_scale = min_scale;
        }
        options.viewport_width = self.viewport.width;

        if let Some(numbered) = self.covers.numbered {
            options.covers_numbered = numbered;
        }
        if let Some(in_parity) = self.covers.in_parity {
            options.covers_in_parity = in_parity;
        }

        if let Some(layout) = self.answer_key.layout {
            options.answer_key_layout = layout;
        }

        options
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> RenderOptions {
        let mut options = self.to_render_options();

        if let Some(enabled) = cli.crop_enabled {
            options.crop.enabled = enabled;
        }
        if let Some(padding) = cli.padding {
            options.crop.padding = padding;
        }
        if let Some(threshold) = cli.brightness_threshold {
            options.crop.brightness_threshold = threshold;
        }
        if let Some(width) = cli.viewport_width {
            options.viewport_width = Some(width);
        }
        if let Some(numbered) = cli.covers_numbered {
            options.covers_numbered = numbered;
        }
        if let Some(layout) = cli.answer_key_layout {
            options.answer_key_layout = layout;
        }

        options
    }

    /// Get config file search paths
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("exambook.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("exambook-pdf").join("config.toml"));
        }

        paths
    }
}

/// CLI override values for merging with config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub crop_enabled: Option<bool>,
    pub padding: Option<u32>,
    pub brightness_threshold: Option<u8>,
    pub viewport_width: Option<f32>,
    pub covers_numbered: Option<bool>,
    pub answer_key_layout: Option<AnswerKeyLayout>,
}

impl CliOverrides {
    /// Create new empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Set crop enable override
    pub fn with_crop_enabled(mut self, enabled: bool) -> Self {
        self.crop_enabled = Some(enabled);
        self
    }

    /// Set padding override
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Set viewport width override
    pub fn with_viewport_width(mut self, width: f32) -> Self {
        self.viewport_width = Some(width);
        self
    }

    /// Set answer-key layout override
    pub fn with_answer_key_layout(mut self, layout: AnswerKeyLayout) -> Self {
        self.answer_key_layout = Some(layout);
        self
    }
}
