//! User-facing handler options and their merge over the defaults

use crate::{DevOptions, EnvMode, OgImageConfig, Result, Strategy, Viewport};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Partial handler options
///
/// Every field is optional; unset fields keep the value from
/// [`OgImageConfig::default`]. The same shape is accepted from a TOML file:
///
/// ```toml
/// strategy = "body"
/// content_type = "image/jpeg"
/// width = 800
///
/// [dev]
/// inspect_html = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OgImageOptions {
    /// `"query"` or `"body"`; validated when merged
    pub strategy: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub dev: Option<DevOptionsPatch>,
    /// Browser executable override
    pub executable: Option<PathBuf>,
    /// Overrides the mode read from `OG_IMAGE_ENV`
    pub env_mode: Option<EnvMode>,
}

/// Partial [`DevOptions`]
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevOptionsPatch {
    pub inspect_html: Option<bool>,
    pub errors_in_response: Option<bool>,
}

impl DevOptionsPatch {
    fn apply(self, dev: DevOptions) -> DevOptions {
        DevOptions {
            inspect_html: self.inspect_html.unwrap_or(dev.inspect_html),
            errors_in_response: self.errors_in_response.unwrap_or(dev.errors_in_response),
        }
    }
}

impl OgImageOptions {
    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy.as_str().to_string());
        self
    }

    pub fn with_env_mode(mut self, mode: EnvMode) -> Self {
        self.env_mode = Some(mode);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_dev(mut self, inspect_html: bool, errors_in_response: bool) -> Self {
        self.dev = Some(DevOptionsPatch {
            inspect_html: Some(inspect_html),
            errors_in_response: Some(errors_in_response),
        });
        self
    }

    /// Deep-merge these options over `defaults`
    pub fn merge_into(self, defaults: OgImageConfig) -> Result<OgImageConfig> {
        let strategy = match self.strategy {
            Some(s) => s.parse::<Strategy>()?,
            None => defaults.strategy,
        };

        let viewport = Viewport {
            width: self.width.unwrap_or(defaults.viewport.width),
            height: self.height.unwrap_or(defaults.viewport.height),
        };
        if viewport.width == 0 || viewport.height == 0 {
            return Err(crate::Error::ConfigError(format!(
                "Viewport must be non-empty, got {}x{}",
                viewport.width, viewport.height
            )));
        }

        Ok(OgImageConfig {
            strategy,
            content_type: self.content_type.unwrap_or(defaults.content_type),
            cache_control: self.cache_control.unwrap_or(defaults.cache_control),
            viewport,
            dev: self.dev.unwrap_or_default().apply(defaults.dev),
            executable: self.executable.or(defaults.executable),
            env_mode: self.env_mode.unwrap_or(defaults.env_mode),
        })
    }

    /// Merge over [`OgImageConfig::default`]
    pub fn resolve(self) -> Result<OgImageConfig> {
        self.merge_into(OgImageConfig::default())
    }
}
