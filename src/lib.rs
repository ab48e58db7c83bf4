//! Open Graph image handler
//!
//! Turns an HTML or component template plus request parameters into a
//! rendered image by handing the markup to a headless browser page. The
//! handler plugs into an `axum` router and negotiates where parameters come
//! from (query string or JSON body) and what the response carries.
//!
//! # Features
//!
//! - **CDP Backend** (default): screenshots are captured with headless Chrome
//! - **Strategies**: parameters from the query string or from a JSON body
//! - **Dev Inspection**: outside production the rendered HTML is returned as-is
//!
//! # Example
//!
//! ```no_run
//! use og_image::{OgImage, OgImageOptions};
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = OgImage::<HashMap<String, String>>::builder()
//!     .html(|params: HashMap<String, String>| async move {
//!         let title = params.get("title").cloned().unwrap_or_default();
//!         Ok(format!("<h1>{}</h1>", title))
//!     })
//!     .options(OgImageOptions::default())
//!     .build()?;
//!
//! let app = handler.into_router("/api/og");
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{DevOptionsPatch, OgImageOptions};

pub mod browser;
pub mod emoji;
pub mod handler;
pub mod markup;
pub mod params;
pub mod strategy;
pub mod template;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use browser::{Capture, ImageFormat, Renderer};
pub use handler::{OgImage, OgImageBuilder};
pub use markup::{el, fragment, raw, render_to_static_markup, text, Node};
pub use params::Params;
pub use template::Template;

#[cfg(feature = "cdp")]
pub use cdp::BrowserEnvironment;

/// Environment variable selecting the runtime mode
pub const ENV_MODE_VAR: &str = "OG_IMAGE_ENV";

/// Where request parameters are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// JSON payload of a POST request
    Body,
    /// URL query string of a GET request
    #[default]
    Query,
}

impl Strategy {
    pub const POSSIBLE_VALUES: [&'static str; 2] = ["body", "query"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Body => "body",
            Strategy::Query => "query",
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "body" => Ok(Strategy::Body),
            "query" => Ok(Strategy::Query),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime mode of the hosting process. Deserializes with the same rules as
/// [`EnvMode::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(from = "String")]
pub enum EnvMode {
    #[default]
    Development,
    Staging,
    Production,
    Testing,
}

impl EnvMode {
    /// Read the mode from `OG_IMAGE_ENV`. Missing or unknown values fall back
    /// to development.
    pub fn from_env() -> Self {
        std::env::var(ENV_MODE_VAR)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "staging" => EnvMode::Staging,
            "production" => EnvMode::Production,
            "testing" | "test" => EnvMode::Testing,
            _ => EnvMode::Development,
        }
    }

    /// Production and staging behave the same way: no HTML inspection and no
    /// error details in responses.
    pub fn is_production_like(&self) -> bool {
        matches!(self, EnvMode::Production | EnvMode::Staging)
    }
}

impl From<String> for EnvMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Viewport dimensions of the rendered image
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 630,
        }
    }
}

/// Development-only behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevOptions {
    /// Return the rendered HTML instead of an image
    pub inspect_html: bool,
    /// Report strategy and render errors as a JSON body
    pub errors_in_response: bool,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            inspect_html: true,
            errors_in_response: true,
        }
    }
}

/// Fully resolved handler configuration
///
/// Built once from [`OgImageOptions`] merged over the defaults and immutable
/// afterwards.
///
/// # Examples
///
/// ```
/// let cfg = og_image::OgImageConfig::default();
/// assert_eq!(cfg.content_type, "image/png");
/// assert_eq!(cfg.viewport.width, 1200);
/// ```
#[derive(Debug, Clone)]
pub struct OgImageConfig {
    pub strategy: Strategy,
    /// Content type of the produced image
    pub content_type: String,
    /// Value of the `Cache-Control` response header
    pub cache_control: String,
    pub viewport: Viewport,
    pub dev: DevOptions,
    /// Browser executable override
    pub executable: Option<PathBuf>,
    pub env_mode: EnvMode,
}

impl Default for OgImageConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Query,
            content_type: "image/png".to_string(),
            cache_control: "max-age 3600, must-revalidate".to_string(),
            viewport: Viewport::default(),
            dev: DevOptions::default(),
            executable: None,
            env_mode: EnvMode::from_env(),
        }
    }
}

impl OgImageConfig {
    /// Whether responses carry the page HTML instead of an image
    pub fn inspecting_html(&self) -> bool {
        !self.env_mode.is_production_like() && self.dev.inspect_html
    }

    /// Whether error messages are written to the response body
    pub fn errors_in_response(&self) -> bool {
        !self.env_mode.is_production_like() && self.dev.errors_in_response
    }

    /// What the browser page should hand back for this configuration
    pub fn capture(&self) -> Capture {
        if self.inspecting_html() {
            Capture::Html
        } else {
            Capture::Image(ImageFormat::from_content_type(&self.content_type))
        }
    }

    /// `Content-Type` header value of successful responses
    pub fn response_content_type(&self) -> &str {
        if self.inspecting_html() {
            "text/html"
        } else {
            &self.content_type
        }
    }
}
