//! Browser seam: what a page capture returns and how the browser is located

use crate::{EnvMode, Result};
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable overriding the browser executable
pub const CHROME_PATH_VAR: &str = "CHROME_PATH";

/// Image formats the browser screenshot can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// Pick the screenshot format for a response content type. Anything that
    /// is not JPEG or WebP is captured as PNG.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/webp" => ImageFormat::Webp,
            _ => ImageFormat::Png,
        }
    }
}

/// What to hand back after loading markup into the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The page's serialized HTML
    Html,
    /// A screenshot of the viewport
    Image(ImageFormat),
}

/// Loads markup into a page and captures it.
///
/// Implemented by the CDP-backed [`BrowserEnvironment`](crate::BrowserEnvironment);
/// tests substitute their own.
pub trait Renderer: Send + Sync {
    fn capture<'a>(&'a self, html: &'a str, capture: Capture) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Platform default Chrome location
pub fn default_executable() -> PathBuf {
    if cfg!(target_os = "windows") {
        PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe")
    } else if cfg!(target_os = "linux") {
        PathBuf::from("/usr/bin/google-chrome")
    } else {
        PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome")
    }
}

/// `CHROME_PATH`, if set to something other than an empty string
pub fn chrome_path_override() -> Option<PathBuf> {
    non_empty_path(std::env::var_os(CHROME_PATH_VAR))
}

fn non_empty_path(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Explicit override first, then `CHROME_PATH`, then the platform default
pub fn resolve_executable(explicit: Option<&PathBuf>) -> PathBuf {
    explicit
        .cloned()
        .or_else(chrome_path_override)
        .unwrap_or_else(default_executable)
}

/// Extra Chrome flags for the given mode
///
/// Production-like modes usually run in constrained containers or serverless
/// sandboxes without a user namespace, shared memory or a GPU.
pub fn launch_args(env_mode: EnvMode) -> Vec<&'static str> {
    if !env_mode.is_production_like() {
        return Vec::new();
    }
    vec![
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-notifications",
        "--disable-extensions",
        "--hide-scrollbars",
        "--mute-audio",
        "--no-default-browser-check",
        "--no-first-run",
        "--no-pings",
        "--no-sandbox",
        "--no-zygote",
        "--single-process",
    ]
}
