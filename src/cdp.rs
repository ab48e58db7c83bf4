//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)

use crate::browser::{
    chrome_path_override, launch_args, resolve_executable, Capture, ImageFormat, Renderer,
};
use crate::{EnvMode, Error, OgImageConfig, Result, Viewport};
use futures::future::BoxFuture;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::{oneshot, OnceCell};

// headless_chrome tears the connection down after this much silence; the page
// lives as long as the handler, so keep it effectively unbounded.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(u32::MAX as u64);

enum Command {
    Capture(String, Capture, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

#[derive(Debug, Clone)]
struct LaunchSettings {
    executable: PathBuf,
    explicit_executable: bool,
    viewport: Viewport,
    env_mode: EnvMode,
}

#[derive(Clone)]
enum PageSource {
    Launch(LaunchSettings),
    Existing(Arc<Tab>),
}

/// A single headless Chrome tab, owned by the worker thread
struct CdpPage {
    // Keeps the child process alive for launched pages
    _browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl CdpPage {
    fn open(source: PageSource) -> Result<Self> {
        match source {
            PageSource::Existing(tab) => Ok(Self { _browser: None, tab }),
            PageSource::Launch(settings) => Self::launch(&settings),
        }
    }

    fn launch(settings: &LaunchSettings) -> Result<Self> {
        let path = if settings.explicit_executable || settings.executable.exists() {
            Some(settings.executable.clone())
        } else {
            warn!(
                "Chrome not found at {}, falling back to auto-detection",
                settings.executable.display()
            );
            None
        };

        let args: Vec<&OsStr> = launch_args(settings.env_mode)
            .into_iter()
            .map(OsStr::new)
            .collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(!settings.env_mode.is_production_like())
            .window_size(Some((settings.viewport.width, settings.viewport.height)))
            .path(path)
            .args(args)
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        info!(
            "Launched headless browser ({}x{}, {:?})",
            settings.viewport.width, settings.viewport.height, settings.env_mode
        );

        Ok(Self {
            _browser: Some(browser),
            tab,
        })
    }

    /// Replace the document with `html` and wait for its resources
    fn set_content(&self, html: &str) -> Result<()> {
        let literal = serde_json::to_string(html)
            .map_err(|e| Error::RenderError(format!("Failed to encode markup: {}", e)))?;

        let script = format!(
            r#"(function() {{
                document.open();
                document.write({});
                document.close();
                return new Promise(function(resolve) {{
                    if (document.readyState === 'complete') resolve();
                    else window.addEventListener('load', function() {{ resolve(); }});
                }}).then(function() {{ return document.fonts.ready; }}).then(function() {{ return true; }});
            }})()"#,
            literal
        );

        self.tab
            .evaluate(&script, true)
            .map_err(|e| Error::RenderError(format!("Failed to set page content: {}", e)))?;
        Ok(())
    }

    fn capture(&self, html: &str, capture: Capture) -> Result<Vec<u8>> {
        self.set_content(html)?;

        match capture {
            Capture::Html => {
                let content = self
                    .tab
                    .get_content()
                    .map_err(|e| Error::RenderError(format!("Failed to read page content: {}", e)))?;
                Ok(content.into_bytes())
            }
            Capture::Image(format) => {
                let format = match format {
                    ImageFormat::Png => Page::CaptureScreenshotFormatOption::Png,
                    ImageFormat::Jpeg => Page::CaptureScreenshotFormatOption::Jpeg,
                    ImageFormat::Webp => Page::CaptureScreenshotFormatOption::Webp,
                };
                self.tab
                    .capture_screenshot(format, None, None, true)
                    .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
            }
        }
    }
}

/// Browser page behind the handler.
///
/// A dedicated worker thread owns the synchronous `headless_chrome` tab and
/// executes capture commands sent from async tasks. The browser is launched
/// on the first capture and the same page is reused for every request after
/// that; captures are serialized by the worker's command channel.
pub struct BrowserEnvironment {
    source: Mutex<Option<PageSource>>,
    worker: OnceCell<Sender<Command>>,
}

impl BrowserEnvironment {
    /// Environment that launches Chrome with the handler's configuration
    pub fn new(config: &OgImageConfig) -> Self {
        let settings = LaunchSettings {
            executable: resolve_executable(config.executable.as_ref()),
            explicit_executable: config.executable.is_some() || chrome_path_override().is_some(),
            viewport: config.viewport,
            env_mode: config.env_mode,
        };
        Self::from_source(PageSource::Launch(settings))
    }

    /// Environment reusing a tab the caller already opened and sized
    pub fn with_tab(tab: Arc<Tab>) -> Self {
        Self::from_source(PageSource::Existing(tab))
    }

    fn from_source(source: PageSource) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            worker: OnceCell::new(),
        }
    }

    async fn worker(&self) -> Result<&Sender<Command>> {
        self.worker.get_or_try_init(|| self.spawn_worker()).await
    }

    // The source stays in place so a failed launch is retried on the next
    // capture. Only `close` clears it.
    async fn spawn_worker(&self) -> Result<Sender<Command>> {
        let source = self
            .source
            .lock()
            .map_err(|_| Error::InitializationError("Page source lock poisoned".into()))?
            .clone()
            .ok_or_else(|| Error::InitializationError("Browser environment is closed".into()))?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let page = match CdpPage::open(source) {
                Ok(p) => p,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Capture(html, capture, resp) => {
                        debug!("Capturing {:?} ({} bytes of markup)", capture, html.len());
                        let _ = resp.send(page.capture(&html, capture));
                    }
                    Command::Close(resp) => {
                        drop(page);
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        init_rx
            .await
            .map_err(|e| Error::InitializationError(format!("Worker init canceled: {}", e)))??;

        Ok(cmd_tx)
    }

    /// Shut the worker down and close the browser. Later captures fail.
    pub async fn close(&self) -> Result<()> {
        if let Ok(mut source) = self.source.lock() {
            source.take();
        }
        let Some(tx) = self.worker.get() else {
            return Ok(());
        };
        let (resp_tx, resp_rx) = oneshot::channel();
        if tx.send(Command::Close(resp_tx)).is_err() {
            return Ok(());
        }
        resp_rx
            .await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl Renderer for BrowserEnvironment {
    fn capture<'a>(&'a self, html: &'a str, capture: Capture) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let tx = self.worker().await?;
            let (resp_tx, resp_rx) = oneshot::channel();
            tx.send(Command::Capture(html.to_string(), capture, resp_tx))
                .map_err(|_| Error::RenderError("Browser worker has stopped".into()))?;
            resp_rx
                .await
                .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
        })
    }
}
