//! HTTP handler turning requests into rendered images

use crate::browser::Renderer;
use crate::config::OgImageOptions;
use crate::emoji::emojify;
use crate::params::Params;
use crate::strategy::check_strategy;
use crate::template::Template;
use crate::{Error, OgImageConfig, Result, Strategy};
use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use http_body_util::LengthLimitError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Largest JSON body accepted by the `body` strategy
pub const BODY_LIMIT: usize = 1024 * 1024;

type HeaderHook = Arc<dyn Fn(&Params, &mut HeaderMap) + Send + Sync>;

/// Output of a single render
#[derive(Debug, Clone)]
pub struct Rendered {
    pub content_type: HeaderValue,
    pub cache_control: HeaderValue,
    pub body: Vec<u8>,
}

/// Handler rendering `template` for every request.
///
/// `P` is the parameter type the template receives. Parameters are
/// stringified before deserialization, so scalar fields should be strings.
pub struct OgImage<P = HashMap<String, String>> {
    template: Template<P>,
    config: OgImageConfig,
    content_type: HeaderValue,
    html_content_type: HeaderValue,
    cache_control: HeaderValue,
    renderer: Arc<dyn Renderer>,
    header_hook: Option<HeaderHook>,
}

impl<P> Clone for OgImage<P> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            config: self.config.clone(),
            content_type: self.content_type.clone(),
            html_content_type: self.html_content_type.clone(),
            cache_control: self.cache_control.clone(),
            renderer: Arc::clone(&self.renderer),
            header_hook: self.header_hook.clone(),
        }
    }
}

/// Builder for [`OgImage`]. Exactly one of `html` or `component` must be set.
pub struct OgImageBuilder<P> {
    html: Option<Template<P>>,
    component: Option<Template<P>>,
    options: OgImageOptions,
    header_hook: Option<HeaderHook>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl<P> OgImage<P>
where
    P: DeserializeOwned + Send + 'static,
{
    pub fn builder() -> OgImageBuilder<P> {
        OgImageBuilder {
            html: None,
            component: None,
            options: OgImageOptions::default(),
            header_hook: None,
            renderer: None,
        }
    }

    pub fn config(&self) -> &OgImageConfig {
        &self.config
    }

    /// Handle one request. Failures become error responses.
    pub async fn handle(&self, request: Request) -> Response {
        match self.try_handle(request).await {
            Ok(response) => response,
            Err(err) => self.error_response(err),
        }
    }

    async fn try_handle(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let content_type = parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

        check_strategy(self.config.strategy, &parts.method, content_type)?;

        let params = match self.config.strategy {
            Strategy::Query => Params::from_query(parts.uri.query()),
            Strategy::Body => {
                let bytes = to_bytes(body, BODY_LIMIT).await.map_err(body_error)?;
                Params::from_body(&bytes)?
            }
        };

        let rendered = self.render(params.clone()).await?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, rendered.content_type);
        headers.insert(CACHE_CONTROL, rendered.cache_control);
        if let Some(hook) = &self.header_hook {
            hook(&params, &mut headers);
        }

        let mut response = Response::new(Body::from(rendered.body));
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Render the template with `params` and capture the page
    pub async fn render(&self, params: Params) -> Result<Rendered> {
        let typed: P = params.into_typed()?;
        let markup = self.template.render(typed).await?;
        debug!("Rendered template ({} bytes)", markup.len());

        let html = emojify(&markup);
        let capture = self.config.capture();
        let body = self.renderer.capture(&html, capture).await?;
        debug!("Captured {:?} ({} bytes)", capture, body.len());

        let content_type = if self.config.inspecting_html() {
            self.html_content_type.clone()
        } else {
            self.content_type.clone()
        };

        Ok(Rendered {
            content_type,
            cache_control: self.cache_control.clone(),
            body,
        })
    }

    fn error_response(&self, err: Error) -> Response {
        let status = err.status();
        warn!("OG image request failed ({}): {}", status, err);

        if self.config.errors_in_response() {
            let body = serde_json::json!({ "message": err.to_string() });
            (status, Json(body)).into_response()
        } else {
            status.into_response()
        }
    }

    /// Mount the handler at `path` for every method; the strategy check
    /// rejects the ones that do not fit.
    pub fn into_router(self, path: &str) -> Router {
        let handler = Arc::new(self);
        Router::new().route(
            path,
            any(move |request: Request| {
                let handler = Arc::clone(&handler);
                async move { handler.handle(request).await }
            }),
        )
    }

    /// Add the handler at `path` to an existing router
    pub fn route(self, router: Router, path: &str) -> Router {
        router.merge(self.into_router(path))
    }
}

impl<P> OgImageBuilder<P>
where
    P: DeserializeOwned + Send + 'static,
{
    /// Template returning an HTML string
    pub fn html<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        self.html = Some(Template::html(f));
        self
    }

    /// Template returning a component (`maud::Markup` or a `Node` tree)
    pub fn component<F, Fut, M>(mut self, f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M>> + Send + 'static,
        M: maud::Render + 'static,
    {
        self.component = Some(Template::component(f));
        self
    }

    /// Set an already built template in its matching slot
    pub fn template(mut self, template: Template<P>) -> Self {
        match template {
            Template::Html(_) => self.html = Some(template),
            Template::Component(_) => self.component = Some(template),
        }
        self
    }

    pub fn options(mut self, options: OgImageOptions) -> Self {
        self.options = options;
        self
    }

    /// Adjust response headers after the defaults are set
    pub fn header_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Params, &mut HeaderMap) + Send + Sync + 'static,
    {
        self.header_hook = Some(Arc::new(hook));
        self
    }

    /// Use `renderer` instead of launching Chrome
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn build(self) -> Result<OgImage<P>> {
        let template = match (self.html, self.component) {
            (Some(_), Some(_)) => return Err(Error::AmbiguousTemplate),
            (None, None) => return Err(Error::MissingTemplate),
            (Some(t), None) | (None, Some(t)) => t,
        };

        let config = self.options.resolve()?;
        let content_type = header_value("content type", &config.content_type)?;
        let cache_control = header_value("cache control", &config.cache_control)?;

        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => default_renderer(&config)?,
        };

        Ok(OgImage {
            template,
            config,
            content_type,
            html_content_type: HeaderValue::from_static("text/html"),
            cache_control,
            renderer,
            header_hook: self.header_hook,
        })
    }
}

fn body_error(err: axum::Error) -> Error {
    let inner = err.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        Error::PayloadTooLarge { limit: BODY_LIMIT }
    } else {
        Error::InvalidParams(format!("Failed to read body: {}", inner))
    }
}

fn header_value(what: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::ConfigError(format!("Invalid {} {:?}: {}", what, value, e)))
}

#[cfg(feature = "cdp")]
fn default_renderer(config: &OgImageConfig) -> Result<Arc<dyn Renderer>> {
    Ok(Arc::new(crate::cdp::BrowserEnvironment::new(config)))
}

#[cfg(not(feature = "cdp"))]
fn default_renderer(_config: &OgImageConfig) -> Result<Arc<dyn Renderer>> {
    Err(Error::ConfigError(
        "No renderer configured; enable the `cdp` feature or supply one".into(),
    ))
}
