//! Integration tests for the HTTP handler

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use og_image::emoji::EMOJI_STYLE;
use og_image::{el, Capture, EnvMode, Node, OgImage, OgImageOptions, Renderer, Strategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Renderer that returns the markup (HTML capture) or fixed bytes (image
/// capture) and records what it was asked for
#[derive(Clone, Default)]
struct Recording {
    calls: Arc<Mutex<Vec<(String, Capture)>>>,
}

impl Renderer for Recording {
    fn capture<'a>(&'a self, html: &'a str, capture: Capture) -> BoxFuture<'a, og_image::Result<Vec<u8>>> {
        self.calls.lock().unwrap().push((html.to_string(), capture));
        Box::pin(async move {
            Ok(match capture {
                Capture::Html => html.as_bytes().to_vec(),
                Capture::Image(_) => FAKE_PNG.to_vec(),
            })
        })
    }
}

fn dev_options() -> OgImageOptions {
    OgImageOptions::default().with_env_mode(EnvMode::Development)
}

fn expected_dev_html(markup: &str) -> String {
    format!("<style>{}</style>{}", EMOJI_STYLE, markup)
}

fn query_router(options: OgImageOptions, renderer: Recording) -> Router {
    OgImage::<HashMap<String, String>>::builder()
        .html(|p: HashMap<String, String>| async move {
            Ok(format!("<p>{}</p>", p.get("test").cloned().unwrap_or_default()))
        })
        .options(options)
        .renderer(renderer)
        .build()
        .expect("handler")
        .into_router("/")
}

fn body_router(options: OgImageOptions) -> Router {
    OgImage::<HashMap<String, String>>::builder()
        .html(|p: HashMap<String, String>| async move {
            Ok(format!("<h1>{}</h1><h2>{}</h2>", p["title"], p["stars"]))
        })
        .options(options.with_strategy(Strategy::Body))
        .renderer(Recording::default())
        .build()
        .expect("handler")
        .into_router("/api/og")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_query_params_fill_html_template() {
    let renderer = Recording::default();
    let app = query_router(dev_options(), renderer.clone());

    let response = app
        .oneshot(Request::get("/?test=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "max-age 3600, must-revalidate"
    );
    assert_eq!(body_text(response).await, expected_dev_html("<p>abc</p>"));

    let calls = renderer.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, Capture::Html);
}

#[tokio::test]
async fn test_component_template_matches_html_template() {
    let app = OgImage::<HashMap<String, String>>::builder()
        .component(|p: HashMap<String, String>| async move {
            Ok(Node::from(el("p").child(p.get("test").cloned().unwrap_or_default())))
        })
        .options(dev_options())
        .renderer(Recording::default())
        .build()
        .unwrap()
        .into_router("/");

    let response = app
        .oneshot(Request::get("/?test=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, expected_dev_html("<p>abc</p>"));
}

#[tokio::test]
async fn test_query_strategy_rejects_post() {
    let app = query_router(dev_options(), Recording::default());

    let response = app
        .oneshot(
            Request::post("/?test=abc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json["message"],
        "Strategy is set to `query` so parameters must be passed by GET request and query params. Current method: POST"
    );
}

#[tokio::test]
async fn test_body_strategy_rejects_non_json() {
    let app = body_router(dev_options());

    let response = app
        .oneshot(
            Request::post("/api/og")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("title=x"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("current content type: text/plain"));
}

#[tokio::test]
async fn test_body_strategy_renders_stringified_json() {
    let app = body_router(dev_options());

    let response = app
        .oneshot(
            Request::post("/api/og")
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(Body::from(r#"{"title":"Release","stars":1200}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        expected_dev_html("<h1>Release</h1><h2>1200</h2>")
    );
}

#[tokio::test]
async fn test_body_strategy_malformed_json_is_bad_request() {
    let app = body_router(dev_options());

    let response = app
        .oneshot(
            Request::post("/api/og")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"title\":"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_strategy_oversized_body_is_payload_too_large() {
    let app = body_router(dev_options());
    let padding = "x".repeat(og_image::handler::BODY_LIMIT);
    let payload = format!(r#"{{"title":"{}","stars":1}}"#, padding);

    let response = app
        .oneshot(
            Request::post("/api/og")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json["message"],
        format!("Request body is larger than {} bytes", og_image::handler::BODY_LIMIT)
    );
}

#[tokio::test]
async fn test_production_returns_image_and_hides_errors() {
    let renderer = Recording::default();
    let options = OgImageOptions::default()
        .with_env_mode(EnvMode::Production)
        .with_content_type("image/jpeg");
    let app = query_router(options, renderer.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/?test=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], FAKE_PNG);
    assert_eq!(
        renderer.calls.lock().unwrap()[0].1,
        Capture::Image(og_image::ImageFormat::Jpeg)
    );

    let rejected = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(body_text(rejected).await.is_empty());
}

#[tokio::test]
async fn test_dev_errors_can_be_hidden() {
    let app = query_router(dev_options().with_dev(true, false), Recording::default());

    let response = app
        .oneshot(Request::post("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_header_hook_and_emoji() {
    let app = OgImage::<HashMap<String, String>>::builder()
        .html(|p: HashMap<String, String>| async move { Ok(format!("<p>{} 🚀</p>", p["test"])) })
        .header_hook(|params, headers| {
            if let Some(v) = params.get("test").and_then(|t| HeaderValue::from_str(t).ok()) {
                headers.insert("x-og-param", v);
            }
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        })
        .options(dev_options())
        .renderer(Recording::default())
        .build()
        .unwrap()
        .into_router("/");

    let response = app
        .oneshot(Request::get("/?test=launch").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.headers()["x-og-param"], "launch");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let html = body_text(response).await;
    assert!(html.contains("<p>launch <img class=\"emoji\" draggable=\"false\" alt=\"🚀\""));
    assert!(html.contains("/1f680.svg\"/>"));
}

#[tokio::test]
async fn test_template_failure_reports_500() {
    let app = OgImage::<HashMap<String, String>>::builder()
        .html(|_| async { Err(og_image::Error::TemplateError("font missing".into())) })
        .options(dev_options())
        .renderer(Recording::default())
        .build()
        .unwrap()
        .into_router("/");

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["message"], "Template failed: font missing");
}

#[tokio::test]
async fn test_route_merges_into_existing_router() {
    let base = Router::new().route("/healthz", axum::routing::get(|| async { "Pong" }));
    let handler = OgImage::<HashMap<String, String>>::builder()
        .html(|_| async { Ok("<p>card</p>".to_string()) })
        .options(dev_options())
        .renderer(Recording::default())
        .build()
        .unwrap();
    let app = handler.route(base, "/api/og");

    let health = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_text(health).await, "Pong");

    let card = app
        .oneshot(Request::get("/api/og").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(card.status(), StatusCode::OK);
    assert_eq!(body_text(card).await, expected_dev_html("<p>card</p>"));
}
