//! Request validation against the declared parameter strategy

use crate::{Error, Result, Strategy};
use axum::http::{Method, StatusCode};

const JSON_MIME: &str = "application/json";

/// MIME essence of a `Content-Type` value, i.e. without parameters
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Check that the request method and content type fit `strategy`.
///
/// `Query` accepts only GET. `Body` accepts only POST with a JSON payload.
pub fn check_strategy(
    strategy: Strategy,
    method: &Method,
    content_type: Option<&str>,
) -> Result<()> {
    match strategy {
        Strategy::Query => {
            if method != Method::GET {
                return Err(Error::StrategyMismatch {
                    status: StatusCode::METHOD_NOT_ALLOWED,
                    message: format!(
                        "Strategy is set to `query` so parameters must be passed by GET request and query params. Current method: {}",
                        method
                    ),
                });
            }
        }
        Strategy::Body => {
            let is_json = content_type.map(mime_essence).as_deref() == Some(JSON_MIME);
            if method != Method::POST || !is_json {
                let status = if method != Method::POST {
                    StatusCode::METHOD_NOT_ALLOWED
                } else {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                };
                return Err(Error::StrategyMismatch {
                    status,
                    message: format!(
                        "Strategy is set to `body` so parameters must be passed by POST request and JSON payload. Current method: {} and current content type: {}",
                        method,
                        content_type.unwrap_or("undefined")
                    ),
                });
            }
        }
    }
    Ok(())
}
