use std::time::Instant;

use http::Extensions;
use reqwest::{header::AUTHORIZATION, Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::{debug, trace};

/// JSON fields whose values never reach the log
const MASKED_FIELDS: &[&str] = &["password", "token"];

/// The request body as logged: JSON with secrets masked, or its size otherwise
fn loggable_body(body: &[u8]) -> String {
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return format!("[{} bytes]", body.len());
    };
    if let Some(object) = value.as_object_mut() {
        for (key, field) in object.iter_mut() {
            if MASKED_FIELDS.contains(&key.as_str()) {
                *field = serde_json::Value::String("***".to_string());
            }
        }
    }

    value.to_string()
}

/// Logs the request line, the outcome and how long the round trip took.
/// Header values stay out of the log so credentials never reach it.
pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let body = req.body().and_then(|body| body.as_bytes()).map(loggable_body);
        trace!(
            authenticated = req.headers().contains_key(AUTHORIZATION),
            body = body.as_deref(),
            "sending request"
        );
        debug!(%method, %url, "request");

        let started = Instant::now();
        let res = next.run(req, extensions).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match res {
            Ok(ref res) => debug!(%method, %url, status = %res.status(), elapsed_ms, "response"),
            Err(ref error) => debug!(%method, %url, %error, elapsed_ms, "request failed"),
        }

        res
    }
}
