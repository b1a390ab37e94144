//! Mock shipping service

use std::convert::Infallible;
use std::net::SocketAddr;

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

use crate::error::{QuoteError, ServerError};
use crate::quote::calculate_quote;

/// Port the shipping service listens on by default
pub const DEFAULT_PORT: u16 = 9001;

/// `POST /getquote` and `GET /health`
#[must_use]
pub fn routes() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let quote = warp::path("getquote")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::bytes())
        .and_then(quote_handler);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    quote.or(health).with(warp::trace::request())
}

async fn quote_handler(
    content_type: Option<String>,
    body: Bytes,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let reply = match handle_quote(content_type.as_deref(), &body) {
        Ok(quote) => {
            tracing::info!("Quoted {}", quote.cost_usd);
            warp::reply::with_status(warp::reply::json(&quote), StatusCode::OK)
        }
        Err(e) => {
            tracing::info!("Rejected quote request: {}", e);
            warp::reply::with_status(warp::reply::json(&e.to_body()), StatusCode::BAD_REQUEST)
        }
    };
    Ok(reply)
}

fn handle_quote(content_type: Option<&str>, body: &[u8]) -> Result<odc_model::ShippingQuote, QuoteError> {
    let is_json = content_type.is_some_and(|ct| {
        ct.split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
    });
    if !is_json {
        return Err(QuoteError::ContentType);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return calculate_quote(None);
    }
    let body: Value = serde_json::from_slice(body).map_err(|_| QuoteError::MalformedBody)?;
    calculate_quote(Some(&body))
}

/// Running shipping service
#[derive(Debug)]
pub struct ShippingServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ShippingServer {
    /// Bind `addr` and serve in the background
    ///
    /// Port 0 picks a free port; see [`ShippingServer::local_addr`].
    ///
    /// # Errors
    /// `ServerError::Bind` if the address is unavailable.
    pub fn bind(addr: SocketAddr) -> Result<Self, ServerError> {
        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes()).try_bind_with_graceful_shutdown(addr, async {
            rx.await.ok();
        })?;
        let task = tokio::spawn(server);
        tracing::info!("Shipping service listening on http://{}", addr);
        Ok(Self {
            addr,
            shutdown: Some(tx),
            task,
        })
    }

    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:9001`
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Shipping service task ended abnormally: {}", e);
        }
        tracing::info!("Shipping service on {} stopped", self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn post(content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut request = warp::test::request().method("POST").path("/getquote");
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        let response = request.body(body.to_string()).reply(&routes()).await;
        let value = serde_json::from_slice(response.body()).unwrap();
        (response.status(), value)
    }

    #[tokio::test]
    async fn standard_quote() {
        let (status, body) = post(Some("application/json"), r#"{"numberOfItems": 3}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"cost_usd": {"currency_code": "USD", "units": 10, "nanos": 0}})
        );
    }

    #[tokio::test]
    async fn bulk_quote_with_charset() {
        let (status, body) =
            post(Some("application/json; charset=utf-8"), r#"{"numberOfItems": 20}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cost_usd"]["units"], 15);
    }

    #[tokio::test]
    async fn rejections_carry_error_text() {
        let cases = [
            (Some("application/json"), r#"{"numberOfItems": -1}"#, "Invalid number of items"),
            (Some("application/json"), "{}", "Missing numberOfItems field"),
            (Some("application/json"), "", "Missing numberOfItems field"),
            (Some("application/json"), "{not json", "Malformed JSON body"),
            (Some("text/plain"), r#"{"numberOfItems": 3}"#, "Invalid or missing Content-Type header"),
            (None, r#"{"numberOfItems": 3}"#, "Invalid or missing Content-Type header"),
        ];
        for (content_type, body, expected) in cases {
            let (status, reply) = post(content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(reply, json!({ "error": expected }), "{body}");
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = warp::test::request()
            .method("GET")
            .path("/quotes")
            .reply(&routes())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
