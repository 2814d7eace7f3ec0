//! WebSocket client for the contract lookup API.
//!
//! Every call is a JSON request tagged with a `req_id`; the matching
//! response frame is awaited on the same socket. Endpoint can be overridden
//! with `BINARY_WS_URL` (see the binary's config loader).

use std::error::Error as StdError;

use async_trait::async_trait;
use common::{
    ActiveSymbol, AuthorizeInfo, ContractsForResponse, Error, Result, WsEnvelope,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api::{ContractsApi, ContractsConnection};
use crate::rate_limit::RateLimiter;

fn format_error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn ws_error(err: &dyn StdError) -> Error {
    Error::WebSocket(format_error_chain(err))
}

fn preview(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Connection factory for the JSON-over-WebSocket API.
#[derive(Debug, Clone)]
pub struct BinaryWsApi {
    url: String,
    limiter: RateLimiter,
}

impl BinaryWsApi {
    /// `url` is the full connection URL including `app_id`.
    pub fn new(url: impl Into<String>, limiter: RateLimiter) -> Self {
        Self {
            url: url.into(),
            limiter,
        }
    }
}

#[async_trait]
impl ContractsApi for BinaryWsApi {
    async fn connect(&self) -> Result<Box<dyn ContractsConnection>> {
        let url = url::Url::parse(&self.url).map_err(|e| ws_error(&e))?;
        if url.host_str().is_none() {
            return Err(Error::WebSocket(format!(
                "WebSocket URL missing host: {}",
                self.url
            )));
        }

        debug!("Connecting to {}", url);
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ws_error(&e))?;

        Ok(Box::new(BinaryWsConnection {
            stream,
            next_req_id: 1,
            limiter: self.limiter.clone(),
        }))
    }
}

/// One open socket.
pub struct BinaryWsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_req_id: u64,
    limiter: RateLimiter,
}

impl BinaryWsConnection {
    /// Send `payload` and wait for the frame answering it.
    async fn request(&mut self, mut payload: Value) -> Result<Value> {
        self.limiter.wait().await;

        let req_id = self.next_req_id;
        self.next_req_id += 1;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("req_id".into(), json!(req_id));
        }

        let text = serde_json::to_string(&payload)?;
        self.stream
            .send(tungstenite::Message::Text(text))
            .await
            .map_err(|e| ws_error(&e))?;

        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    let value: Value = serde_json::from_str(&text)?;
                    let envelope = WsEnvelope::deserialize(&value)?;

                    if envelope.req_id != Some(req_id) {
                        debug!(
                            "Skipping frame for req_id={:?} (waiting on {}): {}",
                            envelope.req_id,
                            req_id,
                            preview(&text)
                        );
                        continue;
                    }

                    if let Some(err) = envelope.error {
                        return Err(Error::Api {
                            code: err.code,
                            message: err.message,
                        });
                    }

                    return Ok(value);
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    let _ = self.stream.send(tungstenite::Message::Pong(data)).await;
                }
                Some(Ok(tungstenite::Message::Close(_))) | None => {
                    return Err(Error::WebSocket(format!(
                        "connection closed before response to req_id={}",
                        req_id
                    )));
                }
                Some(Err(e)) => return Err(ws_error(&e)),
                _ => {}
            }
        }
    }
}

#[async_trait]
impl ContractsConnection for BinaryWsConnection {
    async fn authorize(&mut self, token: &str) -> Result<AuthorizeInfo> {
        let mut resp = self.request(json!({ "authorize": token })).await?;
        let payload = resp
            .get_mut("authorize")
            .map(Value::take)
            .ok_or_else(|| Error::Auth("authorize response missing payload".into()))?;
        let info: AuthorizeInfo = serde_json::from_value(payload)?;
        info!("Authorized as {}", info.loginid);
        Ok(info)
    }

    async fn contracts_for(&mut self, symbol: &str) -> Result<ContractsForResponse> {
        let resp = self.request(json!({ "contracts_for": symbol })).await?;
        let parsed: ContractsForResponse = serde_json::from_value(resp)?;
        debug!(
            "contracts_for {}: {} contracts",
            symbol,
            parsed
                .contracts_for
                .as_ref()
                .map(|c| c.available.len())
                .unwrap_or(0)
        );
        Ok(parsed)
    }

    async fn active_symbols(&mut self) -> Result<Vec<ActiveSymbol>> {
        let mut resp = self
            .request(json!({ "active_symbols": "brief", "product_type": "basic" }))
            .await?;
        let payload = resp
            .get_mut("active_symbols")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(payload)?)
    }

    async fn disconnect(mut self: Box<Self>) {
        if let Err(e) = self.stream.close(None).await {
            warn!("WebSocket close failed: {}", format_error_chain(&e));
        }
    }
}
