use crate::errors::{AppError, Result};
use crate::models::{Price, Venue};
use crate::traits::PriceSource;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::{SinkExt, StreamExt};
use num_traits::Zero;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct TickerMsg {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Vec<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    last: String,
}

/// One-shot reader of the OKX public `tickers` channel.
#[derive(Debug, Clone)]
pub struct OkxTicker {
    ws_url: String,
    instrument: String,
    timeout: Duration,
}

impl OkxTicker {
    pub fn new(ws_url: impl Into<String>, instrument: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ws_url: ws_url.into(),
            instrument: instrument.into(),
            timeout,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Subscribes, waits for the first ticker carrying a `last` price and
    /// returns it. The socket is closed on every path once opened; the whole
    /// exchange is bounded by the configured timeout.
    pub async fn fetch_price(&self) -> Result<Price> {
        let deadline = Instant::now() + self.timeout;
        let url = Url::parse(&self.ws_url).map_err(|e| AppError::price_unavailable(Venue::Cex, e))?;

        let (mut ws, _resp) = timeout_at(deadline, connect_async(url))
            .await
            .map_err(|_| AppError::price_unavailable(Venue::Cex, "timed out connecting"))?
            .map_err(|e| AppError::price_unavailable(Venue::Cex, e))?;

        let outcome = match timeout_at(deadline, read_last_price(&mut ws, &self.instrument)).await {
            Ok(res) => res,
            Err(_) => Err(AppError::price_unavailable(Venue::Cex, "timed out waiting for ticker")),
        };

        match timeout(CLOSE_GRACE, ws.close(None)).await {
            Ok(Err(e)) => debug!(error = %e, "[CEX] close handshake failed"),
            Err(_) => debug!("[CEX] close handshake timed out"),
            Ok(Ok(())) => {}
        }

        outcome.map(|value| Price::new(Venue::Cex, value))
    }
}

#[async_trait]
impl PriceSource for OkxTicker {
    async fn fetch_latest_price(&self) -> Result<Price> {
        self.fetch_price().await
    }
}

pub fn subscribe_message(instrument: &str) -> String {
    serde_json::json!({
        "op": "subscribe",
        "args": [{ "channel": "tickers", "instId": instrument }],
    })
    .to_string()
}

async fn read_last_price(ws: &mut Socket, instrument: &str) -> Result<BigDecimal> {
    ws.send(Message::Text(subscribe_message(instrument)))
        .await
        .map_err(|e| AppError::price_unavailable(Venue::Cex, e))?;

    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(txt)) => {
                if let Some(price) = parse_ticker(&txt)? {
                    return Ok(price);
                }
            }
            Ok(Message::Close(frame)) => {
                warn!(?frame, "[CEX] server closed the stream");
                break;
            }
            Ok(_) => {}
            Err(e) => return Err(AppError::price_unavailable(Venue::Cex, e)),
        }
    }
    Err(AppError::price_unavailable(Venue::Cex, "stream ended before a ticker arrived"))
}

/// Parses one text frame. Returns `Ok(None)` for frames without ticker data
/// (e.g. the subscribe acknowledgement).
pub fn parse_ticker(txt: &str) -> Result<Option<BigDecimal>> {
    let parsed: TickerMsg = serde_json::from_str(txt)
        .map_err(|e| AppError::price_unavailable(Venue::Cex, format!("malformed payload: {e}")))?;

    if parsed.event.as_deref() == Some("error") {
        return Err(AppError::price_unavailable(
            Venue::Cex,
            format!(
                "exchange error {}: {}",
                parsed.code.unwrap_or_default(),
                parsed.msg.unwrap_or_default()
            ),
        ));
    }

    let Some(first) = parsed.data.first() else {
        return Ok(None);
    };
    let last = BigDecimal::from_str(first.last.trim()).map_err(|e| {
        AppError::price_unavailable(Venue::Cex, format!("bad last price {:?}: {e}", first.last))
    })?;
    if last <= BigDecimal::zero() {
        return Err(AppError::price_unavailable(
            Venue::Cex,
            format!("non-positive last price {last}"),
        ));
    }
    Ok(Some(last))
}
