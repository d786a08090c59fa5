use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::LoggerError;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8090";

/// Upper bound on TCP connect, TLS and WebSocket handshake together.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A syntactically valid `ws://` or `wss://` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    uri: Uri,
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self, LoggerError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(LoggerError::Configuration("endpoint address is empty".into()));
        }

        let uri: Uri = trimmed.parse().map_err(|e| {
            LoggerError::Configuration(format!("invalid endpoint address {trimmed:?}: {e}"))
        })?;

        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            Some(other) => {
                return Err(LoggerError::Configuration(format!(
                    "unsupported scheme {other:?} in {trimmed:?}, expected ws or wss"
                )))
            }
            None => {
                return Err(LoggerError::Configuration(format!(
                    "endpoint address {trimmed:?} has no scheme, expected ws:// or wss://"
                )))
            }
        }

        if uri.host().map_or(true, str::is_empty) {
            return Err(LoggerError::Configuration(format!(
                "endpoint address {trimmed:?} has no host"
            )));
        }

        Ok(Self {
            raw: trimmed.to_string(),
            uri,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> &str {
        self.uri.host().unwrap_or_default()
    }

    pub fn is_secure(&self) -> bool {
        self.uri.scheme_str() == Some("wss")
    }
}

impl FromStr for Endpoint {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Open the WebSocket handshake against `endpoint`, giving up after
/// `limit`. An unreachable or silent endpoint is reported as a
/// configuration error.
pub async fn connect(endpoint: &Endpoint, limit: Duration) -> Result<WsStream, LoggerError> {
    if endpoint.is_secure() {
        // Fails only when a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    debug!(endpoint = %endpoint, secure = endpoint.is_secure(), "opening websocket handshake");
    let (stream, response) = tokio::time::timeout(limit, connect_async(endpoint.as_str()))
        .await
        .map_err(|_| {
            LoggerError::Configuration(format!(
                "cannot connect to {endpoint}: handshake timed out after {}ms",
                limit.as_millis()
            ))
        })?
        .map_err(|e| LoggerError::Configuration(format!("cannot connect to {endpoint}: {e}")))?;
    info!(endpoint = %endpoint, status = %response.status(), "websocket handshake complete");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_endpoint() {
        let ep = Endpoint::parse(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(ep.as_str(), "ws://localhost:8090");
        assert_eq!(ep.host(), "localhost");
        assert!(!ep.is_secure());
    }

    #[test]
    fn accepts_secure_endpoint_with_path() {
        let ep: Endpoint = "wss://your-server:8090/stream".parse().unwrap();
        assert!(ep.is_secure());
        assert_eq!(ep.host(), "your-server");
    }

    #[tokio::test]
    async fn secure_endpoint_reaches_tls_handshake() {
        // Plain TCP peer that hangs up: the failure must come from TLS, not
        // from missing TLS support.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            drop(tcp);
        });

        let ep = Endpoint::parse(&format!("wss://127.0.0.1:{port}")).unwrap();
        let err = connect(&ep, Duration::from_secs(5)).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(
            !err.to_string().contains("not compiled in"),
            "TLS support missing: {err}"
        );
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        // Accepts TCP but never answers the upgrade request.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(tcp);
        });

        let ep = Endpoint::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let err = connect(&ep, Duration::from_millis(200)).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
        peer.abort();
    }

    #[test]
    fn rejects_garbage() {
        let err = Endpoint::parse("not a url").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(Endpoint::parse("localhost:8090").unwrap_err().is_configuration());
    }

    #[test]
    fn rejects_http_scheme() {
        let err = Endpoint::parse("http://localhost:8090").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_empty() {
        assert!(Endpoint::parse("   ").unwrap_err().is_configuration());
    }
}
