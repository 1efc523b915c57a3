use crate::utils::QuantityError;
use thiserror::Error;

/// Why a single probe produced no value.
///
/// These never reach the scrape: transports and collectors log them with the
/// endpoint's redacted host and report the metric as absent.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("malformed JSON: {0}")]
    InvalidJson(String),

    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    #[error("response has no result")]
    MissingResult,

    #[error("response has no field {0}")]
    MissingField(String),

    #[error("conversion failed: {0}")]
    Conversion(#[from] QuantityError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("{0} is not supported over this transport")]
    Unsupported(&'static str),
}

impl ProbeError {
    /// Maps a reqwest failure, dropping the request URL so credentials never reach logs.
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::ConnectionFailed("connection refused or unreachable".to_string())
        } else {
            Self::Network(error.without_url())
        }
    }

    pub(crate) fn from_ws(error: &tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                Self::ConnectionFailed("connection closed".to_string())
            }
            WsError::Io(e) => Self::ConnectionFailed(e.kind().to_string()),
            WsError::Http(response) => Self::HttpStatus(response.status().as_u16()),
            other => Self::WebSocket(other.to_string()),
        }
    }
}
