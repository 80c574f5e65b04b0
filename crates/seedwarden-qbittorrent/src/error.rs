//! Transport errors raised by the qBittorrent Web API client.

use thiserror::Error;

/// Errors produced while talking to qBittorrent.
#[derive(Debug, Error)]
pub enum QbitError {
    /// The configured base URL could not be parsed.
    #[error("invalid qBittorrent base url")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Build {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or its body could not be read.
    #[error("qBittorrent request failed")]
    Request {
        /// Endpoint path below `/api/v2`.
        endpoint: &'static str,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// A JSON payload did not match the expected shape.
    #[error("qBittorrent response could not be decoded")]
    Decode {
        /// Endpoint path below `/api/v2`.
        endpoint: &'static str,
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// Login was refused.
    #[error("qBittorrent rejected the credentials")]
    Auth {
        /// Response body returned by the login endpoint.
        body: String,
    },
    /// The endpoint answered with a non-success status.
    #[error("qBittorrent returned an unexpected status")]
    Status {
        /// Endpoint path below `/api/v2`.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// `setCategory` refused the category (it does not exist).
    #[error("qBittorrent rejected the category")]
    CategoryRejected {
        /// Requested category.
        category: String,
    },
}

/// Convenience alias for qBittorrent transport results.
pub type QbitResult<T> = Result<T, QbitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_constant() {
        let err = QbitError::Status {
            endpoint: "torrents/info",
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "qBittorrent returned an unexpected status");
        let err = QbitError::CategoryRejected {
            category: "tv".into(),
        };
        assert_eq!(err.to_string(), "qBittorrent rejected the category");
    }
}
