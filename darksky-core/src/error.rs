use thiserror::Error;

use crate::transport::TransportError;

/// Failure of a single forecast fetch.
///
/// The three kinds are flat on purpose: callers match on them directly and
/// the only retained detail is the transport's own error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The base domain or the assembled request URL is not valid.
    /// Nothing was sent.
    #[error("malformed request URL")]
    MalformedRequest,

    /// The transport failed to deliver a response (DNS, connect, TLS, timeout).
    #[error("network failure: {0}")]
    NetworkFailure(#[source] TransportError),

    /// The response body was empty or did not decode as a forecast.
    #[error("failed to decode forecast response")]
    DecodeFailure,
}

impl FetchError {
    /// Whether the failure happened before any request was issued.
    pub fn is_malformed_request(&self) -> bool {
        matches!(self, FetchError::MalformedRequest)
    }

    pub fn is_network_failure(&self) -> bool {
        matches!(self, FetchError::NetworkFailure(_))
    }

    pub fn is_decode_failure(&self) -> bool {
        matches!(self, FetchError::DecodeFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn network_failure_keeps_cause_as_source() {
        let cause: TransportError = "connection refused".into();
        let err = FetchError::NetworkFailure(cause);

        assert!(err.is_network_failure());
        assert!(err.to_string().contains("connection refused"));

        let source = err.source().expect("cause must be attached");
        assert_eq!(source.to_string(), "connection refused");
    }

    #[test]
    fn flat_kinds_have_no_source() {
        assert!(FetchError::MalformedRequest.source().is_none());
        assert!(FetchError::DecodeFailure.source().is_none());
        assert!(FetchError::MalformedRequest.is_malformed_request());
        assert!(FetchError::DecodeFailure.is_decode_failure());
    }
}
