use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid event time `{0}` (expected YYYY-MM-DDTHH:MM:SS±HHMM)")]
    InvalidEventTime(String),
}

/// Failure talking to the finance or events collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name} request failed: {message}")]
    Request { source_name: &'static str, message: String },
    #[error("{source_name} returned HTTP {status}: {body}")]
    Status { source_name: &'static str, status: u16, body: String },
    #[error("{source_name} response could not be decoded: {message}")]
    Decode { source_name: &'static str, message: String },
}

impl SourceError {
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Request { source_name, .. }
            | Self::Status { source_name, .. }
            | Self::Decode { source_name, .. } => source_name,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::SourceError;

    #[test]
    fn status_error_names_source_and_code() {
        let error = SourceError::Status {
            source_name: "eactivities",
            status: 403,
            body: "forbidden".to_owned(),
        };

        assert_eq!(error.to_string(), "eactivities returned HTTP 403: forbidden");
        assert_eq!(error.source_name(), "eactivities");
        assert!(!error.is_transient());
    }

    #[test]
    fn server_errors_and_request_failures_are_transient() {
        let server = SourceError::Status {
            source_name: "facebook",
            status: 502,
            body: String::new(),
        };
        let request =
            SourceError::Request { source_name: "facebook", message: "timed out".to_owned() };
        let decode = SourceError::Decode { source_name: "facebook", message: "eof".to_owned() };

        assert!(server.is_transient());
        assert!(request.is_transient());
        assert!(!decode.is_transient());
    }
}
