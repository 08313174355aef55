use thiserror::Error;

/// Failure taxonomy surfaced to the embedding shell. Operations never panic
/// on these; they are converted into user-visible notices at the call site.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("import failed: {0}")]
    Import(String),
    #[error("backend rejected request: {0}")]
    Backend(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("malformed payload: {0}")]
    Parse(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ClientError {
    /// Maps a wire-level `(code, message)` pair onto the taxonomy. Codes the
    /// client does not know collapse into `Backend`.
    pub fn from_wire(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "import_error" => Self::Import(message),
            "not_found" => Self::NotFound(message),
            "network_error" => Self::Network(message),
            "parse_error" => Self::Parse(message),
            _ => Self::Backend(message),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Import(_) => "import_error",
            Self::Backend(_) => "backend_error",
            Self::NotFound(_) => "not_found",
            Self::Network(_) => "network_error",
            Self::Parse(_) => "parse_error",
            Self::Transport(_) => "transport_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_wire_codes_map_onto_their_kind() {
        assert_eq!(
            ClientError::from_wire("not_found", "no such profile"),
            ClientError::NotFound("no such profile".into())
        );
        assert_eq!(
            ClientError::from_wire("network_error", "timed out"),
            ClientError::Network("timed out".into())
        );
    }

    #[test]
    fn unknown_wire_codes_collapse_into_backend() {
        let err = ClientError::from_wire("stale_revision", "rejected");
        assert_eq!(err, ClientError::Backend("rejected".into()));
        assert_eq!(err.code(), "backend_error");
    }

    #[test]
    fn display_carries_the_message() {
        let err = ClientError::Import("unreachable url".into());
        assert_eq!(err.to_string(), "import failed: unreachable url");
    }
}
