use shared::error::ValidationError;
use thiserror::Error;

/// Every failure the posts gateway can report. Raw transport errors never
/// escape the gateway; they are folded into one of these kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("posts service unreachable: {0}")]
    Transport(String),
    #[error("{message} (HTTP {status})")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unreadable response from posts service: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}
