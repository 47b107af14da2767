//! Error taxonomy for the discovery pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// The request never produced an HTTP response
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The action needs a logged-in user
    #[error("authentication required: please log in")]
    AuthRequired,

    /// Rejected locally before any network call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend answered with a non-success status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ScoutError {
    /// Message suitable for showing next to the control that failed
    pub fn user_message(&self) -> String {
        match self {
            ScoutError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ScoutError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select at least {required} properties to compare (currently {selected})")]
    TooFewToCompare { selected: usize, required: usize },

    #[error("the requested viewing time is in the past")]
    SlotInPast,

    #[error("viewings can be booked at most {max_days} days ahead")]
    SlotTooFarAhead { max_days: i64 },

    #[error("viewings are only available between {open} and {close}")]
    OutsideViewingHours { open: String, close: String },

    #[error("this property is not available for viewings")]
    PropertyUnavailable,

    #[error("you already have an active viewing request (#{request_id}) for this property")]
    ActiveRequestExists { request_id: i64 },

    #[error("a reason is required to deny a viewing request")]
    MissingDenialReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_surface_backend_message() {
        let err = ScoutError::Server {
            status: 409,
            message: "Duplicate viewing request".into(),
        };
        assert_eq!(err.user_message(), "Duplicate viewing request");
    }

    #[test]
    fn validation_messages_are_readable() {
        let err: ScoutError = ValidationError::TooFewToCompare {
            selected: 1,
            required: 2,
        }
        .into();
        assert_eq!(
            err.user_message(),
            "select at least 2 properties to compare (currently 1)"
        );
    }
}
