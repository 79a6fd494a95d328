use uuid::Uuid;

/// Error taxonomy shared by the coordinator, the stores and the chat
/// service. Callers distinguish "reload and retry" (`InvalidTransition`)
/// from "no longer possible" (`CapacityExceeded`, `TooLateToCancel`) via
/// the variant, surfaced over the wire as `code()`.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("invalid seat count: {0}")]
    InvalidSeatCount(i32),

    #[error("ride {0} is not open")]
    RideClosed(Uuid),

    #[error("capacity exceeded: requested {requested}, remaining {remaining}")]
    CapacityExceeded { requested: i32, remaining: i32 },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("too late to cancel booking {0}")]
    TooLateToCancel(Uuid),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl DomainError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidSeatCount(_) => "INVALID_SEAT_COUNT",
            DomainError::RideClosed(_) => "RIDE_CLOSED",
            DomainError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::TooLateToCancel(_) => "TOO_LATE_TO_CANCEL",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::InvalidMessage(_) => "INVALID_MESSAGE",
        }
    }
}
