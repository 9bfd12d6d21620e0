use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{BookingStatus, Role};

/// Failure kinds surfaced by the marketplace core. Each kind is a distinct
/// variant so callers can branch (retry a declined payment, pick new dates)
/// instead of matching on message strings.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    #[error("selected dates are not available")]
    Unavailable,

    #[error("invalid date range: {start} to {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid card number")]
    InvalidCard,

    #[error("payment declined by bank")]
    Declined,

    #[error("verification failed: document unclear")]
    DocumentUnclear,

    #[error("email already exists: {0}")]
    DuplicateEmail(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("cannot {action} a booking in status {status:?}")]
    InvalidTransition {
        status: BookingStatus,
        action: &'static str,
    },

    #[error("payment window expired for booking {0}")]
    PaymentWindowExpired(String),

    #[error("operation requires the {0:?} role")]
    RoleRequired(Role),

    #[error("caravan {caravan} is not managed by user {user}")]
    NotCaravanHost { caravan: String, user: String },

    #[error("invalid listing: {0}")]
    InvalidListing(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
