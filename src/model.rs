// Entity types persisted by the record store. Field names and status strings
// stay wire-compatible with the legacy browser-storage records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Host,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    // Stored and compared in plaintext; credential hardening is out of scope.
    #[serde(rename = "passwordHash")]
    pub credential: String,
    pub role: Role,
    pub name: String,
    pub trust_score: f64,
    #[serde(rename = "isVerified", default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaravanStatus {
    Available,
    Unlisted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caravan {
    pub id: String,
    pub host_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    // Minor currency units per night; must be positive.
    #[serde(rename = "pricePerDay")]
    pub price_per_night: i64,
    pub capacity: u32,
    pub status: CaravanStatus,
    pub rating: f64,
    pub review_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created through the instant-book flow; holds the dates until paid or
    /// the payment window lapses.
    PendingPayment,
    /// Awaiting a host decision; no payment step in this flow.
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Terminal states accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub caravan_id: String,
    pub guest_id: String,
    // Half-open range: the end date is checkout day and stays bookable.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
}
