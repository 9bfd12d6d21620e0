//! Date-range availability: half-open interval overlap against a caravan's
//! existing bookings. Cancelled bookings never block, and an unpaid hold
//! stops blocking once its payment window lapses.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::model::{Booking, BookingStatus};
use crate::store::MemoryStore;

/// Strict half-open overlap test: `[candidate_start, candidate_end)` shares
/// at least one day with `[existing_start, existing_end)`. Adjacent ranges
/// (checkout day == check-in day) do not overlap.
pub fn ranges_overlap(
    candidate_start: NaiveDate,
    candidate_end: NaiveDate,
    existing_start: NaiveDate,
    existing_end: NaiveDate,
) -> bool {
    candidate_start < existing_end && candidate_end > existing_start
}

/// Whether a booking still holds its dates at `now`.
pub(crate) fn blocks_dates(booking: &Booking, now: DateTime<Utc>, payment_window: Duration) -> bool {
    match booking.status {
        BookingStatus::Cancelled => false,
        BookingStatus::PendingPayment => now < booking.created_at + payment_window,
        BookingStatus::Pending | BookingStatus::Confirmed => true,
    }
}

/// True when no blocking booking for the caravan overlaps the candidate
/// range. Callers that intend to reserve must hold the caravan's lock across
/// this check and the subsequent insert.
pub async fn is_available(
    store: &MemoryStore,
    caravan_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    now: DateTime<Utc>,
    payment_window: Duration,
) -> bool {
    let blocking = store
        .bookings
        .filter(|b| b.caravan_id == caravan_id && blocks_dates(b, now, payment_window))
        .await;

    !blocking
        .iter()
        .any(|b| ranges_overlap(start, end, b.start_date, b.end_date))
}
