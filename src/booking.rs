// Booking lifecycle orchestration.
//
// State machine:
//   instant book:    pending_payment --pay--> confirmed
//   request to book: pending --host approve--> confirmed
//                    pending --host reject---> cancelled
// `confirmed` and `cancelled` are terminal. A `pending_payment` booking whose
// payment window lapses is cancelled on the next touch (pay or sweep) and its
// dates are released.
//
// The availability check and the booking insert run under a per-caravan
// mutex, so two concurrent creates for the same caravan cannot both pass the
// check before either write lands. Every status transition holds the same
// mutex and is written through a status-guarded update, so a racing pay,
// host decision, or expiry sweep cannot overwrite a transition that landed
// after its own read; terminal states stay terminal.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::availability;
use crate::error::{Error, Result};
use crate::model::{Booking, BookingStatus, Payment, Role};
use crate::payment::{CardDetails, PaymentGateway, PaymentProcessor};
use crate::pricing;
use crate::store::{GuardedUpdate, MemoryStore};

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// How long an unpaid `pending_payment` booking holds its dates.
    pub payment_window: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            payment_window: Duration::minutes(30),
        }
    }
}

/// Which flow a new booking enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationMode {
    /// Guest pays immediately; booking starts at `pending_payment`.
    Instant,
    /// Host must accept; booking starts at `pending`, no payment step.
    RequestToBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDecision {
    Approve,
    Reject,
}

pub struct BookingService {
    store: Arc<MemoryStore>,
    payments: PaymentProcessor,
    config: BookingConfig,
    // One lock per caravan id; taken across availability check + insert.
    reservation_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BookingService {
    pub fn new(
        store: Arc<MemoryStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: BookingConfig,
    ) -> Self {
        Self {
            payments: PaymentProcessor::new(Arc::clone(&store), gateway),
            store,
            config,
            reservation_locks: DashMap::new(),
        }
    }

    fn reservation_lock(&self, caravan_id: &str) -> Arc<Mutex<()>> {
        self.reservation_locks
            .entry(caravan_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Moves a booking from `from` to `to` only if it still holds `from` at
    /// write time. A rejection means some other transition landed first.
    async fn transition(
        &self,
        booking_id: &str,
        from: BookingStatus,
        to: BookingStatus,
        action: &'static str,
    ) -> Result<Booking> {
        match self
            .store
            .bookings
            .update_if(booking_id, |b| b.status == from, |b| b.status = to)
            .await?
        {
            GuardedUpdate::Applied(booking) => Ok(booking),
            GuardedUpdate::Rejected(booking) => Err(Error::InvalidTransition {
                status: booking.status,
                action,
            }),
        }
    }

    /// Creates a booking for the guest if the caravan's dates are free.
    pub async fn create(
        &self,
        caravan_id: &str,
        guest_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        mode: ReservationMode,
    ) -> Result<Booking> {
        let guest = self.store.users.find_by_id(guest_id).await?;
        if guest.role != Role::Guest {
            return Err(Error::RoleRequired(Role::Guest));
        }
        let caravan = self.store.caravans.find_by_id(caravan_id).await?;
        let quote = pricing::quote(start, end, caravan.price_per_night)?;

        let lock = self.reservation_lock(caravan_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        if !availability::is_available(
            &self.store,
            caravan_id,
            start,
            end,
            now,
            self.config.payment_window,
        )
        .await
        {
            return Err(Error::Unavailable);
        }

        let status = match mode {
            ReservationMode::Instant => BookingStatus::PendingPayment,
            ReservationMode::RequestToBook => BookingStatus::Pending,
        };
        let booking = self
            .store
            .bookings
            .insert(Booking {
                id: String::new(),
                caravan_id: caravan_id.to_string(),
                guest_id: guest_id.to_string(),
                start_date: start,
                end_date: end,
                status,
                total_price: quote.total,
                created_at: now,
            })
            .await;

        info!(
            booking = %booking.id,
            caravan = caravan_id,
            nights = quote.nights,
            total = quote.total,
            ?status,
            "booking created"
        );
        Ok(booking)
    }

    /// Charges the booking's total. On success the booking becomes
    /// `confirmed`. A declined or invalid card leaves it at `pending_payment`
    /// so the caller can retry within the payment window; a lapsed window
    /// cancels the booking instead.
    pub async fn pay(&self, booking_id: &str, card: &CardDetails) -> Result<(Booking, Payment)> {
        let found = self.store.bookings.find_by_id(booking_id).await?;

        // Hold the caravan's lock from the window check through the charge
        // and the confirming write. A concurrent sweep or create for the
        // same caravan waits here instead of cancelling the booking (or
        // taking its dates) while the gateway is in flight.
        let lock = self.reservation_lock(&found.caravan_id);
        let _guard = lock.lock().await;

        let booking = self.store.bookings.find_by_id(booking_id).await?;
        if booking.status != BookingStatus::PendingPayment {
            return Err(Error::InvalidTransition {
                status: booking.status,
                action: "pay",
            });
        }

        if Utc::now() >= booking.created_at + self.config.payment_window {
            self.transition(
                booking_id,
                BookingStatus::PendingPayment,
                BookingStatus::Cancelled,
                "pay",
            )
            .await?;
            warn!(booking = booking_id, "payment window lapsed; booking cancelled");
            return Err(Error::PaymentWindowExpired(booking_id.to_string()));
        }

        let payment = self
            .payments
            .process_payment(booking_id, booking.total_price, card)
            .await?;

        let confirmed = self
            .transition(
                booking_id,
                BookingStatus::PendingPayment,
                BookingStatus::Confirmed,
                "pay",
            )
            .await?;

        info!(booking = %confirmed.id, payment = %payment.id, "booking confirmed");
        Ok((confirmed, payment))
    }

    /// Host accepts or rejects a `pending` request for a caravan they own.
    pub async fn host_decision(
        &self,
        booking_id: &str,
        host_id: &str,
        decision: HostDecision,
    ) -> Result<Booking> {
        let booking = self.store.bookings.find_by_id(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(Error::InvalidTransition {
                status: booking.status,
                action: "decide on",
            });
        }

        let caravan = self.store.caravans.find_by_id(&booking.caravan_id).await?;
        if caravan.host_id != host_id {
            return Err(Error::NotCaravanHost {
                caravan: caravan.id,
                user: host_id.to_string(),
            });
        }

        let status = match decision {
            HostDecision::Approve => BookingStatus::Confirmed,
            HostDecision::Reject => BookingStatus::Cancelled,
        };
        let lock = self.reservation_lock(&booking.caravan_id);
        let _guard = lock.lock().await;
        let updated = self
            .transition(booking_id, BookingStatus::Pending, status, "decide on")
            .await?;

        info!(booking = %updated.id, ?decision, "host decided on booking request");
        Ok(updated)
    }

    /// Cancels every `pending_payment` booking whose payment window lapsed
    /// before `now`. Returns the cancelled bookings.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
        let window = self.config.payment_window;
        let stale = self
            .store
            .bookings
            .filter(|b| {
                b.status == BookingStatus::PendingPayment && now >= b.created_at + window
            })
            .await;

        let mut cancelled = Vec::with_capacity(stale.len());
        for booking in stale {
            let lock = self.reservation_lock(&booking.caravan_id);
            let _guard = lock.lock().await;
            // A pay in flight when the snapshot above was taken may have
            // confirmed the booking by now; skip anything that is no longer
            // an unpaid hold.
            match self
                .store
                .bookings
                .update_if(
                    &booking.id,
                    |b| b.status == BookingStatus::PendingPayment,
                    |b| b.status = BookingStatus::Cancelled,
                )
                .await?
            {
                GuardedUpdate::Applied(updated) => {
                    warn!(booking = %updated.id, "expired unpaid booking");
                    cancelled.push(updated);
                }
                GuardedUpdate::Rejected(_) => {}
            }
        }
        Ok(cancelled)
    }

    /// Bookings visible to a user: guests see their own, hosts see every
    /// booking on caravans they list.
    pub async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        let user = self.store.users.find_by_id(user_id).await?;
        match user.role {
            Role::Guest => Ok(self
                .store
                .bookings
                .filter(|b| b.guest_id == user_id)
                .await),
            Role::Host => {
                let owned: Vec<String> = self
                    .store
                    .caravans
                    .filter(|c| c.host_id == user_id)
                    .await
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
                Ok(self
                    .store
                    .bookings
                    .filter(|b| owned.contains(&b.caravan_id))
                    .await)
            }
        }
    }
}
