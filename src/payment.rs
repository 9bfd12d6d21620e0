// Payment processing: card validation, a simulated gateway behind an
// injectable trait so tests can force approve/decline, and persistence of
// the resulting payment record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{Payment, PaymentMethod, PaymentStatus};
use crate::store::MemoryStore;

/// Minimum digits a card number must contain after stripping separators.
pub const MIN_CARD_DIGITS: usize = 16;

#[derive(Debug, Clone)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    pub expiry: String,
}

/// Digits of a card number with spaces, dashes, and any other separators
/// removed.
pub fn normalized_digits(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Probability in `[0, 1]` that an otherwise valid charge is declined.
    pub decline_probability: f64,
    /// Simulated processing time per authorization.
    pub processing_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            decline_probability: 0.05,
            processing_delay: Duration::from_millis(500),
        }
    }
}

/// Seam for the acceptance decision. The production implementation rolls a
/// configured probability; tests pin it to 0.0 or 1.0.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, card: &CardDetails, amount: i64) -> Result<()>;
}

pub struct SimulatedGateway {
    config: GatewayConfig,
}

impl SimulatedGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(&self, _card: &CardDetails, amount: i64) -> Result<()> {
        if !self.config.processing_delay.is_zero() {
            tokio::time::sleep(self.config.processing_delay).await;
        }
        if self.config.decline_probability > 0.0
            && rand::thread_rng().gen_bool(self.config.decline_probability)
        {
            warn!(amount, "simulated gateway declined the charge");
            return Err(Error::Declined);
        }
        Ok(())
    }
}

/// Validates the card payload, runs the gateway, and persists the completed
/// payment. No retry logic; the caller decides whether to re-invoke.
pub struct PaymentProcessor {
    store: Arc<MemoryStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentProcessor {
    pub fn new(store: Arc<MemoryStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn process_payment(
        &self,
        booking_id: &str,
        amount: i64,
        card: &CardDetails,
    ) -> Result<Payment> {
        if normalized_digits(&card.number).len() < MIN_CARD_DIGITS {
            return Err(Error::InvalidCard);
        }

        self.gateway.authorize(card, amount).await?;

        let payment = self
            .store
            .payments
            .insert(Payment {
                id: String::new(),
                booking_id: booking_id.to_string(),
                amount,
                method: PaymentMethod::CreditCard,
                status: PaymentStatus::Completed,
                timestamp: Utc::now(),
            })
            .await;

        info!(payment = %payment.id, booking = booking_id, amount, "payment completed");
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use test_case::test_case;

    fn card(number: &str) -> CardDetails {
        CardDetails {
            number: number.to_string(),
            holder: "Jane Guest".to_string(),
            expiry: "12/28".to_string(),
        }
    }

    fn gateway(decline_probability: f64) -> Arc<dyn PaymentGateway> {
        Arc::new(SimulatedGateway::new(GatewayConfig {
            decline_probability,
            processing_delay: Duration::ZERO,
        }))
    }

    #[test_case("4242 4242 4242 4242", 16; "spaced")]
    #[test_case("4242-4242-4242-4242", 16; "dashed")]
    #[test_case("424242424242424", 15; "fifteen digits")]
    fn strips_separators(number: &str, expected: usize) {
        assert_eq!(normalized_digits(number).len(), expected);
    }

    #[tokio::test]
    async fn fifteen_digit_card_is_rejected_before_the_gateway() {
        let store = Arc::new(MemoryStore::new(StoreConfig::instant()));
        // A gateway that always declines must never be reached.
        let processor = PaymentProcessor::new(Arc::clone(&store), gateway(1.0));

        let err = processor
            .process_payment("booking_1", 24_000, &card("424242424242424"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidCard));
        assert!(store.payments.find_all().await.is_empty());
    }

    #[tokio::test]
    async fn declined_charge_persists_nothing() {
        let store = Arc::new(MemoryStore::new(StoreConfig::instant()));
        let processor = PaymentProcessor::new(Arc::clone(&store), gateway(1.0));

        let err = processor
            .process_payment("booking_1", 24_000, &card("4242 4242 4242 4242"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Declined));
        assert!(store.payments.find_all().await.is_empty());
    }

    #[tokio::test]
    async fn successful_charge_persists_a_completed_payment() {
        let store = Arc::new(MemoryStore::new(StoreConfig::instant()));
        let processor = PaymentProcessor::new(Arc::clone(&store), gateway(0.0));

        let payment = processor
            .process_payment("booking_1", 240_000, &card("4242424242424242"))
            .await
            .unwrap();

        assert!(payment.id.starts_with("payment_"));
        assert_eq!(payment.booking_id, "booking_1");
        assert_eq!(payment.amount, 240_000);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.method, PaymentMethod::CreditCard);
        assert_eq!(store.payments.find_all().await.len(), 1);
    }
}
