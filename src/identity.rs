// Identity verification: a simulated document review behind an injectable
// trait. A passing review flips the user's verified flag; re-verifying an
// already verified user just sets it true again, but the rejection chance is
// re-rolled on every call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::User;
use crate::store::MemoryStore;

#[derive(Debug, Clone)]
pub struct Document {
    pub kind: String,
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Probability in `[0, 1]` that the review rejects the document.
    pub rejection_probability: f64,
    /// Simulated review turnaround.
    pub review_delay: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            rejection_probability: 0.10,
            review_delay: Duration::from_millis(1500),
        }
    }
}

/// Seam for the review outcome, pinned by tests to force either branch.
#[async_trait]
pub trait DocumentReview: Send + Sync {
    async fn review(&self, document: &Document) -> Result<()>;
}

pub struct SimulatedReview {
    config: VerifierConfig,
}

impl SimulatedReview {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DocumentReview for SimulatedReview {
    async fn review(&self, document: &Document) -> Result<()> {
        if !self.config.review_delay.is_zero() {
            tokio::time::sleep(self.config.review_delay).await;
        }
        if self.config.rejection_probability > 0.0
            && rand::thread_rng().gen_bool(self.config.rejection_probability)
        {
            warn!(kind = %document.kind, "simulated review rejected the document");
            return Err(Error::DocumentUnclear);
        }
        Ok(())
    }
}

pub struct IdentityVerifier {
    store: Arc<MemoryStore>,
    review: Arc<dyn DocumentReview>,
}

impl IdentityVerifier {
    pub fn new(store: Arc<MemoryStore>, review: Arc<dyn DocumentReview>) -> Self {
        Self { store, review }
    }

    /// Submits the document for review and, on success, marks the user
    /// verified. Returns the updated user.
    pub async fn verify(&self, user_id: &str, document: &Document) -> Result<User> {
        // Surface an unknown user before burning a review round-trip.
        self.store.users.find_by_id(user_id).await?;

        self.review.review(document).await?;

        let user = self
            .store
            .users
            .update(user_id, |u| u.verified = true)
            .await?;
        info!(user = %user.id, "identity verified");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;

    fn document() -> Document {
        Document {
            kind: "drivers_license".to_string(),
            reference: "doc_123".to_string(),
        }
    }

    fn verifier(rejection_probability: f64, store: &Arc<MemoryStore>) -> IdentityVerifier {
        IdentityVerifier::new(
            Arc::clone(store),
            Arc::new(SimulatedReview::new(VerifierConfig {
                rejection_probability,
                review_delay: Duration::ZERO,
            })),
        )
    }

    #[tokio::test]
    async fn passing_review_sets_the_verified_flag() {
        let store = Arc::new(MemoryStore::seeded(StoreConfig::instant()));
        let verifier = verifier(0.0, &store);

        let user = verifier.verify("user_2", &document()).await.unwrap();
        assert!(user.verified);
        assert!(store.users.find_by_id("user_2").await.unwrap().verified);
    }

    #[tokio::test]
    async fn rejected_review_leaves_the_flag_untouched() {
        let store = Arc::new(MemoryStore::seeded(StoreConfig::instant()));
        let verifier = verifier(1.0, &store);

        let err = verifier.verify("user_2", &document()).await.unwrap_err();
        assert!(matches!(err, Error::DocumentUnclear));
        assert!(!store.users.find_by_id("user_2").await.unwrap().verified);
    }

    #[tokio::test]
    async fn re_verification_is_idempotent_in_effect() {
        let store = Arc::new(MemoryStore::seeded(StoreConfig::instant()));
        let verifier = verifier(0.0, &store);

        verifier.verify("user_2", &document()).await.unwrap();
        let again = verifier.verify("user_2", &document()).await.unwrap();
        assert!(again.verified);
    }

    #[tokio::test]
    async fn unknown_user_is_reported_without_a_review() {
        let store = Arc::new(MemoryStore::seeded(StoreConfig::instant()));
        // Even an always-rejecting review is not consulted for unknown users.
        let verifier = verifier(1.0, &store);

        let err = verifier.verify("user_missing", &document()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
