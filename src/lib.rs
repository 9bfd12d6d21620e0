// Core services for a caravan rental marketplace: typed record store,
// availability checking, pricing, the booking lifecycle state machine, and
// simulated payment/identity gateways. The UI layer lives elsewhere and
// calls into these services.

pub mod auth;
pub mod availability;
pub mod booking;
pub mod error;
pub mod identity;
pub mod listing;
pub mod model;
pub mod payment;
pub mod pricing;
pub mod store;

// Re-export key types for convenience
pub use auth::{AuthService, NewUser};
pub use booking::{BookingConfig, BookingService, HostDecision, ReservationMode};
pub use error::{Error, Result};
pub use identity::{Document, DocumentReview, IdentityVerifier, SimulatedReview, VerifierConfig};
pub use listing::{ListingFilters, ListingService, NewListing};
pub use model::{
    Booking, BookingStatus, Caravan, CaravanStatus, Payment, PaymentMethod, PaymentStatus, Role,
    User,
};
pub use payment::{
    CardDetails, GatewayConfig, PaymentGateway, PaymentProcessor, SimulatedGateway,
};
pub use pricing::Quote;
pub use store::{GuardedUpdate, MemoryStore, Record, Snapshot, StoreConfig};
