// Record store: one insertion-ordered collection per entity type, with a
// fixed simulated latency per operation standing in for a real backend.
// No isolation between callers; plain updates are last-write-wins, and
// `update_if` is the guarded variant for writes that must not clobber a
// concurrent transition. Serialization of the booking check-then-insert
// happens in the lifecycle layer, not here.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    Booking, Caravan, CaravanStatus, Payment, Role, User,
};

/// Implemented by every stored entity so collections can assign and look up
/// identifiers generically.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection key in the persisted snapshot, matching the legacy
    /// browser-storage layout.
    const COLLECTION: &'static str;
    /// Prefix for generated identifiers, e.g. `booking_1718000000000`.
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;
    fn assign_id(&mut self, id: String);
}

macro_rules! impl_record {
    ($ty:ty, $collection:literal, $prefix:literal) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;
            const ID_PREFIX: &'static str = $prefix;

            fn id(&self) -> &str {
                &self.id
            }

            fn assign_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

impl_record!(User, "caravan_users", "user");
impl_record!(Caravan, "caravan_items", "caravan");
impl_record!(Booking, "caravan_bookings", "booking");
impl_record!(Payment, "caravan_payments", "payment");

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Simulated per-operation latency. Zero skips the sleep entirely.
    pub latency: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(300),
        }
    }
}

impl StoreConfig {
    /// No simulated latency; the usual choice for tests.
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }
}

/// Outcome of a guarded update: the check and the write happen under one
/// lock acquisition, so `Rejected` means the record changed state since the
/// caller last read it.
#[derive(Debug)]
pub enum GuardedUpdate<T> {
    /// The check passed and the mutation was applied.
    Applied(T),
    /// The check failed; the record is returned unchanged.
    Rejected(T),
}

/// An insertion-ordered collection of records of one entity type.
pub struct Collection<T: Record> {
    rows: RwLock<Vec<T>>,
    next_id: AtomicU64,
    latency: Duration,
}

impl<T: Record> Collection<T> {
    fn new(latency: Duration) -> Self {
        // Seeding from the clock keeps generated ids in the same shape as the
        // legacy timestamp-based ones while staying unique per process.
        let seed = Utc::now().timestamp_millis().unsigned_abs();
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(seed),
            latency,
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Assigns a fresh identifier, appends the record, and returns the stored
    /// copy.
    pub async fn insert(&self, mut record: T) -> T {
        self.simulate_latency().await;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.assign_id(format!("{}_{}", T::ID_PREFIX, n));
        self.rows.write().push(record.clone());
        record
    }

    pub async fn find_all(&self) -> Vec<T> {
        self.simulate_latency().await;
        self.rows.read().clone()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<T> {
        self.simulate_latency().await;
        self.rows
            .read()
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            })
    }

    /// First record matching the predicate, if any.
    pub async fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.simulate_latency().await;
        self.rows.read().iter().find(|r| predicate(r)).cloned()
    }

    /// All records matching the predicate.
    pub async fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.simulate_latency().await;
        self.rows
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Applies a field-level mutation to the record with the given id and
    /// returns the updated copy. The typed counterpart of a partial-field
    /// update against loose records.
    pub async fn update(&self, id: &str, apply: impl FnOnce(&mut T)) -> Result<T> {
        self.simulate_latency().await;
        let mut rows = self.rows.write();
        match rows.iter_mut().find(|r| r.id() == id) {
            Some(row) => {
                apply(row);
                Ok(row.clone())
            }
            None => Err(Error::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            }),
        }
    }

    /// Like [`update`](Self::update), but applies the mutation only if the
    /// record still passes `check` at write time, under the same table lock.
    /// The rejected branch carries the unchanged record so the caller can
    /// report its actual state.
    pub async fn update_if(
        &self,
        id: &str,
        check: impl FnOnce(&T) -> bool,
        apply: impl FnOnce(&mut T),
    ) -> Result<GuardedUpdate<T>> {
        self.simulate_latency().await;
        let mut rows = self.rows.write();
        match rows.iter_mut().find(|r| r.id() == id) {
            Some(row) if check(row) => {
                apply(row);
                Ok(GuardedUpdate::Applied(row.clone()))
            }
            Some(row) => Ok(GuardedUpdate::Rejected(row.clone())),
            None => Err(Error::NotFound {
                collection: T::COLLECTION,
                id: id.to_string(),
            }),
        }
    }

    fn rows(&self) -> Vec<T> {
        self.rows.read().clone()
    }

    fn replace(&self, rows: Vec<T>) {
        *self.rows.write() = rows;
    }
}

/// Serialized form of the whole store: one named collection per entity type,
/// under the legacy browser-storage key names.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "caravan_users", default)]
    pub users: Vec<User>,
    #[serde(rename = "caravan_items", default)]
    pub caravans: Vec<Caravan>,
    #[serde(rename = "caravan_bookings", default)]
    pub bookings: Vec<Booking>,
    #[serde(rename = "caravan_payments", default)]
    pub payments: Vec<Payment>,
}

/// In-memory store with one collection per entity. Services receive it as an
/// injected `Arc<MemoryStore>`; there is no process-wide singleton.
pub struct MemoryStore {
    pub users: Collection<User>,
    pub caravans: Collection<Caravan>,
    pub bookings: Collection<Booking>,
    pub payments: Collection<Payment>,
}

impl MemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            users: Collection::new(config.latency),
            caravans: Collection::new(config.latency),
            bookings: Collection::new(config.latency),
            payments: Collection::new(config.latency),
        }
    }

    /// A store pre-populated with the demo host, guest, and listings.
    pub fn seeded(config: StoreConfig) -> Self {
        let store = Self::new(config);
        store.users.replace(vec![
            User {
                id: "user_1".to_string(),
                email: "host@test.com".to_string(),
                credential: "password".to_string(),
                role: Role::Host,
                name: "John Host".to_string(),
                trust_score: 4.8,
                verified: false,
            },
            User {
                id: "user_2".to_string(),
                email: "guest@test.com".to_string(),
                credential: "password".to_string(),
                role: Role::Guest,
                name: "Jane Guest".to_string(),
                trust_score: 4.5,
                verified: false,
            },
        ]);
        store.caravans.replace(vec![
            Caravan {
                id: "caravan_1".to_string(),
                host_id: "user_1".to_string(),
                title: "Vintage Airstream in the Woods".to_string(),
                description: "Restored 1970s Airstream in a private forest clearing."
                    .to_string(),
                location: "Portland, OR".to_string(),
                price_per_night: 12_000,
                capacity: 2,
                status: CaravanStatus::Available,
                rating: 4.9,
                review_count: 12,
            },
            Caravan {
                id: "caravan_2".to_string(),
                host_id: "user_1".to_string(),
                title: "Modern Camper Van with Ocean View".to_string(),
                description: "Fully equipped modern camper van by the beach.".to_string(),
                location: "Malibu, CA".to_string(),
                price_per_night: 20_000,
                capacity: 4,
                status: CaravanStatus::Available,
                rating: 4.7,
                review_count: 8,
            },
        ]);
        store
    }

    /// Copies every collection into a serializable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.rows(),
            caravans: self.caravans.rows(),
            bookings: self.bookings.rows(),
            payments: self.payments.rows(),
        }
    }

    /// Replaces all collections with the snapshot's contents.
    pub fn restore(&self, snapshot: Snapshot) {
        self.users.replace(snapshot.users);
        self.caravans.replace(snapshot.caravans);
        self.bookings.replace(snapshot.bookings);
        self.payments.replace(snapshot.payments);
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from(&self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        self.restore(serde_json::from_str(&json)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BookingStatus;
    use chrono::NaiveDate;

    fn sample_booking() -> Booking {
        Booking {
            id: String::new(),
            caravan_id: "caravan_1".to_string(),
            guest_id: "user_2".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
            status: BookingStatus::PendingPayment,
            total_price: 24_000,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_prefixed_unique_ids() {
        let store = MemoryStore::new(StoreConfig::instant());
        let a = store.bookings.insert(sample_booking()).await;
        let b = store.bookings.insert(sample_booking()).await;

        assert!(a.id.starts_with("booking_"));
        assert!(b.id.starts_with("booking_"));
        assert_ne!(a.id, b.id);
        assert_eq!(store.bookings.find_all().await.len(), 2);
    }

    #[tokio::test]
    async fn find_by_id_reports_not_found() {
        let store = MemoryStore::new(StoreConfig::instant());
        let err = store.bookings.find_by_id("booking_missing").await.unwrap_err();
        match err {
            Error::NotFound { collection, id } => {
                assert_eq!(collection, "caravan_bookings");
                assert_eq!(id, "booking_missing");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_applies_partial_mutation() {
        let store = MemoryStore::new(StoreConfig::instant());
        let booking = store.bookings.insert(sample_booking()).await;

        let updated = store
            .bookings
            .update(&booking.id, |b| b.status = BookingStatus::Confirmed)
            .await
            .unwrap();

        assert_eq!(updated.status, BookingStatus::Confirmed);
        // Other fields untouched.
        assert_eq!(updated.total_price, 24_000);

        let reread = store.bookings.find_by_id(&booking.id).await.unwrap();
        assert_eq!(reread.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn update_if_rejects_when_the_check_fails_at_write_time() {
        let store = MemoryStore::new(StoreConfig::instant());
        let booking = store.bookings.insert(sample_booking()).await;

        let first = store
            .bookings
            .update_if(
                &booking.id,
                |b| b.status == BookingStatus::PendingPayment,
                |b| b.status = BookingStatus::Confirmed,
            )
            .await
            .unwrap();
        assert!(matches!(
            first,
            GuardedUpdate::Applied(ref b) if b.status == BookingStatus::Confirmed
        ));

        // Same check again: the record moved on, so the write must not land
        // and the rejection carries the current state.
        let second = store
            .bookings
            .update_if(
                &booking.id,
                |b| b.status == BookingStatus::PendingPayment,
                |b| b.status = BookingStatus::Cancelled,
            )
            .await
            .unwrap();
        assert!(matches!(
            second,
            GuardedUpdate::Rejected(ref b) if b.status == BookingStatus::Confirmed
        ));
        assert_eq!(
            store.bookings.find_by_id(&booking.id).await.unwrap().status,
            BookingStatus::Confirmed
        );

        let err = store
            .bookings
            .update_if(
                "booking_missing",
                |_| true,
                |b| b.status = BookingStatus::Cancelled,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn seeded_store_has_demo_rows() {
        let store = MemoryStore::seeded(StoreConfig::instant());
        tokio_test::block_on(async {
            let host = store.users.find_by_id("user_1").await.unwrap();
            assert_eq!(host.role, Role::Host);
            let caravans = store.caravans.find_all().await;
            assert_eq!(caravans.len(), 2);
            assert!(caravans.iter().all(|c| c.host_id == "user_1"));
            assert!(caravans.iter().all(|c| c.price_per_night > 0));
        });
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_file() {
        let store = MemoryStore::seeded(StoreConfig::instant());
        store.bookings.insert(sample_booking()).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.save_to(&path).unwrap();

        // Collections land under the legacy storage key names.
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("caravan_users").is_some());
        assert!(raw.get("caravan_items").is_some());
        assert!(raw.get("caravan_bookings").is_some());
        assert!(raw.get("caravan_payments").is_some());

        let restored = MemoryStore::new(StoreConfig::instant());
        restored.load_from(&path).unwrap();
        assert_eq!(restored.users.find_all().await.len(), 2);
        assert_eq!(restored.bookings.find_all().await.len(), 1);
        assert_eq!(
            restored.bookings.find_all().await[0].status,
            BookingStatus::PendingPayment
        );
    }
}
