// Listing catalogue: creation by hosts, lookup, filtered search, and status
// updates.

use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Caravan, CaravanStatus, Role};
use crate::store::MemoryStore;

#[derive(Debug, Clone)]
pub struct NewListing {
    pub host_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price_per_night: i64,
    pub capacity: u32,
}

/// Search filters; every field is optional and `Some(0)` for a price bound
/// is a valid value, not "unset".
#[derive(Debug, Clone, Default)]
pub struct ListingFilters {
    /// Case-insensitive substring match against the listing location.
    pub location: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_capacity: Option<u32>,
}

pub struct ListingService {
    store: Arc<MemoryStore>,
}

impl ListingService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Creates a listing for a host. New listings start available and
    /// unrated.
    pub async fn create(&self, new: NewListing) -> Result<Caravan> {
        let host = self.store.users.find_by_id(&new.host_id).await?;
        if host.role != Role::Host {
            return Err(Error::RoleRequired(Role::Host));
        }
        if new.price_per_night <= 0 {
            return Err(Error::InvalidListing("price per night must be positive"));
        }
        if new.capacity == 0 {
            return Err(Error::InvalidListing("capacity must be positive"));
        }

        let caravan = self
            .store
            .caravans
            .insert(Caravan {
                id: String::new(),
                host_id: new.host_id,
                title: new.title,
                description: new.description,
                location: new.location,
                price_per_night: new.price_per_night,
                capacity: new.capacity,
                status: CaravanStatus::Available,
                rating: 0.0,
                review_count: 0,
            })
            .await;

        info!(caravan = %caravan.id, host = %caravan.host_id, "listing created");
        Ok(caravan)
    }

    pub async fn get(&self, caravan_id: &str) -> Result<Caravan> {
        self.store.caravans.find_by_id(caravan_id).await
    }

    pub async fn all(&self) -> Vec<Caravan> {
        self.store.caravans.find_all().await
    }

    /// Listings matching every provided filter.
    pub async fn search(&self, filters: &ListingFilters) -> Vec<Caravan> {
        let location = filters.location.as_ref().map(|l| l.to_lowercase());
        self.store
            .caravans
            .filter(|c| {
                if let Some(needle) = &location {
                    if !c.location.to_lowercase().contains(needle) {
                        return false;
                    }
                }
                if let Some(min) = filters.min_price {
                    if c.price_per_night < min {
                        return false;
                    }
                }
                if let Some(max) = filters.max_price {
                    if c.price_per_night > max {
                        return false;
                    }
                }
                if let Some(capacity) = filters.min_capacity {
                    if c.capacity < capacity {
                        return false;
                    }
                }
                true
            })
            .await
    }

    pub async fn set_status(&self, caravan_id: &str, status: CaravanStatus) -> Result<Caravan> {
        self.store
            .caravans
            .update(caravan_id, |c| c.status = status)
            .await
    }
}
