// Registration and login against the user collection. Credentials are
// compared in plaintext; this is a simulated backend and hardening them is
// an explicit non-goal.

use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Role, User};
use crate::store::{MemoryStore, Record};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub credential: String,
    pub role: Role,
    pub name: String,
}

pub struct AuthService {
    store: Arc<MemoryStore>,
}

impl AuthService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Creates a user unless the email is already taken. New users start
    /// unverified with a zero trust score.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let taken = self
            .store
            .users
            .find(|u| u.email == new_user.email)
            .await
            .is_some();
        if taken {
            return Err(Error::DuplicateEmail(new_user.email));
        }

        let user = self
            .store
            .users
            .insert(User {
                id: String::new(),
                email: new_user.email,
                credential: new_user.credential,
                role: new_user.role,
                name: new_user.name,
                trust_score: 0.0,
                verified: false,
            })
            .await;

        info!(user = %user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    /// Looks the user up by email and compares the credential. Unknown email
    /// and wrong credential are distinct failures.
    pub async fn login(&self, email: &str, credential: &str) -> Result<User> {
        let user = self
            .store
            .users
            .find(|u| u.email == email)
            .await
            .ok_or_else(|| Error::NotFound {
                collection: User::COLLECTION,
                id: email.to_string(),
            })?;

        if user.credential != credential {
            return Err(Error::InvalidCredentials);
        }
        Ok(user)
    }
}
