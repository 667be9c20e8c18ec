//! Admin user directory.

use std::sync::{PoisonError, RwLock};

use tracing::{info, instrument};

use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::gateway::wire::UserListEnvelope;
use crate::models::UserAccount;
use crate::status::{StatusCell, StoreStatus};

/// Accounts listed on the admin users page.
pub struct UserDirectory {
    gateway: Gateway,
    users: RwLock<Vec<UserAccount>>,
    status: StatusCell,
}

impl UserDirectory {
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            users: RwLock::new(Vec::new()),
            status: StatusCell::default(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StoreStatus {
        self.status.snapshot()
    }

    /// Last fetched accounts.
    #[must_use]
    pub fn users(&self) -> Vec<UserAccount> {
        self.users.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Accounts whose username or email contains `search`, ignoring case.
    #[must_use]
    pub fn filtered(&self, search: &str) -> Vec<UserAccount> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|user| user.matches(search))
            .cloned()
            .collect()
    }

    /// Reload the directory. The previous list is kept on failure.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` when the caller is not an admin,
    /// and the mapped gateway error otherwise.
    #[instrument(skip(self))]
    pub async fn fetch_users(&self) -> Result<Vec<UserAccount>, ClientError> {
        self.status
            .track(async {
                let envelope: UserListEnvelope = self.gateway.get(&["users"], &[]).await?;
                let users = Vec::<UserAccount>::from(envelope);
                info!(count = users.len(), "user directory loaded");
                *self.users.write().unwrap_or_else(PoisonError::into_inner) = users.clone();
                Ok(users)
            })
            .await
    }
}
