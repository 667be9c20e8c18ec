//! Loading/error bookkeeping shared by the stores.

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use crate::error::ClientError;

/// Observable progress of a store's most recent operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// An operation is in flight.
    pub loading: bool,
    /// Failure of the most recent operation, cleared when the next one starts.
    pub error: Option<ClientError>,
}

#[derive(Debug, Default)]
pub(crate) struct StatusCell(RwLock<StoreStatus>);

impl StatusCell {
    pub(crate) fn snapshot(&self) -> StoreStatus {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn begin(&self) {
        let mut status = self.0.write().unwrap_or_else(PoisonError::into_inner);
        status.loading = true;
        status.error = None;
    }

    pub(crate) fn finish(&self, error: Option<&ClientError>) {
        let mut status = self.0.write().unwrap_or_else(PoisonError::into_inner);
        status.loading = false;
        status.error = error.cloned();
    }

    pub(crate) fn clear_error(&self) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).error = None;
    }

    /// Run `operation`, recording its progress and outcome.
    pub(crate) async fn track<T, F>(&self, operation: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        self.begin();
        let result = operation.await;
        self.finish(result.as_ref().err());
        result
    }
}
