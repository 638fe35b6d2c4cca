use async_trait::async_trait;
use tracing::{debug, info};

use super::db::DbHandle;
use super::feed::{ChangeFeed, Subscription};
use super::storage::ObjectStore;
use super::{CaseBackend, CaseQuery};
use crate::cases::models::{CaseChange, CaseRecord};
use crate::errors::BackendError;

/// SQLite tables, filesystem buckets and an in-process change feed.
#[derive(Clone)]
pub struct LocalBackend {
    db: DbHandle,
    storage: ObjectStore,
    feed: ChangeFeed,
}

impl LocalBackend {
    pub fn new(db: DbHandle, storage: ObjectStore, feed: ChangeFeed) -> Self {
        Self { db, storage, feed }
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    pub fn storage(&self) -> &ObjectStore {
        &self.storage
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

#[async_trait]
impl CaseBackend for LocalBackend {
    async fn fetch_cases(&self, query: CaseQuery) -> Result<Vec<CaseRecord>, BackendError> {
        let cases = self
            .db
            .call(move |db| db.list_cases(&query))
            .await
            .map_err(BackendError::Database)?;
        debug!(count = cases.len(), "Fetched applications");
        Ok(cases)
    }

    async fn update_case_status(&self, id: &str, status: &str) -> Result<CaseRecord, BackendError> {
        let (case_id, new_status) = (id.to_string(), status.to_string());
        let (old, new) = self
            .db
            .call(move |db| {
                let old = db.get_case(&case_id)?;
                let new = match old {
                    Some(_) => db.update_case_status(&case_id, &new_status)?,
                    None => None,
                };
                Ok((old, new))
            })
            .await
            .map_err(BackendError::Database)?;

        let Some(new) = new else {
            return Err(BackendError::NotFound {
                table: "applications",
                id: id.to_string(),
            });
        };

        info!(
            application_id = %new.application_id,
            from = old.as_ref().map(|o| o.status.as_str()).unwrap_or_default(),
            to = %new.status,
            "Application status updated"
        );
        let delivered = self.feed.publish(CaseChange {
            old,
            new: new.clone(),
        });
        debug!(delivered, "Published application change");
        Ok(new)
    }

    fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }
}
