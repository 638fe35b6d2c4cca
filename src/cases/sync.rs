//! Live case list: initial fetch plus in-place merge of row updates.
//!
//! A [`ListSynchronizer`] owns the projected list for one mounted view.
//! [`LiveCaseList`] pairs it with a change subscription taken before the
//! initial fetch, so updates racing the fetch wait in the subscription
//! buffer instead of being lost.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::models::{CaseChange, DisplayRecord, Notification, Session};
use super::projector::project;
use crate::backend::{CaseBackend, CaseQuery, Subscription};
use crate::errors::BackendError;

/// Owner of one view's case list.
pub struct ListSynchronizer<B: ?Sized> {
    backend: Arc<B>,
    session: Session,
    records: Vec<DisplayRecord>,
    loading: bool,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<B: CaseBackend + ?Sized> ListSynchronizer<B> {
    pub fn new(
        backend: Arc<B>,
        session: Session,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            backend,
            session,
            records: Vec::new(),
            loading: true,
            notifications,
        }
    }

    pub fn records(&self) -> &[DisplayRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch the session's working list and replace the held records.
    ///
    /// On failure a destructive notification is raised and the previous list
    /// is kept. Loading is cleared either way.
    pub async fn initialize(&mut self) -> Result<&[DisplayRecord], BackendError> {
        self.loading = true;
        let result = self
            .backend
            .fetch_cases(CaseQuery::for_session(&self.session))
            .await;
        self.loading = false;

        match result {
            Ok(cases) => {
                let session = &self.session;
                self.records = cases.into_iter().map(|c| project(c, session)).collect();
                debug!(count = self.records.len(), "Application list loaded");
                Ok(&self.records)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch applications");
                self.notify(Notification::fetch_failed());
                Err(e)
            }
        }
    }

    /// Merge a row update into the list in place.
    ///
    /// Returns the index of the replaced entry, or `None` when the row is not
    /// in the list. A status change raises one notification.
    pub fn on_remote_update(&mut self, change: &CaseChange) -> Option<usize> {
        let updated = &change.new;
        let Some(index) = self.records.iter().position(|r| r.id() == updated.id) else {
            debug!(id = %updated.id, "Ignoring update for application not in list");
            return None;
        };

        let previous_status = std::mem::take(&mut self.records[index].case.status);
        self.records[index] = project(updated.clone(), &self.session);

        if previous_status != updated.status {
            self.notify(Notification::status_changed(
                &updated.application_id,
                &updated.status,
            ));
        }
        Some(index)
    }

    fn notify(&self, notification: Notification) {
        // the view may already be gone
        let _ = self.notifications.send(notification);
    }
}

/// An update applied to a [`LiveCaseList`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListUpdate {
    pub index: usize,
    pub record: DisplayRecord,
}

/// A mounted case list: synchronizer plus its change subscription.
///
/// Dropping the value unsubscribes.
pub struct LiveCaseList<B: ?Sized> {
    sync: ListSynchronizer<B>,
    subscription: Subscription,
}

impl<B: CaseBackend + ?Sized> LiveCaseList<B> {
    /// Subscribe, then load the initial list.
    pub async fn mount(
        backend: Arc<B>,
        session: Session,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let subscription = backend.subscribe();
        let mut sync = ListSynchronizer::new(backend, session, notifications);
        // failure is already surfaced as a notification
        let _ = sync.initialize().await;
        Self { sync, subscription }
    }

    pub fn records(&self) -> &[DisplayRecord] {
        self.sync.records()
    }

    pub fn is_loading(&self) -> bool {
        self.sync.is_loading()
    }

    /// Wait for the next change that touches this list and apply it.
    /// Returns `None` once the feed is closed. Cancel-safe.
    pub async fn next_update(&mut self) -> Option<ListUpdate> {
        loop {
            let change = self.subscription.next().await?;
            if let Some(index) = self.sync.on_remote_update(&change) {
                return Some(ListUpdate {
                    index,
                    record: self.sync.records()[index].clone(),
                });
            }
        }
    }

    /// Stop receiving updates.
    pub fn unmount(mut self) {
        self.subscription.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChangeFeed;
    use crate::cases::models::{CaseRecord, NotificationKind};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeBackend {
        rows: Mutex<Vec<CaseRecord>>,
        fail: AtomicBool,
        feed: ChangeFeed,
        last_query: Mutex<Option<CaseQuery>>,
    }

    impl FakeBackend {
        fn with_rows(rows: Vec<CaseRecord>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                fail: AtomicBool::new(false),
                feed: ChangeFeed::new(16),
                last_query: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CaseBackend for FakeBackend {
        async fn fetch_cases(&self, query: CaseQuery) -> Result<Vec<CaseRecord>, BackendError> {
            *self.last_query.lock().unwrap() = Some(query);
            if self.fail.load(Ordering::SeqCst) {
                return Err(BackendError::Database(anyhow::anyhow!("offline")));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn update_case_status(
            &self,
            id: &str,
            status: &str,
        ) -> Result<CaseRecord, BackendError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| BackendError::NotFound {
                    table: "applications",
                    id: id.to_string(),
                })?;
            let old = row.clone();
            row.status = status.to_string();
            self.feed.publish(CaseChange {
                old: Some(old),
                new: row.clone(),
            });
            Ok(row.clone())
        }

        fn subscribe(&self) -> Subscription {
            self.feed.subscribe()
        }
    }

    fn row(id: &str, status: &str) -> CaseRecord {
        CaseRecord {
            id: id.into(),
            application_id: format!("LO-{id}"),
            borrower_name: "Anita".into(),
            bank_name: "HDFC Bank".into(),
            branch_name: None,
            loan_amount: 1_640_000.0,
            loan_type: "home".into(),
            application_type: "legal_opinion".into(),
            status: status.into(),
            submission_date: None,
            created_at: DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z").unwrap(),
            assigned_to_username: Some("bob".into()),
            original_assigned_to_username: Some("alice".into()),
            office_branch: None,
            digital_signature_applied: false,
        }
    }

    fn changed(mut record: CaseRecord, status: &str) -> CaseChange {
        let old = record.clone();
        record.status = status.into();
        CaseChange {
            old: Some(old),
            new: record,
        }
    }

    #[tokio::test]
    async fn test_initialize_projects_rows() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review"), row("2", "redirected")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend.clone(), Session::employee("alice"), tx);
        assert!(sync.is_loading());

        let records = sync.initialize().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, "₹16,40,000");
        assert_eq!(records[1].display_status, "redirected to bob");
        assert!(!sync.is_loading());

        let query = backend.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query, CaseQuery::for_session(&Session::employee("alice")));
    }

    #[tokio::test]
    async fn test_initialize_failure_keeps_list_and_notifies() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend.clone(), Session::admin(), tx);
        sync.initialize().await.unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        assert!(sync.initialize().await.is_err());
        assert_eq!(sync.records().len(), 1);
        assert!(!sync.is_loading());

        let n = rx.try_recv().unwrap();
        assert_eq!(n.kind, NotificationKind::Destructive);
        assert_eq!(n.description, "Failed to fetch applications");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_update_splices_in_place_and_notifies_once() {
        let backend = FakeBackend::with_rows(vec![
            row("1", "to_be_assigned"),
            row("2", "in_review"),
            row("3", "in_review"),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend, Session::admin(), tx);
        sync.initialize().await.unwrap();

        let index = sync.on_remote_update(&changed(row("2", "in_review"), "completed"));
        assert_eq!(index, Some(1));

        let ids: Vec<&str> = sync.records().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(sync.records()[1].case.status, "completed");
        assert_eq!(sync.records()[1].status_label, "Completed");

        let n = rx.try_recv().unwrap();
        assert_eq!(n.description, "Application LO-2 is now completed.");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_update_without_status_change_is_quiet() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend, Session::admin(), tx);
        sync.initialize().await.unwrap();

        let mut update = row("1", "in_review");
        update.borrower_name = "Anita Rao".into();
        let index = sync.on_remote_update(&CaseChange {
            old: None,
            new: update,
        });
        assert_eq!(index, Some(0));
        assert_eq!(sync.records()[0].case.borrower_name, "Anita Rao");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_update_for_unknown_row_is_ignored() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend, Session::admin(), tx);
        sync.initialize().await.unwrap();

        assert_eq!(sync.on_remote_update(&changed(row("9", "in_review"), "completed")), None);
        assert_eq!(sync.records().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remote_update_reprojects_for_viewer() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend, Session::employee("bob"), tx);
        sync.initialize().await.unwrap();

        sync.on_remote_update(&changed(row("1", "in_review"), "redirected"));
        assert_eq!(sync.records()[0].display_status, "in_review");
    }

    #[tokio::test]
    async fn test_live_list_applies_backend_updates() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review"), row("2", "in_review")]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut live = LiveCaseList::mount(backend.clone(), Session::admin(), tx).await;
        assert_eq!(live.records().len(), 2);
        assert!(!live.is_loading());

        backend.update_case_status("2", "completed").await.unwrap();
        let update = live.next_update().await.unwrap();
        assert_eq!(update.index, 1);
        assert_eq!(update.record.case.status, "completed");
        assert_eq!(live.records()[1].case.status, "completed");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_live_list_skips_foreign_rows() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut live = LiveCaseList::mount(backend.clone(), Session::admin(), tx).await;

        backend.feed.publish(changed(row("7", "in_review"), "completed"));
        backend.update_case_status("1", "rejected").await.unwrap();

        let update = live.next_update().await.unwrap();
        assert_eq!(update.record.id(), "1");
    }

    #[tokio::test]
    async fn test_live_list_keeps_updates_that_race_the_fetch() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let subscription = backend.subscribe();
        // delivered before the list has loaded
        backend.feed.publish(changed(row("1", "in_review"), "completed"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend.clone(), Session::admin(), tx);
        sync.initialize().await.unwrap();
        let mut live = LiveCaseList { sync, subscription };

        let update = live.next_update().await.unwrap();
        assert_eq!(update.record.case.status, "completed");
        assert_eq!(rx.try_recv().unwrap().description, "Application LO-1 is now completed.");
    }

    #[tokio::test]
    async fn test_unmount_unsubscribes() {
        let backend = FakeBackend::with_rows(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let live = LiveCaseList::mount(backend.clone(), Session::admin(), tx).await;
        assert_eq!(backend.feed.subscriber_count(), 1);
        live.unmount();
        assert_eq!(backend.feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_notifications_after_view_gone_are_dropped() {
        let backend = FakeBackend::with_rows(vec![row("1", "in_review")]);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sync = ListSynchronizer::new(backend, Session::admin(), tx);
        sync.initialize().await.unwrap();
        drop(rx);
        assert_eq!(sync.on_remote_update(&changed(row("1", "in_review"), "completed")), Some(0));
    }
}
