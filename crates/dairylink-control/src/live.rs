//! Change-triggered views.
//!
//! A [`LiveView`] owns one background task. The task runs its query once,
//! then re-runs the full query every time a matching change notification
//! arrives (including "missed" notifications from a lagging subscription)
//! and publishes the result through a `watch` channel. Failed refreshes are
//! logged and the last good snapshot is kept. Dropping the view aborts the
//! task, so a refresh finishing after the view is gone is never observed.

use std::future::Future;
use std::sync::Arc;

use dairylink_store::{ChangeFilter, Notification, Subscription, Table};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::service::Coordinator;
use crate::stats::CollectionStats;
use crate::types::FarmerWithUnread;
use crate::viewer::Viewer;

/// A continuously refreshed query result.
#[derive(Debug)]
pub struct LiveView<T> {
    rx: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveView<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a view that runs `refresh` now and after every notification
    /// delivered to `subscription`.
    pub fn spawn<F, Fut>(mut subscription: Subscription, refresh: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            loop {
                match refresh().await {
                    Ok(value) => {
                        if tx.send(Some(value)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Live view refresh failed, keeping last snapshot");
                    }
                }

                match subscription.recv().await {
                    Some(Notification::Changed(event)) => {
                        tracing::debug!(table = ?event.table, kind = ?event.kind, "Refreshing live view");
                    }
                    Some(Notification::Missed { count }) => {
                        tracing::debug!(count, "Live view missed changes, refreshing");
                    }
                    None => break,
                }
            }
        });

        Self { rx, task }
    }

    /// The latest snapshot, if the first refresh has completed.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the view has stopped refreshing.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch a farmer's own statistics.
///
/// Refreshes on any collection change concerning the farmer.
#[must_use]
pub fn watch_stats<C>(coordinator: Arc<C>, viewer: Viewer) -> LiveView<CollectionStats>
where
    C: Coordinator + 'static,
{
    let filter = ChangeFilter::tables([Table::Collections]).concerning(viewer.profile_id());
    let subscription = coordinator.subscribe(filter);

    LiveView::spawn(subscription, move || {
        let coordinator = Arc::clone(&coordinator);
        let viewer = viewer.clone();
        async move { coordinator.my_stats(&viewer).await }
    })
}

/// Watch an agent's roster with unread counts.
///
/// Refreshes when a roster row or a message concerning the agent changes.
#[must_use]
pub fn watch_roster<C>(coordinator: Arc<C>, viewer: Viewer) -> LiveView<Vec<FarmerWithUnread>>
where
    C: Coordinator + 'static,
{
    let filter =
        ChangeFilter::tables([Table::Farmers, Table::Messages]).concerning(viewer.profile_id());
    let subscription = coordinator.subscribe(filter);

    LiveView::spawn(subscription, move || {
        let coordinator = Arc::clone(&coordinator);
        let viewer = viewer.clone();
        async move { coordinator.list_roster(&viewer).await }
    })
}
