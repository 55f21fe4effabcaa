use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{BoxFuture, FutureExt};
use time::{Duration, OffsetDateTime};
use tokio::sync::Notify;
use uuid::Uuid;

use super::{clamp_limit, Repository};
use crate::errors::{ReviewError, StoreError};
use crate::normalization::normalize_email;
use crate::review::{Review, ReviewDraft};

/// Which operations of a [`MockRepository`] should fail as if the
/// store were unreachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct Failures {
    pub insert: bool,
    pub count: bool,
    pub list: bool,
    pub ping: bool,
}

impl Failures {
    pub fn everything() -> Self {
        Failures {
            insert: true,
            count: true,
            list: true,
            ping: true,
        }
    }
}

/// An in-memory review store. Its clock starts at a fixed instant and
/// advances one second per stored review, so creation times are
/// strictly increasing.
pub struct MockRepository {
    documents: RwLock<Vec<Review>>,
    writes: RwLock<Vec<ReviewDraft>>,
    failures: RwLock<Failures>,
    read_gate: RwLock<Option<Arc<Notify>>>,
    epoch: OffsetDateTime,
    ticks: AtomicI64,
    calls: AtomicUsize,
}

impl Default for MockRepository {
    fn default() -> Self {
        MockRepository {
            documents: RwLock::default(),
            writes: RwLock::default(),
            failures: RwLock::default(),
            read_gate: RwLock::default(),
            epoch: OffsetDateTime::unix_epoch() + Duration::days(20_000),
            ticks: AtomicI64::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document directly, bypassing the write log and failure
    /// injection.
    pub fn seed(&self, draft: ReviewDraft, approved: bool) -> Uuid {
        let id = Uuid::new_v4();
        let review = Review::new(id, self.now(), draft.normalized(), approved);

        write(&self.documents).push(review);

        id
    }

    /// Sets which operations fail from now on.
    pub fn fail(&self, failures: Failures) {
        *write(&self.failures) = failures;
    }

    /// Makes every later `list_approved` wait for a permit on the
    /// returned handle before answering.
    pub fn hold_reads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *write(&self.read_gate) = Some(gate.clone());

        gate
    }

    /// The drafts received by `insert`, as they were written.
    pub fn written(&self) -> Vec<ReviewDraft> {
        read(&self.writes).clone()
    }

    /// Every stored document, in insertion order.
    pub fn documents(&self) -> Vec<Review> {
        read(&self.documents).clone()
    }

    /// How many repository operations were invoked, failed or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn now(&self) -> OffsetDateTime {
        self.epoch + Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }

    fn record_call(&self) -> Failures {
        self.calls.fetch_add(1, Ordering::SeqCst);

        *read(&self.failures)
    }
}

impl Repository for MockRepository {
    fn insert(&self, draft: ReviewDraft) -> BoxFuture<Result<Uuid, ReviewError>> {
        mock_insert(self, draft).boxed()
    }

    fn count_by_email(&self, email: &str) -> BoxFuture<Result<i64, ReviewError>> {
        mock_count_by_email(self, normalize_email(email)).boxed()
    }

    fn list_approved(&self, limit: usize) -> BoxFuture<Result<Vec<Review>, ReviewError>> {
        mock_list_approved(self, limit).boxed()
    }

    fn ping(&self) -> BoxFuture<Result<(), ReviewError>> {
        mock_ping(self).boxed()
    }
}

async fn mock_insert(store: &MockRepository, draft: ReviewDraft) -> Result<Uuid, ReviewError> {
    if store.record_call().insert {
        return Err(ReviewError::write(StoreError::Unreachable));
    }

    let draft = draft.normalized();
    let id = Uuid::new_v4();
    let review = Review::new(id, store.now(), draft.clone(), true);

    write(&store.writes).push(draft);
    write(&store.documents).push(review);

    Ok(id)
}

async fn mock_count_by_email(store: &MockRepository, email: String) -> Result<i64, ReviewError> {
    if store.record_call().count {
        return Err(ReviewError::read(StoreError::Unreachable));
    }

    let count = read(&store.documents)
        .iter()
        .filter(|review| review.email() == email)
        .count();

    Ok(count as i64)
}

async fn mock_list_approved(store: &MockRepository, limit: usize) -> Result<Vec<Review>, ReviewError> {
    let failures = store.record_call();

    let gate = read(&store.read_gate).clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }

    if failures.list {
        return Err(ReviewError::read(StoreError::Unreachable));
    }

    let mut approved: Vec<Review> = read(&store.documents)
        .iter()
        .filter(|review| review.is_approved())
        .cloned()
        .collect();

    approved.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
    approved.truncate(clamp_limit(limit));

    Ok(approved)
}

async fn mock_ping(store: &MockRepository) -> Result<(), ReviewError> {
    if store.record_call().ping {
        return Err(ReviewError::read(StoreError::Unreachable));
    }

    Ok(())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{Failures, MockRepository};
    use crate::db::{Repository, MAX_PAGE_SIZE};
    use crate::errors::ReviewError;
    use crate::review::{Rating, ReviewDraft};

    fn draft(n: usize) -> ReviewDraft {
        ReviewDraft::new(
            format!("Client {}", n),
            format!("client{}@example.com", n),
            Rating::default(),
            "Lovely photos",
        )
    }

    #[tokio::test]
    async fn listing_pushes_the_approval_filter_before_the_cap() {
        let store = MockRepository::new();

        for n in 0..60 {
            store.seed(draft(n), true);
        }

        for n in 60..65 {
            store.seed(draft(n), false);
        }

        let reviews = store.list_approved(100).await.unwrap();

        assert_eq!(reviews.len(), MAX_PAGE_SIZE);
        assert!(reviews.iter().all(|r| r.is_approved()));
        assert!(reviews
            .windows(2)
            .all(|pair| pair[0].created_at() > pair[1].created_at()));
        assert_eq!(reviews[0].name(), "Client 59");
    }

    #[tokio::test]
    async fn counting_matches_normalized_emails() {
        let store = MockRepository::new();

        store
            .insert(ReviewDraft::new("A", " Amy@X.com", Rating::default(), "x"))
            .await
            .unwrap();
        store
            .insert(ReviewDraft::new("A", "amy@x.com ", Rating::default(), "y"))
            .await
            .unwrap();

        assert_eq!(store.count_by_email("AMY@x.COM").await.unwrap(), 2);
        assert_eq!(store.count_by_email("bob@x.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_failures_map_to_the_right_errors() {
        let store = MockRepository::new();
        store.fail(Failures::everything());

        assert!(matches!(
            store.insert(draft(0)).await,
            Err(ReviewError::WriteFailure { .. })
        ));
        assert!(matches!(
            store.list_approved(10).await,
            Err(ReviewError::ReadFailure { .. })
        ));
        assert!(store.documents().is_empty());
        assert_eq!(store.calls(), 2);
    }
}
