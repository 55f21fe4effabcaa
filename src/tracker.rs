use std::sync::Arc;

use log::{debug, warn, Logger};

use crate::storage::KeyValueStorage;

/// Key under which the last email used on this device is kept.
pub const EMAIL_KEY: &str = "review_submitted_email";

/// Key under which the number of reviews submitted from this device is
/// kept, as decimal text.
pub const COUNT_KEY: &str = "review_submission_count";

/// What this device remembers about its own submissions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub email: Option<String>,
    pub count: u32,
}

/// Remembers the last email and submission count for the thank-you
/// message. Nothing here is authoritative: failures are logged and
/// otherwise ignored.
pub struct SubmissionTracker {
    storage: Arc<dyn KeyValueStorage>,
    logger: Arc<Logger>,
}

impl SubmissionTracker {
    pub fn new(storage: Arc<dyn KeyValueStorage>, logger: Arc<Logger>) -> Self {
        SubmissionTracker { storage, logger }
    }

    pub fn load(&self) -> SubmissionRecord {
        let email = match self.storage.get(EMAIL_KEY) {
            Ok(Some(email)) if !email.is_empty() => email,
            Ok(_) => return SubmissionRecord::default(),
            Err(e) => {
                warn!(self.logger, "Failed to read remembered email"; "error" => %e);
                return SubmissionRecord::default();
            }
        };

        let count = match self.storage.get(COUNT_KEY) {
            Ok(raw) => raw.as_deref().map(parse_count).unwrap_or(0),
            Err(e) => {
                warn!(self.logger, "Failed to read submission count"; "error" => %e);
                0
            }
        };

        SubmissionRecord {
            email: Some(email),
            count,
        }
    }

    pub fn save(&self, email: &str, count: u32) {
        debug!(self.logger, "Remembering submission..."; "count" => count);

        let count = count.to_string();

        if let Err(e) = self
            .storage
            .set_all(&[(EMAIL_KEY, email), (COUNT_KEY, count.as_str())])
        {
            warn!(self.logger, "Failed to remember submission"; "error" => %e);
        }
    }
}

/// Reads the leading decimal digits after optional whitespace, the way
/// the count was always written and read; anything unreadable is zero.
fn parse_count(raw: &str) -> u32 {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();

    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{parse_count, SubmissionRecord, SubmissionTracker, COUNT_KEY, EMAIL_KEY};
    use crate::errors::StorageError;
    use crate::storage::{KeyValueStorage, MemoryStorage};

    /// Accepts the email but refuses to store a count.
    #[derive(Default)]
    struct CountRejectingStorage {
        inner: MemoryStorage,
    }

    impl KeyValueStorage for CountRejectingStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.set_all(&[(key, value)])
        }

        fn set_all(&self, updates: &[(&str, &str)]) -> Result<(), StorageError> {
            if updates.iter().any(|(key, _)| *key == COUNT_KEY) {
                return Err(StorageError::ReadOnly);
            }

            self.inner.set_all(updates)
        }
    }

    fn tracker() -> (Arc<MemoryStorage>, SubmissionTracker) {
        let storage = Arc::new(MemoryStorage::new());
        let tracker = SubmissionTracker::new(storage.clone(), Arc::new(log::discard()));

        (storage, tracker)
    }

    #[test]
    fn nothing_stored_loads_defaults() {
        let (_, tracker) = tracker();

        assert_eq!(tracker.load(), SubmissionRecord::default());
    }

    #[test]
    fn saved_records_load_back() {
        let (_, tracker) = tracker();

        tracker.save("amy@x.com", 3);

        assert_eq!(
            tracker.load(),
            SubmissionRecord {
                email: Some("amy@x.com".to_owned()),
                count: 3
            }
        );
    }

    #[test]
    fn unreadable_counts_are_zero() {
        let (storage, tracker) = tracker();
        storage.set(EMAIL_KEY, "amy@x.com").unwrap();

        for raw in &["", "abc", "-2", "99999999999999999999"] {
            storage.set(COUNT_KEY, raw).unwrap();
            assert_eq!(tracker.load().count, 0, "count {:?}", raw);
        }
    }

    #[test]
    fn counts_without_an_email_are_ignored() {
        let (storage, tracker) = tracker();
        storage.set(COUNT_KEY, "4").unwrap();

        assert_eq!(tracker.load(), SubmissionRecord::default());
    }

    #[test]
    fn write_failures_are_swallowed() {
        let (storage, tracker) = tracker();
        tracker.save("amy@x.com", 1);
        storage.set_read_only(true);

        tracker.save("bob@x.com", 7);

        assert_eq!(tracker.load().email.as_deref(), Some("amy@x.com"));
        assert_eq!(tracker.load().count, 1);
    }

    #[test]
    fn email_and_count_are_never_saved_apart() {
        let storage = Arc::new(CountRejectingStorage::default());
        storage.inner.set(EMAIL_KEY, "amy@x.com").unwrap();
        storage.inner.set(COUNT_KEY, "1").unwrap();
        let tracker = SubmissionTracker::new(storage.clone(), Arc::new(log::discard()));

        tracker.save("bob@x.com", 7);

        assert_eq!(
            tracker.load(),
            SubmissionRecord {
                email: Some("amy@x.com".to_owned()),
                count: 1
            }
        );
    }

    #[test]
    fn counts_parse_like_the_browser_did() {
        assert_eq!(parse_count("3"), 3);
        assert_eq!(parse_count("  12"), 12);
        assert_eq!(parse_count("5 reviews"), 5);
        assert_eq!(parse_count("x5"), 0);
    }
}
