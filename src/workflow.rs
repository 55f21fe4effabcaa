use std::convert::TryFrom;

use log::{debug, error, info, o, warn};
use tokio::sync::watch;
use uuid::Uuid;

use crate::db::COLLECTION;
use crate::environment::Environment;
use crate::errors::ReviewError;
use crate::normalization::normalize_email;
use crate::review::{Review, ReviewDraft};
use crate::tracker::SubmissionRecord;

const CONNECTION_ERROR: &str = "Cannot connect to database. Please check your database configuration.";

/// Renders the thank-you line for a device that has submitted `count`
/// reviews. A count of zero means the count is unknown.
pub fn thank_you_message(count: u32) -> String {
    match count {
        0 => "Thank you for your review!".to_owned(),
        1 => "Thank you for your 1 review!".to_owned(),
        n => format!("Thank you for your {} reviews!", n),
    }
}

/// The outcome of a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    id: Uuid,
    count: u32,
}

impl SubmissionReceipt {
    /// The ID the store assigned to the new review.
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// How many reviews the store holds for this email, counting the
    /// new one, or zero if that could not be determined.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn message(&self) -> String {
        thank_you_message(self.count)
    }
}

/// What the review page shows. A fresh page is loading until its first
/// refresh completes.
#[derive(Clone, Debug, PartialEq)]
pub struct PageState {
    pub reviews: Vec<Review>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            reviews: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

/// The single entry point for the review page: it validates and
/// sequences submissions and keeps the list of reviews the page shows.
///
/// Both operations take `&mut self`, so a session can never have two
/// submissions in flight, and whichever refresh completes last decides
/// what `reviews` holds. Presentation code that needs to watch the page
/// while an operation is running reads it through [`ReviewWorkflow::view`].
pub struct ReviewWorkflow {
    environment: Environment,
    page: PageState,
    view: watch::Sender<PageState>,
    submission: SubmissionRecord,
}

impl ReviewWorkflow {
    /// Creates a workflow, restoring what this device remembers about
    /// earlier submissions. No reviews are loaded until `refresh`.
    pub fn new(environment: Environment) -> Self {
        let submission = environment.tracker.load();
        let page = PageState::default();
        let (view, _) = watch::channel(page.clone());

        ReviewWorkflow {
            environment,
            page,
            view,
            submission,
        }
    }

    /// A handle that sees every change to the page, including those made
    /// while `refresh` or `submit` is still running.
    pub fn view(&self) -> watch::Receiver<PageState> {
        self.view.subscribe()
    }

    /// The reviews from the last successful refresh.
    pub fn reviews(&self) -> &[Review] {
        &self.page.reviews
    }

    pub fn is_loading(&self) -> bool {
        self.page.loading
    }

    /// The page-level error to show, if any.
    pub fn error(&self) -> Option<&str> {
        self.page.error.as_deref()
    }

    /// The email and count remembered on this device.
    pub fn submission(&self) -> &SubmissionRecord {
        &self.submission
    }

    /// Reloads the approved reviews. On failure the previous reviews are
    /// kept and `error` explains what happened.
    pub async fn refresh(&mut self) {
        self.update(|page| {
            page.loading = true;
            page.error = None;
        });

        match self.fetch_reviews().await {
            Ok(reviews) => {
                debug!(self.environment.logger, "Loaded reviews"; "count" => reviews.len());
                self.update(|page| {
                    page.reviews = reviews;
                    page.loading = false;
                });
            }
            Err(e) => {
                error!(self.environment.logger, "Failed to load reviews"; "error" => ?e);
                let message = e.user_message().to_owned();
                self.update(|page| {
                    page.error = Some(message);
                    page.loading = false;
                });
            }
        }
    }

    /// Validates and stores a review, then remembers the submission on
    /// this device and reloads the list.
    ///
    /// The store is written at most once per call. Failing to count
    /// earlier submissions afterwards does not fail the call.
    pub async fn submit(&mut self, draft: ReviewDraft) -> Result<SubmissionReceipt, ReviewError> {
        draft.validate()?;

        let logger = self
            .environment
            .logger
            .new(o!("collection" => COLLECTION, "rating" => draft.rating.stars()));
        let repository = self.environment.repository.clone();
        let email = normalize_email(&draft.email);

        debug!(logger, "Writing review to store...");
        let id = repository.insert(draft).await.map_err(|e| {
            error!(logger, "Failed to save review"; "error" => ?e);
            e
        })?;

        let logger = logger.new(o!("review_id" => id.to_string()));

        debug!(logger, "Counting submissions for email...");
        let count = match repository.count_by_email(&email).await {
            Ok(count) => u32::try_from(count).unwrap_or(u32::MAX),
            Err(e) => {
                warn!(logger, "Failed to count submissions, assuming none"; "error" => ?e);
                0
            }
        };

        self.environment.tracker.save(&email, count);
        self.submission = SubmissionRecord {
            email: Some(email),
            count,
        };

        info!(logger, "Review submitted"; "count" => count);

        debug!(logger, "Reloading reviews...");
        self.refresh().await;

        Ok(SubmissionReceipt { id, count })
    }

    /// Probes the store. A failure sets the page-level error; a success
    /// clears it.
    pub async fn check_connection(&mut self) -> bool {
        match self.environment.repository.ping().await {
            Ok(()) => {
                debug!(self.environment.logger, "Store reachable");
                self.update(|page| page.error = None);
                true
            }
            Err(e) => {
                error!(self.environment.logger, "Store unreachable"; "error" => ?e);
                self.update(|page| page.error = Some(CONNECTION_ERROR.to_owned()));
                false
            }
        }
    }

    fn update(&mut self, change: impl FnOnce(&mut PageState)) {
        change(&mut self.page);
        self.view.send_replace(self.page.clone());
    }

    async fn fetch_reviews(&self) -> Result<Vec<Review>, ReviewError> {
        let config = self.environment.config;
        let mut attempt = 1;

        loop {
            match self
                .environment
                .repository
                .list_approved(config.page_size)
                .await
            {
                Ok(reviews) => return Ok(reviews),
                Err(e) if attempt < config.read_attempts => {
                    warn!(self.environment.logger, "Failed to load reviews, retrying"; "attempt" => attempt, "error" => %e);
                    attempt += 1;
                    tokio::time::sleep(config.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::thank_you_message;

    #[test]
    fn thank_you_messages_pluralize() {
        assert_eq!(thank_you_message(0), "Thank you for your review!");
        assert_eq!(thank_you_message(1), "Thank you for your 1 review!");
        assert_eq!(thank_you_message(4), "Thank you for your 4 reviews!");
    }
}
