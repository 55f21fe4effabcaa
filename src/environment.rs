use std::sync::Arc;
use std::time::Duration;

use log::Logger;

use crate::db::{clamp_limit, Repository};
use crate::tracker::SubmissionTracker;

pub type SafeRepository = dyn Repository + Send + Sync;

/// The collaborators a review workflow is built from.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub repository: Arc<SafeRepository>,
    pub tracker: Arc<SubmissionTracker>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        repository: Arc<SafeRepository>,
        tracker: Arc<SubmissionTracker>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            repository,
            tracker,
            config,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// How many reviews a refresh asks for. Never more than 50.
    pub(crate) page_size: usize,

    /// How many times a refresh tries to read before giving up.
    /// Writes are never retried.
    pub(crate) read_attempts: u8,

    /// How long to wait between read attempts.
    pub(crate) retry_delay: Duration,
}

impl Config {
    pub fn new(page_size: usize, read_attempts: u8, retry_delay: Duration) -> Self {
        Self {
            page_size: clamp_limit(page_size).max(1),
            read_attempts: read_attempts.max(1),
            retry_delay,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn read_attempts(&self) -> u8 {
        self.read_attempts
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(crate::db::MAX_PAGE_SIZE, 1, Duration::from_millis(250))
    }
}
