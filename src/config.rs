use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::MAX_PAGE_SIZE;
use crate::environment::Config;
use crate::errors::ConfigError;

const DEFAULT_STORAGE_PATH: &str = ".reviews/local-storage.json";
const DEFAULT_READ_ATTEMPTS: u8 = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Returns the value of the named environment variable.
pub fn get_variable(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable {
        name: name.to_owned(),
    })
}

/// Parses the named environment variable, falling back to `default`
/// when it is not set.
pub fn get_optional_variable<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::InvalidVariable {
            name: name.to_owned(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Everything read from the environment at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Where the device-scoped key-value storage lives.
    pub storage_path: PathBuf,

    /// How the review workflow behaves.
    pub workflow: Config,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_path = get_optional_variable(
            "REVIEWS_STORAGE_PATH",
            PathBuf::from(DEFAULT_STORAGE_PATH),
        )?;

        let page_size: usize = get_optional_variable("REVIEWS_PAGE_SIZE", MAX_PAGE_SIZE)?;
        let read_attempts: u8 = get_optional_variable("REVIEWS_READ_ATTEMPTS", DEFAULT_READ_ATTEMPTS)?;
        let retry_delay: u64 = get_optional_variable("REVIEWS_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;

        Ok(Settings {
            storage_path,
            workflow: Config::new(page_size, read_attempts, Duration::from_millis(retry_delay)),
        })
    }

    /// The connection string of the review database. Only needed by
    /// commands that talk to it.
    pub fn connection_string() -> Result<String, ConfigError> {
        get_variable("REVIEWS_DB_CONNECTION_STRING")
    }
}

#[cfg(test)]
mod tests {
    use super::{get_optional_variable, get_variable};
    use crate::errors::ConfigError;

    // each test uses its own variable names, since tests share the
    // process environment
    #[test]
    fn missing_variables_are_reported() {
        assert!(matches!(
            get_variable("REVIEWS_TEST_SURELY_UNSET"),
            Err(ConfigError::MissingVariable { .. })
        ));
        assert_eq!(
            get_optional_variable("REVIEWS_TEST_SURELY_UNSET", 7u8).unwrap(),
            7
        );
    }

    #[test]
    fn invalid_variables_are_reported() {
        std::env::set_var("REVIEWS_TEST_PAGE_SIZE", "lots");

        assert!(matches!(
            get_optional_variable::<usize>("REVIEWS_TEST_PAGE_SIZE", 50),
            Err(ConfigError::InvalidVariable { .. })
        ));

        std::env::set_var("REVIEWS_TEST_PAGE_SIZE", " 20 ");

        assert_eq!(
            get_optional_variable::<usize>("REVIEWS_TEST_PAGE_SIZE", 50).unwrap(),
            20
        );
    }
}
