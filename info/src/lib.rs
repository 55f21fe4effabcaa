//! Build metadata attached to every log line.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REVISION: Option<&str> = option_env!("REVIEWS_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("REVIEWS_BUILD_TIMESTAMP");
