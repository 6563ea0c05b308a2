use thiserror::Error;

/// Terminal outcomes of a wait that did not succeed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("Wait time out")]
    TimedOut,

    #[error("Wait cancel")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load environment config: {0}")]
    EnvConfig(#[source] envy::Error),

    #[error("Invalid config value for '{0}': {1}")]
    InvalidConfig(&'static str, String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<envy::Error> for Error {
    fn from(err: envy::Error) -> Self {
        Error::EnvConfig(err)
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
