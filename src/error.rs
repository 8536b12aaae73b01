use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Error {
    Config(config::ConfigError),
    StoreMigrateToLatestFailed(rusqlite_migration::Error),
    StoreOpenFailed(rusqlite::Error),
    StoreQueryFailed(rusqlite::Error),
    StoreResponderClosed,
    StoreUnavailable,
}

impl Error {
    /// Short machine-readable name, used as the `kind` of the gateway's error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::StoreMigrateToLatestFailed(_) | Self::StoreOpenFailed(_) => "store_startup",
            Self::StoreQueryFailed(_) => "store_failure",
            Self::StoreResponderClosed | Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match &*self {
            Self::Config(error) => write!(f, "Configuration could not be loaded: {}", error),
            Self::StoreMigrateToLatestFailed(error) => {
                write!(
                    f,
                    "The store schema could not be brought to the latest version: {}",
                    error
                )
            }
            Self::StoreOpenFailed(error) => write!(f, "The SQLite database could not be opened: {}", error),
            Self::StoreQueryFailed(error) => write!(f, "The store query failed: {}", error),
            Self::StoreResponderClosed => {
                write!(f, "The store dropped the request before responding")
            }
            Self::StoreUnavailable => write!(f, "The store thread is no longer running"),
        }?;
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Self::StoreQueryFailed(error)
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(error: rusqlite_migration::Error) -> Self {
        Self::StoreMigrateToLatestFailed(error)
    }
}
