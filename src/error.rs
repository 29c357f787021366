use thiserror::Error;

/// Errors the core operations can return.
///
/// Reserved-name and identifier failures are raised before any statement is
/// sent, so a caller seeing one of these knows the database was not touched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not connect to {url}: {cause}")]
    Connection { url: String, cause: postgres::Error },

    #[error("'{0}' is reserved for the system (pg_*, rds_*) and cannot be modified")]
    ReservedName(String),

    #[error("unsafe identifier '{0}': only letters, digits and underscores are allowed and the first character must not be a digit")]
    InvalidIdentifier(String),

    #[error("{phase} failed for {target}: {cause}")]
    Statement {
        phase: &'static str,
        target: String,
        cause: anyhow::Error,
    },

    #[error("no {0} selected, at least one is required")]
    EmptySelection(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
