//! Error types for `frontier_works`.
//!
//! Malformed record data never surfaces here; it degrades to defaults during
//! classification. These variants cover I/O at the edges and caller bugs such
//! as an unknown facet key.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown facet: {0:?}")]
    UnknownFacet(String),

    #[error("unknown range field: {0:?}")]
    UnknownRangeField(String),

    #[error("unknown quick filter: {0:?}")]
    UnknownQuickFilter(String),

    #[error("no saved filter named {0:?}")]
    UnknownSnapshot(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
