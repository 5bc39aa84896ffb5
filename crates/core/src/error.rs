use crate::source::{Collection, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum WardError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query against {collection} failed: {source}")]
    QueryFailure {
        collection: Collection,
        #[source]
        source: SourceError,
    },

    #[error("failed to decode {collection} row: {source}")]
    RowDecode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode update for {collection}: {source}")]
    RowEncode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("no {collection} record with MRN {mrn}")]
    RecordNotFound { collection: Collection, mrn: String },

    #[error("record source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
}

impl WardError {
    /// Wraps a source error raised while talking to `collection`.
    pub(crate) fn query(collection: Collection) -> impl FnOnce(SourceError) -> WardError {
        move |source| WardError::QueryFailure { collection, source }
    }
}

impl From<ward_types::TypeError> for WardError {
    fn from(err: ward_types::TypeError) -> Self {
        WardError::InvalidInput(err.to_string())
    }
}

pub type WardResult<T> = std::result::Result<T, WardError>;
