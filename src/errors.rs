use std::io;

use thiserror::Error;

use crate::types::CollectionName;

/// Error type for backend, decoding, configuration, and map failures.
#[derive(Debug, Error)]
pub enum LeadsError {
    /// The backend could not be reached or its response not read.
    #[error("backend for '{collection}' is unavailable: {reason}")]
    BackendUnavailable {
        /// Collection being read.
        collection: CollectionName,
        /// Transport failure description.
        reason: String,
    },
    /// The backend answered with a non-success status.
    #[error("backend for '{collection}' rejected the request with status {status}: {body}")]
    BackendRejected {
        /// Collection being read.
        collection: CollectionName,
        /// HTTP status code.
        status: u16,
        /// Response body, usually a PostgREST error object.
        body: String,
    },
    /// A response or one of its rows could not be decoded.
    #[error("failed decoding rows from '{collection}': {details}")]
    Decode {
        /// Collection being read.
        collection: CollectionName,
        /// Parser message, prefixed with the row index when known.
        details: String,
    },
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The device capability check failed.
    #[error("capability probe failed: {0}")]
    Probe(String),
    /// Map backend failure.
    #[error(transparent)]
    Map(#[from] MapError),
    /// Filesystem failure reading a record dump.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure reported by a map rendering backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapError {
    /// The map instance could not be created.
    #[error("map could not be created on container '{container}': {reason}")]
    Create {
        /// Container the map was bound to.
        container: String,
        /// Backend failure description.
        reason: String,
    },
    /// One marker could not be placed.
    #[error("marker for record '{record_id}' could not be created: {reason}")]
    Marker {
        /// Record the marker stands for.
        record_id: String,
        /// Backend failure description.
        reason: String,
    },
    /// The map reported an error after creation.
    #[error("map runtime error: {0}")]
    Runtime(String),
}
