// Error types for genesis loading, candidate lists and reconciliation

use alloy_primitives::Address;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A value that should be a 20-byte address could not be parsed.
    #[error("malformed address {value:?} in {source_list}: {reason}")]
    MalformedAddress {
        value: String,
        source_list: String,
        reason: String,
    },

    /// A value that should be a 32-byte storage key could not be parsed.
    #[error("malformed storage key {value:?} in {source_list}: {reason}")]
    MalformedStorageKey {
        value: String,
        source_list: String,
        reason: String,
    },

    /// An alloc entry's balance, nonce, code or storage word did not parse.
    #[error("malformed {field} {value:?} in alloc entry {owner}: {reason}")]
    MalformedAccountField {
        owner: String,
        field: String,
        value: String,
        reason: String,
    },

    #[error("{0}: genesis has no alloc")]
    MissingAlloc(String),

    #[error("genesis alloc has no entry for contract {0:#x}")]
    MissingContract(Address),

    #[error("genesis alloc entry for contract {0:#x} has no storage")]
    MissingStorage(Address),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReconcileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
