//! Attribute Database Error Hierarchy
//!
//! Registration-time and infrastructure failures are `Error`s. Failures caused by a
//! remote controller (unknown ids, permission violations, bad values) are never
//! errors: they travel back to the protocol layer as [`crate::StatusCode`]s.

use config::ConfigError;

use crate::Format;
use crate::HapType;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Accessory tree construction failures
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Durable storage failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Value coercion and decoding failures
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Attribute payload rendering failures
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Unrecoverable failures; the tree must not be served
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Accessory id 0 is reserved
    #[error("Accessory id 0 is reserved")]
    InvalidAccessoryId,

    /// Accessory id reused; breaks instance-id stability
    #[error("Accessory id {aid} is already registered")]
    DuplicateIdentity { aid: u32 },

    /// No capacity left for another accessory or instance id
    #[error("Out of resource: {what} (limit {limit})")]
    OutOfResource { what: &'static str, limit: u64 },

    #[error("Accessory {aid} not found")]
    AccessoryNotFound { aid: u32 },

    #[error("Service handle {0} does not resolve")]
    ServiceNotFound(usize),

    #[error("Unknown characteristic type {0}")]
    UnknownCharacteristic(String),

    #[error("Unknown service type {0}")]
    UnknownService(String),

    /// Instance ids may only be renumbered before the tree is served
    #[error("Instance ids cannot be reset after the tree is finalized")]
    AlreadyFinalized,

    #[error("Instance id {requested} for accessory {aid} would repeat an id already assigned (last {last})")]
    InstanceIdConflict { aid: u32, requested: u32, last: u32 },

    #[error("Service link {from} -> {to} would dangle")]
    DanglingLink { from: usize, to: usize },

    #[error("Accessory {aid}: {reason}")]
    MissingIdentification { aid: u32, reason: &'static str },

    /// Durable keys only carry the low 12 bits of the instance id
    #[error("Characteristic {aid}.{iid} cannot be durable: instance id exceeds 0xFFF")]
    NotDurable { aid: u32, iid: u32 },

    #[error("Characteristic type {type_id} with format {format:?} does not support a range")]
    RangeNotSupported { type_id: HapType, format: Format },

    #[error("Characteristic type {type_id} with format {format:?} does not support valid values")]
    ValidValuesNotSupported { type_id: HapType, format: Format },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Embedded database errors
    #[error(transparent)]
    SledError(#[from] sled::Error),

    /// Serialization failures for persisted records
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Stored bytes cannot be decoded for the expected format
    #[error("Data corruption detected at {key}: {reason}")]
    DataCorruption { key: String, reason: String },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValueError {
    #[error("Expected a {expected:?} value, got {found}")]
    FormatMismatch { expected: Format, found: &'static str },

    #[error("{value} cannot be represented as {format:?}")]
    Unrepresentable { format: Format, value: String },

    #[error("Malformed {format:?} value: {reason}")]
    InvalidEncoding { format: Format, reason: String },
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Storage(StorageError::SledError(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Storage(StorageError::BincodeError(e))
    }
}
