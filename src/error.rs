use thiserror::Error;

use crate::charge_limit::ChargeLimit;
use crate::service::PersistError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("only Apple silicon Macs are supported")]
    UnsupportedPlatform,

    #[error("must run as root")]
    InsufficientPrivilege,

    #[error("value must be either 80 or 100, got {0}")]
    InvalidLimit(i64),

    #[error("key code must be exactly 4 characters, got {0}")]
    InvalidKeyLength(usize),

    #[error("key code must be ASCII: {0:?}")]
    NonAsciiKey(String),

    #[error("controller driver not found")]
    DriverNotFound,

    #[error("failed to open controller connection (kern_return {0:#x})")]
    FailedToOpen(i32),

    #[error("key {0} not found on this controller")]
    KeyNotFound(String),

    #[error("controller driver rejected the call: not privileged")]
    NotPrivileged,

    #[error("unknown driver error (kern_return {transport:#x}, smc result {result})")]
    UnknownDriverError { transport: i32, result: u8 },

    #[error(transparent)]
    Persistence(#[from] PersistError),

    #[error("charge limit set to {limit} but the persisted command was not updated: {source}")]
    PersistenceOutOfSync {
        limit: ChargeLimit,
        #[source]
        source: PersistError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
