//! Типы ошибок аллокатора

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: u64, available: u64 },

    #[error("Unknown hospital: {0}")]
    UnknownHospital(u32),

    #[error("Hospital already registered: {0}")]
    DuplicateHospital(u32),

    #[error("Unknown allocation policy: {0}")]
    PolicyUnknown(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AllocError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AllocError::InvalidInput(message.into())
    }
}
