use thiserror::Error;

use crate::domain::VariantId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Cart and reservation admission errors.
///
/// These are the recoverable, shopper-facing failures: the caller always
/// receives the current true availability so it can self-correct without
/// polling.
#[derive(Error, Debug, Clone)]
pub enum CartError {
    /// The requested quantity exceeds the effective available stock.
    ///
    /// Never retried automatically; the shopper must choose a lower quantity.
    #[error("requested {requested} exceeds available stock ({available})")]
    InsufficientStock { requested: u32, available: u32 },

    /// The variant does not exist in the catalog.
    #[error("variant not found: {variant}")]
    VariantNotFound { variant: VariantId },

    /// Quantity deltas must be positive on the add path.
    #[error("invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },
}

/// Checkout commit errors.
#[derive(Error, Debug, Clone)]
pub enum CheckoutError {
    /// Checkout entered with an empty cart snapshot.
    #[error("cart is empty")]
    EmptyCart,

    /// Stock changed between reservation and commit revalidation.
    ///
    /// Aborts the entire checkout; no partial orders.
    #[error("stock changed for {variant}: only {available} available")]
    StockChanged { variant: VariantId, available: u32 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}
