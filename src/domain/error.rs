use rust_decimal::Decimal;

use crate::domain::{AccountId, EntryId};

/// Reason an amount failed validation against the fee policy bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("minimum transfer amount is {min} hours")]
    BelowMinimum { min: Decimal },

    #[error("maximum transfer amount is {max} hours")]
    AboveMaximum { max: Decimal },

    #[error("not a valid number")]
    NotANumber,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid amount: {0}")]
    InvalidAmount(AmountError),

    #[error("cannot transfer time to yourself")]
    SelfTransferNotAllowed,

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account {0} is not active")]
    AccountInactive(AccountId),

    #[error("account {0} already exists")]
    AccountExists(AccountId),

    #[error(
        "insufficient balance: you need {shortfall} more hours (required {required}, available {available})"
    )]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("ledger entry {0} not found")]
    EntryNotFound(EntryId),

    #[error("ledger entry {entry} cannot be cancelled: {detail}")]
    EntryNotCancellable { entry: EntryId, detail: String },

    #[error("ledger entry {0} is already cancelled")]
    AlreadyCancelled(EntryId),

    #[error("a reason is required for admin actions")]
    ReasonRequired,

    #[error("invalid ledger entry: {0}")]
    InvalidEntry(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("ingestion failed: {0}")]
    Ingestion(String),
}
