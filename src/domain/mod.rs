pub mod account;
pub mod entry;
pub mod error;
pub mod operation;
pub mod traits;

pub use account::{Account, AccountId};
pub use entry::{EntryId, EntryKind, EntryStatus, LedgerEntry};
pub use error::{AmountError, Error};
pub use operation::Operation;
pub use traits::{BalanceDelta, BalanceStore, CounterEffect, LedgerJournal, OperationStream, Page};
