//! Time-credit ledger core: fee policy, balance store, append-only journal,
//! transfer settlement and admin reversal.
//!
//! The engine validates a transfer, quotes the fee, applies the balance
//! mutations as one all-or-nothing batch and appends a completed ledger
//! entry; admins can mint, burn and reverse. Callers either drive individual
//! operations or feed a whole CSV stream through [`SettlementEngine::process`].

pub mod audit;
pub mod domain;
pub mod engine;
pub mod fees;
pub mod ingestion;
pub mod output;
pub mod store;

pub use audit::{AuditAction, AuditEvent, AuditSink, Notification, NotificationSink, TracingAuditSink, TracingNotifier};
pub use engine::{SettlementEngine, SettlementReceipt};
pub use fees::{FeeBreakdown, FeeConfig, FeePolicy, LedgerConfig};
pub use ingestion::CsvReader;
pub use store::{InMemoryBalances, InMemoryJournal};
