use core::fmt;

use rust_decimal::Decimal;

use crate::domain::{AccountId, EntryId};

/// One parsed ledger instruction, as produced by the ingestion layer and
/// consumed by the settlement engine's process loop.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Register an account, seeding it with the platform starting balance
    /// unless an explicit one is given.
    Open {
        account: AccountId,
        starting_balance: Option<Decimal>,
    },
    /// Peer-to-peer transfer; fee-adjusted and settled atomically.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        note: Option<String>,
    },
    /// Payment for a completed service request; same pipeline as a transfer
    /// but recorded under its own entry kind.
    ServicePayment {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        note: Option<String>,
    },
    Deposit {
        admin: AccountId,
        account: AccountId,
        amount: Decimal,
        reason: String,
    },
    Withdraw {
        admin: AccountId,
        account: AccountId,
        amount: Decimal,
        reason: String,
    },
    /// Cancel a completed entry. `refund` restores the pre-transfer balances;
    /// without it only the status changes (acknowledged disputes).
    Reverse {
        admin: AccountId,
        entry: EntryId,
        reason: String,
        refund: bool,
    },
    Suspend {
        admin: AccountId,
        account: AccountId,
        reason: String,
    },
    Reactivate {
        admin: AccountId,
        account: AccountId,
        reason: String,
    },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Open { account, .. } => write!(f, "open,account={account}"),
            Operation::Transfer { from, to, amount, .. } => {
                write!(f, "transfer,from={from},to={to},amount={amount}")
            }
            Operation::ServicePayment { from, to, amount, .. } => {
                write!(f, "service,from={from},to={to},amount={amount}")
            }
            Operation::Deposit { account, amount, .. } => {
                write!(f, "deposit,account={account},amount={amount}")
            }
            Operation::Withdraw { account, amount, .. } => {
                write!(f, "withdraw,account={account},amount={amount}")
            }
            Operation::Reverse { entry, refund, .. } => {
                write!(f, "reverse,entry={entry},refund={refund}")
            }
            Operation::Suspend { account, .. } => write!(f, "suspend,account={account}"),
            Operation::Reactivate { account, .. } => write!(f, "reactivate,account={account}"),
        }
    }
}
