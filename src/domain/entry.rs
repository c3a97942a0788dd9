use core::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{AccountId, Error};

/// Journal-assigned entry identifier; ids are handed out in append order, so
/// they double as a creation-order key for history display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Transfer,
    ServicePayment,
    Adjustment,
    Refund,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Transfer => "transfer",
            EntryKind::ServicePayment => "service_payment",
            EntryKind::Adjustment => "adjustment",
            EntryKind::Refund => "refund",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Completed,
    Cancelled,
    Disputed,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Completed => "completed",
            EntryStatus::Cancelled => "cancelled",
            EntryStatus::Disputed => "disputed",
        };
        f.write_str(s)
    }
}

/// One immutable record of a balance-affecting event.
///
/// Once completed, only `status`, `cancelled_at` and `admin_note` may change
/// (on cancellation). Entries are never deleted.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Nominal amount, fee excluded. Always positive.
    pub amount: Decimal,
    /// Fee collected at settlement time; zero for non-transfer kinds.
    pub fee_amount: Decimal,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub note: Option<String>,
    pub admin_note: Option<String>,
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// A completed entry as produced by the settlement engine. The journal
    /// assigns the real id on append.
    pub fn completed(
        kind: EntryKind,
        from_account: AccountId,
        to_account: AccountId,
        amount: Decimal,
        fee_amount: Decimal,
        note: Option<String>,
        created_by: AccountId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntryId(0),
            from_account,
            to_account,
            amount,
            fee_amount,
            kind,
            status: EntryStatus::Completed,
            note,
            admin_note: None,
            created_by,
            created_at: now,
            approved_at: Some(now),
            cancelled_at: None,
        }
    }

    /// Field validation performed by the journal before acceptance.
    pub fn validate(&self) -> Result<(), Error> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidEntry(format!(
                "entry amount must be positive, got {}",
                self.amount
            )));
        }
        if self.fee_amount < Decimal::ZERO {
            return Err(Error::InvalidEntry(format!(
                "entry fee must not be negative, got {}",
                self.fee_amount
            )));
        }
        if self.from_account.as_str().is_empty() || self.to_account.as_str().is_empty() {
            return Err(Error::InvalidEntry(
                "entry requires both a from and a to account".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the admin reversal engine may cancel this entry. Refund
    /// entries are themselves the product of a reversal and stay final.
    pub fn cancellable(&self) -> Result<(), Error> {
        match (self.kind, self.status) {
            (EntryKind::Refund, _) => Err(Error::EntryNotCancellable {
                entry: self.id,
                detail: "refund entries cannot be reversed".to_string(),
            }),
            (_, EntryStatus::Cancelled) => Err(Error::AlreadyCancelled(self.id)),
            (_, EntryStatus::Completed) => Ok(()),
            (_, status) => Err(Error::EntryNotCancellable {
                entry: self.id,
                detail: format!("entry is {status}, only completed entries can be reversed"),
            }),
        }
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},from={},to={},amount={},fee={},{}",
            self.id, self.kind, self.from_account, self.to_account, self.amount, self.fee_amount, self.status
        )
    }
}
