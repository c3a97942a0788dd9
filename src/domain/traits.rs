use futures::Stream;
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, EntryId, Error, LedgerEntry, Operation};

/// Source of parsed ledger operations (CSV file, request queue, ...).
pub trait OperationStream {
    type OpStream: Stream<Item = Result<Operation, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::OpStream;
}

/// Counter effect attached to a balance delta. Split out from the delta
/// itself because a sender's debit is the fee-inclusive total while its
/// `total_given` grows by the nominal amount only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEffect {
    Given(Decimal),
    Received(Decimal),
    NoCounter,
}

/// One balance mutation within an atomic batch.
#[derive(Debug, Clone)]
pub struct BalanceDelta {
    pub account: AccountId,
    pub delta: Decimal,
    pub counter: CounterEffect,
}

impl BalanceDelta {
    pub fn new(account: AccountId, delta: Decimal, counter: CounterEffect) -> Self {
        Self { account, delta, counter }
    }

    /// The compensating delta: undoes the balance effect and the counter
    /// effect. Counters are monotone over committed activity only; rolling
    /// back a batch that never committed must restore them too.
    pub fn inverse(&self) -> Self {
        let counter = match self.counter {
            CounterEffect::Given(amount) => CounterEffect::Given(-amount),
            CounterEffect::Received(amount) => CounterEffect::Received(-amount),
            CounterEffect::NoCounter => CounterEffect::NoCounter,
        };
        Self {
            account: self.account.clone(),
            delta: -self.delta,
            counter,
        }
    }
}

/// Authoritative current balance per account. All reads and writes pass
/// through here so settlement can enforce atomicity.
pub trait BalanceStore {
    /// Registers a new account. Fails with `AccountExists` when the id is
    /// already taken.
    fn open_account(&mut self, id: &AccountId, starting_balance: Decimal) -> Result<(), Error>;

    /// Registers the account if missing; no-op otherwise. Used for the
    /// platform fee account at engine construction.
    fn ensure_account(&mut self, id: &AccountId, starting_balance: Decimal);

    fn account(&self, id: &AccountId) -> Result<&Account, Error>;

    fn balance(&self, id: &AccountId) -> Result<Decimal, Error> {
        Ok(self.account(id)?.balance)
    }

    fn set_active(&mut self, id: &AccountId, active: bool) -> Result<(), Error>;

    /// Applies every delta or none of them: all targets are verified before
    /// the first mutation, and a batch never partially applies.
    fn apply_batch(&mut self, deltas: &[BalanceDelta]) -> Result<(), Error>;

    /// Accounts in id order, for reporting.
    fn accounts(&self) -> Vec<&Account>;
}

/// Pagination window over an account's unbounded history.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

/// Durable, ordered, append-only record of ledger entries.
pub trait LedgerJournal {
    /// Validates and appends the entry, assigning its id.
    fn append(&mut self, entry: LedgerEntry) -> Result<EntryId, Error>;

    fn entry(&self, id: EntryId) -> Result<&LedgerEntry, Error>;

    /// Entries touching the account, newest first.
    fn entries_for_account(&self, id: &AccountId, page: Page) -> Vec<LedgerEntry>;

    /// Transitions a completed entry to cancelled, stamping `cancelled_at`
    /// and recording the admin note.
    fn mark_cancelled(&mut self, id: EntryId, reason: &str, by: &AccountId) -> Result<(), Error>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
