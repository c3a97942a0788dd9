use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque account identifier. The caller layer resolves user-facing
/// identifiers (emails, usernames) to these before invoking the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One user's time-credit wallet.
///
/// `total_given` and `total_received` are monotonically non-decreasing over
/// committed activity (a rolled-back batch restores them). A sender's
/// `total_given` grows by the nominal transfer amount only, never by fees.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal,        // signed; may go negative (debt)
    pub total_given: Decimal,    // nominal amounts sent, fees excluded
    pub total_received: Decimal, // amounts received
    pub active: bool,            // suspended accounts cannot transfer
}

impl Account {
    pub fn open(id: AccountId, starting_balance: Decimal) -> Self {
        Self {
            id,
            balance: starting_balance,
            total_given: Decimal::ZERO,
            total_received: Decimal::ZERO,
            active: true,
        }
    }
}
