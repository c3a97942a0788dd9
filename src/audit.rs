use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{AccountId, EntryId};

/// Admin-initiated mutation, emitted for the external audit trail to consume.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor: AccountId,
    pub action: AuditAction,
    pub target: AccountId,
    pub amount: Option<Decimal>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Deposit,
    Withdraw,
    Cancel,
    Suspend,
    Reactivate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Deposit => "deposit",
            AuditAction::Withdraw => "withdraw",
            AuditAction::Cancel => "cancel",
            AuditAction::Suspend => "suspend",
            AuditAction::Reactivate => "reactivate",
        }
    }
}

/// Event pushed towards the notification collaborator after a successful
/// settlement. Delivery, retries and read-state live outside the core.
#[derive(Debug, Clone)]
pub enum Notification {
    TransferReceived {
        account: AccountId,
        from: AccountId,
        amount: Decimal,
        entry: EntryId,
    },
    BalanceChanged {
        account: AccountId,
        balance: Decimal,
    },
}

pub trait AuditSink {
    fn record(&self, event: &AuditEvent);
}

pub trait NotificationSink {
    fn notify(&self, event: &Notification);
}

/// Default sink: structured tracing events, one per admin action.
#[derive(Default, Debug)]
pub struct TracingAuditSink {}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        tracing::info!(
            actor = %event.actor,
            action = event.action.as_str(),
            target = %event.target,
            amount = ?event.amount,
            reason = %event.reason,
            timestamp = %event.timestamp,
            "admin action"
        );
    }
}

#[derive(Default, Debug)]
pub struct TracingNotifier {}

impl NotificationSink for TracingNotifier {
    fn notify(&self, event: &Notification) {
        match event {
            Notification::TransferReceived { account, from, amount, entry } => {
                tracing::info!(%account, %from, %amount, %entry, "transfer received");
            }
            Notification::BalanceChanged { account, balance } => {
                tracing::debug!(%account, %balance, "balance changed");
            }
        }
    }
}
