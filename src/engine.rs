use std::collections::HashMap;

use futures::StreamExt;
use rust_decimal::Decimal;

use crate::audit::{AuditAction, AuditEvent, AuditSink, Notification, NotificationSink};
use crate::domain::{
    AccountId, BalanceDelta, BalanceStore, CounterEffect, EntryId, EntryKind, Error, LedgerEntry,
    LedgerJournal, Operation, OperationStream, Page,
};
use crate::fees::{FeePolicy, LedgerConfig};

/// What the caller gets back from a successful settlement.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub entry_id: EntryId,
    pub transfer_amount: Decimal,
    pub fee_amount: Decimal,
    pub sender_balance: Decimal,
    pub recipient_balance: Decimal,
}

/// Transfer settlement and admin reversal engine.
///
/// Orchestrates validation, fee computation, atomic balance mutation and
/// journal append for transfers and admin adjustments. Generic over its
/// collaborators; a request layer drives individual methods, or `process`
/// consumes a whole operation stream.
#[derive(Debug)]
pub struct SettlementEngine<S, J, A, N>
where
    S: BalanceStore,
    J: LedgerJournal,
    A: AuditSink,
    N: NotificationSink,
{
    balances: S,
    journal: J,
    audit: A,
    notifier: N,
    fees: FeePolicy,
    platform: AccountId,
    starting_balance: Decimal,
    /// Receipts by caller-supplied idempotency key; replayed on retry.
    settled_keys: HashMap<String, SettlementReceipt>,
}

impl<S, J, A, N> SettlementEngine<S, J, A, N>
where
    S: BalanceStore,
    J: LedgerJournal,
    A: AuditSink,
    N: NotificationSink,
{
    pub fn new(
        config: LedgerConfig,
        mut balances: S,
        journal: J,
        audit: A,
        notifier: N,
    ) -> Result<Self, Error> {
        config.validate()?;
        let fees = FeePolicy::new(config.fees)?;
        // The fee collection account must exist before the first settlement.
        balances.ensure_account(&config.platform_account, Decimal::ZERO);
        Ok(Self {
            balances,
            journal,
            audit,
            notifier,
            fees,
            platform: config.platform_account,
            starting_balance: config.starting_balance,
            settled_keys: HashMap::new(),
        })
    }

    pub fn balances(&self) -> &S {
        &self.balances
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn platform_account(&self) -> &AccountId {
        &self.platform
    }

    pub fn balance(&self, account: &AccountId) -> Result<Decimal, Error> {
        self.balances.balance(account)
    }

    pub fn entries_for_account(&self, account: &AccountId, page: Page) -> Vec<LedgerEntry> {
        self.journal.entries_for_account(account, page)
    }

    /// Registers an account, seeded with the platform starting balance unless
    /// an explicit one is given.
    pub fn open_account(
        &mut self,
        account: &AccountId,
        starting_balance: Option<Decimal>,
    ) -> Result<(), Error> {
        let seed = starting_balance.unwrap_or(self.starting_balance);
        self.balances.open_account(account, self.fees.round(seed))
    }

    /// Settles a peer-to-peer transfer.
    pub fn settle_transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<SettlementReceipt, Error> {
        self.settle(EntryKind::Transfer, from, to, amount, note)
    }

    /// Settles the payment for a completed service request. Same pipeline as
    /// a transfer, recorded under its own entry kind.
    pub fn settle_service_payment(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<SettlementReceipt, Error> {
        self.settle(EntryKind::ServicePayment, from, to, amount, note)
    }

    /// Like `settle_transfer`, but a previously seen key replays the cached
    /// receipt instead of double-applying. Makes retries after ambiguous
    /// failures safe.
    pub fn settle_transfer_idempotent(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        note: Option<String>,
        key: &str,
    ) -> Result<SettlementReceipt, Error> {
        if let Some(receipt) = self.settled_keys.get(key) {
            tracing::debug!(key, entry = %receipt.entry_id, "idempotency key replayed");
            return Ok(receipt.clone());
        }
        let receipt = self.settle(EntryKind::Transfer, from, to, amount, note)?;
        self.settled_keys.insert(key.to_owned(), receipt.clone());
        Ok(receipt)
    }

    fn settle(
        &mut self,
        kind: EntryKind,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
        note: Option<String>,
    ) -> Result<SettlementReceipt, Error> {
        // Fail-fast phase: nothing below mutates until the batch commit.
        if from == to {
            return Err(Error::SelfTransferNotAllowed);
        }
        self.fees.validate_amount(amount)?;

        let sender = self.balances.account(from)?;
        if !sender.active {
            return Err(Error::AccountInactive(from.clone()));
        }
        let available = sender.balance;
        let recipient = self.balances.account(to)?;
        if !recipient.active {
            return Err(Error::AccountInactive(to.clone()));
        }

        let quote = self.fees.quote(amount);
        if available < quote.total_amount {
            return Err(Error::InsufficientBalance {
                required: quote.total_amount,
                available,
                shortfall: quote.total_amount - available,
            });
        }

        // The fee moves from the sender to the platform account; the sender's
        // given counter tracks the nominal amount only.
        let deltas = [
            BalanceDelta::new(
                from.clone(),
                -quote.total_amount,
                CounterEffect::Given(quote.transfer_amount),
            ),
            BalanceDelta::new(
                to.clone(),
                quote.transfer_amount,
                CounterEffect::Received(quote.transfer_amount),
            ),
            BalanceDelta::new(
                self.platform.clone(),
                quote.fee_amount,
                CounterEffect::Received(quote.fee_amount),
            ),
        ];
        let entry = LedgerEntry::completed(
            kind,
            from.clone(),
            to.clone(),
            quote.transfer_amount,
            quote.fee_amount,
            note,
            from.clone(),
        );
        let entry_id = self.commit(&deltas, entry)?;

        let sender_balance = self.balances.balance(from)?;
        let recipient_balance = self.balances.balance(to)?;
        self.notifier.notify(&Notification::TransferReceived {
            account: to.clone(),
            from: from.clone(),
            amount: quote.transfer_amount,
            entry: entry_id,
        });
        self.notifier.notify(&Notification::BalanceChanged {
            account: from.clone(),
            balance: sender_balance,
        });
        self.notifier.notify(&Notification::BalanceChanged {
            account: to.clone(),
            balance: recipient_balance,
        });
        tracing::info!(
            %from, %to,
            amount = %quote.transfer_amount,
            fee = %quote.fee_amount,
            entry = %entry_id,
            "transfer settled"
        );

        Ok(SettlementReceipt {
            entry_id,
            transfer_amount: quote.transfer_amount,
            fee_amount: quote.fee_amount,
            sender_balance,
            recipient_balance,
        })
    }

    /// Applies the batch and appends the entry as one unit: an append failure
    /// compensates the balance mutation before the error escapes.
    fn commit(&mut self, deltas: &[BalanceDelta], entry: LedgerEntry) -> Result<EntryId, Error> {
        entry.validate()?;
        self.balances.apply_batch(deltas)?;
        match self.journal.append(entry) {
            Ok(id) => Ok(id),
            Err(e) => {
                self.compensate(deltas, "balance batch");
                Err(e)
            }
        }
    }

    /// Applies the inverse batch, restoring balances and counters.
    fn compensate(&mut self, deltas: &[BalanceDelta], what: &str) {
        let inverse: Vec<BalanceDelta> = deltas.iter().map(BalanceDelta::inverse).collect();
        if let Err(undo) = self.balances.apply_batch(&inverse) {
            tracing::error!(error = %undo, what, "failed to compensate");
        }
    }

    /// Mints credits into an account. One-sided: the platform account is
    /// named on the entry but its balance is untouched (deposits change the
    /// total supply).
    pub fn deposit_credits(
        &mut self,
        account: &AccountId,
        amount: Decimal,
        reason: &str,
        acting_admin: &AccountId,
    ) -> Result<EntryId, Error> {
        let reason = required_reason(reason)?;
        self.fees.validate_adjustment(amount)?;
        let amount = self.fees.round(amount);
        self.balances.account(account)?;

        let deltas = [BalanceDelta::new(
            account.clone(),
            amount,
            CounterEffect::Received(amount),
        )];
        let entry = LedgerEntry::completed(
            EntryKind::Adjustment,
            self.platform.clone(),
            account.clone(),
            amount,
            Decimal::ZERO,
            Some(reason.to_owned()),
            acting_admin.clone(),
        );
        let entry_id = self.commit(&deltas, entry)?;
        self.admin_done(AuditAction::Deposit, acting_admin, account, Some(amount), reason);
        Ok(entry_id)
    }

    /// Burns credits from an account; requires sufficient balance.
    pub fn withdraw_credits(
        &mut self,
        account: &AccountId,
        amount: Decimal,
        reason: &str,
        acting_admin: &AccountId,
    ) -> Result<EntryId, Error> {
        let reason = required_reason(reason)?;
        self.fees.validate_adjustment(amount)?;
        let amount = self.fees.round(amount);

        let available = self.balances.balance(account)?;
        if available < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available,
                shortfall: amount - available,
            });
        }

        let deltas = [BalanceDelta::new(
            account.clone(),
            -amount,
            CounterEffect::Given(amount),
        )];
        let entry = LedgerEntry::completed(
            EntryKind::Adjustment,
            account.clone(),
            self.platform.clone(),
            amount,
            Decimal::ZERO,
            Some(reason.to_owned()),
            acting_admin.clone(),
        );
        let entry_id = self.commit(&deltas, entry)?;
        self.admin_done(AuditAction::Withdraw, acting_admin, account, Some(amount), reason);
        Ok(entry_id)
    }

    /// Cancels a completed entry. With `refund` the original balance effects
    /// are reversed exactly and a compensating refund entry is appended; the
    /// original entry and the reversal both stay visible in history. Without
    /// `refund` only the status changes (disputes acknowledged without
    /// monetary reversal).
    pub fn reverse_entry(
        &mut self,
        entry_id: EntryId,
        reason: &str,
        refund: bool,
        acting_admin: &AccountId,
    ) -> Result<Option<EntryId>, Error> {
        let reason = required_reason(reason)?;
        let original = self.journal.entry(entry_id)?.clone();
        original.cancellable()?;

        // Stage the refund before touching anything: the balance batch goes
        // first, so a cancellation failure only needs the batch compensated.
        let refund_plan = if refund {
            let deltas = self.reversal_deltas(&original)?;
            // Refunds return amount + fee to the sender but record no fee of
            // their own; the reversed fee stays on the original entry.
            let refund_entry = LedgerEntry::completed(
                EntryKind::Refund,
                original.to_account.clone(),
                original.from_account.clone(),
                original.amount,
                Decimal::ZERO,
                Some(reason.to_owned()),
                acting_admin.clone(),
            );
            refund_entry.validate()?;
            self.balances.apply_batch(&deltas)?;
            Some((deltas, refund_entry))
        } else {
            None
        };

        // A cancellation failure here means the entry raced to cancelled
        // underneath us; compensate the staged batch and report.
        if let Err(e) = self.journal.mark_cancelled(entry_id, reason, acting_admin) {
            if let Some((deltas, _)) = &refund_plan {
                self.compensate(deltas, "refund batch");
            }
            return Err(e);
        }

        // The original is cancelled before the refund entry is appended, so
        // an append fault degrades to a status-only cancellation (balances
        // compensated, no refund record) instead of a refund entry whose
        // original was never cancelled.
        let refund_id = match refund_plan {
            Some((deltas, refund_entry)) => match self.journal.append(refund_entry) {
                Ok(id) => {
                    for delta in &deltas {
                        if let Ok(balance) = self.balances.balance(&delta.account) {
                            self.notifier.notify(&Notification::BalanceChanged {
                                account: delta.account.clone(),
                                balance,
                            });
                        }
                    }
                    Some(id)
                }
                Err(e) => {
                    self.compensate(&deltas, "refund batch");
                    return Err(e);
                }
            },
            None => None,
        };

        self.admin_done(
            AuditAction::Cancel,
            acting_admin,
            &original.from_account,
            Some(original.amount),
            reason,
        );
        tracing::info!(entry = %entry_id, refund, "entry reversed");
        Ok(refund_id)
    }

    /// Inverse of the settlement batch for one completed entry.
    fn reversal_deltas(&self, entry: &LedgerEntry) -> Result<Vec<BalanceDelta>, Error> {
        let total = entry.amount + entry.fee_amount;
        match entry.kind {
            EntryKind::Transfer | EntryKind::ServicePayment => Ok(vec![
                BalanceDelta::new(
                    entry.from_account.clone(),
                    total,
                    CounterEffect::Received(total),
                ),
                BalanceDelta::new(
                    entry.to_account.clone(),
                    -entry.amount,
                    CounterEffect::Given(entry.amount),
                ),
                BalanceDelta::new(
                    self.platform.clone(),
                    -entry.fee_amount,
                    CounterEffect::Given(entry.fee_amount),
                ),
            ]),
            EntryKind::Adjustment if entry.from_account == self.platform => {
                // Deposit: take the minted credits back.
                Ok(vec![BalanceDelta::new(
                    entry.to_account.clone(),
                    -entry.amount,
                    CounterEffect::Given(entry.amount),
                )])
            }
            EntryKind::Adjustment if entry.to_account == self.platform => {
                // Withdrawal: restore the burned credits.
                Ok(vec![BalanceDelta::new(
                    entry.from_account.clone(),
                    entry.amount,
                    CounterEffect::Received(entry.amount),
                )])
            }
            EntryKind::Adjustment => Err(Error::EntryNotCancellable {
                entry: entry.id,
                detail: "adjustment does not reference the platform account".to_string(),
            }),
            EntryKind::Refund => Err(Error::EntryNotCancellable {
                entry: entry.id,
                detail: "refund entries cannot be reversed".to_string(),
            }),
        }
    }

    /// Suspends or reactivates an account. Suspended accounts cannot send or
    /// receive transfers; admin adjustments still apply.
    pub fn set_account_active(
        &mut self,
        account: &AccountId,
        active: bool,
        reason: &str,
        acting_admin: &AccountId,
    ) -> Result<(), Error> {
        let reason = required_reason(reason)?;
        self.balances.set_active(account, active)?;
        let action = if active {
            AuditAction::Reactivate
        } else {
            AuditAction::Suspend
        };
        self.admin_done(action, acting_admin, account, None, reason);
        Ok(())
    }

    fn admin_done(
        &mut self,
        action: AuditAction,
        actor: &AccountId,
        target: &AccountId,
        amount: Option<Decimal>,
        reason: &str,
    ) {
        self.audit.record(&AuditEvent {
            actor: actor.clone(),
            action,
            target: target.clone(),
            amount,
            reason: reason.to_owned(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Drives a whole operation stream. Rejected operations are logged and
    /// skipped; the run continues.
    pub async fn process<I: OperationStream>(&mut self, ingestion: &mut I) -> Result<(), Error> {
        let mut ops = ingestion.stream();
        while let Some(op) = ops.next().await {
            match op {
                Ok(op) => {
                    let op_desc = op.to_string();
                    if let Err(e) = self.apply(op) {
                        tracing::warn!(op = %op_desc, error = %e, "operation rejected");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "malformed operation skipped"),
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: Operation) -> Result<(), Error> {
        match op {
            Operation::Open { account, starting_balance } => {
                self.open_account(&account, starting_balance)
            }
            Operation::Transfer { from, to, amount, note } => {
                self.settle_transfer(&from, &to, amount, note).map(|_| ())
            }
            Operation::ServicePayment { from, to, amount, note } => {
                self.settle_service_payment(&from, &to, amount, note).map(|_| ())
            }
            Operation::Deposit { admin, account, amount, reason } => {
                self.deposit_credits(&account, amount, &reason, &admin).map(|_| ())
            }
            Operation::Withdraw { admin, account, amount, reason } => {
                self.withdraw_credits(&account, amount, &reason, &admin).map(|_| ())
            }
            Operation::Reverse { admin, entry, reason, refund } => {
                self.reverse_entry(entry, &reason, refund, &admin).map(|_| ())
            }
            Operation::Suspend { admin, account, reason } => {
                self.set_account_active(&account, false, &reason, &admin)
            }
            Operation::Reactivate { admin, account, reason } => {
                self.set_account_active(&account, true, &reason, &admin)
            }
        }
    }
}

fn required_reason(reason: &str) -> Result<&str, Error> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(Error::ReasonRequired);
    }
    Ok(trimmed)
}
