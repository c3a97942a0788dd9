use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountId, BalanceDelta, BalanceStore, CounterEffect, EntryId, EntryStatus, Error,
    LedgerEntry, LedgerJournal, Page,
};

/// In-memory account store. Atomicity of `apply_batch` follows from
/// exclusive `&mut` access: every target is verified before the first
/// mutation, so a batch either fully applies or leaves the map untouched.
#[derive(Default, Debug)]
pub struct InMemoryBalances {
    accounts: HashMap<AccountId, Account>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BalanceStore for InMemoryBalances {
    fn open_account(&mut self, id: &AccountId, starting_balance: Decimal) -> Result<(), Error> {
        match self.accounts.entry(id.clone()) {
            Entry::Vacant(e) => {
                e.insert(Account::open(id.clone(), starting_balance));
                Ok(())
            }
            Entry::Occupied(_) => Err(Error::AccountExists(id.clone())),
        }
    }

    fn ensure_account(&mut self, id: &AccountId, starting_balance: Decimal) {
        self.accounts
            .entry(id.clone())
            .or_insert_with(|| Account::open(id.clone(), starting_balance));
    }

    fn account(&self, id: &AccountId) -> Result<&Account, Error> {
        self.accounts
            .get(id)
            .ok_or_else(|| Error::AccountNotFound(id.clone()))
    }

    fn set_active(&mut self, id: &AccountId, active: bool) -> Result<(), Error> {
        let account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| Error::AccountNotFound(id.clone()))?;
        account.active = active;
        Ok(())
    }

    fn apply_batch(&mut self, deltas: &[BalanceDelta]) -> Result<(), Error> {
        for d in deltas {
            if !self.accounts.contains_key(&d.account) {
                return Err(Error::AccountNotFound(d.account.clone()));
            }
        }
        for d in deltas {
            // verified above
            let account = self
                .accounts
                .get_mut(&d.account)
                .ok_or_else(|| Error::AccountNotFound(d.account.clone()))?;
            account.balance += d.delta;
            match d.counter {
                CounterEffect::Given(amount) => account.total_given += amount,
                CounterEffect::Received(amount) => account.total_received += amount,
                CounterEffect::NoCounter => {}
            }
        }
        Ok(())
    }

    fn accounts(&self) -> Vec<&Account> {
        let mut all: Vec<&Account> = self.accounts.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

/// In-memory append-only journal. Ids are assigned in append order and
/// entries are never removed.
#[derive(Default, Debug)]
pub struct InMemoryJournal {
    entries: Vec<LedgerEntry>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerJournal for InMemoryJournal {
    fn append(&mut self, mut entry: LedgerEntry) -> Result<EntryId, Error> {
        entry.validate()?;
        let id = EntryId(self.entries.len() as u64 + 1);
        entry.id = id;
        self.entries.push(entry);
        Ok(id)
    }

    fn entry(&self, id: EntryId) -> Result<&LedgerEntry, Error> {
        if id.0 == 0 || id.0 as usize > self.entries.len() {
            return Err(Error::EntryNotFound(id));
        }
        Ok(&self.entries[id.0 as usize - 1])
    }

    fn entries_for_account(&self, id: &AccountId, page: Page) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| &e.from_account == id || &e.to_account == id)
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }

    fn mark_cancelled(&mut self, id: EntryId, reason: &str, by: &AccountId) -> Result<(), Error> {
        if id.0 == 0 || id.0 as usize > self.entries.len() {
            return Err(Error::EntryNotFound(id));
        }
        let entry = &mut self.entries[id.0 as usize - 1];
        entry.cancellable()?;
        entry.status = EntryStatus::Cancelled;
        entry.cancelled_at = Some(Utc::now());
        entry.admin_note = Some(format!("cancelled by {by}: {reason}"));
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn transfer_entry(from: &str, to: &str, amount: &str) -> LedgerEntry {
        LedgerEntry::completed(
            EntryKind::Transfer,
            from.into(),
            to.into(),
            dec(amount),
            dec("0.00"),
            None,
            from.into(),
        )
    }

    #[test]
    fn open_twice_fails() {
        let mut store = InMemoryBalances::new();
        let alice = AccountId::from("alice");
        store.open_account(&alice, dec("10.00")).unwrap();
        assert!(matches!(
            store.open_account(&alice, dec("10.00")),
            Err(Error::AccountExists(_))
        ));
    }

    #[test]
    fn batch_with_unknown_account_applies_nothing() {
        let mut store = InMemoryBalances::new();
        let alice = AccountId::from("alice");
        store.open_account(&alice, dec("10.00")).unwrap();

        let batch = [
            BalanceDelta::new(alice.clone(), dec("-5.00"), CounterEffect::Given(dec("5.00"))),
            BalanceDelta::new("ghost".into(), dec("5.00"), CounterEffect::Received(dec("5.00"))),
        ];
        assert!(matches!(
            store.apply_batch(&batch),
            Err(Error::AccountNotFound(_))
        ));
        assert_eq!(store.balance(&alice).unwrap(), dec("10.00"));
        assert_eq!(store.account(&alice).unwrap().total_given, Decimal::ZERO);
    }

    #[test]
    fn counters_track_nominal_amounts() {
        let mut store = InMemoryBalances::new();
        let alice = AccountId::from("alice");
        store.open_account(&alice, dec("10.00")).unwrap();
        store
            .apply_batch(&[BalanceDelta::new(
                alice.clone(),
                dec("-10.20"),
                CounterEffect::Given(dec("10.00")),
            )])
            .unwrap();
        let account = store.account(&alice).unwrap();
        assert_eq!(account.balance, dec("-0.20"));
        assert_eq!(account.total_given, dec("10.00"));
    }

    #[test]
    fn journal_orders_history_newest_first() {
        let mut journal = InMemoryJournal::new();
        journal.append(transfer_entry("alice", "bob", "1.00")).unwrap();
        journal.append(transfer_entry("bob", "alice", "2.00")).unwrap();
        journal.append(transfer_entry("carol", "dave", "3.00")).unwrap();

        let history = journal.entries_for_account(&"alice".into(), Page::default());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, dec("2.00"));
        assert_eq!(history[1].amount, dec("1.00"));

        let paged = journal.entries_for_account(&"alice".into(), Page { offset: 1, limit: 10 });
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].amount, dec("1.00"));
    }

    #[test]
    fn cancel_is_single_shot() {
        let mut journal = InMemoryJournal::new();
        let id = journal.append(transfer_entry("alice", "bob", "1.00")).unwrap();
        journal.mark_cancelled(id, "dup", &"admin".into()).unwrap();
        assert_eq!(journal.entry(id).unwrap().status, EntryStatus::Cancelled);
        assert!(journal.entry(id).unwrap().cancelled_at.is_some());
        assert!(matches!(
            journal.mark_cancelled(id, "dup", &"admin".into()),
            Err(Error::AlreadyCancelled(_))
        ));
    }

    #[test]
    fn refund_entries_are_final() {
        let mut journal = InMemoryJournal::new();
        let entry = LedgerEntry::completed(
            EntryKind::Refund,
            "bob".into(),
            "alice".into(),
            dec("1.00"),
            dec("0.00"),
            None,
            "admin".into(),
        );
        let id = journal.append(entry).unwrap();
        assert!(matches!(
            journal.mark_cancelled(id, "no", &"admin".into()),
            Err(Error::EntryNotCancellable { .. })
        ));
    }

    #[test]
    fn rejects_invalid_entries() {
        let mut journal = InMemoryJournal::new();
        let entry = transfer_entry("alice", "bob", "0.00");
        assert!(matches!(journal.append(entry), Err(Error::InvalidEntry(_))));
        assert!(journal.is_empty());
    }
}
