use std::io::Write;

use serde::Serialize;

use crate::domain::{BalanceStore, Error};

#[derive(Debug, Serialize)]
struct BalanceRow {
    account: String,
    balance: String,
    total_given: String,
    total_received: String,
    active: bool,
}

/// Writes the balance snapshot as CSV, one row per account in id order,
/// amounts formatted at the given precision.
pub fn write_balances<S: BalanceStore, W: Write>(
    store: &S,
    decimal_places: u32,
    writer: W,
) -> Result<(), Error> {
    let prec = decimal_places as usize;
    let mut out = csv::Writer::from_writer(writer);
    for account in store.accounts() {
        out.serialize(BalanceRow {
            account: account.id.to_string(),
            balance: format!("{:.prec$}", account.balance),
            total_given: format!("{:.prec$}", account.total_given),
            total_received: format!("{:.prec$}", account.total_received),
            active: account.active,
        })
        .map_err(|e| Error::StorageUnavailable(format!("failed to write balance row: {e}")))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::AccountId;
    use crate::store::InMemoryBalances;

    #[test]
    fn snapshot_is_sorted_and_padded() {
        let mut store = InMemoryBalances::new();
        store
            .open_account(&AccountId::from("bob"), Decimal::from(10))
            .unwrap();
        store
            .open_account(&AccountId::from("alice"), "89.80".parse().unwrap())
            .unwrap();

        let mut buf = Vec::new();
        write_balances(&store, 2, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "account,balance,total_given,total_received,active");
        assert_eq!(lines[1], "alice,89.80,0.00,0.00,true");
        assert_eq!(lines[2], "bob,10.00,0.00,0.00,true");
    }
}
