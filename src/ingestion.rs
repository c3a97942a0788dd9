use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{AmountError, EntryId, Error, Operation, OperationStream};

/// Reads ledger operations from CSV. Rows look like
/// `op, actor, target, amount, note` with ops `open`, `transfer`, `service`,
/// `deposit`, `withdraw`, `reverse`, `void`, `suspend`, `reactivate`.
pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    op: String,
    actor: Option<String>,
    target: Option<String>,
    amount: Option<Decimal>,
    note: Option<String>,
}

impl TryFrom<CsvRow> for Operation {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let op = row.op.trim().to_ascii_lowercase();
        let actor = row
            .actor
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Ingestion(format!("{op}: missing actor column")))?;
        let target = row.target.filter(|s| !s.is_empty());
        let note = row.note.filter(|s| !s.is_empty());
        let amount = || {
            row.amount
                .ok_or(Error::InvalidAmount(AmountError::NotANumber))
        };
        let require_target = |target: Option<String>| {
            target.ok_or_else(|| Error::Ingestion(format!("{op}: missing target column")))
        };

        let op = match op.as_str() {
            "open" => Operation::Open {
                account: actor.into(),
                starting_balance: row.amount,
            },
            "transfer" => Operation::Transfer {
                from: actor.into(),
                to: require_target(target)?.into(),
                amount: amount()?,
                note,
            },
            "service" => Operation::ServicePayment {
                from: actor.into(),
                to: require_target(target)?.into(),
                amount: amount()?,
                note,
            },
            "deposit" => Operation::Deposit {
                admin: actor.into(),
                account: require_target(target)?.into(),
                amount: amount()?,
                reason: note.unwrap_or_default(),
            },
            "withdraw" => Operation::Withdraw {
                admin: actor.into(),
                account: require_target(target)?.into(),
                amount: amount()?,
                reason: note.unwrap_or_default(),
            },
            "reverse" | "void" => {
                let raw = require_target(target)?;
                let id: u64 = raw
                    .parse()
                    .map_err(|_| Error::Ingestion(format!("invalid entry id: {raw}")))?;
                Operation::Reverse {
                    admin: actor.into(),
                    entry: EntryId(id),
                    reason: note.unwrap_or_default(),
                    refund: op == "reverse",
                }
            }
            "suspend" => Operation::Suspend {
                admin: actor.into(),
                account: require_target(target)?.into(),
                reason: note.unwrap_or_default(),
            },
            "reactivate" => Operation::Reactivate {
                admin: actor.into(),
                account: require_target(target)?.into(),
                reason: note.unwrap_or_default(),
            },
            other => {
                return Err(Error::Ingestion(format!("unknown operation: {other}")));
            }
        };
        Ok(op)
    }
}

impl<R: Read + Send + 'static> OperationStream for CsvReader<R> {
    type OpStream = Pin<Box<dyn Stream<Item = Result<Operation, Error>> + Send>>;

    fn stream(&mut self) -> Self::OpStream {
        // Take ownership of the reader so the iterator we build owns all data
        // and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<Operation, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => Operation::try_from(row),
                Err(e) => Err(Error::Ingestion(format!("CSV deserialization error: {e}"))),
            });

        Box::pin(stream::iter(iter))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    async fn parse(data: &str) -> Vec<Result<Operation, Error>> {
        let mut reader = CsvReader::new(std::io::Cursor::new(data.as_bytes().to_vec())).unwrap();
        reader.stream().collect().await
    }

    #[tokio::test]
    async fn parses_transfer_rows() {
        let rows = parse(
            "op, actor, target, amount, note\n\
             transfer, alice, bob, 10.00, thanks\n",
        )
        .await;
        assert_eq!(rows.len(), 1);
        match rows[0].as_ref().unwrap() {
            Operation::Transfer { from, to, amount, note } => {
                assert_eq!(from.as_str(), "alice");
                assert_eq!(to.as_str(), "bob");
                assert_eq!(*amount, "10.00".parse().unwrap());
                assert_eq!(note.as_deref(), Some("thanks"));
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_amount_is_not_a_number() {
        let rows = parse("op, actor, target, amount, note\ntransfer, alice, bob,,\n").await;
        assert!(matches!(
            rows[0],
            Err(Error::InvalidAmount(AmountError::NotANumber))
        ));
    }

    #[tokio::test]
    async fn bad_rows_do_not_poison_the_stream() {
        let rows = parse(
            "op, actor, target, amount, note\n\
             bogus, alice, bob, 1.00,\n\
             open, alice,,,\n",
        )
        .await;
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Err(Error::Ingestion(_))));
        assert!(matches!(rows[1], Ok(Operation::Open { .. })));
    }

    #[tokio::test]
    async fn void_disables_refund() {
        let rows = parse("op, actor, target, amount, note\nvoid, admin, 3,, duplicate\n").await;
        match rows[0].as_ref().unwrap() {
            Operation::Reverse { entry, refund, reason, .. } => {
                assert_eq!(*entry, EntryId(3));
                assert!(!refund);
                assert_eq!(reason, "duplicate");
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }
}
