//! CSV ingestion for transaction records
//!
//! Headers are validated before any row is read; a missing column or a
//! malformed value aborts the whole load.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{Reader, StringRecord};
use std::io::Read;
use std::path::Path;

use crate::{ForecastError, Result, TransactionRecord};

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "date",
    "sender",
    "transaction_type",
    "transaction_amount",
    "balance",
];

/// Header positions of the required columns
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    date: usize,
    sender: usize,
    transaction_type: usize,
    transaction_amount: usize,
    balance: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
        };

        Ok(ColumnIndex {
            date: find("date")?,
            sender: find("sender")?,
            transaction_type: find("transaction_type")?,
            transaction_amount: find("transaction_amount")?,
            balance: find("balance")?,
        })
    }
}

/// Load records from a CSV file, preserving row order
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<TransactionRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        ForecastError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;
    let records = read_transactions(file)?;
    log::info!("Loaded {} transactions from {}", records.len(), path.display());
    Ok(records)
}

/// Read records from any CSV source, preserving row order
pub fn read_transactions<R: Read>(source: R) -> Result<Vec<TransactionRecord>> {
    let mut reader = Reader::from_reader(source);
    let columns = ColumnIndex::from_headers(reader.headers()?)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        // Header is line 1
        let row_number = i + 2;
        let row = row?;
        records.push(parse_row(&row, columns, row_number)?);
    }

    Ok(records)
}

fn parse_row(row: &StringRecord, columns: ColumnIndex, row_number: usize) -> Result<TransactionRecord> {
    let field = |index: usize, name: &str| {
        row.get(index)
            .map(str::trim)
            .ok_or_else(|| ForecastError::Parse {
                row: row_number,
                message: format!("missing value for {}", name),
            })
    };

    let raw_date = field(columns.date, "date")?;
    let date = parse_date(raw_date).ok_or_else(|| ForecastError::Parse {
        row: row_number,
        message: format!("unrecognized date '{}'", raw_date),
    })?;

    let sender = field(columns.sender, "sender")?.to_string();
    let transaction_type = field(columns.transaction_type, "transaction_type")?.to_string();
    let transaction_amount = parse_number(
        field(columns.transaction_amount, "transaction_amount")?,
        "transaction_amount",
        row_number,
    )?;
    let balance = parse_number(field(columns.balance, "balance")?, "balance", row_number)?;

    Ok(TransactionRecord {
        date,
        sender,
        transaction_type,
        transaction_amount,
        balance,
    })
}

fn parse_number(raw: &str, name: &str, row_number: usize) -> Result<f64> {
    let value: f64 = raw.parse().map_err(|_| ForecastError::Parse {
        row: row_number,
        message: format!("{} is not a number: '{}'", name, raw),
    })?;
    if !value.is_finite() {
        return Err(ForecastError::Parse {
            row: row_number,
            message: format!("{} is not finite: '{}'", name, raw),
        });
    }
    Ok(value)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GOOD: &str = "\
date,sender,transaction_type,transaction_amount,balance
2024-01-01,alice,credit,120.5,1120.5
2024-01-02 09:30:00,bob,debit,80,1040.5
2024-01-03T12:00:00Z,alice,credit,95.25,1135.75
";

    #[test]
    fn test_read_preserves_order() {
        let records = read_transactions(GOOD.as_bytes()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sender, "alice");
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(records[2].transaction_amount, 95.25);
        assert_eq!(records[1].balance, 1040.5);
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let csv = "balance,transaction_amount,date,transaction_type,sender,note\n\
                   10,5,2024-02-01,debit,carol,x\n";
        let records = read_transactions(csv.as_bytes()).unwrap();

        assert_eq!(records[0].sender, "carol");
        assert_eq!(records[0].transaction_amount, 5.0);
        assert_eq!(records[0].balance, 10.0);
    }

    #[test]
    fn test_missing_column_fails_fast() {
        let csv = "date,sender,transaction_amount,balance\n2024-01-01,alice,1,2\n";
        let err = read_transactions(csv.as_bytes()).unwrap_err();

        match err {
            ForecastError::MissingColumn(name) => assert_eq!(name, "transaction_type"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_value_reports_row() {
        let csv = "date,sender,transaction_type,transaction_amount,balance\n\
                   2024-01-01,alice,credit,10,20\n\
                   2024-01-02,bob,debit,ten,30\n";
        let err = read_transactions(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, ForecastError::Parse { row: 3, .. }));
    }

    #[test]
    fn test_bad_date() {
        let csv = "date,sender,transaction_type,transaction_amount,balance\n\
                   01/02/2024,alice,credit,10,20\n";
        assert!(matches!(
            read_transactions(csv.as_bytes()),
            Err(ForecastError::Parse { row: 2, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GOOD.as_bytes()).unwrap();

        let records = load_transactions(file.path()).unwrap();
        assert_eq!(records.len(), 3);
    }
}
