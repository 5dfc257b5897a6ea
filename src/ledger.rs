use crate::error::Result;
use crate::ingestion::{field, read_next, tsv_reader};
use crate::schema::{BalanceRecord, EntitySelector};
use crate::utils::{MonthRange, YearMonth};
use csv::ByteRecord;
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub lines_matched: usize,
}

/// Matching ledger records plus counters for the pass that produced them.
#[derive(Debug, Clone, Default)]
pub struct LedgerScan {
    pub records: Vec<BalanceRecord>,
    pub stats: ScanStats,
}

/// Parses one ledger line: quoted entity, quoted `YYYYMMDD` date, quoted
/// account, signed balance. Any missing or unparsable field rejects the line.
pub fn parse_ledger_line(record: &ByteRecord) -> Option<BalanceRecord> {
    let num_entidad = field(record, 0)?.parse().ok()?;
    let fecha_bce = YearMonth::from_compact(&field(record, 1)?)?;
    let num_cuenta = field(record, 2)?.parse().ok()?;
    let saldo: f64 = field(record, 3)?.parse().ok()?;
    if !saldo.is_finite() {
        return None;
    }
    Some(BalanceRecord {
        num_entidad,
        fecha_bce,
        num_cuenta,
        saldo,
    })
}

/// Single forward pass over the ledger. Only matching records are kept, so
/// memory grows with the selection rather than with the extract.
pub fn filter_ledger_from_reader<R: Read>(
    reader: R,
    selector: &EntitySelector,
    range: MonthRange,
) -> Result<LedgerScan> {
    let mut scan = LedgerScan::default();
    if range.is_empty() {
        return Ok(scan);
    }

    let mut rdr = tsv_reader(reader, b'\t');
    let mut record = ByteRecord::new();

    while read_next(&mut rdr, &mut record)? {
        scan.stats.lines_read += 1;

        let Some(balance) = parse_ledger_line(&record) else {
            scan.stats.lines_skipped += 1;
            continue;
        };

        if range.contains(balance.fecha_bce) && selector.matches(balance.num_entidad) {
            scan.stats.lines_matched += 1;
            scan.records.push(balance);
        }
    }

    Ok(scan)
}

pub fn filter_ledger(
    path: impl AsRef<Path>,
    selector: &EntitySelector,
    range: MonthRange,
) -> Result<LedgerScan> {
    let path = path.as_ref();
    if range.is_empty() {
        return Ok(LedgerScan::default());
    }

    let scan = filter_ledger_from_reader(File::open(path)?, selector, range)?;
    debug!(
        "Ledger scan of {}: {} lines read, {} skipped, {} matched",
        path.display(),
        scan.stats.lines_read,
        scan.stats.lines_skipped,
        scan.stats.lines_matched
    );
    Ok(scan)
}
