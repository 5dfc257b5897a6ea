use crate::config::{DecimalSeparator, SourceConfig};
use crate::error::{AdjustmentReportError, Result};
use crate::schema::{Account, Entity};
use crate::utils::{decode_latin1, strip_quotes, YearMonth};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ByteRecord, ReaderBuilder};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub type AccountMap = BTreeMap<u32, Account>;
pub type EntityMap = BTreeMap<u32, Entity>;
pub type IndexMap = BTreeMap<YearMonth, f64>;

const INDEX_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const INDEX_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Tab-separated, unquoted reader used for every line-oriented extract.
/// Quote characters are left in the fields and stripped afterwards.
pub(crate) fn tsv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader)
}

/// Field `idx` decoded from Latin-1 with quotes stripped; `None` when absent or blank.
pub(crate) fn field(record: &ByteRecord, idx: usize) -> Option<String> {
    let value = strip_quotes(&decode_latin1(record.get(idx)?));
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn parse_account_line(record: &ByteRecord) -> Option<Account> {
    let num_cuenta = field(record, 0)?.parse().ok()?;
    let descripcion_cuenta = field(record, 1)?;
    Some(Account {
        num_cuenta,
        descripcion_cuenta,
    })
}

pub fn parse_entity_line(record: &ByteRecord) -> Option<Entity> {
    let num_entidad = field(record, 0)?.parse().ok()?;
    let nombre_entidad = field(record, 1)?;
    Some(Entity {
        num_entidad,
        nombre_entidad,
        nombre_corto: field(record, 2).unwrap_or_default(),
    })
}

pub fn load_accounts_from_reader<R: Read>(reader: R) -> Result<AccountMap> {
    let mut rdr = tsv_reader(reader, b'\t');
    let mut accounts = BTreeMap::new();
    let mut record = ByteRecord::new();

    while read_next(&mut rdr, &mut record)? {
        if let Some(account) = parse_account_line(&record) {
            accounts.insert(account.num_cuenta, account);
        }
    }

    Ok(accounts)
}

pub fn load_accounts(path: impl AsRef<Path>) -> Result<AccountMap> {
    let accounts = load_accounts_from_reader(File::open(path)?)?;
    debug!("Loaded {} accounts", accounts.len());
    Ok(accounts)
}

pub fn load_entities_from_reader<R: Read>(reader: R) -> Result<EntityMap> {
    let mut rdr = tsv_reader(reader, b'\t');
    let mut entities = BTreeMap::new();
    let mut record = ByteRecord::new();

    while read_next(&mut rdr, &mut record)? {
        if let Some(entity) = parse_entity_line(&record) {
            entities.insert(entity.num_entidad, entity);
        }
    }

    Ok(entities)
}

pub fn load_entities(path: impl AsRef<Path>) -> Result<EntityMap> {
    let entities = load_entities_from_reader(File::open(path)?)?;
    debug!("Loaded {} entities", entities.len());
    Ok(entities)
}

fn parse_index_date(raw: &str) -> Option<NaiveDate> {
    INDEX_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            INDEX_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Workbook formats are read as spreadsheets; anything else as a delimited export.
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn index_point(date: NaiveDate, value: f64) -> Option<(YearMonth, f64)> {
    if value == 0.0 || !value.is_finite() {
        return None;
    }
    Some((YearMonth::from_date(date), value))
}

/// A `(month, value)` pair, or `None` when the row has no real date or an
/// empty or zero value.
pub fn parse_index_row(record: &ByteRecord, separator: DecimalSeparator) -> Option<(YearMonth, f64)> {
    let date = parse_index_date(&field(record, 0)?)?;
    let value: f64 = separator.normalize(&field(record, 1)?).parse().ok()?;
    index_point(date, value)
}

/// Same rules for a worksheet row. Column A must hold a date cell (or date
/// text); a bare number there is not a date and the row is skipped.
pub fn parse_index_cells(row: &[Data], separator: DecimalSeparator) -> Option<(YearMonth, f64)> {
    let date = match row.first()? {
        Data::DateTime(dt) => dt.as_datetime()?.date(),
        Data::DateTimeIso(raw) => parse_index_date(raw.trim())?,
        Data::String(raw) => parse_index_date(&strip_quotes(raw))?,
        _ => return None,
    };
    let value = match row.get(1)? {
        Data::Float(x) => *x,
        Data::Int(n) => *n as f64,
        Data::String(raw) => separator.normalize(&strip_quotes(raw)).parse().ok()?,
        _ => return None,
    };
    index_point(date, value)
}

/// Reads the first worksheet of a workbook.
pub fn load_index_from_workbook(
    path: impl AsRef<Path>,
    separator: DecimalSeparator,
) -> Result<IndexMap> {
    let mut workbook = open_workbook_auto(path)?;
    let mut index = BTreeMap::new();

    let Some(sheet) = workbook.worksheet_range_at(0) else {
        return Ok(index);
    };
    for row in sheet?.rows() {
        if let Some((month, value)) = parse_index_cells(row, separator) {
            index.insert(month, value);
        }
    }

    Ok(index)
}

pub fn load_index_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    separator: DecimalSeparator,
) -> Result<IndexMap> {
    let mut rdr = tsv_reader(reader, delimiter);
    let mut index = BTreeMap::new();
    let mut record = ByteRecord::new();

    while read_next(&mut rdr, &mut record)? {
        if let Some((month, value)) = parse_index_row(&record, separator) {
            index.insert(month, value);
        }
    }

    Ok(index)
}

/// Never fails: an unreadable index yields an empty mapping, which the
/// caller reports as "no data".
pub fn load_index(config: &SourceConfig) -> IndexMap {
    let path = &config.index_path;
    let loaded = if is_spreadsheet(path) {
        load_index_from_workbook(path, config.decimal_separator)
    } else {
        File::open(path)
            .map_err(AdjustmentReportError::from)
            .and_then(|file| {
                load_index_from_reader(file, config.index_delimiter_byte(), config.decimal_separator)
            })
    };

    match loaded {
        Ok(index) => {
            debug!("Loaded {} index points from {}", index.len(), path.display());
            index
        }
        Err(e) => {
            warn!(
                "Price index at {} could not be read ({}); continuing without it",
                path.display(),
                e
            );
            BTreeMap::new()
        }
    }
}

/// Reads the next record, skipping lines the reader itself rejects.
/// Only I/O failures are returned.
pub(crate) fn read_next<R: Read>(rdr: &mut csv::Reader<R>, record: &mut ByteRecord) -> Result<bool> {
    loop {
        match rdr.read_byte_record(record) {
            Ok(more) => return Ok(more),
            Err(e) => match e.kind() {
                csv::ErrorKind::Io(_) => return Err(e.into()),
                _ => continue,
            },
        }
    }
}
