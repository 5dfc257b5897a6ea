use crate::error::{AdjustmentReportError, Result, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How decimals are written in the price-index export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum DecimalSeparator {
    /// `1234,56`: the comma is the decimal point.
    #[default]
    Comma,
    /// `1,234.56`: commas are thousands separators and are dropped.
    Dot,
}

impl DecimalSeparator {
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            DecimalSeparator::Comma => raw.replace(',', "."),
            DecimalSeparator::Dot => raw.replace(',', ""),
        }
    }
}

/// Locations and formats of the four input sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub entities_path: PathBuf,
    pub accounts_path: PathBuf,
    pub ledger_path: PathBuf,
    /// A workbook (`.xlsx`, `.xls`, ...) or a delimited export, told apart by extension.
    pub index_path: PathBuf,
    /// Only read for delimited index exports.
    pub index_delimiter: char,
    pub decimal_separator: DecimalSeparator,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl SourceConfig {
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            entities_path: dir.join("nomina.txt"),
            accounts_path: dir.join("cuentas.txt"),
            ledger_path: dir.join("balhist.txt"),
            index_path: dir.join("indices.xlsx"),
            index_delimiter: ';',
            decimal_separator: DecimalSeparator::Comma,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn path_for(&self, kind: SourceKind) -> &Path {
        match kind {
            SourceKind::Ledger => &self.ledger_path,
            SourceKind::Accounts => &self.accounts_path,
            SourceKind::Entities => &self.entities_path,
            SourceKind::Index => &self.index_path,
        }
    }

    /// Fails on the first source whose file does not exist.
    pub fn check_sources(&self) -> Result<()> {
        for kind in [
            SourceKind::Ledger,
            SourceKind::Accounts,
            SourceKind::Entities,
            SourceKind::Index,
        ] {
            self.require(kind)?;
        }
        Ok(())
    }

    pub fn require(&self, kind: SourceKind) -> Result<&Path> {
        let path = self.path_for(kind);
        if path.is_file() {
            Ok(path)
        } else {
            Err(AdjustmentReportError::SourceNotFound {
                source_kind: kind,
                path: path.to_path_buf(),
            })
        }
    }

    /// The index delimiter as the single byte the csv reader expects.
    /// Non-ASCII delimiters fall back to `;`.
    pub fn index_delimiter_byte(&self) -> u8 {
        u8::try_from(self.index_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(b';')
    }
}
