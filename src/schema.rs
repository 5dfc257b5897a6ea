use crate::error::Result;
use crate::utils::{parse_year_month, MonthRange, YearMonth};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Chart-of-accounts entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub num_cuenta: u32,
    pub descripcion_cuenta: String,
}

/// Entity roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub num_entidad: u32,
    pub nombre_entidad: String,
    pub nombre_corto: String,
}

/// One ledger line: the constant-currency balance (thousands) of one
/// account of one entity at one month-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub num_entidad: u32,
    pub fecha_bce: YearMonth,
    pub num_cuenta: u32,
    pub saldo: f64,
}

/// Which entities a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitySelector {
    All,
    Only(BTreeSet<u32>),
}

impl EntitySelector {
    /// `"0"` anywhere in the list selects every entity, whatever else is present.
    pub fn from_requested<S: AsRef<str>>(requested: &[S]) -> Self {
        let mut ids = BTreeSet::new();
        for raw in requested {
            match raw.as_ref().trim().parse::<u32>() {
                Ok(0) => return EntitySelector::All,
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => {}
            }
        }
        EntitySelector::Only(ids)
    }

    pub fn matches(&self, num_entidad: u32) -> bool {
        match self {
            EntitySelector::All => true,
            EntitySelector::Only(ids) => ids.contains(&num_entidad),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportFilters {
    #[serde(rename = "entidad")]
    #[schemars(
        description = "Entity numbers as strings. \"0\" selects every entity and overrides any other value."
    )]
    pub entity: Vec<String>,

    #[serde(rename = "balhistDesde")]
    #[schemars(description = "First month of the report, YYYY-MM, inclusive.")]
    pub balhist_desde: String,

    #[serde(rename = "balhistHasta")]
    #[schemars(description = "Last month of the report, YYYY-MM, inclusive.")]
    pub balhist_hasta: String,
}

impl ReportFilters {
    pub fn new(entity: Vec<String>, desde: &str, hasta: &str) -> Self {
        Self {
            entity,
            balhist_desde: desde.to_string(),
            balhist_hasta: hasta.to_string(),
        }
    }

    pub fn selector(&self) -> EntitySelector {
        EntitySelector::from_requested(&self.entity)
    }

    pub fn period(&self) -> Result<MonthRange> {
        Ok(MonthRange::new(
            parse_year_month(&self.balhist_desde)?,
            parse_year_month(&self.balhist_hasta)?,
        ))
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportFilters)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
