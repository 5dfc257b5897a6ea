use crate::engine::{pivot_accounts, Restater};
use crate::ingestion::{AccountMap, EntityMap};
use crate::report::ReportTable;
use crate::schema::BalanceRecord;
use crate::utils::YearMonth;
use log::debug;
use std::collections::BTreeMap;

pub const MISSING_ENTITY_NAME: &str = "Entidad no encontrada";

/// Reference data the assembler resolves names against.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub accounts: AccountMap,
    pub entities: EntityMap,
}

/// Restates every entity present in `records`, in ascending entity order.
/// Entities whose table ends up header-only are dropped.
pub fn assemble(
    records: &[BalanceRecord],
    lookups: &Lookups,
    months: &[YearMonth],
    coefficients: &[f64],
) -> Vec<ReportTable> {
    let mut by_entity: BTreeMap<u32, Vec<&BalanceRecord>> = BTreeMap::new();
    for record in records {
        by_entity.entry(record.num_entidad).or_default().push(record);
    }

    let restater = Restater::new(months, coefficients);
    let mut tables = Vec::with_capacity(by_entity.len());

    for (num_entidad, entity_records) in by_entity {
        let nombre_entidad = lookups
            .entities
            .get(&num_entidad)
            .map(|e| e.nombre_entidad.as_str())
            .unwrap_or(MISSING_ENTITY_NAME);

        let pivoted = pivot_accounts(entity_records, &lookups.accounts);
        let table = restater.restate(&pivoted, num_entidad, nombre_entidad);

        if table.has_data_rows() {
            debug!(
                "Entity {} restated: {} accounts",
                num_entidad,
                pivoted.len()
            );
            tables.push(table);
        } else {
            debug!("Entity {} has no rows, skipping", num_entidad);
        }
    }

    tables
}
