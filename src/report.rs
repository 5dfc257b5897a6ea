//! Tabular output of the restatement engine.
//!
//! A [`ReportTable`] is a positional matrix: four leading identification
//! columns followed by five numeric columns per month. Rendering it into a
//! spreadsheet (styles, merges, widths, hyperlinks) belongs to the caller;
//! [`ReportTable::to_grid`] and [`ReportTable::write_csv`] give it the cells.

use crate::error::Result;
use crate::utils::YearMonth;
use serde::Serialize;
use std::io::Write;

pub const LEADING_COLUMNS: usize = 4;
pub const METRICS_PER_MONTH: usize = 5;

pub const NAVIGATION_LABEL: &str = "Volver al Índice";
pub const DISCLAIMER: &str =
    "Saldos en miles de moneda homogénea. Componente histórico obtenido restando el ajuste por inflación acumulado (coeficientes AXI).";
pub const COEFFICIENT_LABEL: &str = "Coeficiente AXI";
pub const GRAND_TOTAL_LABEL: &str = "Total";
pub const GRAND_TOTAL_DESCRIPTION: &str = "Total cuentas de resultados";

const LEADING_TITLES: [&str; LEADING_COLUMNS] =
    ["Entidad", "Nombre Entidad", "Cuenta", "Descripción Cuenta"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    ConstantBalance,
    MonthlyHistorical,
    CumulativeHistorical,
    MonthlyAdjustment,
    CumulativeAdjustment,
}

impl Metric {
    pub const ALL: [Metric; METRICS_PER_MONTH] = [
        Metric::ConstantBalance,
        Metric::MonthlyHistorical,
        Metric::CumulativeHistorical,
        Metric::MonthlyAdjustment,
        Metric::CumulativeAdjustment,
    ];

    pub fn offset(self) -> usize {
        match self {
            Metric::ConstantBalance => 0,
            Metric::MonthlyHistorical => 1,
            Metric::CumulativeHistorical => 2,
            Metric::MonthlyAdjustment => 3,
            Metric::CumulativeAdjustment => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::ConstantBalance => "Saldo Moneda Homogénea",
            Metric::MonthlyHistorical => "Variación Histórica",
            Metric::CumulativeHistorical => "Saldo Histórico",
            Metric::MonthlyAdjustment => "Ajuste del Mes",
            Metric::CumulativeAdjustment => "Ajuste Acumulado",
        }
    }
}

/// Position of a metric inside a row's numeric values.
pub fn value_index(month_idx: usize, metric: Metric) -> usize {
    METRICS_PER_MONTH * month_idx + metric.offset()
}

/// Position of a metric in the full row, leading columns included.
pub fn column_index(month_idx: usize, metric: Metric) -> usize {
    LEADING_COLUMNS + value_index(month_idx, metric)
}

pub fn column_titles(months: &[YearMonth]) -> Vec<String> {
    let mut titles: Vec<String> = LEADING_TITLES.iter().map(|t| t.to_string()).collect();
    for month in months {
        for metric in Metric::ALL {
            titles.push(format!("{} {}", month.month_key(), metric.title()));
        }
    }
    titles
}

/// The three rows preceding the data: navigation/disclaimer, AXI
/// coefficients, column titles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportHeader {
    pub notice: String,
    pub months: Vec<YearMonth>,
    pub coefficients: Vec<f64>,
    pub column_titles: Vec<String>,
}

impl ReportHeader {
    pub fn new(months: &[YearMonth], coefficients: &[f64]) -> Self {
        Self {
            notice: DISCLAIMER.to_string(),
            months: months.to_vec(),
            coefficients: coefficients.to_vec(),
            column_titles: column_titles(months),
        }
    }

    pub fn width(&self) -> usize {
        LEADING_COLUMNS + METRICS_PER_MONTH * self.months.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub num_cuenta: u32,
    pub descripcion_cuenta: String,
    /// `METRICS_PER_MONTH` values per month, in month order.
    pub values: Vec<f64>,
}

impl AccountRow {
    pub fn value(&self, month_idx: usize, metric: Metric) -> f64 {
        self.values[value_index(month_idx, metric)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRow {
    Account(AccountRow),
    Subtotal { group: String, values: Vec<f64> },
    GrandTotal { values: Vec<f64> },
    Blank,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Cell {
    fn to_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Integer(n) => n.to_string(),
            Cell::Number(x) => x.to_string(),
        }
    }
}

/// One entity's restated balances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub num_entidad: u32,
    pub nombre_entidad: String,
    pub header: ReportHeader,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    /// Header-only tables carry nothing worth rendering.
    pub fn has_data_rows(&self) -> bool {
        self.rows
            .iter()
            .any(|row| matches!(row, ReportRow::Account(_)))
    }

    pub fn account_rows(&self) -> impl Iterator<Item = &AccountRow> {
        self.rows.iter().filter_map(|row| match row {
            ReportRow::Account(account) => Some(account),
            _ => None,
        })
    }

    pub fn account(&self, num_cuenta: u32) -> Option<&AccountRow> {
        self.account_rows().find(|row| row.num_cuenta == num_cuenta)
    }

    pub fn subtotals(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.rows.iter().filter_map(|row| match row {
            ReportRow::Subtotal { group, values } => Some((group.as_str(), values.as_slice())),
            _ => None,
        })
    }

    pub fn grand_total(&self) -> Option<&[f64]> {
        self.rows.iter().find_map(|row| match row {
            ReportRow::GrandTotal { values } => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Full positional matrix: three header rows, then one row per entry
    /// in `rows`, every row `header.width()` cells wide.
    pub fn to_grid(&self) -> Vec<Vec<Cell>> {
        let width = self.header.width();
        let mut grid = Vec::with_capacity(self.rows.len() + 3);

        let mut notice = vec![Cell::Empty; width];
        notice[0] = Cell::Text(NAVIGATION_LABEL.to_string());
        notice[1] = Cell::Text(self.header.notice.clone());
        grid.push(notice);

        let mut coefficients = vec![Cell::Empty; width];
        coefficients[LEADING_COLUMNS - 1] = Cell::Text(COEFFICIENT_LABEL.to_string());
        for (i, coefficient) in self.header.coefficients.iter().enumerate() {
            coefficients[column_index(i, Metric::ConstantBalance)] = Cell::Number(*coefficient);
        }
        grid.push(coefficients);

        grid.push(
            self.header
                .column_titles
                .iter()
                .map(|t| Cell::Text(t.clone()))
                .collect(),
        );

        for row in &self.rows {
            let (account_cell, description, values) = match row {
                ReportRow::Account(account) => (
                    Cell::Integer(i64::from(account.num_cuenta)),
                    account.descripcion_cuenta.clone(),
                    account.values.as_slice(),
                ),
                ReportRow::Subtotal { group, values } => (
                    Cell::Text(format!("Subtotal {}", group)),
                    format!("Subtotal grupo {}", group),
                    values.as_slice(),
                ),
                ReportRow::GrandTotal { values } => (
                    Cell::Text(GRAND_TOTAL_LABEL.to_string()),
                    GRAND_TOTAL_DESCRIPTION.to_string(),
                    values.as_slice(),
                ),
                ReportRow::Blank => {
                    grid.push(vec![Cell::Empty; width]);
                    continue;
                }
            };

            let mut cells = Vec::with_capacity(width);
            cells.push(Cell::Integer(i64::from(self.num_entidad)));
            cells.push(Cell::Text(self.nombre_entidad.clone()));
            cells.push(account_cell);
            cells.push(Cell::Text(description));
            cells.extend(values.iter().map(|v| Cell::Number(*v)));
            grid.push(cells);
        }

        grid
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for row in self.to_grid() {
            wtr.write_record(row.iter().map(Cell::to_field))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Table-of-contents line for one rendered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub sheet_name: String,
    pub num_entidad: u32,
    pub nombre_entidad: String,
}

impl TocEntry {
    pub fn for_table(table: &ReportTable) -> Self {
        Self {
            sheet_name: sheet_name(table.num_entidad),
            num_entidad: table.num_entidad,
            nombre_entidad: table.nombre_entidad.clone(),
        }
    }
}

pub fn sheet_name(num_entidad: u32) -> String {
    format!("Entidad_{:05}", num_entidad)
}

pub fn report_file_name(desde: &str, hasta: &str) -> String {
    format!("Reporte_Ajustado_Final_{}_a_{}.xlsx", desde, hasta)
}

/// Everything a workbook renderer needs: index sheet plus one table per entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBundle {
    pub file_name: String,
    pub toc: Vec<TocEntry>,
    pub tables: Vec<ReportTable>,
}

impl ReportBundle {
    pub fn new(file_name: String, tables: Vec<ReportTable>) -> Self {
        let toc = tables.iter().map(TocEntry::for_table).collect();
        Self {
            file_name,
            toc,
            tables,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ReportTable {
        let months = vec![YearMonth::new(2023, 1).unwrap(), YearMonth::new(2023, 2).unwrap()];
        ReportTable {
            num_entidad: 7,
            nombre_entidad: "Banco Siete".to_string(),
            header: ReportHeader::new(&months, &[0.0, 0.05]),
            rows: vec![
                ReportRow::Account(AccountRow {
                    num_cuenta: 510001,
                    descripcion_cuenta: "Comisiones".to_string(),
                    values: (0..10).map(f64::from).collect(),
                }),
                ReportRow::Subtotal {
                    group: "51".to_string(),
                    values: (0..10).map(f64::from).collect(),
                },
                ReportRow::Blank,
            ],
        }
    }

    #[test]
    fn test_positional_offsets() {
        assert_eq!(column_index(0, Metric::ConstantBalance), 4);
        assert_eq!(column_index(1, Metric::CumulativeAdjustment), 4 + 5 + 4);
        assert_eq!(value_index(2, Metric::MonthlyHistorical), 11);
    }

    #[test]
    fn test_column_titles_follow_offsets() {
        let table = sample_table();
        let titles = &table.header.column_titles;
        assert_eq!(titles.len(), table.header.width());
        assert_eq!(titles[2], "Cuenta");
        assert_eq!(
            titles[column_index(1, Metric::MonthlyAdjustment)],
            "02-2023 Ajuste del Mes"
        );
    }

    #[test]
    fn test_grid_shape() {
        let table = sample_table();
        let grid = table.to_grid();

        assert_eq!(grid.len(), 3 + 3);
        assert!(grid.iter().all(|row| row.len() == 14));
        assert_eq!(grid[1][column_index(1, Metric::ConstantBalance)], Cell::Number(0.05));
        assert_eq!(grid[3][2], Cell::Integer(510001));
        assert_eq!(grid[3][column_index(1, Metric::MonthlyHistorical)], Cell::Number(6.0));
        assert_eq!(grid[4][2], Cell::Text("Subtotal 51".to_string()));
        assert!(grid[5].iter().all(|c| *c == Cell::Empty));
        assert!(table.has_data_rows());
    }

    #[test]
    fn test_csv_export() {
        let csv = sample_table().to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Volver al Índice,"));
        assert!(lines[3].starts_with("7,Banco Siete,510001,Comisiones,0,1,2"));
    }

    #[test]
    fn test_bundle_toc_and_name() {
        let bundle = ReportBundle::new(report_file_name("2023-01", "2023-02"), vec![sample_table()]);
        assert_eq!(bundle.file_name, "Reporte_Ajustado_Final_2023-01_a_2023-02.xlsx");
        assert_eq!(bundle.toc[0].sheet_name, "Entidad_00007");
        assert!(bundle.to_json().unwrap().contains("\"kind\": \"subtotal\""));
    }
}
