use adjusted_balance_builder::*;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENTITIES: &str = "\"100\"\t\"Banco Uno\"\t\"B1\"\n\
                        \"200\"\t\"Banco Dos\"\t\"B2\"\n\
                        \"300\"\t\"Banco Tres\"\t\"B3\"\n";

const ACCOUNTS: &str = "\"110001\"\t\"Caja\"\n\
                        \"500001\"\t\"Intereses por prestamos\"\n\
                        \"500002\"\t\"Intereses por titulos\"\n\
                        \"510001\"\t\"Comisiones\"\n";

const LEDGER: &str = "\"100\"\t\"20221231\"\t\"500001\"\t999\n\
                      \"100\"\t\"20230131\"\t\"500001\"\t1000\n\
                      \"100\"\t\"20230228\"\t\"500001\"\t1500\n\
                      \"100\"\t\"20230331\"\t\"500001\"\t1500\n\
                      \"100\"\t\"20230131\"\t\"500002\"\t200\n\
                      \"100\"\t\"20230228\"\t\"500002\"\t200\n\
                      \"100\"\t\"20230331\"\t\"500002\"\t400\n\
                      \"100\"\t\"20230131\"\t\"510001\"\t50\n\
                      \"100\"\t\"20230331\"\t\"510001\"\t80\n\
                      \"100\"\t\"20230131\"\t\"110001\"\t7000\n\
                      \"100\"\t\"20230228\"\t\"110001\"\t7100\n\
                      linea rota\n\
                      \"200\"\t\"20230228\"\t\"110001\"\t300\n\
                      \"300\"\t\"20240131\"\t\"500001\"\t1\n";

const INDEX_CSV: &str = "Fecha;Indice\n\
                         2023-01-31;100\n\
                         2023-02-28;110\n\
                         2023-03-31;132\n";

/// Excel serials for 2023-01-31, 2023-02-28 and 2023-03-31.
const INDEX_POINTS: [(f64, f64); 3] = [(44957.0, 100.0), (44985.0, 110.0), (45016.0, 132.0)];

fn write_index_workbook(path: &Path) -> anyhow::Result<()> {
    let date = Format::new().set_num_format("dd/mm/yyyy");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Fecha")?;
    sheet.write_string(0, 1, "Indice")?;
    for (row, (serial, value)) in (1u32..).zip(INDEX_POINTS) {
        sheet.write_number_with_format(row, 0, serial, &date)?;
        sheet.write_number(row, 1, value)?;
    }
    workbook.save(path)?;
    Ok(())
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("nomina.txt"), ENTITIES)?;
        fs::write(dir.path().join("cuentas.txt"), ACCOUNTS)?;
        fs::write(dir.path().join("balhist.txt"), LEDGER)?;
        write_index_workbook(&dir.path().join("indices.xlsx"))?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config(&self) -> SourceConfig {
        SourceConfig::with_data_dir(self.dir.path())
    }

    fn reporter(&self) -> AdjustmentReporter {
        AdjustmentReporter::new(self.config())
    }
}

fn filters(entities: &[&str], desde: &str, hasta: &str) -> ReportFilters {
    ReportFilters::new(
        entities.iter().map(|e| e.to_string()).collect(),
        desde,
        hasta,
    )
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_list_entities_returns_full_roster() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let entities = fixture.reporter().list_entities()?;

    let numbers: Vec<u32> = entities.iter().map(|e| e.num_entidad).collect();
    assert_eq!(numbers, vec![100, 200, 300]);
    assert_eq!(entities[1].nombre_corto, "B2");
    Ok(())
}

#[test]
fn test_end_to_end_single_entity() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let bundle = fixture
        .reporter()
        .generate_report(&filters(&["100"], "2023-01", "2023-03"))?;

    assert_eq!(
        bundle.file_name,
        "Reporte_Ajustado_Final_2023-01_a_2023-03.xlsx"
    );
    assert_eq!(bundle.tables.len(), 1);
    assert_eq!(bundle.toc.len(), 1);
    assert_eq!(bundle.toc[0].num_entidad, 100);
    assert_eq!(bundle.toc[0].nombre_entidad, "Banco Uno");

    let table = &bundle.tables[0];
    assert_eq!(table.header.coefficients.len(), 3);
    assert_eq!(table.header.coefficients[0], 0.0);
    assert!(close(table.header.coefficients[1], 0.1));
    assert!(close(table.header.coefficients[2], 0.2));

    // December 2022 is outside the range and must not leak into January.
    let interest = table.account(500_001).unwrap();
    assert_eq!(interest.descripcion_cuenta, "Intereses por prestamos");
    assert_eq!(interest.value(0, Metric::ConstantBalance), 1000.0);
    assert_eq!(interest.value(0, Metric::MonthlyAdjustment), 0.0);
    assert!(close(interest.value(1, Metric::MonthlyAdjustment), 100.0));
    assert!(close(interest.value(2, Metric::MonthlyAdjustment), 300.0));
    assert!(close(interest.value(2, Metric::CumulativeAdjustment), 400.0));
    assert!(close(interest.value(2, Metric::CumulativeHistorical), 1100.0));

    // Commissions have no February line: zero balance that month.
    let commissions = table.account(510_001).unwrap();
    assert_eq!(commissions.value(1, Metric::ConstantBalance), 0.0);
    assert!(close(commissions.value(1, Metric::MonthlyAdjustment), 5.0));
    assert_eq!(commissions.value(2, Metric::MonthlyAdjustment), 0.0);

    let cash = table.account(110_001).unwrap();
    for month in 0..3 {
        assert_eq!(cash.value(month, Metric::CumulativeAdjustment), 0.0);
    }

    let groups: Vec<&str> = table.subtotals().map(|(g, _)| g).collect();
    assert_eq!(groups, vec!["50", "51"]);
    let total = table.grand_total().unwrap();
    let expected_total: f64 = table
        .account_rows()
        .filter(|row| is_adjustable(row.num_cuenta))
        .map(|row| row.value(2, Metric::CumulativeAdjustment))
        .sum();
    assert!(close(total[10 + 4], expected_total));

    assert!(matches!(table.rows.last(), Some(ReportRow::Account(row)) if row.num_cuenta == 110_001));
    Ok(())
}

#[test]
fn test_all_selector_overrides_explicit_ids() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let reporter = fixture.reporter();

    let all = reporter.generate_report(&filters(&["0"], "2023-01", "2023-03"))?;
    let mixed = reporter.generate_report(&filters(&["200", "0"], "2023-01", "2023-03"))?;

    let entities: Vec<u32> = all.toc.iter().map(|e| e.num_entidad).collect();
    assert_eq!(entities, vec![100, 200]);
    assert_eq!(all, mixed);
    Ok(())
}

#[test]
fn test_report_is_idempotent() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let reporter = fixture.reporter();
    let f = filters(&["100", "200"], "2023-01", "2023-03");

    let first = reporter.generate_report(&f)?;
    let second = reporter.generate_report(&f)?;

    assert_eq!(first.to_json()?, second.to_json()?);
    assert_eq!(first.tables[0].to_csv()?, second.tables[0].to_csv()?);
    Ok(())
}

#[test]
fn test_no_matching_records_is_no_data() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let result = fixture
        .reporter()
        .generate_report(&filters(&["999"], "2023-01", "2023-03"));
    assert!(matches!(result, Err(AdjustmentReportError::NoData { .. })));

    let reversed = fixture
        .reporter()
        .generate_report(&filters(&["0"], "2023-05", "2023-01"));
    assert!(matches!(reversed, Err(AdjustmentReportError::NoData { .. })));
    Ok(())
}

#[test]
fn test_unreadable_index_is_no_data() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fs::write(fixture.path("indices.xlsx"), "sin;datos\nvalidos;aqui\n")?;

    let result = fixture
        .reporter()
        .generate_report(&filters(&["100"], "2023-01", "2023-03"));
    assert!(matches!(result, Err(AdjustmentReportError::NoData { .. })));
    Ok(())
}

#[test]
fn test_missing_index_file_is_named() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fs::remove_file(fixture.path("indices.xlsx"))?;

    match fixture
        .reporter()
        .generate_report(&filters(&["100"], "2023-01", "2023-03"))
    {
        Err(AdjustmentReportError::SourceNotFound { source_kind, .. }) => {
            assert_eq!(source_kind, SourceKind::Index)
        }
        other => panic!("expected SourceNotFound, got {:?}", other.map(|b| b.file_name)),
    }
    Ok(())
}

#[test]
fn test_invalid_period_is_rejected() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let result = fixture
        .reporter()
        .generate_report(&filters(&["100"], "enero", "2023-03"));
    assert!(matches!(result, Err(AdjustmentReportError::InvalidPeriod(_))));
    Ok(())
}

#[test]
fn test_config_from_json_file_with_delimited_index() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fs::write(fixture.path("indices.csv"), INDEX_CSV)?;
    let config_path = fixture.path("config.json");
    let config_json = serde_json::json!({
        "entities_path": fixture.path("nomina.txt"),
        "accounts_path": fixture.path("cuentas.txt"),
        "ledger_path": fixture.path("balhist.txt"),
        "index_path": fixture.path("indices.csv"),
        "index_delimiter": ";",
        "decimal_separator": "Comma"
    });
    fs::write(&config_path, serde_json::to_string_pretty(&config_json)?)?;

    let config = SourceConfig::from_json_file(&config_path)?;
    let bundle = generate_report(&config, &filters(&["200"], "2023-02", "2023-02"))?;

    assert_eq!(bundle.tables.len(), 1);
    let cash = bundle.tables[0].account(110_001).unwrap();
    assert_eq!(cash.value(0, Metric::ConstantBalance), 300.0);
    assert_eq!(cash.value(0, Metric::MonthlyHistorical), 300.0);

    let delimited = generate_report(&config, &filters(&["100"], "2023-01", "2023-03"))?;
    let workbook = fixture
        .reporter()
        .generate_report(&filters(&["100"], "2023-01", "2023-03"))?;
    assert_eq!(delimited, workbook);
    Ok(())
}

#[test]
fn test_workbook_index_two_month_report() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let bundle = fixture
        .reporter()
        .generate_report(&filters(&["100"], "2023-01", "2023-02"))?;

    assert_eq!(bundle.file_name, "Reporte_Ajustado_Final_2023-01_a_2023-02.xlsx");
    let coefficients = &bundle.tables[0].header.coefficients;
    assert_eq!(coefficients.len(), 2);
    assert_eq!(coefficients[0], 0.0);
    assert!(close(coefficients[1], 0.1));
    Ok(())
}
