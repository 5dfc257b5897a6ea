use crate::ingestion::AccountMap;
use crate::report::{AccountRow, Metric, ReportHeader, ReportRow, ReportTable, METRICS_PER_MONTH};
use crate::schema::BalanceRecord;
use crate::utils::YearMonth;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// Results accounts: the only ones that accrue an inflation adjustment.
pub const ADJUSTABLE_ACCOUNTS: Range<u32> = 500_000..700_000;

pub const MISSING_DESCRIPTION: &str = "Descripción no encontrada";

pub fn is_adjustable(num_cuenta: u32) -> bool {
    ADJUSTABLE_ACCOUNTS.contains(&num_cuenta)
}

/// Subtotal group of an account: the first two characters of its decimal form.
pub fn group_prefix(num_cuenta: u32) -> String {
    num_cuenta.to_string().chars().take(2).collect()
}

/// One account's balances for one entity, keyed by month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotedAccount {
    pub descripcion_cuenta: String,
    pub saldos: BTreeMap<YearMonth, f64>,
}

pub type PivotedAccounts = BTreeMap<u32, PivotedAccount>;

/// Groups one entity's records by account and month. A later record for the
/// same (account, month) replaces the earlier one.
pub fn pivot_accounts<'a, I>(records: I, accounts: &AccountMap) -> PivotedAccounts
where
    I: IntoIterator<Item = &'a BalanceRecord>,
{
    let mut pivoted: PivotedAccounts = BTreeMap::new();

    for record in records {
        let entry = pivoted.entry(record.num_cuenta).or_insert_with(|| PivotedAccount {
            descripcion_cuenta: accounts
                .get(&record.num_cuenta)
                .map(|a| a.descripcion_cuenta.clone())
                .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
            saldos: BTreeMap::new(),
        });
        entry.saldos.insert(record.fecha_bce, record.saldo);
    }

    pivoted
}

/// The five derived figures of one account in one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MonthFigures {
    pub constant_balance: f64,
    pub monthly_historical: f64,
    pub cumulative_historical: f64,
    pub monthly_adjustment: f64,
    pub cumulative_adjustment: f64,
}

impl MonthFigures {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ConstantBalance => self.constant_balance,
            Metric::MonthlyHistorical => self.monthly_historical,
            Metric::CumulativeHistorical => self.cumulative_historical,
            Metric::MonthlyAdjustment => self.monthly_adjustment,
            Metric::CumulativeAdjustment => self.cumulative_adjustment,
        }
    }
}

/// Running totals carried from one month to the next within an account.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanState {
    pub prior_cumulative_historical: f64,
    pub prior_cumulative_adjustment: f64,
    pub prior_constant_balance: f64,
}

impl ScanState {
    pub fn step(self, saldo: f64, coefficient: f64, adjustable: bool) -> (ScanState, MonthFigures) {
        let constant_balance = saldo;
        let monthly_adjustment = if adjustable {
            self.prior_constant_balance * coefficient
        } else {
            0.0
        };
        let cumulative_adjustment = self.prior_cumulative_adjustment + monthly_adjustment;
        let cumulative_historical = constant_balance - cumulative_adjustment;
        let monthly_historical = cumulative_historical - self.prior_cumulative_historical;

        let next = ScanState {
            prior_cumulative_historical: cumulative_historical,
            prior_cumulative_adjustment: cumulative_adjustment,
            prior_constant_balance: constant_balance,
        };
        let figures = MonthFigures {
            constant_balance,
            monthly_historical,
            cumulative_historical,
            monthly_adjustment,
            cumulative_adjustment,
        };
        (next, figures)
    }
}

/// Scan output for one account, one entry per month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRow {
    pub num_cuenta: u32,
    pub months: Vec<MonthFigures>,
}

impl DerivedRow {
    /// Flat positional values, `METRICS_PER_MONTH` per month.
    pub fn to_values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.months.len() * METRICS_PER_MONTH);
        for figures in &self.months {
            values.extend(Metric::ALL.iter().map(|m| figures.get(*m)));
        }
        values
    }
}

pub struct Restater<'a> {
    months: &'a [YearMonth],
    coefficients: &'a [f64],
}

impl<'a> Restater<'a> {
    pub fn new(months: &'a [YearMonth], coefficients: &'a [f64]) -> Self {
        debug_assert_eq!(months.len(), coefficients.len());
        Self {
            months,
            coefficients,
        }
    }

    pub fn restate_account(&self, num_cuenta: u32, account: &PivotedAccount) -> DerivedRow {
        let adjustable = is_adjustable(num_cuenta);
        let mut state = ScanState::default();
        let mut months = Vec::with_capacity(self.months.len());

        for (month, coefficient) in self.months.iter().zip(self.coefficients) {
            let saldo = account.saldos.get(month).copied().unwrap_or(0.0);
            let (next, figures) = state.step(saldo, *coefficient, adjustable);
            months.push(figures);
            state = next;
        }

        DerivedRow { num_cuenta, months }
    }

    fn account_row(&self, num_cuenta: u32, account: &PivotedAccount) -> AccountRow {
        AccountRow {
            num_cuenta,
            descripcion_cuenta: account.descripcion_cuenta.clone(),
            values: self.restate_account(num_cuenta, account).to_values(),
        }
    }

    /// Builds one entity's table: results accounts grouped by prefix with a
    /// subtotal per group and a grand total, then a blank separator, then
    /// every other account. Both blocks ascend by account number.
    pub fn restate(
        &self,
        pivoted: &PivotedAccounts,
        num_entidad: u32,
        nombre_entidad: &str,
    ) -> ReportTable {
        let width = self.months.len() * METRICS_PER_MONTH;
        let mut rows = Vec::new();

        let (adjustable, others): (Vec<_>, Vec<_>) =
            pivoted.iter().partition(|(num, _)| is_adjustable(**num));

        if !adjustable.is_empty() {
            let mut grand_total = vec![0.0; width];
            let mut group: Option<(String, Vec<f64>)> = None;

            for (num_cuenta, account) in adjustable {
                let row = self.account_row(*num_cuenta, account);
                let prefix = group_prefix(*num_cuenta);

                let crossed = matches!(&group, Some((current, _)) if *current != prefix);
                if crossed {
                    if let Some((closed, subtotal)) = group.take() {
                        add_into(&mut grand_total, &subtotal);
                        rows.push(ReportRow::Subtotal {
                            group: closed,
                            values: subtotal,
                        });
                    }
                }

                let (_, subtotal) = group.get_or_insert_with(|| (prefix, vec![0.0; width]));
                add_into(subtotal, &row.values);
                rows.push(ReportRow::Account(row));
            }

            if let Some((closed, subtotal)) = group.take() {
                add_into(&mut grand_total, &subtotal);
                rows.push(ReportRow::Subtotal {
                    group: closed,
                    values: subtotal,
                });
            }
            rows.push(ReportRow::GrandTotal {
                values: grand_total,
            });

            if !others.is_empty() {
                rows.push(ReportRow::Blank);
            }
        }

        for (num_cuenta, account) in others {
            rows.push(ReportRow::Account(self.account_row(*num_cuenta, account)));
        }

        ReportTable {
            num_entidad,
            nombre_entidad: nombre_entidad.to_string(),
            header: ReportHeader::new(self.months, self.coefficients),
            rows,
        }
    }
}

pub fn restate(
    pivoted: &PivotedAccounts,
    months: &[YearMonth],
    coefficients: &[f64],
    num_entidad: u32,
    nombre_entidad: &str,
) -> ReportTable {
    Restater::new(months, coefficients).restate(pivoted, num_entidad, nombre_entidad)
}

fn add_into(total: &mut [f64], values: &[f64]) {
    for (t, v) in total.iter_mut().zip(values) {
        *t += v;
    }
}
