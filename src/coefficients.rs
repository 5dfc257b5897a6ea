use crate::ingestion::IndexMap;
use crate::utils::YearMonth;

/// One AXI coefficient per month, aligned with `months`.
///
/// The first month has no predecessor and is always zero. Any other month
/// whose own or previous index value is missing (or zero) also gets zero,
/// so a gap in the series removes that month's adjustment instead of
/// failing the report.
pub fn build_coefficients(months: &[YearMonth], index: &IndexMap) -> Vec<f64> {
    let mut coefficients = Vec::with_capacity(months.len());

    for (i, month) in months.iter().enumerate() {
        if i == 0 {
            coefficients.push(0.0);
            continue;
        }

        let current = index.get(month).copied().unwrap_or(0.0);
        let previous = index.get(&months[i - 1]).copied().unwrap_or(0.0);

        let coefficient = if current != 0.0 && previous != 0.0 {
            current / previous - 1.0
        } else {
            0.0
        };
        coefficients.push(coefficient);
    }

    coefficients
}
