//! Row-size vocabulary of the chart file.
//!
//! A row is labelled either with a decimal acuity (`"0.1"`, `"1.0"`) or a
//! Snellen fraction (`"6/60"`, `"20/20"`). Both reduce to a decimal acuity,
//! the reciprocal of the row's size relative to the 5 arc-minute baseline.

use std::cmp::Ordering;

/// Decimal acuity used for labels outside the vocabulary.
pub const DEFAULT_DECIMAL_ACUITY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RowSize {
    label: String,
    decimal: Option<f64>,
}

impl RowSize {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        Self {
            label: label.to_string(),
            decimal: parse_decimal(label),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_recognized(&self) -> bool {
        self.decimal.is_some()
    }

    pub fn decimal_acuity(&self) -> f64 {
        self.decimal.unwrap_or(DEFAULT_DECIMAL_ACUITY)
    }

    /// Largest rows (lowest acuity) sort first.
    pub fn cmp_by_size(&self, other: &Self) -> Ordering {
        self.decimal_acuity()
            .total_cmp(&other.decimal_acuity())
            .then_with(|| self.label.cmp(&other.label))
    }
}

fn parse_decimal(label: &str) -> Option<f64> {
    let value = match label.split_once('/') {
        Some((distance, letter)) => {
            let distance: f64 = distance.trim().parse().ok()?;
            let letter: f64 = letter.trim().parse().ok()?;
            distance / letter
        }
        None => label.replace(',', ".").parse().ok()?,
    };

    (value.is_finite() && value > 0.0).then_some(value)
}

/// Sorted, de-duplicated vocabulary for a chart's rows.
pub fn size_vocabulary<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<RowSize> {
    let mut sizes: Vec<RowSize> = labels.into_iter().map(RowSize::parse).collect();
    sizes.sort_by(RowSize::cmp_by_size);
    sizes.dedup_by(|a, b| a.label == b.label);
    sizes
}
