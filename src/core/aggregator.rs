use crate::domain::model::{CategoryBreakdown, ExpenseRecord, SavingsProjection};
use std::collections::{BTreeMap, BTreeSet};

const DAYS_PER_YEAR: f64 = 365.0;

/// Sum of `amount` per category. Categories are keyed by their exact text.
pub fn category_totals(expenses: &[ExpenseRecord]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.clone()).or_default() += expense.amount;
    }
    totals
}

/// Average amount per transaction for each category (`total / count`).
///
/// Despite the name this is not a per-calendar-day figure. Downstream reports
/// already label it "daily average", so the per-transaction semantics are kept.
pub fn daily_averages(expenses: &[ExpenseRecord]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for expense in expenses {
        let entry = sums.entry(expense.category.clone()).or_default();
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(category, (total, count))| (category, total / count as f64))
        .collect()
}

/// Total, count, average and share of the grand total for each category.
pub fn category_breakdown(expenses: &[ExpenseRecord]) -> BTreeMap<String, CategoryBreakdown> {
    let grand_total: f64 = expenses.iter().map(|e| e.amount).sum();

    let mut breakdown: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();
    for expense in expenses {
        let entry = breakdown.entry(expense.category.clone()).or_default();
        entry.total_spent += expense.amount;
        entry.transaction_count += 1;
    }

    for entry in breakdown.values_mut() {
        entry.average_transaction = entry.total_spent / entry.transaction_count as f64;
        entry.percentage_of_total = if grand_total != 0.0 {
            entry.total_spent / grand_total * 100.0
        } else {
            0.0
        };
    }
    breakdown
}

/// Projects yearly savings if each targeted category shrinks by its percentage.
///
/// The savings over the loaded period are divided by the number of distinct
/// transaction dates and scaled to 365 days. Targets naming a category absent
/// from the data contribute nothing. With no dated records the projection is
/// `InsufficientData`.
pub fn project_annual_savings(
    expenses: &[ExpenseRecord],
    reduction_targets: &BTreeMap<String, f64>,
) -> SavingsProjection {
    let distinct_days = expenses.iter().map(|e| e.date).collect::<BTreeSet<_>>().len();
    if distinct_days == 0 {
        return SavingsProjection::InsufficientData {
            reason: "no dated expense records to project from".to_string(),
        };
    }

    let totals = category_totals(expenses);
    let period_savings: f64 = reduction_targets
        .iter()
        .filter_map(|(category, pct)| totals.get(category).map(|total| total * (pct / 100.0)))
        .sum();

    let annual_savings = period_savings / distinct_days as f64 * DAYS_PER_YEAR;
    tracing::debug!(
        "Projected {:.2} over {} day(s), {:.2} per year",
        period_savings,
        distinct_days,
        annual_savings
    );

    SavingsProjection::Projected {
        annual_savings: round_cents(annual_savings),
        period_savings: round_cents(period_savings),
        distinct_days,
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
