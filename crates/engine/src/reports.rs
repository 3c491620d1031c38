//! Pure aggregation over a set of expenses.
//!
//! `build_report` turns a date-descending expense slice into the
//! dashboard views: totals, per-category and per-month breakdowns,
//! vendor ranking and a recent-activity slice. It never re-sorts the
//! input and all grouping is insertion-order-stable, so identical
//! inputs always produce identical output.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    MoneyCents,
    categories::{UNCATEGORIZED_COLOR, UNCATEGORIZED_NAME},
};

const TOP_VENDORS_LIMIT: usize = 10;
const RECENT_LIMIT: usize = 5;

/// One expense as seen by the aggregation engine: the joined category
/// is already resolved to (name, color) by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub id: Uuid,
    pub vendor: String,
    pub amount: MoneyCents,
    pub date: NaiveDate,
    pub category: Option<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_spent: MoneyCents,
    pub total_expenses: usize,
    pub avg_expense: MoneyCents,
    pub top_category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub color: String,
    pub total: MoneyCents,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthBreakdown {
    /// `YYYY-MM` key; lexicographic order equals chronological order.
    pub month: String,
    pub total: MoneyCents,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VendorBreakdown {
    pub vendor: String,
    pub total: MoneyCents,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub stats: ReportStats,
    pub by_category: Vec<CategoryBreakdown>,
    pub by_month: Vec<MonthBreakdown>,
    pub top_vendors: Vec<VendorBreakdown>,
    pub recent: Vec<ReportRow>,
}

/// Groups values by key preserving first-encountered order.
struct OrderedGroups<V> {
    index: HashMap<String, usize>,
    groups: Vec<V>,
}

impl<V> OrderedGroups<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let at = match self.index.get(key) {
            Some(at) => *at,
            None => {
                self.groups.push(init());
                self.index.insert(key.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[at]
    }

    fn into_vec(self) -> Vec<V> {
        self.groups
    }
}

/// Builds the full report from expenses ordered date-descending.
///
/// An empty input yields all-zero stats, empty breakdowns and a null
/// top category; the average is special-cased so the empty set can
/// never divide by zero.
pub fn build_report(rows: &[ReportRow]) -> Report {
    let total_spent = rows
        .iter()
        .fold(MoneyCents::ZERO, |acc, row| acc + row.amount);
    let total_expenses = rows.len();
    let avg_expense = if total_expenses > 0 {
        MoneyCents::new(total_spent.cents() / total_expenses as i64)
    } else {
        MoneyCents::ZERO
    };

    Report {
        stats: ReportStats {
            total_spent,
            total_expenses,
            avg_expense,
            top_category: top_category(rows),
        },
        by_category: by_category(rows, total_spent),
        by_month: by_month(rows),
        top_vendors: top_vendors(rows),
        recent: rows.iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

fn by_category(rows: &[ReportRow], total_spent: MoneyCents) -> Vec<CategoryBreakdown> {
    let mut groups: OrderedGroups<CategoryBreakdown> = OrderedGroups::new();

    for row in rows {
        let (name, color) = match &row.category {
            Some((name, color)) => (name.as_str(), color.as_str()),
            None => (UNCATEGORIZED_NAME, UNCATEGORIZED_COLOR),
        };
        let group = groups.entry(name, || CategoryBreakdown {
            name: name.to_string(),
            color: color.to_string(),
            total: MoneyCents::ZERO,
            count: 0,
            percentage: 0.0,
        });
        group.total += row.amount;
        group.count += 1;
    }

    let mut breakdown = groups.into_vec();
    for group in &mut breakdown {
        group.percentage = if total_spent.is_positive() {
            group.total.cents() as f64 / total_spent.cents() as f64 * 100.0
        } else {
            0.0
        };
    }
    // Stable sort keeps first-encountered order on equal totals.
    breakdown.sort_by(|a, b| b.total.cmp(&a.total));
    breakdown
}

fn top_category(rows: &[ReportRow]) -> Option<String> {
    let mut groups: OrderedGroups<(String, MoneyCents)> = OrderedGroups::new();

    // Only real categories compete for top spot; uncategorized spend
    // never produces a top_category.
    for row in rows {
        if let Some((name, _)) = &row.category {
            let group = groups.entry(name, || (name.clone(), MoneyCents::ZERO));
            group.1 += row.amount;
        }
    }

    let mut best: Option<(String, MoneyCents)> = None;
    for (name, total) in groups.into_vec() {
        // Strictly-greater keeps first-encountered order on ties,
        // matching the by_category sort.
        let replace = best.as_ref().is_none_or(|(_, max)| total > *max);
        if replace {
            best = Some((name, total));
        }
    }
    best.map(|(name, _)| name)
}

fn by_month(rows: &[ReportRow]) -> Vec<MonthBreakdown> {
    let mut groups: OrderedGroups<MonthBreakdown> = OrderedGroups::new();

    for row in rows {
        let month = row.date.format("%Y-%m").to_string();
        let group = groups.entry(&month, || MonthBreakdown {
            month: month.clone(),
            total: MoneyCents::ZERO,
            count: 0,
        });
        group.total += row.amount;
        group.count += 1;
    }

    let mut breakdown = groups.into_vec();
    breakdown.sort_by(|a, b| a.month.cmp(&b.month));
    breakdown
}

fn top_vendors(rows: &[ReportRow]) -> Vec<VendorBreakdown> {
    let mut groups: OrderedGroups<VendorBreakdown> = OrderedGroups::new();

    // Vendors group by exact string, case-sensitive.
    for row in rows {
        let group = groups.entry(&row.vendor, || VendorBreakdown {
            vendor: row.vendor.clone(),
            total: MoneyCents::ZERO,
            count: 0,
        });
        group.total += row.amount;
        group.count += 1;
    }

    let mut breakdown = groups.into_vec();
    breakdown.sort_by(|a, b| b.total.cmp(&a.total));
    breakdown.truncate(TOP_VENDORS_LIMIT);
    breakdown
}
