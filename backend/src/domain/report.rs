use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Transaction, TransactionType};

pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";
pub const TOP_CATEGORY_LIMIT: usize = 8;
pub const CHART_PALETTE: [&str; 6] = [
    "#6366f1", "#f59e0b", "#10b981", "#ef4444", "#3b82f6", "#ec4899",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum DatePreset {
    #[field(value = "week")]
    Week,
    #[field(value = "month")]
    Month,
    #[field(value = "year")]
    Year,
    #[field(value = "custom")]
    Custom,
}

// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn week_of(today: NaiveDate) -> Self {
        let start = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
        DateRange {
            start,
            end: start + Days::new(6),
        }
    }

    pub fn month_of(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(today);
        DateRange { start, end }
    }

    pub fn year_of(today: NaiveDate) -> Self {
        let year = today.year();
        DateRange {
            start: NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(today),
            end: NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today),
        }
    }

    pub fn from_preset(preset: DatePreset, today: NaiveDate) -> Option<Self> {
        match preset {
            DatePreset::Week => Some(Self::week_of(today)),
            DatePreset::Month => Some(Self::month_of(today)),
            DatePreset::Year => Some(Self::year_of(today)),
            DatePreset::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilters {
    pub date_range: Option<DateRange>,
    pub category_group_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub search: Option<String>,
}

impl ReportFilters {
    pub fn matches(&self, tx: &Transaction, categories: &HashMap<Uuid, &Category>) -> bool {
        if let Some(range) = self.date_range {
            if !range.contains(tx.transaction_date) {
                return false;
            }
        }
        if self.category_group_id.is_some() && tx.category_group_id != self.category_group_id {
            return false;
        }
        if self.category_id.is_some() && tx.category_id != self.category_id {
            return false;
        }
        if self.transaction_type.is_some_and(|kind| kind != tx.transaction_type) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(needle) => search_matches(tx, categories, &needle.to_lowercase()),
        }
    }
}

fn search_matches(tx: &Transaction, categories: &HashMap<Uuid, &Category>, needle: &str) -> bool {
    let note = tx.note.as_deref().unwrap_or_default().to_lowercase();
    let category = tx
        .category_id
        .and_then(|id| categories.get(&id))
        .map(|c| c.name.to_lowercase())
        .unwrap_or_default();
    note.contains(needle) || category.contains(needle) || tx.amount.to_string().contains(needle)
}

pub fn category_index(categories: &[Category]) -> HashMap<Uuid, &Category> {
    categories.iter().map(|c| (c.id, c)).collect()
}

pub fn filter_transactions<'a>(
    transactions: &'a [Transaction],
    categories: &[Category],
    filters: &ReportFilters,
) -> Vec<&'a Transaction> {
    let index = category_index(categories);
    transactions
        .iter()
        .filter(|t| filters.matches(t, &index))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTotals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySlice {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub label: String,
    pub start: NaiveDate,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub totals: TypeTotals,
    pub by_category: Vec<CategorySlice>,
    pub by_day: Vec<PeriodBucket>,
    pub by_month: Vec<PeriodBucket>,
    pub transaction_count: usize,
}

pub fn totals_by_type(transactions: &[&Transaction]) -> TypeTotals {
    let mut totals = TypeTotals::default();
    for tx in transactions {
        match tx.transaction_type {
            TransactionType::Income => totals.income += tx.amount,
            TransactionType::Expense => totals.expense += tx.amount,
        }
    }
    totals.balance = totals.income - totals.expense;
    totals
}

pub fn expenses_by_category(
    transactions: &[&Transaction],
    categories: &HashMap<Uuid, &Category>,
) -> Vec<CategorySlice> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Expense)
    {
        let name = tx
            .category_id
            .and_then(|id| categories.get(&id))
            .map(|c| c.name.as_str())
            .unwrap_or(UNCATEGORIZED_LABEL);
        *sums.entry(name).or_insert(0.0) += tx.amount;
    }

    let mut ranked: Vec<(&str, f64)> = sums.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(TOP_CATEGORY_LIMIT)
        .enumerate()
        .map(|(rank, (name, value))| CategorySlice {
            name: name.to_string(),
            value,
            color: CHART_PALETTE[rank % CHART_PALETTE.len()].to_string(),
        })
        .collect()
}

fn bucketize(
    transactions: &[&Transaction],
    key: impl Fn(NaiveDate) -> NaiveDate,
    label: impl Fn(NaiveDate) -> String,
) -> Vec<PeriodBucket> {
    let mut buckets: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for tx in transactions {
        let entry = buckets.entry(key(tx.transaction_date)).or_default();
        match tx.transaction_type {
            TransactionType::Income => entry.0 += tx.amount,
            TransactionType::Expense => entry.1 += tx.amount,
        }
    }
    buckets
        .into_iter()
        .map(|(start, (income, expense))| PeriodBucket {
            label: label(start),
            start,
            income,
            expense,
            balance: income - expense,
        })
        .collect()
}

pub fn by_day(transactions: &[&Transaction]) -> Vec<PeriodBucket> {
    bucketize(transactions, |d| d, |d| format!("{}/{}", d.day(), d.month()))
}

pub fn by_month(transactions: &[&Transaction]) -> Vec<PeriodBucket> {
    bucketize(
        transactions,
        |d| d.with_day(1).unwrap_or(d),
        |d| d.format("%b %Y").to_string(),
    )
}

pub fn aggregate(
    transactions: &[Transaction],
    categories: &[Category],
    filters: &ReportFilters,
) -> Report {
    let index = category_index(categories);
    let filtered: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| filters.matches(t, &index))
        .collect();

    Report {
        totals: totals_by_type(&filtered),
        by_category: expenses_by_category(&filtered, &index),
        by_day: by_day(&filtered),
        by_month: by_month(&filtered),
        transaction_count: filtered.len(),
    }
}
