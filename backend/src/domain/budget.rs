use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{Budget, BudgetPeriod, Transaction, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

impl BudgetPeriod {
    // Monthly keeps the day of month, clamped to the last day of a shorter month.
    pub fn window_from(self, start: NaiveDate) -> PeriodWindow {
        let end = match self {
            BudgetPeriod::Weekly => start.checked_add_days(Days::new(7)),
            BudgetPeriod::Monthly => start.checked_add_months(Months::new(1)),
        }
        .unwrap_or(NaiveDate::MAX);
        PeriodWindow { start, end }
    }
}

pub fn period_window(budget: &Budget) -> PeriodWindow {
    budget.period.window_from(budget.start_date)
}

pub fn compute_spend(budget: &Budget, transactions: &[Transaction]) -> f64 {
    let window = period_window(budget);
    transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Expense)
        .filter(|t| window.contains(t.transaction_date))
        .filter(|t| budget.category_id.is_none() || t.category_id == budget.category_id)
        .map(|t| t.amount)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    #[serde(flatten)]
    pub budget: Budget,
    pub window: PeriodWindow,
    pub spent: f64,
    pub percentage: f64,
    pub over_budget: bool,
    // Negative once over budget.
    pub remaining: f64,
}

impl BudgetProgress {
    pub fn evaluate(budget: &Budget, transactions: &[Transaction]) -> Self {
        let spent = compute_spend(budget, transactions);
        let percentage = if budget.amount > 0.0 {
            (spent / budget.amount).min(1.0)
        } else {
            0.0
        };

        BudgetProgress {
            budget: budget.clone(),
            window: period_window(budget),
            spent,
            percentage,
            over_budget: spent > budget.amount,
            remaining: budget.amount - spent,
        }
    }
}
