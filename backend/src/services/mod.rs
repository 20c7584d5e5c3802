pub mod budgets;
pub mod catalog;
pub mod relationships;
pub mod reminders;
pub mod reports;
pub mod transactions;

pub use budgets::BudgetService;
pub use catalog::CatalogService;
pub use relationships::RelationshipService;
pub use reminders::ReminderService;
pub use reports::ReportService;
pub use transactions::TransactionService;

use crate::error::ApiError;

pub(crate) fn require_text(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

// Amounts are kept to the cent.
pub(crate) fn require_positive(amount: f64, field: &str) -> Result<f64, ApiError> {
    if !amount.is_finite() || (amount * 100.0).round() < 1.0 {
        return Err(ApiError::validation(format!("{field} must be greater than zero")));
    }
    Ok(amount)
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
