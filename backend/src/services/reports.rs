use chrono::{Days, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use super::{BudgetService, ReminderService, TransactionService};
use crate::domain::budget::BudgetProgress;
use crate::domain::report::{self, DateRange, Report, ReportFilters, TypeTotals};
use crate::error::ApiError;
use crate::models::{ReminderView, TransactionView};
use crate::store::DataStore;

pub const RECENT_TRANSACTION_LIMIT: usize = 5;
pub const REMINDER_HORIZON_DAYS: u64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub month: DateRange,
    pub totals: TypeTotals,
    pub recent_transactions: Vec<TransactionView>,
    pub upcoming_reminders: Vec<ReminderView>,
    pub budgets: Vec<BudgetProgress>,
}

pub struct ReportService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> ReportService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        ReportService { store }
    }

    pub async fn report(&self, acting: Uuid, filters: &ReportFilters) -> Result<Report, ApiError> {
        let transactions = TransactionService::new(self.store);
        let directory = transactions.directory(acting).await?;
        if let Some(group_id) = filters.category_group_id {
            if !directory.has_group(group_id) {
                return Err(ApiError::not_found("category group"));
            }
        }
        let snapshot = transactions.snapshot(acting, &directory.group_ids()).await?;
        let report = report::aggregate(&snapshot.transactions, &snapshot.categories, filters);
        tracing::debug!(user = %acting, matched = report.transaction_count, "report aggregated");
        Ok(report)
    }

    pub async fn dashboard(&self, acting: Uuid, today: NaiveDate) -> Result<Dashboard, ApiError> {
        let month = DateRange::month_of(today);
        let this_month = ReportFilters {
            date_range: Some(month),
            ..Default::default()
        };
        let totals = self.report(acting, &this_month).await?.totals;

        let mut recent_transactions = TransactionService::new(self.store)
            .list(acting, &ReportFilters::default())
            .await?;
        recent_transactions.truncate(RECENT_TRANSACTION_LIMIT);

        let horizon = today
            .checked_add_days(Days::new(REMINDER_HORIZON_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let upcoming_reminders = ReminderService::new(self.store)
            .upcoming(acting, today, horizon)
            .await?;

        let budgets = BudgetService::new(self.store).list_progress(acting).await?;

        Ok(Dashboard {
            month,
            totals,
            recent_transactions,
            upcoming_reminders,
            budgets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::DatePreset;
    use crate::models::{
        CreateCategoryRequest, ReminderRequest, TransactionRequest, TransactionType,
    };
    use crate::services::{CatalogService, RelationshipService, fixtures};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(kind: TransactionType, amount: f64, on: NaiveDate, category_id: Option<Uuid>) -> TransactionRequest {
        TransactionRequest {
            transaction_type: kind,
            amount,
            note: None,
            transaction_date: Some(on),
            category_id,
            category_group_id: None,
            paid_by: None,
        }
    }

    #[tokio::test]
    async fn report_respects_preset_range_and_group_visibility() {
        let store = fixtures::store();
        let ana = fixtures::user(&store, "ana@example.com", None).await;
        let outsider = fixtures::user(&store, "cy@example.com", None).await;
        let food = CatalogService::new(&store)
            .create_category(
                ana.id,
                CreateCategoryRequest {
                    name: "Food".into(),
                    category_type: TransactionType::Expense,
                    group_id: None,
                },
            )
            .await
            .unwrap();
        let transactions = TransactionService::new(&store);
        for request in [
            tx(TransactionType::Income, 1000.0, date(2024, 3, 1), None),
            tx(TransactionType::Expense, 40.0, date(2024, 3, 5), Some(food.id)),
            tx(TransactionType::Expense, 15.0, date(2024, 3, 6), None),
            tx(TransactionType::Expense, 70.0, date(2024, 2, 27), Some(food.id)),
        ] {
            transactions.create(ana.id, request).await.unwrap();
        }

        let service = ReportService::new(&store);
        let march = ReportFilters {
            date_range: DateRange::from_preset(DatePreset::Month, date(2024, 3, 20)),
            ..Default::default()
        };
        let report = service.report(ana.id, &march).await.unwrap();
        assert_eq!(report.transaction_count, 3);
        assert_eq!(report.totals.income, 1000.0);
        assert_eq!(report.totals.expense, 55.0);
        assert_eq!(report.totals.balance, 945.0);
        let names: Vec<&str> = report.by_category.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Food", report::UNCATEGORIZED_LABEL]);
        assert_eq!(report.by_month.len(), 1);

        let trip = RelationshipService::new(&store)
            .create_group(ana.id, "Trip")
            .await
            .unwrap();
        let foreign_group = ReportFilters {
            category_group_id: Some(trip.id),
            ..Default::default()
        };
        assert!(matches!(
            service.report(outsider.id, &foreign_group).await,
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(service.report(ana.id, &foreign_group).await.unwrap().transaction_count, 0);
    }

    #[tokio::test]
    async fn dashboard_combines_month_totals_recent_rows_and_due_reminders() {
        let store = fixtures::store();
        let ana = fixtures::user(&store, "ana@example.com", None).await;
        let today = date(2024, 3, 20);
        let transactions = TransactionService::new(&store);
        for day in 1..=7 {
            transactions
                .create(ana.id, tx(TransactionType::Expense, 10.0, date(2024, 3, day), None))
                .await
                .unwrap();
        }
        transactions
            .create(ana.id, tx(TransactionType::Expense, 500.0, date(2024, 2, 10), None))
            .await
            .unwrap();

        let reminders = ReminderService::new(&store);
        for (title, due) in [("Overdue", date(2024, 3, 1)), ("This week", date(2024, 3, 27)), ("Next month", date(2024, 4, 2))] {
            reminders
                .create(
                    ana.id,
                    ReminderRequest {
                        title: title.into(),
                        amount: None,
                        due_date: due,
                        is_completed: false,
                    },
                    today,
                )
                .await
                .unwrap();
        }

        let dashboard = ReportService::new(&store).dashboard(ana.id, today).await.unwrap();
        assert_eq!(dashboard.totals.expense, 70.0);
        assert_eq!(dashboard.recent_transactions.len(), RECENT_TRANSACTION_LIMIT);
        assert_eq!(
            dashboard.recent_transactions[0].transaction.transaction_date,
            date(2024, 3, 7)
        );
        let due: Vec<&str> = dashboard
            .upcoming_reminders
            .iter()
            .map(|r| r.reminder.title.as_str())
            .collect();
        assert_eq!(due, ["Overdue", "This week"]);
        assert!(dashboard.upcoming_reminders[0].overdue);
        assert!(dashboard.budgets.is_empty());
    }
}
