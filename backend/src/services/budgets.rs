use chrono::Utc;
use uuid::Uuid;

use super::require_positive;
use crate::domain::budget::BudgetProgress;
use crate::error::ApiError;
use crate::models::{Budget, BudgetRequest, Transaction, TransactionType};
use crate::store::DataStore;

pub struct BudgetService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> BudgetService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        BudgetService { store }
    }

    pub async fn list_progress(&self, acting: Uuid) -> Result<Vec<BudgetProgress>, ApiError> {
        let budgets = self.store.list_budgets(acting).await?;
        if budgets.is_empty() {
            return Ok(Vec::new());
        }
        let owned = self.own_transactions(acting).await?;
        Ok(budgets
            .iter()
            .map(|b| BudgetProgress::evaluate(b, &owned))
            .collect())
    }

    pub async fn create(&self, acting: Uuid, request: BudgetRequest) -> Result<BudgetProgress, ApiError> {
        let mut budget = Budget {
            id: Uuid::new_v4(),
            user_id: acting,
            amount: 0.0,
            period: request.period,
            start_date: request.start_date,
            category_id: None,
            created_at: Utc::now(),
        };
        self.apply(acting, &mut budget, request).await?;
        self.store.insert_budget(&budget).await?;
        self.progress_of(acting, &budget).await
    }

    pub async fn update(
        &self,
        acting: Uuid,
        id: Uuid,
        request: BudgetRequest,
    ) -> Result<BudgetProgress, ApiError> {
        let mut budget = self.owned(acting, id).await?;
        self.apply(acting, &mut budget, request).await?;
        self.store.update_budget(&budget).await?;
        self.progress_of(acting, &budget).await
    }

    pub async fn delete(&self, acting: Uuid, id: Uuid) -> Result<(), ApiError> {
        let budget = self.owned(acting, id).await?;
        self.store.delete_budget(budget.id).await?;
        Ok(())
    }

    async fn progress_of(&self, acting: Uuid, budget: &Budget) -> Result<BudgetProgress, ApiError> {
        let owned = self.own_transactions(acting).await?;
        Ok(BudgetProgress::evaluate(budget, &owned))
    }

    // Budgets are personal: group spend recorded by others never counts.
    async fn own_transactions(&self, acting: Uuid) -> Result<Vec<Transaction>, ApiError> {
        Ok(self.store.list_transactions(acting, &[]).await?)
    }

    async fn owned(&self, acting: Uuid, id: Uuid) -> Result<Budget, ApiError> {
        self.store
            .get_budget(id)
            .await?
            .filter(|b| b.user_id == acting)
            .ok_or_else(|| ApiError::not_found("budget"))
    }

    async fn apply(
        &self,
        acting: Uuid,
        budget: &mut Budget,
        request: BudgetRequest,
    ) -> Result<(), ApiError> {
        budget.amount = require_positive(request.amount, "budget amount")?;

        if let Some(category_id) = request.category_id {
            let category = self
                .store
                .get_category(category_id)
                .await?
                .filter(|c| c.user_id == acting)
                .ok_or_else(|| ApiError::validation("unknown category"))?;
            if category.category_type != TransactionType::Expense {
                return Err(ApiError::validation("budgets can only track expense categories"));
            }
        }

        budget.period = request.period;
        budget.start_date = request.start_date;
        budget.category_id = request.category_id;
        Ok(())
    }
}
