use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::{require_positive, require_text};
use crate::error::ApiError;
use crate::models::{Reminder, ReminderRequest, ReminderView};
use crate::store::DataStore;

pub struct ReminderService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> ReminderService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        ReminderService { store }
    }

    pub async fn list(&self, acting: Uuid, today: NaiveDate) -> Result<Vec<ReminderView>, ApiError> {
        Ok(self
            .store
            .list_reminders(acting)
            .await?
            .into_iter()
            .map(|r| view(r, today))
            .collect())
    }

    pub async fn upcoming(
        &self,
        acting: Uuid,
        today: NaiveDate,
        horizon: NaiveDate,
    ) -> Result<Vec<ReminderView>, ApiError> {
        let mut reminders = self.list(acting, today).await?;
        reminders.retain(|r| !r.reminder.is_completed && r.reminder.due_date <= horizon);
        Ok(reminders)
    }

    pub async fn create(
        &self,
        acting: Uuid,
        request: ReminderRequest,
        today: NaiveDate,
    ) -> Result<ReminderView, ApiError> {
        let reminder = Reminder {
            id: Uuid::new_v4(),
            user_id: acting,
            title: require_text(&request.title, "title")?,
            amount: request
                .amount
                .map(|a| require_positive(a, "amount"))
                .transpose()?,
            due_date: request.due_date,
            is_completed: request.is_completed,
            created_at: Utc::now(),
        };
        self.store.insert_reminder(&reminder).await?;
        Ok(view(reminder, today))
    }

    pub async fn update(
        &self,
        acting: Uuid,
        id: Uuid,
        request: ReminderRequest,
        today: NaiveDate,
    ) -> Result<ReminderView, ApiError> {
        let mut reminder = self.owned(acting, id).await?;
        reminder.title = require_text(&request.title, "title")?;
        reminder.amount = request
            .amount
            .map(|a| require_positive(a, "amount"))
            .transpose()?;
        reminder.due_date = request.due_date;
        reminder.is_completed = request.is_completed;
        self.store.update_reminder(&reminder).await?;
        Ok(view(reminder, today))
    }

    pub async fn toggle(&self, acting: Uuid, id: Uuid, today: NaiveDate) -> Result<ReminderView, ApiError> {
        let mut reminder = self.owned(acting, id).await?;
        reminder.is_completed = !reminder.is_completed;
        self.store.update_reminder(&reminder).await?;
        Ok(view(reminder, today))
    }

    pub async fn delete(&self, acting: Uuid, id: Uuid) -> Result<(), ApiError> {
        let reminder = self.owned(acting, id).await?;
        self.store.delete_reminder(reminder.id).await?;
        Ok(())
    }

    async fn owned(&self, acting: Uuid, id: Uuid) -> Result<Reminder, ApiError> {
        self.store
            .get_reminder(id)
            .await?
            .filter(|r| r.user_id == acting)
            .ok_or_else(|| ApiError::not_found("reminder"))
    }
}

fn view(reminder: Reminder, today: NaiveDate) -> ReminderView {
    ReminderView {
        overdue: !reminder.is_completed && reminder.due_date < today,
        reminder,
    }
}
