use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use super::DataStore;
use super::rows::{
    BudgetRow, CategoryGroupRow, CategoryRow, FriendRow, GroupMemberRow, ParticipantRow,
    ProfileRow, ReminderRow, TransactionRow, convert_all, from_amount,
};
use crate::error::StoreError;
use crate::models::{
    Budget, Category, CategoryGroup, Friend, FriendStatus, GroupMember, MemberRole, Participant,
    Profile, Reminder, Transaction,
};

const PROFILE_COLUMNS: &str =
    "id, email, full_name, avatar_url, default_group_id, default_category_id, created_at";
const GROUP_COLUMNS: &str = "id, user_id, name, created_at";
const MEMBER_COLUMNS: &str = "id, group_id, user_id, role, created_at";
const CATEGORY_COLUMNS: &str = "id, user_id, name, type, group_id, created_at";
const PARTICIPANT_COLUMNS: &str = "id, created_by, name, email, group_id, created_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, type, amount, note, transaction_date, category_id, category_group_id, paid_by, created_at";
const BUDGET_COLUMNS: &str = "id, user_id, amount, period, start_date, category_id, created_at";
const REMINDER_COLUMNS: &str = "id, user_id, title, amount, due_date, is_completed, created_at";
const FRIEND_COLUMNS: &str = "id, user_id, friend_id, status, created_at";

/// [`DataStore`] backed by the Postgres schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

fn expect_row(result: PgQueryResult, what: &'static str) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        Err(StoreError::NotFound(what))
    } else {
        Ok(())
    }
}

#[rocket::async_trait]
impl DataStore for PgStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> =
            sqlx::query_as(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1) ORDER BY created_at"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (id, email, full_name, avatar_url, default_group_id, default_category_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                avatar_url = EXCLUDED.avatar_url,
                default_group_id = EXCLUDED.default_group_id,
                default_category_id = EXCLUDED.default_category_id",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(profile.default_group_id)
        .bind(profile.default_category_id)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<CategoryGroup>, StoreError> {
        let rows: Vec<CategoryGroupRow> = sqlx::query_as(&format!(
            "SELECT {GROUP_COLUMNS} FROM category_groups
             WHERE user_id = $1
                OR id IN (SELECT group_id FROM group_members WHERE user_id = $1)
             ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CategoryGroup::from).collect())
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<CategoryGroup>, StoreError> {
        let row: Option<CategoryGroupRow> =
            sqlx::query_as(&format!("SELECT {GROUP_COLUMNS} FROM category_groups WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CategoryGroup::from))
    }

    async fn create_group_with_admin(
        &self,
        group: &CategoryGroup,
    ) -> Result<GroupMember, StoreError> {
        let member = GroupMember {
            id: Uuid::new_v4(),
            group_id: group.id,
            user_id: group.user_id,
            role: MemberRole::Admin,
            created_at: group.created_at,
        };

        // Dropping the transaction without commit rolls the group insert back.
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO category_groups (id, user_id, name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(group.id)
        .bind(group.user_id)
        .bind(&group.name)
        .bind(group.created_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO group_members (id, group_id, user_id, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(member.id)
        .bind(member.group_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .bind(member.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(member)
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM category_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "category group")
    }

    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, StoreError> {
        let rows: Vec<GroupMemberRow> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM group_members WHERE group_id = $1 ORDER BY created_at"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_group_member(&self, member: &GroupMember) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO group_members (id, group_id, user_id, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(member.id)
        .bind(member.group_id)
        .bind(member.user_id)
        .bind(member.role.as_str())
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_member_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE group_members SET role = $1 WHERE group_id = $2 AND user_id = $3")
                .bind(role.as_str())
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        expect_row(result, "group member")
    }

    async fn delete_group_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "group member")
    }

    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>, StoreError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = $1 ORDER BY name"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        let row: Option<CategoryRow> =
            sqlx::query_as(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Category::try_from).transpose()
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO categories (id, user_id, name, type, group_id, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(category.id)
        .bind(category.user_id)
        .bind(&category.name)
        .bind(category.category_type.as_str())
        .bind(category.group_id)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        // `type` is fixed at creation.
        let result = sqlx::query("UPDATE categories SET name = $1, group_id = $2 WHERE id = $3")
            .bind(&category.name)
            .bind(category.group_id)
            .bind(category.id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "category")
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "category")
    }

    async fn list_participants(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Participant>, StoreError> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants
             WHERE created_by = $1 OR group_id = ANY($2)
             ORDER BY name"
        ))
        .bind(user_id)
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Participant::from).collect())
    }

    async fn get_participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError> {
        let row: Option<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Participant::from))
    }

    async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO participants (id, created_by, name, email, group_id, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(participant.id)
        .bind(participant.created_by)
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(participant.group_id)
        .bind(participant.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE participants SET name = $1, email = $2, group_id = $3 WHERE id = $4")
                .bind(&participant.name)
                .bind(&participant.email)
                .bind(participant.group_id)
                .bind(participant.id)
                .execute(&self.pool)
                .await?;
        expect_row(result, "participant")
    }

    async fn delete_participant(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "participant")
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE user_id = $1 OR category_group_id = ANY($2)
             ORDER BY transaction_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .bind(group_ids)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transactions (id, user_id, type, amount, note, transaction_date, category_id, category_group_id, paid_by, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.transaction_type.as_str())
        .bind(from_amount(transaction.amount)?)
        .bind(&transaction.note)
        .bind(transaction.transaction_date)
        .bind(transaction.category_id)
        .bind(transaction.category_group_id)
        .bind(transaction.paid_by)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE transactions SET type = $1, amount = $2, note = $3, transaction_date = $4,
                category_id = $5, category_group_id = $6, paid_by = $7
             WHERE id = $8",
        )
        .bind(transaction.transaction_type.as_str())
        .bind(from_amount(transaction.amount)?)
        .bind(&transaction.note)
        .bind(transaction.transaction_date)
        .bind(transaction.category_id)
        .bind(transaction.category_group_id)
        .bind(transaction.paid_by)
        .bind(transaction.id)
        .execute(&self.pool)
        .await?;
        expect_row(result, "transaction")
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "transaction")
    }

    async fn list_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>, StoreError> {
        let rows: Vec<BudgetRow> = sqlx::query_as(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_budget(&self, id: Uuid) -> Result<Option<Budget>, StoreError> {
        let row: Option<BudgetRow> =
            sqlx::query_as(&format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Budget::try_from).transpose()
    }

    async fn insert_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO budgets (id, user_id, amount, period, start_date, category_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(budget.id)
        .bind(budget.user_id)
        .bind(from_amount(budget.amount)?)
        .bind(budget.period.as_str())
        .bind(budget.start_date)
        .bind(budget.category_id)
        .bind(budget.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE budgets SET amount = $1, period = $2, start_date = $3, category_id = $4 WHERE id = $5",
        )
        .bind(from_amount(budget.amount)?)
        .bind(budget.period.as_str())
        .bind(budget.start_date)
        .bind(budget.category_id)
        .bind(budget.id)
        .execute(&self.pool)
        .await?;
        expect_row(result, "budget")
    }

    async fn delete_budget(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "budget")
    }

    async fn list_reminders(&self, user_id: Uuid) -> Result<Vec<Reminder>, StoreError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE user_id = $1 ORDER BY due_date, created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        let row: Option<ReminderRow> =
            sqlx::query_as(&format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Reminder::try_from).transpose()
    }

    async fn insert_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let amount = reminder.amount.map(from_amount).transpose()?;
        sqlx::query(
            "INSERT INTO reminders (id, user_id, title, amount, due_date, is_completed, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reminder.id)
        .bind(reminder.user_id)
        .bind(&reminder.title)
        .bind(amount)
        .bind(reminder.due_date)
        .bind(reminder.is_completed)
        .bind(reminder.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let amount = reminder.amount.map(from_amount).transpose()?;
        let result = sqlx::query(
            "UPDATE reminders SET title = $1, amount = $2, due_date = $3, is_completed = $4 WHERE id = $5",
        )
        .bind(&reminder.title)
        .bind(amount)
        .bind(reminder.due_date)
        .bind(reminder.is_completed)
        .bind(reminder.id)
        .execute(&self.pool)
        .await?;
        expect_row(result, "reminder")
    }

    async fn delete_reminder(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "reminder")
    }

    async fn list_friend_edges(&self, user_id: Uuid) -> Result<Vec<Friend>, StoreError> {
        let rows: Vec<FriendRow> = sqlx::query_as(&format!(
            "SELECT {FRIEND_COLUMNS} FROM friends WHERE user_id = $1 OR friend_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_friend_edge(&self, id: Uuid) -> Result<Option<Friend>, StoreError> {
        let row: Option<FriendRow> =
            sqlx::query_as(&format!("SELECT {FRIEND_COLUMNS} FROM friends WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Friend::try_from).transpose()
    }

    async fn find_friend_edge(&self, a: Uuid, b: Uuid) -> Result<Option<Friend>, StoreError> {
        let row: Option<FriendRow> = sqlx::query_as(&format!(
            "SELECT {FRIEND_COLUMNS} FROM friends
             WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
             LIMIT 1"
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Friend::try_from).transpose()
    }

    async fn insert_friend_edge(&self, edge: &Friend) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO friends (id, user_id, friend_id, status, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(edge.id)
        .bind(edge.user_id)
        .bind(edge.friend_id)
        .bind(edge.status.as_str())
        .bind(edge.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_friend_status(&self, id: Uuid, status: FriendStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE friends SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "friend request")
    }

    async fn delete_friend_edge(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM friends WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_row(result, "friend request")
    }
}
