mod memory;
mod postgres;
mod rows;

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Budget, Category, CategoryGroup, Friend, FriendStatus, GroupMember, MemberRole, Participant,
    Profile, Reminder, Transaction,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn DataStore>;

// Updates and deletes by id fail with NotFound when no row matches. Deletes
// follow the ON DELETE rules of the schema.
#[rocket::async_trait]
pub trait DataStore: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;
    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<CategoryGroup>, StoreError>;
    async fn get_group(&self, id: Uuid) -> Result<Option<CategoryGroup>, StoreError>;
    async fn create_group_with_admin(
        &self,
        group: &CategoryGroup,
    ) -> Result<GroupMember, StoreError>;
    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, StoreError>;
    async fn insert_group_member(&self, member: &GroupMember) -> Result<(), StoreError>;
    async fn update_member_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), StoreError>;
    async fn delete_group_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>, StoreError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn update_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_participants(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Participant>, StoreError>;
    async fn get_participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError>;
    async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError>;
    async fn update_participant(&self, participant: &Participant) -> Result<(), StoreError>;
    async fn delete_participant(&self, id: Uuid) -> Result<(), StoreError>;

    // Newest transaction_date first.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Transaction>, StoreError>;
    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;
    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), StoreError>;
    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>, StoreError>;
    async fn get_budget(&self, id: Uuid) -> Result<Option<Budget>, StoreError>;
    async fn insert_budget(&self, budget: &Budget) -> Result<(), StoreError>;
    async fn update_budget(&self, budget: &Budget) -> Result<(), StoreError>;
    async fn delete_budget(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_reminders(&self, user_id: Uuid) -> Result<Vec<Reminder>, StoreError>;
    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError>;
    async fn insert_reminder(&self, reminder: &Reminder) -> Result<(), StoreError>;
    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError>;
    async fn delete_reminder(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_friend_edges(&self, user_id: Uuid) -> Result<Vec<Friend>, StoreError>;
    async fn get_friend_edge(&self, id: Uuid) -> Result<Option<Friend>, StoreError>;
    async fn find_friend_edge(&self, a: Uuid, b: Uuid) -> Result<Option<Friend>, StoreError>;
    async fn insert_friend_edge(&self, edge: &Friend) -> Result<(), StoreError>;
    async fn update_friend_status(&self, id: Uuid, status: FriendStatus) -> Result<(), StoreError>;
    async fn delete_friend_edge(&self, id: Uuid) -> Result<(), StoreError>;
}
