use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::DataStore;
use crate::error::StoreError;
use crate::models::{
    Budget, Category, CategoryGroup, Friend, FriendStatus, GroupMember, MemberRole, Participant,
    Profile, Reminder, Transaction,
};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    groups: HashMap<Uuid, CategoryGroup>,
    members: Vec<GroupMember>,
    categories: HashMap<Uuid, Category>,
    participants: HashMap<Uuid, Participant>,
    transactions: HashMap<Uuid, Transaction>,
    budgets: HashMap<Uuid, Budget>,
    reminders: HashMap<Uuid, Reminder>,
    friends: HashMap<Uuid, Friend>,
}

// Same foreign keys as the SQL schema, reported the way Postgres violations are.
impl Tables {
    fn require_profile(&self, id: Uuid) -> Result<(), StoreError> {
        if self.profiles.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!("profile {id} does not exist")))
        }
    }

    fn require_group(&self, id: Option<Uuid>) -> Result<(), StoreError> {
        match id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(StoreError::Conflict(format!("category group {id} does not exist")))
            }
            _ => Ok(()),
        }
    }

    fn require_category(&self, id: Option<Uuid>) -> Result<(), StoreError> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(StoreError::Conflict(format!("category {id} does not exist")))
            }
            _ => Ok(()),
        }
    }

    fn check_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.require_profile(transaction.user_id)?;
        self.require_category(transaction.category_id)?;
        self.require_group(transaction.category_group_id)
    }
}

/// In-process [`DataStore`] used for local runs and tests. Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

fn insert_new<T: Clone>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    row: &T,
    what: &str,
) -> Result<(), StoreError> {
    if table.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{what} {id} already exists")));
    }
    table.insert(id, row.clone());
    Ok(())
}

fn replace_existing<T: Clone>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    row: T,
    what: &'static str,
) -> Result<(), StoreError> {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(StoreError::NotFound(what)),
    }
}

fn remove_existing<T>(
    table: &mut HashMap<Uuid, T>,
    id: Uuid,
    what: &'static str,
) -> Result<T, StoreError> {
    table.remove(&id).ok_or(StoreError::NotFound(what))
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|row| key(row));
    rows
}

#[rocket::async_trait]
impl DataStore for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.read()?.profiles.get(&id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        let email = email.trim();
        Ok(self
            .read()?
            .profiles
            .values()
            .find(|p| p.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned())
    }

    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        let tables = self.read()?;
        let rows = ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect();
        Ok(sorted_by(rows, |p: &Profile| p.created_at))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if let Some(email) = profile.email.as_deref() {
            let taken = tables.profiles.values().any(|p| {
                p.id != profile.id && p.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            });
            if taken {
                return Err(StoreError::Conflict(format!("email {email} is already registered")));
            }
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<CategoryGroup>, StoreError> {
        let tables = self.read()?;
        let rows = tables
            .groups
            .values()
            .filter(|g| {
                g.user_id == user_id
                    || tables
                        .members
                        .iter()
                        .any(|m| m.group_id == g.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        Ok(sorted_by(rows, |g: &CategoryGroup| g.created_at))
    }

    async fn get_group(&self, id: Uuid) -> Result<Option<CategoryGroup>, StoreError> {
        Ok(self.read()?.groups.get(&id).cloned())
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

        // Both rows land under one write guard, so no reader sees half of it.
        let mut tables = self.write()?;
        tables.require_profile(group.user_id)?;
        insert_new(&mut tables.groups, group.id, group, "category group")?;
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn delete_group(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        remove_existing(&mut tables.groups, id, "category group")?;
        tables.members.retain(|m| m.group_id != id);
        for category in tables.categories.values_mut() {
            if category.group_id == Some(id) {
                category.group_id = None;
            }
        }
        for participant in tables.participants.values_mut() {
            if participant.group_id == Some(id) {
                participant.group_id = None;
            }
        }
        for transaction in tables.transactions.values_mut() {
            if transaction.category_group_id == Some(id) {
                transaction.category_group_id = None;
            }
        }
        Ok(())
    }

    async fn list_group_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>, StoreError> {
        let rows = self
            .read()?
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |m: &GroupMember| m.created_at))
    }

    async fn insert_group_member(&self, member: &GroupMember) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_group(Some(member.group_id))?;
        tables.require_profile(member.user_id)?;
        if tables
            .members
            .iter()
            .any(|m| m.group_id == member.group_id && m.user_id == member.user_id)
        {
            return Err(StoreError::Conflict("user is already a member".into()));
        }
        tables.members.push(member.clone());
        Ok(())
    }

    async fn update_member_role(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let member = tables
            .members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .ok_or(StoreError::NotFound("group member"))?;
        member.role = role;
        Ok(())
    }

    async fn delete_group_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let before = tables.members.len();
        tables
            .members
            .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
        if tables.members.len() == before {
            return Err(StoreError::NotFound("group member"));
        }
        Ok(())
    }

    async fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>, StoreError> {
        let rows = self
            .read()?
            .categories
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |c: &Category| c.name.clone()))
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_profile(category.user_id)?;
        tables.require_group(category.group_id)?;
        insert_new(&mut tables.categories, category.id, category, "category")
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_group(category.group_id)?;
        let stored = tables
            .categories
            .get_mut(&category.id)
            .ok_or(StoreError::NotFound("category"))?;
        stored.name = category.name.clone();
        stored.group_id = category.group_id;
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        remove_existing(&mut tables.categories, id, "category")?;
        for transaction in tables.transactions.values_mut() {
            if transaction.category_id == Some(id) {
                transaction.category_id = None;
            }
        }
        tables.budgets.retain(|_, b| b.category_id != Some(id));
        Ok(())
    }

    async fn list_participants(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Participant>, StoreError> {
        let rows = self
            .read()?
            .participants
            .values()
            .filter(|p| {
                p.created_by == user_id || p.group_id.is_some_and(|g| group_ids.contains(&g))
            })
            .cloned()
            .collect();
        Ok(sorted_by(rows, |p: &Participant| p.name.clone()))
    }

    async fn get_participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError> {
        Ok(self.read()?.participants.get(&id).cloned())
    }

    async fn insert_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_profile(participant.created_by)?;
        tables.require_group(participant.group_id)?;
        insert_new(&mut tables.participants, participant.id, participant, "participant")
    }

    async fn update_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_group(participant.group_id)?;
        replace_existing(
            &mut tables.participants,
            participant.id,
            participant.clone(),
            "participant",
        )
    }

    async fn delete_participant(&self, id: Uuid) -> Result<(), StoreError> {
        remove_existing(&mut self.write()?.participants, id, "participant").map(|_| ())
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        group_ids: &[Uuid],
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut rows: Vec<Transaction> = self
            .read()?
            .transactions
            .values()
            .filter(|t| {
                t.user_id == user_id
                    || t.category_group_id.is_some_and(|g| group_ids.contains(&g))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.read()?.transactions.get(&id).cloned())
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_transaction(transaction)?;
        insert_new(&mut tables.transactions, transaction.id, transaction, "transaction")
    }

    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_transaction(transaction)?;
        replace_existing(
            &mut tables.transactions,
            transaction.id,
            transaction.clone(),
            "transaction",
        )
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        remove_existing(&mut self.write()?.transactions, id, "transaction").map(|_| ())
    }

    async fn list_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>, StoreError> {
        let rows = self
            .read()?
            .budgets
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |b: &Budget| b.created_at))
    }

    async fn get_budget(&self, id: Uuid) -> Result<Option<Budget>, StoreError> {
        Ok(self.read()?.budgets.get(&id).cloned())
    }

    async fn insert_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_profile(budget.user_id)?;
        tables.require_category(budget.category_id)?;
        insert_new(&mut tables.budgets, budget.id, budget, "budget")
    }

    async fn update_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_category(budget.category_id)?;
        replace_existing(&mut tables.budgets, budget.id, budget.clone(), "budget")
    }

    async fn delete_budget(&self, id: Uuid) -> Result<(), StoreError> {
        remove_existing(&mut self.write()?.budgets, id, "budget").map(|_| ())
    }

    async fn list_reminders(&self, user_id: Uuid) -> Result<Vec<Reminder>, StoreError> {
        let rows = self
            .read()?
            .reminders
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |r: &Reminder| (r.due_date, r.created_at)))
    }

    async fn get_reminder(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        Ok(self.read()?.reminders.get(&id).cloned())
    }

    async fn insert_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_profile(reminder.user_id)?;
        insert_new(&mut tables.reminders, reminder.id, reminder, "reminder")
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        replace_existing(
            &mut self.write()?.reminders,
            reminder.id,
            reminder.clone(),
            "reminder",
        )
    }

    async fn delete_reminder(&self, id: Uuid) -> Result<(), StoreError> {
        remove_existing(&mut self.write()?.reminders, id, "reminder").map(|_| ())
    }

    async fn list_friend_edges(&self, user_id: Uuid) -> Result<Vec<Friend>, StoreError> {
        let rows = self
            .read()?
            .friends
            .values()
            .filter(|f| f.involves(user_id))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |f: &Friend| f.created_at))
    }

    async fn get_friend_edge(&self, id: Uuid) -> Result<Option<Friend>, StoreError> {
        Ok(self.read()?.friends.get(&id).cloned())
    }

    async fn find_friend_edge(&self, a: Uuid, b: Uuid) -> Result<Option<Friend>, StoreError> {
        Ok(self
            .read()?
            .friends
            .values()
            .find(|f| (f.user_id == a && f.friend_id == b) || (f.user_id == b && f.friend_id == a))
            .cloned())
    }

    async fn insert_friend_edge(&self, edge: &Friend) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.require_profile(edge.user_id)?;
        tables.require_profile(edge.friend_id)?;
        if tables
            .friends
            .values()
            .any(|f| f.user_id == edge.user_id && f.friend_id == edge.friend_id)
        {
            return Err(StoreError::Conflict("friend request already exists".into()));
        }
        insert_new(&mut tables.friends, edge.id, edge, "friend request")
    }

    async fn update_friend_status(&self, id: Uuid, status: FriendStatus) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let edge = tables
            .friends
            .get_mut(&id)
            .ok_or(StoreError::NotFound("friend request"))?;
        edge.status = status;
        Ok(())
    }

    async fn delete_friend_edge(&self, id: Uuid) -> Result<(), StoreError> {
        remove_existing(&mut self.write()?.friends, id, "friend request").map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::models::{BudgetPeriod, TransactionType};

    async fn profile(store: &MemoryStore) -> Uuid {
        let id = Uuid::new_v4();
        store.upsert_profile(&Profile::new(id, None)).await.unwrap();
        id
    }

    fn group(owner: Uuid) -> CategoryGroup {
        CategoryGroup {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Business".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn group_creation_adds_owner_as_admin() {
        let store = MemoryStore::new();
        let owner = profile(&store).await;
        let g = group(owner);

        let member = store.create_group_with_admin(&g).await.unwrap();
        assert_eq!(member.role, MemberRole::Admin);
        assert_eq!(store.list_group_members(g.id).await.unwrap(), vec![member]);

        // A second create with the same id leaves no extra membership behind.
        assert!(store.create_group_with_admin(&g).await.is_err());
        assert_eq!(store.list_group_members(g.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rows_must_reference_existing_owners_and_groups() {
        let store = MemoryStore::new();
        let stranger = Uuid::new_v4();
        assert!(matches!(
            store.create_group_with_admin(&group(stranger)).await,
            Err(StoreError::Conflict(_))
        ));

        let reminder = Reminder {
            id: Uuid::new_v4(),
            user_id: stranger,
            title: "Rent".into(),
            amount: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            is_completed: false,
            created_at: Utc::now(),
        };
        assert!(matches!(store.insert_reminder(&reminder).await, Err(StoreError::Conflict(_))));

        let owner = profile(&store).await;
        let participant = Participant {
            id: Uuid::new_v4(),
            created_by: owner,
            name: "Guide".into(),
            email: None,
            group_id: Some(Uuid::new_v4()),
            created_at: Utc::now(),
        };
        assert!(matches!(
            store.insert_participant(&participant).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.get_participant(participant.id).await.unwrap().is_none());

        store
            .insert_reminder(&Reminder {
                user_id: owner,
                ..reminder
            })
            .await
            .unwrap();
        assert_eq!(store.list_reminders(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_category_detaches_transactions_and_drops_its_budgets() {
        let store = MemoryStore::new();
        let user = profile(&store).await;
        let category = Category {
            id: Uuid::new_v4(),
            user_id: user,
            name: "Food".into(),
            category_type: TransactionType::Expense,
            group_id: None,
            created_at: Utc::now(),
        };
        store.insert_category(&category).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: user,
            transaction_type: TransactionType::Expense,
            amount: 10.0,
            note: None,
            transaction_date: date,
            category_id: Some(category.id),
            category_group_id: None,
            paid_by: Some(user),
            created_at: Utc::now(),
        };
        store.insert_transaction(&tx).await.unwrap();
        let budget = Budget {
            id: Uuid::new_v4(),
            user_id: user,
            amount: 100.0,
            period: BudgetPeriod::Monthly,
            start_date: date,
            category_id: Some(category.id),
            created_at: Utc::now(),
        };
        store.insert_budget(&budget).await.unwrap();

        store.delete_category(category.id).await.unwrap();

        let stored = store.get_transaction(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.category_id, None);
        assert!(store.list_budgets(user).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_category(category.id).await,
            Err(StoreError::NotFound("category"))
        ));
    }

    #[tokio::test]
    async fn friend_edges_are_found_in_either_direction() {
        let store = MemoryStore::new();
        let (a, b) = (profile(&store).await, profile(&store).await);
        let edge = Friend {
            id: Uuid::new_v4(),
            user_id: a,
            friend_id: b,
            status: FriendStatus::Pending,
            created_at: Utc::now(),
        };
        store.insert_friend_edge(&edge).await.unwrap();

        assert_eq!(store.find_friend_edge(b, a).await.unwrap(), Some(edge.clone()));
        assert_eq!(store.list_friend_edges(b).await.unwrap().len(), 1);
        assert!(store.list_friend_edges(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
