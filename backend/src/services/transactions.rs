use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use super::{RelationshipService, optional_text, require_positive};
use crate::domain::payer::{self, PayerRef};
use crate::domain::report::{ReportFilters, category_index};
use crate::domain::scoping::{self, PayerSelection};
use crate::error::ApiError;
use crate::models::{
    Category, CategoryGroup, Participant, Profile, Transaction, TransactionRequest,
    TransactionView,
};
use crate::store::DataStore;

pub struct PayerDirectory {
    pub groups: Vec<CategoryGroup>,
    pub participants: Vec<Participant>,
    pub friends: Vec<Profile>,
    pub members_by_group: HashMap<Uuid, Vec<Profile>>,
}

impl PayerDirectory {
    pub fn group_ids(&self) -> Vec<Uuid> {
        self.groups.iter().map(|g| g.id).collect()
    }

    pub fn has_group(&self, group_id: Uuid) -> bool {
        self.groups.iter().any(|g| g.id == group_id)
    }

    pub fn members_of(&self, group_id: Option<Uuid>) -> &[Profile] {
        group_id
            .and_then(|id| self.members_by_group.get(&id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn known_users(&self) -> Vec<Profile> {
        let mut seen = HashSet::new();
        self.friends
            .iter()
            .chain(self.members_by_group.values().flatten())
            .filter(|p| seen.insert(p.id))
            .cloned()
            .collect()
    }
}

pub struct LedgerSnapshot {
    pub transactions: Vec<Transaction>,
    pub categories: Vec<Category>,
}

pub struct TransactionService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> TransactionService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        TransactionService { store }
    }

    pub async fn directory(&self, acting: Uuid) -> Result<PayerDirectory, ApiError> {
        let relationships = RelationshipService::new(self.store);
        let groups = relationships.visible_groups(acting).await?;
        let group_ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
        let participants = self.store.list_participants(acting, &group_ids).await?;
        let friends = relationships.accepted_friends(acting).await?;
        let members_by_group = relationships
            .co_members(acting, &groups)
            .await?
            .into_iter()
            .collect();

        Ok(PayerDirectory {
            groups,
            participants,
            friends,
            members_by_group,
        })
    }

    pub async fn snapshot(&self, acting: Uuid, group_ids: &[Uuid]) -> Result<LedgerSnapshot, ApiError> {
        let transactions = self.store.list_transactions(acting, group_ids).await?;
        let mut categories = self.store.list_categories(acting).await?;

        // Group transactions recorded by other members point at their categories.
        let known: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
        let foreign: HashSet<Uuid> = transactions
            .iter()
            .filter_map(|t| t.category_id)
            .filter(|id| !known.contains(id))
            .collect();
        for id in foreign {
            if let Some(category) = self.store.get_category(id).await? {
                categories.push(category);
            }
        }

        Ok(LedgerSnapshot {
            transactions,
            categories,
        })
    }

    pub async fn list(
        &self,
        acting: Uuid,
        filters: &ReportFilters,
    ) -> Result<Vec<TransactionView>, ApiError> {
        let directory = self.directory(acting).await?;
        let snapshot = self.snapshot(acting, &directory.group_ids()).await?;
        let index = category_index(&snapshot.categories);
        let known_users = directory.known_users();

        Ok(snapshot
            .transactions
            .iter()
            .filter(|t| filters.matches(t, &index))
            .map(|t| self.view(acting, t.clone(), &index, &directory, &known_users))
            .collect())
    }

    fn view(
        &self,
        acting: Uuid,
        transaction: Transaction,
        categories: &HashMap<Uuid, &Category>,
        directory: &PayerDirectory,
        known_users: &[Profile],
    ) -> TransactionView {
        let category_name = transaction
            .category_id
            .and_then(|id| categories.get(&id))
            .map(|c| c.name.clone());
        let payer = payer::resolve_payer(
            transaction.paid_by,
            acting,
            &directory.participants,
            known_users,
        );
        TransactionView {
            transaction,
            category_name,
            payer,
        }
    }

    pub async fn create(
        &self,
        acting: Uuid,
        request: TransactionRequest,
    ) -> Result<TransactionView, ApiError> {
        let directory = self.directory(acting).await?;
        let mut transaction = Transaction {
            id: Uuid::new_v4(),
            user_id: acting,
            transaction_type: request.transaction_type,
            amount: 0.0,
            note: None,
            transaction_date: Utc::now().date_naive(),
            category_id: None,
            category_group_id: None,
            paid_by: None,
            created_at: Utc::now(),
        };
        let category = self.apply(acting, &mut transaction, request, &directory).await?;
        self.store.insert_transaction(&transaction).await?;
        tracing::debug!(transaction = %transaction.id, user = %acting, "transaction recorded");

        Ok(self.single_view(acting, transaction, category, &directory))
    }

    pub async fn update(
        &self,
        acting: Uuid,
        id: Uuid,
        request: TransactionRequest,
    ) -> Result<TransactionView, ApiError> {
        let mut transaction = self.owned(acting, id).await?;
        let directory = self.directory(acting).await?;
        let category = self.apply(acting, &mut transaction, request, &directory).await?;
        self.store.update_transaction(&transaction).await?;

        Ok(self.single_view(acting, transaction, category, &directory))
    }

    pub async fn delete(&self, acting: Uuid, id: Uuid) -> Result<(), ApiError> {
        let transaction = self.owned(acting, id).await?;
        self.store.delete_transaction(transaction.id).await?;
        Ok(())
    }

    fn single_view(
        &self,
        acting: Uuid,
        transaction: Transaction,
        category: Option<Category>,
        directory: &PayerDirectory,
    ) -> TransactionView {
        let categories: Vec<Category> = category.into_iter().collect();
        let index = category_index(&categories);
        self.view(acting, transaction, &index, directory, &directory.known_users())
    }

    async fn owned(&self, acting: Uuid, id: Uuid) -> Result<Transaction, ApiError> {
        let transaction = self
            .store
            .get_transaction(id)
            .await?
            .ok_or_else(|| ApiError::not_found("transaction"))?;
        if transaction.user_id != acting {
            return Err(ApiError::Forbidden("only the owner can change this transaction".into()));
        }
        Ok(transaction)
    }

    async fn apply(
        &self,
        acting: Uuid,
        transaction: &mut Transaction,
        request: TransactionRequest,
        directory: &PayerDirectory,
    ) -> Result<Option<Category>, ApiError> {
        let amount = require_positive(request.amount, "amount")?;

        let category = match request.category_id {
            Some(id) => {
                let category = self
                    .store
                    .get_category(id)
                    .await?
                    .filter(|c| c.user_id == acting)
                    .ok_or_else(|| ApiError::validation("unknown category"))?;
                if category.category_type != request.transaction_type {
                    return Err(ApiError::validation(format!(
                        "a {} transaction cannot use the {} category '{}'",
                        request.transaction_type, category.category_type, category.name
                    )));
                }
                Some(category)
            }
            None => None,
        };

        if let Some(group_id) = request.category_group_id {
            if !directory.has_group(group_id) {
                return Err(ApiError::validation("unknown category group"));
            }
        }

        let paid_by = request.paid_by.unwrap_or(acting);
        if !payer_allowed(acting, paid_by, request.category_group_id, directory) {
            return Err(ApiError::validation("payer is not available for the selected group"));
        }

        transaction.transaction_type = request.transaction_type;
        transaction.amount = amount;
        transaction.note = optional_text(request.note.as_deref());
        if let Some(date) = request.transaction_date {
            transaction.transaction_date = date;
        }
        transaction.category_id = category.as_ref().map(|c| c.id);
        transaction.category_group_id = request.category_group_id;
        transaction.paid_by = Some(paid_by);
        Ok(category)
    }

    pub async fn payer_selection(
        &self,
        acting: Uuid,
        group_id: Option<Uuid>,
        current: Option<Uuid>,
    ) -> Result<PayerSelection, ApiError> {
        let directory = self.directory(acting).await?;
        if let Some(group_id) = group_id {
            if !directory.has_group(group_id) {
                return Err(ApiError::not_found("category group"));
            }
        }

        let known_users = directory.known_users();
        let current = payer::classify(current, acting, &directory.participants, &known_users);
        Ok(scoping::payer_selection(
            acting,
            group_id,
            current,
            &directory.participants,
            directory.members_of(group_id),
            &directory.friends,
        ))
    }
}

fn payer_allowed(
    acting: Uuid,
    paid_by: Uuid,
    group_id: Option<Uuid>,
    directory: &PayerDirectory,
) -> bool {
    match payer::classify(Some(paid_by), acting, &directory.participants, &directory.friends) {
        Some(PayerRef::Myself) | Some(PayerRef::Friend(_)) => true,
        Some(PayerRef::Participant(id)) => directory
            .participants
            .iter()
            .any(|p| p.id == id && scoping::participant_in_scope(p, group_id)),
        None => directory.members_of(group_id).iter().any(|p| p.id == paid_by),
    }
}
