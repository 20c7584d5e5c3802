use chrono::Utc;
use uuid::Uuid;

use super::{optional_text, require_text};
use crate::auth::AuthUser;
use crate::error::{ApiError, StoreError};
use crate::models::{
    Category, CreateCategoryRequest, Participant, ParticipantRequest, Profile,
    UpdateCategoryRequest, UpdateProfileRequest,
};
use crate::store::DataStore;

pub struct CatalogService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> CatalogService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        CatalogService { store }
    }

    pub async fn ensure_profile(&self, user: &AuthUser) -> Result<Profile, ApiError> {
        if let Some(profile) = self.store.get_profile(user.id).await? {
            return Ok(profile);
        }
        let mut profile = Profile::new(user.id, user.email.clone());
        match self.store.upsert_profile(&profile).await {
            Ok(()) => {}
            // The token's email already belongs to another profile.
            Err(StoreError::Conflict(detail)) if profile.email.is_some() => {
                tracing::warn!(user = %user.id, %detail, "profile email taken, created without it");
                profile.email = None;
                self.store.upsert_profile(&profile).await?;
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user = %user.id, "profile created");
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        user: &AuthUser,
        request: UpdateProfileRequest,
    ) -> Result<Profile, ApiError> {
        let mut profile = self.ensure_profile(user).await?;

        if let Some(group_id) = request.default_group_id {
            let visible = self.store.list_groups_for_user(user.id).await?;
            if !visible.iter().any(|g| g.id == group_id) {
                return Err(ApiError::validation("default group is not one of your groups"));
            }
        }
        if let Some(category_id) = request.default_category_id {
            self.owned_category(user.id, category_id).await?;
        }

        profile.full_name = optional_text(request.full_name.as_deref());
        profile.avatar_url = optional_text(request.avatar_url.as_deref());
        profile.default_group_id = request.default_group_id;
        profile.default_category_id = request.default_category_id;
        self.store.upsert_profile(&profile).await?;
        Ok(profile)
    }

    // Categories

    pub async fn categories(&self, acting: Uuid) -> Result<Vec<Category>, ApiError> {
        Ok(self.store.list_categories(acting).await?)
    }

    pub async fn owned_category(&self, acting: Uuid, id: Uuid) -> Result<Category, ApiError> {
        self.store
            .get_category(id)
            .await?
            .filter(|c| c.user_id == acting)
            .ok_or_else(|| ApiError::validation("unknown category"))
    }

    async fn check_group(&self, acting: Uuid, group_id: Option<Uuid>) -> Result<(), ApiError> {
        if let Some(group_id) = group_id {
            let visible = self.store.list_groups_for_user(acting).await?;
            if !visible.iter().any(|g| g.id == group_id) {
                return Err(ApiError::validation("unknown category group"));
            }
        }
        Ok(())
    }

    pub async fn create_category(
        &self,
        acting: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category, ApiError> {
        let name = require_text(&request.name, "category name")?;
        self.check_group(acting, request.group_id).await?;

        let category = Category {
            id: Uuid::new_v4(),
            user_id: acting,
            name,
            category_type: request.category_type,
            group_id: request.group_id,
            created_at: Utc::now(),
        };
        self.store.insert_category(&category).await?;
        Ok(category)
    }

    // The type of a category is fixed at creation.
    pub async fn update_category(
        &self,
        acting: Uuid,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<Category, ApiError> {
        let mut category = self.mine(acting, id).await?;
        category.name = require_text(&request.name, "category name")?;
        self.check_group(acting, request.group_id).await?;
        category.group_id = request.group_id;
        self.store.update_category(&category).await?;
        Ok(category)
    }

    pub async fn delete_category(&self, acting: Uuid, id: Uuid) -> Result<(), ApiError> {
        let category = self.mine(acting, id).await?;
        self.store.delete_category(category.id).await?;
        Ok(())
    }

    async fn mine(&self, acting: Uuid, id: Uuid) -> Result<Category, ApiError> {
        self.store
            .get_category(id)
            .await?
            .filter(|c| c.user_id == acting)
            .ok_or_else(|| ApiError::not_found("category"))
    }

    // Participants

    pub async fn participants(
        &self,
        acting: Uuid,
        group_id: Option<Uuid>,
    ) -> Result<Vec<Participant>, ApiError> {
        let group_ids: Vec<Uuid> = self
            .store
            .list_groups_for_user(acting)
            .await?
            .into_iter()
            .map(|g| g.id)
            .collect();
        let mut participants = self.store.list_participants(acting, &group_ids).await?;
        if let Some(group_id) = group_id {
            participants.retain(|p| p.group_id == Some(group_id));
        }
        Ok(participants)
    }

    pub async fn create_participant(
        &self,
        acting: Uuid,
        request: ParticipantRequest,
    ) -> Result<Participant, ApiError> {
        let name = require_text(&request.name, "participant name")?;
        self.check_group(acting, request.group_id).await?;

        let participant = Participant {
            id: Uuid::new_v4(),
            created_by: acting,
            name,
            email: optional_text(request.email.as_deref()),
            group_id: request.group_id,
            created_at: Utc::now(),
        };
        self.store.insert_participant(&participant).await?;
        Ok(participant)
    }

    pub async fn update_participant(
        &self,
        acting: Uuid,
        id: Uuid,
        request: ParticipantRequest,
    ) -> Result<Participant, ApiError> {
        let mut participant = self.visible_participant(acting, id).await?;
        participant.name = require_text(&request.name, "participant name")?;
        self.check_group(acting, request.group_id).await?;
        participant.email = optional_text(request.email.as_deref());
        participant.group_id = request.group_id;
        self.store.update_participant(&participant).await?;
        Ok(participant)
    }

    pub async fn delete_participant(&self, acting: Uuid, id: Uuid) -> Result<(), ApiError> {
        let participant = self.visible_participant(acting, id).await?;
        self.store.delete_participant(participant.id).await?;
        Ok(())
    }

    async fn visible_participant(&self, acting: Uuid, id: Uuid) -> Result<Participant, ApiError> {
        self.participants(acting, None)
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found("participant"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::services::{RelationshipService, fixtures};

    fn auth(profile: &Profile) -> AuthUser {
        AuthUser {
            id: profile.id,
            email: profile.email.clone(),
        }
    }

    #[tokio::test]
    async fn profile_is_created_on_first_read() {
        let store = fixtures::store();
        let service = CatalogService::new(&store);
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("new@example.com".into()),
        };

        let profile = service.ensure_profile(&user).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("new@example.com"));
        assert_eq!(store.get_profile(user.id).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn profile_is_still_created_when_the_email_is_taken() {
        let store = fixtures::store();
        fixtures::user(&store, "ana@example.com", None).await;
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("ana@example.com".into()),
        };

        let profile = CatalogService::new(&store).ensure_profile(&user).await.unwrap();
        assert_eq!(profile.email, None);
        assert!(store.get_profile(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn profile_defaults_must_belong_to_the_user() {
        let store = fixtures::store();
        let ana = fixtures::user(&store, "ana@example.com", None).await;
        let ben = fixtures::user(&store, "ben@example.com", None).await;
        let service = CatalogService::new(&store);
        let bens_group = RelationshipService::new(&store)
            .create_group(ben.id, "Ben only")
            .await
            .unwrap();

        let err = service
            .update_profile(
                &auth(&ana),
                UpdateProfileRequest {
                    default_group_id: Some(bens_group.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let food = service
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
        let updated = service
            .update_profile(
                &auth(&ana),
                UpdateProfileRequest {
                    full_name: Some(" Ana Lima ".into()),
                    default_category_id: Some(food.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Ana Lima"));
        assert_eq!(updated.default_category_id, Some(food.id));
    }

    #[tokio::test]
    async fn category_type_is_fixed_and_others_cannot_edit() {
        let store = fixtures::store();
        let ana = fixtures::user(&store, "ana@example.com", None).await;
        let ben = fixtures::user(&store, "ben@example.com", None).await;
        let service = CatalogService::new(&store);

        let salary = service
            .create_category(
                ana.id,
                CreateCategoryRequest {
                    name: "Salary".into(),
                    category_type: TransactionType::Income,
                    group_id: None,
                },
            )
            .await
            .unwrap();

        let renamed = service
            .update_category(
                ana.id,
                salary.id,
                UpdateCategoryRequest {
                    name: "Wages".into(),
                    group_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.category_type, TransactionType::Income);
        assert_eq!(service.categories(ana.id).await.unwrap()[0].name, "Wages");

        assert!(matches!(
            service.delete_category(ben.id, salary.id).await,
            Err(ApiError::NotFound(_))
        ));
        service.delete_category(ana.id, salary.id).await.unwrap();
        assert!(service.categories(ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn participants_are_shared_through_groups() {
        let store = fixtures::store();
        let ana = fixtures::user(&store, "ana@example.com", None).await;
        let ben = fixtures::user(&store, "ben@example.com", None).await;
        let relationships = RelationshipService::new(&store);
        let service = CatalogService::new(&store);

        let trip = relationships.create_group(ana.id, "Trip").await.unwrap();
        relationships
            .add_member(ana.id, trip.id, "ben@example.com", None)
            .await
            .unwrap();

        let guide = service
            .create_participant(
                ana.id,
                ParticipantRequest {
                    name: "Guide".into(),
                    email: Some("".into()),
                    group_id: Some(trip.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(guide.email, None);
        service
            .create_participant(
                ana.id,
                ParticipantRequest {
                    name: "Landlord".into(),
                    email: None,
                    group_id: None,
                },
            )
            .await
            .unwrap();

        let bens: Vec<String> = service
            .participants(ben.id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(bens, ["Guide"]);
        assert_eq!(service.participants(ana.id, None).await.unwrap().len(), 2);
        assert_eq!(service.participants(ana.id, Some(trip.id)).await.unwrap().len(), 1);

        let outsider = fixtures::user(&store, "cy@example.com", None).await;
        assert!(matches!(
            service.delete_participant(outsider.id, guide.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service
                .create_participant(
                    outsider.id,
                    ParticipantRequest {
                        name: "Sneaky".into(),
                        email: None,
                        group_id: Some(trip.id),
                    },
                )
                .await,
            Err(ApiError::Validation(_))
        ));
    }
}
