use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use super::require_text;
use crate::error::ApiError;
use crate::models::{
    CategoryGroup, Friend, FriendStatus, FriendView, FriendsOverview, GroupMember,
    GroupMemberView, MemberRole, Profile,
};
use crate::store::DataStore;

pub struct RelationshipService<'a> {
    store: &'a dyn DataStore,
}

impl<'a> RelationshipService<'a> {
    pub fn new(store: &'a dyn DataStore) -> Self {
        RelationshipService { store }
    }

    pub async fn send_friend_request(&self, acting: Uuid, email: &str) -> Result<Friend, ApiError> {
        let email = require_text(email, "email")?;
        let target = self
            .store
            .find_profile_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no user found with email {email}")))?;

        if target.id == acting {
            return Err(ApiError::validation("you cannot send a friend request to yourself"));
        }

        if let Some(existing) = self.store.find_friend_edge(acting, target.id).await? {
            let reason = match existing.status {
                FriendStatus::Pending => "a friend request between you is already pending",
                FriendStatus::Accepted => "you are already friends",
                FriendStatus::Blocked => "this user cannot be added as a friend",
            };
            return Err(ApiError::Conflict(reason.to_string()));
        }

        let edge = Friend {
            id: Uuid::new_v4(),
            user_id: acting,
            friend_id: target.id,
            status: FriendStatus::Pending,
            created_at: Utc::now(),
        };
        self.store.insert_friend_edge(&edge).await?;

        tracing::info!(edge = %edge.id, from = %acting, to = %target.id, "friend request sent");
        Ok(edge)
    }

    pub async fn accept(&self, acting: Uuid, edge_id: Uuid) -> Result<Friend, ApiError> {
        let mut edge = self.edge_for(acting, edge_id).await?;
        if edge.status != FriendStatus::Pending {
            return Err(ApiError::Conflict("only pending requests can be accepted".into()));
        }
        if edge.friend_id != acting {
            return Err(ApiError::Forbidden("only the recipient can accept this request".into()));
        }

        self.store
            .update_friend_status(edge.id, FriendStatus::Accepted)
            .await?;
        edge.status = FriendStatus::Accepted;
        tracing::info!(edge = %edge.id, "friend request accepted");
        Ok(edge)
    }

    pub async fn reject(&self, acting: Uuid, edge_id: Uuid) -> Result<(), ApiError> {
        let edge = self.edge_for(acting, edge_id).await?;
        if edge.status != FriendStatus::Pending {
            return Err(ApiError::Conflict("only pending requests can be rejected".into()));
        }
        self.store.delete_friend_edge(edge.id).await?;
        Ok(())
    }

    pub async fn remove(&self, acting: Uuid, edge_id: Uuid) -> Result<(), ApiError> {
        let edge = self.edge_for(acting, edge_id).await?;
        if edge.status != FriendStatus::Accepted {
            return Err(ApiError::Conflict("only accepted friends can be removed".into()));
        }
        self.store.delete_friend_edge(edge.id).await?;
        tracing::info!(edge = %edge.id, "friendship removed");
        Ok(())
    }

    pub async fn block(&self, acting: Uuid, edge_id: Uuid) -> Result<Friend, ApiError> {
        let mut edge = self.edge_for(acting, edge_id).await?;
        if edge.status == FriendStatus::Blocked {
            return Err(ApiError::Conflict("this user is already blocked".into()));
        }
        self.store
            .update_friend_status(edge.id, FriendStatus::Blocked)
            .await?;
        edge.status = FriendStatus::Blocked;
        Ok(edge)
    }

    async fn edge_for(&self, acting: Uuid, edge_id: Uuid) -> Result<Friend, ApiError> {
        self.store
            .get_friend_edge(edge_id)
            .await?
            .filter(|edge| edge.involves(acting))
            .ok_or_else(|| ApiError::not_found("friend request"))
    }

    pub async fn overview(&self, acting: Uuid) -> Result<FriendsOverview, ApiError> {
        let edges = self.store.list_friend_edges(acting).await?;
        let other_ids: Vec<Uuid> = edges.iter().filter_map(|e| e.other_party(acting)).collect();
        let profiles = self.store.profiles_by_ids(&other_ids).await?;

        let mut overview = FriendsOverview::default();
        for edge in edges {
            let Some(other) = edge.other_party(acting) else {
                continue;
            };
            let Some(profile) = profiles.iter().find(|p| p.id == other).cloned() else {
                tracing::warn!(edge = %edge.id, "friend edge points at a missing profile");
                continue;
            };
            let view = FriendView {
                edge_id: edge.id,
                status: edge.status,
                profile,
            };
            match edge.status {
                FriendStatus::Accepted => overview.friends.push(view),
                FriendStatus::Pending if edge.user_id == acting => overview.outgoing.push(view),
                FriendStatus::Pending => overview.incoming.push(view),
                FriendStatus::Blocked => {}
            }
        }
        Ok(overview)
    }

    pub async fn accepted_friends(&self, acting: Uuid) -> Result<Vec<Profile>, ApiError> {
        let ids: Vec<Uuid> = self
            .store
            .list_friend_edges(acting)
            .await?
            .into_iter()
            .filter(|e| e.status == FriendStatus::Accepted)
            .filter_map(|e| e.other_party(acting))
            .collect();
        Ok(self.store.profiles_by_ids(&ids).await?)
    }

    // Category groups

    pub async fn visible_groups(&self, acting: Uuid) -> Result<Vec<CategoryGroup>, ApiError> {
        Ok(self.store.list_groups_for_user(acting).await?)
    }

    pub async fn create_group(&self, acting: Uuid, name: &str) -> Result<CategoryGroup, ApiError> {
        let group = CategoryGroup {
            id: Uuid::new_v4(),
            user_id: acting,
            name: require_text(name, "group name")?,
            created_at: Utc::now(),
        };
        self.store.create_group_with_admin(&group).await?;
        tracing::info!(group = %group.id, owner = %acting, "category group created");
        Ok(group)
    }

    pub async fn delete_group(&self, acting: Uuid, group_id: Uuid) -> Result<(), ApiError> {
        let (group, _) = self.require_membership(acting, group_id).await?;
        if group.user_id != acting {
            return Err(ApiError::Forbidden("only the owner can delete this group".into()));
        }
        self.store.delete_group(group.id).await?;
        tracing::info!(group = %group.id, "category group deleted");
        Ok(())
    }

    pub async fn require_membership(
        &self,
        acting: Uuid,
        group_id: Uuid,
    ) -> Result<(CategoryGroup, Vec<GroupMember>), ApiError> {
        let group = self
            .store
            .get_group(group_id)
            .await?
            .ok_or_else(|| ApiError::not_found("category group"))?;
        let members = self.store.list_group_members(group_id).await?;
        if group.user_id != acting && !members.iter().any(|m| m.user_id == acting) {
            return Err(ApiError::not_found("category group"));
        }
        Ok((group, members))
    }

    async fn require_admin(
        &self,
        acting: Uuid,
        group_id: Uuid,
    ) -> Result<(CategoryGroup, Vec<GroupMember>), ApiError> {
        let (group, members) = self.require_membership(acting, group_id).await?;
        let is_admin = group.user_id == acting
            || members
                .iter()
                .any(|m| m.user_id == acting && m.role == MemberRole::Admin);
        if !is_admin {
            return Err(ApiError::Forbidden("only group admins can manage members".into()));
        }
        Ok((group, members))
    }

    pub async fn members(
        &self,
        acting: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<GroupMemberView>, ApiError> {
        let (_, members) = self.require_membership(acting, group_id).await?;
        self.member_views(members).await
    }

    async fn member_views(&self, members: Vec<GroupMember>) -> Result<Vec<GroupMemberView>, ApiError> {
        let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let profiles = self.store.profiles_by_ids(&ids).await?;
        Ok(members
            .into_iter()
            .map(|member| {
                let profile = profiles.iter().find(|p| p.id == member.user_id);
                GroupMemberView {
                    display_name: profile.map_or_else(|| "Unknown".to_string(), Profile::display_name),
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                    member,
                }
            })
            .collect())
    }

    pub async fn add_member(
        &self,
        acting: Uuid,
        group_id: Uuid,
        email: &str,
        role: Option<MemberRole>,
    ) -> Result<GroupMemberView, ApiError> {
        let (group, members) = self.require_admin(acting, group_id).await?;
        let email = require_text(email, "email")?;
        let profile = self
            .store
            .find_profile_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no user found with email {email}")))?;
        if profile.id == group.user_id || members.iter().any(|m| m.user_id == profile.id) {
            return Err(ApiError::Conflict("user is already a member of this group".into()));
        }

        let member = GroupMember {
            id: Uuid::new_v4(),
            group_id,
            user_id: profile.id,
            role: role.unwrap_or(MemberRole::Member),
            created_at: Utc::now(),
        };
        self.store.insert_group_member(&member).await?;
        tracing::info!(group = %group_id, user = %profile.id, role = %member.role, "group member added");

        Ok(GroupMemberView {
            display_name: profile.display_name(),
            avatar_url: profile.avatar_url,
            member,
        })
    }

    // The owner always stays admin.
    pub async fn update_member_role(
        &self,
        acting: Uuid,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<(), ApiError> {
        let (group, _) = self.require_admin(acting, group_id).await?;
        if user_id == group.user_id && role != MemberRole::Admin {
            return Err(ApiError::validation("the group owner must remain an admin"));
        }
        self.store.update_member_role(group_id, user_id, role).await?;
        Ok(())
    }

    pub async fn remove_member(
        &self,
        acting: Uuid,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ApiError> {
        let (group, _) = if acting == user_id {
            self.require_membership(acting, group_id).await?
        } else {
            self.require_admin(acting, group_id).await?
        };
        if user_id == group.user_id {
            return Err(ApiError::validation("the group owner cannot be removed"));
        }
        self.store.delete_group_member(group_id, user_id).await?;
        Ok(())
    }

    pub async fn co_members(
        &self,
        acting: Uuid,
        groups: &[CategoryGroup],
    ) -> Result<Vec<(Uuid, Vec<Profile>)>, ApiError> {
        let mut memberships = Vec::with_capacity(groups.len());
        let mut ids = HashSet::new();
        for group in groups {
            let members = self.store.list_group_members(group.id).await?;
            ids.extend(members.iter().map(|m| m.user_id));
            ids.insert(group.user_id);
            memberships.push((group, members));
        }
        ids.remove(&acting);

        let ids: Vec<Uuid> = ids.into_iter().collect();
        let profiles = self.store.profiles_by_ids(&ids).await?;
        Ok(memberships
            .into_iter()
            .map(|(group, members)| {
                let in_group: Vec<Profile> = profiles
                    .iter()
                    .filter(|p| p.id == group.user_id || members.iter().any(|m| m.user_id == p.id))
                    .cloned()
                    .collect();
                (group.id, in_group)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::store::MemoryStore;

    async fn pair(store: &MemoryStore) -> (Profile, Profile) {
        (
            fixtures::user(store, "ana@example.com", Some("Ana")).await,
            fixtures::user(store, "ben@example.com", None).await,
        )
    }

    #[tokio::test]
    async fn request_to_unknown_email_fails_without_inserting() {
        let store = fixtures::store();
        let (ana, _) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let err = service
            .send_friend_request(ana.id, "nobody@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(store.list_friend_edges(ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_to_self_is_rejected() {
        let store = fixtures::store();
        let (ana, _) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let err = service
            .send_friend_request(ana.id, "ANA@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_requests_fail_in_both_directions() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let edge = service.send_friend_request(ana.id, "ben@example.com").await.unwrap();
        assert!(matches!(
            service.send_friend_request(ana.id, "ben@example.com").await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            service.send_friend_request(ben.id, "ana@example.com").await,
            Err(ApiError::Conflict(_))
        ));

        service.accept(ben.id, edge.id).await.unwrap();
        assert!(matches!(
            service.send_friend_request(ben.id, "ana@example.com").await,
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(store.list_friend_edges(ana.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_addressee_accepts_and_acceptance_is_symmetric() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let edge = service.send_friend_request(ana.id, "ben@example.com").await.unwrap();
        assert!(matches!(service.accept(ana.id, edge.id).await, Err(ApiError::Forbidden(_))));

        let outsider = fixtures::user(&store, "cy@example.com", None).await;
        assert!(matches!(service.accept(outsider.id, edge.id).await, Err(ApiError::NotFound(_))));

        let before = service.overview(ben.id).await.unwrap();
        assert_eq!(before.incoming.len(), 1);
        assert_eq!(service.overview(ana.id).await.unwrap().outgoing.len(), 1);

        let accepted = service.accept(ben.id, edge.id).await.unwrap();
        assert_eq!(accepted.status, FriendStatus::Accepted);

        let ana_friends = service.accepted_friends(ana.id).await.unwrap();
        let ben_friends = service.accepted_friends(ben.id).await.unwrap();
        assert_eq!(ana_friends[0].id, ben.id);
        assert_eq!(ben_friends[0].id, ana.id);

        // accepted edges cannot be accepted or rejected again
        assert!(matches!(service.accept(ben.id, edge.id).await, Err(ApiError::Conflict(_))));
        assert!(matches!(service.reject(ben.id, edge.id).await, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn reject_and_remove_delete_the_edge_allowing_a_new_request() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let edge = service.send_friend_request(ana.id, "ben@example.com").await.unwrap();
        assert!(matches!(service.remove(ana.id, edge.id).await, Err(ApiError::Conflict(_))));
        service.reject(ben.id, edge.id).await.unwrap();
        assert!(store.get_friend_edge(edge.id).await.unwrap().is_none());

        let again = service.send_friend_request(ben.id, "ana@example.com").await.unwrap();
        service.accept(ana.id, again.id).await.unwrap();
        service.remove(ben.id, again.id).await.unwrap();
        assert!(service.accepted_friends(ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_edges_hide_the_user_and_prevent_requests() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let edge = service.send_friend_request(ana.id, "ben@example.com").await.unwrap();
        service.block(ben.id, edge.id).await.unwrap();

        let overview = service.overview(ana.id).await.unwrap();
        assert!(overview.friends.is_empty() && overview.outgoing.is_empty());
        assert!(matches!(
            service.send_friend_request(ana.id, "ben@example.com").await,
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(service.block(ana.id, edge.id).await, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn creating_a_group_makes_the_creator_admin() {
        let store = fixtures::store();
        let (ana, _) = pair(&store).await;
        let service = RelationshipService::new(&store);

        let group = service.create_group(ana.id, " Business ").await.unwrap();
        assert_eq!(group.name, "Business");

        let members = service.members(ana.id, group.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].member.user_id, ana.id);
        assert_eq!(members[0].member.role, MemberRole::Admin);
        assert_eq!(members[0].display_name, "Ana");

        assert!(matches!(
            service.create_group(ana.id, "  ").await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn membership_rules() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let cy = fixtures::user(&store, "cy@example.com", None).await;
        let service = RelationshipService::new(&store);
        let group = service.create_group(ana.id, "Trip").await.unwrap();

        // outsiders cannot see the group at all
        assert!(matches!(service.members(ben.id, group.id).await, Err(ApiError::NotFound(_))));

        service.add_member(ana.id, group.id, "ben@example.com", None).await.unwrap();
        assert!(matches!(
            service.add_member(ana.id, group.id, "ben@example.com", None).await,
            Err(ApiError::Conflict(_))
        ));
        // plain members cannot manage the group
        assert!(matches!(
            service.add_member(ben.id, group.id, "cy@example.com", None).await,
            Err(ApiError::Forbidden(_))
        ));

        service
            .update_member_role(ana.id, group.id, ben.id, MemberRole::Admin)
            .await
            .unwrap();
        service.add_member(ben.id, group.id, "cy@example.com", None).await.unwrap();
        assert!(matches!(
            service.update_member_role(ben.id, group.id, ana.id, MemberRole::Member).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            service.remove_member(ben.id, group.id, ana.id).await,
            Err(ApiError::Validation(_))
        ));

        // members may leave on their own
        service.remove_member(cy.id, group.id, cy.id).await.unwrap();
        assert_eq!(service.members(ana.id, group.id).await.unwrap().len(), 2);

        let visible = service.visible_groups(ben.id).await.unwrap();
        assert_eq!(visible.len(), 1);

        assert!(matches!(service.delete_group(ben.id, group.id).await, Err(ApiError::Forbidden(_))));
        service.delete_group(ana.id, group.id).await.unwrap();
        assert!(service.visible_groups(ben.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn co_members_excludes_the_acting_user() {
        let store = fixtures::store();
        let (ana, ben) = pair(&store).await;
        let service = RelationshipService::new(&store);
        let group = service.create_group(ana.id, "Flat").await.unwrap();
        service.add_member(ana.id, group.id, "ben@example.com", None).await.unwrap();

        let co = service.co_members(ben.id, &[group.clone()]).await.unwrap();
        assert_eq!(co.len(), 1);
        assert_eq!(co[0].0, group.id);
        let ids: Vec<Uuid> = co[0].1.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ana.id]);
    }
}
