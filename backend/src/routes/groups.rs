use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::backend;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    AddGroupMemberRequest, CategoryGroup, CreateCategoryGroupRequest, GroupMemberView,
    UpdateMemberRoleRequest,
};
use crate::services::RelationshipService;
use crate::store::SharedStore;

#[get("/category-groups")]
async fn list_groups(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<Vec<CategoryGroup>>, ApiError> {
    let groups = RelationshipService::new(backend(store)).visible_groups(user.id).await?;
    Ok(Json(groups))
}

#[post("/category-groups", data = "<request>")]
async fn create_group(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<CreateCategoryGroupRequest>,
) -> Result<(Status, Json<CategoryGroup>), ApiError> {
    let group = RelationshipService::new(backend(store))
        .create_group(user.id, &request.name)
        .await?;
    Ok((Status::Created, Json(group)))
}

#[delete("/category-groups/<group_id>")]
async fn delete_group(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Uuid,
) -> Result<Status, ApiError> {
    RelationshipService::new(backend(store))
        .delete_group(user.id, group_id)
        .await?;
    Ok(Status::NoContent)
}

#[get("/category-groups/<group_id>/members")]
async fn list_members(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Uuid,
) -> Result<Json<Vec<GroupMemberView>>, ApiError> {
    let members = RelationshipService::new(backend(store))
        .members(user.id, group_id)
        .await?;
    Ok(Json(members))
}

#[post("/category-groups/<group_id>/members", data = "<request>")]
async fn add_member(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Uuid,
    request: Json<AddGroupMemberRequest>,
) -> Result<(Status, Json<GroupMemberView>), ApiError> {
    let request = request.into_inner();
    let member = RelationshipService::new(backend(store))
        .add_member(user.id, group_id, &request.email, request.role)
        .await?;
    Ok((Status::Created, Json(member)))
}

#[put("/category-groups/<group_id>/members/<user_id>", data = "<request>")]
async fn update_member_role(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Uuid,
    user_id: Uuid,
    request: Json<UpdateMemberRoleRequest>,
) -> Result<Status, ApiError> {
    RelationshipService::new(backend(store))
        .update_member_role(user.id, group_id, user_id, request.role)
        .await?;
    Ok(Status::NoContent)
}

#[delete("/category-groups/<group_id>/members/<user_id>")]
async fn remove_member(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<Status, ApiError> {
    RelationshipService::new(backend(store))
        .remove_member(user.id, group_id, user_id)
        .await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_groups,
        create_group,
        delete_group,
        list_members,
        add_member,
        update_member_role,
        remove_member
    ]
}
