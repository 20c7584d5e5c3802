use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::backend;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Friend, FriendRequestBody, FriendsOverview};
use crate::services::RelationshipService;
use crate::store::SharedStore;

#[get("/friends")]
async fn list_friends(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<FriendsOverview>, ApiError> {
    let overview = RelationshipService::new(backend(store)).overview(user.id).await?;
    Ok(Json(overview))
}

#[post("/friends/requests", data = "<request>")]
async fn send_request(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<FriendRequestBody>,
) -> Result<(Status, Json<Friend>), ApiError> {
    let edge = RelationshipService::new(backend(store))
        .send_friend_request(user.id, &request.email)
        .await?;
    Ok((Status::Created, Json(edge)))
}

#[post("/friends/<id>/accept")]
async fn accept_request(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Json<Friend>, ApiError> {
    let edge = RelationshipService::new(backend(store)).accept(user.id, id).await?;
    Ok(Json(edge))
}

#[post("/friends/<id>/reject")]
async fn reject_request(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    RelationshipService::new(backend(store)).reject(user.id, id).await?;
    Ok(Status::NoContent)
}

#[post("/friends/<id>/block")]
async fn block_user(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Json<Friend>, ApiError> {
    let edge = RelationshipService::new(backend(store)).block(user.id, id).await?;
    Ok(Json(edge))
}

#[delete("/friends/<id>")]
async fn remove_friend(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    RelationshipService::new(backend(store)).remove(user.id, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_friends,
        send_request,
        accept_request,
        reject_request,
        block_user,
        remove_friend
    ]
}
