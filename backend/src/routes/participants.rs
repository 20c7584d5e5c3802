use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::backend;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Participant, ParticipantRequest};
use crate::services::CatalogService;
use crate::store::SharedStore;

#[get("/participants?<group_id>")]
async fn list_participants(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Option<Uuid>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let participants = CatalogService::new(backend(store))
        .participants(user.id, group_id)
        .await?;
    Ok(Json(participants))
}

#[post("/participants", data = "<request>")]
async fn create_participant(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<ParticipantRequest>,
) -> Result<(Status, Json<Participant>), ApiError> {
    let participant = CatalogService::new(backend(store))
        .create_participant(user.id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(participant)))
}

#[put("/participants/<id>", data = "<request>")]
async fn update_participant(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
    request: Json<ParticipantRequest>,
) -> Result<Json<Participant>, ApiError> {
    let participant = CatalogService::new(backend(store))
        .update_participant(user.id, id, request.into_inner())
        .await?;
    Ok(Json(participant))
}

#[delete("/participants/<id>")]
async fn delete_participant(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    CatalogService::new(backend(store)).delete_participant(user.id, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_participants,
        create_participant,
        update_participant,
        delete_participant
    ]
}
