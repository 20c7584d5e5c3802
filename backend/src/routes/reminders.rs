use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::{backend, today};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{ReminderRequest, ReminderView};
use crate::services::ReminderService;
use crate::store::SharedStore;

#[get("/reminders")]
async fn list_reminders(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<Vec<ReminderView>>, ApiError> {
    let reminders = ReminderService::new(backend(store)).list(user.id, today()).await?;
    Ok(Json(reminders))
}

#[post("/reminders", data = "<request>")]
async fn create_reminder(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<ReminderRequest>,
) -> Result<(Status, Json<ReminderView>), ApiError> {
    let reminder = ReminderService::new(backend(store))
        .create(user.id, request.into_inner(), today())
        .await?;
    Ok((Status::Created, Json(reminder)))
}

#[put("/reminders/<id>", data = "<request>")]
async fn update_reminder(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
    request: Json<ReminderRequest>,
) -> Result<Json<ReminderView>, ApiError> {
    let reminder = ReminderService::new(backend(store))
        .update(user.id, id, request.into_inner(), today())
        .await?;
    Ok(Json(reminder))
}

#[post("/reminders/<id>/toggle")]
async fn toggle_reminder(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Json<ReminderView>, ApiError> {
    let reminder = ReminderService::new(backend(store))
        .toggle(user.id, id, today())
        .await?;
    Ok(Json(reminder))
}

#[delete("/reminders/<id>")]
async fn delete_reminder(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    ReminderService::new(backend(store)).delete(user.id, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_reminders,
        create_reminder,
        update_reminder,
        toggle_reminder,
        delete_reminder
    ]
}
