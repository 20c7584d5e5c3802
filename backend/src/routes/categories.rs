use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::backend;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use crate::services::CatalogService;
use crate::store::SharedStore;

#[get("/categories")]
async fn list_categories(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = CatalogService::new(backend(store)).categories(user.id).await?;
    Ok(Json(categories))
}

#[post("/categories", data = "<request>")]
async fn create_category(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<CreateCategoryRequest>,
) -> Result<(Status, Json<Category>), ApiError> {
    let category = CatalogService::new(backend(store))
        .create_category(user.id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(category)))
}

#[put("/categories/<id>", data = "<request>")]
async fn update_category(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
    request: Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let category = CatalogService::new(backend(store))
        .update_category(user.id, id, request.into_inner())
        .await?;
    Ok(Json(category))
}

#[delete("/categories/<id>")]
async fn delete_category(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    CatalogService::new(backend(store)).delete_category(user.id, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![list_categories, create_category, update_category, delete_category]
}
