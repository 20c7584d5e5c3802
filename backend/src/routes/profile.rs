use rocket::Route;
use rocket::State;
use rocket::serde::json::Json;

use super::backend;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{Profile, UpdateProfileRequest};
use crate::services::CatalogService;
use crate::store::SharedStore;

#[get("/profile")]
async fn get_profile(store: &State<SharedStore>, user: AuthUser) -> Result<Json<Profile>, ApiError> {
    let profile = CatalogService::new(backend(store)).ensure_profile(&user).await?;
    Ok(Json(profile))
}

#[put("/profile", data = "<request>")]
async fn update_profile(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = CatalogService::new(backend(store))
        .update_profile(&user, request.into_inner())
        .await?;
    Ok(Json(profile))
}

pub fn routes() -> Vec<Route> {
    routes![get_profile, update_profile]
}
