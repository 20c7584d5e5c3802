use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::backend;
use crate::auth::AuthUser;
use crate::domain::budget::BudgetProgress;
use crate::error::ApiError;
use crate::models::BudgetRequest;
use crate::services::BudgetService;
use crate::store::SharedStore;

#[get("/budgets")]
async fn list_budgets(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<Vec<BudgetProgress>>, ApiError> {
    let budgets = BudgetService::new(backend(store)).list_progress(user.id).await?;
    Ok(Json(budgets))
}

#[post("/budgets", data = "<request>")]
async fn create_budget(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<BudgetRequest>,
) -> Result<(Status, Json<BudgetProgress>), ApiError> {
    let budget = BudgetService::new(backend(store))
        .create(user.id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(budget)))
}

#[put("/budgets/<id>", data = "<request>")]
async fn update_budget(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
    request: Json<BudgetRequest>,
) -> Result<Json<BudgetProgress>, ApiError> {
    let budget = BudgetService::new(backend(store))
        .update(user.id, id, request.into_inner())
        .await?;
    Ok(Json(budget))
}

#[delete("/budgets/<id>")]
async fn delete_budget(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    BudgetService::new(backend(store)).delete(user.id, id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![list_budgets, create_budget, update_budget, delete_budget]
}
