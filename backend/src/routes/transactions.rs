use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use super::{ReportQuery, backend, today};
use crate::auth::AuthUser;
use crate::domain::scoping::PayerSelection;
use crate::error::ApiError;
use crate::models::{TransactionRequest, TransactionView};
use crate::services::TransactionService;
use crate::store::SharedStore;

#[get("/transactions?<query..>")]
async fn list_transactions(
    store: &State<SharedStore>,
    user: AuthUser,
    query: ReportQuery,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    let filters = query.into_filters(today())?;
    let transactions = TransactionService::new(backend(store))
        .list(user.id, &filters)
        .await?;
    Ok(Json(transactions))
}

#[post("/transactions", data = "<request>")]
async fn create_transaction(
    store: &State<SharedStore>,
    user: AuthUser,
    request: Json<TransactionRequest>,
) -> Result<(Status, Json<TransactionView>), ApiError> {
    let transaction = TransactionService::new(backend(store))
        .create(user.id, request.into_inner())
        .await?;
    Ok((Status::Created, Json(transaction)))
}

#[put("/transactions/<id>", data = "<request>")]
async fn update_transaction(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
    request: Json<TransactionRequest>,
) -> Result<Json<TransactionView>, ApiError> {
    let transaction = TransactionService::new(backend(store))
        .update(user.id, id, request.into_inner())
        .await?;
    Ok(Json(transaction))
}

#[delete("/transactions/<id>")]
async fn delete_transaction(
    store: &State<SharedStore>,
    user: AuthUser,
    id: Uuid,
) -> Result<Status, ApiError> {
    TransactionService::new(backend(store)).delete(user.id, id).await?;
    Ok(Status::NoContent)
}

/// Payer choices for the transaction form. `current` is the stored `paid_by`
/// being edited; an out-of-scope participant comes back reset to self.
#[get("/payer-options?<group_id>&<current>")]
async fn payer_options(
    store: &State<SharedStore>,
    user: AuthUser,
    group_id: Option<Uuid>,
    current: Option<Uuid>,
) -> Result<Json<PayerSelection>, ApiError> {
    let selection = TransactionService::new(backend(store))
        .payer_selection(user.id, group_id, current)
        .await?;
    Ok(Json(selection))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_transactions,
        create_transaction,
        update_transaction,
        delete_transaction,
        payer_options
    ]
}
