use rocket::Route;
use rocket::State;
use rocket::serde::json::Json;

use super::{ReportQuery, backend, today};
use crate::auth::AuthUser;
use crate::domain::report::Report;
use crate::error::ApiError;
use crate::services::ReportService;
use crate::services::reports::Dashboard;
use crate::store::SharedStore;

#[get("/reports?<query..>")]
async fn get_report(
    store: &State<SharedStore>,
    user: AuthUser,
    query: ReportQuery,
) -> Result<Json<Report>, ApiError> {
    let filters = query.into_filters(today())?;
    let report = ReportService::new(backend(store)).report(user.id, &filters).await?;
    Ok(Json(report))
}

#[get("/dashboard")]
async fn get_dashboard(
    store: &State<SharedStore>,
    user: AuthUser,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = ReportService::new(backend(store)).dashboard(user.id, today()).await?;
    Ok(Json(dashboard))
}

pub fn routes() -> Vec<Route> {
    routes![get_report, get_dashboard]
}
