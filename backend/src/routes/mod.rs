use chrono::{NaiveDate, Utc};
use rocket::Request;
use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use uuid::Uuid;

use crate::domain::report::{DatePreset, DateRange, ReportFilters};
use crate::error::{ApiError, ErrorBody};
use crate::models::TransactionType;
use crate::store::{DataStore, SharedStore};

mod budgets;
mod categories;
mod friends;
mod groups;
mod participants;
mod profile;
mod reminders;
mod reports;
mod transactions;

const DATE_FORMAT: &str = "%Y-%m-%d";

// Health check
#[get("/health")]
fn health() -> &'static str {
    "OK"
}

fn backend(store: &State<SharedStore>) -> &dyn DataStore {
    store.inner().as_ref()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Query string shared by the transaction list and the report endpoint.
#[derive(Debug, Default, FromForm)]
pub struct ReportQuery {
    pub preset: Option<DatePreset>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub category_group_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    #[field(name = "type")]
    pub transaction_type: Option<TransactionType>,
    pub search: Option<String>,
}

impl ReportQuery {
    /// A preset wins over explicit bounds unless it is `custom`, which needs
    /// both `start` and `end`. Bounds given without a preset act as custom.
    pub fn into_filters(self, today: NaiveDate) -> Result<ReportFilters, ApiError> {
        let start = parse_date(self.start.as_deref(), "start")?;
        let end = parse_date(self.end.as_deref(), "end")?;

        let date_range = match (self.preset, start, end) {
            (Some(DatePreset::Custom), Some(start), Some(end)) | (None, Some(start), Some(end)) => {
                Some(DateRange::new(start, end).ok_or_else(|| {
                    ApiError::validation("start must not be after end")
                })?)
            }
            (Some(DatePreset::Custom), _, _) => {
                return Err(ApiError::validation("custom range needs start and end"));
            }
            (Some(preset), _, _) => DateRange::from_preset(preset, today),
            (None, None, None) => None,
            (None, _, _) => {
                return Err(ApiError::validation("start and end must be given together"));
            }
        };

        Ok(ReportFilters {
            date_range,
            category_group_id: self.category_group_id,
            category_id: self.category_id,
            transaction_type: self.transaction_type,
            search: self.search.filter(|s| !s.trim().is_empty()),
        })
    }
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), DATE_FORMAT)
                .map_err(|_| ApiError::validation(format!("{field} must be a YYYY-MM-DD date")))
        })
        .transpose()
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    ErrorBody::new("malformed request")
}

#[catch(401)]
fn unauthorized() -> Json<ErrorBody> {
    ErrorBody::new("missing or invalid credentials")
}

#[catch(404)]
fn not_found(request: &Request<'_>) -> Json<ErrorBody> {
    ErrorBody::new(format!("no route for {}", request.uri().path()))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    ErrorBody::new("request body or query could not be parsed")
}

#[catch(default)]
fn fallback(status: Status, _request: &Request<'_>) -> Json<ErrorBody> {
    ErrorBody::new(status.reason().unwrap_or("request failed"))
}

pub fn get_catchers() -> Vec<rocket::Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable, fallback]
}

pub fn get_routes() -> Vec<Route> {
    let mut routes = routes![health];
    routes.extend(profile::routes());
    routes.extend(groups::routes());
    routes.extend(categories::routes());
    routes.extend(participants::routes());
    routes.extend(transactions::routes());
    routes.extend(budgets::routes());
    routes.extend(reminders::routes());
    routes.extend(reports::routes());
    routes.extend(friends::routes());
    routes
}
