use std::sync::Arc;

use finance_tracker_api::auth::issue_token;
use finance_tracker_api::build_rocket_with_store;
use finance_tracker_api::config::AppConfig;
use finance_tracker_api::store::MemoryStore;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{Value, json};
use uuid::Uuid;

struct TestUser {
    id: Uuid,
    token: String,
}

async fn client() -> (Client, AppConfig) {
    let config = AppConfig::in_memory("test-secret");
    let rocket = build_rocket_with_store(&config, Arc::new(MemoryStore::new()))
        .expect("cors options are valid");
    let client = Client::tracked(rocket).await.expect("valid rocket instance");
    (client, config)
}

/// Signs a user in and touches their profile so others can find them by email.
async fn sign_in(client: &Client, config: &AppConfig, email: &str) -> TestUser {
    let id = Uuid::new_v4();
    let token = issue_token(&config.auth_settings(), id, Some(email), chrono::Duration::hours(1))
        .expect("token");
    let user = TestUser { id, token };
    let response = get(client, &user, "/api/profile").await;
    assert_eq!(response.status(), Status::Ok);
    user
}

fn bearer(user: &TestUser) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", user.token))
}

async fn get<'c>(client: &'c Client, user: &TestUser, uri: &str) -> LocalResponse<'c> {
    client.get(uri.to_string()).header(bearer(user)).dispatch().await
}

async fn post<'c>(client: &'c Client, user: &TestUser, uri: &str, body: Value) -> LocalResponse<'c> {
    client
        .post(uri.to_string())
        .header(bearer(user))
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await
}

async fn json_of(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.expect("json body")
}

#[rocket::async_test]
async fn requests_without_a_valid_token_are_rejected() {
    let (client, _) = client().await;

    let health = client.get("/api/health").dispatch().await;
    assert_eq!(health.status(), Status::Ok);
    assert_eq!(health.into_string().await.as_deref(), Some("OK"));

    let anonymous = client.get("/api/transactions").dispatch().await;
    assert_eq!(anonymous.status(), Status::Unauthorized);
    assert!(json_of(anonymous).await["error"].is_string());

    let forged = client
        .get("/api/profile")
        .header(Header::new("Authorization", "Bearer not-a-jwt"))
        .dispatch()
        .await;
    assert_eq!(forged.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn a_new_user_can_write_before_reading_their_profile() {
    let (client, config) = client().await;
    let id = Uuid::new_v4();
    let token = issue_token(&config.auth_settings(), id, Some("new@example.com"), chrono::Duration::hours(1))
        .expect("token");
    let newcomer = TestUser { id, token };

    let created = post(
        &client,
        &newcomer,
        "/api/transactions",
        json!({ "type": "expense", "amount": 19.99, "transaction_date": "2024-03-04" }),
    )
    .await;
    assert_eq!(created.status(), Status::Created);
    let body = json_of(created).await;
    assert_eq!(body["amount"], 19.99);
    assert_eq!(body["payer"]["is_self"], true);

    let profile = json_of(get(&client, &newcomer, "/api/profile").await).await;
    assert_eq!(profile["id"], json!(newcomer.id));
    assert_eq!(profile["email"], "new@example.com");
}

#[rocket::async_test]
async fn friend_flow_makes_friends_selectable_payers() {
    let (client, config) = client().await;
    let ana = sign_in(&client, &config, "ana@example.com").await;
    let ben = sign_in(&client, &config, "ben@example.com").await;

    let request = post(&client, &ana, "/api/friends/requests", json!({ "email": "ben@example.com" })).await;
    assert_eq!(request.status(), Status::Created);
    let edge = json_of(request).await;
    let edge_id = edge["id"].as_str().expect("edge id").to_string();

    let duplicate = post(&client, &ben, "/api/friends/requests", json!({ "email": "ana@example.com" })).await;
    assert_eq!(duplicate.status(), Status::Conflict);

    let incoming = json_of(get(&client, &ben, "/api/friends").await).await;
    assert_eq!(incoming["incoming"].as_array().map(Vec::len), Some(1));

    // Only the addressee may accept.
    let wrong_side = post(&client, &ana, &format!("/api/friends/{edge_id}/accept"), json!({})).await;
    assert_eq!(wrong_side.status(), Status::Forbidden);
    let accepted = post(&client, &ben, &format!("/api/friends/{edge_id}/accept"), json!({})).await;
    assert_eq!(accepted.status(), Status::Ok);

    let created = post(
        &client,
        &ana,
        "/api/transactions",
        json!({ "type": "expense", "amount": 42.5, "paid_by": ben.id }),
    )
    .await;
    assert_eq!(created.status(), Status::Created);

    let rows = json_of(get(&client, &ana, "/api/transactions").await).await;
    let payer = &rows[0]["payer"];
    assert_eq!(payer["display_name"], "ben@example.com");
    assert_eq!(payer["is_self"], false);
    assert_eq!(payer["reference"], json!({ "kind": "friend", "id": ben.id }));
}

#[rocket::async_test]
async fn changing_group_resets_an_out_of_scope_participant() {
    let (client, config) = client().await;
    let ana = sign_in(&client, &config, "ana@example.com").await;

    let trip = json_of(post(&client, &ana, "/api/category-groups", json!({ "name": "Trip" })).await).await;
    let home = json_of(post(&client, &ana, "/api/category-groups", json!({ "name": "Home" })).await).await;
    let guide = json_of(
        post(
            &client,
            &ana,
            "/api/participants",
            json!({ "name": "Guide", "group_id": trip["id"] }),
        )
        .await,
    )
    .await;
    let (trip_id, home_id, guide_id) = (
        trip["id"].as_str().unwrap(),
        home["id"].as_str().unwrap(),
        guide["id"].as_str().unwrap(),
    );

    let kept = json_of(
        get(&client, &ana, &format!("/api/payer-options?group_id={trip_id}&current={guide_id}")).await,
    )
    .await;
    assert_eq!(kept["selected"], json!({ "kind": "participant", "id": guide_id }));

    let reset = json_of(
        get(&client, &ana, &format!("/api/payer-options?group_id={home_id}&current={guide_id}")).await,
    )
    .await;
    assert_eq!(reset["selected"], json!({ "kind": "myself" }));
    assert_eq!(reset["options"].as_array().map(Vec::len), Some(1));

    let rejected = post(
        &client,
        &ana,
        "/api/transactions",
        json!({ "type": "expense", "amount": 10, "category_group_id": home_id, "paid_by": guide_id }),
    )
    .await;
    assert_eq!(rejected.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn reports_and_budgets_reflect_recorded_transactions() {
    let (client, config) = client().await;
    let ana = sign_in(&client, &config, "ana@example.com").await;

    let food = json_of(
        post(&client, &ana, "/api/categories", json!({ "name": "Food", "type": "expense" })).await,
    )
    .await;
    for body in [
        json!({ "type": "income", "amount": 1000, "transaction_date": "2024-03-01" }),
        json!({ "type": "expense", "amount": 60, "transaction_date": "2024-03-04", "category_id": food["id"] }),
        json!({ "type": "expense", "amount": 25, "transaction_date": "2024-04-02", "category_id": food["id"] }),
    ] {
        let response = post(&client, &ana, "/api/transactions", body).await;
        assert_eq!(response.status(), Status::Created);
    }

    let march = json_of(
        get(&client, &ana, "/api/reports?preset=custom&start=2024-03-01&end=2024-03-31").await,
    )
    .await;
    assert_eq!(march["totals"]["income"], 1000.0);
    assert_eq!(march["totals"]["expense"], 60.0);
    assert_eq!(march["by_category"][0]["name"], "Food");

    let reversed = get(&client, &ana, "/api/reports?start=2024-04-01&end=2024-03-01").await;
    assert_eq!(reversed.status(), Status::BadRequest);

    let searched = json_of(get(&client, &ana, "/api/transactions?search=food").await).await;
    assert_eq!(searched.as_array().map(Vec::len), Some(2));

    let invalid = post(
        &client,
        &ana,
        "/api/budgets",
        json!({ "amount": 0, "period": "monthly", "start_date": "2024-03-01" }),
    )
    .await;
    assert_eq!(invalid.status(), Status::BadRequest);

    let budget = json_of(
        post(
            &client,
            &ana,
            "/api/budgets",
            json!({ "amount": 50, "period": "monthly", "start_date": "2024-03-01", "category_id": food["id"] }),
        )
        .await,
    )
    .await;
    assert_eq!(budget["spent"], 60.0);
    assert_eq!(budget["over_budget"], true);
    assert_eq!(budget["percentage"], 1.0);
}
