use finance_tracker_api::config::AppConfig;
use finance_tracker_api::{build_rocket, telemetry};

#[rocket::launch]
fn rocket() -> _ {
    let config = AppConfig::from_env().expect("invalid configuration");
    telemetry::init_tracing(&config.log_filter);
    tracing::info!(storage = ?config.storage, "starting finance tracker api");

    build_rocket(config).expect("CORS configuration failed")
}
