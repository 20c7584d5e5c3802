use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        if fmt().with_env_filter(filter).try_init().is_err() {
            eprintln!("tracing subscriber already installed");
        }
    });
}
