mod config;
mod errors;
mod registry;
mod relay;
mod routes;
mod search;
mod telemetry;

pub use config::{ConfigError, RelayConfig, SearchBackendConfig, SearchConfig, VendorConfig};
pub use errors::{BoxedError, RelayError};
pub use registry::ProviderRegistry;
pub use relay::{encode_event, open_relay, relay_events};
pub use routes::{cors_layer, router, AppState};
pub use search::SearchClient;
pub use telemetry::init_tracing;
