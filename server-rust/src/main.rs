use chat_relay_server::{cors_layer, init_tracing, router, AppState, BoxedError, RelayConfig};
use dotenvy::dotenv;

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    dotenv().ok();
    init_tracing()?;

    let config = RelayConfig::from_env()?;
    let state = AppState::from_config(&config);
    let vendors = state.providers.vendors().map(str::to_owned).collect::<Vec<_>>();
    if vendors.is_empty() {
        tracing::warn!("no chat vendor configured; set OPENAI_API_KEY or GROQ_API_KEY");
    }
    let app = router(state).layer(cors_layer(&config.app_url)?);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, app_url = %config.app_url, ?vendors, "relay listening");

    axum::serve(listener, app).await?;

    Ok(())
}
