use log::info;
use mock_server::{AppState, Store};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let cold_start = mock_server::cold_start_delay(std::env::var("COLD_START_MS").ok().as_deref());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr} (cold start {cold_start:?})");
    mock_server::run_with(listener, AppState::new(Store::seeded()).with_cold_start(cold_start)).await
}
