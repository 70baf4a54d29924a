use mock_server::{AppState, Mautic};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let username = std::env::var("MOCK_MAUTIC_USERNAME").unwrap_or_else(|_| mock_server::USERNAME.to_string());
    let password = std::env::var("MOCK_MAUTIC_PASSWORD").unwrap_or_else(|_| mock_server::PASSWORD.to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock mautic listening");
    mock_server::run_with_state(listener, AppState::new(Mautic::seeded(), &username, &password)).await
}
