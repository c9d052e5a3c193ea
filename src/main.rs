//! Network TSP - Axum Server

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use network_tsp::config::ServerConfig;
use network_tsp::console;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("network_tsp=info".parse().unwrap()))
        .init();

    let config = ServerConfig::parse();
    if let Err(e) = config.validate() {
        ServerConfig::command()
            .error(clap::error::ErrorKind::ValueValidation, e)
            .exit();
    }
    console::print_banner();

    let app = network_tsp::api::create_router(&config);
    let addr = config.socket_addr();
    console::print_listening(addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
