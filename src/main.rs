mod api;
mod composer;
mod config;
mod error;
mod format;
mod gate;
mod join;
mod messages;
mod models;
mod pages;
mod pusher;
mod screen;
mod server;
mod session;

use std::sync::Arc;

use log::{error, info};
use warp::Filter;

use config::Config;
use server::Server;

const LISTEN_PORT: u16 = 3000;

#[tokio::main]
async fn main() {
    // .env first so a RUST_LOG set there reaches the logger.
    let _ = dotenvy::dotenv();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using chat API at {}", config.api_url);

    let server = Arc::new(Server::new(&config));
    let routes = server::routes(server).with(warp::log("live_chat"));

    info!("Chat client starting on port {}...", LISTEN_PORT);
    warp::serve(routes).run(([0, 0, 0, 0], LISTEN_PORT)).await;
}
