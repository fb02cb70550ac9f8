mod classify;
mod cli;
mod config;
mod dashboard;
mod error;
mod invoke;
mod logging;
mod model;
mod parse;
mod projection;
mod reconcile;
mod sanitize;

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
