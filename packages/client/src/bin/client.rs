//! Terminal chat room client.
//!
//! Loads the room history, then shows live messages and sends each line typed
//! at the prompt.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin yoriai-client -- lobby --host 127.0.0.1:8000
//! ```

use clap::Parser;
use yoriai_client::ui::Args;
use yoriai_shared::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = yoriai_client::run_client(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
