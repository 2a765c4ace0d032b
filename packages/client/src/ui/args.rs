//! Command line arguments.

use std::time::Duration;

use clap::Parser;

use crate::{
    config::{ClientConfig, DEFAULT_HOST, ReconnectPolicy},
    domain::{RoomName, ValueObjectError},
};

/// Join a Yoriai chat room from the terminal
#[derive(Debug, Clone, Parser)]
#[command(name = "yoriai-client", version, about)]
pub struct Args {
    /// Room name, or a navigation path such as `/lobby/`
    pub room: String,

    /// Server `host[:port]`
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Use https/wss
    #[arg(long)]
    pub secure: bool,

    /// Delay before the first retry after a failed connect (milliseconds)
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub reconnect_initial_ms: u64,

    /// Upper bound for the reconnect delay (milliseconds)
    #[arg(long, default_value_t = 30_000)]
    pub reconnect_max_ms: u64,
}

impl Args {
    /// Resolve the room from the positional argument
    pub fn room_name(&self) -> Result<RoomName, ValueObjectError> {
        RoomName::from_path(&self.room)
    }

    pub fn config(&self) -> ClientConfig {
        let max_ms = self.reconnect_max_ms.max(self.reconnect_initial_ms);
        ClientConfig {
            host: self.host.clone(),
            secure: self.secure,
            reconnect: ReconnectPolicy {
                initial_delay: Duration::from_millis(self.reconnect_initial_ms),
                max_delay: Duration::from_millis(max_ms),
                ..ReconnectPolicy::default()
            },
        }
    }
}
