mod client;
mod config;
mod diff;
mod error;
mod logger;
mod protocol;
mod types;

pub use client::{ThermostatClient, ThermostatClientBuilder};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::{LENNOX_URL, MYICOMFORT_URL, Service};
pub use types::*;
