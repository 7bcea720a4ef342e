pub mod config;
pub mod transport;
pub mod version;

pub use config::{SdkConfig, TokenPolicy};
pub use transport::{CommandResponse, CommandTransport, DriverCommand};
pub use version::AgentVersion;
