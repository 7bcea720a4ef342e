pub mod actions;
pub mod agent;
pub mod core;
pub mod errors;
pub mod executor;
pub mod reporter;
pub mod reports;
pub mod testing;
pub mod types;
pub mod utils;

pub use actions::{ActionProxy, AddonHelper, CodeblockActions};
pub use agent::{AgentClient, AgentLink, SessionRegistry};
pub use core::{AgentVersion, CommandTransport, SdkConfig};
pub use errors::{Result, SdkError};
pub use executor::{DriverWait, ReportingCommandExecutor, StepSettings};
pub use reporter::{ManualStep, Reporter, ReportingEvents};
pub use types::*;
