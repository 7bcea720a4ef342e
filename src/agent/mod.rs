pub mod client;
pub mod link;
pub mod queue;
pub mod registry;
pub mod session;
pub mod socket;

pub use client::{AgentClient, AgentStatusResponse, Endpoint};
pub use link::AgentLink;
pub use queue::{HttpReportSender, QueueItem, ReportQueue, ReportSender};
pub use registry::SessionRegistry;
pub use session::{AgentSession, SessionRequest, SessionResponse};
pub use socket::LivenessSocket;
