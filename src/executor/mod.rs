pub mod redaction;
pub mod reporting;
pub mod step;
pub mod wait;

pub use reporting::{ReportingCommandExecutor, ReportingFlags};
pub use step::{
    ScreenshotCondition, SleepTiming, StepContext, StepExecutionHelper, StepPhase, StepScope, StepSettings,
};
pub use wait::DriverWait;
