pub mod addon;
pub mod base;
pub mod codeblock;

pub use addon::AddonHelper;
pub use base::{
    ActionExecutionResponse, ActionProxy, AddonExecutionResponse, ExecutionResultType, ResultField,
};
pub use codeblock::CodeblockActions;
