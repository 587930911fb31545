//! Common imports for typical harness usage.
pub use crate::{
    AbortHandle, CompletionResponse, ErrorCode, Harness, HarnessBuilder, HarnessError, Message,
    PromptInput, ProviderId, RunBuilder, RunStream, StreamError, StreamEvent, StreamSummary, Usage,
};
