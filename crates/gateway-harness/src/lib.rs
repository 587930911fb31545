//! Provider harness for the completion gateway.
//!
//! Backends implement [`ProviderAdapter`]; the [`Harness`] registry resolves
//! them by name, and [`RunBuilder`] drives either a buffered completion or a
//! stream of canonical [`StreamEvent`]s. Every provider failure is reduced to
//! one [`ErrorCode`] by the taxonomy before it leaves the crate.
//!
//! Vendor-specific APIs are namespaced under `vendors::*`.
//!
//! # Streaming from the echo provider
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gateway_harness::prelude::*;
//! use gateway_harness::vendors::echo::EchoProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let harness = Harness::builder()
//!     .register_provider(Arc::new(EchoProvider::default()))
//!     .build()?;
//!
//! let mut run = harness.run().prompt("Hello world").start_stream().await?;
//! while let Some(item) = run.next_event().await {
//!     if let StreamEvent::Content { delta, .. } = item? {
//!         print!("{delta}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Cancellation handle and signal shared by the orchestrator and providers.
pub mod cancel;
/// Messages, prompt input, usage and buffered responses.
pub mod content;
/// Provider errors, the taxonomy codes and the public harness error.
pub mod errors;
/// Provider registry and builder.
pub mod harness;
/// Provider ids, generation params and event ids.
pub mod model;
/// Fire-and-forget interaction reporting.
pub mod persist;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contract.
pub mod provider;
/// Credential scrubbing for messages that leave the process.
pub mod redact;
/// Run builder and streaming handle.
pub mod run;
/// Canonical stream events.
pub mod stream;
/// Error taxonomy mapper.
pub mod taxonomy;
/// Vendor-specific integrations.
pub mod vendors;

pub use cancel::{AbortHandle, AbortSignal};
pub use content::{CompletionResponse, Message, PromptInput, Role, Usage};
pub use errors::{ErrorCode, HarnessError, ProviderError, StreamError};
pub use harness::{Harness, HarnessBuilder, ProviderInfo};
pub use model::{EventIdGenerator, GenerationParams, ProviderId};
pub use persist::{InteractionRecord, InteractionSink, LogInteractionSink};
pub use provider::{
    ProviderAdapter, ProviderEventStream, ProviderRequest, ProviderResponseMeta,
    ProviderStreamHandle,
};
pub use run::{RunBuilder, RunItem, RunStream, StreamSummary};
pub use stream::StreamEvent;
