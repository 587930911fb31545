//! Fire-and-forget reporting of finished interactions.
//!
//! Storage lives outside the gateway; the harness only hands a record to the
//! configured sink on a spawned task and never waits for it.

use std::sync::Arc;

use tracing::info;

use crate::content::{PromptInput, Usage};
use crate::model::ProviderId;

/// One finished completion, buffered or streamed.
#[derive(Clone, Debug)]
pub struct InteractionRecord {
    pub request_id: uuid::Uuid,
    pub provider: ProviderId,
    pub model: String,
    pub input: PromptInput,
    pub content: String,
    pub usage: Option<Usage>,
    pub streamed: bool,
}

/// Receiver for finished interactions.
#[async_trait::async_trait]
pub trait InteractionSink: Send + Sync {
    async fn record(&self, record: InteractionRecord);
}

/// Default sink: logs a summary line.
pub struct LogInteractionSink;

#[async_trait::async_trait]
impl InteractionSink for LogInteractionSink {
    async fn record(&self, record: InteractionRecord) {
        info!(
            request_id = %record.request_id,
            provider = %record.provider,
            model = %record.model,
            streamed = record.streamed,
            content_chars = record.content.chars().count(),
            total_tokens = record.usage.map(|u| u.total_tokens),
            "interaction finished"
        );
    }
}

pub(crate) fn spawn_record(sink: &Arc<dyn InteractionSink>, record: InteractionRecord) {
    let sink = sink.clone();
    tokio::spawn(async move {
        sink.record(record).await;
    });
}
