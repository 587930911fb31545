use std::sync::Arc;
use std::time::Duration;

use gateway_harness::prelude::*;
use gateway_harness::vendors::echo::{EchoConfig, EchoProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HarnessError> {
    let harness = Harness::builder()
        .register_provider(Arc::new(EchoProvider::new(
            EchoConfig::default().word_delay(Duration::from_millis(80)),
        )))
        .build()?;

    let mut run = harness
        .run()
        .message(Message::system("ignored by echo"))
        .message(Message::user("Stream a greeting"))
        .start_stream()
        .await?;

    while let Some(item) = run.next_event().await {
        match item? {
            StreamEvent::Content { delta, .. } => print!("{delta}"),
            StreamEvent::Usage { usage, .. } => {
                println!("\n[{} tokens]", usage.total_tokens);
            }
            StreamEvent::Done { event_id } => println!("[done {event_id}]"),
            StreamEvent::Error { error, .. } => eprintln!("stream error: {error}"),
        }
    }
    Ok(())
}
