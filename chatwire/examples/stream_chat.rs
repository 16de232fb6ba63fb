//! Streaming example: print an answer as it arrives.
//!
//! Point CHATWIRE_ENDPOINT at a compatible server and run:
//!   cargo run --example stream_chat -p chatwire -- "What changed in Q3?"
//!
//! Set RUST_LOG=chatwire=debug to watch session transitions.

use std::io::Write;
use std::sync::Mutex;

use chatwire::{
    HttpTransport, Message, RenderSink, SessionStatus, StartOutcome, StreamConfig,
    StreamController, StreamError,
};
use tracing_subscriber::EnvFilter;

/// Prints only the text that is new since the last update.
#[derive(Default)]
struct Terminal {
    printed: Mutex<usize>,
}

impl RenderSink for Terminal {
    fn on_message_updated(&self, message: &Message, status: SessionStatus) {
        let mut printed = self.printed.lock().unwrap();
        if message.is_think {
            return;
        }
        if let Some(new_text) = message.content.get(*printed..) {
            print!("{new_text}");
            let _ = std::io::stdout().flush();
        }
        *printed = message.content.len();

        if status.is_terminal() {
            println!();
            if let Some(references) = &message.references {
                for reference in references {
                    println!("  source: {}", reference.source);
                }
            }
        }
    }

    fn on_error(&self, error: &StreamError) {
        eprintln!("\nstream error: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Summarize the latest report.".into());

    let config = StreamConfig::from_env()?;
    let transport = HttpTransport::from_config(&config)?;
    let controller = StreamController::new(transport, config).sink(Terminal::default());

    let body = serde_json::json!({ "query": query });
    match controller.start(body, Default::default()).await {
        StartOutcome::Finished(snapshot) => {
            println!("session {}", snapshot.status);
            if let Some(session_id) = snapshot.message.and_then(|m| m.session_id) {
                println!("server session: {session_id}");
            }
        }
        StartOutcome::Rejected { status } => println!("busy ({status})"),
    }

    Ok(())
}
