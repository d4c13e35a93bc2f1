//! Console harness: reads `<sender> <text>` or `<sender> !ACTION` lines from
//! stdin and prints every outbound message. Each sender is its own conversation.
//!
//! ```text
//! 42 !START
//! 42 !BUY_PRODUCT_PRD001
//! 42 Budi
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use shop_assistant::app_system::{setup_tracing, ShopSystem};
use shop_assistant::config::AppConfig;
use shop_assistant::domain::{Action, ButtonTarget, InboundEvent, OutboundMessage};
use shop_assistant::error::TransportError;
use shop_assistant::notify::Transport;

struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(
        &self,
        conversation_id: &str,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        println!("[to {conversation_id}] {}", message.text);
        for button in message.buttons {
            match button.target {
                ButtonTarget::Action(action) => println!("    [{}] !{action}", button.label),
                ButtonTarget::Url(url) => println!("    [{}] {url}", button.label),
            }
        }
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<InboundEvent> {
    let (sender, rest) = line.trim().split_once(' ')?;
    let rest = rest.trim();
    if let Some(raw) = rest.strip_prefix('!') {
        match raw.parse::<Action>() {
            Ok(action) => return Some(InboundEvent::action(sender, sender, action)),
            Err(e) => {
                warn!(error = %e, "Ignoring line");
                return None;
            }
        }
    }
    Some(InboundEvent::text(sender, sender, rest))
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = AppConfig::from_env().map_err(|e| e.to_string())?;
    info!("Starting shop bot console");

    let system = ShopSystem::new(config, Arc::new(ConsoleTransport));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(event) = parse_line(&line) else {
            warn!(line = %line, "Expected `<sender> <text>` or `<sender> !ACTION`");
            continue;
        };
        match system.client.dispatch(event).await {
            Ok(op) => debug!(op = op.name(), "Turn complete"),
            Err(e) => error!(error = %e, "Turn failed"),
        }
    }

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Shop bot stopped");
    Ok(())
}
