//! `threadclaw history` — Print a thread's messages in order.

use threadclaw_config::AppConfig;
use threadclaw_core::message::{Message, ThreadId};

pub async fn run(thread_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = super::build_store(&config);

    let messages = store.get(&ThreadId::from(&thread_id)).await?;
    if messages.is_empty() {
        println!("  (no messages in thread '{thread_id}')");
        return Ok(());
    }

    for message in &messages {
        println!("{:>9} | {}", message.role.as_str(), render(message));
    }

    Ok(())
}

fn render(message: &Message) -> String {
    if message.has_tool_calls() {
        let calls: Vec<&str> = message
            .tool_calls
            .iter()
            .map(|tc| tc.name.as_str())
            .collect();
        return format!("[calls: {}]", calls.join(", "));
    }
    message.text().unwrap_or_default().replace('\n', " ")
}
