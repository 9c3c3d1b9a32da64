//! `threadclaw run` — Execute one agent run, streaming to stdout.

use std::io::Write;
use std::sync::Arc;

use threadclaw_agent::{
    ChannelObserver, QueueWorker, QueuedContinuation, RunOptions, Runner, TaskQueue,
};
use threadclaw_config::AppConfig;
use threadclaw_core::backend::ChatBackend;
use threadclaw_core::message::ThreadId;
use threadclaw_core::payload::Payload;
use threadclaw_providers::OpenAiCompatBackend;

pub async fn run(
    message: String,
    thread: Option<String>,
    agent: Option<String>,
    detach: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let backend: Arc<dyn ChatBackend> = match OpenAiCompatBackend::from_config(&config.backend) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!();
            eprintln!("  ERROR: {e}");
            eprintln!();
            eprintln!("  Set an API key:");
            eprintln!("    export THREADCLAW_API_KEY='sk-...'");
            eprintln!("    export OPENAI_API_KEY='sk-...'");
            eprintln!();
            eprintln!(
                "  Or add it to: {}",
                AppConfig::config_dir().join("config.toml").display()
            );
            eprintln!();
            return Err("no API key found".into());
        }
    };

    let store = super::build_store(&config);
    let catalog = Arc::new(threadclaw_tools::default_catalog());
    let agent_id = agent.unwrap_or_else(|| config.agent.default_agent.clone());
    let thread_id = thread.map(ThreadId).unwrap_or_else(ThreadId::new);
    eprintln!("  thread: {thread_id}");

    let (queue, queue_rx) = TaskQueue::new();
    let runner = Arc::new(
        Runner::new(backend, catalog, store, config)
            .with_continuation(Arc::new(QueuedContinuation::new(Arc::new(queue)))),
    );
    QueueWorker::spawn(runner.clone(), queue_rx);

    let (observer, mut rx) = ChannelObserver::channel(64);
    let options = RunOptions::new()
        .with_observer(Arc::new(observer))
        .with_detached(detach);

    let handle = tokio::spawn(async move {
        runner.start(&agent_id, thread_id, &message, options).await
    });

    // Payloads keep flowing until the run's last context is dropped, so
    // this loop also covers iterations executed by the queue worker.
    while let Some(payload) = rx.recv().await {
        match &payload {
            Payload::Response(_) => {
                if let Some(text) = payload.nonempty_content() {
                    print!("{text}");
                    std::io::stdout().flush()?;
                }
            }
            Payload::Tool(tool) => {
                println!();
                println!("[tool: {}]", tool.name);
            }
            Payload::End => println!(),
        }
    }

    handle.await??;
    Ok(())
}
