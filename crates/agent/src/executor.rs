//! Tool execution for a single loop iteration.
//!
//! History ordering is the contract here: the assistant tool-invocation
//! message is appended and persisted before anything runs, and each
//! result lands immediately after its call. A tool that fails during
//! execution produces a textual error result and the run continues; an
//! unknown tool name aborts the batch with no result appended.

use std::sync::Arc;
use std::time::Instant;

use threadclaw_core::error::{Result, ToolError};
use threadclaw_core::message::{Message, MessageToolCall};
use threadclaw_core::store::ThreadStore;
use threadclaw_core::tool::{ToolCall, ToolCatalog, ToolContext, ToolResult};
use threadclaw_core::RunContext;
use tracing::{debug, warn};

/// Executes assembled tool calls against the catalog, recording every
/// step in thread history.
pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
    store: Arc<dyn ThreadStore>,
}

impl ToolExecutor {
    pub fn new(catalog: Arc<ToolCatalog>, store: Arc<dyn ThreadStore>) -> Self {
        Self { catalog, store }
    }

    /// Run one batch of calls in order.
    ///
    /// Appends the assistant tool-invocation message first, then executes
    /// each call and appends its result. Every append is persisted before
    /// the next step runs.
    pub async fn run_batch(&self, ctx: &mut RunContext, calls: &[ToolCall]) -> Result<()> {
        let invocations: Vec<MessageToolCall> = calls
            .iter()
            .map(|call| MessageToolCall {
                id: call.call_id.clone(),
                name: call.name.clone(),
                arguments: call.arguments_json(),
            })
            .collect();
        ctx.push(Message::tool_invocation(invocations));
        self.persist(ctx).await?;

        for call in calls {
            let result = self.run_call(ctx, call).await?;
            ctx.push(Message::tool_result(&result.call_id, &result.content));
            self.persist(ctx).await?;
        }
        Ok(())
    }

    /// Resolve and execute one call. Execution failures are folded into
    /// the result content; an unresolvable name propagates.
    async fn run_call(&self, ctx: &RunContext, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .catalog
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let tool_cx = ToolContext {
            thread_id: ctx.thread_id().clone(),
            call_id: call.call_id.clone(),
            privileged: ctx.privileged(),
        };

        let started = Instant::now();
        let content = match tool.execute(call.arguments.clone(), &tool_cx).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
        };
        debug!(
            tool = %call.name,
            call_id = %call.call_id,
            duration_ms = started.elapsed().as_millis() as u64,
            "Tool executed"
        );

        Ok(ToolResult {
            call_id: call.call_id.clone(),
            content,
        })
    }

    async fn persist(&self, ctx: &RunContext) -> Result<()> {
        self.store.put(ctx.thread_id(), ctx.history()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use threadclaw_core::message::{Role, ThreadId};
    use threadclaw_core::tool::Tool;
    use threadclaw_store::MemoryThreadStore;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes its arguments"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            arguments: Value,
            _cx: &ToolContext,
        ) -> std::result::Result<String, ToolError> {
            Ok(arguments.to_string())
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _arguments: Value,
            _cx: &ToolContext,
        ) -> std::result::Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool: "broken".to_string(),
                reason: "boom".to_string(),
            })
        }
    }

    struct ContextProbe {
        seen: Mutex<Option<ToolContext>>,
    }

    #[async_trait]
    impl Tool for ContextProbe {
        fn name(&self) -> &str {
            "probe"
        }
        fn description(&self) -> &str {
            "Records its execution context"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn execute(
            &self,
            _arguments: Value,
            cx: &ToolContext,
        ) -> std::result::Result<String, ToolError> {
            *self.seen.lock().unwrap() = Some(cx.clone());
            Ok("ok".to_string())
        }
    }

    fn executor_with(tools: Vec<Box<dyn Tool>>) -> (ToolExecutor, Arc<MemoryThreadStore>) {
        let mut catalog = ToolCatalog::new();
        for tool in tools {
            catalog.register(tool);
        }
        let store = Arc::new(MemoryThreadStore::new());
        (
            ToolExecutor::new(Arc::new(catalog), store.clone()),
            store,
        )
    }

    fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            call_id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn batch_appends_invocation_then_results() {
        let (executor, store) = executor_with(vec![Box::new(EchoTool)]);
        let mut ctx = RunContext::new(ThreadId::from("t1"));

        executor
            .run_batch(
                &mut ctx,
                &[
                    call("c1", "echo", json!({"a": 1})),
                    call("c2", "echo", json!({"b": 2})),
                ],
            )
            .await
            .unwrap();

        let history = ctx.history();
        assert_eq!(history.len(), 3);
        assert!(history[0].has_tool_calls());
        assert_eq!(history[0].tool_calls.len(), 2);
        assert_eq!(history[1].role, Role::Tool);
        assert_eq!(history[1].tool_call_id.as_deref(), Some("c1"));
        assert_eq!(history[1].text(), Some("{\"a\":1}"));
        assert_eq!(history[2].tool_call_id.as_deref(), Some("c2"));

        let persisted = store.get(&ThreadId::from("t1")).await.unwrap();
        assert_eq!(persisted.len(), 3);
    }

    #[tokio::test]
    async fn unknown_tool_aborts_with_no_result() {
        let (executor, store) = executor_with(vec![Box::new(EchoTool)]);
        let mut ctx = RunContext::new(ThreadId::from("t1"));

        let err = executor
            .run_batch(&mut ctx, &[call("c1", "ghost", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            threadclaw_core::error::Error::Tool(ToolError::UnknownTool(name)) if name == "ghost"
        ));

        // Invocation persisted, no result after it.
        let persisted = store.get(&ThreadId::from("t1")).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].has_tool_calls());
    }

    #[tokio::test]
    async fn earlier_results_survive_a_mid_batch_abort() {
        let (executor, store) = executor_with(vec![Box::new(EchoTool)]);
        let mut ctx = RunContext::new(ThreadId::from("t1"));

        let result = executor
            .run_batch(
                &mut ctx,
                &[
                    call("c1", "echo", json!({})),
                    call("c2", "ghost", json!({})),
                ],
            )
            .await;
        assert!(result.is_err());

        let persisted = store.get(&ThreadId::from("t1")).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn failing_tool_becomes_a_textual_error_result() {
        let (executor, _store) = executor_with(vec![Box::new(BrokenTool)]);
        let mut ctx = RunContext::new(ThreadId::from("t1"));

        executor
            .run_batch(&mut ctx, &[call("c1", "broken", json!({}))])
            .await
            .unwrap();

        let history = ctx.history();
        assert_eq!(history.len(), 2);
        let result_text = history[1].text().unwrap();
        assert!(result_text.starts_with("Error:"));
        assert!(result_text.contains("boom"));
    }

    #[tokio::test]
    async fn execution_context_carries_thread_call_and_privilege() {
        let probe = Arc::new(ContextProbe {
            seen: Mutex::new(None),
        });
        let mut catalog = ToolCatalog::new();
        struct Shared(Arc<ContextProbe>);
        #[async_trait]
        impl Tool for Shared {
            fn name(&self) -> &str {
                self.0.name()
            }
            fn description(&self) -> &str {
                self.0.description()
            }
            fn parameters_schema(&self) -> Value {
                self.0.parameters_schema()
            }
            async fn execute(
                &self,
                arguments: Value,
                cx: &ToolContext,
            ) -> std::result::Result<String, ToolError> {
                self.0.execute(arguments, cx).await
            }
        }
        catalog.register(Box::new(Shared(probe.clone())));
        let executor = ToolExecutor::new(Arc::new(catalog), Arc::new(MemoryThreadStore::new()));

        let mut ctx = RunContext::new(ThreadId::from("t9")).with_privileged(true);
        executor
            .run_batch(&mut ctx, &[call("c7", "probe", json!({}))])
            .await
            .unwrap();

        let seen = probe.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.thread_id.as_str(), "t9");
        assert_eq!(seen.call_id, "c7");
        assert!(seen.privileged);
    }
}
