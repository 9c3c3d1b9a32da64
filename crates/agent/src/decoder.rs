//! Stream decoder: raw chunk fragments in, payload events out.
//!
//! Backends forward wire chunks verbatim; this is where they are
//! interpreted. Content deltas become [`ResponsePayload`] events. Tool-call
//! deltas are accumulated per call id and emit nothing until the stream
//! freezes, at which point the assembled calls surface as a single
//! [`DecodeEvent::ToolCallsReady`] and the remaining fragments are left
//! unread.
//!
//! The decoder is single-pass against the backend: every wire fragment is
//! ingested exactly once. Fragments are buffered as they arrive, so
//! [`StreamDecoder::rewind`] can replay the content sequence without
//! touching the backend again.

use threadclaw_core::backend::{ChunkFragment, FragmentStream, ToolCallFragment};
use threadclaw_core::error::{Result, ToolError};
use threadclaw_core::payload::ResponsePayload;
use threadclaw_core::tool::ToolCall;
use tracing::{debug, trace};

/// One decoded step of the stream.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    /// A content-bearing fragment, mapped to a response payload.
    Content(ResponsePayload),

    /// The stream froze on a tool-invocation finish; these are the
    /// assembled calls, one per distinct call id, in order of first
    /// appearance.
    ToolCallsReady(Vec<ToolCall>),
}

/// In-flight tool call being assembled from argument fragments.
#[derive(Debug)]
struct PendingToolCall {
    call_id: String,
    name: String,
    buffer: String,
}

/// Accumulates tool-call fragments keyed by call id.
///
/// Fragments without an id continue the most recently seen call, which is
/// how OpenAI-compatible backends stream argument chunks.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    entries: Vec<PendingToolCall>,
    last_call_id: Option<String>,
}

impl ToolCallAccumulator {
    fn ingest(&mut self, fragment: &ToolCallFragment) {
        let call_id = match fragment.call_id.clone().or_else(|| self.last_call_id.clone()) {
            Some(id) => id,
            None => {
                trace!("Dropping tool-call fragment with no call id to attach to");
                return;
            }
        };

        match self.entries.iter_mut().find(|e| e.call_id == call_id) {
            Some(entry) => {
                if entry.name.is_empty() {
                    if let Some(name) = &fragment.name {
                        entry.name = name.clone();
                    }
                }
                entry.buffer.push_str(&fragment.arguments);
            }
            None => self.entries.push(PendingToolCall {
                call_id: call_id.clone(),
                name: fragment.name.clone().unwrap_or_default(),
                buffer: fragment.arguments.clone(),
            }),
        }
        self.last_call_id = Some(call_id);
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every buffered argument string. An empty buffer decodes to an
    /// empty object; anything else must parse as a JSON object.
    fn assemble(self) -> std::result::Result<Vec<ToolCall>, ToolError> {
        self.entries
            .into_iter()
            .map(|e| ToolCall::from_buffer(&e.call_id, &e.name, &e.buffer))
            .collect()
    }
}

/// Decodes a [`FragmentStream`] into payload events.
#[derive(Debug)]
pub struct StreamDecoder {
    rx: Option<FragmentStream>,
    replay: Vec<ChunkFragment>,
    cursor: usize,
    accumulator: ToolCallAccumulator,
    frozen: bool,
}

impl StreamDecoder {
    pub fn new(rx: FragmentStream) -> Self {
        Self {
            rx: Some(rx),
            replay: Vec::new(),
            cursor: 0,
            accumulator: ToolCallAccumulator::default(),
            frozen: false,
        }
    }

    /// Whether the stream froze on a tool-invocation finish.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Restart iteration from the first buffered fragment.
    ///
    /// Replay serves content events only; tool calls are assembled once and
    /// are not re-emitted. Fragments past a freeze point were never read
    /// and stay unread.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Advance to the next decoded event, or `None` at end of stream.
    ///
    /// Backend errors on the stream and undecodable argument buffers
    /// surface as errors; both abort the enclosing run.
    pub async fn next_event(&mut self) -> Result<Option<DecodeEvent>> {
        loop {
            // Serve buffered fragments first. These were already ingested,
            // so only their content is re-emitted.
            if self.cursor < self.replay.len() {
                let fragment = self.replay[self.cursor].clone();
                self.cursor += 1;
                if let Some(event) = replayed_content(&fragment) {
                    return Ok(Some(event));
                }
                continue;
            }

            if self.frozen {
                return Ok(None);
            }

            let Some(rx) = self.rx.as_mut() else {
                return Ok(None);
            };
            match rx.recv().await {
                None => {
                    self.rx = None;
                    return Ok(None);
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(fragment)) => {
                    self.replay.push(fragment.clone());
                    self.cursor = self.replay.len();
                    if let Some(event) = self.ingest(&fragment)? {
                        return Ok(Some(event));
                    }
                }
            }
        }
    }

    /// Interpret one live fragment.
    fn ingest(&mut self, fragment: &ChunkFragment) -> Result<Option<DecodeEvent>> {
        let Some(delta) = &fragment.delta else {
            // Usage trailers and keep-alives carry no delta.
            return Ok(None);
        };

        for tc in &delta.tool_calls {
            self.accumulator.ingest(tc);
        }

        if let Some(reason) = fragment.finish_reason.as_deref() {
            if reason == "tool_calls" || (reason == "stop" && !self.accumulator.is_empty()) {
                self.frozen = true;
                let calls = std::mem::take(&mut self.accumulator).assemble()?;
                debug!(calls = calls.len(), finish = reason, "Stream froze on tool calls");
                return Ok(Some(DecodeEvent::ToolCallsReady(calls)));
            }
        }

        if delta.tool_calls.is_empty() && delta.content.is_some() {
            return Ok(Some(DecodeEvent::Content(ResponsePayload {
                content: delta.content.clone(),
                role: delta.role.clone(),
                choice_index: fragment.choice_index,
                usage: fragment.usage.clone(),
            })));
        }

        Ok(None)
    }
}

fn replayed_content(fragment: &ChunkFragment) -> Option<DecodeEvent> {
    let delta = fragment.delta.as_ref()?;
    if !delta.tool_calls.is_empty() || delta.content.is_none() {
        return None;
    }
    Some(DecodeEvent::Content(ResponsePayload {
        content: delta.content.clone(),
        role: delta.role.clone(),
        choice_index: fragment.choice_index,
        usage: fragment.usage.clone(),
    }))
}
