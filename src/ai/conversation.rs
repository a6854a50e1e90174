use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MonitorResult;
use crate::store::{Persisted, ViewStore};

const TRANSCRIPT_KEY: &str = "transcript";

/// Role in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single turn in the maintenance chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    /// Markdown for assistant turns, plain text for user turns.
    pub content: String,
    /// Backend tools the orchestrator invoked for this answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_used: Option<Vec<String>>,
}

impl ChatTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: MessageRole::User,
            content: content.to_string(),
            tools_used: None,
        }
    }

    pub fn assistant(content: &str, tools_used: Vec<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.to_string(),
            tools_used: (!tools_used.is_empty()).then_some(tools_used),
        }
    }
}

/// Persisted chat transcript with a rolling window.
///
/// Every mutation writes the whole transcript back to the `chat` namespace.
/// Each outgoing message gets a request id; a reply is only applied while
/// its id is the pending one.
pub struct Conversation {
    turns: Persisted<VecDeque<ChatTurn>>,
    max_history: usize,
    /// Request id of the message still waiting for a reply.
    pending: Option<u64>,
    next_request: u64,
}

impl Conversation {
    pub fn load(store: ViewStore, max_history: usize) -> Self {
        Self {
            turns: Persisted::load_with(store, TRANSCRIPT_KEY, VecDeque::new(), |t| {
                trim(t, max_history)
            }),
            max_history,
            pending: None,
            next_request: 0,
        }
    }

    pub fn turns(&self) -> &VecDeque<ChatTurn> {
        self.turns.get()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.get().is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending
    }

    /// Record an outgoing message and mark the conversation as waiting on a
    /// new request id (see [`pending_request`](Self::pending_request)).
    pub fn add_user_message(&mut self, content: &str) -> MonitorResult<()> {
        self.next_request += 1;
        self.pending = Some(self.next_request);
        self.push(ChatTurn::user(content))
    }

    pub fn add_assistant_message(
        &mut self,
        request: u64,
        content: &str,
        tools_used: Vec<String>,
    ) -> MonitorResult<()> {
        if !self.take_pending(request) {
            return Ok(());
        }
        self.push(ChatTurn::assistant(content, tools_used))
    }

    /// A failed send shows up as an assistant turn so the user sees it inline.
    pub fn add_error(&mut self, request: u64, error: &str) -> MonitorResult<()> {
        if !self.take_pending(request) {
            return Ok(());
        }
        self.push(ChatTurn::assistant(
            &format!("**Error:** {}\n\nCheck that the backend is running.", error),
            Vec::new(),
        ))
    }

    /// Empty the transcript. A reply still in flight is dropped when it lands.
    pub fn clear(&mut self) -> MonitorResult<()> {
        self.pending = None;
        self.turns.set(VecDeque::new())
    }

    fn take_pending(&mut self, request: u64) -> bool {
        if self.pending != Some(request) {
            debug!(request, pending = ?self.pending, "dropping stale chat reply");
            return false;
        }
        self.pending = None;
        true
    }

    fn push(&mut self, turn: ChatTurn) -> MonitorResult<()> {
        let max = self.max_history;
        self.turns.update(|t| {
            t.push_back(turn);
            trim(t, max);
        })
    }
}

fn trim(turns: &mut VecDeque<ChatTurn>, max: usize) {
    while turns.len() > max {
        turns.pop_front();
    }
}
