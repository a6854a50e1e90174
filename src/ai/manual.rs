use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MAX_MANUAL_HISTORY;
use crate::error::MonitorResult;
use crate::store::{Persisted, ViewStore};

const CONVERSATIONS_KEY: &str = "conversations";

const WELCOME_QUESTION: &str = "Welcome";
const WELCOME_ANSWER: &str = "# Repair manual\n\n\
Ask about maintaining the Feed Mill motor and gearbox.\n\n\
**For example:**\n\
- How do I change the gear oil?\n\
- What are the signs of a failing bearing?\n\
- How do I inspect the motor windings?\n\
- What should I do about high bearing temperature?\n\
- Which preventive checks are due each shift?";

/// One repair-manual question and its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTurn {
    pub question: String,
    /// `None` while the answer is still being fetched.
    pub answer: Option<String>,
}

/// Persisted repair-manual Q&A log, seeded with a welcome entry.
///
/// Like the chat transcript, each question carries a request id and only the
/// answer for the pending id is applied.
pub struct ManualLog {
    entries: Persisted<VecDeque<ManualTurn>>,
    pending: Option<u64>,
    next_request: u64,
}

impl ManualLog {
    pub fn load(store: ViewStore) -> Self {
        let entries = Persisted::load_with(store, CONVERSATIONS_KEY, welcome(), |v| {
            if v.is_empty() {
                *v = welcome();
            }
            // answers still pending from a previous run will never arrive
            for turn in v.iter_mut().filter(|t| t.answer.is_none()) {
                turn.answer = Some("_No answer received._".to_string());
            }
        });
        Self {
            entries,
            pending: None,
            next_request: 0,
        }
    }

    pub fn entries(&self) -> &VecDeque<ManualTurn> {
        self.entries.get()
    }

    /// True while the latest question has no answer yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending
    }

    /// Record a question with no answer under a new request id.
    pub fn ask(&mut self, question: &str) -> MonitorResult<()> {
        self.next_request += 1;
        self.pending = Some(self.next_request);
        let turn = ManualTurn {
            question: question.to_string(),
            answer: None,
        };
        self.entries.update(|v| {
            v.push_back(turn);
            while v.len() > MAX_MANUAL_HISTORY {
                v.pop_front();
            }
        })
    }

    /// Fill in the answer for question `request`. Ignored unless that
    /// question is the pending one.
    pub fn resolve(&mut self, request: u64, answer: &str) -> MonitorResult<()> {
        if self.pending != Some(request) {
            debug!(request, pending = ?self.pending, "dropping stale manual answer");
            return Ok(());
        }
        self.pending = None;
        self.entries.update(|v| {
            if let Some(last) = v.back_mut() {
                last.answer = Some(answer.to_string());
            }
        })
    }

    pub fn fail(&mut self, request: u64, error: &str) -> MonitorResult<()> {
        self.resolve(
            request,
            &format!("**Error:** {}\n\nCheck that the backend is running.", error),
        )
    }

    /// Drop everything and start over from the welcome entry.
    pub fn reset(&mut self) -> MonitorResult<()> {
        self.pending = None;
        self.entries.set(welcome())
    }
}

fn welcome() -> VecDeque<ManualTurn> {
    VecDeque::from([ManualTurn {
        question: WELCOME_QUESTION.to_string(),
        answer: Some(WELCOME_ANSWER.to_string()),
    }])
}
