mod conversation;
mod manual;

pub use conversation::{Conversation, MessageRole};
pub use manual::ManualLog;
