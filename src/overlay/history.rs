//! Chat history for the open chat view: the last N turns, oldest first.

use crate::bounded::BoundedQueue;
use crate::services::chat::ChatTurn;

#[derive(Debug, Clone)]
pub struct ChatHistory {
    turns: BoundedQueue<ChatTurn>,
}

impl ChatHistory {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(limit: usize) -> Self {
        Self {
            turns: BoundedQueue::new(limit),
        }
    }

    pub fn push(&mut self, turn: ChatTurn) {
        if self.turns.push_back(turn).is_some() {
            log::debug!("[CHAT] History full, oldest turn dropped");
        }
    }

    pub fn turns(&self) -> Vec<ChatTurn> {
        self.turns.to_vec()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}
