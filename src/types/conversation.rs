//! Append-only conversation history.

use serde::{Deserialize, Serialize};

use super::turn::Turn;

/// Ordered turns, oldest first.
///
/// This is the only copy of the history. Presentation layers that list the
/// newest turn first use [`Conversation::newest_first`] instead of keeping a
/// reversed copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation opened by an agent greeting.
    pub fn seeded(greeting: Option<&str>) -> Self {
        let mut conversation = Self::new();
        if let Some(text) = greeting {
            conversation.push(Turn::agent(text));
        }
        conversation
    }

    /// Append a turn. Turns are never edited or removed.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Display order: most recent turn first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.turns.iter().rev()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
