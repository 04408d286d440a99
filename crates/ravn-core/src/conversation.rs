use ravn_model::Turn;
use uuid::Uuid;

/// Append-only, ordered conversation history.
///
/// The system turn is placed at construction and is always the first turn.
/// Turns are never edited, removed or compacted.
#[derive(Debug, Clone)]
pub struct ConversationState {
    id: String,
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Session id used to correlate log lines.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Ordered copy of the history.  Later appends do not affect it.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn system_prompt(&self) -> &str {
        &self.turns[0].content
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ravn_model::Role;

    use super::*;

    #[test]
    fn starts_with_single_system_turn() {
        let c = ConversationState::new("be helpful");
        assert_eq!(c.len(), 1);
        assert_eq!(c.turns()[0], Turn::system("be helpful"));
        assert_eq!(c.system_prompt(), "be helpful");
    }

    #[test]
    fn snapshot_reflects_appends_in_order() {
        let mut c = ConversationState::new("sys");
        c.append(Turn::user("a"));
        c.append(Turn::assistant("b"));
        c.append(Turn::tool("c"));
        let roles: Vec<Role> = c.snapshot().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
    }

    #[test]
    fn earlier_snapshot_is_unaffected_by_later_appends() {
        let mut c = ConversationState::new("sys");
        c.append(Turn::user("first"));
        let before = c.snapshot();
        c.append(Turn::assistant("second"));
        assert_eq!(before.len(), 2);
        assert_eq!(before.last(), Some(&Turn::user("first")));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn user_then_tool_grows_snapshot_by_two() {
        let mut c = ConversationState::new("sys");
        let n = c.snapshot().len();
        c.append(Turn::user("run it"));
        c.append(Turn::tool("STDOUT:\nok\n"));
        let snap = c.snapshot();
        assert_eq!(snap.len(), n + 2);
        assert_eq!(&snap[n..], &[Turn::user("run it"), Turn::tool("STDOUT:\nok\n")]);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = ConversationState::new("s");
        let b = ConversationState::new("s");
        assert_ne!(a.id(), b.id());
    }
}
