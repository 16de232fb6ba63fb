//! Folding deltas into the in-flight assistant message.

use chatwire_types::{Delta, Message, MessageId};

/// Holds the single message currently being streamed into.
///
/// Deltas addressed to another id, or arriving after the message was
/// sealed, are dropped without error. That is what keeps a late chunk from
/// an aborted request away from the next answer.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    target: Option<Message>,
    sealed: bool,
}

impl MessageAssembler {
    /// Create an assembler with no target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new target message, replacing any previous one.
    pub fn begin(&mut self, message: Message) {
        self.target = Some(message);
        self.sealed = false;
    }

    /// Apply `delta` to the target if it is `id` and still open.
    ///
    /// Returns the updated message, or `None` when the delta was dropped.
    pub fn apply(&mut self, id: &MessageId, delta: Delta) -> Option<&Message> {
        if self.sealed {
            return None;
        }
        let message = self.target.as_mut().filter(|m| &m.id == id)?;

        message.is_think = false;
        message.content.push_str(&delta.text_chunk);
        if let Some(references) = delta.references {
            message.references = Some(references);
        }
        if let Some(session_id) = delta.session_id {
            message.session_id = Some(session_id);
        }
        if delta.is_end {
            message.is_complete = true;
            self.sealed = true;
        }
        Some(&*message)
    }

    /// Seal the target as complete (end of stream or early stop).
    pub fn finish(&mut self) -> Option<&Message> {
        self.seal(|m| m.is_complete = true)
    }

    /// Seal the target as failed, keeping its partial content.
    pub fn fail(&mut self) -> Option<&Message> {
        self.seal(|m| m.is_error = true)
    }

    /// Seal the target without marking it complete or failed.
    pub fn abandon(&mut self) -> Option<&Message> {
        self.seal(|_| {})
    }

    /// Whether the target stopped accepting deltas.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The current target, if any.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        self.target.as_ref()
    }

    fn seal(&mut self, mark: impl FnOnce(&mut Message)) -> Option<&Message> {
        if self.sealed {
            return None;
        }
        let message = self.target.as_mut()?;
        message.is_think = false;
        mark(&mut *message);
        self.sealed = true;
        Some(&*message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_types::{ReferenceItem, SessionId};

    fn assembler_with(id: &str) -> (MessageAssembler, MessageId) {
        let id = MessageId::new(id);
        let mut assembler = MessageAssembler::new();
        assembler.begin(Message::assistant_pending(id.clone()));
        (assembler, id)
    }

    #[test]
    fn first_delta_clears_thinking() {
        let (mut asm, id) = assembler_with("m");
        assert!(asm.message().unwrap().is_think);
        let msg = asm.apply(&id, Delta::text("")).unwrap();
        assert!(!msg.is_think);
    }

    #[test]
    fn content_is_appended() {
        let (mut asm, id) = assembler_with("m");
        asm.apply(&id, Delta::text("He"));
        let msg = asm.apply(&id, Delta::text("llo")).unwrap();
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn null_references_keep_previous_list() {
        let (mut asm, id) = assembler_with("m");
        asm.apply(
            &id,
            Delta::text("a").with_references(vec![ReferenceItem::new("x", "")]),
        );
        let msg = asm.apply(&id, Delta::text("b")).unwrap();
        assert_eq!(msg.content, "ab");
        assert_eq!(msg.references, Some(vec![ReferenceItem::new("x", "")]));
    }

    #[test]
    fn later_references_replace_earlier_ones() {
        let (mut asm, id) = assembler_with("m");
        asm.apply(
            &id,
            Delta::text("").with_references(vec![
                ReferenceItem::new("x", ""),
                ReferenceItem::new("y", ""),
            ]),
        );
        let msg = asm
            .apply(&id, Delta::text("").with_references(vec![ReferenceItem::new("z", "")]))
            .unwrap();
        assert_eq!(msg.references, Some(vec![ReferenceItem::new("z", "")]));
    }

    #[test]
    fn session_id_is_recorded() {
        let (mut asm, id) = assembler_with("m");
        let mut delta = Delta::text("a");
        delta.session_id = Some(SessionId::new("s-1"));
        asm.apply(&id, delta);
        let msg = asm.apply(&id, Delta::text("b")).unwrap();
        assert_eq!(msg.session_id, Some(SessionId::new("s-1")));
    }

    #[test]
    fn end_seals_the_message() {
        let (mut asm, id) = assembler_with("m");
        let msg = asm.apply(&id, Delta::text("done").end()).unwrap();
        assert!(msg.is_complete);
        assert!(asm.is_sealed());

        assert!(asm.apply(&id, Delta::text(" more")).is_none());
        assert_eq!(asm.message().unwrap().content, "done");
    }

    #[test]
    fn unknown_id_is_dropped() {
        let (mut asm, _) = assembler_with("m");
        assert!(asm.apply(&MessageId::new("stale"), Delta::text("x")).is_none());
        let msg = asm.message().unwrap();
        assert!(msg.content.is_empty());
        assert!(msg.is_think);
    }

    #[test]
    fn no_target_drops_everything() {
        let mut asm = MessageAssembler::new();
        assert!(asm.apply(&MessageId::new("m"), Delta::text("x")).is_none());
        assert!(asm.finish().is_none());
    }

    #[test]
    fn fail_keeps_partial_content() {
        let (mut asm, id) = assembler_with("m");
        asm.apply(&id, Delta::text("partial"));
        let msg = asm.fail().unwrap();
        assert!(msg.is_error);
        assert!(!msg.is_complete);
        assert_eq!(msg.content, "partial");
        assert!(asm.apply(&id, Delta::text("x")).is_none());
    }

    #[test]
    fn abandon_while_thinking_stops_thinking() {
        let (mut asm, _) = assembler_with("m");
        let msg = asm.abandon().unwrap();
        assert!(!msg.is_think);
        assert!(!msg.is_complete);
        assert!(!msg.is_error);
    }

    #[test]
    fn seal_happens_once() {
        let (mut asm, id) = assembler_with("m");
        asm.apply(&id, Delta::text("x").end());
        assert!(asm.finish().is_none());
        assert!(asm.fail().is_none());
        assert!(!asm.message().unwrap().is_error);
    }

    #[test]
    fn begin_reopens_with_new_target() {
        let (mut asm, id) = assembler_with("m1");
        asm.apply(&id, Delta::text("old").end());
        let next = MessageId::new("m2");
        asm.begin(Message::assistant_pending(next.clone()));
        assert!(asm.apply(&id, Delta::text("late")).is_none());
        let msg = asm.apply(&next, Delta::text("new")).unwrap();
        assert_eq!(msg.content, "new");
    }
}
