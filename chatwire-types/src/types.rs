//! Core message, delta and session-state types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed ID wrappers keep message ids and server session ids apart.
/// Both are plain strings underneath.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(MessageId, "Identifier of a message in the conversation view.");
typed_id!(
    SessionId,
    "Server-side conversation identifier echoed back in `sessionId`."
);

impl MessageId {
    /// Generate a fresh random (UUID v4) message id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user.
    User,
    /// The streaming assistant.
    Assistant,
}

/// A source reference attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    /// Where the referenced passage came from (document name, URL, ...).
    pub source: String,
    /// The referenced passage. Empty when the server omits it.
    #[serde(default)]
    pub content: String,
}

impl ReferenceItem {
    /// Create a reference with the given source and content.
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// The structured increment decoded from one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Text to append to the message content.
    pub text_chunk: String,
    /// Whether the server marked this as the final event of the answer.
    pub is_end: bool,
    /// Replacement reference list. `None` leaves the stored list untouched.
    pub references: Option<Vec<ReferenceItem>>,
    /// Server session id, when the event carried one.
    pub session_id: Option<SessionId>,
}

impl Delta {
    /// A plain text delta.
    pub fn text(chunk: impl Into<String>) -> Self {
        Self {
            text_chunk: chunk.into(),
            ..Default::default()
        }
    }

    /// Mark this delta as the final one.
    #[must_use]
    pub fn end(mut self) -> Self {
        self.is_end = true;
        self
    }

    /// Attach a replacement reference list.
    #[must_use]
    pub fn with_references(mut self, references: Vec<ReferenceItem>) -> Self {
        self.references = Some(references);
        self
    }
}

/// A message in the conversation view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier used to route deltas to this message.
    pub id: MessageId,
    /// The role of the message author.
    pub role: Role,
    /// Accumulated text content.
    pub content: String,
    /// True until the first delta arrives.
    pub is_think: bool,
    /// True once the answer finished (end flag, end of stream, or early stop).
    pub is_complete: bool,
    /// True when the session failed; partial content is kept.
    pub is_error: bool,
    /// Latest reference list, if the server sent one.
    pub references: Option<Vec<ReferenceItem>>,
    /// Latest server session id, if the server sent one.
    pub session_id: Option<SessionId>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a completed user message.
    ///
    /// # Example
    ///
    /// ```
    /// use chatwire_types::{Message, Role};
    /// let msg = Message::user("What changed in Q3?");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(msg.is_complete);
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: text.into(),
            is_think: false,
            is_complete: true,
            is_error: false,
            references: None,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create the empty assistant placeholder shown while a request is in
    /// flight. It starts in the thinking state.
    pub fn assistant_pending(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            is_think: true,
            is_complete: false,
            is_error: false,
            references: None,
            session_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Status of one streaming session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No session has run yet.
    #[default]
    Idle,
    /// The request was issued; no body bytes have arrived.
    Requesting,
    /// At least one chunk has been read.
    Streaming,
    /// The answer ended normally (or was stopped early on request).
    Completed,
    /// A fatal error ended the session.
    Errored,
    /// The caller aborted the session.
    Aborted,
}

/// Inputs to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request is being issued.
    Submit,
    /// The first chunk of the body was read.
    FirstChunk,
    /// The answer ended (end flag, end of stream, or early stop).
    Finish,
    /// A fatal error occurred.
    Fail,
    /// The caller aborted.
    Abort,
}

impl SessionStatus {
    /// Apply `event` to this status. Returns `None` when the transition is
    /// not allowed, in which case the status must stay unchanged.
    #[must_use]
    pub fn on(self, event: SessionEvent) -> Option<SessionStatus> {
        use SessionEvent as E;
        use SessionStatus as S;

        match (self, event) {
            (S::Idle | S::Completed | S::Errored | S::Aborted, E::Submit) => Some(S::Requesting),
            (S::Requesting, E::FirstChunk) => Some(S::Streaming),
            (S::Requesting | S::Streaming, E::Finish) => Some(S::Completed),
            (S::Requesting | S::Streaming, E::Fail) => Some(S::Errored),
            (S::Requesting | S::Streaming, E::Abort) => Some(S::Aborted),
            _ => None,
        }
    }

    /// Whether a session is currently in flight.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Requesting | Self::Streaming)
    }

    /// Whether this is an end state of a session.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Aborted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A point-in-time view of a controller, handed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Current session status.
    pub status: SessionStatus,
    /// The in-flight (or last) assistant message, if any session ran.
    pub message: Option<Message>,
}
