use chatwire_types::*;

#[test]
fn happy_path_transitions() {
    let s = SessionStatus::Idle;
    let s = s.on(SessionEvent::Submit).unwrap();
    assert_eq!(s, SessionStatus::Requesting);
    let s = s.on(SessionEvent::FirstChunk).unwrap();
    assert_eq!(s, SessionStatus::Streaming);
    let s = s.on(SessionEvent::Finish).unwrap();
    assert_eq!(s, SessionStatus::Completed);
}

#[test]
fn requesting_can_fail_without_streaming() {
    let s = SessionStatus::Requesting.on(SessionEvent::Fail);
    assert_eq!(s, Some(SessionStatus::Errored));
}

#[test]
fn terminal_states_accept_only_submit() {
    for terminal in [
        SessionStatus::Completed,
        SessionStatus::Errored,
        SessionStatus::Aborted,
    ] {
        assert!(terminal.is_terminal());
        assert_eq!(terminal.on(SessionEvent::Submit), Some(SessionStatus::Requesting));
        assert_eq!(terminal.on(SessionEvent::Abort), None);
        assert_eq!(terminal.on(SessionEvent::Finish), None);
        assert_eq!(terminal.on(SessionEvent::Fail), None);
        assert_eq!(terminal.on(SessionEvent::FirstChunk), None);
    }
}

#[test]
fn active_states_reject_submit() {
    assert_eq!(SessionStatus::Requesting.on(SessionEvent::Submit), None);
    assert_eq!(SessionStatus::Streaming.on(SessionEvent::Submit), None);
}

#[test]
fn idle_rejects_abort() {
    assert_eq!(SessionStatus::Idle.on(SessionEvent::Abort), None);
    assert!(!SessionStatus::Idle.is_active());
    assert!(!SessionStatus::Idle.is_terminal());
}

#[test]
fn streaming_rejects_second_first_chunk() {
    assert_eq!(SessionStatus::Streaming.on(SessionEvent::FirstChunk), None);
}

#[test]
fn status_display() {
    assert_eq!(SessionStatus::Streaming.to_string(), "streaming");
    assert_eq!(SessionStatus::default(), SessionStatus::Idle);
}
