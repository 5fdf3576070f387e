use super::*;
use folio_core::conversation::Sender;
use std::time::Duration;

fn orchestrator() -> Orchestrator {
    Orchestrator::new(RevealEngine::with_fixed_delay(Duration::ZERO))
}

fn resume() -> UploadFile {
    UploadFile::new("resume.pdf", "application/pdf", b"%PDF-1.4".to_vec())
}

fn chat_reply(text: &str) -> ChatReply {
    ChatReply {
        response_text: text.to_string(),
        ..Default::default()
    }
}

fn request_of(effects: &[Effect]) -> RequestId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Upload { request, .. }
            | Effect::SendChat { request, .. }
            | Effect::FetchDocument { request } => Some(*request),
            _ => None,
        })
        .expect("effects should dispatch a request")
}

fn revealing_session(orchestrator: &Orchestrator) -> SessionId {
    match orchestrator.phase() {
        Phase::Revealing { session } => session,
        other => panic!("expected revealing, got {other:?}"),
    }
}

/// Ticks the active reveal to completion, returning every effect emitted.
fn finish_reveal(orchestrator: &mut Orchestrator) -> Vec<Effect> {
    let mut effects = Vec::new();
    while let Phase::Revealing { session } = orchestrator.phase() {
        effects.extend(orchestrator.on_tick(session));
    }
    effects
}

fn ticks(orchestrator: &mut Orchestrator, count: usize) {
    let session = revealing_session(orchestrator);
    for _ in 0..count {
        orchestrator.on_tick(session);
    }
}

/// Sends `text` and completes the round trip with `reply`.
fn exchange(orchestrator: &mut Orchestrator, text: &str, reply: &str) {
    let effects = orchestrator.submit(PendingSubmission::text(text)).unwrap();
    let request = request_of(&effects);
    orchestrator.on_chat_completed(request, Ok(chat_reply(reply)));
    finish_reveal(orchestrator);
}

fn senders(orchestrator: &Orchestrator) -> Vec<Sender> {
    orchestrator.snapshot().iter().map(|m| m.sender).collect()
}

#[test]
fn test_chat_reply_with_inline_html_updates_document() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator
        .submit(PendingSubmission::text("Make the header blue"))
        .unwrap();
    assert!(matches!(orchestrator.phase(), Phase::MessageSending { .. }));
    assert!(effects.contains(&Effect::SendChat {
        request: request_of(&effects),
        text: "Make the header blue".to_string(),
    }));

    let reply = ChatReply {
        response_text: "Done".to_string(),
        html: Some("<html>blue</html>".to_string()),
        document_updated: true,
        has_document: Some(true),
    };
    let effects = orchestrator.on_chat_completed(request_of(&effects), Ok(reply));
    assert!(orchestrator.phase().is_revealing());
    assert!(effects.iter().any(|e| matches!(e, Effect::RenderPreview(d) if d.present)));

    let effects = finish_reveal(&mut orchestrator);
    assert!(orchestrator.phase().is_idle());

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0], Message::user("Make the header blue", None));
    assert_eq!(snapshot[1], Message::bot("Done"));
    assert_eq!(orchestrator.document().html(), Some("<html>blue</html>"));
    assert!(!orchestrator.document().generating);
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::SaveConversation(log) if log.len() == 2)));
}

#[test]
fn test_upload_success_reveals_confirmation() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator
        .submit(PendingSubmission::with_file("", resume()))
        .unwrap();
    assert!(matches!(orchestrator.phase(), Phase::FileUploading { .. }));
    assert!(orchestrator.document().generating);

    orchestrator.on_upload_completed(
        request_of(&effects),
        Ok(GeneratedDocument {
            html: "<html>X</html>".to_string(),
        }),
    );
    let document = orchestrator.document();
    assert!(document.present);
    assert_eq!(document.html(), Some("<html>X</html>"));
    assert!(!document.generating);

    finish_reveal(&mut orchestrator);
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot[0].attached_file_name.as_deref(), Some("resume.pdf"));
    assert_eq!(snapshot[1], Message::bot(UPLOAD_CONFIRMATION));
}

#[test]
fn test_file_takes_precedence_over_text() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator
        .submit(PendingSubmission::with_file("use this one", resume()))
        .unwrap();

    assert!(effects.iter().any(|e| matches!(e, Effect::Upload { .. })));
    assert!(!effects.iter().any(|e| matches!(e, Effect::SendChat { .. })));
    assert_eq!(orchestrator.snapshot()[0].text, "use this one");
}

#[test]
fn test_network_failure_is_typed_out() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator.submit(PendingSubmission::text("hello")).unwrap();
    orchestrator.on_chat_completed(
        request_of(&effects),
        Err(TransportError::network("connection refused")),
    );
    assert!(!orchestrator.document().generating);
    assert!(orchestrator.phase().is_revealing());

    finish_reveal(&mut orchestrator);
    let snapshot = orchestrator.snapshot();
    assert_eq!(
        snapshot[1].text,
        "Failed to contact the server. Please check your connection and try again."
    );
    assert_eq!(snapshot[1].sender, Sender::Bot);
}

#[test]
fn test_server_rejection_on_upload() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator
        .submit(PendingSubmission::with_file("", resume()))
        .unwrap();
    orchestrator.on_upload_completed(
        request_of(&effects),
        Err(TransportError::rejected("Unsupported file type")),
    );
    finish_reveal(&mut orchestrator);

    assert_eq!(
        orchestrator.snapshot()[1].text,
        "The server rejected the request: Unsupported file type"
    );
    assert!(!orchestrator.document().present);
    assert!(orchestrator.document().last_error.is_some());
}

#[test]
fn test_describe_failure_texts() {
    assert_eq!(
        describe_failure(&TransportError::NotFound),
        "The server could not find what was requested."
    );
    assert_eq!(
        describe_failure(&TransportError::rejected("quota exceeded")),
        "The server rejected the request: quota exceeded"
    );
}

#[test]
fn test_sequential_submissions_alternate() {
    let mut orchestrator = orchestrator();
    for i in 0..5 {
        exchange(&mut orchestrator, &format!("question {i}"), &format!("answer {i}"));
    }

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.len(), 10);
    for (i, pair) in snapshot.chunks(2).enumerate() {
        assert_eq!(pair[0].text, format!("question {i}"));
        assert_eq!(pair[0].sender, Sender::User);
        assert_eq!(pair[1].text, format!("answer {i}"));
        assert_eq!(pair[1].sender, Sender::Bot);
    }
}

#[test]
fn test_empty_submission_rejected() {
    let mut orchestrator = orchestrator();
    assert_eq!(
        orchestrator.submit(PendingSubmission::text("   ")),
        Err(SubmitRejected::Empty)
    );
    assert!(orchestrator.snapshot().is_empty());
    assert!(orchestrator.phase().is_idle());
}

#[test]
fn test_busy_submission_changes_nothing() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator.submit(PendingSubmission::text("first")).unwrap();

    let log_before = orchestrator.snapshot();
    let document_before = orchestrator.document().clone();
    assert_eq!(
        orchestrator.submit(PendingSubmission::text("second")),
        Err(SubmitRejected::Busy)
    );
    assert_eq!(orchestrator.snapshot(), log_before);
    assert_eq!(orchestrator.document(), &document_before);

    orchestrator.on_chat_completed(request_of(&effects), Ok(chat_reply("reply")));
    ticks(&mut orchestrator, 1);
    assert_eq!(
        orchestrator.submit(PendingSubmission::text("third")),
        Err(SubmitRejected::Busy)
    );
    assert_eq!(orchestrator.snapshot().len(), 2);
}

#[test]
fn test_cancelled_request_ignores_late_response() {
    let mut orchestrator = orchestrator();
    let effects = orchestrator.submit(PendingSubmission::text("hello")).unwrap();
    let request = request_of(&effects);

    let effects = orchestrator.cancel();
    assert!(orchestrator.phase().is_idle());
    assert!(!orchestrator.document().generating);
    assert!(effects.iter().any(|e| matches!(e, Effect::SaveConversation(_))));

    let log_after_cancel = orchestrator.snapshot();
    assert_eq!(log_after_cancel[1], Message::bot("(interrupted)"));

    let late = ChatReply {
        response_text: "too late".to_string(),
        html: Some("<html>late</html>".to_string()),
        document_updated: true,
        has_document: Some(true),
    };
    assert!(orchestrator.on_chat_completed(request, Ok(late)).is_empty());
    assert_eq!(orchestrator.snapshot(), log_after_cancel);
    assert!(!orchestrator.document().present);
}

#[test]
fn test_stale_response_after_new_submission() {
    let mut orchestrator = orchestrator();
    let first = request_of(&orchestrator.submit(PendingSubmission::text("one")).unwrap());
    orchestrator.cancel();
    let second = request_of(&orchestrator.submit(PendingSubmission::text("two")).unwrap());
    assert_ne!(first, second);

    assert!(orchestrator
        .on_chat_completed(first, Ok(chat_reply("for one")))
        .is_empty());
    assert!(matches!(
        orchestrator.phase(),
        Phase::MessageSending { request } if request == second
    ));

    orchestrator.on_chat_completed(second, Ok(chat_reply("for two")));
    finish_reveal(&mut orchestrator);
    assert_eq!(orchestrator.snapshot().last().unwrap().text, "for two");
}

#[test]
fn test_cancel_mid_reveal_commits_prefix_with_marker() {
    let full: String = "abcdefghij".repeat(5);
    assert_eq!(full.chars().count(), 50);

    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("tell me")).unwrap());
    orchestrator.on_chat_completed(request, Ok(chat_reply(&full)));

    ticks(&mut orchestrator, 5);
    assert_eq!(orchestrator.conversation().pending_text(), Some("abcde"));

    let session = revealing_session(&orchestrator);
    let effects = orchestrator.cancel();
    assert!(effects.contains(&Effect::CancelTick { session }));
    assert!(orchestrator.phase().is_idle());
    assert_eq!(
        orchestrator.snapshot().last().unwrap(),
        &Message::bot("abcde (interrupted)")
    );

    // A tick that was already in flight changes nothing.
    assert!(orchestrator.on_tick(session).is_empty());
    assert_eq!(orchestrator.snapshot().len(), 2);
}

#[test]
fn test_cancel_at_offset_zero_commits_marker_only() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("hi")).unwrap());
    orchestrator.on_chat_completed(request, Ok(chat_reply("hello there")));

    orchestrator.cancel();
    assert_eq!(
        orchestrator.snapshot().last().unwrap(),
        &Message::bot("(interrupted)")
    );
}

#[test]
fn test_cancel_at_every_offset_never_leaks_unrevealed_text() {
    let full = "Your portfolio now uses a blue header.";
    let len = full.chars().count();

    for offset in 0..len {
        let mut orchestrator = orchestrator();
        let request = request_of(&orchestrator.submit(PendingSubmission::text("go")).unwrap());
        orchestrator.on_chat_completed(request, Ok(chat_reply(full)));
        ticks(&mut orchestrator, offset);
        orchestrator.cancel();

        let prefix: String = full.chars().take(offset).collect();
        let expected = if offset == 0 {
            "(interrupted)".to_string()
        } else {
            format!("{prefix}{INTERRUPTED_MARKER}")
        };
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.len(), 2, "offset {offset}");
        assert_eq!(snapshot[1].text, expected, "offset {offset}");
    }
}

#[test]
fn test_cancel_keeps_leading_whitespace_of_revealed_prefix() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("hi")).unwrap());
    orchestrator.on_chat_completed(request, Ok(chat_reply("\n\nHello there")));
    ticks(&mut orchestrator, 3);

    orchestrator.cancel();
    assert_eq!(
        orchestrator.snapshot().last().unwrap().text,
        "\n\nH (interrupted)"
    );
}

#[test]
fn test_cancel_while_idle_is_noop() {
    let mut orchestrator = orchestrator();
    exchange(&mut orchestrator, "a", "b");
    let before = orchestrator.snapshot();
    assert!(orchestrator.cancel().is_empty());
    assert_eq!(orchestrator.snapshot(), before);
}

#[test]
fn test_empty_reply_discards_placeholder() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("hi")).unwrap());
    orchestrator.on_chat_completed(request, Ok(chat_reply("")));
    let effects = finish_reveal(&mut orchestrator);

    assert!(orchestrator.phase().is_idle());
    assert_eq!(orchestrator.snapshot().len(), 1);
    assert!(!effects.iter().any(|e| matches!(e, Effect::SaveConversation(_))));
}

#[test]
fn test_updated_flag_triggers_follow_up_fetch() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("add a photo")).unwrap());
    let reply = ChatReply {
        response_text: "Added".to_string(),
        document_updated: true,
        ..Default::default()
    };
    let effects = orchestrator.on_chat_completed(request, Ok(reply));
    let fetch = request_of(&effects);
    assert_eq!(orchestrator.pending_fetch(), Some(fetch));
    assert!(orchestrator.document().generating);

    finish_reveal(&mut orchestrator);
    orchestrator.on_document_fetched(
        fetch,
        Ok(GeneratedDocument {
            html: "<html>photo</html>".to_string(),
        }),
    );
    assert_eq!(orchestrator.document().html(), Some("<html>photo</html>"));
    assert!(!orchestrator.document().generating);
    assert_eq!(orchestrator.pending_fetch(), None);
}

#[test]
fn test_cancelled_reveal_still_applies_follow_up_fetch() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.submit(PendingSubmission::text("go")).unwrap());
    let reply = ChatReply {
        response_text: "Done, updated".to_string(),
        document_updated: true,
        ..Default::default()
    };
    let fetch = request_of(&orchestrator.on_chat_completed(request, Ok(reply)));
    ticks(&mut orchestrator, 2);

    orchestrator.cancel();
    assert!(orchestrator.phase().is_idle());
    assert_eq!(orchestrator.pending_fetch(), Some(fetch));
    assert!(!orchestrator.can_cancel());
    assert_eq!(
        orchestrator.snapshot().last().unwrap(),
        &Message::bot("Do (interrupted)")
    );

    orchestrator.on_document_fetched(
        fetch,
        Ok(GeneratedDocument {
            html: "<html>new</html>".to_string(),
        }),
    );
    assert_eq!(orchestrator.document().html(), Some("<html>new</html>"));
    assert!(!orchestrator.document().generating);
}

#[test]
fn test_cancel_drops_idle_refresh() {
    let mut orchestrator = orchestrator();
    assert!(!orchestrator.can_cancel());
    let request = request_of(&orchestrator.refresh_document().unwrap());
    assert!(orchestrator.can_cancel());

    orchestrator.cancel();
    assert_eq!(orchestrator.pending_fetch(), None);
    assert!(!orchestrator.can_cancel());
    assert!(orchestrator
        .on_document_fetched(
            request,
            Ok(GeneratedDocument {
                html: "<html>late</html>".to_string()
            })
        )
        .is_empty());
    assert!(!orchestrator.document().present);
    assert!(orchestrator.snapshot().is_empty());
}

#[test]
fn test_submission_supersedes_outstanding_refresh() {
    let mut orchestrator = orchestrator();
    let refresh = request_of(&orchestrator.refresh_document().unwrap());

    let request = request_of(
        &orchestrator
            .submit(PendingSubmission::text("Make the header blue"))
            .unwrap(),
    );
    assert_eq!(orchestrator.pending_fetch(), None);
    let reply = ChatReply {
        response_text: "Done".to_string(),
        html: Some("<html>new</html>".to_string()),
        document_updated: true,
        has_document: Some(true),
    };
    orchestrator.on_chat_completed(request, Ok(reply));
    finish_reveal(&mut orchestrator);

    let effects = orchestrator.on_document_fetched(
        refresh,
        Ok(GeneratedDocument {
            html: "<html>old</html>".to_string(),
        }),
    );
    assert!(effects.is_empty());
    assert_eq!(orchestrator.document().html(), Some("<html>new</html>"));
}

#[test]
fn test_late_refresh_does_not_touch_upload_in_progress() {
    let mut orchestrator = orchestrator();
    let refresh = request_of(&orchestrator.refresh_document().unwrap());
    orchestrator
        .submit(PendingSubmission::with_file("", resume()))
        .unwrap();

    orchestrator.on_document_fetched(refresh, Err(TransportError::NotFound));
    assert!(orchestrator.document().generating);
    assert!(matches!(orchestrator.phase(), Phase::FileUploading { .. }));
}

#[test]
fn test_refresh_handles_not_found_quietly() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.refresh_document().unwrap());
    assert_eq!(orchestrator.refresh_document(), Err(SubmitRejected::Busy));

    orchestrator.on_document_fetched(request, Err(TransportError::NotFound));
    assert!(orchestrator.snapshot().is_empty());
    assert_eq!(orchestrator.document(), &DocumentState::empty());
}

#[test]
fn test_refresh_failure_keeps_held_document() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.refresh_document().unwrap());
    orchestrator.on_document_fetched(
        request,
        Ok(GeneratedDocument {
            html: "<html>v1</html>".to_string(),
        }),
    );

    let request = request_of(&orchestrator.refresh_document().unwrap());
    orchestrator.on_document_fetched(request, Err(TransportError::network("timed out")));
    assert_eq!(orchestrator.document().html(), Some("<html>v1</html>"));
    assert!(orchestrator.document().last_error.is_some());
    assert!(orchestrator.snapshot().is_empty());
}

#[test]
fn test_no_portfolio_flag_keeps_document() {
    let mut orchestrator = orchestrator();
    let request = request_of(&orchestrator.refresh_document().unwrap());
    orchestrator.on_document_fetched(
        request,
        Ok(GeneratedDocument {
            html: "<html>kept</html>".to_string(),
        }),
    );

    let request = request_of(&orchestrator.submit(PendingSubmission::text("hm")).unwrap());
    let reply = ChatReply {
        response_text: "ok".to_string(),
        has_document: Some(false),
        ..Default::default()
    };
    orchestrator.on_chat_completed(request, Ok(reply));
    assert_eq!(orchestrator.document().html(), Some("<html>kept</html>"));
    assert!(!orchestrator.document().generating);
}

#[test]
fn test_restore_only_when_idle_and_empty() {
    let mut orchestrator = orchestrator();
    orchestrator
        .restore_conversation(vec![Message::user("earlier", None), Message::bot("reply")])
        .unwrap();
    assert_eq!(orchestrator.snapshot().len(), 2);

    let err = orchestrator
        .restore_conversation(vec![Message::bot("again")])
        .unwrap_err();
    assert!(err.is_invalid_state());

    let mut busy = self::orchestrator();
    busy.submit(PendingSubmission::text("now")).unwrap();
    assert!(busy.restore_conversation(Vec::new()).is_err());
}
