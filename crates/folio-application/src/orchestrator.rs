//! Submission state machine.
//!
//! The [`Orchestrator`] owns the conversation log, the document state and the
//! reveal engine. It never performs I/O: every input (a user command, a
//! backend completion, a timer tick) is a method call that mutates state
//! synchronously and returns the [`Effect`]s the driver must carry out.
//!
//! Completions carry the [`RequestId`] they were issued with. A completion
//! whose id no longer matches the outstanding request is dropped before it
//! can touch the log or the document.

use std::time::Duration;

use folio_core::conversation::{ConversationSnapshot, ConversationStore, Message};
use folio_core::document::DocumentState;
use folio_core::transport::{
    ChatReply, DocumentRefresh, GeneratedDocument, TransportError, TransportResult, UploadFile,
};
use thiserror::Error;

use crate::reveal::{FinalizeReason, Finalized, RevealEngine, RevealTick, SessionId};

/// Identifies one backend request issued by the orchestrator.
pub type RequestId = u64;

/// Revealed after a successful upload; the upload endpoint returns no text.
pub const UPLOAD_CONFIRMATION: &str = "Your portfolio has been generated from your resume! \
Take a look at the preview, and tell me what you would like to change.";

/// Appended to a reveal that the user cut short.
pub const INTERRUPTED_MARKER: &str = " (interrupted)";

/// Where the orchestrator is in a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Guard-and-dispatch step inside [`Orchestrator::submit`].
    Submitting,
    FileUploading { request: RequestId },
    MessageSending { request: RequestId },
    Revealing { session: SessionId },
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    /// Waiting on the backend for the primary response.
    pub fn is_awaiting_response(&self) -> bool {
        matches!(
            self,
            Phase::FileUploading { .. } | Phase::MessageSending { .. }
        )
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self, Phase::Revealing { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::FileUploading { .. } => "uploading",
            Phase::MessageSending { .. } => "sending",
            Phase::Revealing { .. } => "revealing",
        }
    }
}

/// What the user handed over when pressing send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSubmission {
    pub text: String,
    pub file: Option<UploadFile>,
}

impl PendingSubmission {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file: None,
        }
    }

    pub fn with_file(text: impl Into<String>, file: UploadFile) -> Self {
        Self {
            text: text.into(),
            file: Some(file),
        }
    }

    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.file.is_none()
    }
}

/// Why a command was refused without changing anything.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Nothing to send: type a message or attach a file")]
    Empty,
    #[error("Still working on the previous message")]
    Busy,
}

/// Work the driver performs on behalf of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload { request: RequestId, file: UploadFile },
    SendChat { request: RequestId, text: String },
    FetchDocument { request: RequestId },
    ScheduleTick { session: SessionId, after: Duration },
    CancelTick { session: SessionId },
    SaveConversation(Vec<Message>),
    RenderPreview(DocumentState),
}

/// Why a document fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOrigin {
    /// The reply said the document changed but carried no markup.
    FollowUp,
    /// Startup hydration or an explicit refresh.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingFetch {
    request: RequestId,
    origin: FetchOrigin,
}

/// Bot text shown for a failed primary request.
pub fn describe_failure(error: &TransportError) -> String {
    match error {
        TransportError::NetworkFailure { .. } => {
            "Failed to contact the server. Please check your connection and try again.".to_string()
        }
        TransportError::ServerRejected { message } => {
            format!("The server rejected the request: {}", message)
        }
        TransportError::NotFound => "The server could not find what was requested.".to_string(),
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    phase: Phase,
    store: ConversationStore,
    document: DocumentState,
    reveal: RevealEngine,
    next_request: RequestId,
    pending_fetch: Option<PendingFetch>,
}

impl Orchestrator {
    pub fn new(reveal: RevealEngine) -> Self {
        Self {
            phase: Phase::Idle,
            store: ConversationStore::new(),
            document: DocumentState::empty(),
            reveal,
            next_request: 1,
            pending_fetch: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.store
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.store.snapshot()
    }

    /// The document fetch still outstanding, if any.
    pub fn pending_fetch(&self) -> Option<RequestId> {
        self.pending_fetch.map(|fetch| fetch.request)
    }

    /// Whether [`cancel`](Self::cancel) would change anything.
    pub fn can_cancel(&self) -> bool {
        !self.phase.is_idle()
            || self
                .pending_fetch
                .is_some_and(|fetch| fetch.origin == FetchOrigin::Refresh)
    }

    /// Accepts a submission and dispatches it to the backend.
    ///
    /// The user message is appended before anything is sent. When a file is
    /// attached it is uploaded and the typed text is recorded but not sent.
    /// An outstanding document fetch becomes stale: the new turn supersedes
    /// whatever it would have returned.
    pub fn submit(&mut self, submission: PendingSubmission) -> Result<Vec<Effect>, SubmitRejected> {
        if !self.phase.is_idle() {
            tracing::debug!(
                target: "folio::orchestrator",
                phase = self.phase.label(),
                "Submission rejected while busy"
            );
            return Err(SubmitRejected::Busy);
        }
        if submission.is_empty() {
            return Err(SubmitRejected::Empty);
        }

        self.phase = Phase::Submitting;
        if let Some(fetch) = self.pending_fetch.take() {
            tracing::debug!(
                target: "folio::orchestrator",
                request = fetch.request,
                "Superseding outstanding document fetch"
            );
        }
        let PendingSubmission { text, file } = submission;
        let text = text.trim().to_string();
        let attached = file.as_ref().map(|f| f.file_name.clone());
        self.store.append_user(Message::user(text.clone(), attached));

        let request = self.allocate_request();
        self.document.begin_generation();
        let mut effects = vec![self.render()];

        match file {
            Some(file) => {
                tracing::info!(
                    target: "folio::orchestrator",
                    request,
                    file_name = %file.file_name,
                    size = file.size(),
                    "Uploading resume"
                );
                self.phase = Phase::FileUploading { request };
                effects.push(Effect::Upload { request, file });
            }
            None => {
                tracing::info!(
                    target: "folio::orchestrator",
                    request,
                    chars = text.chars().count(),
                    "Sending chat message"
                );
                self.phase = Phase::MessageSending { request };
                effects.push(Effect::SendChat { request, text });
            }
        }
        Ok(effects)
    }

    pub fn on_upload_completed(
        &mut self,
        request: RequestId,
        result: TransportResult<GeneratedDocument>,
    ) -> Vec<Effect> {
        if self.phase != (Phase::FileUploading { request }) {
            self.log_stale("upload", request);
            return Vec::new();
        }

        match result {
            Ok(generated) => {
                let mut effects = self.apply_document_update(generated.html);
                effects.extend(self.begin_reveal(UPLOAD_CONFIRMATION));
                effects
            }
            Err(error) => self.fail_primary(request, error),
        }
    }

    pub fn on_chat_completed(
        &mut self,
        request: RequestId,
        result: TransportResult<ChatReply>,
    ) -> Vec<Effect> {
        if self.phase != (Phase::MessageSending { request }) {
            self.log_stale("chat", request);
            return Vec::new();
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(error) => return self.fail_primary(request, error),
        };

        if reply.has_document == Some(false) {
            tracing::info!(
                target: "folio::orchestrator",
                request,
                "Backend reports no portfolio; keeping the local copy"
            );
        }

        let mut effects = match reply.document_refresh() {
            DocumentRefresh::Inline(html) => self.apply_document_update(html),
            DocumentRefresh::Fetch => {
                vec![self.issue_fetch(FetchOrigin::FollowUp)]
            }
            DocumentRefresh::Unchanged => {
                self.document.abandon_generation();
                vec![self.render()]
            }
        };
        effects.extend(self.begin_reveal(&reply.response_text));
        effects
    }

    /// Handles a document fetch, whether a follow-up or an explicit refresh.
    pub fn on_document_fetched(
        &mut self,
        request: RequestId,
        result: TransportResult<GeneratedDocument>,
    ) -> Vec<Effect> {
        if self.pending_fetch() != Some(request) {
            self.log_stale("document fetch", request);
            return Vec::new();
        }
        self.pending_fetch = None;

        match result {
            Ok(generated) => self.apply_document_update(generated.html),
            Err(TransportError::NotFound) => {
                tracing::debug!(target: "folio::orchestrator", request, "No document yet");
                self.document.abandon_generation();
                vec![self.render()]
            }
            Err(error) => {
                tracing::warn!(
                    target: "folio::orchestrator",
                    request,
                    error = %error,
                    "Document fetch failed"
                );
                self.document.record_failure(error.to_string());
                vec![self.render()]
            }
        }
    }

    /// Asks for the current document. Only allowed while idle.
    pub fn refresh_document(&mut self) -> Result<Vec<Effect>, SubmitRejected> {
        if !self.phase.is_idle() || self.pending_fetch.is_some() {
            return Err(SubmitRejected::Busy);
        }
        Ok(vec![self.issue_fetch(FetchOrigin::Refresh)])
    }

    pub fn on_tick(&mut self, session: SessionId) -> Vec<Effect> {
        if self.phase != (Phase::Revealing { session }) {
            return Vec::new();
        }

        match self.reveal.tick(session) {
            None => Vec::new(),
            Some(RevealTick::Progress {
                session,
                prefix,
                next_delay,
            }) => {
                check(self.store.update_placeholder(&prefix), "update_placeholder");
                vec![Effect::ScheduleTick {
                    session,
                    after: next_delay,
                }]
            }
            Some(RevealTick::Finalize(finalized)) => self.finalize(finalized),
        }
    }

    /// Stops whatever is in progress and returns to idle.
    ///
    /// A reveal is committed up to what was shown, followed by
    /// [`INTERRUPTED_MARKER`]. A request still in flight becomes stale and a
    /// marker-only bot message is committed in its place. An explicit
    /// refresh is dropped; a follow-up fetch for a reply that changed the
    /// document is kept. Otherwise idle is a no-op.
    pub fn cancel(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(fetch) = self.pending_fetch {
            if fetch.origin == FetchOrigin::Refresh {
                tracing::info!(
                    target: "folio::orchestrator",
                    request = fetch.request,
                    "Refresh cancelled"
                );
                self.pending_fetch = None;
            }
        }

        let phase = self.phase;
        match phase {
            Phase::Idle | Phase::Submitting => {}
            Phase::Revealing { session } => {
                effects.push(Effect::CancelTick { session });
                match self.reveal.cancel() {
                    Some(finalized) => effects.extend(self.finalize(finalized)),
                    None => self.phase = Phase::Idle,
                }
            }
            Phase::FileUploading { request } | Phase::MessageSending { request } => {
                tracing::info!(target: "folio::orchestrator", request, "Request cancelled");
                self.phase = Phase::Idle;
                if self.document.generating {
                    self.document.abandon_generation();
                    effects.push(self.render());
                }
                check(self.store.begin_bot_placeholder(), "begin_bot_placeholder");
                check(
                    self.store.commit_bot_text(INTERRUPTED_MARKER.trim()),
                    "commit_bot_text",
                );
                effects.push(Effect::SaveConversation(self.store.committed()));
            }
        }
        effects
    }

    /// Hydrates the log from a stored conversation. Only an untouched, idle
    /// conversation is replaced.
    pub fn restore_conversation(&mut self, messages: Vec<Message>) -> folio_core::Result<()> {
        if !self.phase.is_idle() {
            return Err(folio_core::FolioError::invalid_state(
                "cannot restore while a submission is in progress",
            ));
        }
        self.store.restore(messages)
    }

    fn begin_reveal(&mut self, text: &str) -> Vec<Effect> {
        match self.reveal.start(text) {
            Ok(start) => {
                check(self.store.begin_bot_placeholder(), "begin_bot_placeholder");
                self.phase = Phase::Revealing {
                    session: start.session,
                };
                vec![Effect::ScheduleTick {
                    session: start.session,
                    after: start.first_delay,
                }]
            }
            Err(err) => {
                check(Err(err), "reveal start");
                self.phase = Phase::Idle;
                Vec::new()
            }
        }
    }

    fn finalize(&mut self, finalized: Finalized) -> Vec<Effect> {
        self.phase = Phase::Idle;
        let text = match finalized.reason {
            FinalizeReason::Completed => finalized.text,
            FinalizeReason::Cancelled if finalized.text.is_empty() => {
                INTERRUPTED_MARKER.trim_start().to_string()
            }
            FinalizeReason::Cancelled => finalized.text + INTERRUPTED_MARKER,
        };

        tracing::debug!(
            target: "folio::orchestrator",
            session = finalized.session,
            reason = ?finalized.reason,
            chars = text.chars().count(),
            "Reveal finalized"
        );

        if text.trim().is_empty() {
            check(self.store.discard_placeholder(), "discard_placeholder");
            return Vec::new();
        }
        check(self.store.commit_bot_text(text), "commit_bot_text");
        vec![Effect::SaveConversation(self.store.committed())]
    }

    fn fail_primary(&mut self, request: RequestId, error: TransportError) -> Vec<Effect> {
        tracing::warn!(
            target: "folio::orchestrator",
            request,
            error = %error,
            "Request failed"
        );
        self.document.record_failure(error.to_string());
        let mut effects = vec![self.render()];
        effects.extend(self.begin_reveal(&describe_failure(&error)));
        effects
    }

    /// The one place new markup enters the document.
    fn apply_document_update(&mut self, html: String) -> Vec<Effect> {
        tracing::info!(
            target: "folio::orchestrator",
            bytes = html.len(),
            "Document updated"
        );
        self.document.apply_update(html);
        vec![self.render()]
    }

    fn issue_fetch(&mut self, origin: FetchOrigin) -> Effect {
        let request = self.allocate_request();
        self.pending_fetch = Some(PendingFetch { request, origin });
        Effect::FetchDocument { request }
    }

    fn render(&self) -> Effect {
        Effect::RenderPreview(self.document.clone())
    }

    fn allocate_request(&mut self) -> RequestId {
        let request = self.next_request;
        self.next_request += 1;
        request
    }

    fn log_stale(&self, kind: &'static str, request: RequestId) {
        tracing::debug!(
            target: "folio::orchestrator",
            kind,
            request,
            phase = self.phase.label(),
            "Dropping stale completion"
        );
    }
}

fn check(result: folio_core::Result<()>, operation: &'static str) {
    if let Err(err) = result {
        tracing::error!(
            target: "folio::orchestrator",
            operation,
            error = %err,
            "Conversation state violated"
        );
        debug_assert!(false, "{operation}: {err}");
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
