//! Chat portfolio use case.
//!
//! Runs the [`Orchestrator`] inside a single tokio task. User commands,
//! backend completions and reveal ticks all arrive on one channel and are
//! applied in order, so the conversation log and the document never need a
//! lock. Backend calls and tick timers run as spawned tasks that post their
//! result back to the loop.
//!
//! Preview rendering and conversation saving go through `watch` channels to
//! dedicated worker tasks: a slow preview or backend never stalls the loop,
//! and a worker that falls behind skips straight to the latest value.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use folio_core::conversation::{ConversationSnapshot, Message};
use folio_core::document::DocumentState;
use folio_core::preview::PreviewSurface;
use folio_core::transport::{
    ChatReply, GeneratedDocument, PortfolioBackend, TransportResult,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::orchestrator::{Effect, Orchestrator, PendingSubmission, Phase, RequestId};
use crate::reveal::{RevealEngine, SessionId};

const EVENT_BUFFER: usize = 64;

/// Read-only picture of the chat handed to the UI after every change.
#[derive(Debug, Clone)]
pub struct ChatView {
    pub phase: Phase,
    pub messages: ConversationSnapshot,
    pub document: DocumentState,
    /// A document fetch is outstanding.
    pub fetching: bool,
    /// Conversation revision; changes whenever `messages` does.
    pub revision: u64,
}

impl ChatView {
    /// Text of the bot message currently being typed out.
    pub fn typing(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.is_placeholder())
            .map(|m| m.text.as_str())
    }
}

enum Event {
    Submit {
        submission: PendingSubmission,
        reply: oneshot::Sender<Result<()>>,
    },
    Cancel {
        reply: oneshot::Sender<bool>,
    },
    RefreshDocument {
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
    UploadCompleted {
        request: RequestId,
        result: TransportResult<GeneratedDocument>,
    },
    ChatCompleted {
        request: RequestId,
        result: TransportResult<ChatReply>,
    },
    DocumentFetched {
        request: RequestId,
        result: TransportResult<GeneratedDocument>,
    },
    ConversationFetched(TransportResult<Vec<Message>>),
    Tick(SessionId),
}

/// Wires the orchestrator to a backend and a preview surface.
pub struct ChatPortfolioUseCase {
    backend: Arc<dyn PortfolioBackend>,
    preview: Arc<dyn PreviewSurface>,
    orchestrator: Orchestrator,
    hydrate: bool,
}

impl ChatPortfolioUseCase {
    pub fn new(
        backend: Arc<dyn PortfolioBackend>,
        preview: Arc<dyn PreviewSurface>,
        reveal: RevealEngine,
    ) -> Self {
        Self {
            backend,
            preview,
            orchestrator: Orchestrator::new(reveal),
            hydrate: true,
        }
    }

    /// Skips loading the stored conversation and document on start.
    pub fn without_hydration(mut self) -> Self {
        self.hydrate = false;
        self
    }

    /// Starts the event loop and its workers on the current runtime.
    pub fn spawn(self) -> ChatPortfolioHandle {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let initial = view_of(&self.orchestrator);
        let (view_tx, view_rx) = watch::channel(initial);
        let (preview_tx, preview_rx) = watch::channel(None);
        let (save_tx, save_rx) = watch::channel(None);

        tokio::spawn(preview_worker(self.preview, preview_rx));
        tokio::spawn(save_worker(Arc::clone(&self.backend), save_rx));

        let driver = Driver {
            orchestrator: self.orchestrator,
            backend: self.backend,
            events: events_tx.downgrade(),
            view_tx,
            preview_tx,
            save_tx,
            tick: None,
        };
        tokio::spawn(driver.run(events_rx, self.hydrate));

        ChatPortfolioHandle {
            events: events_tx,
            view: view_rx,
        }
    }
}

/// Client side of a running chat. Cheap to clone.
#[derive(Clone)]
pub struct ChatPortfolioHandle {
    events: mpsc::Sender<Event>,
    view: watch::Receiver<ChatView>,
}

impl ChatPortfolioHandle {
    /// Submits a message or file.
    ///
    /// Fails with a [`SubmitRejected`](crate::SubmitRejected) error (reachable
    /// through `downcast_ref`) when the input is empty or the chat is busy.
    pub async fn submit(&self, submission: PendingSubmission) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Submit { submission, reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Cancels the reveal, request or refresh in progress. Returns whether anything
    /// was cancelled.
    pub async fn cancel(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Cancel { reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Reloads the document from the backend.
    pub async fn refresh_document(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::RefreshDocument { reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// The latest view.
    pub fn view(&self) -> ChatView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view.clone()
    }

    /// Waits until the chat is idle again and returns that view.
    pub async fn wait_until_idle(&self) -> Result<ChatView> {
        let mut view = self.view.clone();
        let idle = view
            .wait_for(|v| v.phase.is_idle())
            .await
            .map_err(|_| stopped())?;
        Ok(idle.clone())
    }

    /// Stops the event loop. In-flight backend calls are abandoned.
    pub async fn shutdown(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(Event::Shutdown { done }).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, event: Event) -> Result<()> {
        self.events.send(event).await.map_err(|_| stopped())
    }
}

fn stopped() -> anyhow::Error {
    anyhow!("chat event loop has stopped")
}

fn view_of(orchestrator: &Orchestrator) -> ChatView {
    ChatView {
        phase: orchestrator.phase(),
        messages: orchestrator.snapshot(),
        document: orchestrator.document().clone(),
        fetching: orchestrator.pending_fetch().is_some(),
        revision: orchestrator.conversation().revision(),
    }
}

struct Driver {
    orchestrator: Orchestrator,
    backend: Arc<dyn PortfolioBackend>,
    /// Weak so the loop ends once every handle and in-flight task is gone.
    events: mpsc::WeakSender<Event>,
    view_tx: watch::Sender<ChatView>,
    preview_tx: watch::Sender<Option<DocumentState>>,
    save_tx: watch::Sender<Option<Vec<Message>>>,
    tick: Option<(SessionId, JoinHandle<()>)>,
}

impl Driver {
    async fn run(mut self, mut events: mpsc::Receiver<Event>, hydrate: bool) {
        tracing::info!(target: "folio::chat", hydrate, "Chat event loop started");
        if hydrate {
            self.hydrate();
        }
        self.execute(vec![Effect::RenderPreview(
            self.orchestrator.document().clone(),
        )]);

        let mut shutdown_ack = None;
        while let Some(event) = events.recv().await {
            if let Event::Shutdown { done } = event {
                shutdown_ack = Some(done);
                break;
            }
            self.handle(event);
            self.publish();
        }

        drop(events);
        self.abort_tick();
        tracing::info!(target: "folio::chat", "Chat event loop stopped");
        if let Some(done) = shutdown_ack {
            let _ = done.send(());
        }
    }

    fn hydrate(&mut self) {
        self.spawn_call(|backend| async move {
            Event::ConversationFetched(backend.fetch_conversation().await)
        });
        match self.orchestrator.refresh_document() {
            Ok(effects) => self.execute(effects),
            Err(rejected) => {
                tracing::debug!(target: "folio::chat", reason = %rejected, "Skipping document hydration")
            }
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Submit { submission, reply } => {
                let result = self
                    .orchestrator
                    .submit(submission)
                    .map(|effects| self.execute(effects))
                    .map_err(anyhow::Error::from);
                self.publish();
                let _ = reply.send(result);
            }
            Event::Cancel { reply } => {
                let was_busy = self.orchestrator.can_cancel();
                let effects = self.orchestrator.cancel();
                self.execute(effects);
                self.publish();
                let _ = reply.send(was_busy);
            }
            Event::RefreshDocument { reply } => {
                let result = self
                    .orchestrator
                    .refresh_document()
                    .map(|effects| self.execute(effects))
                    .map_err(anyhow::Error::from);
                self.publish();
                let _ = reply.send(result);
            }
            Event::UploadCompleted { request, result } => {
                let effects = self.orchestrator.on_upload_completed(request, result);
                self.execute(effects);
            }
            Event::ChatCompleted { request, result } => {
                let effects = self.orchestrator.on_chat_completed(request, result);
                self.execute(effects);
            }
            Event::DocumentFetched { request, result } => {
                let effects = self.orchestrator.on_document_fetched(request, result);
                self.execute(effects);
            }
            Event::ConversationFetched(result) => self.restore(result),
            Event::Tick(session) => {
                if self
                    .tick
                    .as_ref()
                    .is_some_and(|(pending, _)| *pending == session)
                {
                    self.tick = None;
                }
                let effects = self.orchestrator.on_tick(session);
                self.execute(effects);
            }
            Event::Shutdown { .. } => {}
        }
    }

    fn restore(&mut self, result: TransportResult<Vec<Message>>) {
        let messages = match result {
            Ok(messages) => messages,
            Err(error) => {
                tracing::warn!(target: "folio::chat", error = %error, "Could not load chat history");
                return;
            }
        };
        if messages.is_empty() {
            return;
        }
        let count = messages.len();
        match self.orchestrator.restore_conversation(messages) {
            Ok(()) => tracing::info!(target: "folio::chat", count, "Chat history restored"),
            Err(error) => tracing::debug!(
                target: "folio::chat",
                error = %error,
                "Chat history arrived after the conversation started; ignoring"
            ),
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload { request, file } => self.spawn_call(move |backend| async move {
                    let result = backend.upload_and_generate(&file).await;
                    Event::UploadCompleted { request, result }
                }),
                Effect::SendChat { request, text } => self.spawn_call(move |backend| async move {
                    let result = backend.send_chat_message(&text).await;
                    Event::ChatCompleted { request, result }
                }),
                Effect::FetchDocument { request } => self.spawn_call(move |backend| async move {
                    let result = backend.fetch_document().await;
                    Event::DocumentFetched { request, result }
                }),
                Effect::ScheduleTick { session, after } => self.schedule_tick(session, after),
                Effect::CancelTick { session } => {
                    if self
                        .tick
                        .as_ref()
                        .is_some_and(|(pending, _)| *pending == session)
                    {
                        self.abort_tick();
                    }
                }
                Effect::SaveConversation(messages) => {
                    self.save_tx.send_replace(Some(messages));
                }
                Effect::RenderPreview(document) => {
                    self.preview_tx.send_replace(Some(document));
                }
            }
        }
    }

    fn spawn_call<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<dyn PortfolioBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = Event> + Send + 'static,
    {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let event = call(backend).await;
            let _ = events.send(event).await;
        });
    }

    fn schedule_tick(&mut self, session: SessionId, after: std::time::Duration) {
        self.abort_tick();
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(Event::Tick(session)).await;
        });
        self.tick = Some((session, handle));
    }

    fn abort_tick(&mut self) {
        if let Some((_, handle)) = self.tick.take() {
            handle.abort();
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(view_of(&self.orchestrator));
    }
}

async fn preview_worker(
    surface: Arc<dyn PreviewSurface>,
    mut documents: watch::Receiver<Option<DocumentState>>,
) {
    while documents.changed().await.is_ok() {
        let latest = documents.borrow_and_update().clone();
        let Some(document) = latest else { continue };
        if let Err(error) = surface.render(&document).await {
            tracing::warn!(target: "folio::preview", error = %error, "Preview render failed");
        }
    }
}

async fn save_worker(
    backend: Arc<dyn PortfolioBackend>,
    mut conversations: watch::Receiver<Option<Vec<Message>>>,
) {
    while conversations.changed().await.is_ok() {
        let latest = conversations.borrow_and_update().clone();
        let Some(messages) = latest else { continue };
        match backend.save_conversation(&messages).await {
            Ok(()) => tracing::debug!(
                target: "folio::chat",
                count = messages.len(),
                "Chat history saved"
            ),
            Err(error) => {
                tracing::warn!(target: "folio::chat", error = %error, "Could not save chat history")
            }
        }
    }
}
