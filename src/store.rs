//! Conversation state.
//!
//! [`ConversationStore`] owns the message log and is the only writer of
//! [`ConversationState`].  Every operation publishes a fresh immutable snapshot on a
//! [`watch`] channel, so a front end can either poll [`ConversationStore::snapshot`] or await
//! changes through [`ConversationStore::subscribe`].
//!
//! One send may be outstanding at a time.  A second send while `loading` is set is rejected
//! with [`Error::Busy`] before it touches state or the network.  A send whose future is dropped
//! before the reply arrives clears `loading` on the way out and keeps the user message.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::{
    STORE_ABANDONED_SENDS, STORE_BUSY_REJECTIONS, STORE_SEND_FAILURES, STORE_SENDS,
};
use crate::sse::CompletionStream;
use crate::types::Message;

/// Starter prompts offered to a new conversation.
pub const SUGGESTIONS: [&str; 4] = [
    "What can you do?",
    "How do I use React Hooks?",
    "Explain what a Promise is",
    "Write a quicksort algorithm",
];

/// Something that can answer a single user message.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the complete reply to `text`.
    async fn complete(&self, text: &str) -> Result<String>;

    /// Return the reply to `text` as a stream of fragments that ends when `cancel` fires.
    async fn stream(&self, text: &str, cancel: CancellationToken) -> Result<CompletionStream>;
}

/// A snapshot of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    /// The log, oldest first.  Never empty.
    pub messages: Vec<Message>,
    /// True exactly while a send is outstanding.
    pub loading: bool,
    /// Text of the most recent failure, cleared by the next send.
    pub error: Option<String>,
    generation: u64,
}

impl ConversationState {
    /// A conversation holding only the welcome message.
    pub fn initial() -> Self {
        Self {
            messages: vec![Message::welcome()],
            loading: false,
            error: None,
            generation: 0,
        }
    }

    /// The most recent message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn begin(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self {
            messages,
            loading: true,
            error: None,
            generation: self.generation,
        }
    }

    fn reply(&self, message: Option<Message>) -> Self {
        let mut messages = self.messages.clone();
        messages.extend(message);
        Self {
            messages,
            loading: false,
            error: self.error.clone(),
            generation: self.generation,
        }
    }

    fn fail(&self, error: String) -> Self {
        Self {
            messages: self.messages.clone(),
            loading: false,
            error: Some(error),
            generation: self.generation,
        }
    }

    fn cleared(&self) -> Self {
        Self {
            generation: self.generation + 1,
            ..Self::initial()
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Owner of the conversation log.
pub struct ConversationStore<B: CompletionBackend> {
    backend: B,
    state: watch::Sender<Arc<ConversationState>>,
}

impl<B: CompletionBackend> ConversationStore<B> {
    /// Create a store seeded with the welcome message.
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(Arc::new(ConversationState::initial()));
        Self { backend, state }
    }

    /// The backend replies come from.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ConversationState> {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConversationState>> {
        self.state.subscribe()
    }

    /// Starter prompts for an empty conversation.
    pub fn suggestions(&self) -> &'static [&'static str] {
        &SUGGESTIONS
    }

    /// Send `text` and wait for the complete reply.
    ///
    /// Whitespace-only text is ignored.  Failures of the backend are recorded in the returned
    /// snapshot's `error`; the only error returned directly is [`Error::Busy`].
    pub async fn send_message(&self, text: &str) -> Result<Arc<ConversationState>> {
        if text.trim().is_empty() {
            return Ok(self.snapshot());
        }
        let pending = self.begin(text)?;
        let outcome = self.backend.complete(text).await;
        Ok(pending.settle(outcome.map(Some)))
    }

    /// Send `text` and forward the reply to `on_chunk` fragment by fragment.
    ///
    /// When the stream ends the concatenated reply is appended as a single assistant message;
    /// a reply cut short by `cancel` keeps whatever arrived.  A stream error discards the
    /// partial reply and records the error.
    pub async fn send_message_streaming<F>(
        &self,
        text: &str,
        cancel: CancellationToken,
        mut on_chunk: F,
    ) -> Result<Arc<ConversationState>>
    where
        F: FnMut(&str),
    {
        if text.trim().is_empty() {
            return Ok(self.snapshot());
        }
        let pending = self.begin(text)?;
        let outcome = async {
            let mut fragments = self.backend.stream(text, cancel).await?;
            let mut reply = String::new();
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                on_chunk(&fragment);
                reply.push_str(&fragment);
            }
            Ok::<_, Error>(reply)
        }
        .await;
        let outcome = outcome.map(|reply| (!reply.is_empty()).then_some(reply));
        Ok(pending.settle(outcome))
    }

    /// Reset to the welcome message with no error and nothing loading.
    ///
    /// A send still in flight when the log is cleared is forgotten: its reply or error is
    /// dropped when it arrives.
    pub fn clear(&self) -> Arc<ConversationState> {
        self.publish(|state| Some(state.cleared()))
    }

    fn begin(&self, text: &str) -> Result<PendingSend<'_, B>> {
        let mut generation = None;
        self.state.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            generation = Some(state.generation);
            *state = Arc::new(state.begin(Message::user(text)));
            true
        });
        match generation {
            Some(generation) => {
                STORE_SENDS.click();
                Ok(PendingSend {
                    store: self,
                    generation,
                    settled: false,
                })
            }
            None => {
                STORE_BUSY_REJECTIONS.click();
                tracing::debug!("send rejected while another is outstanding");
                Err(Error::Busy)
            }
        }
    }

    fn settle(&self, generation: u64, outcome: Result<Option<String>>) -> Arc<ConversationState> {
        if let Err(e) = &outcome {
            STORE_SEND_FAILURES.click();
            tracing::warn!(error = %e, "send failed");
        }
        self.publish(|state| {
            if state.generation != generation {
                tracing::debug!("dropping reply to a cleared conversation");
                return None;
            }
            Some(match &outcome {
                Ok(reply) => state.reply(reply.as_ref().map(Message::assistant)),
                Err(e) => state.fail(e.user_message()),
            })
        })
    }

    fn publish<F>(&self, next: F) -> Arc<ConversationState>
    where
        F: FnOnce(&ConversationState) -> Option<ConversationState>,
    {
        let mut published = None;
        self.state.send_if_modified(|state| match next(&**state) {
            Some(next) => {
                let next = Arc::new(next);
                published = Some(next.clone());
                *state = next;
                true
            }
            None => {
                published = Some(state.clone());
                false
            }
        });
        published.unwrap_or_else(|| self.snapshot())
    }
}

/// An outstanding send.  Dropping it unsettled clears `loading`.
struct PendingSend<'a, B: CompletionBackend> {
    store: &'a ConversationStore<B>,
    generation: u64,
    settled: bool,
}

impl<B: CompletionBackend> PendingSend<'_, B> {
    fn settle(mut self, outcome: Result<Option<String>>) -> Arc<ConversationState> {
        self.settled = true;
        self.store.settle(self.generation, outcome)
    }
}

impl<B: CompletionBackend> Drop for PendingSend<'_, B> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        STORE_ABANDONED_SENDS.click();
        tracing::debug!("send dropped before its reply arrived");
        let generation = self.generation;
        self.store.publish(|state| {
            (state.generation == generation && state.loading).then(|| state.reply(None))
        });
    }
}
