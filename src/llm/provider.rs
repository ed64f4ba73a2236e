//! The model-caller abstraction.
//!
//! [`ModelCaller`] is the single seam between the pipeline/chat code and any
//! hosted completion API: it takes a list of role-tagged messages and returns
//! the complete output text, or a pull-based stream of text chunks. Concrete
//! bindings live in [`crate::llm::rig_adapter`]; tests use scripted mock
//! implementations.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;

use super::message::Message;

/// Errors produced by a model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider rejected or failed the completion call.
    #[error("{0}")]
    Provider(String),

    /// The stream broke mid-response.
    #[error("response stream interrupted: {0}")]
    Stream(String),
}

/// One fragment of a streamed completion.
///
/// Chunks arrive in generation order with none skipped; concatenating the
/// `content` of every chunk reconstructs the full completion text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    /// Set on the last chunk of the response.
    pub is_final: bool,
}

/// Pull-based stream of completion chunks.
///
/// The consumer drives the stream; abandoning it (dropping without reading
/// to the end) cancels the response. Any underlying network handle is owned
/// by the inner future and released on drop.
pub struct CompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<TextChunk, ModelError>> + Send>>,
}

impl CompletionStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<TextChunk, ModelError>> + Send + 'static,
    {
        Self { inner: Box::pin(stream) }
    }

    /// Wrap an already-complete response as a single-chunk stream.
    ///
    /// Used by callers that do not support native streaming.
    pub fn from_complete(text: String) -> Self {
        let chunk = TextChunk { content: text, is_final: true };
        Self::new(futures::stream::once(async move { Ok(chunk) }))
    }

    /// Read the stream to the end and concatenate the chunks.
    pub async fn collect_text(mut self) -> Result<String, ModelError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?.content);
        }
        Ok(text)
    }
}

impl Stream for CompletionStream {
    type Item = Result<TextChunk, ModelError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Abstract capability over a hosted completion API.
///
/// The pipeline treats `complete` as a blocking call returning the full
/// output text; `stream` is the incremental variant used by the chat
/// surface. The default `stream` falls back to `complete`, so providers
/// without native streaming stay correct.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    /// Invoke the model with the given messages, returning the complete
    /// output text.
    async fn complete(&self, messages: &[Message]) -> Result<String, ModelError>;

    /// Invoke the model and stream the output chunk by chunk.
    async fn stream(&self, messages: &[Message]) -> Result<CompletionStream, ModelError> {
        let text = self.complete(messages).await?;
        Ok(CompletionStream::from_complete(text))
    }

    /// Provider/model name for logging.
    fn name(&self) -> &str;
}
