//! Adapter binding a Rig agent to the [`ModelCaller`] contract.
//!
//! Rig agents take a single prompt string, so the role-tagged message list
//! is rendered down to one prompt: system instructions first, then the
//! conversation, with the final user message appearing bare. Streaming falls
//! back to the complete response wrapped as a single chunk.

use std::sync::Arc;

use async_trait::async_trait;
use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};

use super::message::{Message, Role};
use super::provider::{CompletionStream, ModelCaller, ModelError};

/// Wraps a `rig::agent::Agent` as a [`ModelCaller`].
pub struct RigCaller<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    model_name: String,
}

impl<M> RigCaller<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>, model_name: impl Into<String>) -> Self {
        Self { agent: Arc::new(agent), model_name: model_name.into() }
    }
}

#[async_trait]
impl<M> ModelCaller for RigCaller<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(&self, messages: &[Message]) -> Result<String, ModelError> {
        let prompt = render_messages(messages);
        self.agent
            .prompt(&prompt)
            .await
            .map_err(|e| ModelError::Provider(e.to_string()))
    }

    async fn stream(&self, messages: &[Message]) -> Result<CompletionStream, ModelError> {
        let text = self.complete(messages).await?;
        Ok(CompletionStream::from_complete(text))
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Render a message list into a single prompt string.
///
/// System messages lead, earlier conversation turns carry role labels, and
/// the trailing user message is emitted bare so single-turn pipeline prompts
/// reach the model unchanged.
fn render_messages(messages: &[Message]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let last_user = messages
        .iter()
        .rposition(|m| m.role == Role::User);

    for (idx, message) in messages.iter().enumerate() {
        match message.role {
            Role::System => parts.push(message.content.clone()),
            Role::User if Some(idx) == last_user => parts.push(message.content.clone()),
            Role::User => parts.push(format!("User: {}", message.content)),
            Role::Assistant => parts.push(format!("Assistant: {}", message.content)),
        }
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_turn_prompt_is_system_plus_bare_user() {
        let rendered = render_messages(&[
            Message::system("You are a professional research analyst."),
            Message::user("Analyze the following."),
        ]);
        assert_eq!(
            rendered,
            "You are a professional research analyst.\n\nAnalyze the following."
        );
    }

    #[test]
    fn history_turns_are_labelled() {
        let rendered = render_messages(&[
            Message::system("sys"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ]);
        assert_eq!(rendered, "sys\n\nUser: first\n\nAssistant: reply\n\nsecond");
    }
}
