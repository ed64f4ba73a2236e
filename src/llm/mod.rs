//! Model-caller abstraction and concrete bindings.
//!
//! The crate talks to hosted language models through the [`ModelCaller`]
//! trait only: a list of role-tagged [`Message`]s in, the complete output
//! text (or a [`CompletionStream`] of chunks) out. [`RigCaller`] binds the
//! trait to any Rig completion provider; the applications instantiate it
//! with the Gemini provider at startup.

pub mod message;
pub mod provider;
pub mod rig_adapter;

pub use message::{Message, Role};
pub use provider::{CompletionStream, ModelCaller, ModelError, TextChunk};
pub use rig_adapter::RigCaller;
