//! NutriAI core: meal-photo nutrition analysis over an unreliable,
//! rate-limited multimodal inference service.
//!
//! The crate is built around three pieces: the inference request
//! orchestrator (credential rotation + retry/backoff + response validation),
//! the session/analysis state machine, and the nutrition data model with its
//! persistence contract. Rendering is someone else's job.

pub mod analysis;
pub mod app;
pub mod codec;
pub mod config;
pub mod history;
pub mod inference;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;
