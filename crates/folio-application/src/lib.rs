//! Application layer for GitFolio.
//!
//! This crate holds the submission state machine, the typing reveal and the
//! use case that runs both against a backend and a preview surface.

pub mod chat_portfolio_usecase;
pub mod orchestrator;
pub mod reveal;

pub use chat_portfolio_usecase::{ChatPortfolioHandle, ChatPortfolioUseCase, ChatView};
pub use orchestrator::{Orchestrator, PendingSubmission, Phase, SubmitRejected};
pub use reveal::{DelayGenerator, FixedDelay, RevealEngine, UniformDelay};
