//! mockview-core — interview workflow, collaborator traits, and data model.
//!
//! The workflow is a small state machine: a [`controller::TurnController`]
//! asks novel questions grounded in retrieved passages, evaluates answers,
//! and hands the transcript to persistence when the user stops. Everything
//! that talks to a network or a database sits behind the traits in
//! [`traits`].

pub mod controller;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod model;
pub mod prompts;
pub mod question;
pub mod selector;
pub mod session;
pub mod traits;
