//! Travel-advisor agent: the external completion client and the
//! coordinator that bridges submitted user messages to background calls.

pub mod client;
pub mod coordinator;

pub use client::{AdvisorClient, AdvisorConfig, CompletionClient, CompletionTurn};
pub use coordinator::AgentCoordinator;
