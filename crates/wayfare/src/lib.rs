//! Travel Advisor Chat Library
//!
//! This library provides the core components for the wayfare travel-advisor
//! chat server: the transcript codec, the event dispatcher, the conversation
//! store, the agent coordinator, and the HTTP API.

pub mod agent;
pub mod api;
pub mod db;
pub mod dispatch;
pub mod store;
pub mod transcript;
pub mod user;
