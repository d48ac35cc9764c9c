//! Multi-agent chat: a conversational front end over an external agent router.

pub mod app;
pub mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod presentation;
pub mod router;
pub mod terminal;
pub mod web;
