//! Conversational commerce assistant.
//!
//! Buyers browse a catalog and place orders through a guided dialogue; admins
//! manage products, the order lifecycle and shop texts through a parallel
//! dialogue over the same channel. Every conversation holds exactly one
//! [`Operation`](domain::Operation), and the [`Controller`](controller::Controller)
//! routes each inbound event to the one flow that owns it.

pub mod actor_framework;
pub mod app_system;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod flows;
pub mod messages;
pub mod notify;
pub mod orders;
pub mod session_store;
pub mod settings;
pub mod store;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod mock_framework;
