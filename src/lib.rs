//! BirdScope - bird identification backend
//!
//! This library provides the core functionality for the BirdScope backend:
//! accounts and sessions, the subscription entitlement engine with its daily
//! scan ledger, the identification flow, and the REST API.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
