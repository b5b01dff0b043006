// Krayin CRM client - Library root for testing

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
