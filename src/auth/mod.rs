// Authentication module
// Manages the bearer credential lifecycle against the CRM login endpoint

mod login;
mod manager;
mod types;

pub use manager::CredentialManager;
pub use types::{Credential, LoginSettings};
