//! API endpoint handlers.

pub mod chat;
pub mod documents;
pub mod health;
pub mod onboarding;
pub mod records;
