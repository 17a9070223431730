pub mod api;
pub mod audit;
pub mod chat;
pub mod config;
pub mod context;
pub mod db;
pub mod extraction;
pub mod models;
pub mod pii_audit;
pub mod prompt;
pub mod sanitizer;
pub mod tenant;
pub mod worker;
