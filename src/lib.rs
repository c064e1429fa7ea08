pub mod blocker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fusion;
pub mod llm;
pub mod models;
pub mod probes;
pub mod reputation;
pub mod session;
pub mod store;
