pub mod aggregate;
pub mod config;
pub mod daemon;
pub mod error;
pub mod http_client;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod report;
pub mod runtime;
pub mod schedule;
pub mod sources;
pub mod storage;

#[cfg(test)]
mod testing;
