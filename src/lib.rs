pub mod app;
pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod form;
pub mod handler;
pub mod history;
pub mod links;
pub mod metadata;
pub mod planner;
pub mod prompts;
pub mod render;
pub mod server;
pub mod settings;
pub mod share;
pub mod storage;
pub mod terminal;
pub mod types;
