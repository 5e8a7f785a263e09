pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod outline;
pub mod prompt;
pub mod render;
pub mod session;
pub mod workflow;
