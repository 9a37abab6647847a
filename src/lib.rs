pub mod completion;
pub mod config;
pub mod errors;
pub mod kestra;
pub mod patch;
pub mod pipeline;
pub mod prompt;
pub mod relay;
pub mod repo;
pub mod server;
pub mod ui;
