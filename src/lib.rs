pub mod auth;
pub mod logging;
pub mod opt;
pub mod runner;
pub mod settings;
pub mod slack;
pub mod tasks;
pub mod upload;
