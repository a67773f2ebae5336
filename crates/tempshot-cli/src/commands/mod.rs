pub mod catalog;
pub mod config;
pub mod permission;
pub mod prompt;
