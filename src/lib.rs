pub mod app;
pub mod behavior;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod light;
pub mod output;
pub mod resolver;
pub mod table;
pub mod time;
