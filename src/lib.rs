pub mod app;
pub mod config;
pub mod das;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod mapper;
pub mod normalize;
pub mod output;
pub mod prompt;
pub mod store;
pub mod sync;
