pub mod config;
pub mod rewrite_id;
pub mod upload;
