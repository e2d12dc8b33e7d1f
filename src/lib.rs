pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod labeler;
pub mod output;
pub mod parser;
