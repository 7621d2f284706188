pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod stats;
pub mod tracks;
pub mod velocity;
pub mod wind;
