pub mod catalog;
pub mod config;
pub mod executor;
pub mod llm;
pub mod pipeline;
pub mod shaping;
pub mod suggest;
pub mod synth;
pub mod util;
pub mod warehouse;
pub mod web;
