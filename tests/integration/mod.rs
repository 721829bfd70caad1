//! Integration tests for the treeglass agent

mod bridge_delivery;
mod cli_binary;
mod config_integration;
mod filters;
mod mirror_stream;
mod multi_provider;
mod support;
