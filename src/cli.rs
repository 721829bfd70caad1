//! CLI domain: parse, route, output and presentation only.
//! Route handlers call into the decoder, mirror and config layers.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_config, format_decoded_text, format_mirror_json, format_mirror_text};
pub use route::RunContext;
