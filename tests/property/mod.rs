//! Property-based tests for the wire format and mirror consistency

mod encoding;
mod mirror_consistency;
