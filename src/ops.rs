//! Operation stream
//!
//! Structural facts produced by the walker are encoded into a flat integer
//! array per flush: `[sourceId, rootId, stringTableLength, ...stringTable,
//! ...REMOVE batch, ...REMOVE_ROOT, ...ops]`.

pub mod decoder;
pub mod encoder;
pub mod operation;
pub mod strings;

pub use decoder::{decode_operations, DecodedMessage};
pub use encoder::OperationEncoder;
pub use operation::{duration_to_wire, opcode, root_flags, Operation, SUBTREE_MODE_STRICT};
pub use strings::StringTable;
