//! Decoding of flushed operation payloads.

use crate::error::DecodeError;
use crate::host::ElementType;
use crate::ops::operation::{opcode, Operation};
use crate::ops::strings::decode_string;
use crate::types::{SourceId, StableId, NO_ID};
use serde::Serialize;

/// One decoded flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    pub source_id: SourceId,
    pub root_id: StableId,
    /// String table in id order; id `n` is `strings[n - 1]`.
    pub strings: Vec<String>,
    pub operations: Vec<Operation>,
}

impl DecodedMessage {
    /// Resolve a string id (0 is `None`).
    pub fn string(&self, id: u32) -> Result<Option<&str>, DecodeError> {
        if id == 0 {
            return Ok(None);
        }
        self.strings
            .get(id as usize - 1)
            .map(|s| Some(s.as_str()))
            .ok_or(DecodeError::UnknownStringId(id))
    }
}

struct Cursor<'a> {
    data: &'a [u32],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Result<u32, DecodeError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(value)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u32], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::Truncated(self.data.len()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn id(&mut self) -> Result<StableId, DecodeError> {
        self.next().map(StableId::new)
    }

    fn ids(&mut self) -> Result<Vec<StableId>, DecodeError> {
        let count = self.next()? as usize;
        Ok(self.take(count)?.iter().copied().map(StableId::new).collect())
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Decode a payload produced by [`crate::ops::OperationEncoder::flush`].
pub fn decode_operations(payload: &[u32]) -> Result<DecodedMessage, DecodeError> {
    let mut cursor = Cursor {
        data: payload,
        pos: 0,
    };
    let source_id = cursor.next()?;
    let root_id = cursor.id()?;
    let table_len = cursor.next()? as usize;
    let available = payload.len().saturating_sub(cursor.pos);
    if table_len > available {
        return Err(DecodeError::StringTableOverrun {
            declared: table_len,
            available,
        });
    }

    let table = cursor.take(table_len)?;
    let mut strings = Vec::new();
    let mut table_cursor = Cursor {
        data: table,
        pos: 0,
    };
    while !table_cursor.done() {
        let len = table_cursor.next()? as usize;
        strings.push(decode_string(table_cursor.take(len)?)?);
    }

    let mut operations = Vec::new();
    while !cursor.done() {
        let offset = cursor.pos;
        let op = match cursor.next()? {
            opcode::ADD => {
                let id = cursor.id()?;
                let code = cursor.next()?;
                let element_type = ElementType::from_code(code)
                    .ok_or(DecodeError::UnknownElementType { code, offset })?;
                if element_type == ElementType::Root {
                    Operation::AddRoot {
                        id,
                        flags: cursor.next()?,
                    }
                } else {
                    let parent_id = cursor.id()?;
                    let owner = cursor.next()?;
                    Operation::Add {
                        id,
                        element_type,
                        parent_id,
                        owner_id: (owner != NO_ID).then(|| StableId::new(owner)),
                        name_id: cursor.next()?,
                        key_id: cursor.next()?,
                    }
                }
            }
            opcode::REMOVE => Operation::Remove { ids: cursor.ids()? },
            opcode::REORDER => Operation::Reorder {
                id: cursor.id()?,
                children: cursor.ids()?,
            },
            opcode::UPDATE_DURATION => Operation::UpdateDuration {
                id: cursor.id()?,
                duration: cursor.next()?,
            },
            opcode::UPDATE_ERROR_WARNING_COUNTS => Operation::UpdateErrorWarningCounts {
                id: cursor.id()?,
                errors: cursor.next()?,
                warnings: cursor.next()?,
            },
            opcode::REMOVE_ROOT => Operation::RemoveRoot,
            opcode::SET_SUBTREE_MODE => Operation::SetSubtreeMode {
                id: cursor.id()?,
                mode: cursor.next()?,
            },
            other => {
                return Err(DecodeError::UnknownOpcode {
                    opcode: other,
                    offset,
                })
            }
        };
        operations.push(op);
    }

    let message = DecodedMessage {
        source_id,
        root_id,
        strings,
        operations,
    };
    for op in &message.operations {
        if let Operation::Add {
            name_id, key_id, ..
        } = op
        {
            message.string(*name_id)?;
            message.string(*key_id)?;
        }
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::encoder::OperationEncoder;
    use crate::ops::operation::root_flags;

    #[test]
    fn round_trip_reproduces_facts_and_names() {
        let mut encoder = OperationEncoder::new();
        encoder.push_op(Operation::AddRoot {
            id: StableId::new(1),
            flags: root_flags::SUPPORTS_PROFILING,
        });
        let name = encoder.intern(Some("Ünïcode😀"));
        let key = encoder.intern(Some("row-1"));
        encoder.push_op(Operation::Add {
            id: StableId::new(2),
            element_type: ElementType::Class,
            parent_id: StableId::new(1),
            owner_id: Some(StableId::new(1)),
            name_id: name,
            key_id: key,
        });
        encoder.push_op(Operation::Reorder {
            id: StableId::new(1),
            children: vec![StableId::new(2)],
        });
        encoder.record_unmount(StableId::new(9), false);

        let payload = encoder.flush(7, StableId::new(1)).unwrap();
        let decoded = decode_operations(&payload).unwrap();
        assert_eq!(decoded.source_id, 7);
        assert_eq!(decoded.root_id, StableId::new(1));
        assert_eq!(decoded.strings, vec!["Ünïcode😀", "row-1"]);
        assert_eq!(decoded.operations.len(), 4);
        assert_eq!(
            decoded.operations[0],
            Operation::Remove {
                ids: vec![StableId::new(9)]
            }
        );
        match &decoded.operations[2] {
            Operation::Add {
                name_id, key_id, owner_id, ..
            } => {
                assert_eq!(decoded.string(*name_id).unwrap(), Some("Ünïcode😀"));
                assert_eq!(decoded.string(*key_id).unwrap(), Some("row-1"));
                assert_eq!(*owner_id, Some(StableId::new(1)));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert!(matches!(
            decode_operations(&[1, 1]),
            Err(DecodeError::Truncated(_))
        ));
        assert!(matches!(
            decode_operations(&[1, 1, 0, opcode::REORDER, 1, 3, 2]),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn string_table_overrun_is_rejected() {
        assert_eq!(
            decode_operations(&[1, 1, 5, 1, 65]),
            Err(DecodeError::StringTableOverrun {
                declared: 5,
                available: 2
            })
        );
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert_eq!(
            decode_operations(&[1, 1, 0, 42]),
            Err(DecodeError::UnknownOpcode {
                opcode: 42,
                offset: 3
            })
        );
    }

    #[test]
    fn dangling_string_id_is_rejected() {
        let payload = vec![1, 1, 0, opcode::ADD, 2, 5, 1, 0, 3, 0];
        assert_eq!(
            decode_operations(&payload),
            Err(DecodeError::UnknownStringId(3))
        );
    }
}
