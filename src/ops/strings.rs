//! Per-flush string interning table.

use crate::error::DecodeError;
use indexmap::IndexMap;

/// Deduplicates display names and keys into small ids for one flush.
///
/// Id 0 is reserved for "no string". Ids are only meaningful inside the
/// message they were flushed with; the table is cleared afterwards.
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    entries: IndexMap<String, Vec<u32>>,
    encoded_len: usize,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `value`, returning its id (0 for `None`).
    pub fn intern(&mut self, value: Option<&str>) -> u32 {
        let Some(value) = value else {
            return 0;
        };
        if let Some(index) = self.entries.get_index_of(value) {
            return index as u32 + 1;
        }
        let code_points = encode_string(value);
        self.encoded_len += 1 + code_points.len();
        let (index, _) = self.entries.insert_full(value.to_string(), code_points);
        index as u32 + 1
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of integers the table occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    /// Append `[len, ...codepoints]` for every entry in id order.
    pub fn encode_into(&self, out: &mut Vec<u32>) {
        for code_points in self.entries.values() {
            out.push(code_points.len() as u32);
            out.extend_from_slice(code_points);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.encoded_len = 0;
    }
}

/// Expand a string into Unicode scalar values.
pub fn encode_string(value: &str) -> Vec<u32> {
    value.chars().map(u32::from).collect()
}

/// Reverse of [`encode_string`].
pub fn decode_string(code_points: &[u32]) -> Result<String, DecodeError> {
    code_points
        .iter()
        .map(|&cp| char::from_u32(cp).ok_or(DecodeError::InvalidCodePoint(cp)))
        .collect()
}
