//! The string table shared by encoder and decoder.
//!
//! A fixed array of slots holding `(code, prefix, byte)`. The encoder addresses it through an
//! open addressing hash of `(prefix, byte)`, the decoder addresses it directly by code. A
//! single pass only ever uses one of the two modes. The table is never resized; unused slots
//! carry the `empty` code.
use crate::codes::CodeTable;
use crate::error::{Error, Result};
use crate::{Code, START_CODESIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    code: Code,
    prefix: Code,
    byte: u8,
}

/// Number of slots for a given maximum code size.
pub(crate) fn table_size(code_size: u8) -> usize {
    match code_size {
        12 => 5021,
        13 => 9029,
        14 => 18041,
        15 => 49063,
        _ => 4096,
    }
}

pub(crate) struct Dictionary {
    codes: CodeTable,
    entries: Box<[Entry]>,
    /// Moves the byte above the prefix bits in the hash.
    hash_shift: u8,
    max_code_size: u8,
    /// Codes are assigned strictly below this value.
    max_code: Code,
    next_code: Code,
    code_size: u8,
    overflow: bool,
}

impl Dictionary {
    pub(crate) fn new(codes: CodeTable, max_code_size: u8) -> Self {
        debug_assert!(max_code_size > START_CODESIZE && max_code_size <= 15);
        let empty = Entry {
            code: codes.empty(),
            prefix: codes.empty(),
            byte: 0,
        };
        let mut dict = Dictionary {
            codes,
            entries: vec![empty; table_size(max_code_size)].into_boxed_slice(),
            hash_shift: max_code_size - 8,
            max_code_size,
            max_code: ((1u32 << max_code_size) - 1) as Code,
            next_code: codes.first_code(),
            code_size: START_CODESIZE,
            overflow: false,
        };
        dict.reset();
        dict
    }

    /// Forget all strings and return to the start code size.
    pub(crate) fn reset(&mut self) {
        let empty = self.codes.empty();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            *entry = Entry {
                code: empty,
                prefix: empty,
                byte: index as u8,
            };
        }
        self.next_code = self.codes.first_code();
        self.code_size = START_CODESIZE;
        self.overflow = false;
    }

    /// Look up the string `prefix` extended by `byte`.
    ///
    /// Returns its code, or the vacant slot where it belongs.
    pub(crate) fn find(&self, prefix: Code, byte: u8) -> core::result::Result<Code, usize> {
        let size = self.entries.len();
        let mut index = (usize::from(byte) << self.hash_shift) ^ usize::from(prefix);
        debug_assert!(index < size);
        let offset = if index == 0 { 1 } else { size - index };

        loop {
            let entry = &self.entries[index];
            if entry.code == self.codes.empty() {
                return Err(index);
            }
            if entry.prefix == prefix && entry.byte == byte {
                return Ok(entry.code);
            }
            index = if index >= offset {
                index - offset
            } else {
                index + size - offset
            };
        }
    }

    /// Assign the next code to a string at a slot returned by `find`.
    ///
    /// Returns `None` and raises the overflow flag when no code is left.
    pub(crate) fn insert(&mut self, slot: usize, prefix: Code, byte: u8) -> Option<Code> {
        if self.next_code >= self.max_code {
            self.overflow = true;
            return None;
        }

        let code = self.next_code;
        self.entries[slot] = Entry { code, prefix, byte };
        self.next_code += 1;
        Some(code)
    }

    /// Assign the next code to a string, stored in the slot of the code itself.
    pub(crate) fn push(&mut self, prefix: Code, byte: u8) -> Option<Code> {
        let slot = usize::from(self.next_code);
        self.insert(slot, prefix, byte)
    }

    /// Write the string for `code` into `out` and return its first byte.
    ///
    /// Only valid for tables filled through `push`.
    pub(crate) fn expand(&self, code: Code, out: &mut Vec<u8>) -> Result<u8> {
        out.clear();
        let mut code = code;
        while !self.codes.is_literal(code) {
            if code < self.codes.first_code() || code >= self.next_code {
                return Err(Error::CorruptStream("code refers to an unassigned entry"));
            }
            if out.len() >= self.entries.len() {
                return Err(Error::CorruptStream("cyclic prefix chain"));
            }

            let entry = self.entries[usize::from(code)];
            out.push(entry.byte);
            code = entry.prefix;
        }

        out.push(code as u8);
        out.reverse();
        Ok(out[0])
    }

    /// Widen codes by one bit, returns false at the maximum size.
    pub(crate) fn grow(&mut self) -> bool {
        if self.code_size < self.max_code_size {
            self.code_size += 1;
            true
        } else {
            false
        }
    }

    /// Whether `code` does not fit below the largest value of the current width.
    pub(crate) fn needs_growth(&self, code: Code) -> bool {
        code >= self.current_max_code() && self.code_size < self.max_code_size
    }

    pub(crate) fn current_max_code(&self) -> Code {
        ((1u32 << self.code_size) - 1) as Code
    }

    pub(crate) fn code_size(&self) -> u8 {
        self.code_size
    }

    pub(crate) fn next_code(&self) -> Code {
        self.next_code
    }

    pub(crate) fn overflowed(&self) -> bool {
        self.overflow
    }
}
