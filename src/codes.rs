//! The reserved codes of the LZW stream.
use crate::error::{Result, Unsupported};
use crate::Code;

/// The reserved codes layered directly above the data alphabet.
///
/// For an alphabet of `data_bits` bits the literal codes are `0..1 << data_bits`, followed by:
///
///  * `end_of_stream      == 1 << data_bits`
///  * `increase_code_size == end_of_stream + 1`
///  * `clear_dictionary   == end_of_stream + 2`
///  * `empty              == end_of_stream + 3`, marks unused dictionary slots
///  * `first_code         == end_of_stream + 4`, the first code assigned to a string
///
/// Code width changes are explicit: the encoder emits `increase_code_size` and both sides
/// widen by one bit. There is no deferred clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeTable {
    data_bits: u8,
    end_of_stream: Code,
    increase_code_size: Code,
    clear_dictionary: Code,
    empty: Code,
    first_code: Code,
}

impl CodeTable {
    /// The layout for an alphabet of `data_bits` bits, between 1 and 8.
    pub fn new(data_bits: u8) -> Result<Self> {
        if !(1..=8).contains(&data_bits) {
            return Err(Unsupported::DataBits(data_bits).into());
        }
        Ok(CodeTable::layout(data_bits))
    }

    fn layout(data_bits: u8) -> Self {
        let end_of_stream = 1 << data_bits;
        CodeTable {
            data_bits,
            end_of_stream,
            increase_code_size: end_of_stream + 1,
            clear_dictionary: end_of_stream + 2,
            empty: end_of_stream + 3,
            first_code: end_of_stream + 4,
        }
    }

    pub fn data_bits(&self) -> u8 {
        self.data_bits
    }

    pub fn end_of_stream(&self) -> Code {
        self.end_of_stream
    }

    pub fn increase_code_size(&self) -> Code {
        self.increase_code_size
    }

    pub fn clear_dictionary(&self) -> Code {
        self.clear_dictionary
    }

    pub fn empty(&self) -> Code {
        self.empty
    }

    pub fn first_code(&self) -> Code {
        self.first_code
    }

    /// Whether `code` stands for a single symbol of the alphabet.
    pub fn is_literal(&self, code: Code) -> bool {
        code < self.end_of_stream
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        CodeTable::layout(8)
    }
}

#[cfg(test)]
mod tests {
    use super::CodeTable;
    use crate::error::{Error, Unsupported};

    #[test]
    fn byte_alphabet_layout() {
        let codes = CodeTable::default();
        assert_eq!(codes.end_of_stream(), 256);
        assert_eq!(codes.increase_code_size(), 257);
        assert_eq!(codes.clear_dictionary(), 258);
        assert_eq!(codes.empty(), 259);
        assert_eq!(codes.first_code(), 260);
        assert!(codes.is_literal(255));
        assert!(!codes.is_literal(256));
    }

    #[test]
    fn reserved_codes_follow_alphabet() {
        for bits in 1..=8 {
            let codes = CodeTable::new(bits).unwrap();
            let reserved = [
                codes.end_of_stream(),
                codes.increase_code_size(),
                codes.clear_dictionary(),
                codes.empty(),
                codes.first_code(),
            ];
            assert_eq!(reserved[0], 1 << bits);
            assert!(reserved.windows(2).all(|w| w[0] + 1 == w[1]));
        }
    }

    #[test]
    fn alphabet_width_checked() {
        for &bits in &[0u8, 9, 16] {
            assert!(matches!(
                CodeTable::new(bits),
                Err(Error::UnsupportedConfiguration(Unsupported::DataBits(b))) if b == bits
            ));
        }
        assert_eq!(CodeTable::new(8).unwrap(), CodeTable::default());
    }
}
