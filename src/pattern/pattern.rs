// Wed Oct 14 2026 - Alex

use crate::pattern::PatternError;
use std::fmt;

/// Byte signature with wildcards, written IDA style: `E8 ?? ?? ?? ?? 48 C7 04`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Pattern {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            mask: vec![true; bytes.len()],
        }
    }

    pub fn from_ida_pattern(pattern: &str) -> Result<Self, PatternError> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in pattern.split_whitespace() {
            if token.chars().all(|c| c == '?') && token.len() <= 2 {
                bytes.push(0);
                mask.push(false);
            } else if token.len() == 2 {
                let byte = u8::from_str_radix(token, 16).map_err(|_| PatternError::InvalidToken(token.to_string()))?;
                bytes.push(byte);
                mask.push(true);
            } else {
                return Err(PatternError::InvalidToken(token.to_string()));
            }
        }

        if bytes.is_empty() {
            return Err(PatternError::Empty);
        }
        if !mask.iter().any(|&m| m) {
            return Err(PatternError::AllWildcards);
        }

        Ok(Self { bytes, mask })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.bytes.len() {
            return false;
        }

        self.bytes
            .iter()
            .zip(self.mask.iter())
            .zip(data.iter())
            .all(|((pattern_byte, &significant), &data_byte)| !significant || *pattern_byte == data_byte)
    }

    pub fn find_all_in(&self, data: &[u8]) -> Vec<usize> {
        let mut results = Vec::new();

        if self.bytes.is_empty() || data.len() < self.bytes.len() {
            return results;
        }

        let first_significant = self.mask.iter().position(|&m| m).unwrap_or(0);
        let first_byte = self.bytes[first_significant];

        for i in 0..=(data.len() - self.bytes.len()) {
            if data[i + first_significant] == first_byte && self.matches(&data[i..]) {
                results.push(i);
            }
        }

        results
    }

    pub fn to_hex_string(&self) -> String {
        self.bytes
            .iter()
            .zip(self.mask.iter())
            .map(|(b, &m)| if m { format!("{:02X}", b) } else { "??".to_string() })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}
