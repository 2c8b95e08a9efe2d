//! # Bytecode Matching
//!
//! Selector extraction from call data and masked bytecode patterns.
//!
//! Compiled artifacts of contracts that use external libraries carry linker
//! placeholders instead of library addresses:
//!
//! - `__$<34 hex>$__` / `__LibName______...` (40 hex chars, 20 bytes)
//! - `73ffffffffffffffffffffffffffffffffffffffff` (`PUSH20` + self address of a library)
//!
//! Both are compiled into masked regions so that a linked deployment still matches
//! the unlinked artifact. Every other byte must match exactly.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Leading four bytes of call data.
pub type Selector = [u8; 4];

const SELECTOR_LEN: usize = 4;
const PLACEHOLDER_HEX_LEN: usize = 40;
const LIBRARY_MARKER_HEX_LEN: usize = 42;

/// Returns the selector of `input`, or `None` when the call data is shorter than a selector.
pub fn selector_of(input: &[u8]) -> Option<Selector> {
    input.get(..SELECTOR_LEN)?.try_into().ok()
}

/// Lowercase hex of a selector without `0x`.
pub fn selector_hex(selector: &Selector) -> String {
    hex::encode(selector)
}

/// Bytecode with optional wildcard regions left by the linker.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BytecodePattern {
    bytes: Vec<u8>,
    masked: Vec<Range<usize>>,
}

impl BytecodePattern {
    /// Pattern without wildcard regions.
    pub fn exact(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            masked: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Interfaces and abstract contracts compile to `0x`.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_placeholders(&self) -> bool {
        !self.masked.is_empty()
    }

    /// True if this pattern matches the leading bytes of `input`.
    ///
    /// Deployment call data is the creation bytecode followed by ABI-encoded
    /// constructor arguments, so only the first `self.len()` bytes are compared.
    pub fn is_prefix_of(&self, input: &[u8]) -> bool {
        if self.is_empty() || input.len() < self.bytes.len() {
            return false;
        }
        self.matches_window(&input[..self.bytes.len()])
    }

    /// True if `code` has exactly this pattern's length and matches it.
    pub fn matches_exact(&self, code: &[u8]) -> bool {
        !self.is_empty() && code.len() == self.bytes.len() && self.matches_window(code)
    }

    fn matches_window(&self, window: &[u8]) -> bool {
        let mut pos = 0;
        for region in &self.masked {
            if self.bytes[pos..region.start] != window[pos..region.start] {
                return false;
            }
            pos = region.end;
        }
        self.bytes[pos..] == window[pos..]
    }
}

impl FromStr for BytecodePattern {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let chars = hex_str.as_bytes();

        let mut bytes = Vec::with_capacity(chars.len() / 2);
        let mut masked = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i..].starts_with(b"__") && i + PLACEHOLDER_HEX_LEN <= chars.len() {
                let start = bytes.len();
                bytes.extend_from_slice(&[0u8; 20]);
                masked.push(start..bytes.len());
                i += PLACEHOLDER_HEX_LEN;
                continue;
            }

            if chars[i..].starts_with(b"73")
                && i + LIBRARY_MARKER_HEX_LEN <= chars.len()
                && chars[i + 2..i + LIBRARY_MARKER_HEX_LEN]
                    .iter()
                    .all(|c| *c == b'f' || *c == b'F')
            {
                let start = bytes.len();
                bytes.push(0x73);
                bytes.extend_from_slice(&[0xffu8; 20]);
                masked.push(start..bytes.len());
                i += LIBRARY_MARKER_HEX_LEN;
                continue;
            }

            if i + 2 > chars.len() {
                return Err(hex::FromHexError::OddLength);
            }
            let hi = hex_nibble(chars[i], i)?;
            let lo = hex_nibble(chars[i + 1], i + 1)?;
            bytes.push((hi << 4) | lo);
            i += 2;
        }

        Ok(Self { bytes, masked })
    }
}

fn hex_nibble(c: u8, index: usize) -> Result<u8, hex::FromHexError> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or(hex::FromHexError::InvalidHexCharacter {
            c: c as char,
            index,
        })
}

impl fmt::Debug for BytecodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytecodePattern")
            .field("len", &self.bytes.len())
            .field("masked_regions", &self.masked.len())
            .finish()
    }
}
