//! Kernel capability bitmask parser
//!
//! Capability exports such as `capabilities/key` are whitespace-separated
//! hex words, one per `unsigned long`. On little-endian hosts the kernel
//! lists the most-significant word first, so the words are reversed here and
//! the first stored segment always holds logical bits `0..width`.
//!
//! Segment width comes from the export itself when the least-significant
//! token is zero-padded to a whole word (`00000000 0000001c` is two 32-bit
//! words). The kernel usually prints words unpadded (`70000 0 0 0 0`), and
//! then the only reliable width is the host's `unsigned long`.

use crate::platform::ByteOrder;
use crate::{Error, Result};

/// Widest word the parser accepts, in hex digits
const MAX_WORD_DIGITS: usize = 16;

/// Bits in the kernel's `unsigned long` on this host
pub const HOST_WORD_BITS: u32 = (std::mem::size_of::<libc::c_ulong>() * 8) as u32;

/// Parsed multi-segment bit vector
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmask {
    /// Segments in logical order; bit 0 lives in `segments[0]`
    segments: Vec<u64>,
    /// Bits per segment
    segment_width: u32,
}

impl Bitmask {
    /// Parse a capability export.
    ///
    /// # Errors
    /// Returns `Error::Format` if any token is not hex, is wider than 64 bits,
    /// or holds bits beyond the segment width.
    pub fn parse(text: &str, order: ByteOrder) -> Result<Self> {
        let mut tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Self::default());
        }

        if order.reverses_word_order() {
            tokens.reverse();
        }

        let segments = tokens
            .iter()
            .map(|token| parse_word(token))
            .collect::<Result<Vec<u64>>>()?;

        let segment_width = segment_width(&tokens);

        if segment_width < 64 {
            if let Some((index, word)) = segments
                .iter()
                .enumerate()
                .find(|(_, word)| **word >> segment_width != 0)
            {
                return Err(Error::Format(format!(
                    "segment {} ({:#x}) does not fit in {} bits",
                    index, word, segment_width
                )));
            }
        }

        Ok(Self {
            segments,
            segment_width,
        })
    }

    /// Build a bitmask from segments already in logical order
    pub fn from_segments(segments: Vec<u64>, segment_width: u32) -> Self {
        assert!(
            (1..=64).contains(&segment_width),
            "segment width must be between 1 and 64 bits"
        );
        Self {
            segments,
            segment_width,
        }
    }

    /// Segments in logical order
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Bits per segment (0 for an empty mask)
    pub fn segment_width(&self) -> u32 {
        self.segment_width
    }

    /// Total number of addressable bits
    pub fn bit_len(&self) -> usize {
        self.segments.len() * self.segment_width as usize
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Test logical bit `index`. Out-of-range bits read as unset.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        let width = self.segment_width as usize;
        if width == 0 {
            return false;
        }
        match self.segments.get(index / width) {
            Some(word) => (word >> (index % width)) & 1 == 1,
            None => false,
        }
    }

    /// Indices of every set bit, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        let width = self.segment_width as usize;
        self.segments
            .iter()
            .enumerate()
            .flat_map(move |(i, word)| {
                (0..width)
                    .filter(move |bit| (word >> bit) & 1 == 1)
                    .map(move |bit| i * width + bit)
            })
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.segments.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Parse a capability export into logical-order segments
pub fn parse_bitmask(text: &str, order: ByteOrder) -> Result<Vec<u64>> {
    Bitmask::parse(text, order).map(|mask| mask.segments)
}

/// Width of one segment, given tokens in logical order
///
/// Kernel exports print words with `%lx`, so a narrower width is only taken
/// when some multi-digit token carries a leading zero.
fn segment_width(tokens: &[&str]) -> u32 {
    let first = tokens[0].len();
    let zero_padded = tokens
        .iter()
        .any(|token| token.len() > 1 && token.starts_with('0'));
    let padded = zero_padded
        && first % 2 == 0
        && (first / 2).is_power_of_two()
        && tokens.iter().all(|token| token.len() <= first);
    if padded {
        (first * 4) as u32
    } else {
        HOST_WORD_BITS
    }
}

fn parse_word(token: &str) -> Result<u64> {
    if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Format(format!("'{}' is not a hex word", token)));
    }
    if token.len() > MAX_WORD_DIGITS {
        return Err(Error::Format(format!(
            "'{}' is wider than 64 bits",
            token
        )));
    }
    u64::from_str_radix(token, 16)
        .map_err(|e| Error::Format(format!("'{}' is not a hex word: {}", token, e)))
}
