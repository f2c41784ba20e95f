/// Smallest width a section's block storage may use.
pub const MIN_BITS: u8 = 4;

/// Fixed-width unsigned integers packed into 64-bit words, least significant bits first.
/// An entry may straddle two words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArray {
    bits: u8,
    len: usize,
    mask: u64,
    words: Vec<u64>,
}

fn words_for(bits: u8, len: usize) -> usize {
    (len * bits as usize + 63) / 64
}

/// `ceil(log2(n))`, with 0 for n <= 1.
pub fn ceil_log2(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

impl PackedArray {
    pub fn new(bits: u8, len: usize) -> Self {
        assert!(
            (1..=32).contains(&bits),
            "bits per entry must be within 1..=32, got {}",
            bits
        );
        PackedArray {
            bits,
            len,
            mask: (1u64 << bits) - 1,
            words: vec![0; words_for(bits, len)],
        }
    }

    /// Rebuilds an array from persisted words. `None` when the word count does not fit.
    pub fn from_words(bits: u8, len: usize, words: Vec<u64>) -> Option<Self> {
        if !(1..=32).contains(&bits) || words.len() != words_for(bits, len) {
            return None;
        }
        Some(PackedArray {
            bits,
            len,
            mask: (1u64 << bits) - 1,
            words,
        })
    }

    /// Width for a section palette of `size` entries: `max(4, ceil(log2(size)))`.
    pub fn bits_for_palette(size: usize) -> u8 {
        ceil_log2(size).max(MIN_BITS)
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u64> {
        self.words
    }

    /// Panics when `value` does not fit in the configured width: the width is chosen from the
    /// final palette, so an oversized value means the palette grew after packing started.
    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.len, "index {} out of range for {} entries", index, self.len);
        let value = value as u64;
        assert!(
            value <= self.mask,
            "value {} does not fit in {} bits",
            value,
            self.bits
        );

        let bits = self.bits as usize;
        let start_long = (index * bits) / 64;
        let start_offset = (index * bits) % 64;

        self.words[start_long] &= !(self.mask << start_offset);
        self.words[start_long] |= value << start_offset;

        if start_offset + bits > 64 {
            let spilled = 64 - start_offset;
            self.words[start_long + 1] &= !(self.mask >> spilled);
            self.words[start_long + 1] |= value >> spilled;
        }
    }

    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len, "index {} out of range for {} entries", index, self.len);

        let bits = self.bits as usize;
        let start_long = (index * bits) / 64;
        let start_offset = (index * bits) % 64;

        let mut value = self.words[start_long] >> start_offset;
        if start_offset + bits > 64 {
            value |= self.words[start_long + 1] << (64 - start_offset);
        }
        (value & self.mask) as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }
}
