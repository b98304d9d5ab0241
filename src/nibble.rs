use std::ops::{Index, IndexMut};

/// A 4-bit unsigned integer (nibble).
///
/// Register numbers and key numbers are nibbles, so indexing a `[T; 16]`
/// with a `u4` can never go out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub struct u4(u8);

impl u4 {
    /// The flag register VF.
    pub const F: u4 = u4(0xF);

    /// Creates a new `u4` from a `u8`.
    ///
    /// Panics if the value is greater than 0x0F.
    pub const fn new(value: u8) -> Self {
        assert!(value <= 0x0F, "u4 value must be in range 0x0-0xF");
        Self(value)
    }

    /// Creates a `u4` from the low four bits of `value`, discarding the rest.
    pub const fn low(value: u8) -> Self {
        Self(value & 0x0F)
    }
}

impl From<u4> for usize {
    fn from(v: u4) -> usize {
        v.0 as usize
    }
}

impl<T> Index<u4> for [T; 16] {
    type Output = T;

    fn index(&self, index: u4) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<u4> for [T; 16] {
    fn index_mut(&mut self, index: u4) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

/// Operand fields of a 16-bit opcode word `cxyn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fields {
    pub c: u4,
    pub x: u4,
    pub y: u4,
    pub n: u4,
    /// Low byte (`kk` / `nn`).
    pub nn: u8,
    /// Low 12 bits (an address).
    pub nnn: u16,
}

impl Fields {
    pub fn split(word: u16) -> Self {
        let [high, low] = word.to_be_bytes();

        Self {
            c: u4::low(high >> 4),
            x: u4::low(high),
            y: u4::low(low >> 4),
            n: u4::low(low),
            nn: low,
            nnn: word & 0x0FFF,
        }
    }

    /// The four nibbles as plain bytes, ready to be matched as a tuple.
    pub fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.c.0, self.x.0, self.y.0, self.n.0)
    }
}
