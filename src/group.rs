//! Control-byte groups and the match primitives the probing engine is built
//! on.
//!
//! A group is 16 control bytes, one per slot. A byte of [`EMPTY`] marks a free
//! slot and any other value is the 7-bit tag of the key stored there. The
//! match functions classify all 16 bytes at once and return a [`BitMask`]
//! where bit `i` corresponds to position `i` of the group.

/// Number of control bytes (and slots) per group.
pub(crate) const GROUP_WIDTH: usize = 16;

/// Control byte value marking an empty slot. Never a valid tag.
pub(crate) const EMPTY: u8 = 0;

/// A set of positions within one group, one bit per position.
///
/// Iterating yields positions in increasing order, lowest bit first, which
/// keeps the probe order within a group deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitMask(pub(crate) u16);

impl BitMask {
    #[cfg(test)]
    #[inline(always)]
    pub(crate) fn any(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let pos = self.lowest_set_bit()?;
        self.0 &= self.0 - 1;
        Some(pos)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitMask {}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(16))]
pub(crate) struct Group {
    ctrl: [u8; GROUP_WIDTH],
}

impl Group {
    pub(crate) const EMPTY: Group = Group {
        ctrl: [EMPTY; GROUP_WIDTH],
    };

    /// Positions whose control byte equals `tag`.
    #[inline(always)]
    pub(crate) fn match_tag(&self, tag: u8) -> BitMask {
        debug_assert!(tag != EMPTY);
        self.match_byte(tag)
    }

    /// Positions that are free.
    #[inline(always)]
    pub(crate) fn match_empty(&self) -> BitMask {
        self.match_byte(EMPTY)
    }

    /// Positions that hold a live entry.
    #[inline(always)]
    pub(crate) fn match_full(&self) -> BitMask {
        BitMask(!self.match_empty().0)
    }

    #[inline(always)]
    fn match_byte(&self, byte: u8) -> BitMask {
        #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
        {
            return self.match_byte_sse2(byte);
        }

        #[allow(unreachable_code)]
        {
            let mut bits: u16 = 0;
            for (i, &b) in self.ctrl.iter().enumerate() {
                if b == byte {
                    bits |= 1 << i;
                }
            }
            BitMask(bits)
        }
    }

    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    #[inline(always)]
    fn match_byte_sse2(&self, byte: u8) -> BitMask {
        use core::arch::x86_64::*;
        // SAFETY: `Group` is `#[repr(C, align(16))]` with `ctrl` at offset 0,
        // so the 16 bytes are aligned for `_mm_load_si128`.
        unsafe {
            let data = _mm_load_si128(self.ctrl.as_ptr() as *const __m128i);
            let cmp = _mm_cmpeq_epi8(data, _mm_set1_epi8(byte as i8));
            BitMask(_mm_movemask_epi8(cmp) as u16)
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self, pos: usize) -> u8 {
        self.ctrl[pos]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, pos: usize, tag: u8) {
        debug_assert!(tag != EMPTY && tag < 0x80);
        debug_assert!(self.ctrl[pos] == EMPTY);
        self.ctrl[pos] = tag;
    }

    #[inline(always)]
    pub(crate) fn clear(&mut self, pos: usize) {
        debug_assert!(self.ctrl[pos] != EMPTY);
        self.ctrl[pos] = EMPTY;
    }

    #[inline(always)]
    pub(crate) fn bytes(&self) -> &[u8; GROUP_WIDTH] {
        &self.ctrl
    }
}
