//! Derivation of the two probe components from a 64-bit key digest.
//!
//! Every table operation reduces a key to a single `u64` digest (through a
//! [`BuildHasher`](core::hash::BuildHasher) at the map layer, or supplied
//! directly at the [`HashTable`](crate::HashTable) layer) and then splits it:
//!
//! - **H1**, the high 57 bits, selects the group where probing starts.
//! - **H2**, the low 7 bits, is the tag cached in the slot's control byte.
//!
//! A control byte of `0` marks an empty slot, so a digest whose low seven bits
//! are all zero is given the tag `1` instead.

/// Number of digest bits used for the control-byte tag.
pub const TAG_BITS: u32 = 7;

const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

/// The two components of a key digest used by the probing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitHash {
    /// Group-selecting component. Reduced modulo the group count to find the
    /// first group of the probe sequence.
    pub h1: u64,
    /// Tag stored in the control byte. Always in `1..=127`.
    pub h2: u8,
}

/// Splits a 64-bit digest into its group-selecting and tag components.
///
/// # Examples
///
/// ```rust
/// use swiss_table::hasher::split_hash;
///
/// let split = split_hash(0xABCD_0085);
/// assert_eq!(split.h1, 0xABCD_0085 >> 7);
/// assert_eq!(split.h2, 0x05);
///
/// // A zero tag is reserved for empty slots.
/// assert_eq!(split_hash(0x80).h2, 1);
/// ```
#[inline(always)]
pub fn split_hash(hash: u64) -> SplitHash {
    let h2 = match (hash & TAG_MASK) as u8 {
        0 => 1,
        tag => tag,
    };

    SplitHash {
        h1: hash >> TAG_BITS,
        h2,
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`SwissTable`](crate::SwissTable).
        ///
        /// Each instance is keyed with a fresh random seed, so two tables never
        /// share a hash function.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`SwissTable`](crate::SwissTable).
        ///
        /// Each instance is keyed with a fresh random seed, so two tables never
        /// share a hash function.
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}
