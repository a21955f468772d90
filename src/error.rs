/// The error type for [`HashTable::try_reserve`] and
/// [`HashMap::try_reserve`].
///
/// [`HashTable::try_reserve`]: crate::HashTable::try_reserve
/// [`HashMap::try_reserve`]: crate::HashMap::try_reserve
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested element count needs more slots than fit in a `usize`.
    #[error("requested capacity of {requested} elements overflows the slot count")]
    CapacityOverflow {
        /// The total number of elements the table was asked to hold.
        requested: usize,
    },

    /// The allocator could not provide memory for the grown table.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// The layout of the allocation that failed.
        layout: core::alloc::Layout,
    },
}
