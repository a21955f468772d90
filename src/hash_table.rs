//! The raw Swiss Table: control-byte groups, slot storage, and the probing
//! engine shared by every operation.
//!
//! [`HashTable`] works on precomputed 64-bit hashes and caller-supplied
//! equality and rehash closures. [`HashMap`](crate::HashMap) layers keys and a
//! [`BuildHasher`](core::hash::BuildHasher) on top.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use crate::error::TryReserveError;
use crate::group::BitMask;
use crate::group::EMPTY;
use crate::group::GROUP_WIDTH;
use crate::group::Group;
use crate::hasher::SplitHash;
use crate::hasher::split_hash;

/// Smallest table: a single group.
const MIN_SLOTS: usize = GROUP_WIDTH;

/// Maximum number of live entries for a slot count, a 0.75 load factor.
///
/// Slot counts are powers of two no smaller than 16, so this is exact.
#[inline(always)]
fn max_load(slots: usize) -> usize {
    slots / 4 * 3
}

/// Smallest permitted slot count that holds `capacity` entries under the load
/// factor.
#[inline]
fn slots_for(capacity: usize) -> Option<usize> {
    let min_slots = capacity.checked_mul(4)?.div_ceil(3);
    min_slots.max(MIN_SLOTS).checked_next_power_of_two()
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("swiss table capacity overflow")
}

/// Unwraps the result of a reservation on an infallible path.
#[inline]
fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(TryReserveError::CapacityOverflow { .. }) => capacity_overflow(),
        Err(TryReserveError::AllocError { layout }) => alloc::alloc::handle_alloc_error(layout),
    }
}

/// An empty vector with room for exactly `len` elements.
fn try_alloc_vec<T>(len: usize, requested: usize) -> Result<Vec<T>, TryReserveError> {
    let layout =
        Layout::array::<T>(len).map_err(|_| TryReserveError::CapacityOverflow { requested })?;
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|_| TryReserveError::AllocError { layout })?;
    Ok(vec)
}

/// Outcome of [`HashTable::find_slot`]. Indices are absolute slot indices,
/// `group * 16 + position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSearch {
    /// The key lives at this slot.
    Found(usize),
    /// The key is absent; this is the first empty slot in probe order.
    Vacant(usize),
    /// The key is absent and no slot is free. The load factor policy keeps
    /// this from happening in a table that went through [`HashTable::entry`].
    Full,
}

/// Group indices in probe order: `start`, `start + 1`, ... wrapping at the
/// group count, each group visited exactly once.
struct ProbeSeq {
    group: usize,
    mask: usize,
    remaining: usize,
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let group = self.group;
        self.group = (self.group + 1) & self.mask;
        Some(group)
    }
}

/// Walks the occupied slots of a table in slot order.
///
/// The cursor stores no borrow so draining can clear slots as it advances.
#[derive(Clone)]
struct SlotCursor {
    group_index: usize,
    current: BitMask,
    remaining: usize,
}

impl SlotCursor {
    fn new(groups: &[Group], remaining: usize) -> Self {
        SlotCursor {
            group_index: 0,
            current: groups[0].match_full(),
            remaining,
        }
    }

    #[inline]
    fn next(&mut self, groups: &[Group]) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        loop {
            if let Some(pos) = self.current.next() {
                self.remaining -= 1;
                return Some(self.group_index * GROUP_WIDTH + pos);
            }
            self.group_index += 1;
            self.current = groups[self.group_index].match_full();
        }
    }
}

/// Histogram of probe distances for the current table state.
///
/// `bins()[d]` is the number of entries stored `d` groups past the group
/// their hash selects. Distances wrap around the end of the table.
///
/// Only available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Entry counts indexed by probe distance in groups.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// The largest probe distance of any entry.
    pub fn max_distance(&self) -> usize {
        self.bins.len().saturating_sub(1)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        let total: usize = self.bins.iter().sum();
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({total} entries, distance in groups):");

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                0 => None,
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                _ => Some('▉'),
            };
            bar.extend(partial);
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{distance:>4} | {} ({count})", make_bar(count));
        }
    }
}

/// Debug statistics for hash table analysis.
///
/// Only available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Maximum number of elements before the next growth
    pub capacity: usize,
    /// Total number of slots allocated
    pub total_slots: usize,
    /// Number of control-byte groups
    pub groups: usize,
    /// Number of slots whose control byte marks them occupied
    pub occupied_slots: usize,
    /// Load factor (populated / total_slots)
    pub load_factor: f64,
    /// Total memory in bytes used by control bytes and slots
    pub total_bytes: usize,
    /// Memory in bytes held by empty slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Swiss Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.total_slots,
            self.load_factor * 100.0
        );
        println!("Capacity before growth: {}", self.capacity);
        println!(
            "Groups: {} ({} occupied slots)",
            self.groups, self.occupied_slots
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// An open-addressing hash table using 16-wide control-byte groups.
///
/// `HashTable<V>` stores values of type `V`. Like the `hashbrown` raw table it
/// does not know how to hash or compare values: every operation takes the
/// 64-bit hash of the key and an equality predicate, and operations that may
/// grow the table also take a `hasher` closure used to rehash stored values.
///
/// ## Layout and probing
///
/// Slots are grouped 16 at a time. Each slot has a control byte that is `0`
/// when the slot is empty and the key's 7-bit tag otherwise. A lookup starts at
/// the group selected by the hash and scans groups in increasing order,
/// wrapping around, until every group has been visited once:
///
/// 1. every group is checked for tag matches, confirming each candidate with
///    the equality predicate;
/// 2. if no match exists, the first empty slot in the same probe order is the
///    insertion point.
///
/// Removal frees the slot immediately, no tombstone is left behind. Lookups
/// cannot be cut short by the hole because the match phase always covers the
/// whole table. The flip side is that a miss costs a scan of every group.
///
/// The table grows by doubling before an insertion would push the load factor
/// above 0.75, so an empty slot always exists.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use siphasher::sip::SipHasher;
/// # use swiss_table::hash_table::Entry;
/// # use swiss_table::hash_table::HashTable;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
///
/// match table.entry(hash_id(123), |p: &Person| p.id == 123, |p| hash_id(p.id)) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert_eq!(table.find(hash_id(123), |p| p.id == 123).unwrap().name, "Alice");
/// ```
pub struct HashTable<V> {
    groups: Box<[Group]>,
    slots: Box<[MaybeUninit<V>]>,
    populated: usize,
    group_mask: usize,
}

struct GroupsDebug<'a>(&'a [Group]);

impl Debug for GroupsDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct ControlBytes<'a>(&'a Group);

        impl Debug for ControlBytes<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for (pos, &byte) in self.0.bytes().iter().enumerate() {
                    if pos > 0 {
                        f.write_str(", ")?;
                    }
                    if byte == EMPTY {
                        f.write_str("..")?;
                    } else {
                        write!(f, "{byte:02x}")?;
                    }
                }
                Ok(())
            }
        }

        f.debug_list()
            .entries(self.0.iter().map(ControlBytes))
            .finish()
    }
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("groups", &GroupsDebug(&self.groups))
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<V> Clone for HashTable<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        let mut table = Self::allocate(self.slots());

        let mut cursor = SlotCursor::new(&self.groups, self.populated);
        while let Some(index) = cursor.next(&self.groups) {
            // SAFETY: The cursor only yields occupied slots, which are
            // initialized. `table` has the same slot count as `self`, so `index`
            // is in bounds there and still empty.
            unsafe {
                let value = self.slot(index).clone();
                let tag = self.groups[index / GROUP_WIDTH].get(index % GROUP_WIDTH);
                table.write(index, tag, value);
            }
        }

        debug_assert_eq!(table.populated, self.populated);
        table
    }
}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<V>() || self.populated == 0 {
            return;
        }

        let mut cursor = SlotCursor::new(&self.groups, self.populated);
        while let Some(index) = cursor.next(&self.groups) {
            // SAFETY: Occupied slots are initialized and are dropped exactly once
            // here since the table is going away.
            unsafe { self.slots.get_unchecked_mut(index).assume_init_drop() };
        }
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with a single group of 16 slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.slots(), 16);
    /// assert_eq!(table.capacity(), 12);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::allocate(MIN_SLOTS)
    }

    /// Creates a table that can hold at least `capacity` values without
    /// growing.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.slots().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = slots_for(capacity).unwrap_or_else(|| capacity_overflow());
        Self::allocate(slots)
    }

    fn allocate(slots: usize) -> Self {
        let (groups, slots) = infallible(Self::try_alloc_storage(slots, slots));

        Self {
            group_mask: groups.len() - 1,
            groups,
            slots,
            populated: 0,
        }
    }

    /// Allocates empty control groups and uninitialized slots for a table of
    /// `slots` slots. Nothing is allocated unless both arrays fit.
    fn try_alloc_storage(
        slots: usize,
        requested: usize,
    ) -> Result<(Box<[Group]>, Box<[MaybeUninit<V>]>), TryReserveError> {
        debug_assert!(slots.is_power_of_two() && slots >= MIN_SLOTS);
        let group_count = slots / GROUP_WIDTH;

        let mut groups = try_alloc_vec::<Group>(group_count, requested)?;
        let mut storage = try_alloc_vec::<MaybeUninit<V>>(slots, requested)?;
        groups.resize(group_count, Group::EMPTY);
        // SAFETY: The capacity was reserved above and `MaybeUninit` needs no
        // initialization.
        unsafe { storage.set_len(slots) };

        Ok((groups.into_boxed_slice(), storage.into_boxed_slice()))
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of values the table can hold before it grows.
    ///
    /// This is three quarters of [`slots`](Self::slots).
    pub fn capacity(&self) -> usize {
        max_load(self.slots())
    }

    /// Returns the total number of slots, always a power of two of at least 16.
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn home_group(&self, h1: u64) -> usize {
        // The group count is a power of two, so masking is `h1 mod groups`.
        (h1 as usize) & self.group_mask
    }

    #[inline(always)]
    fn probe_seq(&self, start: usize) -> ProbeSeq {
        ProbeSeq {
            group: start,
            mask: self.group_mask,
            remaining: self.group_mask + 1,
        }
    }

    /// Reference to the value in an occupied slot.
    ///
    /// # Safety
    ///
    /// The caller must ensure `index` is in bounds and its control byte marks
    /// it occupied.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> &V {
        // SAFETY: Caller ensures the slot is in bounds and initialized.
        unsafe { self.slots.get_unchecked(index).assume_init_ref() }
    }

    /// Stores `value` in an empty slot and marks it with `tag`.
    ///
    /// # Safety
    ///
    /// The caller must ensure `index` is in bounds and its control byte marks
    /// it empty, and that `tag` is the tag of the value's hash.
    #[inline(always)]
    unsafe fn write(&mut self, index: usize, tag: u8, value: V) -> &mut V {
        debug_assert!(self.populated < max_load(self.slots.len()));
        // SAFETY: Caller ensures `index` is in bounds. The slot is empty, so
        // nothing is overwritten without being dropped.
        let slot = unsafe { self.slots.get_unchecked_mut(index).write(value) };
        self.groups[index / GROUP_WIDTH].set(index % GROUP_WIDTH, tag);
        self.populated += 1;
        slot
    }

    /// Moves the value out of an occupied slot and frees the slot.
    ///
    /// # Safety
    ///
    /// The caller must ensure `index` is in bounds and its control byte marks
    /// it occupied.
    #[inline(always)]
    unsafe fn take(&mut self, index: usize) -> V {
        self.groups[index / GROUP_WIDTH].clear(index % GROUP_WIDTH);
        self.populated -= 1;
        // SAFETY: Caller ensures the slot was occupied. Its control byte is now
        // empty, so the value is never read or dropped again.
        unsafe { self.slots.get_unchecked(index).assume_init_read() }
    }

    /// Locates the slot for a key: where it lives, or where it would go.
    ///
    /// Both phases start at the group selected by the hash and visit every
    /// group once in increasing order. The match phase never stops at an empty
    /// slot, since removal does not leave tombstones and a colliding key may
    /// have been placed past a slot that has since been freed.
    ///
    /// This is a read-only query and never grows the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// # use swiss_table::hash_table::SlotSearch;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.find_slot(0x05, |&v| v == 1), SlotSearch::Vacant(0));
    ///
    /// table.entry(0x05, |&v| v == 1, |_| 0x05).or_insert(1);
    /// assert_eq!(table.find_slot(0x05, |&v| v == 1), SlotSearch::Found(0));
    /// assert_eq!(table.find_slot(0x05, |&v| v == 2), SlotSearch::Vacant(1));
    /// ```
    pub fn find_slot(&self, hash: u64, eq: impl Fn(&V) -> bool) -> SlotSearch {
        let SplitHash { h1, h2 } = split_hash(hash);
        let start = self.home_group(h1);

        for group_index in self.probe_seq(start) {
            for pos in self.groups[group_index].match_tag(h2) {
                let index = group_index * GROUP_WIDTH + pos;
                // SAFETY: A matching tag is never `EMPTY`, so the slot is
                // occupied. `index` is within the group's slots.
                if eq(unsafe { self.slot(index) }) {
                    return SlotSearch::Found(index);
                }
            }
        }

        match self.find_insert_slot(start) {
            Some(index) => SlotSearch::Vacant(index),
            None => SlotSearch::Full,
        }
    }

    /// First empty slot in probe order from `start`.
    fn find_insert_slot(&self, start: usize) -> Option<usize> {
        for group_index in self.probe_seq(start) {
            if let Some(pos) = self.groups[group_index].match_empty().lowest_set_bit() {
                return Some(group_index * GROUP_WIDTH + pos);
            }
        }
        None
    }

    #[cold]
    #[inline(never)]
    fn table_full(&self) -> ! {
        #[cfg(feature = "logging")]
        log::error!(
            "swiss table has no empty slot: {} entries in {} slots",
            self.populated,
            self.slots()
        );

        panic!(
            "swiss table has no empty slot ({} entries in {} slots); the load factor invariant was violated",
            self.populated,
            self.slots()
        )
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table
    ///     .entry(hash_u64(42), |&n: &u64| n == 42, |&n| hash_u64(n))
    ///     .or_insert(42);
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(99), |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }

        match self.find_slot(hash, eq) {
            // SAFETY: `Found` is only returned for occupied, in-bounds slots.
            SlotSearch::Found(index) => Some(unsafe { self.slot(index) }),
            _ => None,
        }
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }

        match self.find_slot(hash, eq) {
            // SAFETY: `Found` is only returned for occupied, in-bounds slots.
            SlotSearch::Found(index) => {
                Some(unsafe { self.slots.get_unchecked_mut(index).assume_init_mut() })
            }
            _ => None,
        }
    }

    /// Removes and returns a value from the table.
    ///
    /// The slot is freed immediately by resetting its control byte to empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     n.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// table
    ///     .entry(hash_u64(42), |&n: &u64| n == 42, |&n| hash_u64(n))
    ///     .or_insert(42);
    ///
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(hash_u64(42), |&n| n == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        match self.find_slot(hash, eq) {
            // SAFETY: `Found` is only returned for occupied, in-bounds slots.
            SlotSearch::Found(index) => Some(unsafe { self.take(index) }),
            _ => None,
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If inserting one more value would push the load factor above 0.75 the
    /// table grows first, using `hasher` to rehash every stored value. This
    /// happens whether or not the value turns out to be present.
    ///
    /// # Panics
    ///
    /// Panics if no empty slot exists after the growth check. The load factor
    /// policy makes this unreachable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<String> = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s| s == "hello", |s| hash_str(s)) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash, |s| s == "hello", |s| hash_str(s)),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    #[inline]
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V> {
        if self.populated >= self.capacity() {
            self.grow(hasher);
        }

        match self.find_slot(hash, eq) {
            SlotSearch::Found(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            SlotSearch::Vacant(index) => Entry::Vacant(VacantEntry {
                table: self,
                index,
                tag: split_hash(hash).h2,
            }),
            SlotSearch::Full => self.table_full(),
        }
    }

    /// Removes all values from the table, keeping its allocation.
    pub fn clear(&mut self) {
        if core::mem::needs_drop::<V>() {
            for _ in self.drain() {}
        } else {
            self.groups.fill(Group::EMPTY);
            self.populated = 0;
        }
    }

    /// Reserves room for at least `additional` more values.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(100, |&n| n);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) {
        infallible(self.try_reserve(additional, hasher));
    }

    /// Tries to reserve room for at least `additional` more values.
    ///
    /// # Errors
    ///
    /// Returns [`TryReserveError::CapacityOverflow`] if the required slot count
    /// overflows, or [`TryReserveError::AllocError`] if the allocator cannot
    /// provide the new arrays. The table is unchanged in both cases.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::TryReserveError;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// assert!(table.try_reserve(1000, |&n| n).is_ok());
    /// assert!(matches!(
    ///     table.try_reserve(usize::MAX, |&n| n),
    ///     Err(TryReserveError::CapacityOverflow { .. })
    /// ));
    /// ```
    pub fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), TryReserveError> {
        let requested = self.populated.saturating_add(additional);
        if requested <= self.capacity() {
            return Ok(());
        }

        let slots = slots_for(requested).ok_or(TryReserveError::CapacityOverflow { requested })?;
        let storage = Self::try_alloc_storage(slots, requested)?;
        self.resize(storage, hasher);
        Ok(())
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, hasher: impl Fn(&V) -> u64) {
        let slots = self
            .slots()
            .checked_mul(2)
            .unwrap_or_else(|| capacity_overflow());
        let storage = infallible(Self::try_alloc_storage(slots, max_load(slots)));
        self.resize(storage, hasher);
    }

    /// Moves every value into the freshly allocated `groups` and `slots`.
    ///
    /// Group placement depends on the group count, so every value is placed
    /// again from scratch. Values are distinct, which lets placement skip the
    /// match phase and go straight to the empty-slot search.
    fn resize(
        &mut self,
        (groups, slots): (Box<[Group]>, Box<[MaybeUninit<V>]>),
        hasher: impl Fn(&V) -> u64,
    ) {
        debug_assert!(slots.len() > self.slots());

        #[cfg(feature = "logging")]
        log::debug!(
            "growing swiss table from {} to {} slots ({} entries)",
            self.slots(),
            slots.len(),
            self.populated
        );

        self.group_mask = groups.len() - 1;
        let old_groups = core::mem::replace(&mut self.groups, groups);
        let old_slots = core::mem::replace(&mut self.slots, slots);
        let old_populated = core::mem::replace(&mut self.populated, 0);

        // Values are moved out of `old_slots` one at a time.
        // The old storage is `MaybeUninit`, so dropping it frees memory without
        // dropping values. If `hasher` panics the unmoved values leak.
        let mut cursor = SlotCursor::new(&old_groups, old_populated);
        while let Some(old_index) = cursor.next(&old_groups) {
            // SAFETY: The cursor only yields occupied slots of the old table.
            let value = unsafe { old_slots.get_unchecked(old_index).assume_init_read() };
            let SplitHash { h1, h2 } = split_hash(hasher(&value));

            match self.find_insert_slot(self.home_group(h1)) {
                // SAFETY: `find_insert_slot` only returns empty, in-bounds slots.
                Some(index) => unsafe {
                    self.write(index, h2, value);
                },
                None => self.table_full(),
            }
        }

        debug_assert_eq!(self.populated, old_populated);
    }

    /// Returns an iterator over all values in slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for n in 0..10u64 {
    ///     table.entry(n, |&v| v == n, |&v| v).or_insert(n);
    /// }
    ///
    /// let mut values: Vec<u64> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, (0..10).collect::<Vec<_>>());
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            cursor: SlotCursor::new(&self.groups, self.populated),
        }
    }

    /// Returns an iterator over mutable references to all values in slot
    /// order.
    ///
    /// Values must not be modified in a way that changes their hash.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            cursor: SlotCursor::new(&self.groups, self.populated),
            groups: &self.groups,
            slots: self.slots.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields all values.
    ///
    /// The table keeps its allocation. Dropping the iterator early removes the
    /// remaining values.
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            cursor: SlotCursor::new(&self.groups, self.populated),
            table: self,
        }
    }

    /// Returns a displayable, multi-line dump of the table state.
    ///
    /// The dump lists the control bytes of every group followed by every
    /// occupied slot with its index, tag, and the entry as rendered by
    /// `render`. It is meant for diagnostics and has no stable format.
    pub fn display_with<F>(&self, render: F) -> Visualize<'_, V, F>
    where
        F: Fn(&V, &mut fmt::Formatter<'_>) -> fmt::Result,
    {
        Visualize {
            table: self,
            render,
        }
    }

    /// Computes a histogram of probe distances for the current table state.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&V) -> u64) -> ProbeHistogram {
        let mut bins = alloc::vec![0usize; self.groups.len()];

        let mut cursor = SlotCursor::new(&self.groups, self.populated);
        while let Some(index) = cursor.next(&self.groups) {
            // SAFETY: The cursor only yields occupied slots.
            let hash = hasher(unsafe { self.slot(index) });
            let home = self.home_group(split_hash(hash).h1);
            let distance = (index / GROUP_WIDTH).wrapping_sub(home) & self.group_mask;
            bins[distance] += 1;
        }

        let used = bins.iter().rposition(|&count| count != 0).map_or(1, |i| i + 1);
        bins.truncate(used);
        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let total_slots = self.slots();
        let occupied_slots: usize = self.groups.iter().map(|g| g.match_full().len()).sum();
        let slot_bytes = core::mem::size_of::<V>();

        DebugStats {
            populated: self.populated,
            capacity: self.capacity(),
            total_slots,
            groups: self.groups.len(),
            occupied_slots,
            load_factor: self.populated as f64 / total_slots as f64,
            total_bytes: self.groups.len() * core::mem::size_of::<Group>()
                + total_slots * slot_bytes,
            wasted_bytes: (total_slots - occupied_slots) * (slot_bytes + 1),
        }
    }
}

impl<V: Debug> HashTable<V> {
    /// Returns a multi-line dump of the control bytes and occupied slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(7, |&v: &u64| v == 7, |&v| v).or_insert(7);
    ///
    /// let dump = table.visualize();
    /// assert!(dump.contains("Size: 1"));
    /// assert!(dump.contains("Group  0: ["));
    /// ```
    pub fn visualize(&self) -> alloc::string::String {
        use alloc::string::ToString;

        self.display_with(|value, f| write!(f, "{value:?}"))
            .to_string()
    }
}

/// A multi-line dump of a [`HashTable`], created by
/// [`display_with`](HashTable::display_with).
pub struct Visualize<'a, V, F> {
    table: &'a HashTable<V>,
    render: F,
}

impl<V, F> fmt::Display for Visualize<'_, V, F>
where
    F: Fn(&V, &mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEAVY_RULE: &str = "==================================================";
        const RULE: &str = "--------------------------------------------------";

        let table = self.table;
        writeln!(f, "Swiss Table State")?;
        writeln!(f, "{HEAVY_RULE}")?;
        writeln!(f, "Size: {}", table.len())?;
        writeln!(f, "Groups: {}", table.groups.len())?;
        writeln!(f, "Total Slots: {}", table.slots())?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;

        writeln!(f, "Control bytes (tags, · = empty):")?;
        for (group_index, group) in table.groups.iter().enumerate() {
            write!(f, "Group {group_index:2}: [")?;
            for (pos, &byte) in group.bytes().iter().enumerate() {
                if pos > 0 {
                    f.write_str("|")?;
                }
                if byte == EMPTY {
                    write!(f, "{:>3}", "·")?;
                } else {
                    write!(f, "{byte:3}")?;
                }
            }
            writeln!(f, " ]")?;
        }

        writeln!(f)?;
        writeln!(f, "Entries:")?;
        writeln!(f, "Index | Tag | Entry")?;
        writeln!(f, "{RULE}")?;

        let mut cursor = SlotCursor::new(&table.groups, table.populated);
        while let Some(index) = cursor.next(&table.groups) {
            let tag = table.groups[index / GROUP_WIDTH].get(index % GROUP_WIDTH);
            write!(f, "{index:5} | {tag:3} | ")?;
            // SAFETY: The cursor only yields occupied slots.
            (self.render)(unsafe { table.slot(index) }, f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

/// A view into a single entry in the table, which may be vacant or occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// The table contains a matching value.
    Occupied(OccupiedEntry<'a, V>),
    /// No matching value exists; the entry holds the slot it would occupy.
    Vacant(VacantEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant, and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant, and returns a
    /// mutable reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.entry(5, |&v| v == 5, |&v| v).or_insert_with(|| 5);
    /// table
    ///     .entry(5, |&v| v == 5, |&v| v)
    ///     .or_insert_with(|| panic!("Should not be called"));
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies the value in place if the entry is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, V> Entry<'a, V>
where
    V: Default,
{
    /// Inserts `V::default()` if the entry is vacant, and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
///
/// Holds the empty slot found by the probe, so inserting does not search
/// again.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    tag: u8,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant slot and returns a mutable reference
    /// to it.
    ///
    /// The value must hash to the hash the entry was created with.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        // SAFETY: The slot was found empty by `find_slot` and the table has
        // been exclusively borrowed since, so it is still empty and in
        // bounds.
        unsafe { table.write(self.index, self.tag, value) }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: The slot was found occupied and the table has been
        // exclusively borrowed since.
        unsafe { self.table.slot(self.index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The slot was found occupied and the table has been
        // exclusively borrowed since.
        unsafe {
            self.table
                .slots
                .get_unchecked_mut(self.index)
                .assume_init_mut()
        }
    }

    /// Converts the entry into a mutable reference to the value, bound to the
    /// table's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        // SAFETY: The slot was found occupied and the table has been
        // exclusively borrowed since.
        unsafe { table.slots.get_unchecked_mut(self.index).assume_init_mut() }
    }

    /// Removes the value from the table and returns it, freeing the slot.
    pub fn remove(self) -> V {
        let table = self.table;
        // SAFETY: The slot was found occupied and the table has been
        // exclusively borrowed since.
        unsafe { table.take(self.index) }
    }
}

/// An iterator over the values of a [`HashTable`], in slot order.
///
/// This struct is created by the [`iter`](HashTable::iter) method.
pub struct Iter<'a, V> {
    table: &'a HashTable<V>,
    cursor: SlotCursor,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Iter {
            table: self.table,
            cursor: self.cursor.clone(),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor.next(&self.table.groups)?;
        // SAFETY: The cursor only yields occupied slots.
        Some(unsafe { self.table.slot(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`], in slot order.
///
/// This struct is created by the [`iter_mut`](HashTable::iter_mut) method.
pub struct IterMut<'a, V> {
    groups: &'a [Group],
    slots: *mut MaybeUninit<V>,
    cursor: SlotCursor,
    _marker: PhantomData<&'a mut V>,
}

// SAFETY: `IterMut` hands out `&mut V` like `&mut [V]` does, so it has the same
// thread-safety requirements.
unsafe impl<V: Send> Send for IterMut<'_, V> {}
// SAFETY: See above.
unsafe impl<V: Sync> Sync for IterMut<'_, V> {}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor.next(self.groups)?;
        // SAFETY: The cursor yields each occupied slot at most once, so no two
        // returned references alias. The table is exclusively borrowed for
        // `'a`.
        Some(unsafe { (*self.slots.add(index)).assume_init_mut() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`drain`](HashTable::drain) method.
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    cursor: SlotCursor,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor.next(&self.table.groups)?;
        // SAFETY: The cursor only yields occupied slots. Its bitmask for the
        // current group was captured before any of them were cleared.
        Some(unsafe { self.table.take(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
