#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;
mod group;

pub mod hasher;

/// A HashMap built on the Swiss Table [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::HashTable;
pub use hasher::SplitHash;
pub use hasher::split_hash;

/// A [`HashMap`] using the crate's [`DefaultHashBuilder`], which is keyed
/// with a per-instance random seed.
///
/// [`DefaultHashBuilder`]: hasher::DefaultHashBuilder
#[cfg(any(feature = "foldhash", feature = "std"))]
pub type SwissTable<K, V> = HashMap<K, V, hasher::DefaultHashBuilder>;
