//! # Alias Sequence
//!
//! Source of barcode alias numbers.
//!
//! The durable allocator lives in `vastra-db` (a counter row bumped with a
//! single `UPDATE … RETURNING`). This module holds the shared trait and an
//! in-process authority for tools and tests that run without a database.

use std::sync::atomic::{AtomicI64, Ordering};

/// A monotonically increasing alias source.
///
/// Implementations must never hand the same value to two callers, however
/// many threads call concurrently.
pub trait AliasSequence: Send + Sync {
    /// Returns the next alias number.
    fn next_alias(&self) -> i64;
}

/// In-memory alias authority backed by one atomic counter.
#[derive(Debug, Default)]
pub struct AtomicAliasSequence {
    last: AtomicI64,
}

impl AtomicAliasSequence {
    /// Starts a sequence whose first value is `last_issued + 1`.
    pub fn starting_after(last_issued: i64) -> Self {
        AtomicAliasSequence {
            last: AtomicI64::new(last_issued),
        }
    }

    /// Last value handed out (0 if none).
    pub fn last_issued(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }
}

impl AliasSequence for AtomicAliasSequence {
    fn next_alias(&self) -> i64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Zero-pads an alias number to the fixed barcode width.
///
/// ## Example
/// ```rust
/// use vastra_core::sequence::format_alias;
///
/// assert_eq!(format_alias(42), "00000042");
/// ```
pub fn format_alias(value: i64) -> String {
    format!("{:0width$}", value, width = crate::BARCODE_ALIAS_WIDTH)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_starts_after_seed() {
        let seq = AtomicAliasSequence::starting_after(41);
        assert_eq!(seq.next_alias(), 42);
        assert_eq!(seq.next_alias(), 43);
        assert_eq!(seq.last_issued(), 43);
    }

    #[test]
    fn test_concurrent_callers_get_distinct_values() {
        let seq = Arc::new(AtomicAliasSequence::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..500).map(|_| seq.next_alias()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "alias {} issued twice", value);
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(seq.last_issued(), 4000);
    }

    #[test]
    fn test_format_alias_width() {
        assert_eq!(format_alias(1), "00000001");
        assert_eq!(format_alias(12345678), "12345678");
        // Overflowing the width widens rather than truncates
        assert_eq!(format_alias(123456789), "123456789");
    }
}
