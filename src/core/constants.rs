// ============================================================================
// axon-cells - Constants
// Flag bits shared by every cell in the graph
// ============================================================================

// =============================================================================
// CELL TYPE FLAGS
// =============================================================================

/// Writable observable cell
pub const OBSERVABLE: u32 = 1 << 0;

/// Read-only cell computed from dependencies
pub const DERIVED: u32 = 1 << 1;

/// Derived cell whose single upstream can be retargeted
pub const DYNAMIC: u32 = 1 << 2;

// =============================================================================
// BEHAVIOUR FLAGS
// =============================================================================

/// Writes made while notifying are queued and replayed instead of rejected
pub const REENTRANT: u32 = 1 << 8;

// =============================================================================
// STATUS FLAGS
// =============================================================================

/// Value is up to date
pub const CLEAN: u32 = 1 << 10;

/// A direct dependency changed; must recompute
pub const DIRTY: u32 = 1 << 11;

/// A transitive dependency changed; recompute only if a direct one did
pub const MAYBE_DIRTY: u32 = 1 << 12;

/// Listeners of this cell are being invoked for the current wave
pub const NOTIFYING: u32 = 1 << 13;

/// Cell has been disposed (terminal)
pub const DISPOSED: u32 = 1 << 14;

// =============================================================================
// MASKS
// =============================================================================

/// Clears the freshness bits, keeping everything else
pub const STATUS_MASK: u32 = !(CLEAN | DIRTY | MAYBE_DIRTY);

// =============================================================================
// LIMITS
// =============================================================================

/// Default bound on reentrant replays within one `set` call
pub const MAX_REENTRANT_REPLAYS: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_distinct() {
        let all = [
            OBSERVABLE,
            DERIVED,
            DYNAMIC,
            REENTRANT,
            CLEAN,
            DIRTY,
            MAYBE_DIRTY,
            NOTIFYING,
            DISPOSED,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn status_mask_only_clears_freshness() {
        let flags = DERIVED | DIRTY | NOTIFYING;
        assert_eq!(flags & STATUS_MASK, DERIVED | NOTIFYING);
    }
}
