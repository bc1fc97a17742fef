//! A registry of type-specific value comparators, wrapped so that a
//! panicking comparator is treated as "equal" rather than aborting a
//! reload pass.

use std::panic::AssertUnwindSafe;

use reload_lang::Value;

/// A pluggable equality check for one `Value` shape. The toy language has
/// only one composite value type (`Dict`, handled by `Dictionary`/
/// `DictionaryItem` recursion rather than value-level comparison), so in
/// practice only the default comparator is ever registered; the trait
/// exists so a host extending the language with more value shapes has
/// somewhere to plug a specialised predicate in.
pub trait ValueComparator: Send + Sync {
    fn eq(&self, a: &Value, b: &Value) -> bool;
}

struct StructuralComparator;

impl ValueComparator for StructuralComparator {
    fn eq(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

pub struct ComparatorRegistry {
    default: Box<dyn ValueComparator>,
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        ComparatorRegistry {
            default: Box::new(StructuralComparator),
        }
    }
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the comparator used for every `Value` comparison. Intended
    /// for hosts that extend the language with additional value shapes and
    /// need a non-structural equality for some of them.
    pub fn with_default(comparator: impl ValueComparator + 'static) -> Self {
        ComparatorRegistry {
            default: Box::new(comparator),
        }
    }

    pub fn eq(&self, a: &Value, b: &Value) -> bool {
        let (a, b) = (a.clone(), b.clone());
        let comparator = &self.default;
        std::panic::catch_unwind(AssertUnwindSafe(|| comparator.eq(&a, &b))).unwrap_or(true)
    }
}

/// Convenience entry point using the default structural comparator, the
/// one `reload-model`'s diff uses for Variable/ClassVariable/DictionaryItem
/// payloads.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    ComparatorRegistry::new().eq(a, b)
}
