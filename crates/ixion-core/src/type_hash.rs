//! Deterministic identities for host classes.
//!
//! A [`TypeHash`] is the XXHash64 of a class's internal name
//! (`java/lang/String`). Because it is computed from the name alone, a class
//! can be referenced (for example as a superclass) before it is registered.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Seed separating class identities from any other hashed names.
const CLASS_SEED: u64 = 0x2fac10b63a6cc57c;

/// 64-bit identity of a class, derived from its internal name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Hash of a class by internal name.
    ///
    /// Dotted names are normalized, so `java.lang.String` and
    /// `java/lang/String` share one identity.
    pub fn of(internal_name: &str) -> Self {
        if internal_name.contains('.') {
            let normalized = internal_name.replace('.', "/");
            TypeHash(xxh64(normalized.as_bytes(), CLASS_SEED))
        } else {
            TypeHash(xxh64(internal_name.as_bytes(), CLASS_SEED))
        }
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_hash() {
        assert_eq!(TypeHash::of("java/lang/String"), TypeHash::of("java/lang/String"));
    }

    #[test]
    fn dotted_and_internal_names_agree() {
        assert_eq!(TypeHash::of("java.util.List"), TypeHash::of("java/util/List"));
    }

    #[test]
    fn different_names_differ() {
        assert_ne!(TypeHash::of("java/lang/Integer"), TypeHash::of("java/lang/Long"));
    }
}
