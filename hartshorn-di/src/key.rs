//! Identity of a requested dependency. A [Key] is a capability type, optionally narrowed by a
//! qualifier, e.g. `Key::named::<dyn Storage + Send + Sync>("primary")`.

use std::any::{type_name, TypeId};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Identity of a dependency: a capability type plus an optional qualifier. Equality and hashing
/// only consider the type id and the qualifier - the type name is kept for diagnostics.
#[derive(Clone, Debug)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<String>,
}

impl Key {
    /// Creates an unqualified key for the given capability type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            qualifier: None,
        }
    }

    /// Creates a key for the given capability type narrowed by a qualifier.
    #[inline]
    pub fn named<T: ?Sized + 'static>(qualifier: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            ..Self::of::<T>()
        }
    }

    /// Creates a key with an optional qualifier.
    #[inline]
    pub fn qualified<T: ?Sized + 'static>(qualifier: Option<&str>) -> Self {
        Self {
            qualifier: qualifier.map(str::to_string),
            ..Self::of::<T>()
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Checks if this key refers to the capability `T`, regardless of qualifier.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns the same capability without a qualifier.
    pub fn unqualified(&self) -> Self {
        Self {
            qualifier: None,
            ..self.clone()
        }
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}#{}", self.type_name, qualifier),
            None => f.write_str(self.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::key::Key;
    use fxhash::FxHashMap;

    trait Capability {}

    #[test]
    fn should_compare_by_type_and_qualifier() {
        assert_eq!(Key::of::<u8>(), Key::of::<u8>());
        assert_eq!(Key::named::<u8>("a"), Key::named::<u8>("a"));
        assert_eq!(Key::qualified::<u8>(Some("a")), Key::named::<u8>("a"));
        assert_ne!(Key::named::<u8>("a"), Key::named::<u8>("b"));
        assert_ne!(Key::named::<u8>("a"), Key::of::<u8>());
        assert_ne!(Key::of::<u8>(), Key::of::<i8>());
    }

    #[test]
    fn should_be_interchangeable_as_map_keys() {
        let mut map = FxHashMap::default();
        map.insert(Key::named::<dyn Capability>("x"), 1);

        assert_eq!(map.get(&Key::named::<dyn Capability>("x")), Some(&1));
        assert_eq!(map.get(&Key::of::<dyn Capability>()), None);
    }

    #[test]
    fn should_display_qualifier() {
        let key = Key::named::<u8>("port");
        assert_eq!(key.to_string(), "u8#port");
        assert_eq!(key.unqualified().to_string(), "u8");
        assert!(key.is::<u8>());
    }
}
