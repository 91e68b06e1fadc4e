use std::fmt;

macro_rules! index_token {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// Creates a new token from a raw index
            #[must_use]
            pub fn new(value: u32) -> Self {
                $name(value)
            }

            /// Returns the raw index value
            #[must_use]
            pub fn value(&self) -> u32 {
                self.0
            }

            /// Returns the value as an arena index
            #[must_use]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                $name(value)
            }
        }

        impl From<$name> for u32 {
            fn from(token: $name) -> Self {
                token.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

index_token!(
    /// A reference to a type stored in a [`crate::model::TypeRegistry`].
    ///
    /// The builtin types occupy the lowest indices, see [`crate::model::Builtin`].
    TypeToken,
    "type"
);

index_token!(
    /// A reference to a method descriptor in the registry's method arena.
    ///
    /// Method ids are stable for the lifetime of the registry and serve as the key of every
    /// shadow-match cache.
    MethodId,
    "method"
);

index_token!(
    /// A code loading context.
    ///
    /// Loaders form a tree rooted in [`LoaderId::BOOTSTRAP`]. A type is visible from a loader
    /// if it was defined by that loader or one of its ancestors.
    LoaderId,
    "loader"
);

impl LoaderId {
    /// The root loader that defines all builtin types
    pub const BOOTSTRAP: LoaderId = LoaderId(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_value() {
        let token = TypeToken::new(42);
        assert_eq!(token.value(), 42);
        assert_eq!(token.index(), 42);
        assert_eq!(u32::from(token), 42);
        assert_eq!(TypeToken::from(42), token);
    }

    #[test]
    fn test_token_formatting() {
        assert_eq!(format!("{}", MethodId::new(7)), "method#7");
        assert_eq!(format!("{:?}", MethodId::new(7)), "MethodId(7)");
        assert_eq!(format!("{}", LoaderId::BOOTSTRAP), "loader#0");
    }

    #[test]
    fn test_token_hash_and_order() {
        let mut set = HashSet::new();
        set.insert(TypeToken::new(1));
        set.insert(TypeToken::new(1));
        set.insert(TypeToken::new(2));
        assert_eq!(set.len(), 2);
        assert!(TypeToken::new(1) < TypeToken::new(2));
    }
}
