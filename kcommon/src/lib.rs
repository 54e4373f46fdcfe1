//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use kcommon::{ParameterBag, UserId};
//!
//! let user = UserId::new(42);
//! let mut bag = ParameterBag::new();
//! bag.insert("seed".to_string(), serde_json::json!(7));
//!
//! assert_eq!(user.get(), 42);
//! assert_eq!(user.to_string(), "42");
//! assert_eq!(bag.get("seed"), Some(&serde_json::json!(7)));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use kcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Cross-crate identity newtype for chat users.
    //!
    //! ```rust
    //! use kcommon::UserId;
    //!
    //! let user: UserId = "1001".parse().expect("numeric id should parse");
    //! assert_eq!(user, UserId::from(1001));
    //! ```

    use std::fmt::{Display, Formatter};
    use std::num::ParseIntError;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct UserId(i64);

    impl UserId {
        pub const fn new(value: i64) -> Self {
            Self(value)
        }

        pub const fn get(self) -> i64 {
            self.0
        }
    }

    impl Display for UserId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl From<i64> for UserId {
        fn from(value: i64) -> Self {
            Self(value)
        }
    }

    impl FromStr for UserId {
        type Err = ParseIntError;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            value.trim().parse::<i64>().map(Self)
        }
    }
}

pub mod params {
    //! Untyped parameter bag shared by user settings and provider inputs.

    use std::collections::BTreeMap;

    use serde_json::Value;

    pub type ParameterBag = BTreeMap<String, Value>;
}

pub mod registry {
    //! Insertion-ordered registry used for catalog entries.
    //!
    //! ```rust
    //! use kcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("beta".to_string(), 2_u32);
    //! registry.insert("alpha".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["beta", "alpha"]);
    //! ```

    use std::borrow::Borrow;
    use std::hash::Hash;

    use indexmap::IndexMap;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: IndexMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: IndexMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        /// Inserts only when the key is vacant; returns the rejected value otherwise.
        pub fn try_insert(&mut self, key: K, value: V) -> Result<(), V> {
            if self.items.contains_key(&key) {
                return Err(value);
            }
            self.items.insert(key, value);
            Ok(())
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.items.values()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::UserId;
pub use future::BoxFuture;
pub use params::ParameterBag;
pub use registry::Registry;
