// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prefixed identifier newtypes.

/// Define a newtype ID wrapper around `String` with a type prefix.
///
/// Generates `generate()` for random ids (`{prefix}{nanoid}`),
/// `from_string()` for parsing, `as_str()`, `short()`, plus `Display`,
/// `From`, `AsRef<str>`, `Borrow<str>`, and `PartialEq<str>` impls.
///
/// ```ignore
/// define_id! {
///     /// Unique identifier for a job record.
///     pub struct JobId("job-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random id with the type prefix.
            pub fn generate() -> Self {
                Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(16)))
            }

            /// Wrap an existing id string (parsing, deserialization, tests).
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Shortened form for log lines: prefix stripped, at most `n` chars.
            pub fn short(&self, n: usize) -> &str {
                let suffix = self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0);
                &suffix[..suffix.len().min(n)]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for one job execution record.
    ///
    /// Every execution attempt gets its own id; a copied job gets a fresh
    /// one. Used to key job records, logs, and queue messages.
    pub struct JobId("job-");
}

crate::define_id! {
    /// Unique identifier for a queue message, assigned at enqueue time.
    pub struct MessageId("msg-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
