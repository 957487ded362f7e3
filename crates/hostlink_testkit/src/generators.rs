//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that the reference backend accepts.

use bytes::Bytes;
use hostlink_core::Row;
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating valid, already lower-cased emails.
pub fn email_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9._]{0,11}@[a-z]{1,8}\\.(com|org|net|io)")
        .expect("Invalid regex")
}

/// Strategy for generating passwords the backend accepts.
pub fn password_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9!#%&*]{6,24}").expect("Invalid regex")
}

/// Strategy for generating passwords below the default minimum length.
pub fn weak_password_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{0,5}").expect("Invalid regex")
}

/// Strategy for generating column names.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}")
        .expect("Invalid regex")
        .prop_filter("id is assigned by the backend", |s| s != "id")
}

/// Strategy for generating JSON scalars.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        prop::string::string_regex("[ -~]{0,24}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for generating rows without an `id` column.
pub fn row_strategy() -> impl Strategy<Value = Row> {
    prop::collection::btree_map(column_name_strategy(), scalar_strategy(), 1..6)
        .prop_map(|columns| columns.into_iter().collect())
}

/// Strategy for generating blobs, including non-UTF-8 bytes.
pub fn blob_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..2048).prop_map(Bytes::from)
}

/// Strategy for generating object paths of one to four segments.
pub fn object_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9_-]{1,10}(/[a-z0-9 _-]{1,10}){0,3}(\\.[a-z]{2,4})?")
        .expect("Invalid regex")
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn emails_have_one_at(email in email_strategy()) {
            prop_assert_eq!(email.matches('@').count(), 1);
            prop_assert_eq!(email.to_lowercase(), email);
        }

        #[test]
        fn passwords_meet_minimum(password in password_strategy()) {
            prop_assert!(password.len() >= 6);
        }

        #[test]
        fn weak_passwords_fall_short(password in weak_password_strategy()) {
            prop_assert!(password.len() < 6);
        }

        #[test]
        fn rows_have_no_id(row in row_strategy()) {
            prop_assert!(!row.is_empty());
            prop_assert!(!row.contains_key("id"));
        }

        #[test]
        fn object_paths_are_relative(path in object_path_strategy()) {
            prop_assert!(!path.starts_with('/'));
            prop_assert!(path.split('/').all(|s| !s.is_empty() && s != "." && s != ".."));
        }
    }
}
