//! Numeric identifiers. Each entity gets its own newtype so a post id can never
//! be passed where a user id is expected.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

numeric_id!(
    /// Primary key of `users`.
    UserId
);
numeric_id!(
    /// Primary key of `user_roles`.
    RoleId
);
numeric_id!(CategoryId);
numeric_id!(ThreadId);
numeric_id!(PostId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&UserId(7)).unwrap();
        assert_eq!(json, "7");
        let back: PostId = serde_json::from_str("42").unwrap();
        assert_eq!(back, PostId(42));
    }
}
