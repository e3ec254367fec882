//! Identifier newtypes for entities of the loaded model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A fixed-width, architecture independent memory address.
///
/// Addresses are never truncated: 32-bit targets simply leave the high
/// half zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub u64);

impl Address {
    /// Returns the raw 64-bit value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for Address {
    type Err = std::num::ParseIntError;

    /// Parses a decimal address as it appears in database notifications.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u32>().map(Self)
            }
        }
    };
}

define_id!(
    /// Database id of a module.
    ModuleId
);
define_id!(
    /// Database id of a project.
    ProjectId
);
define_id!(
    /// Database id of a view (flow graph or call graph).
    ViewId
);
define_id!(
    /// Database id of a graph node (code, function, group or text node).
    NodeId
);
define_id!(
    /// Database id of a graph edge.
    EdgeId
);
define_id!(
    /// Database id of a comment.
    CommentId
);
define_id!(
    /// Database id of the user who authored a comment.
    UserId
);
define_id!(
    /// Database id of a type instance.
    TypeInstanceId
);
define_id!(
    /// Database id of a base type.
    BaseTypeId
);
define_id!(
    /// Database id of a member of a compound type.
    TypeMemberId
);
define_id!(
    /// Database id of an operand expression (one node of an operand tree).
    ExpressionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_is_hex() {
        assert_eq!(Address(0x401000).to_string(), "0x401000");
    }

    #[test]
    fn address_parses_decimal() {
        let addr: Address = "4198400".parse().unwrap();
        assert_eq!(addr, Address(0x401000));
    }

    #[test]
    fn address_keeps_high_bits() {
        let addr: Address = "18446744073709551615".parse().unwrap();
        assert_eq!(addr.value(), u64::MAX);
    }

    #[test]
    fn address_rejects_negative() {
        assert!("-1".parse::<Address>().is_err());
    }

    #[test]
    fn id_parses_and_displays() {
        let id: ModuleId = "42".parse().unwrap();
        assert_eq!(id, ModuleId(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn id_rejects_null_literal() {
        assert!("null".parse::<CommentId>().is_err());
    }
}
