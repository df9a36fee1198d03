//! Enumerated phase policies.
//!
//! Each policy parses from its property-style spelling (`last-update`,
//! `latest`, `minor`, ...) and rejects anything else with a message listing
//! the legal values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An enum-style property carried a value outside its legal set.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unrecognized value '{value}' for '{property}', expected one of: {expected}")]
pub struct PolicyError {
    /// Property name.
    pub property: &'static str,
    /// The rejected value.
    pub value: String,
    /// Comma-separated legal values.
    pub expected: &'static str,
}

macro_rules! policy_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $property:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Property name this policy is configured under.
            pub const PROPERTY: &'static str = $property;

            /// Property-style spelling.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PolicyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $text => Ok(Self::$variant), )+
                    _ => Err(PolicyError {
                        property: $property,
                        value: s.to_string(),
                        expected: concat!($( $text, ", " ),+).trim_end_matches(", "),
                    }),
                }
            }
        }
    };
}

policy_enum! {
    /// Where the initial dependency set comes from.
    InitialDeps, "initial-deps" {
        /// Resolve from the application's declared dependencies.
        #[default]
        Application => "application",
        /// Reproduce the closure recorded by the last persisted state artifact.
        LastUpdate => "last-update",
    }
}

policy_enum! {
    /// Which available version, if any, a dependency is updated to.
    UpdatePolicy, "update" {
        /// Do not look for updates.
        #[default]
        None => "none",
        /// The next higher version within the bound.
        Next => "next",
        /// The highest version within the bound.
        Latest => "latest",
    }
}

policy_enum! {
    /// How far an update may reach from the current version.
    UpdateNumber, "update-number" {
        /// Any higher version.
        Major => "major",
        /// Stay within the current major line.
        Minor => "minor",
        /// Stay within the current `major.minor` line.
        #[default]
        Micro => "micro",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legal_values() {
        assert_eq!("last-update".parse::<InitialDeps>(), Ok(InitialDeps::LastUpdate));
        assert_eq!("LATEST".parse::<UpdatePolicy>(), Ok(UpdatePolicy::Latest));
        assert_eq!(" minor ".parse::<UpdateNumber>(), Ok(UpdateNumber::Minor));
    }

    #[test]
    fn test_rejects_unknown_value_with_legal_set() {
        let err = "sometimes".parse::<UpdatePolicy>().unwrap_err();
        assert_eq!(err.property, "update");
        assert_eq!(err.expected, "none, next, latest");
        assert_eq!(
            err.to_string(),
            "Unrecognized value 'sometimes' for 'update', expected one of: none, next, latest"
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(InitialDeps::default(), InitialDeps::Application);
        assert_eq!(UpdatePolicy::default(), UpdatePolicy::None);
        assert_eq!(UpdateNumber::default(), UpdateNumber::Micro);
    }

    #[test]
    fn test_display_round_trips_spelling() {
        assert_eq!(InitialDeps::LastUpdate.to_string(), "last-update");
        assert_eq!(UpdateNumber::PROPERTY, "update-number");
    }
}
