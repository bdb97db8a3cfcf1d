//! Macro for implementing Display and FromStr for label enums
//!
//! Record kinds and queue reasons are written into logs, dedup keys, and
//! persisted JSON by their snake_case label. This macro keeps the label table
//! for both directions in one place.
//!
//! # Example
//!
//! ```rust
//! use herdsync_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Sms,
//!     Push,
//! }
//!
//! impl_label_conversions!(Channel {
//!     Sms => "sms",
//!     Push => "push",
//! });
//!
//! assert_eq!(Channel::Sms.to_string(), "sms");
//! assert_eq!("PUSH".parse::<Channel>().unwrap(), Channel::Push);
//! ```

/// Implements Display and FromStr for an enum from a variant → label table.
///
/// Parsing is case-insensitive; display always yields the label as written.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// The stable label for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
