//! Tokens produced by the scanner.
//!
//! One raw argument scans into exactly one [`Token`]. Collections and
//! dictionaries nest tokens recursively.

use std::fmt;

/// A structured argument token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A bare word such as `alpha` or `30`.
    Plain(String),
    /// A `"quoted"` literal, inner text kept verbatim.
    StringLiteral(String),
    /// `[a,b,c]`; item order is significant.
    Collection(Vec<Token>),
    /// `{k:v,k2:v2}`; insertion ordered, keys unique.
    Dictionary(Vec<(Token, Token)>),
    /// `${name}`, already resolved against a property source.
    Property {
        /// Property name between the braces.
        name: String,
        /// The substituted value.
        value: String,
    },
}

impl Token {
    /// Returns the text of a scalar token (plain, literal, or property).
    ///
    /// Collections and dictionaries have no scalar text.
    #[must_use]
    pub fn scalar_text(&self) -> Option<&str> {
        match self {
            Self::Plain(s) | Self::StringLiteral(s) => Some(s),
            Self::Property { value, .. } => Some(value),
            Self::Collection(_) | Self::Dictionary(_) => None,
        }
    }

    /// Returns a human-readable name for this token kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Plain(_) => "word",
            Self::StringLiteral(_) => "string literal",
            Self::Collection(_) => "collection",
            Self::Dictionary(_) => "dictionary",
            Self::Property { .. } => "property",
        }
    }

    /// Returns true for plain, literal, and property tokens.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Collection(_) | Self::Dictionary(_))
    }
}

impl fmt::Display for Token {
    /// Renders the token back in input syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(s) => write!(f, "{s}"),
            Self::StringLiteral(s) => write!(f, "\"{s}\""),
            Self::Collection(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Dictionary(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "}}")
            }
            Self::Property { name, .. } => write!(f, "${{{name}}}"),
        }
    }
}
