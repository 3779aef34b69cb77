//! Widget selectors.
//!
//! Selectors address widgets in a subtree: `*` matches everything, `#id`
//! matches by id, `.class` by class, and a bare name by widget type.
//! Malformed selector text is a hard error, never a silent non-match.

use std::fmt;

use crate::error::{Error, Result};

/// A parsed selector (e.g., `"#header"`, `".primary"`, `"Button"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `*` - matches every widget.
    Any,
    /// `#id` - matches by the `id` property.
    Id(String),
    /// `.class` - matches widgets carrying the class.
    Class(String),
    /// A bare type name.
    Type(String),
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Selector {
    /// Parse selector text.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text {
            "" => Err(Error::invalid_selector(text, "empty selector")),
            "*" => Ok(Selector::Any),
            _ => {
                if let Some(id) = text.strip_prefix('#') {
                    if valid_name(id) {
                        Ok(Selector::Id(id.to_string()))
                    } else {
                        Err(Error::invalid_selector(text, "invalid id selector"))
                    }
                } else if let Some(class) = text.strip_prefix('.') {
                    if valid_name(class) {
                        Ok(Selector::Class(class.to_string()))
                    } else {
                        Err(Error::invalid_selector(text, "invalid class selector"))
                    }
                } else if valid_name(text) {
                    Ok(Selector::Type(text.to_string()))
                } else {
                    Err(Error::invalid_selector(text, "invalid type selector"))
                }
            }
        }
    }

    /// Whether a widget with the given type name, id, and classes matches.
    pub fn matches(&self, type_name: &str, id: &str, classes: &[String]) -> bool {
        match self {
            Selector::Any => true,
            Selector::Id(wanted) => id == wanted,
            Selector::Class(wanted) => classes.iter().any(|c| c == wanted),
            Selector::Type(wanted) => type_name == wanted,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Any => f.write_str("*"),
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Class(class) => write!(f, ".{class}"),
            Selector::Type(name) => f.write_str(name),
        }
    }
}
