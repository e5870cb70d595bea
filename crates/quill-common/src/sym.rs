use std::fmt;

use serde::Serialize;

/// A possibly module-qualified name such as `list.append` or `foo`.
///
/// Qualification may be partial: a reference written as `list.append`
/// matches a definition named `std.list.append`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SymName {
    pub qualifiers: Vec<String>,
    pub name: String,
}

impl SymName {
    pub fn unqualified(name: impl Into<String>) -> Self {
        SymName {
            qualifiers: Vec::new(),
            name: name.into(),
        }
    }

    /// Build a name qualified by a dotted module path, e.g. `("io", "state")`.
    pub fn qualified(module: &str, name: impl Into<String>) -> Self {
        SymName {
            qualifiers: module
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            name: name.into(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        !self.qualifiers.is_empty()
    }

    /// Whether a reference written as `reference` may denote `self`.
    pub fn matches(&self, reference: &SymName) -> bool {
        self.name == reference.name && self.qualifiers.ends_with(&reference.qualifiers)
    }
}

impl fmt::Display for SymName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in &self.qualifiers {
            write!(f, "{}.", q)?;
        }
        write!(f, "{}", self.name)
    }
}
