use serde::{Deserialize, Serialize};
use std::fmt;

/// Where accepted tags are written in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertLocation {
    /// Merge into the front-matter block, creating one when absent.
    #[default]
    FrontMatter,
    /// Insert inline `#tags` right after the current selection.
    AfterSelection,
    /// Insert inline `#tags` right before the current selection.
    BeforeSelection,
}

impl InsertLocation {
    /// Returns the configuration name of this location.
    pub fn name(self) -> &'static str {
        match self {
            Self::FrontMatter => "frontmatter",
            Self::AfterSelection => "after-selection",
            Self::BeforeSelection => "before-selection",
        }
    }

    /// Looks up a location by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "frontmatter" | "front-matter" => Some(Self::FrontMatter),
            "after-selection" => Some(Self::AfterSelection),
            "before-selection" => Some(Self::BeforeSelection),
            _ => None,
        }
    }

    /// Whether this location needs a non-empty selection to work.
    pub fn requires_selection(self) -> bool {
        match self {
            Self::FrontMatter => false,
            Self::AfterSelection | Self::BeforeSelection => true,
        }
    }
}

impl fmt::Display for InsertLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for location in [
            InsertLocation::FrontMatter,
            InsertLocation::AfterSelection,
            InsertLocation::BeforeSelection,
        ] {
            assert_eq!(InsertLocation::from_name(location.name()), Some(location));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(InsertLocation::from_name("sidebar"), None);
    }

    #[test]
    fn only_frontmatter_works_without_selection() {
        assert!(!InsertLocation::FrontMatter.requires_selection());
        assert!(InsertLocation::AfterSelection.requires_selection());
        assert!(InsertLocation::BeforeSelection.requires_selection());
    }
}
