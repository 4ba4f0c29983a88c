//! Hierarchical service names

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hierarchical service name: an immutable sequence of segments, displayed
/// joined by `/` (for example `unit/app.war/STRUCTURE`).
///
/// Names are plain values; deriving a child name with [`append`](Self::append)
/// leaves the original untouched.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceName(Vec<String>);

impl ServiceName {
    /// A single-segment name.
    pub fn of(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// A name from an ordered segment sequence.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Derive a child name with one more segment.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The name with the final segment removed, if this name has more than
    /// one segment.
    pub fn parent(&self) -> Option<ServiceName> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    /// Whether `other` is a proper descendant of this name.
    pub fn is_parent_of(&self, other: &ServiceName) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The final segment.
    pub fn simple_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

// Debug repeating the Vec structure would only add noise to assertion
// output, so it prints the joined path like Display.
impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_segments() {
        let name = ServiceName::from_segments(["unit", "app.war"]);
        assert_eq!(name.to_string(), "unit/app.war");
        assert_eq!(name.append("STRUCTURE").to_string(), "unit/app.war/STRUCTURE");
    }

    #[test]
    fn parent_and_descendant_checks() {
        let unit = ServiceName::from_segments(["unit", "app.war"]);
        let phase = unit.append("PARSE");

        assert_eq!(phase.parent(), Some(unit.clone()));
        assert!(unit.is_parent_of(&phase));
        assert!(!phase.is_parent_of(&unit));
        assert!(!unit.is_parent_of(&unit));
        assert_eq!(ServiceName::of("root").parent(), None);
    }

    #[test]
    fn simple_name_is_last_segment() {
        let name = ServiceName::from_segments(["subunit", "shop.ear", "web.war"]);
        assert_eq!(name.simple_name(), "web.war");
    }
}
