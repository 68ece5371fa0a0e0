use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of a test file.
///
/// The kind selects which call identifiers count as declarations when a file
/// is indexed and which command runs it. It is derived from the file location
/// and never changes for an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Component tests
    Comp,
    /// End-to-end component tests
    Ecomp,
    /// Unit specs
    Spec,
}

impl TestKind {
    pub const ALL: [TestKind; 3] = [TestKind::Comp, TestKind::Ecomp, TestKind::Spec];

    /// Directory and identity name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Comp => "comp",
            TestKind::Ecomp => "ecomp",
            TestKind::Spec => "spec",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comp" => Ok(TestKind::Comp),
            "ecomp" => Ok(TestKind::Ecomp),
            "spec" => Ok(TestKind::Spec),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Returned when a path segment does not name a test kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown test kind: {0}")]
pub struct UnknownKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in TestKind::ALL {
            assert_eq!(kind.as_str().parse::<TestKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind() {
        assert_eq!("unit".parse::<TestKind>(), Err(UnknownKind("unit".to_string())));
        assert!("Spec".parse::<TestKind>().is_err());
    }
}
