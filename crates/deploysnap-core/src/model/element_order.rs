use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed role ordering descriptor
///
/// Outer sequence: execution groups, in order. Inner sequence: role names
/// belonging to the group. Stored on a snapshot as JSON (`[["a","b"],["c"]]`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementOrder(Vec<Vec<String>>);

impl ElementOrder {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self(groups)
    }

    /// Decode a stored descriptor
    ///
    /// Absent, blank and JSON `null` payloads give an empty order. A `null`
    /// group becomes an empty group so later groups keep their position.
    /// Inside a group only non-blank strings are kept: `null`, `false`, blank
    /// names and any other non-string entry are skipped.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the payload is not JSON, or when it or
    /// one of its groups is not a sequence.
    pub fn parse(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => return Ok(Self::default()),
        };

        let decoded: Option<Vec<Option<Vec<Value>>>> = serde_json::from_str(raw)?;
        let groups = decoded
            .unwrap_or_default()
            .into_iter()
            .map(|group| {
                group
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Value::String(name) if !name.trim().is_empty() => Some(name),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        Ok(Self(groups))
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All role names in descriptor order (group by group)
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flatten().map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        // Vec<Vec<String>> always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl From<Vec<Vec<&str>>> for ElementOrder {
    fn from(groups: Vec<Vec<&str>>) -> Self {
        Self(
            groups
                .into_iter()
                .map(|g| g.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}
