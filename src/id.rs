use compact_str::CompactString;
use serde_json::Value;

/// owner/name pair identifying a GitHub repository
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RepositoryIdentity {
    owner: CompactString,
    name: CompactString,
}

impl RepositoryIdentity {
    pub fn new<O, N>(owner: O, name: N) -> Self
    where
        O: Into<CompactString>,
        N: Into<CompactString>,
    {
        Self { owner: owner.into(), name: name.into() }
    }

    /// Builds an identity only when both parts are present and non-empty
    pub fn from_parts(owner: Option<&str>, name: Option<&str>) -> Option<Self> {
        match (owner, name) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                Some(Self::new(owner, name))
            },
            _ => None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key: JSON object with `name` then `owner`, always in that order
    pub fn cache_key(&self) -> String {
        format!(
            "{{\"name\":{},\"owner\":{}}}",
            Value::from(self.name.as_str()),
            Value::from(self.owner.as_str())
        )
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
