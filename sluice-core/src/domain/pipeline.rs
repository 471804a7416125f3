//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline definition
///
/// A named collection of resources loaded into one destination. Built once at
/// definition time (usually deserialized from JSON) and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    pub name: String,
    pub resources: Vec<ResourceDescriptor>,
    pub destination: DestinationDescriptor,
    /// Engine configuration, passed through untouched
    #[serde(default)]
    pub config: serde_json::Value,
    /// Names of the secrets the engine needs at run start
    #[serde(default)]
    pub secrets: Vec<String>,
}

impl PipelineDescriptor {
    /// Creates a pipeline with no engine config and no secrets
    pub fn new(
        name: impl Into<String>,
        destination: DestinationDescriptor,
        resources: Vec<ResourceDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            resources,
            destination,
            config: serde_json::Value::Null,
            secrets: Vec::new(),
        }
    }

    /// Declares a secret the engine needs
    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secrets.push(name.into());
        self
    }

    /// Looks up a resource by name
    pub fn resource(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Resource names in declaration order
    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name.as_str())
    }
}

/// Destination the pipeline loads into
///
/// Opaque to the bridge; only the engine interprets `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationDescriptor {
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl DestinationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: serde_json::Value::Null,
        }
    }
}

/// One independently refreshable unit of extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub write_disposition: WriteDisposition,
    /// Upstream resources within the same pipeline
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ResourceDescriptor {
    /// Creates an append-only resource with no key and no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            primary_key: None,
            write_disposition: WriteDisposition::default(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_write_disposition(mut self, disposition: WriteDisposition) -> Self {
        self.write_disposition = disposition;
        self
    }

    pub fn depends_on(mut self, upstream: impl Into<String>) -> Self {
        self.depends_on.push(upstream.into());
        self
    }
}

/// Strategy used when loading a resource's records into the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteDisposition {
    #[default]
    Append,
    Merge,
    Replace,
}

impl WriteDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteDisposition::Append => "append",
            WriteDisposition::Merge => "merge",
            WriteDisposition::Replace => "replace",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_json_applies_defaults() {
        let json = serde_json::json!({
            "name": "github",
            "destination": { "name": "duckdb" },
            "resources": [
                { "name": "issues", "primary_key": ["id"], "write_disposition": "merge" },
                { "name": "comments", "depends_on": ["issues"] }
            ]
        });

        let pipeline: PipelineDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(pipeline.name, "github");
        assert!(pipeline.secrets.is_empty());
        assert_eq!(pipeline.config, serde_json::Value::Null);

        let comments = pipeline.resource("comments").unwrap();
        assert_eq!(comments.write_disposition, WriteDisposition::Append);
        assert_eq!(comments.depends_on, vec!["issues".to_string()]);

        let issues = pipeline.resource("issues").unwrap();
        assert_eq!(issues.primary_key, Some(vec!["id".to_string()]));
        assert_eq!(issues.write_disposition, WriteDisposition::Merge);
    }

    #[test]
    fn test_resource_names_keep_declaration_order() {
        let pipeline = PipelineDescriptor::new(
            "p",
            DestinationDescriptor::new("sink"),
            vec![
                ResourceDescriptor::new("z"),
                ResourceDescriptor::new("a"),
                ResourceDescriptor::new("m"),
            ],
        );

        let names: Vec<&str> = pipeline.resource_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_write_disposition_display() {
        assert_eq!(WriteDisposition::Replace.to_string(), "replace");
        assert_eq!(
            serde_json::to_value(WriteDisposition::Merge).unwrap(),
            serde_json::json!("merge")
        );
    }
}
