//! Resource descriptor index
//!
//! Validates a pipeline definition and answers structural questions about
//! its resources. Built once per pipeline at definition time.

use sluice_core::domain::pipeline::{PipelineDescriptor, ResourceDescriptor};
use std::collections::{BTreeSet, HashMap};

use crate::error::ConfigurationError;

/// Validated view over a pipeline's resources
#[derive(Debug, Clone)]
pub struct ResourceIndex {
    pipeline: PipelineDescriptor,
    positions: HashMap<String, usize>,
}

impl ResourceIndex {
    /// Validates the pipeline and indexes its resources
    ///
    /// # Errors
    /// Returns a `ConfigurationError` if:
    /// - The pipeline or a resource has an empty name
    /// - Two resources share a name
    /// - A dependency names a resource outside the pipeline, or the resource itself
    /// - Dependencies form a cycle
    /// - A primary key contains an empty field name
    pub fn build(pipeline: PipelineDescriptor) -> Result<Self, ConfigurationError> {
        if pipeline.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyPipelineName);
        }

        let mut positions = HashMap::with_capacity(pipeline.resources.len());
        for (idx, resource) in pipeline.resources.iter().enumerate() {
            if resource.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyResourceName {
                    pipeline: pipeline.name.clone(),
                });
            }
            if positions.insert(resource.name.clone(), idx).is_some() {
                return Err(ConfigurationError::DuplicateResource {
                    pipeline: pipeline.name.clone(),
                    resource: resource.name.clone(),
                });
            }
        }

        for resource in &pipeline.resources {
            validate_resource(&pipeline.name, resource, &positions)?;
        }

        let index = Self {
            pipeline,
            positions,
        };

        if let Some(cycle) = index.find_cycle() {
            return Err(ConfigurationError::DependencyCycle {
                pipeline: index.pipeline.name.clone(),
                resources: cycle,
            });
        }

        Ok(index)
    }

    /// The validated pipeline
    pub fn pipeline(&self) -> &PipelineDescriptor {
        &self.pipeline
    }

    pub fn name(&self) -> &str {
        &self.pipeline.name
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.pipeline.resources
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.positions
            .get(name)
            .map(|&idx| &self.pipeline.resources[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.pipeline.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipeline.resources.is_empty()
    }

    /// Resources that declare a dependency on `name`, in declaration order
    pub fn dependents_of(&self, name: &str) -> Vec<&ResourceDescriptor> {
        self.pipeline
            .resources
            .iter()
            .filter(|r| r.depends_on.iter().any(|d| d == name))
            .collect()
    }

    /// Builds a descriptor restricted to the given resources
    ///
    /// Resources keep their declaration order. Dependency edges pointing at
    /// resources outside the subset are dropped so the result is itself a
    /// valid pipeline. Names not in the pipeline are ignored.
    pub fn subset(&self, names: &BTreeSet<String>) -> PipelineDescriptor {
        let resources = self
            .pipeline
            .resources
            .iter()
            .filter(|r| names.contains(&r.name))
            .map(|r| {
                let mut resource = r.clone();
                resource.depends_on.retain(|d| names.contains(d));
                resource
            })
            .collect();

        PipelineDescriptor {
            resources,
            ..self.pipeline.clone()
        }
    }

    /// Depth-first search over dependency edges, returning the first cycle found
    ///
    /// Walks with an explicit stack so long dependency chains cannot overflow
    /// the thread's stack. Each frame holds a resource and the position of the
    /// next dependency to look at.
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let resources = &self.pipeline.resources;
        let mut marks = vec![Mark::Unvisited; resources.len()];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..resources.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (idx, next) = *frame;
                let Some(dep) = resources[idx].depends_on.get(next) else {
                    marks[idx] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                let dep_idx = self.positions[dep.as_str()];
                match marks[dep_idx] {
                    Mark::InProgress => {
                        let start = stack
                            .iter()
                            .position(|&(p, _)| p == dep_idx)
                            .unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(p, _)| resources[p].name.clone())
                            .collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Mark::Unvisited => {
                        marks[dep_idx] = Mark::InProgress;
                        stack.push((dep_idx, 0));
                    }
                    Mark::Done => {}
                }
            }
        }
        None
    }
}

fn validate_resource(
    pipeline: &str,
    resource: &ResourceDescriptor,
    positions: &HashMap<String, usize>,
) -> Result<(), ConfigurationError> {
    for dep in &resource.depends_on {
        if dep == &resource.name {
            return Err(ConfigurationError::SelfDependency {
                pipeline: pipeline.to_string(),
                resource: resource.name.clone(),
            });
        }
        if !positions.contains_key(dep) {
            return Err(ConfigurationError::DanglingDependency {
                pipeline: pipeline.to_string(),
                resource: resource.name.clone(),
                missing: dep.clone(),
            });
        }
    }

    if let Some(key) = &resource.primary_key {
        if key.iter().any(|field| field.trim().is_empty()) {
            return Err(ConfigurationError::EmptyPrimaryKeyField {
                pipeline: pipeline.to_string(),
                resource: resource.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::domain::pipeline::DestinationDescriptor;

    fn pipeline(resources: Vec<ResourceDescriptor>) -> PipelineDescriptor {
        PipelineDescriptor::new("github", DestinationDescriptor::new("duckdb"), resources)
    }

    #[test]
    fn test_build_valid_pipeline() {
        let index = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("issues").with_primary_key(["id"]),
            ResourceDescriptor::new("comments").depends_on("issues"),
            ResourceDescriptor::new("reactions").depends_on("comments"),
        ]))
        .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.name(), "github");
        assert!(index.contains("comments"));
        assert!(index.get("missing").is_none());

        let names: Vec<&str> = index.resources().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["issues", "comments", "reactions"]);

        let dependents: Vec<&str> = index
            .dependents_of("issues")
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(dependents, vec!["comments"]);
    }

    #[test]
    fn test_empty_pipeline_is_valid() {
        let index = ResourceIndex::build(pipeline(vec![])).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_rejects_empty_names() {
        let mut p = pipeline(vec![]);
        p.name = " ".to_string();
        assert_eq!(
            ResourceIndex::build(p).unwrap_err(),
            ConfigurationError::EmptyPipelineName
        );

        let err = ResourceIndex::build(pipeline(vec![ResourceDescriptor::new("")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyResourceName { .. }));
    }

    #[test]
    fn test_rejects_duplicate_resource() {
        let err = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("issues"),
            ResourceDescriptor::new("issues"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::DuplicateResource {
                pipeline: "github".to_string(),
                resource: "issues".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_dangling_dependency() {
        let err = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("comments").depends_on("issues"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::DanglingDependency {
                pipeline: "github".to_string(),
                resource: "comments".to_string(),
                missing: "issues".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_self_dependency() {
        let err = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("issues").depends_on("issues"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::SelfDependency { .. }));
    }

    #[test]
    fn test_rejects_cycle() {
        let err = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("a").depends_on("c"),
            ResourceDescriptor::new("b").depends_on("a"),
            ResourceDescriptor::new("c").depends_on("b"),
        ]))
        .unwrap_err();

        match err {
            ConfigurationError::DependencyCycle { resources, .. } => {
                assert_eq!(resources, vec!["a", "c", "b", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_long_dependency_chain_is_valid() {
        let resources: Vec<ResourceDescriptor> = (0..50_000)
            .map(|i| {
                let resource = ResourceDescriptor::new(format!("r{}", i));
                if i == 0 {
                    resource
                } else {
                    resource.depends_on(format!("r{}", i - 1))
                }
            })
            .collect();

        let index = ResourceIndex::build(pipeline(resources)).unwrap();
        assert_eq!(index.len(), 50_000);
    }

    #[test]
    fn test_long_chain_closing_on_itself_is_cycle() {
        let n = 20_000;
        let resources: Vec<ResourceDescriptor> = (0..n)
            .map(|i| {
                ResourceDescriptor::new(format!("r{}", i)).depends_on(format!("r{}", (i + 1) % n))
            })
            .collect();

        match ResourceIndex::build(pipeline(resources)).unwrap_err() {
            ConfigurationError::DependencyCycle { resources, .. } => {
                assert_eq!(resources.len(), n + 1);
                assert_eq!(resources.first(), resources.last());
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_blank_primary_key_field() {
        let err = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("issues").with_primary_key(["id", ""]),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptyPrimaryKeyField { .. }));
    }

    #[test]
    fn test_subset_drops_edges_outside_selection() {
        let index = ResourceIndex::build(pipeline(vec![
            ResourceDescriptor::new("issues"),
            ResourceDescriptor::new("comments").depends_on("issues"),
            ResourceDescriptor::new("reactions").depends_on("comments"),
        ]))
        .unwrap();

        let selection: BTreeSet<String> = ["reactions", "comments"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let subset = index.subset(&selection);

        let names: Vec<&str> = subset.resource_names().collect();
        assert_eq!(names, vec!["comments", "reactions"]);
        assert!(subset.resource("comments").unwrap().depends_on.is_empty());
        assert_eq!(
            subset.resource("reactions").unwrap().depends_on,
            vec!["comments".to_string()]
        );
        assert!(ResourceIndex::build(subset).is_ok());
    }
}
