//! Capability Registry
//!
//! Process-wide table of capability descriptors, built exactly once at
//! startup from a compiled-in list of constructors and read-only for the
//! rest of the process lifetime. Adding or removing a tool requires a
//! restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::capability::{Capability, CapabilitySchema};

/// One candidate tool: a stable source id and a constructor that may fail
/// (missing configuration, unavailable backing service). A failing
/// constructor skips only that candidate.
pub struct CapabilitySource {
    /// Stable identifier used for precedence and reporting
    pub id: &'static str,

    /// Constructor for the capability instance
    pub build: fn() -> anyhow::Result<Arc<dyn Capability>>,
}

/// Outcome of a registry build
#[derive(Clone, Debug, Default)]
pub struct RegistryBuildReport {
    /// Names registered, in registration order
    pub registered: Vec<String>,

    /// Skipped candidates as (source id, reason)
    pub skipped: Vec<(String, String)>,
}

/// Registry of available capabilities
pub struct CapabilityRegistry {
    // BTreeMap keeps name iteration sorted and deterministic
    capabilities: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// Build the registry from candidate sources.
    ///
    /// Sources are instantiated in ascending source-id order so the
    /// outcome of a name collision does not depend on declaration order:
    /// the candidate from the lexicographically smallest source id wins,
    /// every later claimant is skipped and reported. A constructor error
    /// is likewise skipped and reported, never fatal.
    pub fn load_all(mut sources: Vec<CapabilitySource>) -> (Self, RegistryBuildReport) {
        sources.sort_by_key(|s| s.id);

        let mut capabilities: BTreeMap<String, Arc<dyn Capability>> = BTreeMap::new();
        let mut report = RegistryBuildReport::default();

        for source in sources {
            match (source.build)() {
                Ok(capability) => {
                    let name = capability.schema().name;
                    if capabilities.contains_key(&name) {
                        tracing::warn!(
                            source = source.id,
                            tool = %name,
                            "Name collision, first registration wins"
                        );
                        report
                            .skipped
                            .push((source.id.to_string(), format!("name collision: {}", name)));
                        continue;
                    }
                    tracing::debug!(source = source.id, tool = %name, "Registered tool");
                    report.registered.push(name.clone());
                    capabilities.insert(name, capability);
                }
                Err(e) => {
                    tracing::warn!(source = source.id, error = %e, "Skipping tool source");
                    report.skipped.push((source.id.to_string(), e.to_string()));
                }
            }
        }

        (Self { capabilities }, report)
    }

    /// Get a capability by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    /// Sorted, duplicate-free list of registered names
    pub fn names(&self) -> Vec<String> {
        self.capabilities.keys().cloned().collect()
    }

    /// All schemas, in name order
    pub fn schemas(&self) -> Vec<CapabilitySchema> {
        self.capabilities.values().map(|c| c.schema()).collect()
    }

    /// Number of registered capabilities
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Generate the system prompt section describing available tools.
    /// Ordering is stable so prompts are reproducible across restarts.
    pub fn prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");
        prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
        prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");

        for schema in self.schemas() {
            prompt.push_str(&format!("### {}\n", schema.name));
            prompt.push_str(&format!("{}\n", schema.description));

            if !schema.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &schema.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    prompt.push_str(&format!(
                        "- `{}` ({}){}: {}\n",
                        param.name, param.param_type, required, param.description
                    ));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Observation, ToolCall};
    use crate::error::Result;
    use async_trait::async_trait;

    struct NamedTool(&'static str);

    #[async_trait]
    impl Capability for NamedTool {
        fn schema(&self) -> CapabilitySchema {
            CapabilitySchema {
                name: self.0.into(),
                description: "test tool".into(),
                parameters: vec![],
                category: None,
                has_side_effects: false,
                resource_kind: None,
            }
        }

        async fn execute(&self, _call: &ToolCall) -> Result<Observation> {
            Ok(Observation::ok(self.0, "ok"))
        }
    }

    fn source(id: &'static str, build: fn() -> anyhow::Result<Arc<dyn Capability>>) -> CapabilitySource {
        CapabilitySource { id, build }
    }

    #[test]
    fn test_failing_constructor_is_isolated() {
        let sources = vec![
            source("a_ok", || Ok(Arc::new(NamedTool("alpha")))),
            source("b_broken", || anyhow::bail!("backing service missing")),
            source("c_ok", || Ok(Arc::new(NamedTool("gamma")))),
        ];

        let (registry, report) = CapabilityRegistry::load_all(sources);

        assert_eq!(registry.len(), 2);
        assert_eq!(report.registered, vec!["alpha", "gamma"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "b_broken");
    }

    #[test]
    fn test_name_collision_first_source_wins() {
        let sources = vec![
            source("z_late", || Ok(Arc::new(NamedTool("dup")))),
            source("a_early", || Ok(Arc::new(NamedTool("dup")))),
        ];

        let (registry, report) = CapabilityRegistry::load_all(sources);

        assert_eq!(registry.len(), 1);
        assert_eq!(report.registered, vec!["dup"]);
        assert_eq!(report.skipped.len(), 1);
        // Precedence is by source id, not declaration order
        assert_eq!(report.skipped[0].0, "z_late");
    }

    #[test]
    fn test_collision_outcome_is_order_independent() {
        let forward = vec![
            source("a_early", || Ok(Arc::new(NamedTool("dup")))),
            source("z_late", || Ok(Arc::new(NamedTool("dup")))),
        ];
        let reversed = vec![
            source("z_late", || Ok(Arc::new(NamedTool("dup")))),
            source("a_early", || Ok(Arc::new(NamedTool("dup")))),
        ];

        let (_, r1) = CapabilityRegistry::load_all(forward);
        let (_, r2) = CapabilityRegistry::load_all(reversed);

        assert_eq!(r1.skipped, r2.skipped);
        assert_eq!(r1.registered, r2.registered);
    }

    #[test]
    fn test_names_sorted_without_duplicates() {
        let sources = vec![
            source("s1", || Ok(Arc::new(NamedTool("zulu")))),
            source("s2", || Ok(Arc::new(NamedTool("alpha")))),
            source("s3", || Ok(Arc::new(NamedTool("mike")))),
        ];

        let (registry, _) = CapabilityRegistry::load_all(sources);
        let names = registry.names();

        assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_prompt_section_lists_tools() {
        let sources = vec![source("s1", || Ok(Arc::new(NamedTool("alpha"))))];
        let (registry, _) = CapabilityRegistry::load_all(sources);

        let prompt = registry.prompt_section();
        assert!(prompt.contains("### alpha"));
        assert!(prompt.contains("```tool"));
    }
}
