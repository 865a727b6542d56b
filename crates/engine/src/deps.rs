//! Dependency analysis — which other read-only operations a guard
//! will need to call.
//!
//! Advisory by design: any provider or parse failure degrades to the
//! empty set instead of failing the build, at the cost of tests
//! stubbing fewer collaborators than ideal.

use crate::prompts;
use guardsmith_core::codegen::CodeGenerator;
use guardsmith_core::domain::Domain;
use guardsmith_core::policy::PolicyItem;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DependencyAnalyzer {
    generator: Arc<dyn CodeGenerator>,
}

impl DependencyAnalyzer {
    pub fn new(generator: Arc<dyn CodeGenerator>) -> Self {
        Self { generator }
    }

    /// Determine the read-only operations the guard for `item` should
    /// be allowed to call (and its tests must mock). May be empty.
    pub async fn analyze(
        &self,
        domain: &Domain,
        tool: &str,
        item: &PolicyItem,
    ) -> BTreeSet<String> {
        // With a single operation in the whole domain there is nothing
        // to depend on; skip the LLM round-trip.
        if domain.methods.len() <= 1 {
            return BTreeSet::new();
        }

        let Some(method) = domain.method(tool) else {
            // Join errors are the scaffolder's to raise; analysis stays
            // advisory.
            return BTreeSet::new();
        };

        let peers: BTreeSet<&str> = domain
            .read_only_peers(tool)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        if peers.is_empty() {
            return BTreeSet::new();
        }

        let ctx = prompts::dependency_analysis(domain, tool, method, item);
        let completion = match self.generator.generate(&ctx).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(tool, item = %item.name, error = %e, "Dependency analysis failed, proceeding with empty set");
                return BTreeSet::new();
            }
        };

        let names = parse_name_array(&completion);
        // Only names that exist in the domain as read-only non-self
        // operations survive; mutating operations must never qualify.
        let dependencies: BTreeSet<String> = names
            .into_iter()
            .filter(|name| peers.contains(name.as_str()))
            .collect();

        debug!(tool, item = %item.name, ?dependencies, "Dependency analysis complete");
        dependencies
    }
}

/// Pull a JSON string array out of a completion, tolerating prose or a
/// code fence around it.
fn parse_name_array(completion: &str) -> Vec<String> {
    let Some(start) = completion.find('[') else {
        return Vec::new();
    };
    let Some(end) = completion[start..].find(']') else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<String>>(&completion[start..start + end + 1]).unwrap_or_default()
}
