//! Guard scaffolding — the trial-0 version of every artifact the
//! repair loops will supersede.
//!
//! Pure templating over structured `MethodSpec` values: no LLM call,
//! no failure path other than the fail-fast join check, and therefore
//! never retried. The scaffolder also owns the deterministic file and
//! function naming every later stage binds to.

use guardsmith_core::artifact::SourceArtifact;
use guardsmith_core::domain::{Domain, MethodSpec};
use guardsmith_core::error::Result;
use guardsmith_core::policy::ToolPolicy;
use std::path::Path;
use tracing::debug;

/// Shared support module defining the typed violation exception and the
/// history-introspection protocol every guard and test double agrees on.
pub const SUPPORT_MODULE: &str = "guards_support";

/// Name of the orchestrating guard function for a tool.
pub fn tool_guard_fn_name(tool: &str) -> String {
    format!("guard_{tool}")
}

/// Name of one policy item's guard function.
pub fn item_guard_fn_name(tool: &str, item: &str) -> String {
    format!("guard_{tool}_{item}")
}

/// File name of one policy item's guard module.
pub fn item_guard_file_name(tool: &str, item: &str) -> String {
    format!("guard_{tool}_{item}.py")
}

/// File name of one policy item's generated test module.
pub fn test_file_name(tool: &str, item: &str) -> String {
    format!("test_{tool}_{item}.py")
}

/// The trial-0 artifact set for one tool.
#[derive(Debug, Clone)]
pub struct Scaffold {
    pub guard_fn_name: String,
    pub tool_guard: SourceArtifact,
    pub item_stubs: Vec<SourceArtifact>,
}

pub struct Scaffolder;

impl Scaffolder {
    /// Render and persist the trial-0 artifacts for one tool under
    /// `guards_dir`, creating the directory layout later debug
    /// artifacts are written into.
    ///
    /// Fails fast when the policy's tool has no matching abstract
    /// method — a missing join is a build-time configuration defect,
    /// raised before any LLM call is made.
    pub fn scaffold(domain: &Domain, policy: &ToolPolicy, guards_dir: &Path) -> Result<Scaffold> {
        let method = domain.require_method(&policy.tool_name)?;

        let item_stubs: Vec<SourceArtifact> = policy
            .policy_items
            .iter()
            .map(|item| Self::item_stub(domain, method, &policy.tool_name, &item.name, &item.description))
            .collect();

        let tool_guard = Self::tool_guard(domain, method, policy);

        for stub in &item_stubs {
            stub.save(guards_dir)?;
        }
        tool_guard.save(guards_dir)?;

        debug!(
            tool = %policy.tool_name,
            items = item_stubs.len(),
            "Scaffolded trial-0 guard artifacts"
        );

        Ok(Scaffold {
            guard_fn_name: tool_guard_fn_name(&policy.tool_name),
            tool_guard,
            item_stubs,
        })
    }

    /// The signature every revision of an item guard must keep: the
    /// tool method's own parameters prefixed by the two injected
    /// collaborators.
    pub fn render_signature(fn_name: &str, domain: &Domain, method: &MethodSpec) -> String {
        let mut params = vec![
            "history: ChatHistory".to_string(),
            format!("api: {}", domain.interface_name),
        ];
        params.extend(method.param_fragments());
        format!("def {fn_name}({}) -> None:", params.join(", "))
    }

    fn module_imports(domain: &Domain) -> String {
        let types_stem = module_stem(&domain.types_module.file_name);
        let api_stem = module_stem(&domain.api_interface.file_name);
        format!(
            "from {SUPPORT_MODULE} import ChatHistory, PolicyViolation\n\
             from {types_stem} import *\n\
             from {api_stem} import {}\n",
            domain.interface_name
        )
    }

    /// One policy item's no-op stub, annotated with the policy text so
    /// generation prompts have grounding context.
    fn item_stub(
        domain: &Domain,
        method: &MethodSpec,
        tool: &str,
        item: &str,
        description: &str,
    ) -> SourceArtifact {
        let fn_name = item_guard_fn_name(tool, item);
        let signature = Self::render_signature(&fn_name, domain, method);

        let mut content = Self::module_imports(domain);
        content.push('\n');
        content.push('\n');
        content.push_str(&signature);
        content.push('\n');
        content.push_str(&format!("    \"\"\"{}\"\"\"\n", description.trim()));
        content.push_str("    pass\n");

        SourceArtifact::new(item_guard_file_name(tool, item), content)
    }

    /// The orchestrating tool guard: imports every item guard and
    /// invokes them in policy order, passing through the same
    /// arguments.
    fn tool_guard(domain: &Domain, method: &MethodSpec, policy: &ToolPolicy) -> SourceArtifact {
        let tool = &policy.tool_name;
        let fn_name = tool_guard_fn_name(tool);

        let mut content = Self::module_imports(domain);
        for item in &policy.policy_items {
            let item_fn = item_guard_fn_name(tool, &item.name);
            let item_file = item_guard_file_name(tool, &item.name);
            let item_module = module_stem(&item_file);
            content.push_str(&format!("from {item_module} import {item_fn}\n"));
        }

        let mut args = vec!["history".to_string(), "api".to_string()];
        args.extend(method.params.iter().map(|p| p.name.clone()));
        let arg_list = args.join(", ");

        content.push('\n');
        content.push('\n');
        content.push_str(&Self::render_signature(&fn_name, domain, method));
        content.push('\n');
        content.push_str(&format!(
            "    \"\"\"Run every policy guard for {tool} in order.\"\"\"\n"
        ));
        for item in &policy.policy_items {
            let item_fn = item_guard_fn_name(tool, &item.name);
            content.push_str(&format!("    {item_fn}({arg_list})\n"));
        }

        SourceArtifact::new(format!("guard_{tool}.py"), content)
    }

    /// The shared support module: the typed violation exception plus
    /// the history-introspection protocol. Written once per run, before
    /// any generation work begins.
    pub fn support_module() -> SourceArtifact {
        let content = "\
from typing import Any, Protocol


class PolicyViolation(Exception):
    \"\"\"Raised by a guard when a tool call would break policy.\"\"\"


class ChatHistory(Protocol):
    def ask(self, question: str) -> bool:
        \"\"\"Answer a yes/no question about the conversation so far.\"\"\"
        ...

    def tool_returned(self, tool_name: str, value: Any) -> bool:
        \"\"\"Whether a prior call to tool_name returned the given value.\"\"\"
        ...
";
        SourceArtifact::new(format!("{SUPPORT_MODULE}.py"), content)
    }
}

/// File stem usable as a Python module name.
fn module_stem(file_name: &str) -> &str {
    file_name.strip_suffix(".py").unwrap_or(file_name)
}
