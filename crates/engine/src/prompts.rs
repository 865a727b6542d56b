//! Prompt assembly for the generation collaborator.
//!
//! Each state machine gets a `PromptContext` built here: a system
//! preamble stating the artifact kind and its hard constraints, plus a
//! task body quoting the domain declarations, the policy item, and
//! whatever the current trial is conditioned on. Repair trials reuse
//! the same task and attach the previous artifact and newest error
//! list via `PromptContext::revising`.

use crate::scaffold::{SUPPORT_MODULE, Scaffolder, item_guard_fn_name, test_file_name};
use guardsmith_core::codegen::PromptContext;
use guardsmith_core::domain::{Domain, MethodSpec};
use guardsmith_core::policy::PolicyItem;
use std::collections::BTreeSet;

/// Quote the domain declarations generated code is written against.
fn domain_block(domain: &Domain) -> String {
    format!(
        "Type declarations ({}):\n```python\n{}```\n\nAPI interface ({}):\n```python\n{}```\n",
        domain.types_module.file_name,
        domain.types_module.content,
        domain.api_interface.file_name,
        domain.api_interface.content,
    )
}

fn policy_block(item: &PolicyItem) -> String {
    let mut block = format!("Policy rule '{}': {}\n", item.name, item.description);
    if !item.references.is_empty() {
        block.push_str("\nSource excerpts:\n");
        for reference in &item.references {
            block.push_str(&format!("> {reference}\n"));
        }
    }
    if !item.compliance_examples.is_empty() {
        block.push_str("\nCompliant scenarios (must NOT raise):\n");
        for example in &item.compliance_examples {
            block.push_str(&format!("- {example}\n"));
        }
    }
    if !item.violation_examples.is_empty() {
        block.push_str("\nViolating scenarios (MUST raise PolicyViolation):\n");
        for example in &item.violation_examples {
            block.push_str(&format!("- {example}\n"));
        }
    }
    block
}

fn dependency_block(dependencies: &BTreeSet<String>) -> String {
    if dependencies.is_empty() {
        "The guard needs no other API operations; everything it checks is in its arguments.\n"
            .to_string()
    } else {
        let names: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        format!(
            "The guard may call these read-only API operations for context: {}.\n",
            names.join(", ")
        )
    }
}

/// Context for synthesizing a policy item's test file.
pub fn test_synthesis(
    domain: &Domain,
    tool: &str,
    item: &PolicyItem,
    stub_content: &str,
    dependencies: &BTreeSet<String>,
) -> PromptContext {
    let system = format!(
        "You write pytest test files for policy guard functions. \
         Reply with exactly one fenced Python code block and nothing else. \
         Write one test per compliant scenario asserting the guard raises nothing, \
         and one test per violating scenario asserting it raises PolicyViolation \
         (import it from {SUPPORT_MODULE}). \
         Mock the history collaborator and every listed read-only API operation \
         with doubles whose return values match the scenario under test; \
         never call the real API. Never produce an empty test file."
    );

    let fn_name = item_guard_fn_name(tool, &item.name);
    let task = format!(
        "Write `{}` testing the guard function `{}`.\n\n\
         Guard under test:\n```python\n{}```\n\n{}\n{}\n{}",
        test_file_name(tool, &item.name),
        fn_name,
        stub_content,
        domain_block(domain),
        policy_block(item),
        dependency_block(dependencies),
    );

    PromptContext::new(system, task)
}

/// Context for generating or improving a policy item's guard body.
pub fn guard_synthesis(
    domain: &Domain,
    tool: &str,
    item: &PolicyItem,
    signature: &str,
    dependencies: &BTreeSet<String>,
) -> PromptContext {
    let system = format!(
        "You implement policy guard functions in Python. \
         Reply with exactly one fenced Python code block containing the complete module. \
         The guard inspects the tool call's arguments (plus the history collaborator \
         and the listed read-only API operations) and raises PolicyViolation \
         (from {SUPPORT_MODULE}) when the call would break the policy; otherwise it \
         returns None. \
         You must keep this exact signature, unchanged in name, parameters, and order: \
         `{signature}`. \
         The guard is read-only: it must never call `{tool}` itself nor any other \
         mutating API operation."
    );

    let task = format!(
        "Implement the guard for tool `{tool}`.\n\n{}\n{}\n{}",
        domain_block(domain),
        policy_block(item),
        dependency_block(dependencies),
    );

    PromptContext::new(system, task)
}

/// Context for the dependency-analysis round-trip.
pub fn dependency_analysis(
    domain: &Domain,
    tool: &str,
    method: &MethodSpec,
    item: &PolicyItem,
) -> PromptContext {
    let system = "You analyze which read-only API operations a policy guard must call \
                  to obtain information not present in the tool call's own arguments. \
                  Reply with a JSON array of operation names and nothing else. \
                  Reply with [] when the arguments already carry everything the rule needs."
        .to_string();

    let signature =
        Scaffolder::render_signature(&item_guard_fn_name(tool, &item.name), domain, method);

    let peers: String = domain
        .read_only_peers(tool)
        .iter()
        .map(|m| format!("- {}({}): {}\n", m.name, m.param_fragments().join(", "), m.doc))
        .collect();

    let task = format!(
        "Guard signature:\n{signature}\n\n{}\nAvailable read-only operations:\n{peers}",
        policy_block(item),
    );

    PromptContext::new(system, task)
}
