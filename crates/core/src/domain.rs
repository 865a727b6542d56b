//! The generated domain surface that guards are written against.
//!
//! A `Domain` bundles the artifacts an external builder derives from an
//! OpenAPI document (or function introspection): a types module, an API
//! interface with one abstract method per tool, and a structured method
//! table. Guard generation consumes the method table directly — stub
//! signatures are rendered from `MethodSpec` values, never recovered by
//! parsing source text.

use crate::artifact::SourceArtifact;
use crate::error::{Error, GenerationError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One parameter of an abstract tool method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,

    /// Type annotation as it appears in the generated interface
    /// (e.g. "str", "list[PaymentMethod]").
    pub type_name: String,
}

/// The signature of one abstract tool method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodSpec {
    /// Tool slug; the join key against `ToolPolicy.tool_name`.
    pub name: String,

    pub params: Vec<ParamSpec>,

    pub return_type: String,

    /// Docstring carried over from the API description.
    #[serde(default)]
    pub doc: String,

    /// Whether the operation is side-effect free. Only read-only
    /// operations may ever be listed as guard dependencies.
    pub read_only: bool,
}

impl MethodSpec {
    /// Parameter list as `name: Type` fragments, in declaration order.
    pub fn param_fragments(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_name))
            .collect()
    }
}

/// Descriptor file (`domain.json`) naming the domain's artifacts and
/// carrying the method table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DomainDescriptor {
    interface_name: String,
    impl_class_name: String,
    types_module: String,
    api_interface: String,
    methods: Vec<MethodSpec>,
}

/// The full domain surface presented to generation steps.
#[derive(Debug, Clone)]
pub struct Domain {
    /// Generated type declarations (opaque to the engine, quoted into
    /// prompts verbatim).
    pub types_module: SourceArtifact,

    /// Generated abstract API interface.
    pub api_interface: SourceArtifact,

    /// Name of the abstract interface class.
    pub interface_name: String,

    /// Name of the runtime implementation class.
    pub impl_class_name: String,

    /// Structured signatures, one per tool.
    pub methods: Vec<MethodSpec>,
}

impl Domain {
    /// Load a domain from a directory holding `domain.json` plus the
    /// two artifact files it names.
    pub fn load(dir: &Path) -> Result<Self> {
        let descriptor_path = dir.join("domain.json");
        let raw = std::fs::read_to_string(&descriptor_path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", descriptor_path.display()),
        })?;
        let descriptor: DomainDescriptor = serde_json::from_str(&raw)?;

        let types_module = SourceArtifact::load(&dir.join(&descriptor.types_module))?;
        let api_interface = SourceArtifact::load(&dir.join(&descriptor.api_interface))?;

        Ok(Self {
            types_module,
            api_interface,
            interface_name: descriptor.interface_name,
            impl_class_name: descriptor.impl_class_name,
            methods: descriptor.methods,
        })
    }

    /// Look up a tool's abstract method.
    pub fn method(&self, tool_name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == tool_name)
    }

    /// Look up a tool's abstract method, failing fast on a missing
    /// join. A policy naming a tool the domain does not expose is a
    /// build-time configuration defect, never retried.
    pub fn require_method(&self, tool_name: &str) -> Result<&MethodSpec> {
        self.method(tool_name).ok_or_else(|| {
            GenerationError::MissingToolMethod {
                tool: tool_name.to_string(),
            }
            .into()
        })
    }

    /// Read-only operations other than `tool_name` — the only
    /// operations a guard is ever allowed to call.
    pub fn read_only_peers(&self, tool_name: &str) -> Vec<&MethodSpec> {
        self.methods
            .iter()
            .filter(|m| m.read_only && m.name != tool_name)
            .collect()
    }
}
