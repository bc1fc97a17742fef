use serde::{Deserialize, Serialize};

use crate::name::FullName;

/// The eleven object-model node variants, plus `Reference`, giving
/// thirteen total tags. This enum carries no payload; it is purely the
/// "Variant" component of an action-trace line and is shared between
/// `reload-model` (which attaches the real per-variant data) and
/// `reload-engine` (which only needs the tag to render a trace).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    Class,
    Dictionary,
    Function,
    Method,
    ClassMethod,
    PropertyGetter,
    PropertySetter,
    Variable,
    ClassVariable,
    DictionaryItem,
    Import,
    Reference,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::Module => "Module",
            NodeKind::Class => "Class",
            NodeKind::Dictionary => "Dictionary",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::ClassMethod => "ClassMethod",
            NodeKind::PropertyGetter => "PropertyGetter",
            NodeKind::PropertySetter => "PropertySetter",
            NodeKind::Variable => "Variable",
            NodeKind::ClassVariable => "ClassVariable",
            NodeKind::DictionaryItem => "DictionaryItem",
            NodeKind::Import => "Import",
            NodeKind::Reference => "Reference",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Add,
    Update,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::Add => "Add",
            ActionKind::Update => "Update",
            ActionKind::Delete => "Delete",
        };
        f.write_str(s)
    }
}

/// A single line of the action trace, the stable external contract
/// rendered as `{Kind}: {Variant}: {full_name}`. This is what
/// `PartialReloader::run` returns and what a host logs/displays; it is
/// intentionally decoupled from the live data each action mutated so it
/// can be cloned, serialized, and compared freely in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTrace {
    pub kind: ActionKind,
    pub variant: NodeKind,
    pub full_name: String,
}

impl ActionTrace {
    pub fn new(kind: ActionKind, variant: NodeKind, full_name: &FullName) -> Self {
        ActionTrace {
            kind,
            variant,
            full_name: full_name.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for ActionTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.kind, self.variant, self.full_name)
    }
}
