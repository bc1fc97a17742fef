//! Structural diff between two trees built by
//! [`crate::node::build_tree`]. Produces a flat, ordered list of
//! [`DiffAction`]s; `reload-engine` is the only consumer that actually
//! mutates a live module from this list.

use smol_str::SmolStr;

use reload_core::action::NodeKind;
use reload_core::code::CodeDescriptor;
use reload_core::name::FullName;
use reload_lang::{LiveImportNames, Value};

use crate::node::{Node, Payload};
use crate::parent_reload::ParentReloadNeeded;
use crate::value_eq::values_equal;

/// One mutation the engine should apply, or a signal that a minimal patch
/// is impossible for this member.
#[derive(Debug, Clone)]
pub enum DiffAction {
    Add {
        kind: NodeKind,
        full_name: FullName,
        node: Node,
    },
    Delete {
        kind: NodeKind,
        full_name: FullName,
    },
    UpdateCode {
        kind: NodeKind,
        full_name: FullName,
        code: CodeDescriptor,
        source_text: String,
    },
    UpdateValue {
        kind: NodeKind,
        full_name: FullName,
        value: Value,
    },
    UpdateClassBases {
        full_name: FullName,
        bases: Vec<SmolStr>,
    },
    UpdateImport {
        full_name: FullName,
        path: Vec<SmolStr>,
        names: LiveImportNames,
    },
    ParentReload(ParentReloadNeeded),
}

impl DiffAction {
    pub fn full_name(&self) -> &FullName {
        match self {
            DiffAction::Add { full_name, .. }
            | DiffAction::Delete { full_name, .. }
            | DiffAction::UpdateCode { full_name, .. }
            | DiffAction::UpdateValue { full_name, .. }
            | DiffAction::UpdateClassBases { full_name, .. }
            | DiffAction::UpdateImport { full_name, .. } => full_name,
            DiffAction::ParentReload(p) => &p.full_name,
        }
    }
}

fn add_for(node: &Node) -> DiffAction {
    DiffAction::Add {
        kind: node.kind,
        full_name: node.full_name.clone(),
        node: node.clone(),
    }
}

/// Diffs the module roots of `old` and `new`, returning the full ordered
/// action list.
pub fn diff_trees(old: &Node, new: &Node) -> Vec<DiffAction> {
    let mut actions = Vec::new();
    diff_container(old, new, &mut actions);
    actions
}

/// Compares two containers' (Module/Class/Dictionary) children by full
/// name: adds for names only in `new`, deletes for names only in `old`
/// (adds precede deletes, so a reference created during the add phase
/// still sees the old value in place), then recurses/updates
/// for names in both.
fn diff_container(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    let mut new_only: Vec<&Node> = new
        .children
        .iter()
        .filter(|n| !old.children.iter().any(|o| o.full_name == n.full_name))
        .collect();
    new_only.sort_by(|a, b| a.full_name.as_str().cmp(b.full_name.as_str()));
    for node in new_only {
        actions.push(add_for(node));
    }

    let mut old_only: Vec<&Node> = old
        .children
        .iter()
        .filter(|o| !new.children.iter().any(|n| n.full_name == o.full_name))
        .collect();
    old_only.sort_by(|a, b| a.full_name.as_str().cmp(b.full_name.as_str()));
    for node in old_only {
        // Import deletes are suppressed, since removing a binding used
        // elsewhere would break unrelated dependents.
        if node.kind == NodeKind::Import {
            continue;
        }
        actions.push(DiffAction::Delete {
            kind: node.kind,
            full_name: node.full_name.clone(),
        });
    }

    let mut common: Vec<(&Node, &Node)> = new
        .children
        .iter()
        .filter_map(|n| {
            old.children
                .iter()
                .find(|o| o.full_name == n.full_name)
                .map(|o| (o, n))
        })
        .collect();
    common.sort_by(|a, b| a.1.full_name.as_str().cmp(b.1.full_name.as_str()));
    for (old_node, new_node) in common {
        diff_pair(old_node, new_node, actions);
    }
}

fn diff_pair(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    if old.kind != new.kind {
        // A binding changed shape entirely (e.g. a scalar variable became
        // a dict, or vice versa): no minimal patch applies, replace it.
        actions.push(DiffAction::Delete {
            kind: old.kind,
            full_name: old.full_name.clone(),
        });
        actions.push(add_for(new));
        return;
    }

    match new.kind {
        NodeKind::Function
        | NodeKind::Method
        | NodeKind::ClassMethod
        | NodeKind::PropertyGetter
        | NodeKind::PropertySetter => diff_callable(old, new, actions),
        NodeKind::Variable | NodeKind::ClassVariable | NodeKind::DictionaryItem => {
            diff_value(old, new, actions)
        }
        NodeKind::Class => diff_class(old, new, actions),
        NodeKind::Dictionary | NodeKind::Module => diff_container(old, new, actions),
        NodeKind::Import => diff_import(old, new, actions),
        NodeKind::Reference => diff_reference(old, new, actions),
    }
}

fn diff_callable(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    let (
        Payload::Callable {
            code: old_code, ..
        },
        Payload::Callable {
            code: new_code,
            source_text: new_source,
        },
    ) = (&old.payload, &new.payload)
    else {
        return;
    };
    if old_code == new_code {
        return;
    }
    if old_code.free_vars != new_code.free_vars {
        actions.push(DiffAction::ParentReload(ParentReloadNeeded {
            full_name: new.full_name.clone(),
            reason: format!(
                "free variables changed from {:?} to {:?}",
                old_code.free_vars, new_code.free_vars
            ),
        }));
        return;
    }
    actions.push(DiffAction::UpdateCode {
        kind: new.kind,
        full_name: new.full_name.clone(),
        code: new_code.clone(),
        source_text: new_source.clone(),
    });
}

fn diff_value(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    let (Payload::Value { value: old_value }, Payload::Value { value: new_value }) =
        (&old.payload, &new.payload)
    else {
        return;
    };
    if values_equal(old_value, new_value) {
        return;
    }
    actions.push(DiffAction::UpdateValue {
        kind: new.kind,
        full_name: new.full_name.clone(),
        value: new_value.clone(),
    });
}

/// Recurses into members before emitting a base-list rewrite (if any), so
/// that nested member updates are visible before the container-level
/// reshuffle, keeping the overall ordering bottom-up.
fn diff_class(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    diff_container(old, new, actions);
    let (Payload::Class { bases: old_bases }, Payload::Class { bases: new_bases }) =
        (&old.payload, &new.payload)
    else {
        return;
    };
    if old_bases != new_bases {
        actions.push(DiffAction::UpdateClassBases {
            full_name: new.full_name.clone(),
            bases: new_bases.clone(),
        });
    }
}

fn diff_import(_old: &Node, _new: &Node, _actions: &mut Vec<DiffAction>) {
    // Import bindings are never updated: a changed `from …
    // import …` clause surfaces as an Add of the new name plus (suppressed)
    // non-delete of the old one at the container level, not a diff here.
}

fn diff_reference(old: &Node, new: &Node, actions: &mut Vec<DiffAction>) {
    let (Payload::Reference { target: old_target }, Payload::Reference { target: new_target }) =
        (&old.payload, &new.payload)
    else {
        return;
    };
    if old_target != new_target {
        actions.push(DiffAction::UpdateValue {
            kind: NodeKind::Reference,
            full_name: new.full_name.clone(),
            value: Value::Unevaluated(SmolStr::new(new_target.as_str())),
        });
    }
}
