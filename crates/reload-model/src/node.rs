use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;

use reload_core::action::NodeKind;
use reload_core::code::CodeDescriptor;
use reload_core::name::FullName;
use reload_lang::ast::MethodKind;
use reload_lang::runtime::{LiveClass, LiveFunction, LiveImportNames, LiveModule};
use reload_lang::Value;

/// The data a node carries beyond its kind/name/children, i.e. the part
/// of each variant's diffable attributes that actually needs comparing.
#[derive(Debug, Clone)]
pub enum Payload {
    Module,
    Class { bases: Vec<SmolStr> },
    Dictionary,
    /// Function/Method/ClassMethod/PropertyGetter/PropertySetter all share
    /// the twelve-field code descriptor as their sole diffable attribute.
    /// `source_text` is carried alongside even though it isn't compared
    /// (`CodeDescriptor` equality already captures whether the compiled
    /// form changed) because the engine needs it to swap a function's code
    /// in place without re-parsing the whole file a second time.
    Callable {
        code: CodeDescriptor,
        source_text: String,
    },
    /// Variable/ClassVariable/DictionaryItem.
    Value { value: Value },
    Import {
        path: Vec<SmolStr>,
        names: LiveImportNames,
    },
    /// A leaf aliasing an already-built node elsewhere in the same tree,
    /// used to break cycles.
    Reference { target: FullName },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub full_name: FullName,
    pub payload: Payload,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(kind: NodeKind, full_name: FullName, payload: Payload) -> Self {
        Node {
            kind,
            full_name,
            payload,
            children: Vec::new(),
        }
    }
}

/// Tracks which already-built nodes a runtime object's identity has been
/// assigned to, so that a second occurrence of the same `Arc` becomes a
/// `Reference` instead of a duplicate subtree.
#[derive(Default)]
struct SeenPointers {
    functions: HashMap<usize, FullName>,
    classes: HashMap<usize, FullName>,
}

fn ptr_key<T>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

/// Builds a tree rooted at `module_name` mirroring `module`'s current
/// contents. Used for both the live "old" tree and an ephemeral "new" tree
/// built from a throw-away re-import.
pub fn build_tree(module: &LiveModule, module_name: &str) -> Node {
    let root = FullName::root(module_name);
    let mut seen = SeenPointers::default();
    let mut children = Vec::new();

    let mut fn_names: Vec<SmolStr> = module.functions.iter().map(|e| e.key().clone()).collect();
    fn_names.sort();
    for name in fn_names {
        let func = module.functions.get(&name).unwrap().clone();
        children.push(build_function_node(
            &root.child(&name),
            NodeKind::Function,
            &func,
            &mut seen,
        ));
    }

    let mut class_names: Vec<SmolStr> = module.classes.iter().map(|e| e.key().clone()).collect();
    class_names.sort();
    for name in class_names {
        let class = module.classes.get(&name).unwrap().clone();
        children.push(build_class_node(&root.child(&name), &class, &mut seen));
    }

    let mut var_names: Vec<SmolStr> = module.variables.iter().map(|e| e.key().clone()).collect();
    var_names.sort();
    for name in var_names {
        let value = (**module.variables.get(&name).unwrap().load()).clone();
        children.push(build_value_node(&root.child(&name), NodeKind::Variable, value));
    }

    for binding in module.imports.load().iter() {
        children.extend(build_import_nodes(&root, binding));
    }

    children.sort_by(|a, b| a.full_name.as_str().cmp(b.full_name.as_str()));

    Node {
        kind: NodeKind::Module,
        full_name: root,
        payload: Payload::Module,
        children,
    }
}

fn build_function_node(
    full_name: &FullName,
    kind: NodeKind,
    func: &Arc<LiveFunction>,
    seen: &mut SeenPointers,
) -> Node {
    let key = ptr_key(func);
    if let Some(target) = seen.functions.get(&key) {
        return Node::leaf(
            NodeKind::Reference,
            full_name.clone(),
            Payload::Reference {
                target: target.clone(),
            },
        );
    }
    seen.functions.insert(key, full_name.clone());
    let code = (**func.code.load()).clone();
    let source_text = (**func.source_text.load()).clone();
    Node::leaf(
        kind,
        full_name.clone(),
        Payload::Callable { code, source_text },
    )
}

fn build_class_node(full_name: &FullName, class: &Arc<LiveClass>, seen: &mut SeenPointers) -> Node {
    let key = ptr_key(class);
    if let Some(target) = seen.classes.get(&key) {
        return Node::leaf(
            NodeKind::Reference,
            full_name.clone(),
            Payload::Reference {
                target: target.clone(),
            },
        );
    }
    seen.classes.insert(key, full_name.clone());

    let mut children = Vec::new();

    let mut method_names: Vec<SmolStr> = class.methods.iter().map(|e| e.key().clone()).collect();
    method_names.sort();
    for key in method_names {
        let method = class.methods.get(&key).unwrap().clone();
        // The table key carries the `__setter__` disambiguation since a
        // getter/setter pair share a surface name; the node's name is
        // derived from the function's own name, not the table key.
        let surface_name = &method.func.name;
        let (kind, member_name) = match method.kind {
            MethodKind::Instance => (NodeKind::Method, full_name.child(surface_name)),
            MethodKind::Class => (NodeKind::ClassMethod, full_name.child(surface_name)),
            MethodKind::PropertyGetter => (NodeKind::PropertyGetter, full_name.child(surface_name)),
            MethodKind::PropertySetter => {
                (NodeKind::PropertySetter, FullName::setter(full_name, surface_name))
            }
        };
        children.push(build_function_node(&member_name, kind, &method.func, seen));
    }

    let mut var_names: Vec<SmolStr> = class.class_vars.iter().map(|e| e.key().clone()).collect();
    var_names.sort();
    for name in var_names {
        let value = (**class.class_vars.get(&name).unwrap().load()).clone();
        children.push(build_value_node(
            &full_name.child(&name),
            NodeKind::ClassVariable,
            value,
        ));
    }

    children.sort_by(|a, b| a.full_name.as_str().cmp(b.full_name.as_str()));

    Node {
        kind: NodeKind::Class,
        full_name: full_name.clone(),
        payload: Payload::Class {
            bases: class.bases.load().as_ref().clone(),
        },
        children,
    }
}

/// Promotes a module- or class-level binding whose value is a dictionary
/// literal into a `Dictionary` container with one `DictionaryItem` child per
/// key; any other value stays a scalar leaf
/// of `kind` (`Variable` or `ClassVariable`).
fn build_value_node(full_name: &FullName, kind: NodeKind, value: Value) -> Node {
    match value {
        Value::Dict(map) => {
            let mut keys: Vec<SmolStr> = map.iter().map(|e| e.key().clone()).collect();
            keys.sort();
            let children = keys
                .into_iter()
                .map(|key| {
                    let item_value = (**map.get(&key).unwrap().load()).clone();
                    Node::leaf(
                        NodeKind::DictionaryItem,
                        full_name.child(&key),
                        Payload::Value { value: item_value },
                    )
                })
                .collect();
            Node {
                kind: NodeKind::Dictionary,
                full_name: full_name.clone(),
                payload: Payload::Dictionary,
                children,
            }
        }
        other => Node::leaf(kind, full_name.clone(), Payload::Value { value: other }),
    }
}

/// One `Import` node per bound name: a wildcard `import a.b;` binds the
/// last dotted segment, `from a.b import x, y;` binds each of `x`, `y`.
fn build_import_nodes(
    root: &FullName,
    binding: &reload_lang::runtime::ImportBinding,
) -> Vec<Node> {
    match &binding.names {
        LiveImportNames::Wildcard => {
            let bound_name = binding
                .path
                .last()
                .cloned()
                .unwrap_or_else(|| SmolStr::new(""));
            vec![Node::leaf(
                NodeKind::Import,
                root.child(&bound_name),
                Payload::Import {
                    path: binding.path.clone(),
                    names: binding.names.clone(),
                },
            )]
        }
        LiveImportNames::Explicit(names) => names
            .iter()
            .map(|name| {
                Node::leaf(
                    NodeKind::Import,
                    root.child(name),
                    Payload::Import {
                        path: binding.path.clone(),
                        names: LiveImportNames::Explicit(vec![name.clone()]),
                    },
                )
            })
            .collect(),
    }
}
