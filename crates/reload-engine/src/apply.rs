//! Mutates a live module in place to match one [`reload_model::DiffAction`].
//!
//! Every function here operates on the *slots* `reload-lang` already
//! exposes (`ArcSwap`/`DashMap` entries) rather than replacing a whole
//! `LiveModule`/`LiveClass`/`LiveFunction`, so identity is preserved exactly
//! where a live reference would otherwise break, and nowhere else.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use smol_str::SmolStr;

use reload_core::action::NodeKind;
use reload_core::name::FullName;
use reload_error::{FatalError, Result};
use reload_lang::ast::MethodKind;
use reload_lang::runtime::{ImportBinding, LiveFunction, LiveMethod, LiveModule};
use reload_lang::Value;
use reload_model::{DiffAction, Node, Payload};

fn missing(what: &str) -> reload_error::Error {
    FatalError::RegistryCorruption(format!("reload target not found: {what}")).into()
}

/// The dotted segments of `full_name` relative to `root`, e.g. `module.Car`
/// under root `module` yields `["Car"]`.
fn segments(root: &FullName, full_name: &FullName) -> Vec<String> {
    full_name
        .as_str()
        .strip_prefix(root.as_str())
        .unwrap_or(full_name.as_str())
        .trim_start_matches('.')
        .split('.')
        .map(str::to_owned)
        .collect()
}

/// Reconstructs a `Value` from an Add action's node: a scalar payload as-is,
/// or a `Dictionary` node's children rebuilt into a fresh `Value::Dict`.
fn node_to_value(node: &Node) -> Value {
    match &node.payload {
        Payload::Value { value } => value.clone(),
        Payload::Dictionary => {
            let map = DashMap::new();
            for child in &node.children {
                if let Payload::Value { value } = &child.payload {
                    map.insert(
                        SmolStr::new(child.full_name.last_segment()),
                        ArcSwap::from_pointee(value.clone()),
                    );
                }
            }
            Value::Dict(Arc::new(map))
        }
        _ => Value::None,
    }
}

fn dict_map(
    module: &LiveModule,
    container: &[String],
) -> Option<Arc<DashMap<SmolStr, ArcSwap<Value>>>> {
    match container {
        [name] => match &**module.variables.get(name.as_str())?.load() {
            Value::Dict(map) => Some(map.clone()),
            _ => None,
        },
        [class_name, var_name] => {
            let class = module.class(class_name)?;
            let value = class.class_vars.get(var_name.as_str())?.load();
            match &**value {
                Value::Dict(map) => Some(map.clone()),
                _ => None,
            }
        }
        _ => None,
    }
}

fn function_arc(module: &LiveModule, segs: &[String]) -> Option<Arc<LiveFunction>> {
    match segs {
        [name] => module.function(name),
        [class_name, member] => module
            .class(class_name)?
            .methods
            .get(member.as_str())
            .map(|m| m.func.clone()),
        _ => None,
    }
}

fn method_kind_for(kind: NodeKind) -> MethodKind {
    match kind {
        NodeKind::Method => MethodKind::Instance,
        NodeKind::ClassMethod => MethodKind::Class,
        NodeKind::PropertyGetter => MethodKind::PropertyGetter,
        NodeKind::PropertySetter => MethodKind::PropertySetter,
        other => unreachable!("not a callable kind: {other:?}"),
    }
}

fn insert_function(
    module: &LiveModule,
    kind: NodeKind,
    segs: &[String],
    func: Arc<LiveFunction>,
) -> Result<()> {
    match (kind, segs) {
        (NodeKind::Function, [name]) => {
            module.functions.insert(SmolStr::new(name), func);
            Ok(())
        }
        (_, [class_name, member]) => {
            let class = module.class(class_name).ok_or_else(|| missing(class_name))?;
            class.methods.insert(
                SmolStr::new(member),
                Arc::new(LiveMethod {
                    kind: method_kind_for(kind),
                    func,
                }),
            );
            Ok(())
        }
        _ => Err(missing("function target")),
    }
}

fn remove_function(module: &LiveModule, segs: &[String]) -> Result<()> {
    match segs {
        [name] => {
            module.functions.remove(name.as_str());
            Ok(())
        }
        [class_name, member] => {
            let class = module.class(class_name).ok_or_else(|| missing(class_name))?;
            class.methods.remove(member.as_str());
            Ok(())
        }
        _ => Err(missing("function target")),
    }
}

fn set_scalar(module: &LiveModule, kind: NodeKind, segs: &[String], value: Value) -> Result<()> {
    match (kind, segs) {
        (NodeKind::Variable | NodeKind::Dictionary, [name]) => {
            module.variables.insert(SmolStr::new(name), ArcSwap::from_pointee(value));
            Ok(())
        }
        (NodeKind::ClassVariable | NodeKind::Dictionary, [class_name, var_name]) => {
            let class = module.class(class_name).ok_or_else(|| missing(class_name))?;
            class
                .class_vars
                .insert(SmolStr::new(var_name), ArcSwap::from_pointee(value));
            Ok(())
        }
        (NodeKind::DictionaryItem, [container @ .., key]) => {
            let map = dict_map(module, container).ok_or_else(|| missing(key))?;
            map.insert(SmolStr::new(key), ArcSwap::from_pointee(value));
            Ok(())
        }
        _ => Err(missing("value target")),
    }
}

fn remove_scalar(module: &LiveModule, kind: NodeKind, segs: &[String]) -> Result<()> {
    match (kind, segs) {
        (NodeKind::Variable | NodeKind::Dictionary, [name]) => {
            module.variables.remove(name.as_str());
            Ok(())
        }
        (NodeKind::ClassVariable | NodeKind::Dictionary, [class_name, var_name]) => {
            let class = module.class(class_name).ok_or_else(|| missing(class_name))?;
            class.class_vars.remove(var_name.as_str());
            Ok(())
        }
        (NodeKind::DictionaryItem, [container @ .., key]) => {
            if let Some(map) = dict_map(module, container) {
                map.remove(key.as_str());
            }
            Ok(())
        }
        _ => Err(missing("value target")),
    }
}

fn update_scalar(module: &LiveModule, kind: NodeKind, segs: &[String], value: Value) -> Result<()> {
    match (kind, segs) {
        (NodeKind::Variable | NodeKind::Reference, [name]) => {
            let slot = module.variables.get(name.as_str()).ok_or_else(|| missing(name))?;
            slot.store(Arc::new(value));
            Ok(())
        }
        (NodeKind::ClassVariable, [class_name, var_name]) => {
            let class = module.class(class_name).ok_or_else(|| missing(class_name))?;
            let slot = class
                .class_vars
                .get(var_name.as_str())
                .ok_or_else(|| missing(var_name))?;
            slot.store(Arc::new(value));
            Ok(())
        }
        (NodeKind::DictionaryItem, [container @ .., key]) => {
            let map = dict_map(module, container).ok_or_else(|| missing(key))?;
            let slot = map.get(key.as_str()).ok_or_else(|| missing(key))?;
            slot.store(Arc::new(value));
            Ok(())
        }
        _ => Err(missing("value target")),
    }
}

fn merge_imports(module: &LiveModule, new_module: &LiveModule) {
    let mut merged: Vec<ImportBinding> = (**module.imports.load()).clone();
    for binding in new_module.imports.load().iter() {
        if !merged.iter().any(|existing| existing.path == binding.path) {
            merged.push(binding.clone());
        }
    }
    module.imports.store(Arc::new(merged));
}

/// Rebuilds every member of the container named by `p.full_name`'s first
/// segment from `new_module`'s counterpart, preserving that container's own
/// identity: a closure-capture shape change means an in-place code swap for
/// just the one callable would corrupt captured state, so the whole
/// container holding it is rebuilt instead. The container is either a class
/// (the `reason.full_name` names one of its methods, possibly several
/// segments down for a nested `def`) or, for a closure nested directly in a
/// top-level function rather than a method, that function's own flattened
/// family of qualified entries in the module's function table.
pub fn apply_parent_reload(
    module: &LiveModule,
    new_module: &LiveModule,
    root: &FullName,
    reason: &reload_model::ParentReloadNeeded,
) -> Result<String> {
    let segs = segments(root, &reason.full_name);
    let top = segs.first().ok_or_else(|| missing("reload target"))?;

    if let Some(old_class) = module.class(top) {
        let new_class = new_module.class(top).ok_or_else(|| missing(top))?;

        old_class.methods.clear();
        for entry in new_class.methods.iter() {
            old_class.methods.insert(entry.key().clone(), entry.value().clone());
        }
        old_class.class_vars.clear();
        for entry in new_class.class_vars.iter() {
            let value = (**entry.value().load()).clone();
            old_class
                .class_vars
                .insert(entry.key().clone(), ArcSwap::from_pointee(value));
        }
        old_class
            .bases
            .store(Arc::new(new_class.bases.load().as_ref().clone()));

        return Ok(top.clone());
    }

    let prefix = format!("{top}.");
    let stale: Vec<SmolStr> = module
        .functions
        .iter()
        .map(|e| e.key().clone())
        .filter(|k| k.as_str() == top.as_str() || k.as_str().starts_with(&prefix))
        .collect();
    for key in stale {
        module.functions.remove(key.as_str());
    }
    for entry in new_module.functions.iter() {
        let key = entry.key();
        if key.as_str() == top.as_str() || key.as_str().starts_with(&prefix) {
            module.functions.insert(key.clone(), entry.value().clone());
        }
    }

    Ok(top.clone())
}

/// Applies one diff action to `module`, resolving `Add`/rebind sources from
/// `new_module` where needed.
pub fn apply(
    module: &LiveModule,
    new_module: &LiveModule,
    root: &FullName,
    action: &DiffAction,
) -> Result<()> {
    match action {
        DiffAction::Add { kind, full_name, node } => {
            let segs = segments(root, full_name);
            match kind {
                NodeKind::Function
                | NodeKind::Method
                | NodeKind::ClassMethod
                | NodeKind::PropertyGetter
                | NodeKind::PropertySetter => {
                    let func = function_arc(new_module, &segs).ok_or_else(|| missing(full_name.as_str()))?;
                    insert_function(module, *kind, &segs, func)
                }
                NodeKind::Class => {
                    let class = new_module
                        .class(segs.first().ok_or_else(|| missing("class name"))?)
                        .ok_or_else(|| missing(full_name.as_str()))?;
                    module.classes.insert(SmolStr::new(&segs[0]), class);
                    Ok(())
                }
                NodeKind::Import => {
                    merge_imports(module, new_module);
                    Ok(())
                }
                _ => set_scalar(module, *kind, &segs, node_to_value(node)),
            }
        }
        DiffAction::Delete { kind, full_name } => {
            let segs = segments(root, full_name);
            match kind {
                NodeKind::Function
                | NodeKind::Method
                | NodeKind::ClassMethod
                | NodeKind::PropertyGetter
                | NodeKind::PropertySetter => remove_function(module, &segs),
                NodeKind::Class => {
                    module.classes.remove(segs.first().ok_or_else(|| missing("class name"))?.as_str());
                    Ok(())
                }
                _ => remove_scalar(module, *kind, &segs),
            }
        }
        DiffAction::UpdateCode {
            full_name,
            code,
            source_text,
            ..
        } => {
            let segs = segments(root, full_name);
            let func = function_arc(module, &segs).ok_or_else(|| missing(full_name.as_str()))?;
            func.swap_code_descriptor(code.clone(), source_text.clone());
            Ok(())
        }
        DiffAction::UpdateValue { kind, full_name, value } => {
            let segs = segments(root, full_name);
            update_scalar(module, *kind, &segs, value.clone())
        }
        DiffAction::UpdateClassBases { full_name, bases } => {
            let segs = segments(root, full_name);
            let class = module
                .class(segs.first().ok_or_else(|| missing("class name"))?)
                .ok_or_else(|| missing(full_name.as_str()))?;
            class.bases.store(Arc::new(bases.clone()));
            Ok(())
        }
        DiffAction::UpdateImport { .. } => {
            // Never generated, kept so
            // the match stays exhaustive if that changes.
            Ok(())
        }
        DiffAction::ParentReload(p) => apply_parent_reload(module, new_module, root, p).map(|_| ()),
    }
}
