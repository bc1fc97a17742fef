//! Tree-building and diffing scenarios that need more than one top-level
//! statement to exercise: nested method edits, identity-cycle promotion,
//! whole-class removal, and the free-variable-shape escalation path that
//! the parser itself never produces (no closures in this language) but a
//! host embedding richer code objects could.

use std::path::PathBuf;

use reload_core::action::NodeKind;
use reload_core::code::CodeDescriptor;
use reload_core::name::FullName;
use reload_lang::runtime::LiveModule;
use reload_lang::{parse_module, Value};
use reload_model::{build_tree, diff_trees, DiffAction, Node, Payload};
use smol_str::SmolStr;

fn tree(src: &str) -> Node {
    let ast = parse_module(src).unwrap();
    let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
    build_tree(&module, "module")
}

#[test]
fn nested_method_body_change_reports_method_full_name() {
    let old = tree(
        r#"
        class Carwash {
            def wash(self, cars) { return cars; }
        }
        "#,
    );
    let new = tree(
        r#"
        class Carwash {
            def wash(self) { return 1; }
        }
        "#,
    );
    let actions = diff_trees(&old, &new);
    assert_eq!(actions.len(), 1);
    match &actions[0] {
        DiffAction::UpdateCode { kind, full_name, .. } => {
            assert_eq!(*kind, NodeKind::Method);
            assert_eq!(full_name.as_str(), "module.Carwash.wash");
        }
        other => panic!("expected UpdateCode, got {other:?}"),
    }
}

#[test]
fn whole_class_removal_emits_single_delete() {
    let old = tree("class Carwash { }\ndef fun() { return 1; }");
    let new = tree("def fun() { return 1; }");
    let actions = diff_trees(&old, &new);
    assert_eq!(actions.len(), 1);
    match &actions[0] {
        DiffAction::Delete { kind, full_name } => {
            assert_eq!(*kind, NodeKind::Class);
            assert_eq!(full_name.as_str(), "module.Carwash");
        }
        other => panic!("expected Delete, got {other:?}"),
    }
}

#[test]
fn duplicate_function_identity_round_trips_through_build_and_diff() {
    // `g` is bound to the exact same `Arc<LiveFunction>` as `f`; build_tree
    // promotes the second occurrence to a Reference leaf rather than a
    // duplicate Function subtree, and diffing two such trees built the same
    // way reports no changes.
    let ast = parse_module("def f(x) { return x; }").unwrap();
    let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
    let shared = module.function("f").unwrap();
    module.functions.insert(SmolStr::new("g"), shared);

    let old = build_tree(&module, "module");
    let new = build_tree(&module, "module");

    let g_node = old.children.iter().find(|c| c.full_name.as_str() == "module.g").unwrap();
    assert_eq!(g_node.kind, NodeKind::Reference);

    assert!(diff_trees(&old, &new).is_empty());
}

fn code_with_free_vars(name: &str, free_vars: Vec<&str>) -> CodeDescriptor {
    CodeDescriptor {
        arg_count: 0,
        free_vars: free_vars.into_iter().map(SmolStr::new).collect(),
        cell_vars: Vec::new(),
        constants: Vec::new(),
        instructions: vec![0],
        line_table: Vec::new(),
        name: SmolStr::new(name),
        names: Vec::new(),
        local_count: 0,
        stack_size: 0,
        local_names: Vec::new(),
        flags: 0,
    }
}

fn callable_leaf(full_name: FullName, free_vars: Vec<&str>) -> Node {
    Node {
        kind: NodeKind::Function,
        full_name: full_name.clone(),
        payload: Payload::Callable {
            code: code_with_free_vars(full_name.last_segment(), free_vars),
            source_text: String::new(),
        },
        children: Vec::new(),
    }
}

#[test]
fn free_variable_shape_change_escalates_to_parent_reload() {
    let root = FullName::root("module");
    let name = root.child("fun");

    let old = Node {
        kind: NodeKind::Module,
        full_name: root.clone(),
        payload: Payload::Module,
        children: vec![callable_leaf(name.clone(), vec![])],
    };
    let new = Node {
        kind: NodeKind::Module,
        full_name: root,
        payload: Payload::Module,
        children: vec![callable_leaf(name.clone(), vec!["captured"])],
    };

    let actions = diff_trees(&old, &new);
    assert_eq!(actions.len(), 1);
    match &actions[0] {
        DiffAction::ParentReload(reason) => {
            assert_eq!(reason.full_name.as_str(), "module.fun");
        }
        other => panic!("expected ParentReload, got {other:?}"),
    }
}

#[test]
fn value_update_carries_through_a_module_level_variable() {
    let old = tree("let cars_n = 3;");
    let new = tree("let cars_n = 5;");
    let actions = diff_trees(&old, &new);
    assert_eq!(actions.len(), 1);
    match &actions[0] {
        DiffAction::UpdateValue { kind, full_name, value } => {
            assert_eq!(*kind, NodeKind::Variable);
            assert_eq!(full_name.as_str(), "module.cars_n");
            assert_eq!(*value, Value::Int(5));
        }
        other => panic!("expected UpdateValue, got {other:?}"),
    }
}
