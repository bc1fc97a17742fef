//! End-to-end reload passes against real source files on disk, one per
//! seed scenario plus the two universal properties that are cheapest to
//! exercise black-box (idempotence, syntax-error-leaves-module-untouched).

use std::path::Path;
use std::sync::Arc;

use reload_core::action::{ActionKind, NodeKind};
use reload_deps::DependencyTracker;
use reload_engine::{ModuleRegistry, NoopCallbacks, PartialReloader, RegistryImportResolver};
use reload_error::{Error, FatalError, NoopPolicy};
use reload_lang::Value;

fn write(dir: &Path, name: &str, src: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, src).unwrap();
    path
}

fn load(registry: &ModuleRegistry, path: &Path, name: &str) {
    let module = reload_lang::import_from_path(path).unwrap();
    registry.insert(path.to_path_buf(), name, Arc::new(module));
}

fn reloader(
    path: &std::path::PathBuf,
    name: &str,
    project_root: &Path,
    registry: &Arc<ModuleRegistry>,
    tracker: &Arc<DependencyTracker>,
) -> PartialReloader {
    PartialReloader::new(
        path.clone(),
        name,
        project_root.to_path_buf(),
        registry.clone(),
        tracker.clone(),
    )
    .with_policy(Arc::new(NoopPolicy))
}

#[test]
fn scenario_1_add_top_level_function() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "module.rl", "def fun(a, b) { return a; }");
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");
    let (_, before) = registry.get(&path).unwrap();
    let fun_before = before.function("fun").unwrap();

    write(&dir, "module.rl", "def fun(a, b) { return a; }\ndef fun2(x) { return x; }");

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].kind, ActionKind::Add);
    assert_eq!(trace[0].variant, NodeKind::Function);
    assert_eq!(trace[0].full_name, "module.fun2");

    let (_, after) = registry.get(&path).unwrap();
    assert!(Arc::ptr_eq(&fun_before, &after.function("fun").unwrap()));
    assert!(after.function("fun2").is_some());
}

#[test]
fn scenario_2_modify_function_body_preserves_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "module.rl", "def fun(a, b) { return a; }");
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");
    let (_, before) = registry.get(&path).unwrap();
    let fun_before = before.function("fun").unwrap();
    let ptr_before = Arc::as_ptr(&fun_before);

    write(&dir, "module.rl", "def fun(a) { return a; }");

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].kind, ActionKind::Update);
    assert_eq!(trace[0].variant, NodeKind::Function);
    assert_eq!(trace[0].full_name, "module.fun");

    let (_, after) = registry.get(&path).unwrap();
    let fun_after = after.function("fun").unwrap();
    assert_eq!(Arc::as_ptr(&fun_after), ptr_before, "function identity must survive a body edit");
    assert_eq!(fun_after.code.load().arg_count, 1, "new arity should be observable");
}

#[test]
fn scenario_3_variable_update_cascades_to_importer() {
    let dir = tempfile::tempdir().unwrap();
    let carwash_path = write(&dir, "carwash.rl", "let sprinkler_n = 3;");
    let car_path = write(
        &dir,
        "car.rl",
        "from carwash import sprinkler_n;\nlet car_sprinklers = sprinkler_n / 3;",
    );

    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    tracker.enable(std::iter::empty());

    let resolver = RegistryImportResolver {
        registry: registry.clone(),
        source_root: dir.path().to_path_buf(),
    };
    let carwash_module =
        reload_lang::import_from_path_with_imports(&carwash_path, &resolver).unwrap();
    tracker.record_module_imports(&carwash_path, &carwash_module, |dotted| {
        Some(reload_deps::resolve_under_root(dir.path(), dotted))
    });
    registry.insert(carwash_path.clone(), "carwash", Arc::new(carwash_module));

    let car_module = reload_lang::import_from_path_with_imports(&car_path, &resolver).unwrap();
    tracker.record_module_imports(&car_path, &car_module, |dotted| {
        Some(reload_deps::resolve_under_root(dir.path(), dotted))
    });
    registry.insert(car_path.clone(), "car", Arc::new(car_module));

    write(&dir, "carwash.rl", "let sprinkler_n = 6;");

    let trace = reloader(&carwash_path, "carwash", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace[0].kind, ActionKind::Update);
    assert_eq!(trace[0].variant, NodeKind::Variable);
    assert_eq!(trace[0].full_name, "carwash.sprinkler_n");

    assert!(trace
        .iter()
        .any(|t| t.kind == ActionKind::Update && t.variant == NodeKind::Module && t.full_name == "car"));
    assert!(trace
        .iter()
        .any(|t| t.variant == NodeKind::Variable && t.full_name == "car.sprinkler_n"));
    assert!(trace
        .iter()
        .any(|t| t.variant == NodeKind::Variable && t.full_name == "car.car_sprinklers"));

    let (_, car_after) = registry.get(&car_path).unwrap();
    let car_sprinklers = car_after.variables.get("car_sprinklers").unwrap().load().clone();
    assert_eq!(*car_sprinklers, Value::Int(2));
}

#[test]
fn scenario_4_swap_dictionary_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "module.rl",
        r#"let car_data = { engine_power: 200, wheels: 4 };"#,
    );
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");

    write(
        &dir,
        "module.rl",
        r#"let car_data = { engine_power: 250, wheels: 4 };"#,
    );

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].kind, ActionKind::Update);
    assert_eq!(trace[0].variant, NodeKind::DictionaryItem);
    assert_eq!(trace[0].full_name, "module.car_data.engine_power");

    let (_, after) = registry.get(&path).unwrap();
    let dict = after.variables.get("car_data").unwrap().load().clone();
    match &*dict {
        Value::Dict(map) => {
            let power = map.get("engine_power").unwrap().load().clone();
            assert_eq!(*power, Value::Int(250));
        }
        other => panic!("expected Dict, got {other:?}"),
    }
}

#[test]
fn scenario_5_rename_dictionary_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "module.rl",
        r#"let car_data = { engine_power: 200, wheels: 4 };"#,
    );
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");

    write(
        &dir,
        "module.rl",
        r#"let car_data = { engine_force: 200, wheels: 4 };"#,
    );

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace.len(), 2);
    assert!(trace.iter().any(|t| t.kind == ActionKind::Add
        && t.variant == NodeKind::DictionaryItem
        && t.full_name == "module.car_data.engine_force"));
    assert!(trace.iter().any(|t| t.kind == ActionKind::Delete
        && t.variant == NodeKind::DictionaryItem
        && t.full_name == "module.car_data.engine_power"));
}

#[test]
fn scenario_6_add_base_class_preserves_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "module.rl", "class Carwash { }");
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");
    let (_, before) = registry.get(&path).unwrap();
    let class_before = before.class("Carwash").unwrap();

    write(&dir, "module.rl", "class Carwash(CarwashBase) { }");

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].kind, ActionKind::Update);
    assert_eq!(trace[0].variant, NodeKind::Class);
    assert_eq!(trace[0].full_name, "module.Carwash");

    let (_, after) = registry.get(&path).unwrap();
    let class_after = after.class("Carwash").unwrap();
    assert!(Arc::ptr_eq(&class_before, &class_after), "class identity must survive a base-list edit");
    assert_eq!(
        class_after.bases.load().as_ref().clone(),
        vec![smol_str::SmolStr::new("CarwashBase")]
    );
}

#[test]
fn scenario_7_syntax_error_leaves_module_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "module.rl", "def fun(a, b) { return a; }");
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");
    let (_, before) = registry.get(&path).unwrap();
    let fun_before = before.function("fun").unwrap();

    write(&dir, "module.rl", "def fun(a, b) { return a");

    let err = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap_err();
    assert!(matches!(err, Error::Fatal(FatalError::SyntaxError { .. })));

    let (_, after) = registry.get(&path).unwrap();
    assert!(Arc::ptr_eq(&fun_before, &after.function("fun").unwrap()));
}

#[test]
fn scenario_8_closure_capture_change_triggers_parent_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "module.rl",
        r#"
            class Carwash {
                def wash(self, cars_n) {
                    def bonus() { return cars_n; }
                    return bonus();
                }
            }
        "#,
    );
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");
    let (_, before) = registry.get(&path).unwrap();
    let class_before = before.class("Carwash").unwrap();

    write(
        &dir,
        "module.rl",
        r#"
            class Carwash {
                def wash(self, cars_n) {
                    let extra = 1;
                    def bonus() { return extra; }
                    return bonus();
                }
            }
        "#,
    );

    let trace = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();

    assert!(trace.iter().any(|t| t.kind == ActionKind::Update
        && t.variant == NodeKind::Class
        && t.full_name == "module.Carwash.wash.bonus"));

    let (_, after) = registry.get(&path).unwrap();
    let class_after = after.class("Carwash").unwrap();
    assert!(
        Arc::ptr_eq(&class_before, &class_after),
        "class identity must survive a parent reload"
    );
    let bonus = class_after.methods.get("wash.bonus").unwrap().func.clone();
    assert_eq!(bonus.code.load().free_vars, vec![smol_str::SmolStr::new("extra")]);
}

#[test]
fn idempotence_second_run_with_no_change_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "module.rl", "def fun(a, b) { return a; }");
    let registry = Arc::new(ModuleRegistry::new());
    let tracker = Arc::new(DependencyTracker::new());
    load(&registry, &path, "module");

    write(&dir, "module.rl", "def fun(a) { return a; }");
    let first = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();
    assert_eq!(first.len(), 1);

    let second = reloader(&path, "module", dir.path(), &registry, &tracker)
        .run(&NoopCallbacks)
        .unwrap();
    assert!(second.is_empty(), "re-running with no source change must produce no actions");
}
