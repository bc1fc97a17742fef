//! The live, in-memory representation of a reloaded module.
//!
//! Functions, methods, and variables live behind an [`ArcSwap`] slot rather
//! than being replaced wholesale: the reload engine swaps the slot's
//! contents in place, so any `Arc<LiveFunction>` a caller is already holding
//! keeps working and observes the new body on its next call. This is the
//! systems-language reading of CPython's in-place `__code__` mutation.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use smol_str::SmolStr;

use reload_core::code::CodeDescriptor;

use std::collections::HashMap;

use crate::ast::{ClassDef, Expr, FunctionDef, ImportNames, Item, MethodKind, ModuleAst, Stmt};
use crate::codegen::{compile_function, compile_function_with_scope};
use crate::eval::eval_expr;

/// The live counterpart of [`ImportNames`]: the binding an `Import` node
/// carries for the lifetime of the module.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveImportNames {
    Wildcard,
    Explicit(Vec<SmolStr>),
}

impl From<&ImportNames> for LiveImportNames {
    fn from(names: &ImportNames) -> Self {
        match names {
            ImportNames::Wildcard => LiveImportNames::Wildcard,
            ImportNames::Explicit(names) => {
                LiveImportNames::Explicit(names.iter().map(SmolStr::new).collect())
            }
        }
    }
}

/// One `import`/`from … import …` statement as it appears in a loaded
/// module: the dotted path of the module it binds to, plus which symbols
/// of that module it makes visible.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBinding {
    pub path: Vec<SmolStr>,
    pub names: LiveImportNames,
}

/// Resolves one bound name of an import statement to its current value in
/// the module it names, so the importing module can materialise a local
/// copy. `reload-engine` is the only
/// implementor, backed by its module registry; this crate stays ignorant
/// of how modules are loaded or addressed.
pub trait ImportResolver {
    fn resolve(&self, path: &[SmolStr], name: &str) -> Option<Value>;
}

impl<F> ImportResolver for F
where
    F: Fn(&[SmolStr], &str) -> Option<Value>,
{
    fn resolve(&self, path: &[SmolStr], name: &str) -> Option<Value> {
        self(path, name)
    }
}

struct NoImports;
impl ImportResolver for NoImports {
    fn resolve(&self, _path: &[SmolStr], _name: &str) -> Option<Value> {
        None
    }
}

/// A runtime value. Since this crate never executes bodies, non-literal
/// initializers are retained as their source text rather than evaluated.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(SmolStr),
    Bool(bool),
    None,
    Dict(Arc<DashMap<SmolStr, ArcSwap<Value>>>),
    /// A reference to another named object in the module graph: an
    /// import alias, or an expression this interpreter does not evaluate.
    Unevaluated(SmolStr),
}

/// `DashMap`/`ArcSwap` carry no structural `PartialEq`, so a `Dict` is only
/// ever equal to the exact same swappable map (identity), not a
/// structurally-equal copy. `reload-model`'s `Dictionary` node variant does
/// not rely on this impl for its own key/value diffing — it recurses into
/// items directly — this exists so `Value` itself stays comparable for the
/// primitive cases callers actually compare (literals, `Unevaluated`).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
            (Value::Unevaluated(a), Value::Unevaluated(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Evaluates `expr` with no bound names in scope; a convenience for
    /// contexts (class variables) that don't yet thread a module scope
    /// through. See [`crate::eval::eval_expr`] for the scoped form the
    /// module-level loader uses.
    pub fn from_expr(expr: &Expr) -> Self {
        eval_expr(expr, &HashMap::new())
    }
}

fn collect_let_names(body: &[Stmt], names: &mut Vec<SmolStr>) {
    for stmt in body {
        match stmt {
            Stmt::Let { name, .. } => names.push(SmolStr::new(name)),
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                collect_let_names(then_block, names);
                collect_let_names(else_block, names);
            }
            _ => {}
        }
    }
}

/// The names a function/method body makes available to a `def` nested
/// directly inside it: its own params plus every `let`-bound name anywhere
/// in its body (branches included, regardless of source order — a looser
/// approximation than the order-sensitive tracking `codegen::Encoder` does
/// for its own instruction stream, but sufficient to decide what a nested
/// closure can capture).
fn local_names_of(params: &[String], body: &[Stmt]) -> Vec<SmolStr> {
    let mut names: Vec<SmolStr> = params.iter().map(SmolStr::new).collect();
    collect_let_names(body, &mut names);
    names
}

/// Walks `body` for `def` statements nested inside it and registers each as
/// its own entry in `table`, keyed by its dotted path from `prefix` (e.g. a
/// `bonus` nested in top-level function `wash` becomes `wash.bonus`), so
/// `reload-model`'s tree-building picks it up as an ordinary diffable
/// `Function` node alongside its enclosing one. `enclosing_locals` is every
/// name `body` itself can see from its lexical ancestors; widened by this
/// function's own locals before recursing into anything nested inside it.
fn register_nested_functions(
    body: &[Stmt],
    prefix: &str,
    enclosing_locals: &[SmolStr],
    table: &DashMap<SmolStr, Arc<LiveFunction>>,
) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(nested) => {
                let qualified = format!("{prefix}.{}", nested.name);
                let code = compile_function_with_scope(nested, enclosing_locals);
                table.insert(
                    SmolStr::new(&qualified),
                    Arc::new(LiveFunction {
                        name: SmolStr::new(&qualified),
                        code: ArcSwap::from_pointee(code),
                        source_text: ArcSwap::from_pointee(nested.source_text.clone()),
                    }),
                );
                let mut nested_scope = enclosing_locals.to_vec();
                nested_scope.extend(local_names_of(&nested.params, &nested.body));
                register_nested_functions(&nested.body, &qualified, &nested_scope, table);
            }
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                register_nested_functions(then_block, prefix, enclosing_locals, table);
                register_nested_functions(else_block, prefix, enclosing_locals, table);
            }
            _ => {}
        }
    }
}

/// Same as [`register_nested_functions`], but for a `def` nested inside a
/// method body: the table it registers into keys `Arc<LiveMethod>` rather
/// than `Arc<LiveFunction>` directly.
fn register_nested_methods(
    body: &[Stmt],
    prefix: &str,
    enclosing_locals: &[SmolStr],
    table: &DashMap<SmolStr, Arc<LiveMethod>>,
) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(nested) => {
                let qualified = format!("{prefix}.{}", nested.name);
                let code = compile_function_with_scope(nested, enclosing_locals);
                let func = Arc::new(LiveFunction {
                    name: SmolStr::new(&qualified),
                    code: ArcSwap::from_pointee(code),
                    source_text: ArcSwap::from_pointee(nested.source_text.clone()),
                });
                table.insert(
                    SmolStr::new(&qualified),
                    Arc::new(LiveMethod {
                        kind: MethodKind::Instance,
                        func,
                    }),
                );
                let mut nested_scope = enclosing_locals.to_vec();
                nested_scope.extend(local_names_of(&nested.params, &nested.body));
                register_nested_methods(&nested.body, &qualified, &nested_scope, table);
            }
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                register_nested_methods(then_block, prefix, enclosing_locals, table);
                register_nested_methods(else_block, prefix, enclosing_locals, table);
            }
            _ => {}
        }
    }
}

/// A function whose code object can be hot-swapped without invalidating
/// handles held elsewhere in the graph.
#[derive(Debug)]
pub struct LiveFunction {
    pub name: SmolStr,
    pub code: ArcSwap<CodeDescriptor>,
    pub source_text: ArcSwap<String>,
}

impl LiveFunction {
    pub fn from_ast(func: &FunctionDef) -> Arc<Self> {
        Arc::new(Self {
            name: SmolStr::new(&func.name),
            code: ArcSwap::from_pointee(compile_function(func)),
            source_text: ArcSwap::from_pointee(func.source_text.clone()),
        })
    }

    /// Swaps in a new code object and source text, preserving this
    /// function's identity for anyone already holding an `Arc` to it.
    pub fn swap_code(&self, func: &FunctionDef) {
        self.code.store(Arc::new(compile_function(func)));
        self.source_text.store(Arc::new(func.source_text.clone()));
    }

    /// Same as [`Self::swap_code`], but from an already-compiled descriptor
    /// rather than re-compiling from a `FunctionDef` AST node. The engine
    /// uses this: by the time it applies a diff, the only thing it still
    /// has is the `CodeDescriptor` the ephemeral re-import already compiled.
    pub fn swap_code_descriptor(&self, code: CodeDescriptor, source_text: String) {
        self.code.store(Arc::new(code));
        self.source_text.store(Arc::new(source_text));
    }
}

#[derive(Debug)]
pub struct LiveMethod {
    pub kind: MethodKind,
    pub func: Arc<LiveFunction>,
}

/// A class's base list is itself a slot: rebinding bases never replaces the
/// `LiveClass` object, so subclasses and existing instances keep their
/// identity.
#[derive(Debug)]
pub struct LiveClass {
    pub name: SmolStr,
    pub bases: ArcSwap<Vec<SmolStr>>,
    pub methods: DashMap<SmolStr, Arc<LiveMethod>>,
    pub class_vars: DashMap<SmolStr, ArcSwap<Value>>,
}

impl LiveClass {
    pub fn from_ast(class: &ClassDef) -> Arc<Self> {
        let methods = DashMap::new();
        for m in &class.methods {
            // A getter and its setter share the same surface name (the
            // `@name.setter` convention), so the setter needs a distinct
            // table key or it would clobber the getter's entry.
            let key = match m.kind {
                MethodKind::PropertySetter => SmolStr::new(format!("{}__setter__", m.func.name)),
                _ => SmolStr::new(&m.func.name),
            };
            methods.insert(
                key.clone(),
                Arc::new(LiveMethod {
                    kind: m.kind,
                    func: LiveFunction::from_ast(&m.func),
                }),
            );
            let own_locals = local_names_of(&m.func.params, &m.func.body);
            register_nested_methods(&m.func.body, &key, &own_locals, &methods);
        }
        let class_vars = DashMap::new();
        for (name, expr) in &class.class_vars {
            class_vars.insert(SmolStr::new(name), ArcSwap::from_pointee(Value::from_expr(expr)));
        }
        Arc::new(Self {
            name: SmolStr::new(&class.name),
            bases: ArcSwap::from_pointee(class.bases.iter().map(SmolStr::new).collect()),
            methods,
            class_vars,
        })
    }
}

/// The live module graph: the "old tree" half of every diff the engine
/// performs, and the thing the engine mutates in place on a successful
/// reload pass.
#[derive(Debug)]
pub struct LiveModule {
    pub path: PathBuf,
    pub functions: DashMap<SmolStr, Arc<LiveFunction>>,
    pub classes: DashMap<SmolStr, Arc<LiveClass>>,
    pub variables: DashMap<SmolStr, ArcSwap<Value>>,
    pub imports: ArcSwap<Vec<ImportBinding>>,
}

impl LiveModule {
    /// Builds a fresh module graph from parsed source, without resolving
    /// any cross-module imports: `from X import Y` is recorded as metadata
    /// for the dependency tracker but `Y` itself is not bound locally, and
    /// any initializer referencing it degrades to `Value::Unevaluated`. Used
    /// by callers that only need the structural shape of a single file in
    /// isolation (most unit tests, and `reload-model`'s diff fixtures).
    pub fn from_ast(path: PathBuf, ast: &ModuleAst) -> Self {
        Self::from_ast_with_imports(path, ast, &NoImports)
    }

    /// Builds a fresh module graph, materialising each imported name as a
    /// local variable via `resolver` and evaluating every module-level
    /// initializer (in declaration order) against the growing scope of
    /// already-bound names. This is what lets a derived binding like
    /// `car_sprinklers = sprinkler_n / 3;` observe an imported value.
    pub fn from_ast_with_imports(
        path: PathBuf,
        ast: &ModuleAst,
        resolver: &dyn ImportResolver,
    ) -> Self {
        let functions = DashMap::new();
        let classes = DashMap::new();
        let variables = DashMap::new();
        let mut imports = Vec::new();
        let mut scope: HashMap<SmolStr, Value> = HashMap::new();

        for item in &ast.items {
            match item {
                Item::Import { path: dotted, names } => {
                    let dotted: Vec<SmolStr> = dotted.iter().map(SmolStr::new).collect();
                    let bound_names: Vec<SmolStr> = match names {
                        ImportNames::Wildcard => dotted
                            .last()
                            .cloned()
                            .into_iter()
                            .collect(),
                        ImportNames::Explicit(names) => {
                            names.iter().map(SmolStr::new).collect()
                        }
                    };
                    for name in bound_names {
                        if let Some(value) = resolver.resolve(&dotted, &name) {
                            variables.insert(name.clone(), ArcSwap::from_pointee(value.clone()));
                            scope.insert(name, value);
                        }
                    }
                    imports.push(ImportBinding {
                        path: dotted,
                        names: LiveImportNames::from(names),
                    });
                }
                Item::FunctionDef(func) => {
                    functions.insert(SmolStr::new(&func.name), LiveFunction::from_ast(func));
                    let own_locals = local_names_of(&func.params, &func.body);
                    register_nested_functions(&func.body, &func.name, &own_locals, &functions);
                }
                Item::ClassDef(class) => {
                    classes.insert(SmolStr::new(&class.name), LiveClass::from_ast(class));
                }
                Item::VarDef { name, value } => {
                    let value = eval_expr(value, &scope);
                    variables.insert(SmolStr::new(name), ArcSwap::from_pointee(value.clone()));
                    scope.insert(SmolStr::new(name), value);
                }
            }
        }

        Self {
            path,
            functions,
            classes,
            variables,
            imports: ArcSwap::from_pointee(imports),
        }
    }

    pub fn function(&self, name: &str) -> Option<Arc<LiveFunction>> {
        self.functions.get(name).map(|r| r.clone())
    }

    pub fn class(&self, name: &str) -> Option<Arc<LiveClass>> {
        self.classes.get(name).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    #[test]
    fn swapping_code_preserves_function_identity() {
        let ast = parse_module("def f(x) { return x; }").unwrap();
        let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
        let handle = module.function("f").unwrap();
        let ptr_before = Arc::as_ptr(&handle);
        let instructions_before = handle.code.load().instructions.clone();

        let new_ast = parse_module("def f(x) { return x + 1; }").unwrap();
        let new_func = match &new_ast.items[0] {
            Item::FunctionDef(f) => f,
            _ => unreachable!(),
        };
        handle.swap_code(new_func);

        assert_eq!(Arc::as_ptr(&handle), ptr_before);
        assert_ne!(handle.code.load().instructions, instructions_before);
    }

    #[test]
    fn class_base_rebind_preserves_class_identity() {
        let ast = parse_module("class A(Base) { }").unwrap();
        let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
        let class = module.class("A").unwrap();
        let ptr_before = Arc::as_ptr(&class);

        class
            .bases
            .store(Arc::new(vec![SmolStr::new("Base"), SmolStr::new("Mixin")]));

        assert_eq!(Arc::as_ptr(&class), ptr_before);
        assert_eq!(class.bases.load().len(), 2);
    }

    #[test]
    fn nested_def_in_a_method_is_registered_under_a_qualified_name() {
        let src = r#"
            class Carwash {
                def wash(self, cars_n) {
                    def bonus() { return cars_n; }
                    return bonus();
                }
            }
        "#;
        let ast = parse_module(src).unwrap();
        let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
        let class = module.class("Carwash").unwrap();
        let bonus = class.methods.get("wash.bonus").unwrap().func.clone();
        assert_eq!(bonus.code.load().free_vars, vec![SmolStr::new("cars_n")]);
    }

    #[test]
    fn dict_literal_builds_independently_swappable_items() {
        let ast = parse_module(r#"let config = { host: "localhost", port: 8080 };"#).unwrap();
        let module = LiveModule::from_ast(PathBuf::from("m.rl"), &ast);
        let config = module.variables.get("config").unwrap();
        match &**config.load() {
            Value::Dict(map) => {
                assert_eq!(map.len(), 2);
                let host = map.get("host").unwrap();
                host.store(Arc::new(Value::Str(SmolStr::new("example.com"))));
                assert_eq!(**host.load(), Value::Str(SmolStr::new("example.com")));
            }
            other => panic!("expected Dict, got {other:?}"),
        }
    }
}
