//! Abstract syntax tree produced by [`crate::parser::parse_module`].

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    FieldAccess(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    BinaryOp(Box<Expr>, BinOp, Box<Expr>),
    DictLiteral(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, value: Expr },
    Assign { target: Expr, value: Expr },
    Return(Option<Expr>),
    ExprStmt(Expr),
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Vec<Stmt>,
    },
    /// A `def` nested inside a function or method body. Binds its name
    /// locally like a `let`, and may reference the enclosing scope's
    /// params/locals as free variables — see `codegen::compile_function_with_scope`.
    FunctionDef(FunctionDef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Class,
    PropertyGetter,
    PropertySetter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Raw source slice this definition was parsed from; used for the
    /// human-readable diagnostics and as an input to code-equality hashing.
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub kind: MethodKind,
    pub func: FunctionDef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub bases: Vec<String>,
    pub methods: Vec<MethodDef>,
    pub class_vars: Vec<(String, Expr)>,
}

/// The set of symbols a binding makes visible to the importing module:
/// either an explicit, enumerable list (`from pkg import a, b;`) or a
/// wildcard (`import pkg.mod;`, which binds the whole dotted path). This is
/// the AST-level shape of the "explicit list of names or wildcard marker"
/// `imported_names` the dependency tracker records.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportNames {
    Wildcard,
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Import { path: Vec<String>, names: ImportNames },
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    VarDef { name: String, value: Expr },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleAst {
    pub items: Vec<Item>,
}
