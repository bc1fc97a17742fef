//! Compiles a [`FunctionDef`] into a [`CodeDescriptor`] for equality and
//! content-hashing purposes. This crate never executes code; only the shape
//! of the descriptor matters to the object model's diffing.

use reload_core::code::{CodeDescriptor, ConstValue};
use smol_str::SmolStr;

use crate::ast::{BinOp, Expr, FunctionDef, Literal, Stmt};

/// Encodes a function body into a flat, deterministic byte sequence that
/// stands in for CPython's `co_code`. Two structurally identical bodies
/// serialize identically; any change to control flow, operators, or the
/// set/order of identifiers referenced changes the byte sequence.
struct Encoder {
    instructions: Vec<u8>,
    constants: Vec<ConstValue>,
    names: Vec<SmolStr>,
    local_names: Vec<SmolStr>,
    /// Locals of the lexically enclosing function(s), resolved for an
    /// identifier only once it's ruled out as local to this function.
    enclosing_locals: Vec<SmolStr>,
    /// Enclosing-scope identifiers this function actually references, in
    /// first-reference order — this function's own `free_vars`.
    free_vars: Vec<SmolStr>,
    /// Own locals a nested `def` captures from this function — this
    /// function's own `cell_vars`.
    cell_vars: Vec<SmolStr>,
    depth: u32,
    max_depth: u32,
}

impl Encoder {
    fn new(params: &[String], enclosing_locals: &[SmolStr]) -> Self {
        Self {
            instructions: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
            local_names: params.iter().map(SmolStr::new).collect(),
            enclosing_locals: enclosing_locals.to_vec(),
            free_vars: Vec::new(),
            cell_vars: Vec::new(),
            depth: 0,
            max_depth: 0,
        }
    }

    fn push_depth(&mut self, n: u32) {
        self.depth += n;
        self.max_depth = self.max_depth.max(self.depth);
    }

    fn pop_depth(&mut self, n: u32) {
        self.depth = self.depth.saturating_sub(n);
    }

    fn emit(&mut self, op: u8) {
        self.instructions.push(op);
    }

    fn intern_const(&mut self, value: ConstValue) -> u32 {
        let idx = self.constants.len() as u32;
        self.constants.push(value);
        idx
    }

    fn intern_name(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            return idx as u32;
        }
        let idx = self.names.len() as u32;
        self.names.push(SmolStr::new(name));
        idx
    }

    fn is_local(&self, name: &str) -> bool {
        self.local_names.iter().any(|n| n == name)
    }

    fn declare_local(&mut self, name: &str) {
        if !self.is_local(name) {
            self.local_names.push(SmolStr::new(name));
        }
    }

    fn is_enclosing(&self, name: &str) -> bool {
        self.enclosing_locals.iter().any(|n| n == name)
    }

    fn intern_free(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.free_vars.iter().position(|n| n == name) {
            return idx as u32;
        }
        let idx = self.free_vars.len() as u32;
        self.free_vars.push(SmolStr::new(name));
        idx
    }

    fn encode_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.encode_stmt(stmt);
        }
    }

    fn encode_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, value } => {
                self.emit(0x01);
                self.encode_expr(value);
                self.declare_local(name);
                self.pop_depth(1);
            }
            Stmt::Assign { target, value } => {
                self.emit(0x02);
                self.encode_expr(target);
                self.encode_expr(value);
                self.pop_depth(2);
            }
            Stmt::Return(expr) => {
                self.emit(0x03);
                if let Some(e) = expr {
                    self.encode_expr(e);
                    self.pop_depth(1);
                }
            }
            Stmt::ExprStmt(expr) => {
                self.emit(0x04);
                self.encode_expr(expr);
                self.pop_depth(1);
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.emit(0x05);
                self.encode_expr(cond);
                self.pop_depth(1);
                self.emit(0x06);
                self.encode_block(then_block);
                self.emit(0x07);
                self.encode_block(else_block);
                self.emit(0x08);
            }
            Stmt::FunctionDef(nested) => {
                self.emit(0x09);
                let idx = self.intern_name(&nested.name);
                self.instructions.extend_from_slice(&idx.to_le_bytes());
                self.declare_local(&nested.name);

                // Determine which of this function's own locals the
                // nested def captures, so they end up in *this*
                // function's `cell_vars`. The nested descriptor itself is
                // discarded here; `reload_lang::runtime` recompiles and
                // registers it as its own diffable entry.
                let mut scope = self.enclosing_locals.clone();
                scope.extend(self.local_names.iter().cloned());
                let nested_code = compile_function_with_scope(nested, &scope);
                for free in &nested_code.free_vars {
                    if self.local_names.contains(free) && !self.cell_vars.contains(free) {
                        self.cell_vars.push(free.clone());
                    }
                }
            }
        }
    }

    fn encode_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(lit) => {
                let idx = match lit {
                    Literal::Int(i) => self.intern_const(ConstValue::Int(*i)),
                    Literal::Float(f) => self.intern_const(ConstValue::Float(f.to_bits())),
                    Literal::Str(s) => self.intern_const(ConstValue::Str(SmolStr::new(s))),
                    Literal::Bool(b) => self.intern_const(ConstValue::Bool(*b)),
                    Literal::None => self.intern_const(ConstValue::Unit),
                };
                self.emit(0x10);
                self.instructions.extend_from_slice(&idx.to_le_bytes());
                self.push_depth(1);
            }
            Expr::Ident(name) => {
                if self.is_local(name) {
                    self.emit(0x11);
                } else if self.is_enclosing(name) {
                    let idx = self.intern_free(name);
                    self.emit(0x16);
                    self.instructions.extend_from_slice(&idx.to_le_bytes());
                } else {
                    let idx = self.intern_name(name);
                    self.emit(0x12);
                    self.instructions.extend_from_slice(&idx.to_le_bytes());
                }
                self.push_depth(1);
            }
            Expr::FieldAccess(base, field) => {
                self.encode_expr(base);
                let idx = self.intern_name(field);
                self.emit(0x13);
                self.instructions.extend_from_slice(&idx.to_le_bytes());
            }
            Expr::Call(callee, args) => {
                self.encode_expr(callee);
                for arg in args {
                    self.encode_expr(arg);
                }
                self.emit(0x14);
                self.instructions
                    .extend_from_slice(&(args.len() as u32).to_le_bytes());
                self.pop_depth(args.len() as u32);
            }
            Expr::BinaryOp(lhs, op, rhs) => {
                self.encode_expr(lhs);
                self.encode_expr(rhs);
                let code = match op {
                    BinOp::Add => 0x20,
                    BinOp::Sub => 0x21,
                    BinOp::Mul => 0x22,
                    BinOp::Div => 0x23,
                    BinOp::Eq => 0x24,
                };
                self.emit(code);
                self.pop_depth(1);
            }
            Expr::DictLiteral(entries) => {
                for (key, value) in entries {
                    let idx = self.intern_const(ConstValue::Str(SmolStr::new(key)));
                    self.emit(0x10);
                    self.instructions.extend_from_slice(&idx.to_le_bytes());
                    self.push_depth(1);
                    self.encode_expr(value);
                }
                self.emit(0x25);
                self.instructions
                    .extend_from_slice(&(entries.len() as u32).to_le_bytes());
                self.pop_depth(entries.len() as u32 * 2);
                self.push_depth(1);
            }
        }
    }
}

/// Compiles `func` into its [`CodeDescriptor`] with no enclosing scope, i.e.
/// as a top-level function or a method. `line_table` is left empty since
/// this lexer does not track per-token line numbers.
pub fn compile_function(func: &FunctionDef) -> CodeDescriptor {
    compile_function_with_scope(func, &[])
}

/// Compiles `func`, resolving each identifier as local, then as captured
/// from `enclosing_locals` (the params/locals of the lexically enclosing
/// function(s)), then as a module-level name. A name resolved the second
/// way is recorded in the returned descriptor's `free_vars` — this is how a
/// nested `def` referencing an enclosing local shows up as a closure
/// capture, which `reload-model::diff_callable` compares between an old and
/// new version to decide whether a minimal code swap is safe or the whole
/// containing class needs a parent reload.
pub fn compile_function_with_scope(func: &FunctionDef, enclosing_locals: &[SmolStr]) -> CodeDescriptor {
    let mut encoder = Encoder::new(&func.params, enclosing_locals);
    encoder.encode_block(&func.body);

    CodeDescriptor {
        arg_count: func.params.len() as u32,
        free_vars: encoder.free_vars,
        cell_vars: encoder.cell_vars,
        constants: encoder.constants,
        instructions: encoder.instructions,
        line_table: Vec::new(),
        name: SmolStr::new(&func.name),
        names: encoder.names,
        local_count: encoder.local_names.len() as u32,
        stack_size: encoder.max_depth,
        local_names: encoder.local_names,
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use crate::ast::Item;

    fn first_fn(src: &str) -> FunctionDef {
        match parse_module(src).unwrap().items.into_iter().next().unwrap() {
            Item::FunctionDef(f) => f,
            other => panic!("expected FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn identical_bodies_compile_to_equal_descriptors() {
        let a = compile_function(&first_fn("def f(x) { return x; }"));
        let b = compile_function(&first_fn("def f(x) { return x; }"));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn changed_body_changes_descriptor() {
        let a = compile_function(&first_fn("def f(x) { return x; }"));
        let b = compile_function(&first_fn("def f(x) { return x + 1; }"));
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn nested_def_capturing_an_enclosing_local_populates_free_vars() {
        let outer = first_fn("def wash(cars_n) { def bonus() { return cars_n; } return bonus(); }");
        let nested = match &outer.body[0] {
            Stmt::FunctionDef(f) => f,
            other => panic!("expected nested FunctionDef, got {other:?}"),
        };
        let enclosing_locals: Vec<SmolStr> = outer.params.iter().map(SmolStr::new).collect();
        let code = compile_function_with_scope(nested, &enclosing_locals);
        assert_eq!(code.free_vars, vec![SmolStr::new("cars_n")]);
    }

    #[test]
    fn compile_function_has_no_capture_without_an_enclosing_scope() {
        let code = compile_function(&first_fn("def f(x) { return x; }"));
        assert!(code.free_vars.is_empty());
        assert!(code.cell_vars.is_empty());
    }

    #[test]
    fn renaming_a_parameter_does_not_change_identity_but_changes_names() {
        let a = compile_function(&first_fn("def f(x) { return x; }"));
        let b = compile_function(&first_fn("def f(y) { return y; }"));
        // Both reference a single local by position, so the instruction
        // stream is identical even though the surface name differs: local
        // names are not part of co_code in CPython either.
        assert_eq!(a.instructions, b.instructions);
    }
}
