//! A small scope-aware evaluator for module-level variable initializers.
//!
//! This is deliberately narrow: it exists so that a module-level binding
//! like `car_sprinklers = sprinkler_n / 3;` observes the *current* value of
//! `sprinkler_n` — whether that name was defined earlier in the same file
//! or materialised locally from a `from carwash import sprinkler_n;`
//! binding — which is what lets an importer's derived value actually change
//! when the thing it imports changes. Function
//! and method bodies are still never executed; only top-level/class-level
//! initializer expressions go through this path.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use smol_str::SmolStr;

use crate::ast::{BinOp, Expr, Literal};
use crate::runtime::Value;

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(SmolStr::new(s)),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::None => Value::None,
    }
}

/// Evaluates `expr` against already-bound names in `scope`. Anything this
/// evaluator cannot reduce (field access, calls, arithmetic on a name that
/// isn't bound yet) degrades to `Value::Unevaluated` rather than failing —
/// consistent with the dependency tracker's "never fails loudly" posture.
pub fn eval_expr(expr: &Expr, scope: &HashMap<SmolStr, Value>) -> Value {
    match expr {
        Expr::Literal(lit) => literal_value(lit),
        Expr::Ident(name) => scope
            .get(name.as_str())
            .cloned()
            .unwrap_or_else(|| Value::Unevaluated(SmolStr::new(name))),
        Expr::DictLiteral(entries) => {
            let map = DashMap::new();
            for (k, v) in entries {
                map.insert(SmolStr::new(k), ArcSwap::from_pointee(eval_expr(v, scope)));
            }
            Value::Dict(Arc::new(map))
        }
        Expr::BinaryOp(lhs, op, rhs) => {
            let l = eval_expr(lhs, scope);
            let r = eval_expr(rhs, scope);
            eval_binary(*op, &l, &r).unwrap_or_else(|| Value::Unevaluated(SmolStr::new(format!("{expr:?}"))))
        }
        Expr::FieldAccess(..) | Expr::Call(..) => Value::Unevaluated(SmolStr::new(format!("{expr:?}"))),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn eval_binary(op: BinOp, l: &Value, r: &Value) -> Option<Value> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        return match op {
            BinOp::Add => Some(Value::Int(a + b)),
            BinOp::Sub => Some(Value::Int(a - b)),
            BinOp::Mul => Some(Value::Int(a * b)),
            BinOp::Div => (*b != 0).then(|| Value::Int(a / b)),
            BinOp::Eq => Some(Value::Bool(a == b)),
        };
    }
    let (a, b) = (as_f64(l)?, as_f64(r)?);
    match op {
        BinOp::Add => Some(Value::Float(a + b)),
        BinOp::Sub => Some(Value::Float(a - b)),
        BinOp::Mul => Some(Value::Float(a * b)),
        BinOp::Div => (b != 0.0).then(|| Value::Float(a / b)),
        BinOp::Eq => Some(Value::Bool(a == b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divides_two_bound_names() {
        let mut scope = HashMap::new();
        scope.insert(SmolStr::new("sprinkler_n"), Value::Int(6));
        let expr = Expr::BinaryOp(
            Box::new(Expr::Ident("sprinkler_n".into())),
            BinOp::Div,
            Box::new(Expr::Literal(Literal::Int(3))),
        );
        assert_eq!(eval_expr(&expr, &scope), Value::Int(2));
    }

    #[test]
    fn unbound_name_degrades_to_unevaluated() {
        let scope = HashMap::new();
        let expr = Expr::Ident("missing".into());
        assert!(matches!(eval_expr(&expr, &scope), Value::Unevaluated(_)));
    }
}
