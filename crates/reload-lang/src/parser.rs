//! Hand-rolled recursive-descent parser over the token stream.
//!
//! The grammar is brace-delimited rather than whitespace sensitive, which
//! keeps the parser a straightforward table of `parse_*` functions instead
//! of tracking an indentation stack.

use std::ops::Range;

use crate::ast::*;
use crate::error::LangError;
use crate::token::{lex_spanned, Token};

pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

pub fn parse_module(source: &str) -> Result<ModuleAst, LangError> {
    let tokens = lex_spanned(source).map_err(|offset| LangError::Syntax {
        message: format!("unrecognized character at byte offset {offset}"),
    })?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    parser.parse_module_ast()
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), LangError> {
        match self.advance() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(LangError::Syntax {
                message: format!("expected {expected:?}, found {other:?}"),
            }),
        }
    }

    fn expect_ident(&mut self) -> Result<String, LangError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(LangError::Syntax {
                message: format!("expected identifier, found {other:?}"),
            }),
        }
    }

    fn parse_module_ast(&mut self) -> Result<ModuleAst, LangError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            items.push(self.parse_item()?);
        }
        Ok(ModuleAst { items })
    }

    fn parse_item(&mut self) -> Result<Item, LangError> {
        match self.peek() {
            Some(Token::Import) => self.parse_import(),
            Some(Token::From) => self.parse_from_import(),
            Some(Token::Def) => Ok(Item::FunctionDef(self.parse_function_def()?)),
            Some(Token::Class) => Ok(Item::ClassDef(self.parse_class_def()?)),
            Some(Token::Let) => self.parse_top_var_def(),
            other => Err(LangError::Syntax {
                message: format!("expected item, found {other:?}"),
            }),
        }
    }

    fn parse_dotted_path(&mut self) -> Result<Vec<String>, LangError> {
        let mut path = vec![self.expect_ident()?];
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            path.push(self.expect_ident()?);
        }
        Ok(path)
    }

    /// `import a.b.c;` — a wildcard binding of the whole dotted path,
    /// always included by the dependency tracker.
    fn parse_import(&mut self) -> Result<Item, LangError> {
        self.expect(&Token::Import)?;
        let path = self.parse_dotted_path()?;
        self.expect(&Token::Semicolon)?;
        Ok(Item::Import {
            path,
            names: ImportNames::Wildcard,
        })
    }

    /// `from a.b import x, y;` — an explicit-name binding, included by
    /// the dependency tracker only if the name appears in its import
    /// list.
    fn parse_from_import(&mut self) -> Result<Item, LangError> {
        self.expect(&Token::From)?;
        let path = self.parse_dotted_path()?;
        self.expect(&Token::Import)?;
        let mut names = vec![self.expect_ident()?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.advance();
            names.push(self.expect_ident()?);
        }
        self.expect(&Token::Semicolon)?;
        Ok(Item::Import {
            path,
            names: ImportNames::Explicit(names),
        })
    }

    fn parse_top_var_def(&mut self) -> Result<Item, LangError> {
        self.expect(&Token::Let)?;
        let name = self.expect_ident()?;
        self.expect(&Token::Eq)?;
        let value = self.parse_expr()?;
        self.expect(&Token::Semicolon)?;
        Ok(Item::VarDef { name, value })
    }

    fn parse_function_def(&mut self) -> Result<FunctionDef, LangError> {
        let start = self.peek_span().start;
        self.expect(&Token::Def)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let params = self.parse_param_list()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block()?;
        let end = self.tokens[self.pos - 1].1.end;
        Ok(FunctionDef {
            name,
            params,
            body,
            source_text: self.source[start..end].to_string(),
        })
    }

    fn parse_param_list(&mut self) -> Result<Vec<String>, LangError> {
        let mut params = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(params);
        }
        loop {
            match self.advance() {
                Some(Token::SelfLower) => params.push("self".to_string()),
                Some(Token::Ident(name)) => params.push(name),
                other => {
                    return Err(LangError::Syntax {
                        message: format!("expected parameter name, found {other:?}"),
                    })
                }
            }
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, LangError> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Some(Token::RBrace)) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, LangError> {
        match self.peek() {
            Some(Token::Let) => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&Token::Eq)?;
                let value = self.parse_expr()?;
                self.expect(&Token::Semicolon)?;
                Ok(Stmt::Let { name, value })
            }
            Some(Token::Return) => {
                self.advance();
                if matches!(self.peek(), Some(Token::Semicolon)) {
                    self.advance();
                    return Ok(Stmt::Return(None));
                }
                let value = self.parse_expr()?;
                self.expect(&Token::Semicolon)?;
                Ok(Stmt::Return(Some(value)))
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::Def) => Ok(Stmt::FunctionDef(self.parse_function_def()?)),
            _ => {
                let expr = self.parse_expr()?;
                if matches!(self.peek(), Some(Token::Eq)) {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(&Token::Semicolon)?;
                    Ok(Stmt::Assign {
                        target: expr,
                        value,
                    })
                } else {
                    self.expect(&Token::Semicolon)?;
                    Ok(Stmt::ExprStmt(expr))
                }
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, LangError> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let then_block = self.parse_block()?;
        let else_block = if matches!(self.peek(), Some(Token::Else)) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, LangError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, LangError> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let (op, prec) = match self.peek() {
                Some(Token::Plus) => (BinOp::Add, 1),
                Some(Token::Minus) => (BinOp::Sub, 1),
                Some(Token::Star) => (BinOp::Mul, 2),
                Some(Token::Slash) => (BinOp::Div, 2),
                Some(Token::EqEq) => (BinOp::Eq, 0),
                _ => break,
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::BinaryOp(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Expr, LangError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let field = self.expect_ident()?;
                    expr = Expr::FieldAccess(Box::new(expr), field);
                }
                Some(Token::LParen) => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.peek(), Some(Token::Comma)) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, LangError> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Literal::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Literal::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::True) => Ok(Expr::Literal(Literal::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Literal::Bool(false))),
            Some(Token::None) => Ok(Expr::Literal(Literal::None)),
            Some(Token::SelfLower) => Ok(Expr::Ident("self".to_string())),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LBrace) => self.parse_dict_literal(),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(LangError::Syntax {
                message: format!("expected expression, found {other:?}"),
            }),
        }
    }

    fn parse_dict_literal(&mut self) -> Result<Expr, LangError> {
        let mut entries = Vec::new();
        while !matches!(self.peek(), Some(Token::RBrace)) {
            let key = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr::DictLiteral(entries))
    }

    fn parse_class_def(&mut self) -> Result<ClassDef, LangError> {
        self.expect(&Token::Class)?;
        let name = self.expect_ident()?;
        let mut bases = Vec::new();
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            if !matches!(self.peek(), Some(Token::RParen)) {
                loop {
                    bases.push(self.expect_ident()?);
                    if matches!(self.peek(), Some(Token::Comma)) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen)?;
        }
        self.expect(&Token::LBrace)?;
        let mut methods = Vec::new();
        let mut class_vars = Vec::new();
        while !matches!(self.peek(), Some(Token::RBrace)) {
            match self.peek() {
                Some(Token::At) => {
                    methods.push(self.parse_decorated_method()?);
                }
                Some(Token::Def) => {
                    let func = self.parse_function_def()?;
                    methods.push(MethodDef {
                        kind: MethodKind::Instance,
                        func,
                    });
                }
                Some(Token::Let) => {
                    self.advance();
                    let var_name = self.expect_ident()?;
                    self.expect(&Token::Eq)?;
                    let value = self.parse_expr()?;
                    self.expect(&Token::Semicolon)?;
                    class_vars.push((var_name, value));
                }
                other => {
                    return Err(LangError::Syntax {
                        message: format!("expected class member, found {other:?}"),
                    })
                }
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(ClassDef {
            name,
            bases,
            methods,
            class_vars,
        })
    }

    fn parse_decorated_method(&mut self) -> Result<MethodDef, LangError> {
        self.expect(&Token::At)?;
        let kind = match self.peek() {
            Some(Token::Property) => {
                self.advance();
                MethodKind::PropertyGetter
            }
            Some(Token::Ident(name)) if name == "classmethod" => {
                self.advance();
                MethodKind::Class
            }
            Some(Token::Ident(_)) => {
                // `@<name>.setter` — the property name itself is redundant
                // with the method name that follows and is discarded.
                self.advance();
                self.expect(&Token::Dot)?;
                self.expect(&Token::Setter)?;
                MethodKind::PropertySetter
            }
            other => {
                return Err(LangError::Syntax {
                    message: format!("expected decorator, found {other:?}"),
                })
            }
        };
        let func = self.parse_function_def()?;
        Ok(MethodDef { kind, func })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_top_level_function() {
        let ast = parse_module("def greet(name) { return name; }").unwrap();
        assert_eq!(ast.items.len(), 1);
        match &ast.items[0] {
            Item::FunctionDef(f) => {
                assert_eq!(f.name, "greet");
                assert_eq!(f.params, vec!["name".to_string()]);
            }
            other => panic!("expected FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn parses_class_with_property_and_setter() {
        let src = r#"
            class Carwash(Base) {
                let cars_n = 0;
                def wash(self) { return self.cars_n; }
                @property
                def soap(self) { return self.cars_n; }
                @soap.setter
                def soap(self, value) { self.cars_n = value; }
            }
        "#;
        let ast = parse_module(src).unwrap();
        let class = match &ast.items[0] {
            Item::ClassDef(c) => c,
            other => panic!("expected ClassDef, got {other:?}"),
        };
        assert_eq!(class.name, "Carwash");
        assert_eq!(class.bases, vec!["Base".to_string()]);
        assert_eq!(class.class_vars.len(), 1);
        assert_eq!(class.methods.len(), 3);
        assert_eq!(class.methods[1].kind, MethodKind::PropertyGetter);
        assert_eq!(class.methods[2].kind, MethodKind::PropertySetter);
    }

    #[test]
    fn parses_dict_literal_and_import() {
        let src = r#"
            import pkg.mod;
            let config = { host: "localhost", port: 8080 };
        "#;
        let ast = parse_module(src).unwrap();
        assert_eq!(ast.items.len(), 2);
        assert_eq!(
            ast.items[0],
            Item::Import {
                path: vec!["pkg".to_string(), "mod".to_string()],
                names: ImportNames::Wildcard,
            }
        );
        match &ast.items[1] {
            Item::VarDef { name, value } => {
                assert_eq!(name, "config");
                match value {
                    Expr::DictLiteral(entries) => assert_eq!(entries.len(), 2),
                    other => panic!("expected DictLiteral, got {other:?}"),
                }
            }
            other => panic!("expected VarDef, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_function_def_inside_a_body() {
        let ast = parse_module(
            "def wash(cars_n) { def bonus() { return cars_n; } return bonus(); }",
        )
        .unwrap();
        let outer = match &ast.items[0] {
            Item::FunctionDef(f) => f,
            other => panic!("expected FunctionDef, got {other:?}"),
        };
        match &outer.body[0] {
            Stmt::FunctionDef(nested) => assert_eq!(nested.name, "bonus"),
            other => panic!("expected nested FunctionDef, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unterminated_block() {
        assert!(parse_module("def f() { return 1;").is_err());
    }

    #[test]
    fn parses_from_import_with_explicit_names() {
        let ast = parse_module("from carwash import sprinkler_n;").unwrap();
        assert_eq!(
            ast.items[0],
            Item::Import {
                path: vec!["carwash".to_string()],
                names: ImportNames::Explicit(vec!["sprinkler_n".to_string()]),
            }
        );
    }

    #[test]
    fn parses_from_import_with_multiple_names() {
        let ast = parse_module("from pkg.mod import a, b;").unwrap();
        match &ast.items[0] {
            Item::Import { path, names } => {
                assert_eq!(path, &vec!["pkg".to_string(), "mod".to_string()]);
                assert_eq!(
                    names,
                    &ImportNames::Explicit(vec!["a".to_string(), "b".to_string()])
                );
            }
            other => panic!("expected Import, got {other:?}"),
        }
    }
}
