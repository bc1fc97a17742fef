//! reload-lang — lexer, parser, and live runtime representation for the
//! small interpreted language the hot reloader targets.
//!
//! This crate has no notion of a "reload": it only knows how to turn source
//! text into a [`runtime::LiveModule`] graph and how to recompile a single
//! function into a fresh [`reload_core::code::CodeDescriptor`]. `reload-model`
//! walks this graph to build comparable trees; `reload-engine` calls back
//! into [`runtime::LiveFunction::swap_code`] and friends to apply a diff.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod eval;
pub mod importer;
pub mod parser;
pub mod runtime;
pub mod token;

pub use ast::{ImportNames, ModuleAst};
pub use codegen::compile_function;
pub use error::LangError;
pub use eval::eval_expr;
pub use importer::{import_from_path, import_from_path_with_imports, import_from_source, module_id_for_path};
pub use parser::parse_module;
pub use runtime::{
    ImportBinding, ImportResolver, LiveClass, LiveFunction, LiveImportNames, LiveMethod,
    LiveModule, Value,
};
