use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::file_hash::ContentHash;

/// A diffable literal in a compiled code object's constant pool. Floats
/// compare by bit pattern so the whole descriptor can derive `Eq` — this is
/// one of the twelve compared fields of a [`CodeDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(SmolStr),
}

/// The twelve-field code descriptor used as the equality unit for
/// Function/Method/ClassMethod/PropertyGetter/PropertySetter: two
/// callables are equal iff all twelve fields are equal. Produced by
/// `reload-lang`'s compiler from a parsed function body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeDescriptor {
    pub arg_count: u32,
    pub free_vars: Vec<SmolStr>,
    pub cell_vars: Vec<SmolStr>,
    pub constants: Vec<ConstValue>,
    pub instructions: Vec<u8>,
    pub line_table: Vec<(u32, u32)>,
    pub name: SmolStr,
    pub names: Vec<SmolStr>,
    pub local_count: u32,
    pub stack_size: u32,
    pub local_names: Vec<SmolStr>,
    pub flags: u32,
}

impl CodeDescriptor {
    /// A content digest over all twelve fields, useful as a cheap
    /// short-circuit before the full structural comparison and for logging.
    pub fn digest(&self) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.arg_count.to_le_bytes());
        for v in &self.free_vars {
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        for v in &self.cell_vars {
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        for c in &self.constants {
            hash_const(&mut hasher, c);
        }
        hasher.update(&self.instructions);
        for (offset, line) in &self.line_table {
            hasher.update(&offset.to_le_bytes());
            hasher.update(&line.to_le_bytes());
        }
        hasher.update(self.name.as_bytes());
        for v in &self.names {
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(&self.local_count.to_le_bytes());
        hasher.update(&self.stack_size.to_le_bytes());
        for v in &self.local_names {
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(&self.flags.to_le_bytes());
        ContentHash(*hasher.finalize().as_bytes())
    }
}

fn hash_const(hasher: &mut blake3::Hasher, c: &ConstValue) {
    match c {
        ConstValue::Unit => hasher.update(b"u"),
        ConstValue::Bool(b) => hasher.update(if *b { b"t" } else { b"f" }),
        ConstValue::Int(i) => hasher.update(&i.to_le_bytes()),
        ConstValue::Float(bits) => hasher.update(&bits.to_le_bytes()),
        ConstValue::Str(s) => hasher.update(s.as_bytes()),
    };
}
