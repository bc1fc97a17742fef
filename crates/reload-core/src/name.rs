use smol_str::SmolStr;

/// Dotted path from a tree's module root to a node, the join key used to
/// line up an old and a new object-model tree during a diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullName(SmolStr);

impl FullName {
    pub fn root(module_name: &str) -> Self {
        FullName(SmolStr::new(module_name))
    }

    /// Builds the full name of a child given its own (unqualified) name.
    pub fn child(&self, name: &str) -> Self {
        FullName(SmolStr::new(format!("{}.{}", self.0, name)))
    }

    /// The setter half of a property pair is keyed as `<name>__setter__`,
    /// its identity key as a node distinct from the getter.
    pub fn setter(parent: &FullName, name: &str) -> Self {
        parent.child(&format!("{name}__setter__"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The final dotted segment, used by the dependency tracker's
    /// literal-text heuristic.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(self.0.as_str())
    }
}

impl std::fmt::Display for FullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
