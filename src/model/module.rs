/// Name reserved for sources compiled outside any module descriptor.
pub const DEFAULT_MODULE_NAME: &str = "default";

/// The bare core namespace; not usable as a module name on its own.
pub const CORE_MODULE_NAME: &str = "quill";

/// The language module, implicitly imported by every other module.
pub const LANGUAGE_MODULE_NAME: &str = "quill.language";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub(crate) usize);

/// A versioned, named unit of distribution.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: Vec<String>,
    pub version: Option<String>,
    pub imports: Vec<ModuleImport>,
    pub available: bool,
    pub shared: bool,
    pub annotations: Vec<String>,
}

impl Module {
    pub fn name_as_string(&self) -> String {
        format_path(&self.name)
    }

    pub fn is_language_module(&self) -> bool {
        self.name_as_string() == LANGUAGE_MODULE_NAME
    }
}

/// A directed dependency edge between two modules.
#[derive(Clone, Debug)]
pub struct ModuleImport {
    pub module: ModuleId,
    pub optional: bool,
    pub export: bool,
    pub annotations: Vec<String>,
}

pub fn format_path(parts: &[String]) -> String {
    parts.join(".")
}

/// Shared obtain-or-create store for module descriptors.
///
/// At most one `Module` exists per (name, version) key; a module whose
/// version is still unknown unifies with the first versioned reference to
/// the same name (the resolver then fills the version in).
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &[String], version: Option<&str>) -> ModuleId {
        for (index, module) in self.modules.iter().enumerate() {
            if module.name == name && versions_match(module.version.as_deref(), version) {
                return ModuleId(index);
            }
        }
        self.modules.push(Module {
            name: name.to_vec(),
            version: version.map(str::to_string),
            imports: Vec::new(),
            available: false,
            shared: false,
            annotations: Vec::new(),
        });
        ModuleId(self.modules.len() - 1)
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }

    /// Looks up an existing import edge; at most one edge may exist per
    /// (importing module, imported module) pair.
    pub fn find_import(&self, main: ModuleId, imported: ModuleId) -> Option<&ModuleImport> {
        self.modules[main.0]
            .imports
            .iter()
            .find(|import| import.module == imported)
    }

    pub fn add_import(&mut self, main: ModuleId, import: ModuleImport) {
        self.modules[main.0].imports.push(import);
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(index, module)| (ModuleId(index), module))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn versions_match(existing: Option<&str>, requested: Option<&str>) -> bool {
    match (existing, requested) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn get_or_create_is_idempotent_per_key() {
        let mut registry = ModuleRegistry::new();
        let a = registry.get_or_create(&name(&["quill", "collections"]), Some("1.0.0"));
        let b = registry.get_or_create(&name(&["quill", "collections"]), Some("1.0.0"));
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_keys_never_alias() {
        let mut registry = ModuleRegistry::new();
        let a = registry.get_or_create(&name(&["quill", "collections"]), Some("1.0.0"));
        let b = registry.get_or_create(&name(&["quill", "collections"]), Some("2.0.0"));
        let c = registry.get_or_create(&name(&["quill", "net"]), Some("1.0.0"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unversioned_module_unifies_with_first_versioned_reference() {
        let mut registry = ModuleRegistry::new();
        let a = registry.get_or_create(&name(&["demo"]), None);
        let b = registry.get_or_create(&name(&["demo"]), Some("0.5"));
        assert_eq!(a, b);
    }

    #[test]
    fn find_import_sees_only_existing_edges() {
        let mut registry = ModuleRegistry::new();
        let main = registry.get_or_create(&name(&["app"]), Some("1.0"));
        let dep = registry.get_or_create(&name(&["lib"]), Some("1.0"));
        assert!(registry.find_import(main, dep).is_none());
        registry.add_import(
            main,
            ModuleImport {
                module: dep,
                optional: true,
                export: false,
                annotations: Vec::new(),
            },
        );
        let edge = registry.find_import(main, dep).expect("edge");
        assert!(edge.optional);
        assert!(!edge.export);
    }
}
