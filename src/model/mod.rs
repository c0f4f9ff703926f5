//! The semantic model: declarations, packages and types, stored in flat
//! arenas and addressed by copyable ids so the mutating tree walks never
//! fight the borrow checker over a web of parent/child references.

pub mod module;

use std::fmt;

use module::{ModuleId, ModuleRegistry, LANGUAGE_MODULE_NAME};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackageId(pub(crate) usize);

/// Anything a declaration can be nested inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeRef {
    Package(PackageId),
    Declaration(DeclarationId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Value,
    Function,
    Class,
    Interface,
    Alias,
}

/// A named program element: value, function, class, interface or alias.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub container: Option<ScopeRef>,
    /// The type of a value, or the return type of a function.
    pub ty: Option<ProducedType>,
    pub members: Vec<DeclarationId>,
    pub parameter_lists: Vec<ParameterList>,
    pub extended_type: Option<ProducedType>,
    pub shared: bool,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            container: None,
            ty: None,
            members: Vec::new(),
            parameter_lists: Vec::new(),
            extended_type: None,
            shared: false,
        }
    }

    /// Whether this declaration may be invoked with an argument list.
    pub fn is_functional(&self) -> bool {
        matches!(self.kind, DeclarationKind::Function | DeclarationKind::Class)
    }

    pub fn is_class_or_interface(&self) -> bool {
        matches!(self.kind, DeclarationKind::Class | DeclarationKind::Interface)
    }

    pub fn is_class(&self) -> bool {
        self.kind == DeclarationKind::Class
    }

    pub fn first_parameter_list(&self) -> Option<&ParameterList> {
        self.parameter_lists.first()
    }
}

/// A type as it appears at a use site: a declaration applied to zero or
/// more type arguments. Equality is purely structural; there is no
/// subtyping anywhere in the checker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducedType {
    pub declaration: DeclarationId,
    pub arguments: Vec<ProducedType>,
}

impl ProducedType {
    pub fn of(declaration: DeclarationId) -> Self {
        Self {
            declaration,
            arguments: Vec::new(),
        }
    }

    pub fn generic(declaration: DeclarationId, arguments: Vec<ProducedType>) -> Self {
        Self {
            declaration,
            arguments,
        }
    }

    pub fn is_exactly(&self, other: &ProducedType) -> bool {
        self == other
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: String,
    pub ty: Option<ProducedType>,
    pub defaulted: bool,
    pub sequenced: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ParameterList {
    pub parameters: Vec<Parameter>,
}

/// Resolved target of a member or base expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberReference {
    pub declaration: DeclarationId,
}

/// A dotted namespace inside a module, holding toplevel declarations.
#[derive(Clone, Debug)]
pub struct Package {
    pub name: Vec<String>,
    pub module: Option<ModuleId>,
    pub members: Vec<DeclarationId>,
    pub shared: bool,
    pub annotations: Vec<String>,
}

impl Package {
    pub fn new(name: Vec<String>) -> Self {
        Self {
            name,
            module: None,
            members: Vec::new(),
            shared: false,
            annotations: Vec::new(),
        }
    }

    pub fn name_as_string(&self) -> String {
        module::format_path(&self.name)
    }
}

/// Arena of every declaration and package seen by one analysis run.
#[derive(Debug, Default)]
pub struct Model {
    declarations: Vec<Declaration>,
    packages: Vec<Package>,
    language_package: Option<PackageId>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, package: Package) -> PackageId {
        self.packages.push(package);
        PackageId(self.packages.len() - 1)
    }

    pub fn add_declaration(&mut self, declaration: Declaration) -> DeclarationId {
        self.declarations.push(declaration);
        DeclarationId(self.declarations.len() - 1)
    }

    /// Adds a declaration and registers it as a member of `container`.
    pub fn declare(&mut self, container: ScopeRef, mut declaration: Declaration) -> DeclarationId {
        declaration.container = Some(container);
        let id = self.add_declaration(declaration);
        match container {
            ScopeRef::Package(package) => self.packages[package.0].members.push(id),
            ScopeRef::Declaration(decl) => self.declarations[decl.0].members.push(id),
        }
        id
    }

    pub fn declaration(&self, id: DeclarationId) -> &Declaration {
        &self.declarations[id.0]
    }

    pub fn declaration_mut(&mut self, id: DeclarationId) -> &mut Declaration {
        &mut self.declarations[id.0]
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.0]
    }

    pub fn find_package(&self, name: &[String]) -> Option<PackageId> {
        self.packages
            .iter()
            .position(|package| package.name == name)
            .map(PackageId)
    }

    /// The package a unit in `name` belongs to, creating it on first use.
    pub fn get_or_create_package(&mut self, name: &[String]) -> PackageId {
        match self.find_package(name) {
            Some(existing) => existing,
            None => self.add_package(Package::new(name.to_vec())),
        }
    }

    pub fn members(&self, scope: ScopeRef) -> &[DeclarationId] {
        match scope {
            ScopeRef::Package(package) => &self.packages[package.0].members,
            ScopeRef::Declaration(decl) => &self.declarations[decl.0].members,
        }
    }

    /// The scope enclosing `scope`, if any. Packages are roots.
    pub fn container_of(&self, scope: ScopeRef) -> Option<ScopeRef> {
        match scope {
            ScopeRef::Package(_) => None,
            ScopeRef::Declaration(decl) => self.declarations[decl.0].container,
        }
    }

    /// Searches a single scope for a directly contained member.
    pub fn lookup_member(&self, scope: ScopeRef, name: &str) -> Option<DeclarationId> {
        self.members(scope)
            .iter()
            .copied()
            .find(|id| self.declarations[id.0].name == name)
    }

    /// Resolves a bare name by walking the scope chain outward, falling
    /// back to the language package for builtins.
    pub fn lookup(&self, scope: ScopeRef, name: &str) -> Option<DeclarationId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(found) = self.lookup_member(scope, name) {
                return Some(found);
            }
            current = self.container_of(scope);
        }
        self.language_declaration(name)
    }

    pub fn language_package(&self) -> Option<PackageId> {
        self.language_package
    }

    pub fn language_declaration(&self, name: &str) -> Option<DeclarationId> {
        let package = self.language_package?;
        self.lookup_member(ScopeRef::Package(package), name)
    }

    /// A nullary application of a language-module type, e.g. `Boolean`.
    pub fn language_type(&self, name: &str) -> Option<ProducedType> {
        self.language_declaration(name).map(ProducedType::of)
    }

    pub fn type_name(&self, ty: &ProducedType) -> String {
        let mut out = self.declarations[ty.declaration.0].name.clone();
        if !ty.arguments.is_empty() {
            out.push('<');
            for (index, argument) in ty.arguments.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&self.type_name(argument));
            }
            out.push('>');
        }
        out
    }

    /// Seeds the implicit language module: the builtin types every
    /// compilation unit can name without importing anything.
    pub fn install_language_module(&mut self, registry: &mut ModuleRegistry) -> PackageId {
        if let Some(existing) = self.language_package {
            return existing;
        }
        let name: Vec<String> = LANGUAGE_MODULE_NAME
            .split('.')
            .map(str::to_string)
            .collect();
        let module = registry.get_or_create(&name, Some("1.0.0"));
        {
            let module = registry.module_mut(module);
            module.available = true;
            module.shared = true;
        }

        let mut package = Package::new(name);
        package.module = Some(module);
        package.shared = true;
        let package = self.add_package(package);
        self.language_package = Some(package);

        let scope = ScopeRef::Package(package);
        for class in ["Boolean", "String", "Natural", "Float", "Character", "Quoted"] {
            let mut decl = Declaration::new(DeclarationKind::Class, class);
            decl.shared = true;
            self.declare(scope, decl);
        }
        for interface in ["Iterable", "Sequence"] {
            let mut decl = Declaration::new(DeclarationKind::Interface, interface);
            decl.shared = true;
            self.declare(scope, decl);
        }
        package
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_scope_chain() {
        let mut model = Model::new();
        let package = model.add_package(Package::new(vec!["app".to_string()]));
        let outer = model.declare(
            ScopeRef::Package(package),
            Declaration::new(DeclarationKind::Class, "Outer"),
        );
        let inner = model.declare(
            ScopeRef::Declaration(outer),
            Declaration::new(DeclarationKind::Function, "run"),
        );
        let sibling = model.declare(
            ScopeRef::Declaration(outer),
            Declaration::new(DeclarationKind::Value, "count"),
        );

        let from_inner = ScopeRef::Declaration(inner);
        assert_eq!(model.lookup(from_inner, "count"), Some(sibling));
        assert_eq!(model.lookup(from_inner, "Outer"), Some(outer));
        assert_eq!(model.lookup(from_inner, "missing"), None);
    }

    #[test]
    fn language_module_provides_builtin_types() {
        let mut model = Model::new();
        let mut registry = ModuleRegistry::new();
        model.install_language_module(&mut registry);

        let boolean = model.language_type("Boolean").expect("Boolean");
        let natural = model.language_type("Natural").expect("Natural");
        assert!(boolean.is_exactly(&boolean.clone()));
        assert!(!boolean.is_exactly(&natural));

        let sequence = model.language_declaration("Sequence").expect("Sequence");
        let of_boolean = ProducedType::generic(sequence, vec![boolean.clone()]);
        let of_natural = ProducedType::generic(sequence, vec![natural]);
        assert!(!of_boolean.is_exactly(&of_natural));
        assert_eq!(model.type_name(&of_boolean), "Sequence<Boolean>");
    }

    #[test]
    fn installing_the_language_module_twice_is_a_no_op() {
        let mut model = Model::new();
        let mut registry = ModuleRegistry::new();
        let first = model.install_language_module(&mut registry);
        let second = model.install_language_module(&mut registry);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }
}
