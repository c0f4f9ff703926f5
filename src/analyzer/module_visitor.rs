//! Module and package resolution: a two-phase walk over all compilation
//! units that builds the inter-module import graph. Phase one binds every
//! module descriptor so phase two can attach packages and import edges to
//! fully known modules.

use std::collections::HashSet;

use crate::language::ast::{
    has_annotation, CompilationUnit, DescriptorName, ImportModule, ModuleDescriptor,
    PackageDescriptor,
};
use crate::language::errors::AnalysisError;
use crate::language::span::Span;
use crate::model::module::{
    format_path, ModuleId, ModuleImport, ModuleRegistry, CORE_MODULE_NAME, DEFAULT_MODULE_NAME,
    LANGUAGE_MODULE_NAME,
};
use crate::model::Model;

/// Code attached to descriptor-path mismatch warnings.
pub const PATH_MISMATCH_CODE: &str = "QW8000";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Descriptor,
    Remaining,
}

/// A compilation unit plus the package path derived from its location in
/// the source tree.
#[derive(Debug)]
pub struct SourceUnit {
    pub name: String,
    pub unit: CompilationUnit,
    pub package_path: Vec<String>,
    pub module: Option<ModuleId>,
    pub package: Option<crate::model::PackageId>,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, unit: CompilationUnit, package_path: Vec<String>) -> Self {
        Self {
            name: name.into(),
            unit,
            package_path,
            module: None,
            package: None,
        }
    }
}

pub struct ModuleVisitor<'a> {
    model: &'a mut Model,
    registry: &'a mut ModuleRegistry,
    phase: Phase,
    main_module: Option<ModuleId>,
    errors: Vec<AnalysisError>,
}

impl<'a> ModuleVisitor<'a> {
    pub fn new(model: &'a mut Model, registry: &'a mut ModuleRegistry) -> Self {
        Self {
            model,
            registry,
            phase: Phase::Descriptor,
            main_module: None,
            errors: Vec::new(),
        }
    }

    pub fn run(&mut self, units: &mut [SourceUnit]) {
        self.phase = Phase::Descriptor;
        for unit in units.iter_mut() {
            self.visit_unit(unit);
        }
        self.phase = Phase::Remaining;
        for unit in units.iter_mut() {
            self.visit_unit(unit);
        }
    }

    pub fn into_errors(self) -> Vec<AnalysisError> {
        self.errors
    }

    fn visit_unit(&mut self, source: &mut SourceUnit) {
        match self.phase {
            Phase::Descriptor => {
                if let Some(descriptor) = &source.unit.module_descriptor {
                    source.module = self.visit_module_descriptor(descriptor, &source.package_path);
                }
            }
            Phase::Remaining => {
                // Units with their own descriptor switch the main module;
                // descriptor-less units stay in the enclosing one.
                if source.module.is_some() {
                    self.main_module = source.module;
                }
                if let Some(descriptor) = &source.unit.module_descriptor {
                    self.visit_imports(descriptor);
                }
                let package = self.resolve_package(source);
                source.package = Some(package);
                self.visit_member_imports(&mut source.unit);
            }
        }
    }

    fn visit_module_descriptor(
        &mut self,
        descriptor: &ModuleDescriptor,
        package_path: &[String],
    ) -> Option<ModuleId> {
        if package_path.is_empty() {
            self.errors.push(AnalysisError::new(
                "module descriptor may not occur in the root source directory",
                descriptor.span,
            ));
            return None;
        }
        let segments = self.checked_name(&descriptor.name, "module")?;

        let version = descriptor.version.as_ref().map(|v| v.value.as_str());
        let id = self.registry.get_or_create(&segments, version);

        if segments != package_path {
            self.errors.push(
                AnalysisError::warning(
                    format!(
                        "module name does not match descriptor location: {}",
                        format_path(&segments)
                    ),
                    descriptor.name.span(),
                )
                .with_code(PATH_MISMATCH_CODE)
                .with_label(format!("declared in package {}", format_path(package_path))),
            );
        }

        let shared = has_annotation(&descriptor.annotations, "shared");
        let module = self.registry.module_mut(id);
        module.available = true;
        module.shared = shared;
        if module.version.is_none() {
            module.version = version.map(str::to_string);
        }
        module.annotations = descriptor
            .annotations
            .iter()
            .map(|a| a.name.clone())
            .collect();
        Some(id)
    }

    fn visit_imports(&mut self, descriptor: &ModuleDescriptor) {
        let mut seen = HashSet::new();
        for import in &descriptor.imports {
            if let Some(segments) = import.name.segments() {
                let path = format_path(&segments);
                if !seen.insert(path.clone()) {
                    self.errors.push(AnalysisError::new(
                        format!("duplicate module import: {path}"),
                        import.name.span(),
                    ));
                }
            }
            self.visit_import(import);
        }
    }

    fn visit_import(&mut self, import: &ImportModule) {
        if import.version.is_none() {
            self.errors.push(
                AnalysisError::new("missing module version", import.span)
                    .with_help("imported modules must name the version to depend on"),
            );
        }
        let Some(segments) = self.checked_name(&import.name, "imported module") else {
            return;
        };
        if format_path(&segments) == LANGUAGE_MODULE_NAME {
            self.errors.push(AnalysisError::new(
                format!("the language module {LANGUAGE_MODULE_NAME} is imported implicitly"),
                import.name.span(),
            ));
            return;
        }

        let version = import.version.as_ref().map(|v| v.value.as_str());
        let imported = self.registry.get_or_create(&segments, version);
        if self.registry.module(imported).version.is_none() {
            self.registry.module_mut(imported).version = version.map(str::to_string);
        }

        // Without a resolved main module there is nothing to hang the
        // edge on; a module also never imports itself.
        let Some(main) = self.main_module else {
            return;
        };
        if main == imported || self.registry.find_import(main, imported).is_some() {
            return;
        }
        self.registry.add_import(
            main,
            ModuleImport {
                module: imported,
                optional: has_annotation(&import.annotations, "optional"),
                export: has_annotation(&import.annotations, "shared"),
                annotations: import.annotations.iter().map(|a| a.name.clone()).collect(),
            },
        );
    }

    fn resolve_package(&mut self, source: &SourceUnit) -> crate::model::PackageId {
        let id = self.model.get_or_create_package(&source.package_path);
        if let Some(descriptor) = &source.unit.package_descriptor {
            self.visit_package_descriptor(descriptor, &source.package_path, id);
        }
        if self.model.package(id).module.is_none() {
            self.model.package_mut(id).module = self.main_module;
        }
        id
    }

    fn visit_package_descriptor(
        &mut self,
        descriptor: &PackageDescriptor,
        package_path: &[String],
        id: crate::model::PackageId,
    ) {
        if package_path.is_empty() {
            self.errors.push(AnalysisError::new(
                "package descriptor may not occur in the root source directory",
                descriptor.span,
            ));
            return;
        }
        let Some(segments) = self.checked_name(&descriptor.name, "package") else {
            return;
        };
        if segments != package_path {
            self.errors.push(
                AnalysisError::warning(
                    format!(
                        "package name does not match descriptor location: {}",
                        format_path(&segments)
                    ),
                    descriptor.name.span(),
                )
                .with_code(PATH_MISMATCH_CODE)
                .with_label(format!("declared in package {}", format_path(package_path))),
            );
        }

        let package = self.model.package_mut(id);
        package.shared = has_annotation(&descriptor.annotations, "shared");
        package.annotations = descriptor
            .annotations
            .iter()
            .map(|a| a.name.clone())
            .collect();
        package.module = self.main_module;
    }

    /// Importing language-module members under an alias makes the alias
    /// usable as a modifier word in this unit.
    fn visit_member_imports(&mut self, unit: &mut CompilationUnit) {
        for import in &unit.member_imports {
            if import.path_name() != LANGUAGE_MODULE_NAME {
                continue;
            }
            for member in &import.members {
                if let Some(alias) = &member.alias {
                    // Only modifier words gain aliases; an aliased function
                    // or class import changes nothing here.
                    if unit.modifiers.contains_key(&member.name.name) {
                        unit.modifiers
                            .insert(alias.name.clone(), member.name.name.clone());
                    }
                }
            }
        }
    }

    /// Shared name validation for modules, packages and imports. Returns
    /// the dotted segments only when the name is usable.
    fn checked_name(&mut self, name: &DescriptorName, what: &str) -> Option<Vec<String>> {
        let span = name.span();
        let Some(segments) = name.segments() else {
            self.errors
                .push(AnalysisError::new(format!("missing {what} name"), span));
            return None;
        };
        if segments.is_empty() || segments.iter().any(String::is_empty) {
            self.errors.push(AnalysisError::new(
                format!("{what} name must not be empty"),
                span,
            ));
            return None;
        }
        if segments[0] == DEFAULT_MODULE_NAME {
            self.error_reserved(DEFAULT_MODULE_NAME, what, span);
            return None;
        }
        if segments.len() == 1 && segments[0] == CORE_MODULE_NAME {
            self.error_reserved(CORE_MODULE_NAME, what, span);
            return None;
        }
        Some(segments)
    }

    fn error_reserved(&mut self, reserved: &str, what: &str, span: Span) {
        self.errors.push(
            AnalysisError::new(format!("{reserved} is a reserved {what} name"), span)
                .with_help(format!("pick a name that does not start with '{reserved}'")),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::ast::{Annotation, Identifier};
    use crate::language::span::Spanned;

    fn ident(name: &str, at: usize) -> Identifier {
        Identifier::new(name, Span::new(at, at + name.len()))
    }

    fn path(parts: &[&str]) -> DescriptorName {
        let mut at = 0;
        DescriptorName::Path(
            parts
                .iter()
                .map(|part| {
                    let id = ident(part, at);
                    at += part.len() + 1;
                    id
                })
                .collect(),
        )
    }

    fn annotation(name: &str) -> Annotation {
        Annotation {
            name: name.to_string(),
            span: Span::default(),
        }
    }

    fn version(text: &str) -> Option<Spanned<String>> {
        Some(Spanned::new(text.to_string(), Span::default()))
    }

    fn module_unit(
        name: DescriptorName,
        version_text: Option<&str>,
        imports: Vec<ImportModule>,
    ) -> CompilationUnit {
        let mut unit = CompilationUnit::new();
        unit.module_descriptor = Some(ModuleDescriptor {
            name,
            version: version_text.and_then(version),
            annotations: Vec::new(),
            imports,
            span: Span::new(0, 6),
        });
        unit
    }

    fn import(name: DescriptorName, version_text: Option<&str>) -> ImportModule {
        ImportModule {
            name,
            version: version_text.and_then(version),
            annotations: Vec::new(),
            span: Span::default(),
        }
    }

    fn run(units: Vec<SourceUnit>) -> (Model, ModuleRegistry, Vec<SourceUnit>, Vec<AnalysisError>) {
        let mut model = Model::new();
        let mut registry = ModuleRegistry::new();
        model.install_language_module(&mut registry);
        let mut units = units;
        let mut visitor = ModuleVisitor::new(&mut model, &mut registry);
        visitor.run(&mut units);
        let errors = visitor.into_errors();
        (model, registry, units, errors)
    }

    fn pkg(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn descriptor_binds_module_and_marks_it_available() {
        let unit = module_unit(path(&["frontend", "demo"]), Some("1.0"), Vec::new());
        let units = vec![SourceUnit::new("module.q", unit, pkg(&["frontend", "demo"]))];
        let (_, registry, units, errors) = run(units);

        assert!(errors.is_empty(), "unexpected: {errors:?}");
        assert_eq!(registry.len(), 2);
        let (_, module) = registry
            .modules()
            .find(|(_, m)| m.name_as_string() == "frontend.demo")
            .expect("module");
        assert!(module.available);
        assert_eq!(module.version.as_deref(), Some("1.0"));
        assert!(units[0].package.is_some());
    }

    #[test]
    fn reserved_names_are_rejected() {
        for (name, needle) in [
            (path(&["default", "x"]), "reserved"),
            (path(&["quill"]), "reserved"),
            (DescriptorName::Computed(Span::default()), "missing module name"),
        ] {
            let unit = module_unit(name, Some("1.0"), Vec::new());
            let units = vec![SourceUnit::new("module.q", unit, pkg(&["a"]))];
            let (_, _, _, errors) = run(units);
            assert!(
                errors.iter().any(|e| e.message.contains(needle)),
                "no '{needle}' in {errors:?}"
            );
        }
    }

    #[test]
    fn root_directory_descriptor_creates_no_module() {
        let unit = module_unit(path(&["app"]), Some("1.0"), Vec::new());
        let units = vec![SourceUnit::new("module.q", unit, pkg(&[]))];
        let (_, registry, units, errors) = run(units);

        assert!(errors
            .iter()
            .any(|e| e.message.contains("root source directory")));
        assert!(!registry.modules().any(|(_, m)| m.name_as_string() == "app"));
        assert!(units[0].module.is_none());
    }

    #[test]
    fn root_directory_package_descriptor_binds_nothing() {
        let mut unit = CompilationUnit::new();
        unit.package_descriptor = Some(PackageDescriptor {
            name: path(&["app"]),
            annotations: vec![annotation("shared")],
            span: Span::default(),
        });
        let units = vec![SourceUnit::new("pkg.q", unit, pkg(&[]))];
        let (model, _, units, errors) = run(units);

        assert!(errors
            .iter()
            .any(|e| e.message.contains("root source directory")));
        // The root package itself exists, but the descriptor must not
        // have stamped it.
        let package = units[0].package.expect("package");
        assert!(!model.package(package).shared);
    }

    #[test]
    fn duplicate_imports_each_get_a_diagnostic() {
        let imports = vec![
            import(path(&["lib", "a"]), Some("1.0")),
            import(path(&["lib", "a"]), Some("1.0")),
            import(path(&["lib", "a"]), Some("1.0")),
        ];
        let unit = module_unit(path(&["app"]), Some("1.0"), imports);
        let units = vec![SourceUnit::new("module.q", unit, pkg(&["app"]))];
        let (_, registry, _, errors) = run(units);

        let duplicates = errors
            .iter()
            .filter(|e| e.message == "duplicate module import: lib.a")
            .count();
        assert_eq!(duplicates, 2);

        // Only one edge regardless of how often the import repeats.
        let (main, _) = registry
            .modules()
            .find(|(_, m)| m.name_as_string() == "app")
            .expect("app");
        assert_eq!(registry.module(main).imports.len(), 1);
    }

    #[test]
    fn import_version_defaults_onto_unversioned_module() {
        let first = module_unit(path(&["dep"]), None, Vec::new());
        let second = module_unit(
            path(&["app"]),
            Some("1.0"),
            vec![import(path(&["dep"]), Some("2.1"))],
        );
        let units = vec![
            SourceUnit::new("dep/module.q", first, pkg(&["dep"])),
            SourceUnit::new("app/module.q", second, pkg(&["app"])),
        ];
        let (_, registry, _, errors) = run(units);

        assert!(errors.is_empty(), "unexpected: {errors:?}");
        let (_, dep) = registry
            .modules()
            .find(|(_, m)| m.name_as_string() == "dep")
            .expect("dep");
        assert_eq!(dep.version.as_deref(), Some("2.1"));
    }

    #[test]
    fn explicit_language_module_import_is_an_error() {
        let unit = module_unit(
            path(&["app"]),
            Some("1.0"),
            vec![import(path(&["quill", "language"]), Some("1.0"))],
        );
        let units = vec![SourceUnit::new("module.q", unit, pkg(&["app"]))];
        let (_, _, _, errors) = run(units);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("imported implicitly")));
    }

    #[test]
    fn missing_import_version_is_diagnosed_but_still_resolved() {
        let unit = module_unit(
            path(&["app"]),
            Some("1.0"),
            vec![import(path(&["lib"]), None)],
        );
        let units = vec![SourceUnit::new("module.q", unit, pkg(&["app"]))];
        let (_, registry, _, errors) = run(units);
        assert!(errors.iter().any(|e| e.message == "missing module version"));
        assert!(registry.modules().any(|(_, m)| m.name_as_string() == "lib"));
    }

    #[test]
    fn path_mismatch_is_a_coded_warning_and_still_resolves() {
        let unit = module_unit(path(&["somewhere", "else"]), Some("1.0"), Vec::new());
        let units = vec![SourceUnit::new("module.q", unit, pkg(&["frontend", "demo"]))];
        let (_, registry, _, errors) = run(units);

        let mismatch = errors
            .iter()
            .find(|e| e.message.contains("does not match descriptor location"))
            .expect("mismatch warning");
        assert!(!mismatch.is_error());
        assert_eq!(mismatch.code.as_deref(), Some(PATH_MISMATCH_CODE));
        assert!(registry
            .modules()
            .any(|(_, m)| m.name_as_string() == "somewhere.else"));
    }

    #[test]
    fn package_descriptor_toggles_shared_both_ways() {
        let mut with_shared = CompilationUnit::new();
        with_shared.package_descriptor = Some(PackageDescriptor {
            name: path(&["app", "api"]),
            annotations: vec![annotation("shared")],
            span: Span::default(),
        });
        let units = vec![SourceUnit::new("api/pkg.q", with_shared, pkg(&["app", "api"]))];
        let (model, _, units, errors) = run(units);
        assert!(errors.is_empty(), "unexpected: {errors:?}");
        let package = units[0].package.expect("package");
        assert!(model.package(package).shared);

        let mut without = CompilationUnit::new();
        without.package_descriptor = Some(PackageDescriptor {
            name: path(&["app", "impl"]),
            annotations: Vec::new(),
            span: Span::default(),
        });
        let units = vec![SourceUnit::new("impl/pkg.q", without, pkg(&["app", "impl"]))];
        let (model, _, units, _) = run(units);
        let package = units[0].package.expect("package");
        assert!(!model.package(package).shared);
    }

    #[test]
    fn language_module_member_alias_becomes_a_unit_modifier() {
        use crate::language::ast::{ImportedMember, MemberImport};
        let mut unit = CompilationUnit::new();
        unit.member_imports.push(MemberImport {
            path: vec![ident("quill", 7), ident("language", 13)],
            members: vec![ImportedMember {
                name: ident("shared", 24),
                alias: Some(ident("open", 31)),
            }],
            span: Span::default(),
        });
        let units = vec![SourceUnit::new("app.q", unit, pkg(&["app"]))];
        let (_, _, units, errors) = run(units);
        assert!(errors.is_empty(), "unexpected: {errors:?}");
        assert_eq!(
            units[0].unit.modifiers.get("open").map(String::as_str),
            Some("shared")
        );
    }

    #[test]
    fn aliasing_a_non_modifier_member_adds_no_modifier() {
        use crate::language::ast::{ImportedMember, MemberImport};
        let mut unit = CompilationUnit::new();
        unit.member_imports.push(MemberImport {
            path: vec![ident("quill", 7), ident("language", 13)],
            members: vec![ImportedMember {
                name: ident("print", 24),
                alias: Some(ident("say", 30)),
            }],
            span: Span::default(),
        });
        let units = vec![SourceUnit::new("app.q", unit, pkg(&["app"]))];
        let (_, _, units, errors) = run(units);
        assert!(errors.is_empty(), "unexpected: {errors:?}");
        assert!(units[0].unit.modifiers.get("say").is_none());
    }
}
