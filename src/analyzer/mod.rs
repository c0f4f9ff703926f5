//! Analysis passes: module/package resolution followed by expression and
//! declaration type checking.

pub mod expression_visitor;
pub mod module_visitor;

pub use expression_visitor::ExpressionVisitor;
pub use module_visitor::{ModuleVisitor, SourceUnit};

use crate::language::errors::AnalysisError;
use crate::model::module::ModuleRegistry;
use crate::model::{Model, ScopeRef};

/// Knobs for a checking run.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalysisOptions {
    /// Treat unsupported-construct diagnostics as errors instead of
    /// warnings.
    pub strict: bool,
}

/// Runs the two-phase module resolution pass over a set of source units,
/// seeding the language module first.
pub fn resolve_modules(
    model: &mut Model,
    registry: &mut ModuleRegistry,
    units: &mut [SourceUnit],
) -> Vec<AnalysisError> {
    model.install_language_module(registry);
    let mut visitor = ModuleVisitor::new(model, registry);
    visitor.run(units);
    visitor.into_errors()
}

/// Type-checks one resolved source unit.
pub fn check_unit(
    model: &mut Model,
    options: AnalysisOptions,
    unit: &mut SourceUnit,
) -> Vec<AnalysisError> {
    let scope = match unit.package {
        Some(package) => ScopeRef::Package(package),
        None => ScopeRef::Package(model.get_or_create_package(&unit.package_path)),
    };
    let mut visitor = ExpressionVisitor::new(model, options, scope);
    visitor.visit_unit(&mut unit.unit);
    visitor.into_errors()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::ast::{CompilationUnit, ExprKind, Item, TypeRef, ValueDeclaration};
    use crate::language::ast::{Expr, Identifier};
    use crate::language::span::Span;
    use crate::model::{Declaration, DeclarationKind};

    #[test]
    fn resolve_then_check_round_trip() {
        let mut model = Model::new();
        let mut registry = ModuleRegistry::new();
        let mut unit = CompilationUnit::new();
        unit.items.push(Item::Value(ValueDeclaration {
            name: Identifier::new("answer", Span::new(0, 6)),
            ty: TypeRef::Infer(Span::new(0, 6)),
            initializer: Some(Expr::new(
                ExprKind::NaturalLiteral("42".to_string()),
                Span::new(9, 11),
            )),
            annotations: Vec::new(),
            model: None,
            span: Span::new(0, 12),
        }));
        let mut units = vec![SourceUnit::new(
            "app.q",
            unit,
            vec!["app".to_string()],
        )];

        let errors = resolve_modules(&mut model, &mut registry, &mut units);
        assert!(errors.is_empty(), "unexpected: {errors:?}");
        assert!(units[0].package.is_some());

        let errors = check_unit(&mut model, AnalysisOptions::default(), &mut units[0]);
        assert!(errors.is_empty(), "unexpected: {errors:?}");
    }

    #[test]
    fn check_unit_reports_unresolved_names() {
        let mut model = Model::new();
        let mut registry = ModuleRegistry::new();
        model.install_language_module(&mut registry);
        let package = model.add_package(crate::model::Package::new(vec!["app".to_string()]));
        model.declare(
            ScopeRef::Package(package),
            Declaration::new(DeclarationKind::Value, "known"),
        );

        let mut unit = CompilationUnit::new();
        unit.items.push(Item::Value(ValueDeclaration {
            name: Identifier::new("copy", Span::default()),
            ty: TypeRef::Infer(Span::default()),
            initializer: Some(Expr::new(
                ExprKind::Base(Identifier::new("unknown", Span::default())),
                Span::default(),
            )),
            annotations: Vec::new(),
            model: None,
            span: Span::default(),
        }));
        let mut source = SourceUnit::new("app.q", unit, vec!["app".to_string()]);
        source.package = Some(package);

        let errors = check_unit(&mut model, AnalysisOptions::default(), &mut source);
        assert!(errors
            .iter()
            .any(|e| e.message == "could not resolve reference: unknown"));
    }
}
