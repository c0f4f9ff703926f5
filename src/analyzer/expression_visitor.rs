//! Expression and declaration type checking: a tree walk that fills the
//! write-once type slot of every expression, infers declaration types
//! where the source omits them, and resolves member references.
//!
//! All type compatibility here is exact equality. `ProducedType::is_exactly`
//! is the single call site to replace when a real subtyping relation lands.

use crate::analyzer::AnalysisOptions;
use crate::language::ast::{
    Block, Body, ClassDefinition, CompilationUnit, Expr, ExprKind, GetterDefinition, Item,
    MethodBody, MethodDefinition, NamedArgument, NamedArgumentList, ObjectDefinition,
    ParameterListNode, SetterDefinition, Statement, TypeAnnotation, TypeRef, ValueDeclaration,
    VariableDecl,
};
use crate::language::errors::AnalysisError;
use crate::language::span::Span;
use crate::model::{
    DeclarationId, DeclarationKind, MemberReference, Model, Parameter, ProducedType, ScopeRef,
};

/// What a `return` statement in the current body must produce.
#[derive(Clone, Debug)]
enum ReturnContext {
    /// Not inside any function, getter or setter body.
    None,
    Void(Span),
    /// The type is being inferred; returns are collected, not checked.
    Infer,
    Explicit(ProducedType),
}

pub struct ExpressionVisitor<'a> {
    model: &'a mut Model,
    options: AnalysisOptions,
    scope: ScopeRef,
    class_or_interface: Option<DeclarationId>,
    return_context: ReturnContext,
    errors: Vec<AnalysisError>,
}

impl<'a> ExpressionVisitor<'a> {
    pub fn new(model: &'a mut Model, options: AnalysisOptions, scope: ScopeRef) -> Self {
        Self {
            model,
            options,
            scope,
            class_or_interface: None,
            return_context: ReturnContext::None,
            errors: Vec::new(),
        }
    }

    pub fn visit_unit(&mut self, unit: &mut CompilationUnit) {
        for item in &mut unit.items {
            self.visit_item(item);
        }
    }

    pub fn into_errors(self) -> Vec<AnalysisError> {
        self.errors
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    pub fn visit_item(&mut self, item: &mut Item) {
        match item {
            Item::Value(value) => self.visit_value(value),
            Item::Getter(getter) => self.visit_getter(getter),
            Item::Setter(setter) => self.visit_setter(setter),
            Item::Method(method) => self.visit_method(method),
            Item::Class(class) => self.visit_class(class),
            Item::Interface(interface) => {
                let saved = (self.scope, self.class_or_interface);
                if let Some(id) = interface.model {
                    self.scope = ScopeRef::Declaration(id);
                    self.class_or_interface = Some(id);
                }
                self.visit_body(&mut interface.body);
                (self.scope, self.class_or_interface) = saved;
            }
            Item::Object(object) => self.visit_object(object),
        }
    }

    fn visit_value(&mut self, value: &mut ValueDeclaration) {
        if let Some(initializer) = &mut value.initializer {
            self.visit_expr(initializer);
        }
        match &value.ty {
            TypeRef::Explicit(annotation) => {
                let Some(declared) = self.resolve_type(&annotation.clone()) else {
                    return;
                };
                if let Some(initializer) = &value.initializer {
                    self.check_exactly(
                        &declared,
                        initializer,
                        "initializer expression type does not match declared type",
                    );
                }
                self.record_type(value.model, &declared);
            }
            TypeRef::Infer(span) => {
                let inferred = value
                    .initializer
                    .as_ref()
                    .and_then(|init| init.ty.get().cloned());
                match inferred {
                    Some(ty) => self.record_type(value.model, &ty),
                    None => self.errors.push(AnalysisError::new(
                        format!("could not infer type of: {}", value.name.name),
                        *span,
                    )),
                }
            }
            TypeRef::Void(span) => self.errors.push(AnalysisError::new(
                format!("value may not be declared void: {}", value.name.name),
                *span,
            )),
        }
    }

    fn visit_getter(&mut self, getter: &mut GetterDefinition) {
        let saved = std::mem::replace(&mut self.return_context, ReturnContext::None);
        self.return_context = match &getter.ty {
            TypeRef::Explicit(annotation) => match self.resolve_type(&annotation.clone()) {
                Some(ty) => {
                    self.record_type(getter.model, &ty);
                    ReturnContext::Explicit(ty)
                }
                None => ReturnContext::Infer,
            },
            TypeRef::Infer(_) => ReturnContext::Infer,
            TypeRef::Void(span) => {
                self.errors.push(AnalysisError::new(
                    format!("getter may not be declared void: {}", getter.name.name),
                    *span,
                ));
                ReturnContext::Infer
            }
        };
        self.visit_block(&mut getter.block);
        if matches!(getter.ty, TypeRef::Infer(_)) {
            if let Some(ty) =
                self.infer_from_block(&getter.block, &getter.name.name, getter.ty.span())
            {
                self.record_type(getter.model, &ty);
            }
        }
        self.return_context = saved;
    }

    fn visit_setter(&mut self, setter: &mut SetterDefinition) {
        let annotation = setter.parameter.ty.clone();
        self.resolve_type(&annotation);
        let saved = std::mem::replace(&mut self.return_context, ReturnContext::Void(setter.span));
        self.visit_block(&mut setter.block);
        self.return_context = saved;
    }

    fn visit_method(&mut self, method: &mut MethodDefinition) {
        let saved_scope = self.scope;
        if let Some(id) = method.model {
            self.scope = ScopeRef::Declaration(id);
        }
        for list in &mut method.parameter_lists {
            self.visit_parameter_list(list);
        }

        let saved = std::mem::replace(&mut self.return_context, ReturnContext::None);
        let declared = match &method.ty {
            TypeRef::Explicit(annotation) => self.resolve_type(&annotation.clone()),
            _ => None,
        };
        self.return_context = match (&method.ty, &declared) {
            (TypeRef::Void(span), _) => ReturnContext::Void(*span),
            (TypeRef::Explicit(_), Some(ty)) => ReturnContext::Explicit(ty.clone()),
            _ => ReturnContext::Infer,
        };

        let mut resolved = declared;
        match &mut method.body {
            MethodBody::Block(block) => {
                self.visit_block(block);
                if matches!(method.ty, TypeRef::Infer(_)) {
                    resolved =
                        self.infer_from_block(block, &method.name.name, method.ty.span());
                }
            }
            MethodBody::Specifier(expr) => {
                self.visit_expr(expr);
                match self.return_context.clone() {
                    ReturnContext::Explicit(expected) => self.check_exactly(
                        &expected,
                        expr,
                        "specified expression type does not match return type",
                    ),
                    ReturnContext::Void(_) => self.errors.push(AnalysisError::new(
                        format!("void function may not specify a value: {}", method.name.name),
                        expr.span,
                    )),
                    _ => resolved = expr.ty.get().cloned(),
                }
            }
            MethodBody::None => {}
        }
        if let Some(ty) = &resolved {
            self.record_type(method.model, ty);
        }

        self.return_context = saved;
        self.scope = saved_scope;
    }

    fn visit_class(&mut self, class: &mut ClassDefinition) {
        let saved = (self.scope, self.class_or_interface);
        if let Some(id) = class.model {
            self.scope = ScopeRef::Declaration(id);
            self.class_or_interface = Some(id);
        }
        if let Some(parameters) = &mut class.parameters {
            self.visit_parameter_list(parameters);
        }
        if let Some(extended) = &class.extended {
            if let Some(ty) = self.resolve_type(&extended.clone()) {
                if let Some(id) = class.model {
                    self.model.declaration_mut(id).extended_type = Some(ty);
                }
            }
        }
        self.visit_body(&mut class.body);
        (self.scope, self.class_or_interface) = saved;
    }

    fn visit_object(&mut self, object: &mut ObjectDefinition) {
        let saved = (self.scope, self.class_or_interface);
        if let Some(id) = object.model {
            self.scope = ScopeRef::Declaration(id);
            self.class_or_interface = Some(id);
        }
        self.visit_body(&mut object.body);
        (self.scope, self.class_or_interface) = saved;
    }

    fn visit_body(&mut self, body: &mut Body) {
        for statement in &mut body.statements {
            self.visit_statement(statement);
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        for statement in &mut block.statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Item(item) => self.visit_item(item),
            Statement::Expression(expr) => self.visit_expr(expr),
            Statement::Return { value, span } => self.visit_return(value.as_mut(), *span),
            Statement::Specifier {
                member,
                value,
                span,
            } => {
                if !matches!(member.kind, ExprKind::Base(_) | ExprKind::Member { .. }) {
                    self.unsupported("specification target", *span);
                }
                self.visit_expr(member);
                self.visit_expr(value);
                if let Some(expected) = member.ty.get().cloned() {
                    self.check_exactly(
                        &expected,
                        value,
                        "specified expression type does not match",
                    );
                }
            }
            Statement::For(statement) => {
                self.visit_expr(&mut statement.iterated);
                let key = statement
                    .key
                    .as_ref()
                    .map(|variable| self.resolve_variable(variable));
                let element = self.resolve_variable(&statement.variable);
                // The iteration check needs every variable type, but the
                // body is visited regardless so its diagnostics survive.
                if key.as_ref().map_or(true, Option::is_some) {
                    if let Some(element) = element {
                        self.check_iterated(&statement.iterated, key.flatten(), element);
                    }
                }
                self.visit_block(&mut statement.block);
            }
        }
    }

    fn resolve_variable(&mut self, variable: &VariableDecl) -> Option<ProducedType> {
        let ty = match &variable.ty {
            TypeRef::Explicit(annotation) => self.resolve_type(&annotation.clone())?,
            TypeRef::Infer(span) | TypeRef::Void(span) => {
                self.errors.push(AnalysisError::new(
                    format!(
                        "iteration variable must declare its type: {}",
                        variable.name.name
                    ),
                    *span,
                ));
                return None;
            }
        };
        self.record_type(variable.model, &ty);
        Some(ty)
    }

    /// An iterated expression must be exactly `Iterable<V>` or
    /// `Sequence<V>` for the variable type `V` (`Iterable<K, V>` for a
    /// key/value iteration).
    fn check_iterated(
        &mut self,
        iterated: &Expr,
        key: Option<ProducedType>,
        element: ProducedType,
    ) {
        let Some(actual) = iterated.ty.get().cloned() else {
            return;
        };
        let Some(iterable) = self.model.language_declaration("Iterable") else {
            return;
        };
        let sequence = self.model.language_declaration("Sequence");
        let mut expected = Vec::new();
        match key {
            Some(key) => expected.push(ProducedType::generic(iterable, vec![key, element])),
            None => {
                expected.push(ProducedType::generic(iterable, vec![element.clone()]));
                if let Some(sequence) = sequence {
                    expected.push(ProducedType::generic(sequence, vec![element]));
                }
            }
        }
        if !expected.iter().any(|candidate| actual.is_exactly(candidate)) {
            let wanted = expected
                .iter()
                .map(|ty| self.model.type_name(ty))
                .collect::<Vec<_>>()
                .join(" or ");
            self.errors.push(AnalysisError::new(
                format!(
                    "iterated expression must be of type {wanted}, found {}",
                    self.model.type_name(&actual)
                ),
                iterated.span,
            ));
        }
    }

    fn visit_return(&mut self, value: Option<&mut Expr>, span: Span) {
        let context = self.return_context.clone();
        match (context, value) {
            (ReturnContext::None, value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
                self.errors.push(AnalysisError::new(
                    "return statement appears outside a function or getter body",
                    span,
                ));
            }
            (ReturnContext::Void(_), Some(value)) => {
                self.visit_expr(value);
                self.errors.push(AnalysisError::new(
                    "void function may not return a value",
                    value.span,
                ));
            }
            (ReturnContext::Void(_), None) => {}
            (ReturnContext::Infer, value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            (ReturnContext::Explicit(expected), Some(value)) => {
                self.visit_expr(value);
                self.check_exactly(
                    &expected,
                    value,
                    "returned expression type does not match return type",
                );
            }
            (ReturnContext::Explicit(expected), None) => {
                let expected = self.model.type_name(&expected);
                self.errors.push(AnalysisError::new(
                    format!("must return a value of type {expected}"),
                    span,
                ));
            }
        }
    }

    /// Block-body inference reads the last statement only when it is a
    /// return carrying an expression.
    fn infer_from_block(&mut self, block: &Block, name: &str, span: Span) -> Option<ProducedType> {
        let inferred = match block.statements.last() {
            Some(Statement::Return {
                value: Some(value), ..
            }) => value.ty.get().cloned(),
            _ => None,
        };
        if inferred.is_none() {
            self.errors.push(AnalysisError::new(
                format!("could not infer type of: {name}"),
                span,
            ));
        }
        inferred
    }

    fn visit_parameter_list(&mut self, list: &mut ParameterListNode) {
        for parameter in &mut list.parameters {
            let annotation = parameter.ty.clone();
            let declared = self.resolve_type(&annotation);
            if let Some(default) = &mut parameter.default {
                self.visit_expr(default);
                if let Some(declared) = &declared {
                    self.check_exactly(
                        declared,
                        default,
                        "default argument type does not match parameter type",
                    );
                }
            }
        }
    }

    pub fn visit_expr(&mut self, expr: &mut Expr) {
        let span = expr.span;
        let (ty, member) = match &mut expr.kind {
            ExprKind::StringLiteral(_) => (self.builtin("String", span), None),
            ExprKind::NaturalLiteral(_) => (self.builtin("Natural", span), None),
            ExprKind::FloatLiteral(_) => (self.builtin("Float", span), None),
            ExprKind::CharLiteral(_) => (self.builtin("Character", span), None),
            ExprKind::QuotedLiteral(_) => (self.builtin("Quoted", span), None),
            ExprKind::StringTemplate { expressions, .. } => {
                for nested in expressions.iter_mut() {
                    self.visit_expr(nested);
                }
                (self.builtin("String", span), None)
            }
            ExprKind::SequenceEnumeration(elements) => {
                for element in elements.iter_mut() {
                    self.visit_expr(element);
                }
                let element_ty = elements.first().and_then(|first| first.ty.get().cloned());
                match (element_ty, self.model.language_declaration("Sequence")) {
                    (Some(element), Some(sequence)) => {
                        (Some(ProducedType::generic(sequence, vec![element])), None)
                    }
                    _ => {
                        self.errors.push(AnalysisError::new(
                            "could not infer element type of sequence enumeration",
                            span,
                        ));
                        (None, None)
                    }
                }
            }
            ExprKind::Base(name) => {
                let name = name.clone();
                match self.model.lookup(self.scope, &name.name) {
                    Some(declaration) => {
                        let ty = self.model.declaration(declaration).ty.clone();
                        (ty, Some(MemberReference { declaration }))
                    }
                    None => {
                        self.errors.push(AnalysisError::new(
                            format!("could not resolve reference: {}", name.name),
                            name.span,
                        ));
                        (None, None)
                    }
                }
            }
            ExprKind::Member { primary, name } => {
                self.visit_expr(primary);
                let name = name.clone();
                self.resolve_member(primary, &name.name, name.span)
            }
            ExprKind::This => match self.class_or_interface {
                Some(declaration) => (
                    Some(ProducedType::of(declaration)),
                    Some(MemberReference { declaration }),
                ),
                None => {
                    self.errors.push(AnalysisError::new(
                        "this appears outside a class or interface body",
                        span,
                    ));
                    (None, None)
                }
            },
            ExprKind::Super => match self.class_or_interface {
                Some(declaration) if self.model.declaration(declaration).is_class() => {
                    match self.model.declaration(declaration).extended_type.clone() {
                        Some(extended) => {
                            let target = extended.declaration;
                            (Some(extended), Some(MemberReference { declaration: target }))
                        }
                        None => {
                            self.errors.push(AnalysisError::new(
                                "class has no superclass",
                                span,
                            ));
                            (None, None)
                        }
                    }
                }
                _ => {
                    self.errors.push(AnalysisError::new(
                        "super appears outside a class body",
                        span,
                    ));
                    (None, None)
                }
            },
            ExprKind::Outer => match self.outer_declaration() {
                Some(declaration) => (
                    Some(ProducedType::of(declaration)),
                    Some(MemberReference { declaration }),
                ),
                None => {
                    self.errors.push(AnalysisError::new(
                        "outer appears outside a nested class or interface",
                        span,
                    ));
                    (None, None)
                }
            },
            ExprKind::Invocation {
                primary,
                positional,
                named,
            } => {
                self.visit_expr(primary);
                let invokable = matches!(
                    primary.kind,
                    ExprKind::Base(_)
                        | ExprKind::Member { .. }
                        | ExprKind::This
                        | ExprKind::Super
                        | ExprKind::Outer
                        | ExprKind::Paren(_)
                );
                if !invokable {
                    self.unsupported("invocation primary", primary.span);
                    self.visit_arguments(positional.as_mut(), named.as_mut());
                    (None, None)
                } else {
                    let member = primary.member;
                    self.check_invocation(member, positional.as_mut(), named.as_mut(), span)
                }
            }
            ExprKind::Index { primary, index } => {
                self.visit_expr(primary);
                self.visit_expr(index);
                let element = self.check_index(primary, index);
                (element, None)
            }
            ExprKind::Prefix { term, .. } | ExprKind::Postfix { term, .. } => {
                self.visit_expr(term);
                (term.ty.get().cloned(), None)
            }
            ExprKind::Not(term) => {
                self.visit_expr(term);
                let boolean = self.builtin("Boolean", span);
                if let Some(boolean) = &boolean {
                    self.check_exactly(boolean, term, "operand of not operator must be Boolean");
                }
                (boolean, None)
            }
            ExprKind::Negate(term) => {
                self.visit_expr(term);
                (term.ty.get().cloned(), None)
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.visit_expr(left);
                self.visit_expr(right);
                (self.check_binary(op, left, right, span), None)
            }
            ExprKind::Paren(inner) => {
                self.visit_expr(inner);
                match inner.ty.get().cloned() {
                    Some(ty) => (Some(ty), inner.member),
                    None => {
                        self.errors.push(AnalysisError::new(
                            "could not determine type of expression",
                            span,
                        ));
                        (None, None)
                    }
                }
            }
        };
        if let Some(ty) = ty {
            expr.ty.fill(ty);
        }
        expr.member = member;
    }

    /// Qualified access resolves through the declaration of the receiver
    /// type, but only when that declaration is scope-like.
    fn resolve_member(
        &mut self,
        primary: &Expr,
        name: &str,
        span: Span,
    ) -> (Option<ProducedType>, Option<MemberReference>) {
        let target = primary
            .ty
            .get()
            .map(|ty| ty.declaration)
            .filter(|id| self.model.declaration(*id).is_class_or_interface())
            .and_then(|id| self.model.lookup_member(ScopeRef::Declaration(id), name));
        match target {
            Some(declaration) => {
                let ty = self.model.declaration(declaration).ty.clone();
                (ty, Some(MemberReference { declaration }))
            }
            None => {
                self.errors.push(AnalysisError::new(
                    format!("could not determine target of member reference: {name}"),
                    span,
                ));
                (None, None)
            }
        }
    }

    /// Second class/interface boundary outward from the current one.
    fn outer_declaration(&self) -> Option<DeclarationId> {
        let current = self.class_or_interface?;
        let mut scope = self.model.declaration(current).container;
        while let Some(ScopeRef::Declaration(id)) = scope {
            if self.model.declaration(id).is_class_or_interface() {
                return Some(id);
            }
            scope = self.model.declaration(id).container;
        }
        None
    }

    fn check_invocation(
        &mut self,
        member: Option<MemberReference>,
        positional: Option<&mut Vec<Expr>>,
        named: Option<&mut NamedArgumentList>,
        span: Span,
    ) -> (Option<ProducedType>, Option<MemberReference>) {
        let Some(member) = member else {
            self.visit_arguments(positional, named);
            self.errors.push(AnalysisError::new(
                "could not determine target of invocation",
                span,
            ));
            return (None, None);
        };
        let declaration = self.model.declaration(member.declaration).clone();
        if !declaration.is_functional() {
            self.visit_arguments(positional, named);
            self.errors.push(AnalysisError::new(
                format!("member cannot be invoked: {}", declaration.name),
                span,
            ));
            return (None, None);
        }
        let Some(parameters) = declaration.first_parameter_list().cloned() else {
            self.visit_arguments(positional, named);
            self.errors.push(AnalysisError::new(
                format!("member has no parameter list: {}", declaration.name),
                span,
            ));
            return (None, None);
        };

        if let Some(arguments) = positional {
            self.check_positional_arguments(&parameters.parameters, arguments, span);
        }
        if let Some(arguments) = named {
            self.check_named_arguments(&parameters.parameters, arguments);
        }

        let result = match declaration.kind {
            DeclarationKind::Class => Some(ProducedType::of(member.declaration)),
            _ => declaration.ty.clone(),
        };
        (result, Some(member))
    }

    /// Visits argument expressions without matching them; used on error
    /// paths so every argument still ends up typed.
    fn visit_arguments(
        &mut self,
        positional: Option<&mut Vec<Expr>>,
        named: Option<&mut NamedArgumentList>,
    ) {
        if let Some(arguments) = positional {
            for argument in arguments.iter_mut() {
                self.visit_expr(argument);
            }
        }
        if let Some(list) = named {
            for argument in &mut list.named {
                match argument {
                    NamedArgument::Specified { value, .. } => self.visit_expr(value),
                    NamedArgument::Typed { block, .. } => self.visit_block(block),
                }
            }
            for argument in &mut list.sequenced {
                self.visit_expr(argument);
            }
        }
    }

    fn check_positional_arguments(
        &mut self,
        parameters: &[Parameter],
        arguments: &mut [Expr],
        span: Span,
    ) {
        for argument in arguments.iter_mut() {
            self.visit_expr(argument);
        }
        for (index, parameter) in parameters.iter().enumerate() {
            match arguments.get(index) {
                Some(argument) => {
                    if let Some(expected) = parameter.ty.clone() {
                        let what = format!(
                            "argument type does not match parameter {}",
                            parameter.name
                        );
                        self.check_exactly(&expected, argument, &what);
                    }
                }
                None => {
                    if !parameter.defaulted && !parameter.sequenced {
                        self.errors.push(AnalysisError::new(
                            format!("missing argument for required parameter: {}", parameter.name),
                            span,
                        ));
                    }
                }
            }
        }
        for argument in arguments.iter().skip(parameters.len()) {
            self.errors.push(AnalysisError::new(
                "unexpected positional argument",
                argument.span,
            ));
        }
    }

    fn check_named_arguments(&mut self, parameters: &[Parameter], list: &mut NamedArgumentList) {
        let mut matched = vec![false; parameters.len()];
        for argument in &mut list.named {
            let (name, name_span, actual) = match argument {
                NamedArgument::Specified { name, value, .. } => {
                    self.visit_expr(value);
                    (name.name.clone(), name.span, value.ty.get().cloned())
                }
                NamedArgument::Typed {
                    name, ty, block, ..
                } => {
                    let annotation = ty.clone();
                    let declared = self.resolve_type(&annotation);
                    let saved = std::mem::replace(
                        &mut self.return_context,
                        match &declared {
                            Some(ty) => ReturnContext::Explicit(ty.clone()),
                            None => ReturnContext::Infer,
                        },
                    );
                    self.visit_block(block);
                    self.return_context = saved;
                    (name.name.clone(), name.span, declared)
                }
            };
            let Some(index) = parameters.iter().position(|p| p.name == name) else {
                self.errors.push(AnalysisError::new(
                    format!("no matching parameter for named argument: {name}"),
                    name_span,
                ));
                continue;
            };
            matched[index] = true;
            if let (Some(expected), Some(actual)) = (&parameters[index].ty, &actual) {
                if !actual.is_exactly(expected) {
                    self.errors.push(AnalysisError::new(
                        format!(
                            "named argument type does not match parameter {name}: expected {}, found {}",
                            self.model.type_name(expected),
                            self.model.type_name(actual)
                        ),
                        name_span,
                    ));
                }
            }
        }

        if !list.sequenced.is_empty() {
            for argument in &mut list.sequenced {
                self.visit_expr(argument);
            }
            match parameters.last() {
                Some(parameter) if parameter.sequenced => {
                    let index = parameters.len() - 1;
                    matched[index] = true;
                    if let Some(element) = parameter.ty.clone() {
                        let what = format!(
                            "sequenced argument type does not match parameter {}",
                            parameter.name
                        );
                        for argument in &list.sequenced {
                            self.check_exactly(&element, argument, &what);
                        }
                    }
                }
                _ => self.errors.push(AnalysisError::new(
                    "no matching sequenced parameter for sequenced arguments",
                    list.span,
                )),
            }
        }

        for (parameter, matched) in parameters.iter().zip(&matched) {
            if !matched && !parameter.defaulted {
                self.errors.push(AnalysisError::new(
                    format!("missing named argument for parameter: {}", parameter.name),
                    list.span,
                ));
            }
        }
    }

    /// An indexed receiver must be exactly `Sequence<V>`; the element type
    /// propagates, and the index itself must be a Natural.
    fn check_index(&mut self, primary: &Expr, index: &Expr) -> Option<ProducedType> {
        if let Some(natural) = self.builtin("Natural", index.span) {
            self.check_exactly(&natural, index, "index must be a Natural");
        }
        let actual = primary.ty.get().cloned()?;
        let sequence = self.model.language_declaration("Sequence")?;
        if actual.declaration == sequence && actual.arguments.len() == 1 {
            Some(actual.arguments[0].clone())
        } else {
            self.errors.push(AnalysisError::new(
                format!(
                    "indexed expression must be a sequence, found {}",
                    self.model.type_name(&actual)
                ),
                primary.span,
            ));
            None
        }
    }

    fn check_binary(
        &mut self,
        op: crate::language::ast::BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Option<ProducedType> {
        use crate::language::ast::BinaryOp;
        if op.is_arithmetic() || op.is_bitwise() {
            self.check_operands_match(left, right);
            return left.ty.get().cloned();
        }
        if op.is_logical() {
            let boolean = self.builtin("Boolean", span)?;
            self.check_exactly(&boolean, left, "operand of logical operator must be Boolean");
            self.check_exactly(&boolean, right, "operand of logical operator must be Boolean");
            return Some(boolean);
        }
        if op.is_comparison() {
            self.check_operands_match(left, right);
            return self.builtin("Boolean", span);
        }
        if op.is_equality() {
            return self.builtin("Boolean", span);
        }
        match op {
            BinaryOp::Assign => {
                if let Some(expected) = left.ty.get().cloned() {
                    self.check_exactly(&expected, right, "assigned expression type does not match");
                }
                left.ty.get().cloned()
            }
            BinaryOp::Default => right.ty.get().cloned(),
            BinaryOp::Format => self.builtin("String", span),
            _ => None,
        }
    }

    fn check_operands_match(&mut self, left: &Expr, right: &Expr) {
        if let (Some(left_ty), Some(right_ty)) = (left.ty.get(), right.ty.get()) {
            if !left_ty.is_exactly(right_ty) {
                let message = format!(
                    "operand types do not match: {} and {}",
                    self.model.type_name(left_ty),
                    self.model.type_name(right_ty)
                );
                self.errors
                    .push(AnalysisError::new(message, left.span.join(right.span)));
            }
        }
    }

    fn check_exactly(&mut self, expected: &ProducedType, expr: &Expr, what: &str) {
        if let Some(actual) = expr.ty.get() {
            if !actual.is_exactly(expected) {
                let message = format!(
                    "{what}: expected {}, found {}",
                    self.model.type_name(expected),
                    self.model.type_name(actual)
                );
                self.errors.push(AnalysisError::new(message, expr.span));
            }
        }
    }

    /// Resolves a written type through the lexical scope chain.
    fn resolve_type(&mut self, annotation: &TypeAnnotation) -> Option<ProducedType> {
        let Some(declaration) = self.model.lookup(self.scope, &annotation.name.name) else {
            self.errors.push(AnalysisError::new(
                format!("could not resolve type: {}", annotation.name.name),
                annotation.name.span,
            ));
            return None;
        };
        let kind = self.model.declaration(declaration).kind;
        if !matches!(
            kind,
            DeclarationKind::Class | DeclarationKind::Interface | DeclarationKind::Alias
        ) {
            self.errors.push(AnalysisError::new(
                format!("does not name a type: {}", annotation.name.name),
                annotation.name.span,
            ));
            return None;
        }
        let mut arguments = Vec::with_capacity(annotation.arguments.len());
        for argument in &annotation.arguments {
            arguments.push(self.resolve_type(argument)?);
        }
        Some(ProducedType::generic(declaration, arguments))
    }

    fn record_type(&mut self, model: Option<DeclarationId>, ty: &ProducedType) {
        if let Some(id) = model {
            self.model.declaration_mut(id).ty = Some(ty.clone());
        }
    }

    fn builtin(&mut self, name: &str, span: Span) -> Option<ProducedType> {
        let ty = self.model.language_type(name);
        if ty.is_none() {
            self.errors.push(AnalysisError::new(
                format!("could not resolve language type: {name}"),
                span,
            ));
        }
        ty
    }

    fn unsupported(&mut self, what: &str, span: Span) {
        let message = format!("unsupported construct: {what}");
        let error = if self.options.strict {
            AnalysisError::new(message, span)
        } else {
            AnalysisError::warning(message, span)
        };
        self.errors.push(error);
    }
}
