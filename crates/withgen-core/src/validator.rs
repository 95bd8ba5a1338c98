//! Cross-checks resolved mutator signatures against the property set

use crate::config::GeneratorConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Location};
use crate::filter::{Candidate, MutatorForm};
use crate::hierarchy::TypeHierarchyGraph;
use crate::model::{DeclaredMember, MutatorSpec, Parameter, PropertySet, Type, TypeName};
use crate::resolver::TypeVariableResolver;
use std::collections::HashSet;
use tracing::debug;

pub struct MutatorValidator<'a> {
    leaf: &'a TypeName,
    hierarchy: &'a TypeHierarchyGraph,
    properties: &'a PropertySet,
    config: &'a GeneratorConfig,
    resolver: TypeVariableResolver<'a>,
}

impl<'a> MutatorValidator<'a> {
    pub fn new(
        leaf: &'a TypeName,
        hierarchy: &'a TypeHierarchyGraph,
        properties: &'a PropertySet,
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            leaf,
            hierarchy,
            properties,
            config,
            resolver: TypeVariableResolver::new(hierarchy, leaf),
        }
    }

    /// Validate one candidate. Every problem found is returned; a candidate
    /// with any problem produces no spec.
    pub fn validate(&self, candidate: &Candidate<'_>) -> Result<MutatorSpec, Vec<Diagnostic>> {
        let member = candidate.member;
        let location = Location::of(self.leaf, member);

        if let Some(diagnostic) = self.check_names(candidate, &location) {
            debug!(method = %member.signature(), kind = %diagnostic.kind, "rejected mutator");
            return Err(vec![diagnostic]);
        }

        let mut diagnostics = Vec::new();
        let mut resolved_parameters = Vec::with_capacity(member.parameters.len());

        for parameter in &member.parameters {
            let Some(property) = self.properties.get(&parameter.name) else {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::PropertyNotFound,
                    format!(
                        "Property \"{}\" not found for parameter \"{}\" of {}()",
                        parameter.name, parameter.name, member.name
                    ),
                    location.clone(),
                ));
                continue;
            };

            let resolved = match self.resolver.resolve_type(&parameter.ty) {
                Ok(resolved) => resolved,
                Err(err) => {
                    diagnostics.push(resolution_failure(&parameter.ty, &err.to_string(), location.clone()));
                    continue;
                }
            };

            if resolved != property.ty {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::ParameterTypeMismatch,
                    format!(
                        "Expected parameter \"{}\" of type {}, found {}",
                        parameter.name, property.ty, resolved
                    ),
                    location.clone(),
                ));
                continue;
            }

            resolved_parameters.push(Parameter::new(parameter.name.clone(), resolved));
        }

        let resolved_return_type = match self.resolver.resolve_type(&member.return_type) {
            Ok(resolved) if self.leaf_is_assignable_to(&resolved) => Some(resolved),
            Ok(resolved) => {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::ReturnTypeMismatch,
                    format!("Expected {} as return type, found {}", self.leaf, resolved),
                    location.clone(),
                ));
                None
            }
            Err(err) => {
                diagnostics.push(resolution_failure(&member.return_type, &err.to_string(), location.clone()));
                None
            }
        };

        match resolved_return_type {
            Some(resolved_return_type) if diagnostics.is_empty() => Ok(MutatorSpec {
                declaration: member.clone(),
                resolved_parameters,
                resolved_return_type,
            }),
            _ => {
                debug!(method = %member.signature(), problems = diagnostics.len(), "rejected mutator");
                Err(diagnostics)
            }
        }
    }

    /// Name-level checks that make further validation meaningless
    fn check_names(&self, candidate: &Candidate<'_>, location: &Location) -> Option<Diagnostic> {
        let member = candidate.member;

        if let Some(duplicate) = first_duplicate_parameter(member) {
            return Some(Diagnostic::error(
                DiagnosticKind::AmbiguousDeclaration,
                format!("{}() names parameter \"{}\" more than once", member.name, duplicate),
                location.clone(),
            ));
        }

        let MutatorForm::SingleProperty { derived_property } = &candidate.form else {
            return None;
        };

        if !self.properties.contains(derived_property) {
            return Some(Diagnostic::error(
                DiagnosticKind::PropertyNotFound,
                format!("Property \"{}\" not found", derived_property),
                location.clone(),
            ));
        }

        let parameter = &member.parameters[0].name;
        if parameter == derived_property {
            return None;
        }
        if self.properties.contains(parameter) {
            Some(Diagnostic::error(
                DiagnosticKind::AmbiguousDeclaration,
                format!(
                    "{}() targets property \"{}\" but its parameter names property \"{}\"",
                    member.name, derived_property, parameter
                ),
                location.clone(),
            ))
        } else {
            Some(Diagnostic::error(
                DiagnosticKind::PropertyNotFound,
                format!(
                    "Property \"{}\" not found for parameter \"{}\" of {}()",
                    parameter, parameter, member.name
                ),
                location.clone(),
            ))
        }
    }

    /// Whether the leaf type is-a `target`
    fn leaf_is_assignable_to(&self, target: &Type) -> bool {
        let Type::Concrete(declared) = target else {
            return false;
        };
        if self.config.is_universal_supertype(declared.name.as_str()) {
            return true;
        }
        if &declared.name == self.leaf {
            let own: Vec<Type> = self
                .hierarchy
                .type_params(self.leaf)
                .unwrap_or(&[])
                .iter()
                .map(|param| Type::variable(param.clone(), self.leaf.clone()))
                .collect();
            return declared.args.is_empty() || declared.args == own;
        }
        if !self.hierarchy.is_subtype(self.leaf, &declared.name) {
            return false;
        }
        declared.args.is_empty() || self.leaf_view_of(&declared.name).is_some_and(|args| args == declared.args)
    }

    /// The arguments the leaf supplies to `ancestor`. Library types carry no
    /// parameter list, so only the binding written on the last step of the
    /// path is known for them.
    fn leaf_view_of(&self, ancestor: &TypeName) -> Option<Vec<Type>> {
        if self.hierarchy.is_declared(ancestor) {
            return self.resolver.instantiate_ancestor(ancestor).ok();
        }
        let path = self.hierarchy.find_path(self.leaf, ancestor)?;
        let last = path.last()?;
        last.binding
            .iter()
            .map(|arg| self.resolver.resolve_type(arg).ok())
            .collect()
    }
}

fn resolution_failure(ty: &Type, reason: &str, location: Location) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::GenericResolutionFailure,
        format!("Couldn't resolve type {}: {}", ty, reason),
        location,
    )
}

fn first_duplicate_parameter(member: &DeclaredMember) -> Option<&str> {
    let mut seen = HashSet::new();
    member
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .find(|name| !seen.insert(*name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterPolicy;
    use crate::filter::MutatorDeclarationFilter;
    use crate::model::{DeclaredType, TypeDecl};

    struct Fixture {
        leaf: TypeName,
        hierarchy: TypeHierarchyGraph,
        properties: PropertySet,
        config: GeneratorConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let hierarchy = TypeHierarchyGraph::build(vec![
                TypeDecl::class("Test").extends(DeclaredType::raw("Parent")),
                TypeDecl::class("Parent"),
                TypeDecl::class("Unrelated"),
            ])
            .unwrap();
            Self {
                leaf: TypeName::new("Test"),
                hierarchy,
                properties: PropertySet::new()
                    .with("a", Type::concrete("String"))
                    .with("b", Type::concrete("String"))
                    .with("c", Type::concrete("int")),
                config: GeneratorConfig::default(),
            }
        }

        fn check(&self, member: DeclaredMember) -> Result<MutatorSpec, Vec<Diagnostic>> {
            let filter = MutatorDeclarationFilter::new(&self.config);
            let members = vec![member];
            let resolver = TypeVariableResolver::new(&self.hierarchy, &self.leaf);
            let candidates = filter.select(&members, &resolver);
            assert_eq!(candidates.len(), 1, "fixture member must be a candidate");
            MutatorValidator::new(&self.leaf, &self.hierarchy, &self.properties, &self.config).validate(&candidates[0])
        }
    }

    fn mutator(name: &str, returns: &str) -> DeclaredMember {
        DeclaredMember::abstract_method(name, "Test", Type::concrete(returns))
    }

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
        diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_valid_single_property() {
        let spec = Fixture::new()
            .check(mutator("withA", "Test").with_param("a", Type::concrete("String")))
            .unwrap();
        assert_eq!(spec.resolved_parameters, vec![Parameter::new("a", Type::concrete("String"))]);
        assert_eq!(spec.resolved_return_type, Type::concrete("Test"));
    }

    #[test]
    fn test_derived_property_missing() {
        let errs = Fixture::new()
            .check(mutator("withZ", "Test").with_param("z", Type::concrete("String")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::PropertyNotFound]);
        assert_eq!(errs[0].message, "Property \"z\" not found");
    }

    #[test]
    fn test_parameter_name_conflicts_with_method_name() {
        let errs = Fixture::new()
            .check(mutator("withA", "Test").with_param("b", Type::concrete("String")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::AmbiguousDeclaration]);
    }

    #[test]
    fn test_type_mismatch_names_expected_type() {
        let errs = Fixture::new()
            .check(mutator("withA", "Test").with_param("a", Type::concrete("int")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::ParameterTypeMismatch]);
        assert_eq!(errs[0].message, "Expected parameter \"a\" of type String, found int");
    }

    #[test]
    fn test_boxed_type_is_not_primitive() {
        let errs = Fixture::new()
            .check(mutator("withC", "Test").with_param("c", Type::concrete("Integer")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::ParameterTypeMismatch]);
    }

    #[test]
    fn test_return_types() {
        let fixture = Fixture::new();
        assert!(fixture
            .check(mutator("withA", "Parent").with_param("a", Type::concrete("String")))
            .is_ok());
        assert!(fixture
            .check(mutator("withA", "java.lang.Object").with_param("a", Type::concrete("String")))
            .is_ok());
        let errs = fixture
            .check(mutator("withA", "Unrelated").with_param("a", Type::concrete("String")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::ReturnTypeMismatch]);
        assert_eq!(errs[0].message, "Expected Test as return type, found Unrelated");
    }

    #[test]
    fn test_generic_library_ancestor_as_return_type() {
        let mut fixture = Fixture::new();
        fixture.hierarchy = TypeHierarchyGraph::build(vec![TypeDecl::class("Test").implements(DeclaredType::new(
            "java.lang.Comparable",
            vec![Type::concrete("Test")],
        ))])
        .unwrap();
        let comparable = |arg: &str| Type::generic("java.lang.Comparable", vec![Type::concrete(arg)]);
        let with_a = |returns: Type| {
            DeclaredMember::abstract_method("withA", "Test", returns).with_param("a", Type::concrete("String"))
        };

        let spec = fixture.check(with_a(comparable("Test"))).unwrap();
        assert_eq!(spec.resolved_return_type, comparable("Test"));

        let errs = fixture.check(with_a(comparable("String"))).unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::ReturnTypeMismatch]);
    }

    #[test]
    fn test_multi_property_collects_every_problem() {
        let mut fixture = Fixture::new();
        fixture.config = fixture.config.clone().with_policy(FilterPolicy::Generalized);
        let errs = fixture
            .check(
                mutator("update", "Unrelated")
                    .with_param("a", Type::concrete("int"))
                    .with_param("q", Type::concrete("String"))
                    .with_param("c", Type::concrete("int")),
            )
            .unwrap_err();
        assert_eq!(
            kinds(&errs),
            vec![
                DiagnosticKind::ParameterTypeMismatch,
                DiagnosticKind::PropertyNotFound,
                DiagnosticKind::ReturnTypeMismatch,
            ]
        );
    }

    #[test]
    fn test_duplicate_parameter_names() {
        let errs = Fixture::new()
            .check(
                mutator("withBoth", "Test")
                    .with_param("a", Type::concrete("String"))
                    .with_param("a", Type::concrete("String")),
            )
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::AmbiguousDeclaration]);
    }

    #[test]
    fn test_unresolvable_variable_reported() {
        let errs = Fixture::new()
            .check(mutator("withA", "Test").with_param("a", Type::variable("T", "Elsewhere")))
            .unwrap_err();
        assert_eq!(kinds(&errs), vec![DiagnosticKind::GenericResolutionFailure]);
        assert!(errs[0].message.starts_with("Couldn't resolve type T:"));
    }
}
