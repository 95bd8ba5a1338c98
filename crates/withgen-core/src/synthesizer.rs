//! Reconstruction plans for validated mutators
//!
//! A plan lists, in property order, where each constructor argument of the
//! new instance comes from, plus the modifiers and annotations the emitted
//! override carries. Turning a plan into source text belongs to the host.

use crate::config::GeneratorConfig;
use crate::model::{Annotation, DeclaredMember, Modifier, MutatorSpec, Parameter, PropertySet, Type};
use serde::Serialize;
use std::fmt;

/// Where one constructor argument comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "name", rename_all = "lowercase")]
pub enum ArgumentSource {
    /// The mutator's own parameter of this name
    Parameter(String),
    /// The existing instance's accessor
    Accessor(String),
}

impl fmt::Display for ArgumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentSource::Parameter(name) => write!(f, "{name}"),
            ArgumentSource::Accessor(accessor) => write!(f, "{accessor}()"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutatorPlan {
    pub method_name: String,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<Annotation>,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    /// One entry per property, in property order
    pub arguments: Vec<ArgumentSource>,
}

impl MutatorPlan {
    /// Argument list of the reconstruction call, e.g. `a, b(), c(), d()`
    pub fn constructor_arguments(&self) -> String {
        self.arguments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().filter_map(|arg| match arg {
            ArgumentSource::Parameter(name) => Some(name.as_str()),
            ArgumentSource::Accessor(_) => None,
        })
    }
}

impl fmt::Display for MutatorPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for annotation in &self.annotations {
            write!(f, "{annotation} ")?;
        }
        for modifier in &self.modifiers {
            write!(f, "{modifier} ")?;
        }
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect();
        write!(f, "{} {}({})", self.return_type, self.method_name, params.join(", "))
    }
}

pub struct MutatorSynthesizer<'a> {
    properties: &'a PropertySet,
    config: &'a GeneratorConfig,
    leaf_type: Type,
}

impl<'a> MutatorSynthesizer<'a> {
    /// `leaf_type` is the return type of every emitted override
    pub fn new(properties: &'a PropertySet, config: &'a GeneratorConfig, leaf_type: Type) -> Self {
        Self {
            properties,
            config,
            leaf_type,
        }
    }

    pub fn synthesize(&self, spec: &MutatorSpec) -> MutatorPlan {
        let arguments = self
            .properties
            .iter()
            .map(|property| match spec.parameter(&property.name) {
                Some(parameter) => ArgumentSource::Parameter(parameter.name.clone()),
                None => ArgumentSource::Accessor(property.accessor.clone()),
            })
            .collect();

        MutatorPlan {
            method_name: spec.declaration.name.clone(),
            modifiers: emitted_modifiers(&spec.declaration),
            annotations: self.emitted_annotations(&spec.declaration),
            parameters: spec.resolved_parameters.clone(),
            return_type: self.leaf_type.clone(),
            arguments,
        }
    }

    /// The declaration's annotations with exactly one override marker
    fn emitted_annotations(&self, member: &DeclaredMember) -> Vec<Annotation> {
        let marker = self.config.override_annotation.as_str();
        let mut annotations = Vec::with_capacity(member.annotations.len() + 1);
        let mut has_marker = false;
        for annotation in &member.annotations {
            if annotation.is(marker) {
                if has_marker {
                    continue;
                }
                has_marker = true;
            }
            annotations.push(annotation.clone());
        }
        if !has_marker {
            annotations.insert(0, Annotation::new(marker));
        }
        annotations
    }
}

/// The declared visibility, if unambiguous, followed by `final`
fn emitted_modifiers(member: &DeclaredMember) -> Vec<Modifier> {
    let visibility: Vec<Modifier> = [Modifier::Public, Modifier::Protected]
        .into_iter()
        .filter(|m| member.has_modifier(*m))
        .collect();
    let mut modifiers = Vec::with_capacity(2);
    if let [single] = visibility.as_slice() {
        modifiers.push(*single);
    }
    modifiers.push(Modifier::Final);
    modifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(member: DeclaredMember) -> MutatorSpec {
        MutatorSpec {
            resolved_parameters: member.parameters.clone(),
            resolved_return_type: member.return_type.clone(),
            declaration: member,
        }
    }

    fn properties() -> PropertySet {
        PropertySet::new()
            .with("a", Type::concrete("String"))
            .with("b", Type::concrete("String"))
            .with("c", Type::concrete("int"))
    }

    #[test]
    fn test_arguments_follow_property_order() {
        let properties = properties();
        let config = GeneratorConfig::default();
        let synthesizer = MutatorSynthesizer::new(&properties, &config, Type::concrete("Test"));
        let member = DeclaredMember::abstract_method("update", "Test", Type::concrete("Test"))
            .with_param("c", Type::concrete("int"))
            .with_param("a", Type::concrete("String"));
        let plan = synthesizer.synthesize(&spec(member));
        assert_eq!(
            plan.arguments,
            vec![
                ArgumentSource::Parameter("a".to_string()),
                ArgumentSource::Accessor("b".to_string()),
                ArgumentSource::Parameter("c".to_string()),
            ]
        );
        assert_eq!(plan.constructor_arguments(), "a, b(), c");
        assert_eq!(plan.parameter_names().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_modifiers_keep_single_visibility() {
        let public = DeclaredMember::abstract_method("withA", "T", Type::concrete("T")).with_modifier(Modifier::Public);
        assert_eq!(emitted_modifiers(&public), vec![Modifier::Public, Modifier::Final]);

        let package = DeclaredMember::abstract_method("withA", "T", Type::concrete("T"));
        assert_eq!(emitted_modifiers(&package), vec![Modifier::Final]);

        let both = public.clone().with_modifier(Modifier::Protected);
        assert_eq!(emitted_modifiers(&both), vec![Modifier::Final]);
    }

    #[test]
    fn test_override_added_once() {
        let properties = properties();
        let config = GeneratorConfig::default();
        let synthesizer = MutatorSynthesizer::new(&properties, &config, Type::concrete("Test"));

        let plain = DeclaredMember::abstract_method("withA", "Test", Type::concrete("Test"))
            .with_param("a", Type::concrete("String"))
            .with_annotation(Annotation::new("Nullable"));
        let names: Vec<String> = synthesizer
            .synthesize(&spec(plain))
            .annotations
            .iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, vec!["java.lang.Override", "Nullable"]);

        let annotated = DeclaredMember::abstract_method("withA", "Test", Type::concrete("Test"))
            .with_param("a", Type::concrete("String"))
            .with_annotation(Annotation::new("Nullable"))
            .with_annotation(Annotation::new("Override"))
            .with_annotation(Annotation::new("java.lang.Override"));
        let names: Vec<String> = synthesizer
            .synthesize(&spec(annotated))
            .annotations
            .iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, vec!["Nullable", "Override"]);
    }

    #[test]
    fn test_plan_display() {
        let properties = properties();
        let config = GeneratorConfig::default();
        let synthesizer = MutatorSynthesizer::new(&properties, &config, Type::concrete("Test"));
        let member = DeclaredMember::abstract_method("withA", "Base", Type::concrete("Base"))
            .with_param("a", Type::concrete("String"))
            .with_modifier(Modifier::Public);
        let plan = synthesizer.synthesize(&spec(member));
        insta::assert_snapshot!(plan.to_string(), @"@Override public final Test withA(String a)");
    }
}
