//! Filter, resolve, validate and synthesize mutators for value types

use crate::config::GeneratorConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::filter::MutatorDeclarationFilter;
use crate::hierarchy::TypeHierarchyGraph;
use crate::model::{DeclaredMember, MutatorSpec, PropertySet, Type, TypeName};
use crate::resolver::TypeVariableResolver;
use crate::synthesizer::{MutatorPlan, MutatorSynthesizer};
use crate::validator::MutatorValidator;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Everything known about one value type for a single generation pass
#[derive(Debug, Clone)]
pub struct ValueTypeModel {
    pub leaf: TypeName,
    pub hierarchy: TypeHierarchyGraph,
    pub properties: PropertySet,
    /// Full abstract-member listing, local and inherited
    pub members: Vec<DeclaredMember>,
}

impl ValueTypeModel {
    /// The leaf as a type, parameterized by its own type variables if generic
    pub fn leaf_type(&self) -> Type {
        let args = self
            .hierarchy
            .type_params(&self.leaf)
            .unwrap_or(&[])
            .iter()
            .map(|param| Type::variable(param.clone(), self.leaf.clone()))
            .collect();
        Type::generic(self.leaf.clone(), args)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub value_type: TypeName,
    pub specs: Vec<MutatorSpec>,
    pub plans: Vec<MutatorPlan>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    /// True when at least one mutator will be generated
    pub fn is_applicable(&self) -> bool {
        !self.specs.is_empty()
    }

    /// Names of the methods the generated code implements
    pub fn consumed_methods(&self) -> Vec<&str> {
        self.specs.iter().map(MutatorSpec::method_name).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MutatorPipeline {
    config: GeneratorConfig,
}

impl MutatorPipeline {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Filter, resolve and validate. Diagnostics for rejected candidates are
    /// collected; one bad candidate never blocks the others.
    pub fn discover(&self, model: &ValueTypeModel) -> (Vec<MutatorSpec>, Vec<Diagnostic>) {
        if !model.hierarchy.is_declared(&model.leaf) {
            warn!(value_type = %model.leaf, "value type missing from its own hierarchy");
        }

        let filter = MutatorDeclarationFilter::new(&self.config);
        let validator = MutatorValidator::new(&model.leaf, &model.hierarchy, &model.properties, &self.config);
        let resolver = TypeVariableResolver::new(&model.hierarchy, &model.leaf);

        let mut specs = Vec::new();
        let mut diagnostics = Vec::new();
        for candidate in filter.select(&model.members, &resolver) {
            match validator.validate(&candidate) {
                Ok(spec) => specs.push(spec),
                Err(problems) => diagnostics.extend(problems),
            }
        }
        debug!(
            value_type = %model.leaf,
            valid = specs.len(),
            diagnostics = diagnostics.len(),
            "discovered mutators"
        );
        (specs, diagnostics)
    }

    pub fn synthesize(&self, model: &ValueTypeModel, specs: &[MutatorSpec]) -> Vec<MutatorPlan> {
        let synthesizer = MutatorSynthesizer::new(&model.properties, &self.config, model.leaf_type());
        specs.iter().map(|spec| synthesizer.synthesize(spec)).collect()
    }

    pub fn run(&self, model: &ValueTypeModel) -> GenerationReport {
        let (specs, diagnostics) = self.discover(model);
        let plans = self.synthesize(model, &specs);
        GenerationReport {
            value_type: model.leaf.clone(),
            specs,
            plans,
            diagnostics,
        }
    }

    /// Like [`run`](Self::run), but diagnostics go to `sink`
    pub fn run_into(&self, model: &ValueTypeModel, sink: &dyn DiagnosticSink) -> Vec<MutatorPlan> {
        let (specs, diagnostics) = self.discover(model);
        for diagnostic in diagnostics {
            sink.report(diagnostic);
        }
        self.synthesize(model, &specs)
    }
}

/// Generate plans for independent value types in parallel.
///
/// Each worker resolves against its own model; `sink` is the only shared
/// state. Results are returned in input order.
pub fn generate_batch(
    pipeline: &MutatorPipeline,
    models: &[ValueTypeModel],
    sink: &dyn DiagnosticSink,
) -> Vec<(TypeName, Vec<MutatorPlan>)> {
    models
        .par_iter()
        .map(|model| (model.leaf.clone(), pipeline.run_into(model, sink)))
        .collect()
}
