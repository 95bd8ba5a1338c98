//! # Withgen Core
//!
//! Discovery, generic resolution, validation and reconstruction planning for
//! `with`-style mutators on immutable value types.
//!
//! A value type declares abstract methods such as `Thing withName(String name)`,
//! possibly on a generic ancestor (`P withName(String name)` inside
//! `Base<P>`). For each such method this crate:
//!
//! 1. selects it as a candidate ([`filter`]),
//! 2. resolves the type variables in its signature from the leaf type's point
//!    of view by walking the inheritance graph ([`hierarchy`], [`resolver`]),
//! 3. checks parameter names and types against the property set and the return
//!    type against the leaf ([`validator`]),
//! 4. plans the constructor call that rebuilds the value ([`synthesizer`]).
//!
//! ## Modules
//!
//! - **[`model`]** - Types, declarations, properties and validated specs
//! - **[`hierarchy`]** - Inheritance graph with type-argument bindings
//! - **[`resolver`]** - Type variable resolution along ancestor paths
//! - **[`filter`]** - Candidate selection and dedup
//! - **[`validator`]** - Property and signature checks
//! - **[`synthesizer`]** - Reconstruction plans
//! - **[`diagnostics`]** - Diagnostics and sinks
//! - **[`config`]** - Generator configuration
//! - **[`pipeline`]** - The end-to-end pass, single and batched
//! - **[`snapshot`]** - JSON/TOML declaration snapshots
//!
//! ## Quick Start
//!
//! ```rust
//! use withgen_core::prelude::*;
//!
//! let hierarchy = TypeHierarchyGraph::build(vec![TypeDecl::class("Test")]).unwrap();
//! let model = ValueTypeModel {
//!     leaf: TypeName::new("Test"),
//!     hierarchy,
//!     properties: PropertySet::new()
//!         .with("a", Type::concrete("String"))
//!         .with("b", Type::concrete("int")),
//!     members: vec![DeclaredMember::abstract_method("withA", "Test", Type::concrete("Test"))
//!         .with_param("a", Type::concrete("String"))],
//! };
//!
//! let report = MutatorPipeline::default().run(&model);
//! assert_eq!(report.plans[0].constructor_arguments(), "a, b()");
//! ```

pub mod config;
pub mod diagnostics;
pub mod filter;
pub mod hierarchy;
pub mod model;
pub mod pipeline;
pub mod resolver;
pub mod snapshot;
pub mod synthesizer;
pub mod validator;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{FilterPolicy, GeneratorConfig};
    pub use crate::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, Severity};
    pub use crate::hierarchy::TypeHierarchyGraph;
    pub use crate::model::{
        Annotation, DeclaredMember, DeclaredType, Modifier, MutatorSpec, PropertySet, Type, TypeDecl, TypeName,
    };
    pub use crate::pipeline::{generate_batch, GenerationReport, MutatorPipeline, ValueTypeModel};
    pub use crate::snapshot::DeclarationSnapshot;
    pub use crate::synthesizer::{ArgumentSource, MutatorPlan};
}

// Re-export main types at crate root for convenience
pub use config::{ConfigError, FilterPolicy, GeneratorConfig};
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, Location, Severity};
pub use filter::{Candidate, MutatorDeclarationFilter, MutatorForm};
pub use hierarchy::{HierarchyError, TypeHierarchyGraph};
pub use model::{
    Annotation, DeclaredMember, DeclaredType, Modifier, MutatorSpec, Parameter, Property, PropertySet, Type, TypeDecl,
    TypeKind, TypeName, TypeVariableRef,
};
pub use pipeline::{generate_batch, GenerationReport, MutatorPipeline, ValueTypeModel};
pub use resolver::{ResolutionError, TypeVariableResolver};
pub use snapshot::{DeclarationSnapshot, SnapshotError};
pub use synthesizer::{ArgumentSource, MutatorPlan, MutatorSynthesizer};
pub use validator::MutatorValidator;
