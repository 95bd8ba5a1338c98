//! Mutator candidate selection

use crate::config::{FilterPolicy, GeneratorConfig};
use crate::model::{DeclaredMember, Type};
use crate::resolver::TypeVariableResolver;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// How a candidate maps onto properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutatorForm {
    /// `withName(x)`: exactly one parameter, and the method name names the property
    SingleProperty { derived_property: String },
    /// Properties are matched by parameter names only
    MultiProperty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'m> {
    pub member: &'m DeclaredMember,
    pub form: MutatorForm,
}

#[derive(Debug, Clone)]
pub struct MutatorDeclarationFilter {
    policy: FilterPolicy,
    prefix: String,
}

impl MutatorDeclarationFilter {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            policy: config.policy,
            prefix: config.prefix.clone(),
        }
    }

    pub fn is_candidate(&self, member: &DeclaredMember) -> bool {
        if !member.is_abstract || member.parameters.is_empty() {
            return false;
        }
        match self.policy {
            FilterPolicy::Prefixed => member.name.starts_with(&self.prefix),
            FilterPolicy::Generalized => true,
        }
    }

    pub fn form_of(&self, member: &DeclaredMember) -> MutatorForm {
        match self.policy {
            FilterPolicy::Prefixed if member.parameters.len() == 1 => MutatorForm::SingleProperty {
                derived_property: self.derive_property_name(&member.name),
            },
            _ => MutatorForm::MultiProperty,
        }
    }

    /// Select candidates from the full abstract-member listing of a value type.
    ///
    /// The listing may repeat a method redeclared at several hierarchy levels.
    /// Two entries are the same method when their names match and their
    /// parameter types agree once seen from the leaf; the first one wins and
    /// listing order is kept. Overloads with different parameter types are
    /// all kept.
    pub fn select<'m>(
        &self,
        members: &'m [DeclaredMember],
        resolver: &TypeVariableResolver<'_>,
    ) -> Vec<Candidate<'m>> {
        let mut selected: IndexMap<(&str, Vec<Type>), Candidate<'m>> = IndexMap::new();
        for member in members {
            if !self.is_candidate(member) {
                trace!(method = %member.signature(), "not a mutator candidate");
                continue;
            }
            let key = (member.name.as_str(), erased_signature(member, resolver));
            if selected.contains_key(&key) {
                trace!(method = %member.signature(), owner = %member.owner, "shadowed redeclaration");
                continue;
            }
            selected.insert(
                key,
                Candidate {
                    member,
                    form: self.form_of(member),
                },
            );
        }
        debug!(count = selected.len(), policy = ?self.policy, "selected mutator candidates");
        selected.into_values().collect()
    }

    /// `withFirstName` -> `firstName`. A bare prefix yields an empty name.
    pub fn derive_property_name(&self, method_name: &str) -> String {
        let rest = method_name.strip_prefix(self.prefix.as_str()).unwrap_or(method_name);
        let mut chars = rest.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Parameter types as seen from the leaf. Unresolvable types stay as
/// declared; the validator reports them.
fn erased_signature(member: &DeclaredMember, resolver: &TypeVariableResolver<'_>) -> Vec<Type> {
    member
        .parameters
        .iter()
        .map(|param| resolver.resolve_type(&param.ty).unwrap_or_else(|_| param.ty.clone()))
        .collect()
}
