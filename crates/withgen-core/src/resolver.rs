//! Type variable resolution relative to a fixed leaf type
//!
//! A declaration inherited from an ancestor mentions that ancestor's type
//! variables. To see the declaration from the leaf, the resolver finds a
//! chain of ancestor edges from the leaf up to the variable's owner and
//! substitutes along it, far end first:
//!
//! ```text
//! Thing -> Base<Thing>            P := Thing
//! Base<P> -> Basement<P, P>       K := P, V := P
//! Basement<K, V> -> Foundation<K> T := K
//!
//! T  =>  K  =>  P  =>  Thing
//! ```
//!
//! Only the arguments bound at each edge are consulted. Declared bounds such
//! as `T extends Foundation<T>` are never interpreted, so self-referential
//! bounds need no special handling.

use crate::hierarchy::{AncestorEdge, TypeHierarchyGraph};
use crate::model::{DeclaredType, Type, TypeName, TypeVariableRef};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no ancestor path from `{leaf}` to `{owner}`, which declares type variable `{variable}`")]
    NoPath {
        leaf: TypeName,
        owner: TypeName,
        variable: String,
    },

    #[error("`{owner}` declares no type parameter named `{variable}`")]
    UnknownTypeParameter { owner: TypeName, variable: String },

    #[error("`{from}` uses `{to}` without type arguments, so `{variable}` cannot be resolved")]
    RawAncestor {
        from: TypeName,
        to: TypeName,
        variable: String,
    },

    #[error("type variable `{variable}` of `{owner}` appeared while substituting at `{expected}`")]
    ForeignVariable {
        expected: TypeName,
        owner: TypeName,
        variable: String,
    },

    #[error("`{ty}` still mentions type variable `{variable}` of `{owner}` when viewed from `{leaf}`")]
    Unresolved {
        leaf: TypeName,
        ty: String,
        owner: TypeName,
        variable: String,
    },
}

/// Resolves type variables as seen from one leaf type.
///
/// The resolver holds no cache; two resolvers for different leaves never
/// share results.
#[derive(Debug, Clone, Copy)]
pub struct TypeVariableResolver<'g> {
    hierarchy: &'g TypeHierarchyGraph,
    leaf: &'g TypeName,
}

impl<'g> TypeVariableResolver<'g> {
    pub fn new(hierarchy: &'g TypeHierarchyGraph, leaf: &'g TypeName) -> Self {
        Self { hierarchy, leaf }
    }

    pub fn leaf(&self) -> &TypeName {
        self.leaf
    }

    /// Resolve a single type variable to the type it denotes from the leaf.
    ///
    /// Variables owned by the leaf itself denote themselves.
    pub fn resolve(&self, var: &TypeVariableRef) -> Result<Type, ResolutionError> {
        if &var.owner == self.leaf {
            return Ok(Type::Variable(var.clone()));
        }

        let path = self
            .hierarchy
            .find_path(self.leaf, &var.owner)
            .ok_or_else(|| ResolutionError::NoPath {
                leaf: self.leaf.clone(),
                owner: var.owner.clone(),
                variable: var.name.clone(),
            })?;

        let mut current = Type::Variable(var.clone());
        for edge in path.iter().rev() {
            current = self.substitute(&current, edge)?;
            trace!(from = %edge.from, to = %edge.to, result = %current, "substituted");
            if current.is_fully_concrete() {
                break;
            }
        }

        self.ensure_leaf_frame(&current)?;
        debug!(leaf = %self.leaf, variable = %var.name, owner = %var.owner, resolved = %current, "resolved type variable");
        Ok(current)
    }

    /// Resolve every type variable inside `ty`, including nested type arguments
    pub fn resolve_type(&self, ty: &Type) -> Result<Type, ResolutionError> {
        match ty {
            Type::Variable(var) => self.resolve(var),
            Type::Concrete(declared) => {
                let args = declared
                    .args
                    .iter()
                    .map(|arg| self.resolve_type(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Concrete(DeclaredType::new(declared.name.clone(), args)))
            }
        }
    }

    /// The arguments the leaf supplies for each type parameter of `ancestor`,
    /// e.g. `[Thing]` for `Base` when `Thing extends Base<Thing>`
    pub fn instantiate_ancestor(&self, ancestor: &TypeName) -> Result<Vec<Type>, ResolutionError> {
        let params = self.hierarchy.type_params(ancestor).unwrap_or(&[]);
        params
            .iter()
            .map(|param| self.resolve(&TypeVariableRef::new(param.clone(), ancestor.clone())))
            .collect()
    }

    /// Rewrite `ty`, expressed in the frame of `edge.to`, into the frame of `edge.from`
    fn substitute(&self, ty: &Type, edge: &AncestorEdge) -> Result<Type, ResolutionError> {
        match ty {
            Type::Variable(var) => {
                if var.owner != edge.to {
                    return Err(ResolutionError::ForeignVariable {
                        expected: edge.to.clone(),
                        owner: var.owner.clone(),
                        variable: var.name.clone(),
                    });
                }
                let position = self
                    .hierarchy
                    .type_params(&edge.to)
                    .and_then(|params| params.iter().position(|p| p == &var.name))
                    .ok_or_else(|| ResolutionError::UnknownTypeParameter {
                        owner: edge.to.clone(),
                        variable: var.name.clone(),
                    })?;
                edge.binding
                    .get(position)
                    .cloned()
                    .ok_or_else(|| ResolutionError::RawAncestor {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        variable: var.name.clone(),
                    })
            }
            Type::Concrete(declared) => {
                let args = declared
                    .args
                    .iter()
                    .map(|arg| self.substitute(arg, edge))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Concrete(DeclaredType::new(declared.name.clone(), args)))
            }
        }
    }

    fn ensure_leaf_frame(&self, ty: &Type) -> Result<(), ResolutionError> {
        match ty.variables().into_iter().find(|var| &var.owner != self.leaf) {
            Some(var) => Err(ResolutionError::Unresolved {
                leaf: self.leaf.clone(),
                ty: ty.to_string(),
                owner: var.owner.clone(),
                variable: var.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDecl;

    fn name(s: &str) -> TypeName {
        TypeName::new(s)
    }

    /// Foundation<T> <- Basement<K, V> <- Base<P> <- Thing
    fn chain() -> TypeHierarchyGraph {
        let foundation = TypeDecl::class("Foundation").with_type_params(["T"]);
        let basement = TypeDecl::class("Basement").with_type_params(["K", "V"]);
        let basement = basement.clone().extends(DeclaredType::new("Foundation", vec![basement.var("K")]));
        let base = TypeDecl::class("Base").with_type_params(["P"]);
        let base = base
            .clone()
            .extends(DeclaredType::new("Basement", vec![base.var("P"), base.var("P")]));
        let thing = TypeDecl::class("Thing").extends(DeclaredType::new("Base", vec![Type::concrete("Thing")]));
        TypeHierarchyGraph::build(vec![thing, base, basement, foundation]).unwrap()
    }

    #[test]
    fn test_resolves_through_three_levels() {
        let graph = chain();
        let leaf = name("Thing");
        let resolver = TypeVariableResolver::new(&graph, &leaf);
        let resolved = resolver.resolve(&TypeVariableRef::new("T", "Foundation")).unwrap();
        assert_eq!(resolved, Type::concrete("Thing"));
    }

    #[test]
    fn test_resolves_from_intermediate_leaf_to_its_own_variable() {
        let graph = chain();
        let leaf = name("Base");
        let resolver = TypeVariableResolver::new(&graph, &leaf);
        let resolved = resolver.resolve(&TypeVariableRef::new("T", "Foundation")).unwrap();
        assert_eq!(resolved, Type::variable("P", "Base"));
    }

    #[test]
    fn test_leaf_owned_variable_is_identity() {
        let graph = chain();
        let leaf = name("Base");
        let resolver = TypeVariableResolver::new(&graph, &leaf);
        let var = TypeVariableRef::new("P", "Base");
        assert_eq!(resolver.resolve(&var).unwrap(), Type::Variable(var));
    }

    #[test]
    fn test_nested_arguments_are_substituted() {
        let holder = TypeDecl::class("Holder").with_type_params(["E"]);
        let leaf = TypeDecl::class("Names").extends(DeclaredType::new("Holder", vec![Type::concrete("String")]));
        let graph = TypeHierarchyGraph::build(vec![leaf, holder]).unwrap();
        let leaf = name("Names");
        let resolver = TypeVariableResolver::new(&graph, &leaf);

        let list_of_e = Type::generic("java.util.List", vec![Type::variable("E", "Holder")]);
        assert_eq!(
            resolver.resolve_type(&list_of_e).unwrap(),
            Type::generic("java.util.List", vec![Type::concrete("String")])
        );
    }

    #[test]
    fn test_binding_may_wrap_a_variable() {
        // Outer<X> extends Inner<List<X>>, Leaf extends Outer<Integer>
        let inner = TypeDecl::class("Inner").with_type_params(["I"]);
        let outer = TypeDecl::class("Outer").with_type_params(["X"]);
        let outer = outer
            .clone()
            .extends(DeclaredType::new("Inner", vec![Type::generic("List", vec![outer.var("X")])]));
        let leaf = TypeDecl::class("Leaf").extends(DeclaredType::new("Outer", vec![Type::concrete("Integer")]));
        let graph = TypeHierarchyGraph::build(vec![leaf, outer, inner]).unwrap();
        let leaf = name("Leaf");
        let resolver = TypeVariableResolver::new(&graph, &leaf);

        let resolved = resolver.resolve(&TypeVariableRef::new("I", "Inner")).unwrap();
        assert_eq!(resolved, Type::generic("List", vec![Type::concrete("Integer")]));
    }

    #[test]
    fn test_raw_ancestor_fails() {
        let graph = TypeHierarchyGraph::build(vec![
            TypeDecl::class("Leaf").extends(DeclaredType::raw("Box")),
            TypeDecl::class("Box").with_type_params(["T"]),
        ])
        .unwrap();
        let leaf = name("Leaf");
        let err = TypeVariableResolver::new(&graph, &leaf)
            .resolve(&TypeVariableRef::new("T", "Box"))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::RawAncestor { .. }));
    }

    #[test]
    fn test_unreachable_owner_fails() {
        let graph = chain();
        let leaf = name("Thing");
        let err = TypeVariableResolver::new(&graph, &leaf)
            .resolve(&TypeVariableRef::new("X", "Elsewhere"))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoPath { .. }));
    }

    #[test]
    fn test_unknown_parameter_fails() {
        let graph = chain();
        let leaf = name("Thing");
        let err = TypeVariableResolver::new(&graph, &leaf)
            .resolve(&TypeVariableRef::new("Z", "Foundation"))
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::UnknownTypeParameter {
                owner: name("Foundation"),
                variable: "Z".to_string()
            }
        );
    }

    #[test]
    fn test_instantiate_ancestor() {
        let graph = chain();
        let leaf = name("Thing");
        let resolver = TypeVariableResolver::new(&graph, &leaf);
        assert_eq!(
            resolver.instantiate_ancestor(&name("Basement")).unwrap(),
            vec![Type::concrete("Thing"), Type::concrete("Thing")]
        );
    }
}
