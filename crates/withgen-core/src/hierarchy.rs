//! Type hierarchy graph
//!
//! Every declared type is a node; every `extends`/`implements` clause is an
//! edge from the declaring type to its direct ancestor, carrying the type
//! arguments supplied at that point. The graph is a DAG, checked at build
//! time. Ancestors that were referenced but never declared (library types)
//! become opaque nodes without type parameters.

use crate::model::{DeclaredType, Type, TypeDecl, TypeKind, TypeName};
use indexmap::IndexMap;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tracing::trace;

/// How a type refers to its direct ancestor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Extends,
    Implements,
}

/// One hierarchy step together with the type arguments supplied at that step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorEdge {
    pub from: TypeName,
    pub to: TypeName,
    pub kind: EdgeKind,
    /// Positional arguments for `to`'s type parameters, expressed in `from`'s frame.
    /// Empty for raw use.
    pub binding: Vec<Type>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("type `{0}` is declared more than once")]
    DuplicateType(TypeName),

    #[error("type `{owner}` declares type parameter `{name}` more than once")]
    DuplicateTypeParameter { owner: TypeName, name: String },

    #[error("interface `{0}` cannot extend a class")]
    InterfaceWithSuperclass(TypeName),

    #[error("`{owner}` uses type variable `{variable}` of `{foreign}` when declaring ancestor `{ancestor}`")]
    ForeignVariable {
        owner: TypeName,
        ancestor: TypeName,
        variable: String,
        foreign: TypeName,
    },

    #[error("`{owner}` has no type parameter `{variable}` (used when declaring ancestor `{ancestor}`)")]
    UndeclaredVariable {
        owner: TypeName,
        ancestor: TypeName,
        variable: String,
    },

    #[error("type `{0}` is its own ancestor")]
    Cycle(TypeName),
}

#[derive(Debug, Clone)]
struct TypeNode {
    name: TypeName,
    /// `None` for types referenced as ancestors but never declared
    kind: Option<TypeKind>,
    type_params: Vec<String>,
}

#[derive(Debug, Clone)]
struct EdgeData {
    kind: EdgeKind,
    /// Declaration order within the owning type, superclass first
    ordinal: usize,
    binding: Vec<Type>,
}

/// Directed acyclic graph of declared types and their direct ancestors
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchyGraph {
    graph: DiGraph<TypeNode, EdgeData>,
    nodes: IndexMap<TypeName, NodeIndex>,
}

impl TypeHierarchyGraph {
    /// Build the graph from type declarations, rejecting malformed hierarchies
    pub fn build(decls: impl IntoIterator<Item = TypeDecl>) -> Result<Self, HierarchyError> {
        let decls: Vec<TypeDecl> = decls.into_iter().collect();
        let mut hierarchy = Self::default();

        for decl in &decls {
            if hierarchy.nodes.contains_key(&decl.name) {
                return Err(HierarchyError::DuplicateType(decl.name.clone()));
            }
            let mut seen = HashSet::new();
            for param in &decl.type_params {
                if !seen.insert(param.as_str()) {
                    return Err(HierarchyError::DuplicateTypeParameter {
                        owner: decl.name.clone(),
                        name: param.clone(),
                    });
                }
            }
            if decl.kind == TypeKind::Interface && decl.superclass.is_some() {
                return Err(HierarchyError::InterfaceWithSuperclass(decl.name.clone()));
            }
            let index = hierarchy.graph.add_node(TypeNode {
                name: decl.name.clone(),
                kind: Some(decl.kind),
                type_params: decl.type_params.clone(),
            });
            hierarchy.nodes.insert(decl.name.clone(), index);
        }

        for decl in &decls {
            let from = hierarchy.nodes[&decl.name];
            let ancestors = decl
                .superclass
                .iter()
                .map(|ancestor| (EdgeKind::Extends, ancestor))
                .chain(decl.interfaces.iter().map(|ancestor| (EdgeKind::Implements, ancestor)));

            for (ordinal, (kind, ancestor)) in ancestors.enumerate() {
                check_binding_scope(decl, ancestor)?;
                let to = hierarchy.ensure_node(&ancestor.name);
                hierarchy.graph.add_edge(
                    from,
                    to,
                    EdgeData {
                        kind,
                        ordinal,
                        binding: ancestor.args.clone(),
                    },
                );
            }
        }

        if let Err(cycle) = toposort(&hierarchy.graph, None) {
            let name = hierarchy.graph[cycle.node_id()].name.clone();
            return Err(HierarchyError::Cycle(name));
        }

        Ok(hierarchy)
    }

    fn ensure_node(&mut self, name: &TypeName) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(TypeNode {
            name: name.clone(),
            kind: None,
            type_params: Vec::new(),
        });
        self.nodes.insert(name.clone(), index);
        index
    }

    pub fn contains(&self, ty: &TypeName) -> bool {
        self.nodes.contains_key(ty)
    }

    /// Whether `ty` was declared, as opposed to only referenced as an ancestor
    pub fn is_declared(&self, ty: &TypeName) -> bool {
        self.node(ty).is_some_and(|node| node.kind.is_some())
    }

    pub fn kind(&self, ty: &TypeName) -> Option<TypeKind> {
        self.node(ty).and_then(|node| node.kind)
    }

    /// Type parameters declared by `ty`, in declaration order
    pub fn type_params(&self, ty: &TypeName) -> Option<&[String]> {
        self.node(ty).map(|node| node.type_params.as_slice())
    }

    /// All known types, declared ones first, in insertion order
    pub fn types(&self) -> impl Iterator<Item = &TypeName> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, ty: &TypeName) -> Option<&TypeNode> {
        self.nodes.get(ty).map(|&index| &self.graph[index])
    }

    /// Direct ancestors in declaration order, class edge first when present.
    /// Unknown types and types without ancestors yield an empty list.
    pub fn direct_ancestors(&self, ty: &TypeName) -> Vec<AncestorEdge> {
        match self.nodes.get(ty) {
            Some(&index) => self
                .ordered_edges(index)
                .into_iter()
                .map(|edge| self.to_ancestor_edge(edge))
                .collect(),
            None => Vec::new(),
        }
    }

    // petgraph iterates outgoing edges newest first; restore declaration order
    fn ordered_edges(&self, index: NodeIndex) -> Vec<EdgeReference<'_, EdgeData>> {
        let mut edges: Vec<_> = self.graph.edges(index).collect();
        edges.sort_by_key(|edge| edge.weight().ordinal);
        edges
    }

    fn to_ancestor_edge(&self, edge: EdgeReference<'_, EdgeData>) -> AncestorEdge {
        AncestorEdge {
            from: self.graph[edge.source()].name.clone(),
            to: self.graph[edge.target()].name.clone(),
            kind: edge.weight().kind,
            binding: edge.weight().binding.clone(),
        }
    }

    /// Breadth-first search for a chain of edges leading from `from` up to `to`.
    ///
    /// Edges are explored in declaration order, so among several routes the
    /// shortest one whose first divergence is declared earliest wins. Returns
    /// an empty chain when `from == to`.
    pub fn find_path(&self, from: &TypeName, to: &TypeName) -> Option<Vec<AncestorEdge>> {
        let start = *self.nodes.get(from)?;
        let goal = *self.nodes.get(to)?;
        if start == goal {
            return Some(Vec::new());
        }

        let mut came_from: IndexMap<NodeIndex, EdgeReference<'_, EdgeData>> = IndexMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for edge in self.ordered_edges(current) {
                let next = edge.target();
                if next == start || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, edge);
                if next == goal {
                    return Some(self.unwind(start, goal, &came_from));
                }
                queue.push_back(next);
            }
        }

        trace!(from = %from, to = %to, "no ancestor path");
        None
    }

    fn unwind(
        &self,
        start: NodeIndex,
        goal: NodeIndex,
        came_from: &IndexMap<NodeIndex, EdgeReference<'_, EdgeData>>,
    ) -> Vec<AncestorEdge> {
        let mut path = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let edge = came_from[&cursor];
            path.push(self.to_ancestor_edge(edge));
            cursor = edge.source();
        }
        path.reverse();
        path
    }

    /// Reflexive, transitive subtype check over the declared hierarchy
    pub fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        if sub == sup {
            return true;
        }
        match (self.nodes.get(sub), self.nodes.get(sup)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }
}

fn check_binding_scope(decl: &TypeDecl, ancestor: &DeclaredType) -> Result<(), HierarchyError> {
    for arg in &ancestor.args {
        for var in arg.variables() {
            if var.owner != decl.name {
                return Err(HierarchyError::ForeignVariable {
                    owner: decl.name.clone(),
                    ancestor: ancestor.name.clone(),
                    variable: var.name.clone(),
                    foreign: var.owner.clone(),
                });
            }
            if !decl.type_params.contains(&var.name) {
                return Err(HierarchyError::UndeclaredVariable {
                    owner: decl.name.clone(),
                    ancestor: ancestor.name.clone(),
                    variable: var.name.clone(),
                });
            }
        }
    }
    Ok(())
}
