//! Declaration snapshots
//!
//! A snapshot describes one value type the way the host compiler sees it:
//! the types in its hierarchy, its properties and its abstract members
//! (local and inherited). Snapshots are written as JSON or TOML with type
//! positions given as type expressions, see [`type_expr`].
//!
//! ```toml
//! leaf = "Thing"
//!
//! [[types]]
//! name = "Thing"
//! superclass = "Base<Thing>"
//!
//! [[types]]
//! name = "Base"
//! type_params = ["P"]
//!
//! [[properties]]
//! name = "name"
//! type = "String"
//!
//! [[members]]
//! name = "withName"
//! owner = "Base"
//! parameters = [{ name = "name", type = "String" }]
//! returns = "P"
//! modifiers = ["public", "abstract"]
//! ```

pub mod type_expr;

use crate::hierarchy::{HierarchyError, TypeHierarchyGraph};
use crate::model::{
    Annotation, DeclaredMember, DeclaredType, Modifier, Property, PropertySet, Type, TypeDecl, TypeKind, TypeName,
};
use crate::pipeline::ValueTypeModel;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use type_expr::{parse_type, TypeExprError, TypeScope};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML snapshot: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{context}: {source}")]
    TypeExpr {
        context: String,
        #[source]
        source: TypeExprError,
    },

    #[error("{context}: `{value}` is not a type reference")]
    NotADeclaredType { context: String, value: String },

    #[error("property `{0}` is listed more than once")]
    DuplicateProperty(String),

    #[error("invalid annotation `{0}`")]
    InvalidAnnotation(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationSnapshot {
    pub leaf: String,
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub type_params: Vec<String>,
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Defaults to the property name
    pub accessor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    pub name: String,
    /// Defaults to the leaf
    pub owner: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
    pub returns: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Defaults to the presence of the `abstract` modifier, or for interface
    /// members to the absence of `default` and `static`
    #[serde(rename = "abstract")]
    pub is_abstract: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl DeclarationSnapshot {
    pub fn from_json_str(source: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(source)?)
    }

    /// Read a snapshot, choosing TOML for `.toml` files and JSON otherwise
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let source = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            _ => Self::from_json_str(&source),
        }
    }

    pub fn into_model(self) -> Result<ValueTypeModel, SnapshotError> {
        let leaf = TypeName::new(self.leaf);

        let type_params: HashMap<TypeName, Vec<String>> = self
            .types
            .iter()
            .map(|entry| (TypeName::new(entry.name.clone()), entry.type_params.clone()))
            .collect();
        let kinds: HashMap<TypeName, TypeKind> = self
            .types
            .iter()
            .map(|entry| (TypeName::new(entry.name.clone()), entry.kind))
            .collect();
        let scope_of = |owner: &TypeName| -> Vec<String> { type_params.get(owner).cloned().unwrap_or_default() };

        let mut decls = Vec::with_capacity(self.types.len());
        for entry in &self.types {
            let name = TypeName::new(entry.name.clone());
            let params = entry.type_params.clone();
            let scope = TypeScope::new(&name, &params);

            let superclass = entry
                .superclass
                .as_deref()
                .map(|text| declared_type(text, scope, || format!("superclass of `{}`", name)))
                .transpose()?;
            let interfaces = entry
                .interfaces
                .iter()
                .map(|text| declared_type(text, scope, || format!("interface of `{}`", name)))
                .collect::<Result<Vec<_>, _>>()?;

            decls.push(TypeDecl {
                name: name.clone(),
                kind: entry.kind,
                type_params: params.clone(),
                superclass,
                interfaces,
            });
        }
        let hierarchy = TypeHierarchyGraph::build(decls)?;

        let leaf_params = scope_of(&leaf);
        let mut properties = PropertySet::new();
        for entry in self.properties {
            let ty = parse_type(&entry.ty, TypeScope::new(&leaf, &leaf_params)).map_err(|source| {
                SnapshotError::TypeExpr {
                    context: format!("type of property `{}`", entry.name),
                    source,
                }
            })?;
            let accessor = entry.accessor.clone().unwrap_or_else(|| entry.name.clone());
            if !properties.insert(Property::new(entry.name.clone(), ty, accessor)) {
                return Err(SnapshotError::DuplicateProperty(entry.name));
            }
        }

        let mut members = Vec::with_capacity(self.members.len());
        for entry in self.members {
            let owner = entry
                .owner
                .as_deref()
                .map(TypeName::from)
                .unwrap_or_else(|| leaf.clone());
            let params = scope_of(&owner);
            let scope = TypeScope::new(&owner, &params);

            let return_type = parse_type(&entry.returns, scope).map_err(|source| SnapshotError::TypeExpr {
                context: format!("return type of `{}`", entry.name),
                source,
            })?;
            let mut member = DeclaredMember::new(entry.name.clone(), owner.clone(), return_type);
            for param in &entry.parameters {
                let ty = parse_type(&param.ty, scope).map_err(|source| SnapshotError::TypeExpr {
                    context: format!("parameter `{}` of `{}`", param.name, entry.name),
                    source,
                })?;
                member = member.with_param(param.name.clone(), ty);
            }
            for modifier in &entry.modifiers {
                member = member.with_modifier(*modifier);
            }
            for annotation in &entry.annotations {
                member = member.with_annotation(parse_annotation(annotation)?);
            }
            let in_interface = kinds.get(&owner) == Some(&TypeKind::Interface);
            let implied = member.has_modifier(Modifier::Abstract)
                || (in_interface && !member.has_modifier(Modifier::Default) && !member.has_modifier(Modifier::Static));
            member.is_abstract = entry.is_abstract.unwrap_or(implied);
            members.push(member);
        }

        Ok(ValueTypeModel {
            leaf,
            hierarchy,
            properties,
            members,
        })
    }
}

fn declared_type(
    text: &str,
    scope: TypeScope<'_>,
    context: impl Fn() -> String,
) -> Result<DeclaredType, SnapshotError> {
    match parse_type(text, scope) {
        Ok(Type::Concrete(declared)) => Ok(declared),
        Ok(Type::Variable(_)) => Err(SnapshotError::NotADeclaredType {
            context: context(),
            value: text.to_string(),
        }),
        Err(source) => Err(SnapshotError::TypeExpr {
            context: context(),
            source,
        }),
    }
}

/// `@Nullable`, `Nullable` or `@javax.inject.Named("x")`
fn parse_annotation(text: &str) -> Result<Annotation, SnapshotError> {
    let body = text.trim();
    let body = body.strip_prefix('@').unwrap_or(body);
    let (name, arguments) = match body.split_once('(') {
        Some((name, rest)) => {
            let arguments = rest
                .strip_suffix(')')
                .ok_or_else(|| SnapshotError::InvalidAnnotation(text.to_string()))?;
            (name.trim(), Some(arguments.trim()))
        }
        None => (body, None),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(SnapshotError::InvalidAnnotation(text.to_string()));
    }
    let annotation = Annotation::new(name);
    Ok(match arguments {
        Some(arguments) => annotation.with_arguments(arguments),
        None => annotation,
    })
}
