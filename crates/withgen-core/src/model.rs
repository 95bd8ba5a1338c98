//! Declaration model shared by every stage of mutator generation
//!
//! Types, members and properties are read-only snapshots of what the host
//! compiler knows about one value type and its ancestors. They are produced
//! once per generation pass and never mutated afterwards.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Fully qualified name of a declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last dotted segment, e.g. `String` for `java.lang.String`
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A generic parameter declared on `owner`, meaningless without a leaf type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVariableRef {
    pub name: String,
    pub owner: TypeName,
}

impl TypeVariableRef {
    pub fn new(name: impl Into<String>, owner: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for TypeVariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A named type together with the arguments supplied for its type parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    pub name: TypeName,
    pub args: Vec<Type>,
}

impl DeclaredType {
    pub fn new(name: impl Into<TypeName>, args: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn raw(name: impl Into<TypeName>) -> Self {
        Self::new(name, Vec::new())
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

/// A declared type position: either a named type or a type variable
///
/// Equality is nominal. Two variables are equal only if they share both
/// name and owner; a named type equals another only if every argument does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Concrete(DeclaredType),
    Variable(TypeVariableRef),
}

impl Type {
    /// A named type without type arguments
    pub fn concrete(name: impl Into<TypeName>) -> Self {
        Type::Concrete(DeclaredType::raw(name))
    }

    pub fn generic(name: impl Into<TypeName>, args: Vec<Type>) -> Self {
        Type::Concrete(DeclaredType::new(name, args))
    }

    pub fn variable(name: impl Into<String>, owner: impl Into<TypeName>) -> Self {
        Type::Variable(TypeVariableRef::new(name, owner))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable(_))
    }

    /// True when no type variable occurs anywhere in this type
    pub fn is_fully_concrete(&self) -> bool {
        match self {
            Type::Variable(_) => false,
            Type::Concrete(declared) => declared.args.iter().all(Type::is_fully_concrete),
        }
    }

    /// Every type variable occurring in this type, outermost first
    pub fn variables(&self) -> Vec<&TypeVariableRef> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'a>(&'a self, found: &mut Vec<&'a TypeVariableRef>) {
        match self {
            Type::Variable(var) => found.push(var),
            Type::Concrete(declared) => {
                for arg in &declared.args {
                    arg.collect_variables(found);
                }
            }
        }
    }

    pub fn as_declared(&self) -> Option<&DeclaredType> {
        match self {
            Type::Concrete(declared) => Some(declared),
            Type::Variable(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Concrete(declared) => write!(f, "{declared}"),
            Type::Variable(var) => write!(f, "{var}"),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

/// Declaration of one type in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: TypeName,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    pub superclass: Option<DeclaredType>,
    /// Implemented interfaces, or extended interfaces when `kind` is `Interface`
    pub interfaces: Vec<DeclaredType>,
}

impl TypeDecl {
    pub fn class(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<TypeName>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn with_type_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn extends(mut self, superclass: DeclaredType) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: DeclaredType) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// The variable for this declaration's type parameter `name`
    pub fn var(&self, name: &str) -> Type {
        Type::variable(name, self.name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Abstract,
    Default,
    Static,
    Final,
    Synchronized,
    Native,
    Strictfp,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Abstract => "abstract",
            Modifier::Default => "default",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Synchronized => "synchronized",
            Modifier::Native => "native",
            Modifier::Strictfp => "strictfp",
        };
        f.write_str(keyword)
    }
}

/// An annotation attached to a declaration, with its raw argument source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Annotation {
    pub name: TypeName,
    pub arguments: Option<String>,
}

impl Annotation {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            arguments: None,
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    /// Whether this annotation is `qualified`, written either fully qualified or by simple name
    pub fn is(&self, qualified: &str) -> bool {
        let simple = qualified.rsplit('.').next().unwrap_or(qualified);
        self.name.as_str() == qualified || self.name.as_str() == simple
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name.simple_name())?;
        if let Some(arguments) = &self.arguments {
            write!(f, "({arguments})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Read-only snapshot of a method declaration, local or inherited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredMember {
    pub name: String,
    pub owner: TypeName,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub modifiers: BTreeSet<Modifier>,
    pub annotations: Vec<Annotation>,
    pub is_abstract: bool,
}

impl DeclaredMember {
    /// A concrete (non-abstract) method
    pub fn new(name: impl Into<String>, owner: impl Into<TypeName>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            parameters: Vec::new(),
            return_type,
            modifiers: BTreeSet::new(),
            annotations: Vec::new(),
            is_abstract: false,
        }
    }

    /// An abstract method carrying the `abstract` modifier
    pub fn abstract_method(name: impl Into<String>, owner: impl Into<TypeName>, return_type: Type) -> Self {
        Self::new(name, owner, return_type).with_modifier(Modifier::Abstract)
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        if modifier == Modifier::Abstract {
            self.is_abstract = true;
        }
        self.modifiers.insert(modifier);
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// `name(T1, T2)` using declared (unresolved) parameter types
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// A property of the value type, exposed through `accessor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub accessor: String,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: Type, accessor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            accessor: accessor.into(),
        }
    }
}

/// Ordered property mapping; the order is the canonical constructor order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertySet {
    entries: IndexMap<String, Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form: a property whose accessor shares its name
    pub fn with(mut self, name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        self.insert(Property::new(name.clone(), ty, name));
        self
    }

    /// Appends `property`, keeping the first entry when the name is taken.
    /// Returns false if the name was already present.
    pub fn insert(&mut self, property: Property) -> bool {
        if self.entries.contains_key(&property.name) {
            return false;
        }
        self.entries.insert(property.name.clone(), property);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for property in iter {
            set.insert(property);
        }
        set
    }
}

/// A mutator whose signature is fully resolved against the leaf type and validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutatorSpec {
    pub declaration: DeclaredMember,
    pub resolved_parameters: Vec<Parameter>,
    pub resolved_return_type: Type,
}

impl MutatorSpec {
    pub fn method_name(&self) -> &str {
        &self.declaration.name
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.resolved_parameters.iter().find(|p| p.name == name)
    }
}
