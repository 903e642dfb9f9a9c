//! Java type model shared by Nova's semantic crates.
//!
//! The model is deliberately small: classes, interfaces and enums with their
//! members, parameterized types, arrays, type variables and wildcards. Every
//! algorithm in this crate works against the [`TypeEnv`] trait so callers can
//! plug in their own class storage; [`TypeStore`] is the in-memory default and
//! ships a minimal JDK for tests.

use std::collections::BTreeMap;

pub mod java;
mod store;

pub use java::format::format_type;
pub use java::helpers::{instantiate_as_supertype, sam_signature, SamSignature};
pub use java::inference::{infer_from_return_type, infer_type_arguments};
pub use java::overload::{most_specific, ApplicabilityLevel, OverloadCandidate};
pub use java::subtyping::{
    box_primitive, canonicalize_named, eliminate_wildcards, is_assignable, is_subtype,
    resolve_class_in_type, unbox_class, ClassResolution,
};
pub use store::TypeStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(u32);

impl TypeVarId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Binary name of the wrapper class (`int` -> `java.lang.Integer`).
    pub fn box_class_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(Box<Type>),
    TypeVar(TypeVarId),
    Wildcard(WildcardBound),
    Intersection(Vec<Type>),
    /// A class referenced by binary name that has not been resolved to a [`ClassId`] yet.
    Named(String),
    Null,
    /// Recovery placeholder: the type could not be determined.
    Unknown,
    Error,
}

impl Type {
    #[inline]
    pub fn class(def: ClassId, args: Vec<Type>) -> Self {
        Type::Class(ClassType { def, args })
    }

    #[inline]
    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    #[inline]
    pub fn int() -> Self {
        Type::Primitive(PrimitiveType::Int)
    }

    #[inline]
    pub fn boolean() -> Self {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn is_errorish(&self) -> bool {
        matches!(self, Type::Unknown | Type::Error)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Class(_)
                | Type::Array(_)
                | Type::TypeVar(_)
                | Type::Intersection(_)
                | Type::Named(_)
                | Type::Null
        )
    }

    /// Element type of an array type.
    pub fn array_component(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    pub upper_bounds: Vec<Type>,
    pub lower_bound: Option<Type>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_varargs: bool,
    pub is_abstract: bool,
    pub visibility: Visibility,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorDef {
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub is_varargs: bool,
    pub visibility: Visibility,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    /// Binary name, e.g. `java.util.Map$Entry`.
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub constructors: Vec<ConstructorDef>,
    pub methods: Vec<MethodDef>,
    /// Lexically enclosing class for nested classes.
    pub outer: Option<ClassId>,
    pub is_static: bool,
    pub is_abstract: bool,
}

impl ClassDef {
    /// Simple source name (`java.util.Map$Entry` -> `Entry`).
    pub fn simple_name(&self) -> &str {
        let start = self
            .name
            .rfind(['.', '$'])
            .map(|idx| idx + 1)
            .unwrap_or(0);
        &self.name[start..]
    }

    /// Package of the class; empty for the default package.
    pub fn package(&self) -> &str {
        let top_level = self.name.split('$').next().unwrap_or(&self.name);
        match top_level.rfind('.') {
            Some(idx) => &top_level[..idx],
            None => "",
        }
    }

    /// Whether instances need an enclosing instance (`Outer.this`) to be created.
    pub fn requires_outer_instance(&self) -> bool {
        self.outer.is_some() && !self.is_static && self.kind == ClassKind::Class
    }

    /// The class type with its own type parameters as arguments (`List<E>`).
    pub fn self_type(&self, id: ClassId) -> Type {
        Type::class(id, self.type_params.iter().copied().map(Type::TypeVar).collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub integer: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
}

/// Read-only view of the classes and type parameters known to an analysis.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;
}

/// A mapping from type parameters to type arguments (a "substitutor").
///
/// Backed by a `BTreeMap` so iteration order and `Debug` output are stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Substitution {
    map: BTreeMap<TypeVarId, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitution for an instantiation of `def` with `args`.
    ///
    /// Raw instantiations (no arguments for a generic class) map nothing.
    pub fn for_class(def: &ClassDef, args: &[Type]) -> Self {
        let mut out = Self::new();
        if args.len() != def.type_params.len() {
            return out;
        }
        for (formal, arg) in def.type_params.iter().zip(args) {
            out.put(*formal, arg.clone());
        }
        out
    }

    pub fn get(&self, id: TypeVarId) -> Option<&Type> {
        self.map.get(&id)
    }

    pub fn put(&mut self, id: TypeVarId, ty: Type) {
        self.map.insert(id, ty);
    }

    /// Copy every mapping of `other` into `self`, `other` winning on conflicts.
    #[must_use]
    pub fn put_all(mut self, other: &Substitution) -> Self {
        for (id, ty) in &other.map {
            self.map.insert(*id, ty.clone());
        }
        self
    }

    /// Layer `self` under `base`: mappings already present in `base` win.
    #[must_use]
    pub fn merge_under(&self, base: &Substitution) -> Substitution {
        let mut out = base.clone();
        for (id, ty) in &self.map {
            out.map.entry(*id).or_insert_with(|| ty.clone());
        }
        out
    }

    pub fn contains(&self, id: TypeVarId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeVarId, &Type)> + '_ {
        self.map.iter().map(|(id, ty)| (*id, ty))
    }

    /// A substitution is raw for a generic declaration when none of its type parameters are
    /// mapped.
    pub fn is_raw_for(&self, type_params: &[TypeVarId]) -> bool {
        !type_params.is_empty() && type_params.iter().all(|tp| !self.contains(*tp))
    }

    pub fn apply(&self, ty: &Type) -> Type {
        if self.map.is_empty() {
            return ty.clone();
        }
        match ty {
            Type::TypeVar(id) => self.map.get(id).cloned().unwrap_or_else(|| ty.clone()),
            Type::Class(ClassType { def, args }) => {
                Type::class(*def, args.iter().map(|arg| self.apply(arg)).collect())
            }
            Type::Array(elem) => Type::array(self.apply(elem)),
            Type::Wildcard(WildcardBound::Extends(bound)) => {
                Type::Wildcard(WildcardBound::Extends(Box::new(self.apply(bound))))
            }
            Type::Wildcard(WildcardBound::Super(bound)) => {
                Type::Wildcard(WildcardBound::Super(Box::new(self.apply(bound))))
            }
            Type::Intersection(parts) => {
                Type::Intersection(parts.iter().map(|part| self.apply(part)).collect())
            }
            Type::Void
            | Type::Primitive(_)
            | Type::Wildcard(WildcardBound::Unbounded)
            | Type::Named(_)
            | Type::Null
            | Type::Unknown
            | Type::Error => ty.clone(),
        }
    }
}

impl FromIterator<(TypeVarId, Type)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (TypeVarId, Type)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
