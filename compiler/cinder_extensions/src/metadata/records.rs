//! Serialized metadata records.
//!
//! A closed representation of what a compiled module exposes: type
//! definitions with nested types, generic parameters, methods, properties
//! and custom attributes. Types are referenced by name, never by id, so a
//! module decodes into any registry.

use serde::{Deserialize, Serialize};

use cinder_types::{Accessibility, TypeKind};

use super::error::MetadataError;

/// File header: magic followed by a little-endian format version.
const MAGIC: &[u8; 4] = b"CNDX";
pub const FORMAT_VERSION: u32 = 1;

/// A compiled module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataModule {
    pub name: String,
    pub types: Vec<TypeDefRecord>,
}

impl MetadataModule {
    pub fn new(name: impl Into<String>) -> Self {
        MetadataModule {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Serialize with header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MetadataError> {
        let mut out = Vec::with_capacity(256);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bincode::serialize_into(&mut out, self).map_err(MetadataError::Encode)?;
        Ok(out)
    }

    /// Deserialize, checking the header first.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        let (magic, rest) = bytes.split_at_checked(4).ok_or(MetadataError::Truncated)?;
        if magic != MAGIC {
            return Err(MetadataError::BadMagic);
        }
        let (version, body) = rest.split_at_checked(4).ok_or(MetadataError::Truncated)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(version);
        let found = u32::from_le_bytes(raw);
        if found != FORMAT_VERSION {
            return Err(MetadataError::VersionMismatch {
                expected: FORMAT_VERSION,
                found,
            });
        }
        Ok(bincode::deserialize(body)?)
    }
}

/// Kind of a type definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindRecord {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

impl From<TypeKind> for KindRecord {
    fn from(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Class => KindRecord::Class,
            TypeKind::Struct => KindRecord::Struct,
            TypeKind::Interface => KindRecord::Interface,
            TypeKind::Enum => KindRecord::Enum,
            TypeKind::Delegate => KindRecord::Delegate,
        }
    }
}

impl From<KindRecord> for TypeKind {
    fn from(kind: KindRecord) -> Self {
        match kind {
            KindRecord::Class => TypeKind::Class,
            KindRecord::Struct => TypeKind::Struct,
            KindRecord::Interface => TypeKind::Interface,
            KindRecord::Enum => TypeKind::Enum,
            KindRecord::Delegate => TypeKind::Delegate,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessRecord {
    Private,
    FamilyAndAssembly,
    Family,
    Assembly,
    FamilyOrAssembly,
    Public,
}

impl From<Accessibility> for AccessRecord {
    fn from(access: Accessibility) -> Self {
        match access {
            Accessibility::Private => AccessRecord::Private,
            Accessibility::ProtectedAndInternal => AccessRecord::FamilyAndAssembly,
            Accessibility::Protected => AccessRecord::Family,
            Accessibility::Internal => AccessRecord::Assembly,
            Accessibility::ProtectedOrInternal => AccessRecord::FamilyOrAssembly,
            Accessibility::Public => AccessRecord::Public,
        }
    }
}

impl From<AccessRecord> for Accessibility {
    fn from(access: AccessRecord) -> Self {
        match access {
            AccessRecord::Private => Accessibility::Private,
            AccessRecord::FamilyAndAssembly => Accessibility::ProtectedAndInternal,
            AccessRecord::Family => Accessibility::Protected,
            AccessRecord::Assembly => Accessibility::Internal,
            AccessRecord::FamilyOrAssembly => Accessibility::ProtectedOrInternal,
            AccessRecord::Public => Accessibility::Public,
        }
    }
}

/// Type definition flags.
pub mod type_flags {
    pub const ABSTRACT: u32 = 0x0080;
    pub const SEALED: u32 = 0x0100;
    /// `ref struct`
    pub const BYREF_LIKE: u32 = 0x1000;
}

/// Generic parameter flags.
pub mod generic_flags {
    pub const REFERENCE_TYPE: u16 = 0x0004;
    pub const NOT_NULLABLE_VALUE_TYPE: u16 = 0x0008;
    pub const DEFAULT_CONSTRUCTOR: u16 = 0x0010;
    pub const ALLOW_BYREF_LIKE: u16 = 0x0020;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDefRecord {
    pub namespace: String,
    /// Name without arity suffix.
    pub name: String,
    pub kind: KindRecord,
    pub access: AccessRecord,
    pub flags: u32,
    pub generic_params: Vec<GenericParamRecord>,
    pub base: Option<TypeRecord>,
    pub interfaces: Vec<TypeRecord>,
    pub attributes: Vec<AttributeRecord>,
    pub methods: Vec<MethodRecord>,
    pub properties: Vec<PropertyRecord>,
    pub nested: Vec<TypeDefRecord>,
}

impl TypeDefRecord {
    #[inline]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Name with arity suffix.
    pub fn metadata_name(&self) -> String {
        if self.generic_params.is_empty() {
            self.name.clone()
        } else {
            format!("{}`{}", self.name, self.generic_params.len())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericParamRecord {
    pub name: String,
    pub flags: u16,
    pub constraints: Vec<ConstraintRecord>,
    pub attributes: Vec<AttributeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRecord {
    pub ty: TypeRecord,
    /// Nullability of the constraint type.
    pub attributes: Vec<AttributeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub access: AccessRecord,
    pub is_static: bool,
    pub generic_params: Vec<GenericParamRecord>,
    pub params: Vec<ParamRecord>,
    pub ret: ParamRecord,
    pub attributes: Vec<AttributeRecord>,
}

/// A parameter, or a method's return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    pub name: String,
    pub ty: TypeRecord,
    pub by_ref: bool,
    /// Required custom modifiers on the parameter type.
    pub modreqs: Vec<TypeRecord>,
    pub attributes: Vec<AttributeRecord>,
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub name: String,
    /// Index into the owning type's `methods`.
    pub getter: Option<u32>,
    pub setter: Option<u32>,
    pub attributes: Vec<AttributeRecord>,
}

/// A type reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRecord {
    /// `System.Int32`, `System.String`, `System.Void` ...
    Primitive(String),
    Named {
        namespace: String,
        /// Outermost first: `(name, arity)`.
        path: Vec<(String, u32)>,
        value_type: bool,
        args: Vec<TypeRecord>,
    },
    /// `!n` on a type, `!!n` on a method.
    TypeParam { method: bool, ordinal: u32 },
    Array { elem: Box<TypeRecord>, rank: u32 },
    Pointer(Box<TypeRecord>),
    FunctionPointer {
        unmanaged: bool,
        /// Calling convention types, nearest modifier first.
        modifiers: Vec<TypeRecord>,
        params: Vec<FnPtrParamRecord>,
        ret: Box<FnPtrParamRecord>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FnPtrParamRecord {
    pub ty: TypeRecord,
    pub by_ref: bool,
    pub modreqs: Vec<TypeRecord>,
}

impl TypeRecord {
    /// A reference type in namespace `ns` with no type arguments.
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeRecord::Named {
            namespace: namespace.to_owned(),
            path: vec![(name.to_owned(), 0)],
            value_type: false,
            args: Vec::new(),
        }
    }

    /// `Ns.Name` of a non-nested named type.
    pub fn full_name(&self) -> Option<String> {
        match self {
            TypeRecord::Named { namespace, path, .. } if path.len() == 1 => {
                Some(if namespace.is_empty() {
                    path[0].0.clone()
                } else {
                    format!("{namespace}.{}", path[0].0)
                })
            }
            TypeRecord::Primitive(name) => Some(name.clone()),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRecord::Primitive(name) if name == "System.Void")
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeRecord::Primitive(name) if name == "System.Object")
    }

    /// Rewrite type parameter references.
    pub fn map_type_params(&self, f: &impl Fn(bool, u32) -> (bool, u32)) -> TypeRecord {
        match self {
            TypeRecord::Primitive(_) => self.clone(),
            TypeRecord::Named {
                namespace,
                path,
                value_type,
                args,
            } => TypeRecord::Named {
                namespace: namespace.clone(),
                path: path.clone(),
                value_type: *value_type,
                args: args.iter().map(|a| a.map_type_params(f)).collect(),
            },
            TypeRecord::TypeParam { method, ordinal } => {
                let (method, ordinal) = f(*method, *ordinal);
                TypeRecord::TypeParam { method, ordinal }
            }
            TypeRecord::Array { elem, rank } => TypeRecord::Array {
                elem: Box::new(elem.map_type_params(f)),
                rank: *rank,
            },
            TypeRecord::Pointer(elem) => TypeRecord::Pointer(Box::new(elem.map_type_params(f))),
            TypeRecord::FunctionPointer {
                unmanaged,
                modifiers,
                params,
                ret,
            } => {
                let map_param = |p: &FnPtrParamRecord| FnPtrParamRecord {
                    ty: p.ty.map_type_params(f),
                    by_ref: p.by_ref,
                    modreqs: p.modreqs.clone(),
                };
                TypeRecord::FunctionPointer {
                    unmanaged: *unmanaged,
                    modifiers: modifiers.clone(),
                    params: params.iter().map(map_param).collect(),
                    ret: Box::new(map_param(ret)),
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub class: TypeRecord,
    pub positional: Vec<ConstantRecord>,
    pub named: Vec<NamedArgRecord>,
}

impl AttributeRecord {
    pub fn new(class: TypeRecord) -> Self {
        AttributeRecord {
            class,
            positional: Vec::new(),
            named: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_positional(mut self, value: ConstantRecord) -> Self {
        self.positional.push(value);
        self
    }

    /// Whether this applies the attribute named `full_name`.
    pub fn is(&self, full_name: &str) -> bool {
        self.class.full_name().as_deref() == Some(full_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedArgRecord {
    pub name: String,
    pub is_property: bool,
    pub value: ConstantRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantRecord {
    pub ty: TypeRecord,
    pub value: ConstantValueRecord,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstantValueRecord {
    Bool(bool),
    Char(u32),
    Int(i64),
    UInt(u64),
    Single(u32),
    Double(u64),
    String(String),
    Null,
    Type(TypeRecord),
    Array(Vec<ConstantRecord>),
    Error,
}
