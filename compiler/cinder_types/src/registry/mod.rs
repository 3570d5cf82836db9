//! Named type definitions.
//!
//! The registry owns every named type the extension subsystem can see:
//! source types, types decoded from referenced metadata, and a handful of
//! well-known runtime types (`Nullable<T>`, `ValueTuple<...>`).
//!
//! Definitions are append-only; a `DefId` stays valid for the whole
//! compilation.

use cinder_ir::{Name, SourceLoc, StringInterner};
use rustc_hash::FxHashMap;

use crate::{Accessibility, AttributeData, Idx, OrdinaryMember, TypeParamDecl};

/// Index of a named type definition in the [`TypeRegistry`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct DefId(u32);

impl DefId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Category of a named type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

impl TypeKind {
    /// Structs and enums.
    #[inline]
    pub const fn is_value_type(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Enum)
    }
}

/// A named type definition.
#[derive(Clone, Debug)]
pub struct TypeDef {
    pub name: Name,
    /// Dotted namespace, `Name::EMPTY` for the global namespace.
    pub namespace: Name,
    pub kind: TypeKind,
    pub accessibility: Accessibility,
    pub type_params: Vec<TypeParamDecl>,
    /// Enclosing type for nested types.
    pub containing: Option<DefId>,
    pub is_static: bool,
    pub is_sealed: bool,
    /// `ref struct`
    pub is_ref_like: bool,
    /// Has an accessible parameterless constructor.
    pub has_default_ctor: bool,
    /// Base class; `None` means `object` for classes.
    pub base: Option<Idx>,
    pub interfaces: Vec<Idx>,
    pub members: Vec<OrdinaryMember>,
    pub attributes: Vec<AttributeData>,
    /// Module (assembly) that defines the type.
    pub module: Name,
    pub loc: SourceLoc,
}

impl TypeDef {
    /// A public, non-generic, top-level definition.
    pub fn new(namespace: Name, name: Name, kind: TypeKind) -> Self {
        TypeDef {
            name,
            namespace,
            kind,
            accessibility: Accessibility::Public,
            type_params: Vec::new(),
            containing: None,
            is_static: false,
            is_sealed: kind.is_value_type(),
            is_ref_like: false,
            has_default_ctor: kind.is_value_type() || kind == TypeKind::Class,
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            attributes: Vec::new(),
            module: Name::EMPTY,
            loc: SourceLoc::SYNTHESIZED,
        }
    }

    /// A `static class`.
    pub fn static_class(namespace: Name, name: Name) -> Self {
        let mut def = TypeDef::new(namespace, name, TypeKind::Class);
        def.is_static = true;
        def.is_sealed = true;
        def.has_default_ctor = false;
        def
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    #[must_use]
    pub fn with_type_params(mut self, params: Vec<TypeParamDecl>) -> Self {
        self.type_params = params;
        self
    }

    #[must_use]
    pub fn with_base(mut self, base: Idx) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn with_interface(mut self, iface: Idx) -> Self {
        self.interfaces.push(iface);
        self
    }

    #[must_use]
    pub fn with_member(mut self, member: OrdinaryMember) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: Name) -> Self {
        self.module = module;
        self
    }

    #[must_use]
    pub fn nested_in(mut self, outer: DefId) -> Self {
        self.containing = Some(outer);
        self
    }
}

/// Well-known runtime types pre-registered in every registry.
#[derive(Copy, Clone, Debug)]
pub struct WellKnown {
    /// `System.Nullable<T>`
    pub nullable: DefId,
    /// `System.ValueTuple<T1>` .. `System.ValueTuple<T1..T7, TRest>`
    pub value_tuple: [DefId; 8],
    /// `System.ValueType`
    pub value_type: DefId,
    /// `System.Enum`
    pub enum_base: DefId,
}

/// Lookup key: (namespace, name, arity, containing type).
type DefKey = (Name, Name, usize, Option<DefId>);

/// Registry of named type definitions.
pub struct TypeRegistry {
    defs: Vec<TypeDef>,
    by_key: FxHashMap<DefKey, DefId>,
    well_known: WellKnown,
}

impl TypeRegistry {
    /// Create a registry with the well-known runtime types registered.
    pub fn new(interner: &StringInterner) -> Self {
        let mut registry = TypeRegistry {
            defs: Vec::new(),
            by_key: FxHashMap::default(),
            well_known: WellKnown {
                nullable: DefId(0),
                value_tuple: [DefId(0); 8],
                value_type: DefId(0),
                enum_base: DefId(0),
            },
        };

        let system = interner.intern("System");
        let param = |i: usize| TypeParamDecl::new(interner.intern(&format!("T{i}")));

        let value_type = registry.register(TypeDef::new(
            system,
            interner.intern("ValueType"),
            TypeKind::Class,
        ));
        let mut enum_def = TypeDef::new(system, interner.intern("Enum"), TypeKind::Class);
        enum_def.has_default_ctor = false;
        let enum_base = registry.register(enum_def);

        let nullable = registry.register(
            TypeDef::new(system, interner.intern("Nullable"), TypeKind::Struct)
                .with_type_params(vec![TypeParamDecl::new(interner.intern("T"))]),
        );

        let value_tuple_name = interner.intern("ValueTuple");
        let mut value_tuple = [DefId(0); 8];
        for (i, slot) in value_tuple.iter_mut().enumerate() {
            let mut params: Vec<TypeParamDecl> = (1..=i + 1).map(param).collect();
            if i == 7 {
                params[7] = TypeParamDecl::new(interner.intern("TRest"));
            }
            *slot = registry.register(
                TypeDef::new(system, value_tuple_name, TypeKind::Struct).with_type_params(params),
            );
        }

        registry.well_known = WellKnown {
            nullable,
            value_tuple,
            value_type,
            enum_base,
        };
        registry
    }

    /// Register a definition. Re-registering the same key returns the
    /// existing id and keeps the first definition.
    pub fn register(&mut self, def: TypeDef) -> DefId {
        let key = (def.namespace, def.name, def.arity(), def.containing);
        if let Some(&id) = self.by_key.get(&key) {
            return id;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "more than u32::MAX type definitions is not a realistic compilation"
        )]
        let id = DefId(self.defs.len() as u32);
        self.defs.push(def);
        self.by_key.insert(key, id);
        tracing::trace!(def = id.raw(), "registered type definition");
        id
    }

    #[inline]
    pub fn get(&self, id: DefId) -> &TypeDef {
        &self.defs[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: DefId) -> &mut TypeDef {
        &mut self.defs[id.index()]
    }

    /// Find a definition by namespace, name, arity and enclosing type.
    pub fn lookup(
        &self,
        namespace: Name,
        name: Name,
        arity: usize,
        containing: Option<DefId>,
    ) -> Option<DefId> {
        self.by_key
            .get(&(namespace, name, arity, containing))
            .copied()
    }

    #[inline]
    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    /// Nested types declared directly in `outer`, in registration order.
    pub fn nested_types(&self, outer: DefId) -> impl Iterator<Item = DefId> + '_ {
        self.iter()
            .filter(move |(_, def)| def.containing == Some(outer))
            .map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DefId, &TypeDef)> {
        self.defs.iter().enumerate().map(|(i, def)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "ids were created from u32 in register"
            )]
            let id = DefId(i as u32);
            (id, def)
        })
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Index of `def` among the `ValueTuple` family, if it is one.
    pub fn value_tuple_arity(&self, def: DefId) -> Option<usize> {
        self.well_known
            .value_tuple
            .iter()
            .position(|&id| id == def)
            .map(|i| i + 1)
    }

    /// Dotted name for display and documentation ids: `Ns.Outer.Inner`.
    pub fn qualified_name(&self, id: DefId, interner: &StringInterner) -> String {
        self.qualified_name_with(id, interner, '.', false)
    }

    /// Metadata name: `Ns.Outer/Inner`1`, with arity suffixes.
    pub fn metadata_name(&self, id: DefId, interner: &StringInterner) -> String {
        self.qualified_name_with(id, interner, '/', true)
    }

    fn qualified_name_with(
        &self,
        id: DefId,
        interner: &StringInterner,
        nested_sep: char,
        arity_suffix: bool,
    ) -> String {
        let def = self.get(id);
        let mut out = match def.containing {
            Some(outer) => {
                let mut s = self.qualified_name_with(outer, interner, nested_sep, arity_suffix);
                s.push(nested_sep);
                s
            }
            None if def.namespace.is_empty() => String::new(),
            None => format!("{}.", interner.lookup(def.namespace)),
        };
        out.push_str(interner.lookup(def.name));
        if arity_suffix && def.arity() > 0 {
            out.push('`');
            out.push_str(&def.arity().to_string());
        }
        out
    }
}
