//! Decoding metadata records into the type graph and the extension table.
//!
//! Import runs in three passes over a module:
//! 1. register every type definition (nested ones under their outer type),
//!    so references between types of the module resolve by name;
//! 2. fill in generic constraints, base types, attributes and ordinary
//!    members of the definitions this module introduced;
//! 3. re-derive containers on types carrying `ExtensionAttribute` and
//!    validate each skeleton against its forwarder.
//!
//! Records are untrusted. A container whose marker cannot be decoded is
//! reported with E3301 and skipped; a member that cannot be decoded or
//! fails validation is kept but marked unsupported.

use cinder_diagnostic::{Diagnostic, ErrorCode};
use cinder_ir::{Name, SourceLoc, Span, StringInterner};
use cinder_types::{
    Accessibility, AttributeData, ConstantValue, ConstraintClause, ConstraintFlags, DefId,
    FnPtrParam, FnPtrSig, Idx, NamedArg, NamedArgKind, OrdinaryMember, OrdinaryMemberKind,
    ParamInfo, Pool, RefKind, ScopedKind, TypeDef, TypeKind, TypeParamDecl, TypeRegistry,
    TypedConstant,
};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use super::error::DecodeError;
use super::records::{
    generic_flags, type_flags, AttributeRecord, ConstantRecord, ConstantValueRecord,
    FnPtrParamRecord, GenericParamRecord, MetadataModule, MethodRecord, ParamRecord,
    PropertyRecord, TypeDefRecord, TypeRecord,
};
use super::validate::{container_marker, declares_extensions, match_forwarder};
use super::{
    full_name, is_synthesized_attribute, ParamSpace, ANNOTATED, COMPILER_SERVICES, IN_ATTRIBUTE,
    INTEROP_SERVICES, IS_UNMANAGED_ATTRIBUTE, NOT_ANNOTATED, NULLABLE_ATTRIBUTE,
    PRIORITY_ATTRIBUTE, REQUIRES_LOCATION_ATTRIBUTE, SCOPED_REF_ATTRIBUTE, TUPLE_NAMES_ATTRIBUTE,
};
use crate::assign::parse_container_ordinal;
use crate::decl::{Accessors, MemberKind, ReceiverDescriptor};
use crate::emit::MARKER_METHOD_NAME;
use crate::encode::encode_receiver;
use crate::symbols::{
    Container, ContainerId, ExtensionTable, ForwarderMember, ForwarderRole, MarkerMethod, Origin,
    SkeletonMember, UnsupportedReason,
};

/// Result of importing one module.
#[derive(Debug)]
pub struct ImportedModule {
    /// Containers, skeletons and forwarders found in the module.
    pub table: ExtensionTable,
    /// Every type definition of the module, in record order.
    pub types: Vec<DefId>,
    pub diagnostics: Vec<(Diagnostic, SourceLoc)>,
}

/// Decode `module` into `pool` and `registry`.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn import_module(
    module: &MetadataModule,
    pool: &mut Pool,
    registry: &mut TypeRegistry,
    interner: &StringInterner,
) -> ImportedModule {
    let mut importer = Importer {
        pool,
        registry,
        interner,
        module: interner.intern(&module.name),
        table: ExtensionTable::new(),
        diagnostics: Vec::new(),
    };

    let mut defs = Vec::new();
    for record in &module.types {
        importer.register(record, None, &mut defs);
    }
    for &(def, record, fresh) in &defs {
        if fresh {
            importer.fill(def, record);
        }
    }
    for &(def, record, _) in &defs {
        if declares_extensions(record) {
            importer.containers(def, record);
        }
    }

    tracing::debug!(
        types = defs.len(),
        containers = importer.table.container_count(),
        skeletons = importer.table.skeleton_count(),
        "imported metadata module"
    );
    ImportedModule {
        table: importer.table,
        types: defs.into_iter().map(|(def, _, _)| def).collect(),
        diagnostics: importer.diagnostics,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "record indices are far below u32::MAX"
)]
fn to_u32(n: usize) -> u32 {
    n as u32
}

/// Names of the type parameters in scope while decoding one signature.
#[derive(Copy, Clone)]
struct Scope<'n> {
    space: ParamSpace,
    /// Referenced as `!i`.
    outer: &'n [Name],
    /// Referenced as `!!j`.
    method: &'n [Name],
}

impl<'n> Scope<'n> {
    const EMPTY: Scope<'static> = Scope {
        space: ParamSpace::Plain,
        outer: &[],
        method: &[],
    };

    fn new(space: ParamSpace, outer: &'n [Name], method: &'n [Name]) -> Self {
        Scope {
            space,
            outer,
            method,
        }
    }
}

/// Nullable bytes of one type tree, consumed in preorder.
enum NullableBytes {
    Uniform(u8),
    Each { bytes: Vec<u8>, next: usize },
}

impl NullableBytes {
    fn next(&mut self) -> u8 {
        match self {
            NullableBytes::Uniform(b) => *b,
            NullableBytes::Each { bytes, next } => {
                let b = bytes.get(*next).copied().unwrap_or(NOT_ANNOTATED);
                *next += 1;
                b
            }
        }
    }
}

/// Annotation attributes attached to one type tree.
struct Annotations {
    nullable: NullableBytes,
    names: Vec<Option<Name>>,
    next_name: usize,
}

impl Annotations {
    fn none() -> Self {
        Annotations {
            nullable: NullableBytes::Uniform(NOT_ANNOTATED),
            names: Vec::new(),
            next_name: 0,
        }
    }

    fn from_attributes(attrs: &[AttributeRecord], interner: &StringInterner) -> Self {
        let mut out = Annotations::none();
        let nullable = full_name(NULLABLE_ATTRIBUTE);
        let tuple_names = full_name(TUPLE_NAMES_ATTRIBUTE);
        for attr in attrs {
            let Some(arg) = attr.positional.first() else {
                continue;
            };
            if attr.is(&nullable) {
                out.nullable = match &arg.value {
                    ConstantValueRecord::Array(items) => NullableBytes::Each {
                        bytes: items.iter().map(|c| byte_of(&c.value)).collect(),
                        next: 0,
                    },
                    value => NullableBytes::Uniform(byte_of(value)),
                };
            } else if attr.is(&tuple_names) {
                if let ConstantValueRecord::Array(items) = &arg.value {
                    out.names = items
                        .iter()
                        .map(|c| match &c.value {
                            ConstantValueRecord::String(s) => Some(interner.intern(s)),
                            _ => None,
                        })
                        .collect();
                }
            }
        }
        out
    }

    fn next_name(&mut self) -> Option<Name> {
        let name = self.names.get(self.next_name).copied().flatten();
        self.next_name += 1;
        name
    }
}

fn byte_of(value: &ConstantValueRecord) -> u8 {
    match value {
        ConstantValueRecord::Int(b) => u8::try_from(*b).unwrap_or(NOT_ANNOTATED),
        _ => NOT_ANNOTATED,
    }
}

/// A skeleton's forwarder, decoded but not yet linked.
struct PendingForwarder {
    name: Name,
    role: ForwarderRole,
    accessibility: Accessibility,
    is_static: bool,
    type_params: Vec<TypeParamDecl>,
    params: Vec<ParamInfo>,
    ret: Idx,
    ret_ref_kind: RefKind,
}

/// One container being imported.
struct ContainerCtx<'r> {
    id: ContainerId,
    declaring: &'r TypeDefRecord,
    record: &'r TypeDefRecord,
    marker_param: &'r ParamRecord,
    block_names: Vec<Name>,
}

struct Importer<'a> {
    pool: &'a mut Pool,
    registry: &'a mut TypeRegistry,
    interner: &'a StringInterner,
    module: Name,
    table: ExtensionTable,
    diagnostics: Vec<(Diagnostic, SourceLoc)>,
}

impl Importer<'_> {
    // === Pass 1: registration ===

    fn register<'m>(
        &mut self,
        record: &'m TypeDefRecord,
        containing: Option<DefId>,
        out: &mut Vec<(DefId, &'m TypeDefRecord, bool)>,
    ) {
        let namespace = self.interner.intern(&record.namespace);
        let name = self.interner.intern(&record.name);
        let arity = record.generic_params.len();
        let existing = self.registry.lookup(namespace, name, arity, containing);
        let fresh = existing.is_none();
        let id = existing.unwrap_or_else(|| {
            let mut def = TypeDef::new(namespace, name, record.kind.into());
            def.accessibility = record.access.into();
            def.type_params = record
                .generic_params
                .iter()
                .map(|g| TypeParamDecl::new(self.interner.intern(&g.name)))
                .collect();
            def.containing = containing;
            def.is_sealed = record.has_flag(type_flags::SEALED);
            def.is_static = def.is_sealed && record.has_flag(type_flags::ABSTRACT);
            def.is_ref_like = record.has_flag(type_flags::BYREF_LIKE);
            if def.is_static {
                def.has_default_ctor = false;
            }
            def.module = self.module;
            self.registry.register(def)
        });
        out.push((id, record, fresh));
        for nested in &record.nested {
            self.register(nested, Some(id), out);
        }
    }

    // === Pass 2: definition details ===

    fn fill(&mut self, def: DefId, record: &TypeDefRecord) {
        let outer = self.names(&record.generic_params);
        let scope = Scope::new(ParamSpace::Plain, &outer, &[]);

        let type_params = self
            .generic_params(&record.generic_params, scope)
            .unwrap_or_else(|err| {
                tracing::debug!(%err, ty = %record.name, "dropping undecodable constraints");
                outer.iter().map(|&n| TypeParamDecl::new(n)).collect()
            });
        let base = record
            .base
            .as_ref()
            .and_then(|b| self.bare(b, scope).ok())
            .filter(|&b| b != Idx::OBJECT);
        let interfaces = record
            .interfaces
            .iter()
            .filter_map(|i| self.bare(i, scope).ok())
            .collect();
        let attributes = self.user_attributes(&record.attributes);
        let members = self.ordinary_members(record, &outer);

        let d = self.registry.get_mut(def);
        d.type_params = type_params;
        d.base = base;
        d.interfaces = interfaces;
        d.attributes = attributes;
        d.members = members;
    }

    fn ordinary_members(&mut self, record: &TypeDefRecord, outer: &[Name]) -> Vec<OrdinaryMember> {
        let accessors = accessor_indices(&record.properties);
        let mut members = Vec::new();
        for (i, method) in record.methods.iter().enumerate() {
            if accessors.contains(&to_u32(i)) || method.name == MARKER_METHOD_NAME {
                continue;
            }
            match self.ordinary_method(method, outer) {
                Ok(member) => members.push(member),
                Err(err) => tracing::debug!(%err, method = %method.name, "skipping member"),
            }
        }
        for property in &record.properties {
            let Some(getter) = property.getter.and_then(|i| record.methods.get(i as usize)) else {
                continue;
            };
            let scope = Scope::new(ParamSpace::Plain, outer, &[]);
            match self.ret(&getter.ret, scope) {
                Ok((ty, _)) => {
                    let mut member = OrdinaryMember::property(self.interner.intern(&property.name), ty);
                    member.is_static = getter.is_static;
                    member.accessibility = getter.access.into();
                    members.push(member);
                }
                Err(err) => tracing::debug!(%err, property = %property.name, "skipping member"),
            }
        }
        members
    }

    fn ordinary_method(&mut self, method: &MethodRecord, outer: &[Name]) -> Result<OrdinaryMember, DecodeError> {
        let own = self.names(&method.generic_params);
        let scope = Scope::new(ParamSpace::Plain, outer, &own);
        Ok(OrdinaryMember {
            name: self.interner.intern(&method.name),
            kind: OrdinaryMemberKind::Method,
            is_static: method.is_static,
            accessibility: method.access.into(),
            type_params: self.generic_params(&method.generic_params, scope)?,
            params: self.params(&method.params, scope)?,
            ret: self.ret(&method.ret, scope)?.0,
            loc: SourceLoc::SYNTHESIZED,
        })
    }

    // === Pass 3: containers ===

    fn containers(&mut self, def: DefId, declaring: &TypeDefRecord) {
        for (index, nested) in declaring.nested.iter().enumerate() {
            let Some(marker) = container_marker(declaring, nested) else {
                tracing::trace!(ty = %nested.name, "nested type is not a container");
                continue;
            };
            if let Err(err) = self.container(def, declaring, nested, marker, index) {
                let message = format!(
                    "cannot decode extension container `{}` of `{}`: {err}",
                    nested.name,
                    self.registry.qualified_name(def, self.interner),
                );
                self.diagnostics.push((
                    Diagnostic::error(ErrorCode::E3301)
                        .with_message(message)
                        .with_note("the members of this container are not available"),
                    SourceLoc::SYNTHESIZED,
                ));
            }
        }
    }

    fn container(
        &mut self,
        def: DefId,
        declaring: &TypeDefRecord,
        record: &TypeDefRecord,
        marker: usize,
        index: usize,
    ) -> Result<(), DecodeError> {
        let block_names = self.names(&record.generic_params);
        let scope = Scope::new(ParamSpace::Container, &block_names, &[]);
        let type_params = self.generic_params(&record.generic_params, scope)?;
        let marker_param = &record.methods[marker].params[0];
        let param = self.param(marker_param, scope)?;
        let receiver = ReceiverDescriptor {
            ty: param.ty,
            ref_kind: param.ref_kind,
            scoped: param.scoped,
            name: (!param.name.is_empty()).then_some(param.name),
            attributes: param.attributes,
            default_value: None,
            span: Span::DUMMY,
        };
        let signature = encode_receiver(self.pool, self.registry, self.interner, &receiver, &type_params);

        let id = self.table.push_container(Container {
            declaring_type: def,
            ordinal: Some(parse_container_ordinal(&record.name).unwrap_or_else(|| to_u32(index))),
            grouping_key: signature.grouping_key,
            marker: MarkerMethod {
                name: self.interner.intern(MARKER_METHOD_NAME),
                receiver,
                signature: signature.marker,
            },
            accessibility: record.access.into(),
            type_params,
            skeletons: Vec::new(),
            origin: Origin::Metadata {
                module: self.module,
            },
            loc: SourceLoc::SYNTHESIZED,
        });

        let ctx = ContainerCtx {
            id,
            declaring,
            record,
            marker_param,
            block_names,
        };
        let accessors = accessor_indices(&record.properties);
        for (i, method) in record.methods.iter().enumerate() {
            if i == marker || accessors.contains(&to_u32(i)) {
                continue;
            }
            self.method_skeleton(&ctx, method);
        }
        for property in &record.properties {
            self.property_skeleton(&ctx, property);
        }
        Ok(())
    }

    fn method_skeleton(&mut self, ctx: &ContainerCtx<'_>, method: &MethodRecord) {
        let member_names = self.names(&method.generic_params);
        let scope = Scope::new(ParamSpace::Container, &ctx.block_names, &member_names);
        let decoded = (|| -> Result<_, DecodeError> {
            let type_params = self.generic_params(&method.generic_params, scope)?;
            let params = self.params(&method.params, scope)?;
            let (ret, ret_ref_kind) = self.ret(&method.ret, scope)?;
            Ok((type_params, params, ret, ret_ref_kind))
        })();

        let mut skeleton = SkeletonMember {
            container: ctx.id,
            name: self.interner.intern(&method.name),
            kind: MemberKind::Method,
            is_static: method.is_static,
            accessibility: method.access.into(),
            type_params: Vec::new(),
            params: Vec::new(),
            ret: Idx::ERROR,
            ret_ref_kind: RefKind::None,
            accessors: Accessors::NONE,
            priority: priority(&method.attributes),
            forwarders: SmallVec::new(),
            unsupported: None,
            loc: SourceLoc::SYNTHESIZED,
        };
        let forwarders = match decoded {
            Ok((type_params, params, ret, ret_ref_kind)) => {
                skeleton.type_params = type_params;
                skeleton.params = params;
                skeleton.ret = ret;
                skeleton.ret_ref_kind = ret_ref_kind;
                self.forwarders(ctx, &[(method, ForwarderRole::Method)])
            }
            Err(err) => {
                tracing::debug!(%err, member = %method.name, "undecodable skeleton");
                Err(UnsupportedReason::UndecodableSignature)
            }
        };
        self.push_skeleton(skeleton, forwarders);
    }

    fn property_skeleton(&mut self, ctx: &ContainerCtx<'_>, property: &PropertyRecord) {
        let method = |i: Option<u32>| i.and_then(|i| ctx.record.methods.get(i as usize));
        let getter = method(property.getter);
        let setter = method(property.setter);
        let Some(first) = getter.or(setter) else {
            tracing::debug!(property = %property.name, "property without accessors");
            return;
        };
        let kind = match (getter, setter) {
            (Some(g), _) if !g.params.is_empty() => MemberKind::Indexer,
            (None, Some(s)) if s.params.len() > 1 => MemberKind::Indexer,
            _ => MemberKind::Property,
        };

        let scope = Scope::new(ParamSpace::Container, &ctx.block_names, &[]);
        let decoded = (|| -> Result<_, DecodeError> {
            match getter {
                Some(g) => {
                    let params = self.params(&g.params, scope)?;
                    let (ret, ret_ref_kind) = self.ret(&g.ret, scope)?;
                    Ok((params, ret, ret_ref_kind))
                }
                None => {
                    let mut params = self.params(&first.params, scope)?;
                    let value = params.pop().map_or(Idx::ERROR, |p| p.ty);
                    Ok((params, value, RefKind::None))
                }
            }
        })();

        let mut skeleton = SkeletonMember {
            container: ctx.id,
            name: self.interner.intern(&property.name),
            kind,
            is_static: first.is_static,
            accessibility: first.access.into(),
            type_params: Vec::new(),
            params: Vec::new(),
            ret: Idx::ERROR,
            ret_ref_kind: RefKind::None,
            accessors: Accessors {
                get: getter.is_some(),
                set: setter.is_some(),
            },
            priority: priority(&property.attributes),
            forwarders: SmallVec::new(),
            unsupported: None,
            loc: SourceLoc::SYNTHESIZED,
        };
        let forwarders = match decoded {
            Ok((params, ret, ret_ref_kind)) => {
                skeleton.params = params;
                skeleton.ret = ret;
                skeleton.ret_ref_kind = ret_ref_kind;
                let mut roles = Vec::with_capacity(2);
                roles.extend(getter.map(|g| (g, ForwarderRole::Getter)));
                roles.extend(setter.map(|s| (s, ForwarderRole::Setter)));
                self.forwarders(ctx, &roles)
            }
            Err(err) => {
                tracing::debug!(%err, member = %property.name, "undecodable skeleton");
                Err(UnsupportedReason::UndecodableSignature)
            }
        };
        self.push_skeleton(skeleton, forwarders);
    }

    /// Validate and decode the forwarders of one skeleton.
    fn forwarders(
        &mut self,
        ctx: &ContainerCtx<'_>,
        methods: &[(&MethodRecord, ForwarderRole)],
    ) -> Result<Vec<PendingForwarder>, UnsupportedReason> {
        let block_arity = to_u32(ctx.block_names.len());
        let mut out = Vec::with_capacity(methods.len());
        for &(method, role) in methods {
            let index = match_forwarder(ctx.declaring, ctx.record, ctx.marker_param, method)?;
            let record = &ctx.declaring.methods[index];
            let own = self.names(&record.generic_params);
            let scope = Scope::new(ParamSpace::Forwarder { block_arity }, &[], &own);
            let decoded = (|| -> Result<_, DecodeError> {
                let type_params = self.generic_params(&record.generic_params, scope)?;
                let params = self.params(&record.params, scope)?;
                let (ret, ret_ref_kind) = self.ret(&record.ret, scope)?;
                Ok(PendingForwarder {
                    name: self.interner.intern(&record.name),
                    role,
                    accessibility: record.access.into(),
                    is_static: record.is_static,
                    type_params,
                    params,
                    ret,
                    ret_ref_kind,
                })
            })();
            out.push(decoded.map_err(|_| UnsupportedReason::UndecodableSignature)?);
        }
        Ok(out)
    }

    fn push_skeleton(
        &mut self,
        mut skeleton: SkeletonMember,
        forwarders: Result<Vec<PendingForwarder>, UnsupportedReason>,
    ) {
        let declaring_type = self.table.container(skeleton.container).declaring_type;
        let has_receiver = !skeleton.is_static;
        let forwarders = match forwarders {
            Ok(forwarders) => forwarders,
            Err(reason) => {
                tracing::debug!(
                    member = %self.interner.lookup(skeleton.name),
                    %reason,
                    "marking imported member unsupported"
                );
                skeleton.unsupported = Some(reason);
                Vec::new()
            }
        };
        let id = self.table.push_skeleton(skeleton);
        for f in forwarders {
            self.table.push_forwarder(ForwarderMember {
                name: f.name,
                declaring_type,
                role: f.role,
                accessibility: f.accessibility,
                is_static: f.is_static,
                type_params: f.type_params,
                params: f.params,
                ret: f.ret,
                ret_ref_kind: f.ret_ref_kind,
                has_receiver,
                skeleton: id,
            });
        }
    }

    // === Signatures ===

    fn names(&self, params: &[GenericParamRecord]) -> Vec<Name> {
        params.iter().map(|g| self.interner.intern(&g.name)).collect()
    }

    fn generic_params(
        &mut self,
        params: &[GenericParamRecord],
        scope: Scope<'_>,
    ) -> Result<Vec<TypeParamDecl>, DecodeError> {
        let unmanaged = full_name(IS_UNMANAGED_ATTRIBUTE);
        let nullable = full_name(NULLABLE_ATTRIBUTE);
        params
            .iter()
            .map(|g| {
                let mut clause = ConstraintClause::default();
                let has = |flag: u16| g.flags & flag != 0;
                let nullable_byte = g
                    .attributes
                    .iter()
                    .find(|a| a.is(&nullable))
                    .and_then(|a| a.positional.first())
                    .map(|c| byte_of(&c.value));

                if g.attributes.iter().any(|a| a.is(&unmanaged)) {
                    clause.flags |= ConstraintFlags::UNMANAGED;
                } else if has(generic_flags::NOT_NULLABLE_VALUE_TYPE) {
                    clause.flags |= ConstraintFlags::STRUCT;
                } else if has(generic_flags::DEFAULT_CONSTRUCTOR) {
                    clause.flags |= ConstraintFlags::NEW;
                }
                if has(generic_flags::REFERENCE_TYPE) {
                    clause.flags |= ConstraintFlags::CLASS;
                    clause.class_nullable = nullable_byte == Some(ANNOTATED);
                } else if nullable_byte == Some(NOT_ANNOTATED) {
                    clause.flags |= ConstraintFlags::NOTNULL;
                }
                if has(generic_flags::ALLOW_BYREF_LIKE) {
                    clause.flags |= ConstraintFlags::ALLOWS_REF_STRUCT;
                }
                for constraint in &g.constraints {
                    clause.types.push(self.ty(&constraint.ty, &constraint.attributes, scope)?);
                }
                Ok(TypeParamDecl {
                    name: self.interner.intern(&g.name),
                    constraints: clause,
                    attributes: self.user_attributes(&g.attributes),
                })
            })
            .collect()
    }

    fn params(&mut self, params: &[ParamRecord], scope: Scope<'_>) -> Result<Vec<ParamInfo>, DecodeError> {
        params.iter().map(|p| self.param(p, scope)).collect()
    }

    fn param(&mut self, record: &ParamRecord, scope: Scope<'_>) -> Result<ParamInfo, DecodeError> {
        let ty = self.ty(&record.ty, &record.attributes, scope)?;
        let has_attr = |name: &str| {
            let name = full_name(name);
            record.attributes.iter().any(|a| a.is(&name))
        };
        let ref_kind = if !record.by_ref {
            RefKind::None
        } else if has_in_modreq(&record.modreqs) {
            RefKind::In
        } else if has_attr(REQUIRES_LOCATION_ATTRIBUTE) {
            RefKind::RefReadOnly
        } else {
            RefKind::Ref
        };
        let scoped = match (has_attr(SCOPED_REF_ATTRIBUTE), record.by_ref) {
            (false, _) => ScopedKind::None,
            (true, true) => ScopedKind::ScopedRef,
            (true, false) => ScopedKind::ScopedValue,
        };
        Ok(ParamInfo {
            name: self.interner.intern(&record.name),
            ty,
            ref_kind,
            scoped,
            attributes: self.user_attributes(&record.attributes),
            has_default: record.has_default,
        })
    }

    fn ret(&mut self, record: &ParamRecord, scope: Scope<'_>) -> Result<(Idx, RefKind), DecodeError> {
        let ty = self.ty(&record.ty, &record.attributes, scope)?;
        let ref_kind = match (record.by_ref, has_in_modreq(&record.modreqs)) {
            (false, _) => RefKind::None,
            (true, true) => RefKind::RefReadOnly,
            (true, false) => RefKind::Ref,
        };
        Ok((ty, ref_kind))
    }

    // === Types ===

    /// Decode a type annotated by `attrs`.
    fn ty(&mut self, record: &TypeRecord, attrs: &[AttributeRecord], scope: Scope<'_>) -> Result<Idx, DecodeError> {
        let mut annotations = Annotations::from_attributes(attrs, self.interner);
        self.decode(record, scope, &mut annotations)
    }

    /// Decode a type that carries no annotations.
    fn bare(&mut self, record: &TypeRecord, scope: Scope<'_>) -> Result<Idx, DecodeError> {
        self.decode(record, scope, &mut Annotations::none())
    }

    fn decode(
        &mut self,
        record: &TypeRecord,
        scope: Scope<'_>,
        ann: &mut Annotations,
    ) -> Result<Idx, DecodeError> {
        let annotated = ann.nullable.next() == ANNOTATED;
        let idx = match record {
            TypeRecord::Primitive(name) => {
                Idx::from_metadata_name(name).ok_or_else(|| DecodeError::UnknownPrimitive(name.clone()))?
            }
            TypeRecord::Named { args, .. } if tuple_chunk(record).is_some() => {
                let count = tuple_len(args);
                let names: Vec<Option<Name>> = (0..count).map(|_| ann.next_name()).collect();
                let mut elems = Vec::with_capacity(count);
                self.tuple_elems(args, scope, ann, &mut elems)?;
                self.pool.tuple(&elems, &names)
            }
            TypeRecord::Named {
                namespace,
                path,
                value_type,
                args,
            } => {
                let def = self.resolve_named(namespace, path, *value_type)?;
                let args = args
                    .iter()
                    .map(|a| self.decode(a, scope, ann))
                    .collect::<Result<Vec<_>, _>>()?;
                self.pool.named(def, &args)
            }
            TypeRecord::TypeParam { method, ordinal } => {
                let names = if *method { scope.method } else { scope.outer };
                let name = names.get(*ordinal as usize).copied().ok_or(if *method {
                    DecodeError::MethodParamOutOfRange(*ordinal)
                } else {
                    DecodeError::TypeParamOutOfRange(*ordinal)
                })?;
                let (owner, ordinal) = scope.space.decode(*method, *ordinal);
                self.pool.type_param(owner, ordinal, name)
            }
            TypeRecord::Array { elem, rank } => {
                let elem = self.decode(elem, scope, ann)?;
                self.pool.array(elem, *rank)
            }
            TypeRecord::Pointer(elem) => {
                let elem = self.decode(elem, scope, ann)?;
                self.pool.pointer(elem)
            }
            TypeRecord::FunctionPointer {
                unmanaged,
                modifiers,
                params,
                ret,
            } => {
                let conventions = modifiers
                    .iter()
                    .rev()
                    .filter_map(|m| match m {
                        TypeRecord::Named { namespace, path, .. }
                            if namespace == COMPILER_SERVICES && path.len() == 1 =>
                        {
                            path[0].0.strip_prefix("CallConv").map(|c| self.interner.intern(c))
                        }
                        _ => None,
                    })
                    .collect();
                let ret = self.fnptr_param(ret, scope, ann)?;
                let params = params
                    .iter()
                    .map(|p| self.fnptr_param(p, scope, ann))
                    .collect::<Result<Vec<_>, _>>()?;
                self.pool.function_pointer(FnPtrSig {
                    unmanaged: *unmanaged,
                    conventions,
                    params,
                    ret,
                })
            }
        };
        Ok(if annotated {
            self.pool.nullable_ref(idx)
        } else {
            idx
        })
    }

    /// Flatten a `ValueTuple` chain; every nested rest node consumes its
    /// own nullable byte.
    fn tuple_elems(
        &mut self,
        args: &[TypeRecord],
        scope: Scope<'_>,
        ann: &mut Annotations,
        out: &mut Vec<Idx>,
    ) -> Result<(), DecodeError> {
        for (i, arg) in args.iter().enumerate() {
            match tuple_chunk(arg) {
                Some(rest) if i == 7 => {
                    ann.nullable.next();
                    self.tuple_elems(rest, scope, ann, out)?;
                }
                _ => out.push(self.decode(arg, scope, ann)?),
            }
        }
        Ok(())
    }

    fn fnptr_param(
        &mut self,
        record: &FnPtrParamRecord,
        scope: Scope<'_>,
        ann: &mut Annotations,
    ) -> Result<FnPtrParam, DecodeError> {
        let requires_location = full_name(REQUIRES_LOCATION_ATTRIBUTE);
        let ref_kind = if !record.by_ref {
            RefKind::None
        } else if has_in_modreq(&record.modreqs) {
            RefKind::In
        } else if record
            .modreqs
            .iter()
            .any(|m| m.full_name().as_deref() == Some(requires_location.as_str()))
        {
            RefKind::RefReadOnly
        } else {
            RefKind::Ref
        };
        Ok(FnPtrParam {
            ty: self.decode(&record.ty, scope, ann)?,
            ref_kind,
        })
    }

    /// Find a named type by its path, registering placeholders for types
    /// this compilation has never seen.
    fn resolve_named(
        &mut self,
        namespace: &str,
        path: &[(String, u32)],
        value_type: bool,
    ) -> Result<DefId, DecodeError> {
        let namespace = self.interner.intern(namespace);
        let mut containing = None;
        for (depth, (name, arity)) in path.iter().enumerate() {
            let name = self.interner.intern(name);
            let arity = *arity as usize;
            let found = if depth == 0 {
                self.registry.lookup(namespace, name, arity, None)
            } else {
                self.registry
                    .lookup(Name::EMPTY, name, arity, containing)
                    .or_else(|| self.registry.lookup(namespace, name, arity, containing))
            };
            let id = found.unwrap_or_else(|| {
                let kind = if value_type && depth + 1 == path.len() {
                    TypeKind::Struct
                } else {
                    TypeKind::Class
                };
                let ns = if depth == 0 { namespace } else { Name::EMPTY };
                let params = (0..arity)
                    .map(|i| TypeParamDecl::new(self.interner.intern(&format!("T{i}"))))
                    .collect();
                let mut def = TypeDef::new(ns, name, kind).with_type_params(params);
                def.containing = containing;
                tracing::trace!(ty = %self.interner.lookup(name), "registering placeholder type");
                self.registry.register(def)
            });
            containing = Some(id);
        }
        containing.ok_or(DecodeError::EmptyPath)
    }

    // === Attributes ===

    fn user_attributes(&mut self, attrs: &[AttributeRecord]) -> Vec<AttributeData> {
        attrs
            .iter()
            .filter(|a| !is_synthesized_attribute(a))
            .filter_map(|a| match self.attribute(a) {
                Ok(attr) => Some(attr),
                Err(err) => {
                    tracing::debug!(%err, "dropping undecodable attribute");
                    None
                }
            })
            .collect()
    }

    fn attribute(&mut self, record: &AttributeRecord) -> Result<AttributeData, DecodeError> {
        let class = self.bare(&record.class, Scope::EMPTY)?;
        let positional = record
            .positional
            .iter()
            .map(|c| self.constant(c))
            .collect::<Result<_, _>>()?;
        let named = record
            .named
            .iter()
            .map(|arg| {
                Ok(NamedArg {
                    name: self.interner.intern(&arg.name),
                    kind: if arg.is_property {
                        NamedArgKind::Property
                    } else {
                        NamedArgKind::Field
                    },
                    value: self.constant(&arg.value)?,
                })
            })
            .collect::<Result<_, DecodeError>>()?;
        Ok(AttributeData {
            class,
            positional,
            named,
        })
    }

    fn constant(&mut self, record: &ConstantRecord) -> Result<TypedConstant, DecodeError> {
        let value = match &record.value {
            ConstantValueRecord::Bool(b) => ConstantValue::Bool(*b),
            ConstantValueRecord::Char(c) => char::from_u32(*c).map_or(ConstantValue::Error, ConstantValue::Char),
            ConstantValueRecord::Int(i) => ConstantValue::Int(*i),
            ConstantValueRecord::UInt(u) => ConstantValue::UInt(*u),
            ConstantValueRecord::Single(bits) => ConstantValue::Single(*bits),
            ConstantValueRecord::Double(bits) => ConstantValue::Double(*bits),
            ConstantValueRecord::String(s) => ConstantValue::String(s.as_str().into()),
            ConstantValueRecord::Null => ConstantValue::Null,
            ConstantValueRecord::Type(ty) => ConstantValue::Type(self.bare(ty, Scope::EMPTY)?),
            ConstantValueRecord::Array(items) => ConstantValue::Array(
                items
                    .iter()
                    .map(|c| self.constant(c))
                    .collect::<Result<_, _>>()?,
            ),
            ConstantValueRecord::Error => ConstantValue::Error,
        };
        Ok(TypedConstant {
            ty: self.bare(&record.ty, Scope::EMPTY)?,
            value,
        })
    }
}

/// Type arguments of a `System.ValueTuple` construction.
fn tuple_chunk(record: &TypeRecord) -> Option<&[TypeRecord]> {
    match record {
        TypeRecord::Named {
            namespace,
            path,
            value_type: true,
            args,
        } if namespace == "System"
            && path.len() == 1
            && path[0].0 == "ValueTuple"
            && (1..=8).contains(&args.len())
            && path[0].1 as usize == args.len() =>
        {
            Some(args)
        }
        _ => None,
    }
}

fn tuple_len(args: &[TypeRecord]) -> usize {
    match args.get(7).and_then(tuple_chunk) {
        Some(rest) => 7 + tuple_len(rest),
        None => args.len(),
    }
}

fn has_in_modreq(modreqs: &[TypeRecord]) -> bool {
    let in_attribute = format!("{INTEROP_SERVICES}.{IN_ATTRIBUTE}");
    modreqs
        .iter()
        .any(|m| m.full_name().as_deref() == Some(in_attribute.as_str()))
}

fn accessor_indices(properties: &[PropertyRecord]) -> FxHashSet<u32> {
    properties
        .iter()
        .flat_map(|p| p.getter.into_iter().chain(p.setter))
        .collect()
}

fn priority(attrs: &[AttributeRecord]) -> Option<i32> {
    let name = full_name(PRIORITY_ATTRIBUTE);
    attrs
        .iter()
        .find(|a| a.is(&name))
        .and_then(|a| a.positional.first())
        .and_then(|c| match c.value {
            ConstantValueRecord::Int(v) => i32::try_from(v).ok(),
            _ => None,
        })
}
