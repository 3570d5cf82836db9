//! Lowering extension symbols into metadata records.

use cinder_ir::{Name, StringInterner};
use cinder_types::{
    AttributeData, ConstantValue, ConstraintFlags, DefId, Idx, NamedArgKind, ParamInfo, Pool,
    RefKind, ScopedKind, TypeData, TypeParamDecl, TypeRegistry, TypedConstant,
};

use super::records::{
    generic_flags, type_flags, AccessRecord, AttributeRecord, ConstantRecord, ConstantValueRecord,
    ConstraintRecord, FnPtrParamRecord, GenericParamRecord, KindRecord, MetadataModule,
    MethodRecord, NamedArgRecord, ParamRecord, PropertyRecord, TypeDefRecord, TypeRecord,
};
use super::{
    compiler_services, in_modifier, ParamSpace, ANNOTATED, EXTENSION_ATTRIBUTE,
    IS_UNMANAGED_ATTRIBUTE, NOT_ANNOTATED, NULLABLE_ATTRIBUTE, PRIORITY_ATTRIBUTE,
    REQUIRES_LOCATION_ATTRIBUTE, SCOPED_REF_ATTRIBUTE, TUPLE_NAMES_ATTRIBUTE,
};
use crate::decl::MemberKind;
use crate::emit::MARKER_METHOD_NAME;
use crate::symbols::{Container, ContainerId, ExtensionTable, ForwarderMember, Origin, SkeletonMember};

/// Tuple elements stored directly in one `ValueTuple` before nesting.
const TUPLE_CHUNK: usize = 7;

/// Lower every source container of `table` into a module named `name`.
#[tracing::instrument(level = "debug", skip_all, fields(module = name))]
pub fn write_module(
    name: &str,
    table: &ExtensionTable,
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
) -> MetadataModule {
    let writer = Writer {
        pool,
        registry,
        interner,
        table,
    };

    let mut declaring: Vec<DefId> = Vec::new();
    for (_, container) in table.containers() {
        if is_written(container) && !declaring.contains(&container.declaring_type) {
            declaring.push(container.declaring_type);
        }
    }

    let mut module = MetadataModule::new(name);
    for def in declaring {
        module.types.push(writer.declaring_type(def));
    }
    tracing::debug!(types = module.types.len(), "wrote metadata module");
    module
}

fn is_written(container: &Container) -> bool {
    container.origin == Origin::Source && !container.is_error()
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "arities and ranks are far below u32::MAX"
)]
fn to_u32(n: usize) -> u32 {
    n as u32
}

struct Writer<'a> {
    pool: &'a Pool,
    registry: &'a TypeRegistry,
    interner: &'a StringInterner,
    table: &'a ExtensionTable,
}

impl Writer<'_> {
    // === Types ===

    fn declaring_type(&self, def: DefId) -> TypeDefRecord {
        let mut record = self.type_header(def);
        record
            .attributes
            .insert(0, AttributeRecord::new(compiler_services(EXTENSION_ATTRIBUTE)));

        let containers: Vec<ContainerId> = self
            .table
            .containers_of(def)
            .filter(|&id| is_written(self.table.container(id)))
            .collect();
        for &id in &containers {
            record.nested.push(self.container(self.table.container(id)));
        }

        for (_, forwarder) in self.table.forwarders() {
            if forwarder.declaring_type != def {
                continue;
            }
            let skeleton = self.table.skeleton(forwarder.skeleton);
            if !containers.contains(&skeleton.container) {
                continue;
            }
            let arity = self.table.container(skeleton.container).arity();
            record.methods.push(self.forwarder(forwarder, skeleton, to_u32(arity)));
        }
        record
    }

    fn type_header(&self, def: DefId) -> TypeDefRecord {
        let d = self.registry.get(def);
        let mut flags = 0;
        if d.is_static {
            flags |= type_flags::ABSTRACT | type_flags::SEALED;
        } else if d.is_sealed {
            flags |= type_flags::SEALED;
        }
        if d.is_ref_like {
            flags |= type_flags::BYREF_LIKE;
        }
        let namespace = if d.containing.is_none() {
            self.interner.lookup(d.namespace).to_owned()
        } else {
            String::new()
        };
        TypeDefRecord {
            namespace,
            name: self.interner.lookup(d.name).to_owned(),
            kind: KindRecord::from(d.kind),
            access: AccessRecord::from(d.accessibility),
            flags,
            generic_params: self.generic_params(&d.type_params, ParamSpace::Plain),
            base: d.base.map(|b| self.bare(b, ParamSpace::Plain)),
            interfaces: d
                .interfaces
                .iter()
                .map(|&i| self.bare(i, ParamSpace::Plain))
                .collect(),
            attributes: d.attributes.iter().map(|a| self.attribute(a)).collect(),
            methods: Vec::new(),
            properties: Vec::new(),
            nested: Vec::new(),
        }
    }

    fn container(&self, container: &Container) -> TypeDefRecord {
        let receiver = &container.marker.receiver;
        let marker = MethodRecord {
            name: MARKER_METHOD_NAME.to_owned(),
            access: AccessRecord::Private,
            is_static: true,
            generic_params: Vec::new(),
            params: vec![self.param(
                receiver.name.unwrap_or(Name::EMPTY),
                receiver.ty,
                receiver.ref_kind,
                receiver.scoped,
                &receiver.attributes,
                false,
                ParamSpace::Container,
            )],
            ret: self.ret(Idx::VOID, RefKind::None, ParamSpace::Container),
            attributes: Vec::new(),
        };

        let mut record = TypeDefRecord {
            namespace: String::new(),
            name: container.type_name(),
            kind: KindRecord::Class,
            access: AccessRecord::from(container.accessibility),
            flags: type_flags::SEALED,
            generic_params: self.generic_params(&container.type_params, ParamSpace::Container),
            base: None,
            interfaces: Vec::new(),
            attributes: Vec::new(),
            methods: vec![marker],
            properties: Vec::new(),
            nested: Vec::new(),
        };

        for &id in &container.skeletons {
            self.skeleton(self.table.skeleton(id), &mut record);
        }
        record
    }

    fn skeleton(&self, skeleton: &SkeletonMember, record: &mut TypeDefRecord) {
        let space = ParamSpace::Container;
        let generic_params = self.generic_params(&skeleton.type_params, space);
        let params: Vec<ParamRecord> = skeleton
            .params
            .iter()
            .map(|p| self.param_info(p, space))
            .collect();
        let name = self.interner.lookup(skeleton.name);
        let priority = priority_attribute(skeleton);

        if skeleton.kind == MemberKind::Method {
            record.methods.push(MethodRecord {
                name: name.to_owned(),
                access: AccessRecord::from(skeleton.accessibility),
                is_static: skeleton.is_static,
                generic_params,
                params,
                ret: self.ret(skeleton.ret, skeleton.ret_ref_kind, space),
                attributes: priority.into_iter().collect(),
            });
            return;
        }

        let accessor = |prefix: &str, params: Vec<ParamRecord>, ret: ParamRecord| MethodRecord {
            name: format!("{prefix}{name}"),
            access: AccessRecord::from(skeleton.accessibility),
            is_static: skeleton.is_static,
            generic_params: Vec::new(),
            params,
            ret,
            attributes: Vec::new(),
        };
        let mut property = PropertyRecord {
            name: name.to_owned(),
            getter: None,
            setter: None,
            attributes: priority.into_iter().collect(),
        };
        if skeleton.accessors.get {
            property.getter = Some(to_u32(record.methods.len()));
            let ret = self.ret(skeleton.ret, skeleton.ret_ref_kind, space);
            record.methods.push(accessor("get_", params.clone(), ret));
        }
        if skeleton.accessors.set {
            property.setter = Some(to_u32(record.methods.len()));
            let mut setter_params = params;
            setter_params.push(self.param(
                self.interner.intern("value"),
                skeleton.ret,
                RefKind::None,
                ScopedKind::None,
                &[],
                false,
                space,
            ));
            let ret = self.ret(Idx::VOID, RefKind::None, space);
            record.methods.push(accessor("set_", setter_params, ret));
        }
        record.properties.push(property);
    }

    fn forwarder(
        &self,
        forwarder: &ForwarderMember,
        skeleton: &SkeletonMember,
        block_arity: u32,
    ) -> MethodRecord {
        let space = ParamSpace::Forwarder { block_arity };
        MethodRecord {
            name: self.interner.lookup(forwarder.name).to_owned(),
            access: AccessRecord::from(forwarder.accessibility),
            is_static: forwarder.is_static,
            generic_params: self.generic_params(&forwarder.type_params, space),
            params: forwarder
                .params
                .iter()
                .map(|p| self.param_info(p, space))
                .collect(),
            ret: self.ret(forwarder.ret, forwarder.ret_ref_kind, space),
            attributes: priority_attribute(skeleton).into_iter().collect(),
        }
    }

    // === Signatures ===

    fn generic_params(&self, params: &[TypeParamDecl], space: ParamSpace) -> Vec<GenericParamRecord> {
        params
            .iter()
            .map(|param| {
                let clause = &param.constraints;
                let mut flags = 0;
                let mut attributes: Vec<AttributeRecord> =
                    param.attributes.iter().map(|a| self.attribute(a)).collect();
                if clause.flags.contains(ConstraintFlags::CLASS) {
                    flags |= generic_flags::REFERENCE_TYPE;
                    if clause.class_nullable {
                        attributes.push(nullable_byte_attribute(ANNOTATED));
                    }
                } else if clause.flags.contains(ConstraintFlags::NOTNULL) {
                    attributes.push(nullable_byte_attribute(NOT_ANNOTATED));
                }
                if clause
                    .flags
                    .intersects(ConstraintFlags::STRUCT | ConstraintFlags::UNMANAGED)
                {
                    flags |= generic_flags::NOT_NULLABLE_VALUE_TYPE | generic_flags::DEFAULT_CONSTRUCTOR;
                }
                if clause.flags.contains(ConstraintFlags::UNMANAGED) {
                    attributes.push(AttributeRecord::new(compiler_services(IS_UNMANAGED_ATTRIBUTE)));
                }
                if clause.flags.contains(ConstraintFlags::NEW) {
                    flags |= generic_flags::DEFAULT_CONSTRUCTOR;
                }
                if clause.flags.contains(ConstraintFlags::ALLOWS_REF_STRUCT) {
                    flags |= generic_flags::ALLOW_BYREF_LIKE;
                }
                let constraints = clause
                    .types
                    .iter()
                    .map(|&ty| {
                        let mut lowering = self.lowering(space);
                        let ty = lowering.lower(ty);
                        ConstraintRecord {
                            ty,
                            attributes: lowering.into_attributes(),
                        }
                    })
                    .collect();
                GenericParamRecord {
                    name: self.interner.lookup(param.name).to_owned(),
                    flags,
                    constraints,
                    attributes,
                }
            })
            .collect()
    }

    fn param_info(&self, param: &ParamInfo, space: ParamSpace) -> ParamRecord {
        self.param(
            param.name,
            param.ty,
            param.ref_kind,
            param.scoped,
            &param.attributes,
            param.has_default,
            space,
        )
    }

    #[expect(clippy::too_many_arguments, reason = "mirrors the fields of a parameter")]
    fn param(
        &self,
        name: Name,
        ty: Idx,
        ref_kind: RefKind,
        scoped: ScopedKind,
        attrs: &[AttributeData],
        has_default: bool,
        space: ParamSpace,
    ) -> ParamRecord {
        let mut lowering = self.lowering(space);
        let ty = lowering.lower(ty);
        let mut attributes: Vec<AttributeRecord> = attrs.iter().map(|a| self.attribute(a)).collect();
        let mut modreqs = Vec::new();
        match ref_kind {
            RefKind::In => modreqs.push(in_modifier()),
            RefKind::RefReadOnly => {
                attributes.push(AttributeRecord::new(compiler_services(REQUIRES_LOCATION_ATTRIBUTE)));
            }
            RefKind::None | RefKind::Ref => {}
        }
        if scoped != ScopedKind::None {
            attributes.push(AttributeRecord::new(compiler_services(SCOPED_REF_ATTRIBUTE)));
        }
        attributes.extend(lowering.into_attributes());
        ParamRecord {
            name: self.interner.lookup(name).to_owned(),
            ty,
            by_ref: ref_kind.is_by_ref(),
            modreqs,
            attributes,
            has_default,
        }
    }

    fn ret(&self, ty: Idx, ref_kind: RefKind, space: ParamSpace) -> ParamRecord {
        let mut lowering = self.lowering(space);
        let ty = lowering.lower(ty);
        let modreqs = if ref_kind.is_readonly_ref() {
            vec![in_modifier()]
        } else {
            Vec::new()
        };
        ParamRecord {
            name: String::new(),
            ty,
            by_ref: ref_kind.is_by_ref(),
            modreqs,
            attributes: lowering.into_attributes(),
            has_default: false,
        }
    }

    // === Attributes ===

    fn attribute(&self, attr: &AttributeData) -> AttributeRecord {
        AttributeRecord {
            class: self.bare(attr.class, ParamSpace::Plain),
            positional: attr.positional.iter().map(|c| self.constant(c)).collect(),
            named: attr
                .named
                .iter()
                .map(|arg| NamedArgRecord {
                    name: self.interner.lookup(arg.name).to_owned(),
                    is_property: arg.kind == NamedArgKind::Property,
                    value: self.constant(&arg.value),
                })
                .collect(),
        }
    }

    fn constant(&self, constant: &TypedConstant) -> ConstantRecord {
        let value = match &constant.value {
            ConstantValue::Bool(b) => ConstantValueRecord::Bool(*b),
            ConstantValue::Char(c) => ConstantValueRecord::Char(u32::from(*c)),
            ConstantValue::Int(i) => ConstantValueRecord::Int(*i),
            ConstantValue::UInt(u) => ConstantValueRecord::UInt(*u),
            ConstantValue::Single(bits) => ConstantValueRecord::Single(*bits),
            ConstantValue::Double(bits) => ConstantValueRecord::Double(*bits),
            ConstantValue::String(s) => ConstantValueRecord::String(s.to_string()),
            ConstantValue::Null => ConstantValueRecord::Null,
            ConstantValue::Type(ty) => ConstantValueRecord::Type(self.bare(*ty, ParamSpace::Plain)),
            ConstantValue::Array(items) => {
                ConstantValueRecord::Array(items.iter().map(|c| self.constant(c)).collect())
            }
            ConstantValue::Error => ConstantValueRecord::Error,
        };
        ConstantRecord {
            ty: self.bare(constant.ty, ParamSpace::Plain),
            value,
        }
    }

    fn lowering(&self, space: ParamSpace) -> TypeLowering<'_> {
        TypeLowering {
            pool: self.pool,
            registry: self.registry,
            interner: self.interner,
            space,
            nullable: Vec::new(),
            tuple_names: Vec::new(),
        }
    }

    /// A type record without its annotation attributes.
    fn bare(&self, ty: Idx, space: ParamSpace) -> TypeRecord {
        self.lowering(space).lower(ty)
    }
}

fn priority_attribute(skeleton: &SkeletonMember) -> Option<AttributeRecord> {
    skeleton.priority.map(|p| {
        AttributeRecord::new(compiler_services(PRIORITY_ATTRIBUTE)).with_positional(ConstantRecord {
            ty: TypeRecord::Primitive("System.Int32".to_owned()),
            value: ConstantValueRecord::Int(i64::from(p)),
        })
    })
}

fn byte_constant(b: u8) -> ConstantRecord {
    ConstantRecord {
        ty: TypeRecord::Primitive("System.Byte".to_owned()),
        value: ConstantValueRecord::Int(i64::from(b)),
    }
}

fn nullable_byte_attribute(b: u8) -> AttributeRecord {
    AttributeRecord::new(compiler_services(NULLABLE_ATTRIBUTE)).with_positional(byte_constant(b))
}

/// Preorder nullable bytes, compressed to one byte when uniform. `None`
/// when nothing is annotated.
fn nullable_bytes_attribute(bytes: &[u8]) -> Option<AttributeRecord> {
    let first = *bytes.first()?;
    if bytes.iter().all(|&b| b == NOT_ANNOTATED) {
        return None;
    }
    if bytes.iter().all(|&b| b == first) {
        return Some(nullable_byte_attribute(first));
    }
    let array = ConstantRecord {
        ty: TypeRecord::Array {
            elem: Box::new(TypeRecord::Primitive("System.Byte".to_owned())),
            rank: 1,
        },
        value: ConstantValueRecord::Array(bytes.iter().map(|&b| byte_constant(b)).collect()),
    };
    Some(AttributeRecord::new(compiler_services(NULLABLE_ATTRIBUTE)).with_positional(array))
}

/// Lowers one type tree, collecting its nullable bytes and tuple element
/// names in preorder.
struct TypeLowering<'a> {
    pool: &'a Pool,
    registry: &'a TypeRegistry,
    interner: &'a StringInterner,
    space: ParamSpace,
    nullable: Vec<u8>,
    tuple_names: Vec<Option<String>>,
}

impl TypeLowering<'_> {
    fn lower(&mut self, idx: Idx) -> TypeRecord {
        let pool = self.pool;
        let (annotated, idx) = match pool.get(idx) {
            TypeData::NullableRef(inner) => (true, *inner),
            _ => (false, idx),
        };
        self.nullable
            .push(if annotated { ANNOTATED } else { NOT_ANNOTATED });

        match pool.get(idx) {
            TypeData::Predefined(p) => {
                TypeRecord::Primitive(p.metadata_name().unwrap_or("System.Object").to_owned())
            }
            TypeData::Error => TypeRecord::Primitive("<error>".to_owned()),
            TypeData::Named { def, args } => {
                let (namespace, path) = self.path(*def);
                let value_type = self.registry.get(*def).kind.is_value_type();
                let args = args.iter().map(|&a| self.lower(a)).collect();
                TypeRecord::Named {
                    namespace,
                    path,
                    value_type,
                    args,
                }
            }
            TypeData::TypeParam(p) => {
                let (method, ordinal) = self.space.encode(p.owner, p.ordinal);
                TypeRecord::TypeParam { method, ordinal }
            }
            TypeData::Array { elem, rank } => TypeRecord::Array {
                elem: Box::new(self.lower(*elem)),
                rank: *rank,
            },
            TypeData::Pointer(elem) => TypeRecord::Pointer(Box::new(self.lower(*elem))),
            TypeData::FunctionPointer(sig) => {
                let modifiers = sig
                    .conventions
                    .iter()
                    .rev()
                    .map(|&c| compiler_services(&format!("CallConv{}", self.interner.lookup(c))))
                    .collect();
                let ret = self.fnptr_param(sig.ret.ty, sig.ret.ref_kind);
                let params = sig
                    .params
                    .iter()
                    .map(|p| self.fnptr_param(p.ty, p.ref_kind))
                    .collect();
                TypeRecord::FunctionPointer {
                    unmanaged: sig.unmanaged,
                    modifiers,
                    params,
                    ret: Box::new(ret),
                }
            }
            TypeData::Tuple { elems, names } => {
                self.tuple_names.extend(
                    (0..elems.len())
                        .map(|i| names.get(i).copied().flatten())
                        .map(|n| n.map(|n| self.interner.lookup(n).to_owned())),
                );
                self.tuple_chain(elems)
            }
            TypeData::NullableRef(inner) => self.lower(*inner),
        }
    }

    fn tuple_chain(&mut self, elems: &[Idx]) -> TypeRecord {
        let (head, rest) = if elems.len() > TUPLE_CHUNK {
            elems.split_at(TUPLE_CHUNK)
        } else {
            (elems, &[][..])
        };
        let mut args: Vec<TypeRecord> = head.iter().map(|&e| self.lower(e)).collect();
        if !rest.is_empty() {
            self.nullable.push(NOT_ANNOTATED);
            args.push(self.tuple_chain(rest));
        }
        TypeRecord::Named {
            namespace: "System".to_owned(),
            path: vec![("ValueTuple".to_owned(), to_u32(args.len()))],
            value_type: true,
            args,
        }
    }

    fn fnptr_param(&mut self, ty: Idx, ref_kind: RefKind) -> FnPtrParamRecord {
        let modreqs = match ref_kind {
            RefKind::In => vec![in_modifier()],
            RefKind::RefReadOnly => vec![compiler_services(REQUIRES_LOCATION_ATTRIBUTE)],
            RefKind::None | RefKind::Ref => Vec::new(),
        };
        FnPtrParamRecord {
            ty: self.lower(ty),
            by_ref: ref_kind.is_by_ref(),
            modreqs,
        }
    }

    /// Namespace of the outermost type and the `(name, arity)` chain.
    fn path(&self, def: DefId) -> (String, Vec<(String, u32)>) {
        let mut path = Vec::new();
        let mut namespace = String::new();
        let mut current = Some(def);
        while let Some(id) = current {
            let d = self.registry.get(id);
            path.push((self.interner.lookup(d.name).to_owned(), to_u32(d.arity())));
            if d.containing.is_none() {
                namespace = self.interner.lookup(d.namespace).to_owned();
            }
            current = d.containing;
        }
        path.reverse();
        (namespace, path)
    }

    fn into_attributes(self) -> Vec<AttributeRecord> {
        let mut out: Vec<AttributeRecord> = nullable_bytes_attribute(&self.nullable).into_iter().collect();
        if self.tuple_names.iter().any(Option::is_some) {
            let names = self
                .tuple_names
                .into_iter()
                .map(|name| ConstantRecord {
                    ty: TypeRecord::Primitive("System.String".to_owned()),
                    value: name.map_or(ConstantValueRecord::Null, ConstantValueRecord::String),
                })
                .collect();
            out.push(
                AttributeRecord::new(compiler_services(TUPLE_NAMES_ATTRIBUTE)).with_positional(
                    ConstantRecord {
                        ty: TypeRecord::Array {
                            elem: Box::new(TypeRecord::Primitive("System.String".to_owned())),
                            rank: 1,
                        },
                        value: ConstantValueRecord::Array(names),
                    },
                ),
            );
        }
        out
    }
}
