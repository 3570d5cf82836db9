use super::*;
use crate::{RefKind, TypeDef, TypeKind, TypeParamDecl, TypeRegistry};
use cinder_ir::StringInterner;
use pretty_assertions::assert_eq;

#[test]
fn predefined_types_are_at_fixed_indices() {
    let pool = Pool::new();
    assert_eq!(pool.get(Idx::INT), &TypeData::Predefined(Idx::INT));
    assert_eq!(pool.get(Idx::ERROR), &TypeData::Error);
    assert_eq!(pool.len(), Idx::PRIMITIVE_COUNT as usize);
}

#[test]
fn interning_deduplicates() {
    let mut pool = Pool::new();
    let a = pool.array(Idx::INT, 2);
    let b = pool.array(Idx::INT, 2);
    let c = pool.array(Idx::INT, 1);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn nullable_ref_is_idempotent() {
    let mut pool = Pool::new();
    let once = pool.nullable_ref(Idx::STRING);
    let twice = pool.nullable_ref(once);
    assert_eq!(once, twice);
    assert_eq!(pool.strip_nullable_ref(once), Idx::STRING);
}

#[test]
fn identical_erased_ignores_names_and_annotations() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let a = interner.intern("a");
    let named = pool.tuple(&[Idx::INT, Idx::STRING], &[Some(a), None]);
    let nullable_string = pool.nullable_ref(Idx::STRING);
    let unnamed = pool.tuple(&[Idx::INT, nullable_string], &[]);
    assert_ne!(named, unnamed);
    assert!(pool.identical_erased(named, unnamed));

    let t = interner.intern("T");
    let u = interner.intern("U");
    let t0 = pool.type_param(TypeParamOwner::Block, 0, t);
    let u0 = pool.type_param(TypeParamOwner::Block, 0, u);
    assert!(pool.identical_erased(t0, u0));
}

#[test]
fn display_source_forms() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let mut registry = TypeRegistry::new(&interner);
    let t = interner.intern("T");
    let list_def = registry.register(
        TypeDef::new(
            interner.intern("System.Collections.Generic"),
            interner.intern("List"),
            TypeKind::Class,
        )
        .with_type_params(vec![TypeParamDecl::new(t)]),
    );
    let nullable_string = pool.nullable_ref(Idx::STRING);
    let list = pool.named(list_def, &[nullable_string]);
    assert_eq!(
        pool.display(list, &registry, &interner),
        "System.Collections.Generic.List<string?>"
    );

    // Single-dimensional array of two-dimensional arrays.
    let inner = pool.array(Idx::INT, 2);
    let jagged = pool.array(inner, 1);
    assert_eq!(pool.display(jagged, &registry, &interner), "int[][,]");

    let nullable_int = pool.named(registry.well_known().nullable, &[Idx::INT]);
    assert_eq!(pool.display(nullable_int, &registry, &interner), "int?");

    let name_a = interner.intern("a");
    let tuple = pool.tuple(&[Idx::INT, Idx::STRING], &[Some(name_a)]);
    assert_eq!(pool.display(tuple, &registry, &interner), "(int a, string)");
}

#[test]
fn display_function_pointer() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let registry = TypeRegistry::new(&interner);
    let sig = FnPtrSig {
        unmanaged: true,
        conventions: SmallVec::from_slice(&[
            interner.intern("Cdecl"),
            interner.intern("SuppressGCTransition"),
        ]),
        params: vec![FnPtrParam {
            ty: Idx::INT,
            ref_kind: RefKind::Ref,
        }],
        ret: FnPtrParam {
            ty: Idx::VOID,
            ref_kind: RefKind::None,
        },
    };
    let fnptr = pool.function_pointer(sig);
    assert_eq!(
        pool.display(fnptr, &registry, &interner),
        "delegate* unmanaged[Cdecl, SuppressGCTransition]<ref int, void>"
    );
}

#[test]
fn mentions_type_param_looks_through_structure() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let t = pool.type_param(TypeParamOwner::Block, 1, interner.intern("T"));
    let ptr = pool.pointer(t);
    let arr = pool.array(ptr, 1);
    assert!(pool.mentions_type_param(arr, &|p| p.ordinal == 1));
    assert!(!pool.mentions_type_param(arr, &|p| p.ordinal == 0));
    assert!(!pool.contains_error(arr));
}
