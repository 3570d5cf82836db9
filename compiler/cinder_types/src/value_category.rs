//! Value category of a type: value, reference, or unknown until runtime.
//!
//! Receivers are captured differently per category, and the category of a
//! type parameter is only known when its constraints pin it down.

use crate::{ConstraintClause, ConstraintFlags, Idx, Pool, TypeData, TypeParamDecl, TypeParamOwner, TypeParamRef, TypeRegistry};

/// Type parameters in scope at some program point.
///
/// Lookups use owner and ordinal, so a reference whose owner has no
/// declarations in scope yields `None`.
#[derive(Copy, Clone, Debug, Default)]
pub struct GenericEnv<'a> {
    /// Parameters of the enclosing generic type.
    pub type_params: &'a [TypeParamDecl],
    /// Parameters of the enclosing extension block.
    pub block: &'a [TypeParamDecl],
    /// Parameters of the enclosing method.
    pub method: &'a [TypeParamDecl],
}

impl<'a> GenericEnv<'a> {
    /// Scope containing only extension block parameters.
    pub fn block(block: &'a [TypeParamDecl]) -> Self {
        GenericEnv {
            block,
            ..GenericEnv::default()
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: &'a [TypeParamDecl]) -> Self {
        self.method = method;
        self
    }

    pub fn decl(&self, param: TypeParamRef) -> Option<&'a TypeParamDecl> {
        let list = match param.owner {
            TypeParamOwner::Type => self.type_params,
            TypeParamOwner::Block => self.block,
            TypeParamOwner::Method => self.method,
        };
        list.get(param.ordinal as usize)
    }

    pub fn constraints(&self, param: TypeParamRef) -> Option<&'a ConstraintClause> {
        self.decl(param).map(|d| &d.constraints)
    }
}

/// Runtime category of values of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueCategory {
    /// Structs, enums, predefined value types, pointers, tuples.
    Value,
    /// Classes, interfaces, delegates, arrays, `object`, `string`.
    Reference,
    /// A type parameter not constrained to either category.
    Unknown,
}

impl ValueCategory {
    #[inline]
    pub const fn is_value(self) -> bool {
        matches!(self, Self::Value)
    }

    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Reference)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Reference => "reference",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify the value category of `ty`.
pub fn value_category(
    pool: &Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    ty: Idx,
) -> ValueCategory {
    match pool.get(ty) {
        TypeData::Predefined(p) => {
            if p.is_primitive_value_type() || *p == Idx::VOID {
                ValueCategory::Value
            } else {
                ValueCategory::Reference
            }
        }
        TypeData::Error => ValueCategory::Unknown,
        TypeData::Named { def, .. } => {
            if registry.get(*def).kind.is_value_type() {
                ValueCategory::Value
            } else {
                ValueCategory::Reference
            }
        }
        TypeData::TypeParam(p) => type_param_category(pool, registry, env, *p),
        TypeData::Array { .. } => ValueCategory::Reference,
        TypeData::Pointer(_) | TypeData::FunctionPointer(_) | TypeData::Tuple { .. } => {
            ValueCategory::Value
        }
        TypeData::NullableRef(inner) => value_category(pool, registry, env, *inner),
    }
}

fn type_param_category(
    pool: &Pool,
    registry: &TypeRegistry,
    env: &GenericEnv<'_>,
    param: TypeParamRef,
) -> ValueCategory {
    let Some(clause) = env.constraints(param) else {
        return ValueCategory::Unknown;
    };
    if clause.is_value_type_constraint() {
        return ValueCategory::Value;
    }
    if clause.flags.contains(ConstraintFlags::CLASS) {
        return ValueCategory::Reference;
    }
    // A class-type constraint (not an interface) makes it a reference type.
    let has_class_constraint = clause.types.iter().any(|&c| match pool.get(c) {
        TypeData::Named { def, .. } => {
            let kind = registry.get(*def).kind;
            kind == crate::TypeKind::Class
        }
        TypeData::Predefined(p) => *p == Idx::STRING,
        TypeData::Array { .. } => true,
        _ => false,
    });
    if has_class_constraint {
        ValueCategory::Reference
    } else {
        ValueCategory::Unknown
    }
}

/// Whether values of `ty` may only live on the stack (`ref struct`).
pub fn is_ref_like(pool: &Pool, registry: &TypeRegistry, ty: Idx) -> bool {
    match pool.get(ty) {
        TypeData::Named { def, .. } => registry.get(*def).is_ref_like,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_ir::StringInterner;

    #[test]
    fn predefined_categories() {
        let interner = StringInterner::new();
        let pool = Pool::new();
        let registry = TypeRegistry::new(&interner);
        let env = GenericEnv::default();
        assert_eq!(value_category(&pool, &registry, &env, Idx::INT), ValueCategory::Value);
        assert_eq!(
            value_category(&pool, &registry, &env, Idx::STRING),
            ValueCategory::Reference
        );
        assert_eq!(
            value_category(&pool, &registry, &env, Idx::ERROR),
            ValueCategory::Unknown
        );
    }

    #[test]
    fn type_param_category_follows_constraints() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let registry = TypeRegistry::new(&interner);
        let t = interner.intern("T");
        let params = vec![
            TypeParamDecl::new(t),
            TypeParamDecl::new(t).with_flags(ConstraintFlags::STRUCT),
            TypeParamDecl::new(t).with_flags(ConstraintFlags::CLASS),
            TypeParamDecl::new(t).with_constraint_type(Idx::STRING),
        ];
        let env = GenericEnv::block(&params);
        let expected = [
            ValueCategory::Unknown,
            ValueCategory::Value,
            ValueCategory::Reference,
            ValueCategory::Reference,
        ];
        for (ordinal, want) in (0u32..).zip(expected) {
            let ty = pool.type_param(TypeParamOwner::Block, ordinal, t);
            assert_eq!(value_category(&pool, &registry, &env, ty), want);
        }
    }
}
