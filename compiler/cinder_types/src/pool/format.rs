//! Source-form type display.
//!
//! Output is fully qualified except for predefined types, which print as
//! keywords: `System.Collections.Generic.List<string?>`, `int[][,]`,
//! `(int a, string b)`, `delegate* unmanaged[Cdecl]<int, void>`.
//! This is the form used in diagnostics and in marker signatures.

use cinder_ir::StringInterner;

use crate::{FnPtrParam, Idx, Pool, TypeData, TypeRegistry};

impl Pool {
    /// Format a type in source form.
    pub fn display(&self, idx: Idx, registry: &TypeRegistry, interner: &StringInterner) -> String {
        let mut buf = String::new();
        self.display_into(idx, registry, interner, &mut buf);
        buf
    }

    /// Format a type into an existing buffer.
    pub fn display_into(
        &self,
        idx: Idx,
        registry: &TypeRegistry,
        interner: &StringInterner,
        buf: &mut String,
    ) {
        match self.get(idx) {
            TypeData::Predefined(p) => buf.push_str(p.keyword().unwrap_or("<error>")),
            TypeData::Error => buf.push_str("<error>"),
            TypeData::Named { def, args } => {
                if *def == registry.well_known().nullable && args.len() == 1 {
                    self.display_into(args[0], registry, interner, buf);
                    buf.push('?');
                    return;
                }
                buf.push_str(&registry.qualified_name(*def, interner));
                if !args.is_empty() {
                    buf.push('<');
                    for (i, &arg) in args.iter().enumerate() {
                        if i > 0 {
                            buf.push_str(", ");
                        }
                        self.display_into(arg, registry, interner, buf);
                    }
                    buf.push('>');
                }
            }
            TypeData::TypeParam(p) => buf.push_str(interner.lookup(p.name)),
            TypeData::Array { .. } => {
                // Innermost element first, then rank specifiers outermost-first.
                let mut ranks = Vec::new();
                let mut cur = idx;
                while let TypeData::Array { elem, rank } = self.get(cur) {
                    ranks.push(*rank);
                    cur = *elem;
                }
                self.display_into(cur, registry, interner, buf);
                for rank in ranks {
                    push_rank(buf, rank);
                }
            }
            TypeData::Pointer(elem) => {
                self.display_into(*elem, registry, interner, buf);
                buf.push('*');
            }
            TypeData::FunctionPointer(sig) => {
                buf.push_str("delegate*");
                if sig.unmanaged {
                    buf.push_str(" unmanaged");
                    if !sig.conventions.is_empty() {
                        buf.push('[');
                        for (i, conv) in sig.conventions.iter().enumerate() {
                            if i > 0 {
                                buf.push_str(", ");
                            }
                            buf.push_str(interner.lookup(*conv));
                        }
                        buf.push(']');
                    }
                }
                buf.push('<');
                for param in &sig.params {
                    self.display_fnptr_param(param, registry, interner, buf);
                    buf.push_str(", ");
                }
                self.display_fnptr_param(&sig.ret, registry, interner, buf);
                buf.push('>');
            }
            TypeData::Tuple { elems, names } => {
                buf.push('(');
                for (i, (&elem, name)) in elems.iter().zip(names).enumerate() {
                    if i > 0 {
                        buf.push_str(", ");
                    }
                    self.display_into(elem, registry, interner, buf);
                    if let Some(name) = name {
                        buf.push(' ');
                        buf.push_str(interner.lookup(*name));
                    }
                }
                buf.push(')');
            }
            TypeData::NullableRef(inner) => {
                self.display_into(*inner, registry, interner, buf);
                buf.push('?');
            }
        }
    }

    fn display_fnptr_param(
        &self,
        param: &FnPtrParam,
        registry: &TypeRegistry,
        interner: &StringInterner,
        buf: &mut String,
    ) {
        if param.ref_kind.is_by_ref() {
            buf.push_str(param.ref_kind.keyword());
            buf.push(' ');
        }
        self.display_into(param.ty, registry, interner, buf);
    }
}

/// `[]`, `[,]`, `[,,]` ...
pub fn push_rank(buf: &mut String, rank: u32) {
    buf.push('[');
    for _ in 1..rank {
        buf.push(',');
    }
    buf.push(']');
}
