//! A compilation's bound world, built through the public API.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use cinder_extensions::{
    bind_extensions, BindOptions, BindOutput, ExtensionBlockDecl, ExtensionTable, MemberDecl,
    ReceiverDescriptor,
};
use cinder_extensions::resolve::{Argument, MemberQuery, Resolution, ResolveContext};
use cinder_extensions::resolve_member;
use cinder_ir::{FileId, Name, SourceLoc, Span, StringInterner};
use cinder_types::{DefId, Idx, ParamInfo, Pool, TypeDef, TypeRegistry};

pub struct World {
    pub interner: StringInterner,
    pub pool: Pool,
    pub registry: TypeRegistry,
    /// `App.Extensions`
    pub decl: DefId,
}

impl World {
    pub fn new() -> Self {
        let interner = StringInterner::new();
        let mut registry = TypeRegistry::new(&interner);
        let decl = registry.register(TypeDef::static_class(
            interner.intern("App"),
            interner.intern("Extensions"),
        ));
        World {
            interner,
            pool: Pool::new(),
            registry,
            decl,
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn loc(start: u32) -> SourceLoc {
        SourceLoc::new(FileId(0), Span::new(start, start + 1))
    }

    /// A block in `App.Extensions` at offset `start` with receiver `r`.
    pub fn block(&self, start: u32, ty: Idx) -> ExtensionBlockDecl {
        ExtensionBlockDecl::new(
            self.decl,
            Self::loc(start),
            ReceiverDescriptor::new(self.name("r"), ty),
        )
    }

    pub fn method(&self, name: &str, params: &[Idx], ret: Idx) -> MemberDecl {
        let params = params
            .iter()
            .enumerate()
            .map(|(i, &ty)| ParamInfo::new(self.name(&format!("p{i}")), ty))
            .collect();
        MemberDecl::method(self.name(name), params, ret)
    }

    pub fn bind(&self, decls: &[ExtensionBlockDecl]) -> BindOutput {
        bind_extensions(
            &self.pool,
            &self.registry,
            &self.interner,
            decls,
            &BindOptions::sequential(),
        )
    }

    /// Resolve `receiver.name(args)` with `scope` in scope.
    pub fn call(
        &mut self,
        table: &ExtensionTable,
        scope: &[DefId],
        receiver: Idx,
        name: &str,
        args: &[Idx],
    ) -> Resolution {
        let name = self.name(name);
        let args: Vec<Argument> = args.iter().map(|&ty| Argument::value(ty)).collect();
        let query = MemberQuery::invocation(name, &args);
        let mut ctx = ResolveContext::new(&mut self.pool, &self.registry, &self.interner, table)
            .with_scope(scope);
        resolve_member(&mut ctx, receiver, &query)
    }
}
