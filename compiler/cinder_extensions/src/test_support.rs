//! Hand-built type graph fixtures for unit tests.

use cinder_ir::{FileId, Name, SourceLoc, Span, StringInterner};
use cinder_types::{
    DefId, Idx, Pool, TypeDef, TypeKind, TypeParamDecl, TypeParamOwner, TypeRegistry,
};

use crate::assign::{Assignment, ContainerAssignor, EncodedBlock};
use crate::decl::{ExtensionBlockDecl, ReceiverDescriptor};
use crate::emit::emit;
use crate::encode::encode_block;
use crate::symbols::ExtensionTable;

pub(crate) struct Fixture {
    pub interner: StringInterner,
    pub pool: Pool,
    pub registry: TypeRegistry,
    /// `App.Extensions`, a static class hosting the blocks under test.
    pub decl: DefId,
}

impl Fixture {
    pub fn new() -> Self {
        let interner = StringInterner::new();
        let mut registry = TypeRegistry::new(&interner);
        let decl = registry.register(TypeDef::static_class(
            interner.intern("App"),
            interner.intern("Extensions"),
        ));
        Fixture {
            interner,
            pool: Pool::new(),
            registry,
            decl,
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Source location `start..start + 1` in file 0.
    pub fn loc(start: u32) -> SourceLoc {
        SourceLoc::new(FileId(0), Span::new(start, start + 1))
    }

    /// Register `App.{name}` of `kind`, generic over `arity` parameters.
    pub fn define(&mut self, name: &str, kind: TypeKind, arity: usize) -> DefId {
        let params = (0..arity)
            .map(|i| TypeParamDecl::new(self.interner.intern(&format!("T{i}"))))
            .collect();
        let def = TypeDef::new(self.name("App"), self.name(name), kind).with_type_params(params);
        self.registry.register(def)
    }

    /// `App.{name}` as a non-generic type.
    pub fn named(&mut self, name: &str, kind: TypeKind) -> Idx {
        let def = self.define(name, kind, 0);
        self.pool.named(def, &[])
    }

    /// `System.Collections.Generic.List<T>`.
    pub fn list_def(&mut self) -> DefId {
        let def = TypeDef::new(
            self.name("System.Collections.Generic"),
            self.name("List"),
            TypeKind::Class,
        )
        .with_type_params(vec![TypeParamDecl::new(self.name("T"))]);
        self.registry.register(def)
    }

    pub fn list_of(&mut self, elem: Idx) -> Idx {
        let def = self.list_def();
        self.pool.named(def, &[elem])
    }

    /// A block type parameter reference.
    pub fn block_param(&mut self, ordinal: u32, name: &str) -> Idx {
        let name = self.name(name);
        self.pool.type_param(TypeParamOwner::Block, ordinal, name)
    }

    /// A method type parameter reference.
    pub fn method_param(&mut self, ordinal: u32, name: &str) -> Idx {
        let name = self.name(name);
        self.pool.type_param(TypeParamOwner::Method, ordinal, name)
    }

    pub fn receiver(&self, name: &str, ty: Idx) -> ReceiverDescriptor {
        ReceiverDescriptor::new(self.name(name), ty)
    }

    /// A public block in `App.Extensions` at source offset `start`.
    pub fn block(&self, start: u32, receiver: ReceiverDescriptor) -> ExtensionBlockDecl {
        ExtensionBlockDecl::new(self.decl, Self::loc(start), receiver)
    }

    /// Encode every block, indexed by position.
    pub fn encoded(&self, decls: &[ExtensionBlockDecl]) -> Vec<EncodedBlock> {
        decls
            .iter()
            .enumerate()
            .map(|(index, block)| EncodedBlock {
                index,
                declaring_type: block.declaring_type,
                loc: block.loc,
                arity: block.arity(),
                signature: encode_block(&self.pool, &self.registry, &self.interner, block),
            })
            .collect()
    }

    pub fn assign(&self, decls: &[ExtensionBlockDecl]) -> Assignment {
        ContainerAssignor::assign(&self.encoded(decls))
    }

    /// Encode, assign and emit without shape checks.
    pub fn emit(&self, decls: &[ExtensionBlockDecl]) -> ExtensionTable {
        let assignment = self.assign(decls);
        emit(&self.pool, &self.registry, &self.interner, &assignment, decls)
    }
}
