//! Test utilities.

use std::collections::BTreeSet;

use crate::analysis::dispose::DisposeAnalysisContext;
use crate::ir::{BasicBlock, BlockId, ControlFlowGraph, OperationArena, OperationId, Procedure};
use crate::symbols::{MethodDef, MethodId, SymbolTable, TypeDef, TypeId, TypeKind};

/// A symbol table pre-populated with the domain symbols every dispose
/// analysis needs: the dispose capability, the two collection capabilities,
/// the boolean type, and an enclosing type that implements the capability.
#[derive(Debug)]
pub struct World {
    /// The type system under test.
    pub symbols: SymbolTable,
    /// The built-in boolean type.
    pub boolean: TypeId,
    /// The dispose capability.
    pub disposable: TypeId,
    /// The capability's single method.
    pub disposable_dispose: MethodId,
    /// The non-generic collection capability.
    pub collection: TypeId,
    /// The generic collection capability.
    pub generic_collection: TypeId,
    /// The type the analyzed procedure belongs to; implements the capability.
    pub enclosing: TypeId,
}

/// A disposable class together with its constructor and dispose method.
#[derive(Debug)]
pub struct DisposableClass {
    /// The class itself.
    pub ty: TypeId,
    /// Its parameterless constructor.
    pub ctor: MethodId,
    /// Its `Dispose` implementation.
    pub dispose: MethodId,
}

impl World {
    /// A world holding just the domain symbols.
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let boolean = symbols.add_type(TypeDef::new("bool", TypeKind::Boolean));
        let disposable = symbols.add_type(TypeDef::new("Disposable", TypeKind::Interface));
        let disposable_dispose = symbols.add_method(MethodDef::new("Dispose", disposable));
        let collection = symbols.add_type(TypeDef::new("Collection", TypeKind::Interface));
        let generic_collection =
            symbols.add_type(TypeDef::new("GenericCollection", TypeKind::Interface));
        let enclosing = symbols
            .add_type(TypeDef::new("Host", TypeKind::Class).with_interfaces([disposable]));
        Self {
            symbols,
            boolean,
            disposable,
            disposable_dispose,
            collection,
            generic_collection,
            enclosing,
        }
    }

    /// Registers a class implementing the dispose capability, with a
    /// parameterless constructor and a `Dispose` implementation.
    pub fn disposable_class(&mut self, name: &str) -> DisposableClass {
        let ty = self
            .symbols
            .add_type(TypeDef::new(name, TypeKind::Class).with_interfaces([self.disposable]));
        let ctor = self.symbols.add_method(MethodDef::new(".ctor", ty));
        let dispose = self
            .symbols
            .add_method(MethodDef::new("Dispose", ty).implementing(self.disposable_dispose));
        DisposableClass { ty, ctor, dispose }
    }

    /// A context over this world's symbols with no ownership-transfer types.
    pub fn context(&self) -> DisposeAnalysisContext<'_> {
        DisposeAnalysisContext {
            symbols: &self.symbols,
            disposable: self.disposable,
            collection: self.collection,
            generic_collection: self.generic_collection,
            ownership_transfer_types: BTreeSet::new(),
            enclosing_type: self.enclosing,
        }
    }
}

/// A procedure whose body is one entry block with the given root operations.
pub fn single_block(operations: OperationArena, roots: Vec<OperationId>) -> Procedure {
    let cfg = ControlFlowGraph::from_blocks([(BlockId::ENTRY, BasicBlock::new(roots))], []);
    Procedure::new(operations, cfg)
}
