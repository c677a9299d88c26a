#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

//! Dispose-state dataflow analysis over control-flow graphs.
//!
//! Given a procedure lowered into basic blocks of [`ir`] operations and a
//! prior points-to result, [`analysis::dispose`] computes at every block
//! boundary, for each abstract heap location of a disposable type, whether
//! the procedure has released it, may have released it (or handed its
//! ownership elsewhere), or has not released it at all, together with the
//! operations that contributed to the release. Code-quality rules consume
//! the exit state to report resources that are not released on some path.
//!
//! ```
//! use dispose_flow::analysis::CancellationToken;
//! use dispose_flow::analysis::dispose::{self, DisposeKind};
//! use dispose_flow::analysis::points_to::{PointsToResult, PointsToValue};
//! use dispose_flow::ir::{
//!     BasicBlock, BlockId, CalleeKind, ControlFlowGraph, Operation, OperationArena,
//!     OperationKind, Procedure,
//! };
//! use dispose_flow::symbols::{MethodDef, SymbolTable, TypeDef, TypeKind};
//!
//! // A tiny world: `interface Disposable { void Dispose(); }` plus a class
//! // `Widget` implementing it.
//! let mut symbols = SymbolTable::new();
//! let disposable = symbols.add_type(TypeDef::new("Disposable", TypeKind::Interface));
//! let dispose_iface = symbols.add_method(MethodDef::new("Dispose", disposable));
//! let collection = symbols.add_type(TypeDef::new("Collection", TypeKind::Interface));
//! let generic_collection =
//!     symbols.add_type(TypeDef::new("GenericCollection", TypeKind::Interface));
//! let host = symbols.add_type(TypeDef::new("Host", TypeKind::Class));
//! let widget =
//!     symbols.add_type(TypeDef::new("Widget", TypeKind::Class).with_interfaces([disposable]));
//! let ctor = symbols.add_method(MethodDef::new(".ctor", widget));
//! let dispose = symbols.add_method(MethodDef::new("Dispose", widget).implementing(dispose_iface));
//!
//! // `w = new Widget(); w.Dispose();`
//! let mut operations = OperationArena::new();
//! let creation = operations.push(Operation::typed(
//!     OperationKind::ObjectCreation { constructor: ctor, arguments: vec![] },
//!     widget,
//! ));
//! let receiver =
//!     operations.push(Operation::typed(OperationKind::LocalReference(0.into()), widget));
//! let disposal = operations.push(Operation::new(OperationKind::Invocation {
//!     target: dispose,
//!     callee: CalleeKind::Method,
//!     instance: Some(receiver),
//!     arguments: vec![],
//! }));
//!
//! let mut points_to = PointsToResult::new();
//! let location = points_to.new_location(widget);
//! points_to.record(creation, PointsToValue::known([location]));
//! points_to.record(receiver, PointsToValue::known([location]));
//!
//! let cfg = ControlFlowGraph::from_blocks(
//!     [(BlockId::ENTRY, BasicBlock::new(vec![creation, disposal]))],
//!     [],
//! );
//! let procedure = Procedure::new(operations, cfg);
//! let context = dispose::DisposeAnalysisContext {
//!     symbols: &symbols,
//!     disposable,
//!     collection,
//!     generic_collection,
//!     ownership_transfer_types: Default::default(),
//!     enclosing_type: host,
//! };
//! let result =
//!     dispose::analyze(&procedure, &context, &points_to, None, &CancellationToken::new())?;
//! assert_eq!(result.exit_state().value_of(location).kind(), DisposeKind::Disposed);
//! # Ok::<(), dispose_flow::analysis::dispose::DisposeAnalysisError>(())
//! ```
//!
//! ## Features
#![doc = document_features::document_features!()]

pub mod analysis;
pub mod ir;
pub mod symbols;

/// Test utilities
#[cfg(test)]
pub mod tests;
