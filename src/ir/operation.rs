//! Operations of a lowered procedure body.
//!
//! Operations form trees: a basic block lists its root operations in
//! execution order, and every non-leaf operation references its children by
//! id in evaluation order. All nodes live in one [`OperationArena`] so that
//! analyses can refer to them with small integer ids instead of pointers.

use std::fmt::Display;
use std::ops::Index;

use crate::symbols::{MethodId, TypeId};

/// Identifies an operation in an [`OperationArena`].
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(transparent)]
pub struct OperationId(u32);

impl OperationId {
    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Identifies a local variable of the analyzed procedure.
#[derive(
    Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, derive_more::From, derive_more::Into,
)]
#[repr(transparent)]
pub struct LocalId(u32);

impl Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// What kind of callable an invocation targets.
#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum CalleeKind {
    /// An ordinary method.
    Method,
    /// A lambda expression.
    Lambda,
    /// A delegate value.
    Delegate,
    /// A function declared locally inside the procedure.
    LocalFunction,
}

/// The resources acquired by a scoped-acquisition block.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AcquiredResources {
    /// A declaration group; each element is the initializer expression of
    /// one declared resource.
    Declarations(Vec<OperationId>),
    /// A single resource expression.
    Expression(OperationId),
}

/// The shape of an [`Operation`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum OperationKind {
    /// `new T(args...)`.
    ObjectCreation {
        /// The constructor being invoked.
        constructor: MethodId,
        /// Argument values in evaluation order.
        arguments: Vec<OperationId>,
    },
    /// A call to a method, lambda, delegate, or local function.
    Invocation {
        /// The target method symbol.
        target: MethodId,
        /// What kind of callable the target is.
        callee: CalleeKind,
        /// The receiver, absent for static targets.
        instance: Option<OperationId>,
        /// Argument values in evaluation order.
        arguments: Vec<OperationId>,
    },
    /// `target = value`.
    Assignment {
        /// The reference being written.
        target: OperationId,
        /// The value being stored.
        value: OperationId,
    },
    /// A reference to a field of `instance` (absent for static fields).
    FieldReference {
        /// The receiver of the field access.
        instance: Option<OperationId>,
    },
    /// A reference to a property of `instance` (absent for static ones).
    PropertyReference {
        /// The receiver of the property access.
        instance: Option<OperationId>,
    },
    /// A reference to `array[index]`.
    ArrayElementReference {
        /// The array value.
        array: OperationId,
        /// The index value.
        index: OperationId,
    },
    /// A reference to a local variable.
    LocalReference(LocalId),
    /// A reference to the parameter with the given ordinal.
    ParameterReference(u32),
    /// A reference to the current instance (`this`).
    InstanceReference,
    /// Returns from the procedure.
    Return {
        /// The returned value, if the procedure returns one.
        value: Option<OperationId>,
    },
    /// A block guaranteeing release of its resources on all exit paths.
    ScopedAcquisition {
        /// The resources the block acquires.
        resources: AcquiredResources,
    },
    /// A conversion applied to `operand`.
    Conversion {
        /// The converted value.
        operand: OperationId,
        /// Whether the conversion invokes a user-defined operator.
        user_defined: bool,
    },
    /// Writes `value` into an element of `instance` from inside an object
    /// or collection initializer.
    ElementInitializer {
        /// The instance being initialized.
        instance: OperationId,
        /// The element value.
        value: OperationId,
    },
    /// A literal value.
    Literal,
    /// Any operation shape the analysis has no dedicated handling for.
    Other {
        /// Child operations in evaluation order.
        children: Vec<OperationId>,
    },
}

/// A single node of a lowered procedure body.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Operation {
    /// The shape of the operation.
    pub kind: OperationKind,
    /// The static type of the operation's value, where one exists.
    pub result_type: Option<TypeId>,
}

impl Operation {
    /// An operation without a result type.
    #[must_use]
    pub const fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            result_type: None,
        }
    }

    /// An operation whose value has the given static type.
    #[must_use]
    pub const fn typed(kind: OperationKind, result_type: TypeId) -> Self {
        Self {
            kind,
            result_type: Some(result_type),
        }
    }

    /// The operation's children in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<OperationId> {
        match &self.kind {
            OperationKind::ObjectCreation { arguments, .. } => arguments.clone(),
            OperationKind::Invocation {
                instance,
                arguments,
                ..
            } => instance.iter().chain(arguments).copied().collect(),
            OperationKind::Assignment { target, value } => vec![*target, *value],
            OperationKind::FieldReference { instance }
            | OperationKind::PropertyReference { instance } => instance.iter().copied().collect(),
            OperationKind::ArrayElementReference { array, index } => vec![*array, *index],
            OperationKind::Return { value } => value.iter().copied().collect(),
            OperationKind::ScopedAcquisition { resources } => match resources {
                AcquiredResources::Declarations(initializers) => initializers.clone(),
                AcquiredResources::Expression(resource) => vec![*resource],
            },
            OperationKind::Conversion { operand, .. } => vec![*operand],
            OperationKind::ElementInitializer { instance, value } => vec![*instance, *value],
            OperationKind::Other { children } => children.clone(),
            OperationKind::LocalReference(_)
            | OperationKind::ParameterReference(_)
            | OperationKind::InstanceReference
            | OperationKind::Literal => Vec::new(),
        }
    }
}

/// Owns every [`Operation`] of one procedure; ids are assigned in insertion
/// order and are stable for the lifetime of the arena.
#[derive(Debug, Clone, Default)]
pub struct OperationArena {
    operations: Vec<Operation>,
}

impl OperationArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation and returns its id.
    ///
    /// # Panics
    /// Panics if the number of operations exceeds `u32::MAX`.
    pub fn push(&mut self, operation: Operation) -> OperationId {
        let id = u32::try_from(self.operations.len())
            .expect("The number of operations should be within u32");
        self.operations.push(operation);
        OperationId(id)
    }

    /// Looks up an operation.
    ///
    /// # Panics
    /// Panics if the id does not belong to this arena.
    #[must_use]
    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.0 as usize]
    }

    /// The number of operations in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the arena holds no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates operations with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (OperationId, &Operation)> {
        self.operations
            .iter()
            .enumerate()
            .map(|(raw, op)| (OperationId(u32::try_from(raw).expect("id within u32")), op))
    }
}

impl Index<OperationId> for OperationArena {
    type Output = Operation;

    fn index(&self, index: OperationId) -> &Self::Output {
        self.operation(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_ids_follow_insertion_order() {
        let mut arena = OperationArena::new();
        let first = arena.push(Operation::new(OperationKind::Literal));
        let second = arena.push(Operation::new(OperationKind::InstanceReference));
        assert!(first < second);
        assert_eq!(arena.len(), 2);
        assert_eq!(
            arena[second].kind,
            OperationKind::InstanceReference,
        );
    }

    #[test]
    fn invocation_children_start_with_the_receiver() {
        let mut arena = OperationArena::new();
        let receiver = arena.push(Operation::new(OperationKind::LocalReference(0.into())));
        let argument = arena.push(Operation::new(OperationKind::Literal));
        let mut symbols = crate::symbols::SymbolTable::new();
        let ty = symbols.add_type(crate::symbols::TypeDef::new(
            "T",
            crate::symbols::TypeKind::Class,
        ));
        let target = symbols.add_method(crate::symbols::MethodDef::new("M", ty));
        let invocation = Operation::new(OperationKind::Invocation {
            target,
            callee: CalleeKind::Method,
            instance: Some(receiver),
            arguments: vec![argument],
        });
        assert_eq!(invocation.children(), vec![receiver, argument]);
    }

    #[test]
    fn leaves_have_no_children() {
        assert!(Operation::new(OperationKind::Literal).children().is_empty());
        assert!(
            Operation::new(OperationKind::InstanceReference)
                .children()
                .is_empty()
        );
    }
}
