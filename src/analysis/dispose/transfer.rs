//! The per-operation transfer function of the dispose analysis.

use crate::analysis::null_state::{NullResult, NullState};
use crate::analysis::points_to::{LocationId, PointsToResult};
use crate::ir::{
    AcquiredResources, BasicBlock, CalleeKind, OperationArena, OperationId, OperationKind,
};
use crate::symbols::{MethodFlags, MethodId, PassMode, TypeId, TypeKind};

use super::state::DisposeState;
use super::value::DisposeValue;
use super::DisposeAnalysisContext;

/// How an invoked method relates to disposal.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum DisposeMethodKind {
    /// The implementation of the dispose capability's method.
    Dispose,
    /// A `Dispose(bool)` teardown helper.
    DisposeBool,
    /// A parameterless `Close` method.
    Close,
    /// Not a dispose method.
    None,
}

/// Applies the dispose-specific effect of each operation to a
/// [`DisposeState`].
///
/// The transfer is deterministic in the input state and the operation
/// order, never removes tracked locations, and introduces new ones only for
/// instance creations and factory-heuristic invocations.
pub(crate) struct DisposeTransfer<'a> {
    context: &'a DisposeAnalysisContext<'a>,
    operations: &'a OperationArena,
    points_to: &'a PointsToResult,
    null_result: Option<&'a NullResult>,
    /// The dispose capability's single method, when it resolves. Without it
    /// the `Dispose` classification is unavailable and affected invocations
    /// are skipped.
    disposable_dispose: Option<MethodId>,
}

impl<'a> DisposeTransfer<'a> {
    pub(crate) fn new(
        context: &'a DisposeAnalysisContext<'a>,
        operations: &'a OperationArena,
        points_to: &'a PointsToResult,
        null_result: Option<&'a NullResult>,
    ) -> Self {
        let disposable_dispose = context
            .symbols
            .methods_of(context.disposable)
            .iter()
            .copied()
            .find(|&method| {
                let def = context.symbols.method(method);
                def.parameters.is_empty() && def.return_type.is_none()
            });
        Self {
            context,
            operations,
            points_to,
            null_result,
            disposable_dispose,
        }
    }

    /// Runs the block's root operations, children before parents, over the
    /// given state.
    pub(crate) fn transfer_block(&self, block: &BasicBlock, state: &mut DisposeState) {
        for &root in block.operations() {
            self.visit(root, state);
        }
    }

    fn visit(&self, operation: OperationId, state: &mut DisposeState) {
        for child in self.operations[operation].children() {
            self.visit(child, state);
        }
        self.apply(operation, state);
    }

    fn apply(&self, operation: OperationId, state: &mut DisposeState) {
        let symbols = self.context.symbols;
        match &self.operations[operation].kind {
            OperationKind::ObjectCreation {
                constructor,
                arguments,
            } => {
                let ctor = symbols.method(*constructor);
                if let [parameter] = ctor.parameters.as_slice() {
                    if self.context.ownership_transfer_types.contains(&parameter.ty) {
                        if let Some(&argument) = arguments.first() {
                            self.escape(argument, operation, state);
                        }
                    }
                }
                for (&argument, parameter) in arguments.iter().zip(&ctor.parameters) {
                    if matches!(parameter.mode, PassMode::Reference | PassMode::Output) {
                        self.escape(argument, operation, state);
                    }
                }
                if self.is_disposable(ctor.containing_type) {
                    self.mark_created(operation, state);
                }
            }
            OperationKind::Invocation {
                target,
                callee: CalleeKind::Method,
                instance,
                arguments,
            } => match self.classify_dispose_method(*target) {
                DisposeMethodKind::Dispose | DisposeMethodKind::DisposeBool => {
                    if let Some(receiver) = instance {
                        self.dispose_through_receiver(*receiver, operation, state);
                    }
                }
                DisposeMethodKind::Close => {
                    if let Some(receiver) = instance {
                        if !self.is_current_instance(*receiver) {
                            self.dispose_through_receiver(*receiver, operation, state);
                        }
                    }
                }
                DisposeMethodKind::None => {
                    let target_def = symbols.method(*target);
                    let is_factory = target_def.flags.contains(MethodFlags::STATIC)
                        && (has_prefix_ignore_ascii_case(&target_def.name, "create")
                            || has_prefix_ignore_ascii_case(&target_def.name, "open"))
                        && target_def
                            .return_type
                            .is_some_and(|ty| self.is_disposable(ty));
                    if is_factory {
                        self.mark_created(operation, state);
                    }
                    if self.is_collection_add(*target) {
                        if let Some(&last_argument) = arguments.last() {
                            let argument_disposable = self.operations[last_argument]
                                .result_type
                                .is_some_and(|ty| self.is_disposable(ty));
                            if argument_disposable {
                                self.escape(last_argument, operation, state);
                            }
                        }
                    }
                }
            },
            OperationKind::Assignment { target, value } => {
                let escapes = matches!(
                    self.operations[*target].kind,
                    OperationKind::FieldReference { .. }
                        | OperationKind::PropertyReference { .. }
                        | OperationKind::ArrayElementReference { .. }
                );
                if escapes {
                    self.escape(*value, operation, state);
                }
            }
            OperationKind::Return { value: Some(value) } => {
                self.escape(*value, operation, state);
            }
            OperationKind::ScopedAcquisition { resources } => match resources {
                AcquiredResources::Declarations(initializers) => {
                    for &initializer in initializers {
                        self.dispose(initializer, operation, state);
                    }
                }
                AcquiredResources::Expression(resource) => {
                    self.dispose(*resource, operation, state);
                }
            },
            OperationKind::Conversion {
                operand,
                user_defined: true,
            } => {
                self.escape(*operand, operation, state);
            }
            OperationKind::ElementInitializer { instance, value } => {
                // The escape is attributed to the instance being
                // initialized, not to the initializer element itself.
                self.escape(*value, *instance, state);
            }
            OperationKind::Invocation { .. }
            | OperationKind::Return { value: None }
            | OperationKind::Conversion { .. }
            | OperationKind::FieldReference { .. }
            | OperationKind::PropertyReference { .. }
            | OperationKind::ArrayElementReference { .. }
            | OperationKind::LocalReference(_)
            | OperationKind::ParameterReference(_)
            | OperationKind::InstanceReference
            | OperationKind::Literal
            | OperationKind::Other { .. } => {}
        }
    }

    /// Whether `receiver` is literally a reference to the current instance.
    /// A local that merely aliases the current instance does not count.
    fn is_current_instance(&self, receiver: OperationId) -> bool {
        let receiver = &self.operations[receiver];
        matches!(receiver.kind, OperationKind::InstanceReference)
            && receiver
                .result_type
                .is_none_or(|ty| ty == self.context.enclosing_type)
    }

    fn dispose_through_receiver(
        &self,
        receiver: OperationId,
        invocation: OperationId,
        state: &mut DisposeState,
    ) {
        // A receiver that is known to be null never reaches the call.
        let receiver_is_null = self
            .null_result
            .is_some_and(|null| null.state_of(receiver) == NullState::Null);
        if receiver_is_null {
            return;
        }
        self.dispose(receiver, invocation, state);
    }

    /// Marks every known location of `disposed` as disposed by `via`.
    fn dispose(&self, disposed: OperationId, via: OperationId, state: &mut DisposeState) {
        self.transition(disposed, state, |value| {
            value.with_new_disposing_operation(via)
        });
    }

    /// Marks every known location of `escaped` as escaped through `via`.
    fn escape(&self, escaped: OperationId, via: OperationId, state: &mut DisposeState) {
        self.transition(escaped, state, |value| {
            value.with_new_escaping_operation(via)
        });
    }

    /// Applies a transition to every tracked, disposable location of an
    /// operation's points-to value. Untracked locations stay untracked.
    fn transition(
        &self,
        operation: OperationId,
        state: &mut DisposeState,
        transition: impl Fn(&DisposeValue) -> DisposeValue,
    ) {
        let Some(locations) = self.points_to.value_of(operation).locations() else {
            return;
        };
        for &location in locations {
            if !self.is_disposable(self.points_to.location_type(location)) {
                continue;
            }
            let next = state.tracked(location).map(&transition);
            if let Some(next) = next {
                self.set_abstract_value(state, location, next);
            }
        }
    }

    /// Starts tracking every known location of a freshly created instance.
    fn mark_created(&self, creation: OperationId, state: &mut DisposeState) {
        let Some(locations) = self.points_to.value_of(creation).locations() else {
            return;
        };
        for &location in locations {
            if self.is_disposable(self.points_to.location_type(location)) {
                self.set_abstract_value(state, location, DisposeValue::NOT_DISPOSED);
            }
        }
    }

    fn set_abstract_value(
        &self,
        state: &mut DisposeState,
        location: LocationId,
        value: DisposeValue,
    ) {
        debug_assert!(
            self.is_disposable(self.points_to.location_type(location)),
            "Only disposable locations may be tracked, got {location}"
        );
        state.insert(location, value);
    }

    fn is_disposable(&self, ty: TypeId) -> bool {
        self.context
            .symbols
            .implements_interface(ty, self.context.disposable)
    }

    fn classify_dispose_method(&self, method: MethodId) -> DisposeMethodKind {
        let symbols = self.context.symbols;
        let def = symbols.method(method);
        if !self.is_disposable(def.containing_type) {
            return DisposeMethodKind::None;
        }
        let returns_nothing = def.return_type.is_none();
        if returns_nothing
            && def.parameters.is_empty()
            && self.disposable_dispose.is_some_and(|iface_method| {
                symbols.find_interface_implementation(def.containing_type, iface_method)
                    == Some(method)
            })
        {
            return DisposeMethodKind::Dispose;
        }
        if def.name == "Dispose" && returns_nothing {
            if let [parameter] = def.parameters.as_slice() {
                if parameter.mode == PassMode::Value
                    && symbols.type_def(parameter.ty).kind == TypeKind::Boolean
                {
                    return DisposeMethodKind::DisposeBool;
                }
            }
        }
        if def.name == "Close" && returns_nothing && def.parameters.is_empty() {
            return DisposeMethodKind::Close;
        }
        DisposeMethodKind::None
    }

    fn is_collection_add(&self, method: MethodId) -> bool {
        let symbols = self.context.symbols;
        let def = symbols.method(method);
        def.name.starts_with("Add")
            && (symbols.derives_from(def.containing_type, self.context.collection)
                || symbols.derives_from(def.containing_type, self.context.generic_collection))
    }
}

fn has_prefix_ignore_ascii_case(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
