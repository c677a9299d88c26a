//! A minimal model of the analyzed program's type system.
//!
//! The dispose analysis never inspects source code; it only asks the symbol
//! table a handful of read-only questions (derivation, interface
//! implementation, method shapes). Hosts lower their own compiler's symbols
//! into this model once per procedure.

use std::collections::BTreeSet;
use std::fmt::Display;

use bitflags::bitflags;

/// Identifies a type in a [`SymbolTable`].
///
/// Two ids are the same type iff they are equal; the ordering is arbitrary
/// but total so that iteration over id-keyed collections is deterministic.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(transparent)]
pub struct TypeId(u32);

impl Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifies a method in a [`SymbolTable`].
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(transparent)]
pub struct MethodId(u32);

impl Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// The coarse shape of a type.
#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum TypeKind {
    /// The built-in boolean type.
    Boolean,
    /// A class (or any other concrete type with a base chain).
    Class,
    /// An interface, usable as a capability in derivation queries.
    Interface,
}

/// How an argument is passed to a parameter.
#[derive(Debug, PartialEq, Eq, Clone, Copy, derive_more::Display)]
pub enum PassMode {
    /// By value.
    Value,
    /// By reference.
    Reference,
    /// An output parameter; the callee writes through it.
    Output,
}

bitflags! {
    /// Modifiers of a method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// The method has no receiver.
        const STATIC = 1;
    }
}

/// A formal parameter of a method.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParameterDef {
    /// The declared type of the parameter.
    pub ty: TypeId,
    /// How arguments are passed to it.
    pub mode: PassMode,
}

impl ParameterDef {
    /// A by-value parameter of the given type.
    #[must_use]
    pub const fn by_value(ty: TypeId) -> Self {
        Self {
            ty,
            mode: PassMode::Value,
        }
    }

    /// A by-reference parameter of the given type.
    #[must_use]
    pub const fn by_reference(ty: TypeId) -> Self {
        Self {
            ty,
            mode: PassMode::Reference,
        }
    }

    /// An output parameter of the given type.
    #[must_use]
    pub const fn output(ty: TypeId) -> Self {
        Self {
            ty,
            mode: PassMode::Output,
        }
    }
}

/// A type registered in a [`SymbolTable`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// The display name of the type.
    pub name: String,
    /// The coarse shape of the type.
    pub kind: TypeKind,
    /// The base type, if any.
    pub base: Option<TypeId>,
    /// Interfaces implemented (for classes) or extended (for interfaces)
    /// directly by this type.
    pub interfaces: Vec<TypeId>,
    methods: Vec<MethodId>,
}

impl TypeDef {
    /// Creates a type with no base and no interfaces.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Sets the base type.
    #[must_use]
    pub fn with_base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    /// Adds directly implemented (or extended) interfaces.
    #[must_use]
    pub fn with_interfaces(mut self, interfaces: impl IntoIterator<Item = TypeId>) -> Self {
        self.interfaces.extend(interfaces);
        self
    }
}

/// A method registered in a [`SymbolTable`].
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// The simple name of the method.
    pub name: String,
    /// The type the method is declared on.
    pub containing_type: TypeId,
    /// Modifiers.
    pub flags: MethodFlags,
    /// Formal parameters in declaration order.
    pub parameters: Vec<ParameterDef>,
    /// The return type; [`None`] means the method returns nothing.
    pub return_type: Option<TypeId>,
    /// The interface method this method is the implementation of, if any.
    pub implements: Option<MethodId>,
}

impl MethodDef {
    /// Creates a static-less, parameterless method returning nothing.
    pub fn new(name: impl Into<String>, containing_type: TypeId) -> Self {
        Self {
            name: name.into(),
            containing_type,
            flags: MethodFlags::empty(),
            parameters: Vec::new(),
            return_type: None,
            implements: None,
        }
    }

    /// Sets the modifier flags.
    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Appends formal parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = ParameterDef>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returning(mut self, ty: TypeId) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Marks this method as the implementation of an interface method.
    #[must_use]
    pub fn implementing(mut self, interface_method: MethodId) -> Self {
        self.implements = Some(interface_method);
        self
    }
}

/// Arena of [`TypeDef`]s and [`MethodDef`]s plus the derivation queries the
/// dispose analysis consumes.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    types: Vec<TypeDef>,
    methods: Vec<MethodDef>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type and returns its id.
    ///
    /// # Panics
    /// Panics if the number of types exceeds `u32::MAX`.
    pub fn add_type(&mut self, def: TypeDef) -> TypeId {
        let id = u32::try_from(self.types.len()).expect("The number of types should be within u32");
        self.types.push(def);
        TypeId(id)
    }

    /// Registers a method and returns its id.
    ///
    /// # Panics
    /// Panics if the containing type is not registered, or if the number of
    /// methods exceeds `u32::MAX`.
    pub fn add_method(&mut self, def: MethodDef) -> MethodId {
        let id =
            u32::try_from(self.methods.len()).expect("The number of methods should be within u32");
        let id = MethodId(id);
        self.types[def.containing_type.0 as usize].methods.push(id);
        self.methods.push(def);
        id
    }

    /// Looks up a type definition.
    ///
    /// # Panics
    /// Panics if the id does not belong to this table.
    #[must_use]
    pub fn type_def(&self, ty: TypeId) -> &TypeDef {
        &self.types[ty.0 as usize]
    }

    /// Looks up a method definition.
    ///
    /// # Panics
    /// Panics if the id does not belong to this table.
    #[must_use]
    pub fn method(&self, method: MethodId) -> &MethodDef {
        &self.methods[method.0 as usize]
    }

    /// The methods declared directly on a type.
    #[must_use]
    pub fn methods_of(&self, ty: TypeId) -> &[MethodId] {
        &self.type_def(ty).methods
    }

    /// Whether `ty` transitively derives from `ancestor` through base types
    /// or interface lists. Reflexive: every type derives from itself.
    #[must_use]
    pub fn derives_from(&self, ty: TypeId, ancestor: TypeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![ty];
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let def = self.type_def(current);
            pending.extend(def.base);
            pending.extend(def.interfaces.iter().copied());
        }
        false
    }

    /// The set of interfaces `ty` transitively implements, collected over
    /// its base chain and over interface extension. Includes `ty` itself
    /// when it is an interface.
    #[must_use]
    pub fn transitive_interfaces(&self, ty: TypeId) -> BTreeSet<TypeId> {
        let mut interfaces = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![ty];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            let def = self.type_def(current);
            if def.kind == TypeKind::Interface {
                interfaces.insert(current);
            }
            pending.extend(def.base);
            pending.extend(def.interfaces.iter().copied());
        }
        interfaces
    }

    /// Whether `ty` transitively implements the interface `interface`.
    #[must_use]
    pub fn implements_interface(&self, ty: TypeId, interface: TypeId) -> bool {
        self.transitive_interfaces(ty).contains(&interface)
    }

    /// Finds the method on `ty` (or the nearest base type) that implements
    /// the given interface method. Returns [`None`] when the lookup fails;
    /// callers treat that as best-effort and skip the dependent update.
    #[must_use]
    pub fn find_interface_implementation(
        &self,
        ty: TypeId,
        interface_method: MethodId,
    ) -> Option<MethodId> {
        self.base_chain(ty).find_map(|current| {
            self.methods_of(current)
                .iter()
                .copied()
                .find(|&m| self.method(m).implements == Some(interface_method))
        })
    }

    /// Iterates `ty`, its base, its base's base, and so on.
    fn base_chain(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(ty), |&current| self.type_def(current).base)
    }
}
