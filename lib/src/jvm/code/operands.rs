use crate::jvm::{BinaryName, FieldType, MethodDescriptor, RefType, UnqualifiedName};

/// Resolved field referenced by `getfield`, `putstatic`, etc.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType<BinaryName>,
}

/// Resolved method referenced by the `invoke*` instructions (except `invokedynamic`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

impl MethodRef {
    /// Is this an instance initialization method?
    pub fn is_init(&self) -> bool {
        self.name.is_init()
    }
}

/// Call site of an `invokedynamic`
///
/// The bootstrap method doesn't matter for frame tracking, only the descriptor of the call site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvokeDynamicRef {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor<BinaryName>,
}

/// Loadable constant, for `ldc`, `ldc_w`, and `ldc2_w`
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(RefType<BinaryName>),
    MethodType(MethodDescriptor<BinaryName>),
    MethodHandle,
}

impl Constant {
    /// Does this constant take up two words once loaded?
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}
