use crate::jvm::{BaseType, BinaryName, FieldType, RefType, RenderDescriptor};
use crate::util::{Offset, Width};
use std::fmt;

/// These types are from [this hierarchy][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable slot (only ever shows up when filling gaps in the locals of an encoded frame)
    Top,

    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called but `<init>` has not been called
    ///
    ///   - while emitting code, we use [`UninitializedRef`] for `U`, which carries the allocation
    ///     site that produced the value
    ///   - when handing frames to the attribute encoder, only the offset of the `new` matters
    Uninitialized(U),
}

/// Verification types as they are tracked during emission
pub type VType = VerificationType<RefType<BinaryName>, UninitializedRef>;

impl<Cls, U> VerificationType<Cls, U> {
    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VerificationType::Null
                | VerificationType::UninitializedThis
                | VerificationType::Object(_)
                | VerificationType::Uninitialized(_)
        )
    }

    pub fn map<C2, U2>(
        &self,
        map_class: impl Fn(&Cls) -> C2,
        map_uninitialized: impl Fn(&U) -> U2,
    ) -> VerificationType<C2, U2> {
        match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit))
            }
        }
    }
}

impl<C, U> From<FieldType<C>> for VerificationType<RefType<C>, U> {
    fn from(field_type: FieldType<C>) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type),
        }
    }
}

impl<Cls, A> Width for VerificationType<Cls, A> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

impl<Cls: fmt::Display, U: fmt::Display> fmt::Display for VerificationType<Cls, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationType::Top => f.write_str("top"),
            VerificationType::Integer => f.write_str("int"),
            VerificationType::Float => f.write_str("float"),
            VerificationType::Double => f.write_str("double"),
            VerificationType::Long => f.write_str("long"),
            VerificationType::Null => f.write_str("null"),
            VerificationType::UninitializedThis => f.write_str("uninitializedThis"),
            VerificationType::Object(cls) => write!(f, "{}", cls),
            VerificationType::Uninitialized(uninit) => write!(f, "uninitialized({})", uninit),
        }
    }
}

/// Identifies one `new` instruction within a method body
///
/// Every value that flows out of the same `new` carries the same site, no matter how many times
/// it gets duplicated, stored, or captured in a snapshot. Completing the constructor call
/// initializes exactly the values with a matching site.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub struct AllocationSite(pub u32);

impl AllocationSite {
    /// Get the next fresh site
    pub fn next(&self) -> AllocationSite {
        AllocationSite(self.0 + 1)
    }
}

/// During code generation, after a `new` instruction, the top of the stack will contain an
/// uninitialized value. The encoded stack map frame only needs the offset of that `new`, but
/// while emitting we also want to know what type the value will have once initialized.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct UninitializedRef {
    /// Allocation the value came from
    pub site: AllocationSite,

    /// Offset of the `new` instruction from the start of the method body
    pub new_offset: Offset,

    /// Once the type is initialized, what will it be?
    pub class: BinaryName,
}

impl fmt::Display for UninitializedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.class, self.new_offset.0)
    }
}

impl VType {
    /// Render the type with plain strings, for error messages and listings
    pub fn into_printable(&self) -> VerificationType<String, String> {
        self.map(
            |ref_type| match ref_type {
                RefType::Object(cls) => cls.to_string(),
                array_type => array_type.render(),
            },
            |uninit| uninit.to_string(),
        )
    }
}
