/// Knobs controlling how a [`FrameTracker`](crate::jvm::code::FrameTracker) records frames
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Record the entry frame of the method at offset 0
    ///
    /// The verifier derives the entry frame from the method descriptor, so the frame at offset 0
    /// is only _encoded_ if something jumps back there. Recording it anyway means the frame can
    /// always be looked up.
    pub record_entry_frame: bool,

    /// Drop a `goto` whose target label gets placed right after it
    ///
    /// The caller is told about this through [`LabelPlacement::ElidedGoto`] and is responsible for
    /// deleting the 3 bytes of the `goto`.
    ///
    /// [`LabelPlacement::ElidedGoto`]: crate::jvm::code::LabelPlacement::ElidedGoto
    pub elide_redundant_gotos: bool,

    /// Reject control flow merges whose frames don't have identical types
    ///
    /// When this is off, the first frame to reach a label wins and a mismatch is only logged. The
    /// verifier will have the final say on whether the merge is sound.
    pub strict_merges: bool,

    /// Record (and require) a frame at the offset where a lexical scope closes
    pub frame_at_scope_exit: bool,

    /// Maximum length of method code, in bytes
    pub max_code_length: usize,
}

impl TrackerSettings {
    /// Longest method body the class file format allows
    pub const MAX_CODE_LENGTH: usize = 65535;

    pub fn new() -> TrackerSettings {
        TrackerSettings {
            record_entry_frame: true,
            elide_redundant_gotos: true,
            strict_merges: false,
            frame_at_scope_exit: false,
            max_code_length: TrackerSettings::MAX_CODE_LENGTH,
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> TrackerSettings {
        TrackerSettings::new()
    }
}
