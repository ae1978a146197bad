use super::code::SynLabel;
use super::verifier::Frame;
use crate::util::Offset;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// An instruction could not be applied to the live frame
    FrameError {
        instruction: String,
        offset: Offset,
        kind: FrameErrorKind,
    },

    /// Code is being emitted at an offset that can't be reached (eg. right after a `goto`)
    ///
    /// This is fixable by placing a label that has been jumped to before emitting more code.
    UnreachableCode(Offset),

    MethodCodeOverflow(Offset),
    MethodCodeMaxStackOverflow(Offset),
    MethodCodeMaxLocalsOverflow(Offset),

    MethodCodeNotFinished {
        falls_off_end: bool,
        unplaced_labels: Vec<SynLabel>,
    },

    /// A label is placed before it has ever been referred to
    ///
    /// This is fixable by making sure you place the label _after_ some jump to it.
    PlacingLabelBeforeReference(SynLabel),

    LabelAlreadyPlaced(SynLabel),

    /// The label was delegated to another label, so it can't be used anymore
    LabelDelegated(SynLabel),

    /// Case and handler labels can't take part in jump reconciliation
    NonStandardLabel(SynLabel),

    /// A label needs to have incompatible frames
    IncompatibleFrames(SynLabel, Frame<String, String>, Frame<String, String>),

    /// An offset requires a frame, but none was ever recorded there (indicates a bug)
    MissingFrame(Offset),

    BadDescriptor(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameErrorKind {
    EmptyStack,
    InvalidWidth(usize),
    NotArrayType,
    InvalidLocal(u16),
    InvalidType,
    InvalidConstant,
}

impl fmt::Display for FrameErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameErrorKind::EmptyStack => f.write_str("stack underflow"),
            FrameErrorKind::InvalidWidth(width) => {
                write!(f, "unexpected value of width {} on the stack", width)
            }
            FrameErrorKind::NotArrayType => f.write_str("expected an array on the stack"),
            FrameErrorKind::InvalidLocal(slot) => write!(f, "local {} is not addressable", slot),
            FrameErrorKind::InvalidType => f.write_str("unexpected type"),
            FrameErrorKind::InvalidConstant => f.write_str("constant can't be loaded by this instruction"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FrameError {
                instruction,
                offset,
                kind,
            } => write!(f, "{} at offset {}: {}", instruction, offset.0, kind),
            Error::UnreachableCode(offset) => {
                write!(f, "code at offset {} is unreachable", offset.0)
            }
            Error::MethodCodeOverflow(offset) => {
                write!(f, "method code is too long ({} bytes)", offset.0)
            }
            Error::MethodCodeMaxStackOverflow(offset) => {
                write!(f, "method stack is too deep ({} words)", offset.0)
            }
            Error::MethodCodeMaxLocalsOverflow(offset) => {
                write!(f, "method has too many locals ({} words)", offset.0)
            }
            Error::MethodCodeNotFinished {
                falls_off_end,
                unplaced_labels,
            } => {
                f.write_str("method code is not finished")?;
                if *falls_off_end {
                    f.write_str(", last instruction falls off the end")?;
                }
                if !unplaced_labels.is_empty() {
                    write!(f, ", labels never placed: {:?}", unplaced_labels)?;
                }
                Ok(())
            }
            Error::PlacingLabelBeforeReference(label) => {
                write!(f, "label {:?} is unreachable", label)
            }
            Error::LabelAlreadyPlaced(label) => write!(f, "label {:?} is already placed", label),
            Error::LabelDelegated(label) => {
                write!(f, "label {:?} was delegated to another label", label)
            }
            Error::NonStandardLabel(label) => {
                write!(f, "label {:?} is a case or handler label", label)
            }
            Error::IncompatibleFrames(label, stored, found) => write!(
                f,
                "incompatible frames for label {:?}: expected {:?}, found {:?}",
                label, stored, found
            ),
            Error::MissingFrame(offset) => write!(f, "no frame recorded at offset {}", offset.0),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
