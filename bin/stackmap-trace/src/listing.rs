//! Textual bytecode listings
//!
//! A listing is a sequence of lines, each one of:
//!
//!   - `class <binary name>` to set the class of the methods that follow
//!   - `method [static] <name> <descriptor>` to start a new method body
//!   - `<label>:` to place a label
//!   - an instruction mnemonic followed by its operands (eg. `iload 1`, `goto loop`)
//!   - a directive: `.case <label>...`, `.handler <label>...`, `.try <handler> [class]`,
//!     `.scope`, `.endscope`, or `.delegate <from> <to>`
//!
//! Everything after a `#` is a comment.

use crate::error::TraceError;
use stackmap::jvm;
use stackmap::jvm::code::{
    BranchInstruction, CompareMode, Constant, EqComparison, FieldRef, FrameTable, FrameTracker,
    Instruction, InvokeDynamicRef, InvokeType, LabelKind, LabelPlacement, MethodRef,
    MethodSignature, OrdComparison, ScopeToken, ShiftType, SynLabel,
};
use stackmap::jvm::{
    BaseType, BinaryName, FieldType, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor,
    RefType, RenderDescriptor, UnqualifiedName,
};
use stackmap::util::Offset;
use stackmap::TrackerSettings;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Frames tracked for one method of a listing
pub struct TracedMethod {
    pub signature: MethodSignature,
    pub table: FrameTable,

    /// Offsets of `goto` instructions that were dropped
    pub elided_gotos: Vec<Offset>,
}

enum LineError {
    Syntax(String),
    Tracker(jvm::Error),
}

impl From<String> for LineError {
    fn from(message: String) -> LineError {
        LineError::Syntax(message)
    }
}

impl From<jvm::Error> for LineError {
    fn from(error: jvm::Error) -> LineError {
        LineError::Tracker(error)
    }
}

struct MethodInProgress {
    /// Line of the `method` header
    start_line: usize,
    tracker: FrameTracker,
    labels: HashMap<String, SynLabel>,
    scopes: Vec<ScopeToken>,
    elided_gotos: Vec<Offset>,
}

impl MethodInProgress {
    /// Get the label with this name, making a fresh one the first time
    fn label(&mut self, name: &str) -> SynLabel {
        if let Some(label) = self.labels.get(name) {
            return *label;
        }
        let label = self.tracker.fresh_label();
        let _ = self.labels.insert(name.to_owned(), label);
        label
    }

    fn declare_label(&mut self, name: &str, kind: LabelKind) -> Result<(), String> {
        if self.labels.contains_key(name) {
            return Err(format!("label `{}` is used before it is declared", name));
        }
        let label = self.tracker.fresh_label_with_kind(kind);
        let _ = self.labels.insert(name.to_owned(), label);
        Ok(())
    }

    fn trace_line(&mut self, keyword: &str, operands: &[&str]) -> Result<(), LineError> {
        if let Some(name) = keyword.strip_suffix(':') {
            no_operands(operands)?;
            let label = self.label(name);
            if let LabelPlacement::ElidedGoto { goto_at } = self.tracker.place_label(label)? {
                self.elided_gotos.push(goto_at);
            }
            return Ok(());
        }

        match keyword {
            ".case" | ".handler" => {
                let kind = if keyword == ".case" {
                    LabelKind::Case
                } else {
                    LabelKind::Handler
                };
                for name in operands {
                    self.declare_label(name, kind)?;
                }
            }
            ".try" => {
                let (handler, catch_type) = match operands {
                    [handler] => (handler, None),
                    [handler, class] => (handler, Some(binary_name(class)?)),
                    _ => return Err(String::from("expected `.try <handler> [class]`").into()),
                };
                let handler = self.label(handler);
                self.tracker.begin_exception_range(handler, catch_type)?;
            }
            ".scope" => {
                no_operands(operands)?;
                let scope = self.tracker.open_scope()?;
                self.scopes.push(scope);
            }
            ".endscope" => {
                no_operands(operands)?;
                let scope = self
                    .scopes
                    .pop()
                    .ok_or_else(|| String::from("no scope to close"))?;
                self.tracker.close_scope(scope);
            }
            ".delegate" => match operands {
                [from, to] => {
                    let from = self.label(from);
                    let to = self.label(to);
                    self.tracker.delegate_label(from, to)?;
                }
                _ => return Err(String::from("expected `.delegate <from> <to>`").into()),
            },
            _ => {
                if let Some(insn) = parse_instruction(keyword, operands)? {
                    self.tracker.push_instruction(insn)?;
                    return Ok(());
                }
                let branch = parse_branch(keyword, operands, &mut |name| self.label(name))?;
                match branch {
                    Some(insn) => self.tracker.push_branch_instruction(insn)?,
                    None => return Err(format!("unknown instruction `{}`", keyword).into()),
                }
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<TracedMethod, TraceError> {
        let line = self.start_line;
        if !self.scopes.is_empty() {
            log::warn!("method starting at line {} has unclosed scopes", line);
        }
        let signature = self.tracker.method().clone();
        let table = self
            .tracker
            .result()
            .map_err(|error| TraceError::Tracker { line, error })?;
        Ok(TracedMethod {
            signature,
            table,
            elided_gotos: self.elided_gotos,
        })
    }
}

/// Track the frames of every method in a listing
pub fn trace_listing(
    source: &str,
    settings: &TrackerSettings,
) -> Result<Vec<TracedMethod>, TraceError> {
    let mut class: Option<BinaryName> = None;
    let mut current: Option<MethodInProgress> = None;
    let mut traced = vec![];

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw_line.split('#').next().unwrap_or_default();
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let (keyword, operands) = match tokens.split_first() {
            Some((keyword, operands)) => (*keyword, operands),
            None => continue,
        };
        let syntax = |message: String| TraceError::Syntax { line, message };

        match keyword {
            "class" => {
                let name = single_operand(operands)
                    .and_then(binary_name)
                    .map_err(syntax)?;
                class = Some(name);
            }
            "method" => {
                if let Some(method) = current.take() {
                    traced.push(method.finish()?);
                }
                let class = class
                    .clone()
                    .ok_or_else(|| syntax(String::from("`method` before any `class` line")))?;
                let signature = parse_method_header(class, operands).map_err(syntax)?;
                log::info!(
                    "Tracking {}.{}{}",
                    signature.class,
                    signature.name,
                    signature.descriptor.render()
                );
                let tracker = FrameTracker::new(signature, settings.clone())
                    .map_err(|error| TraceError::Tracker { line, error })?;
                current = Some(MethodInProgress {
                    start_line: line,
                    tracker,
                    labels: HashMap::new(),
                    scopes: vec![],
                    elided_gotos: vec![],
                });
            }
            _ => {
                let method = current
                    .as_mut()
                    .ok_or(TraceError::NotInsideMethod { line })?;
                method
                    .trace_line(keyword, operands)
                    .map_err(|err| match err {
                        LineError::Syntax(message) => TraceError::Syntax { line, message },
                        LineError::Tracker(error) => TraceError::Tracker { line, error },
                    })?;
            }
        }
    }

    if let Some(method) = current.take() {
        traced.push(method.finish()?);
    }
    Ok(traced)
}

/// Write out the frame table of a traced method
pub fn render(method: &TracedMethod, out: &mut impl fmt::Write) -> fmt::Result {
    let signature = &method.signature;
    let table = &method.table;
    writeln!(
        out,
        "{}.{}{}",
        signature.class,
        signature.name,
        signature.descriptor.render()
    )?;
    writeln!(
        out,
        "  code_length {}, max_stack {}, max_locals {}",
        table.code_length, table.max_stack, table.max_locals
    )?;
    for goto_at in &method.elided_gotos {
        writeln!(out, "  dropped goto at {}", goto_at.0)?;
    }
    for (offset, frame) in &table.frames {
        let frame = frame.into_printable();
        let locals: Vec<String> = frame
            .locals_for_encoding()
            .iter()
            .map(|typ| typ.to_string())
            .collect();
        let stack: Vec<String> = frame
            .stack_for_encoding()
            .iter()
            .map(|typ| typ.to_string())
            .collect();
        writeln!(
            out,
            "  {:>5}: locals [{}] stack [{}]",
            offset.0,
            locals.join(", "),
            stack.join(", ")
        )?;
    }
    Ok(())
}

fn parse_method_header(class: BinaryName, operands: &[&str]) -> Result<MethodSignature, String> {
    let (access_flags, name, descriptor) = match operands {
        ["static", name, descriptor] => (MethodAccessFlags::STATIC, name, descriptor),
        [name, descriptor] => (MethodAccessFlags::PUBLIC, name, descriptor),
        _ => return Err(String::from("expected `method [static] <name> <descriptor>`")),
    };
    Ok(MethodSignature {
        class,
        name: UnqualifiedName::from_string(name.to_string())?,
        descriptor: MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?,
        access_flags,
    })
}

fn no_operands(operands: &[&str]) -> Result<(), String> {
    if operands.is_empty() {
        Ok(())
    } else {
        Err(format!("unexpected operands {:?}", operands))
    }
}

fn single_operand<'a>(operands: &[&'a str]) -> Result<&'a str, String> {
    match operands {
        [operand] => Ok(operand),
        _ => Err(format!("expected one operand, found {}", operands.len())),
    }
}

fn number<T: FromStr>(operand: &str) -> Result<T, String> {
    operand
        .parse()
        .map_err(|_| format!("invalid number `{}`", operand))
}

fn binary_name(name: &str) -> Result<BinaryName, String> {
    BinaryName::from_string(name.to_owned())
}

/// Either a class name (`java/lang/String`) or an array descriptor (`[[I`)
fn ref_type(operand: &str) -> Result<RefType<BinaryName>, String> {
    if operand.starts_with('[') {
        RefType::parse(operand).map_err(|err| err.to_string())
    } else {
        Ok(RefType::Object(binary_name(operand)?))
    }
}

/// `owner/Class.name:descriptor`
fn field_ref(operand: &str) -> Result<FieldRef, String> {
    let invalid = || format!("expected `Class.name:descriptor`, found `{}`", operand);
    let (qualified, descriptor) = operand.split_once(':').ok_or_else(invalid)?;
    let (class, name) = qualified.rsplit_once('.').ok_or_else(invalid)?;
    Ok(FieldRef {
        class: binary_name(class)?,
        name: UnqualifiedName::from_string(name.to_owned())?,
        descriptor: FieldType::parse(descriptor).map_err(|err| err.to_string())?,
    })
}

/// `owner/Class.name(descriptor)`
fn method_ref(operand: &str) -> Result<MethodRef, String> {
    let invalid = || format!("expected `Class.name(descriptor)`, found `{}`", operand);
    let paren = operand.find('(').ok_or_else(invalid)?;
    let (qualified, descriptor) = operand.split_at(paren);
    let (class, name) = qualified.rsplit_once('.').ok_or_else(invalid)?;
    Ok(MethodRef {
        class: binary_name(class)?,
        name: UnqualifiedName::from_string(name.to_owned())?,
        descriptor: MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?,
    })
}

/// `name(descriptor)`
fn call_site(operand: &str) -> Result<InvokeDynamicRef, String> {
    let paren = operand
        .find('(')
        .ok_or_else(|| format!("expected `name(descriptor)`, found `{}`", operand))?;
    let (name, descriptor) = operand.split_at(paren);
    Ok(InvokeDynamicRef {
        name: UnqualifiedName::from_string(name.to_owned())?,
        descriptor: MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?,
    })
}

/// `int 1`, `long 1`, `float 1.5`, `double 1.5`, `string some text`, `class java/lang/Object`,
/// `methodtype (I)V`, or `methodhandle`
fn constant(operands: &[&str]) -> Result<Constant, String> {
    match operands {
        ["int", value] => Ok(Constant::Integer(number(value)?)),
        ["long", value] => Ok(Constant::Long(number(value)?)),
        ["float", value] => Ok(Constant::Float(number(value)?)),
        ["double", value] => Ok(Constant::Double(number(value)?)),
        ["string", words @ ..] => Ok(Constant::String(words.join(" "))),
        ["class", class] => Ok(Constant::Class(ref_type(class)?)),
        ["methodtype", descriptor] => Ok(Constant::MethodType(
            MethodDescriptor::parse(descriptor).map_err(|err| err.to_string())?,
        )),
        ["methodhandle"] => Ok(Constant::MethodHandle),
        _ => Err(format!("invalid constant {:?}", operands)),
    }
}

fn base_type(operand: &str) -> Result<BaseType, String> {
    match operand {
        "boolean" => Ok(BaseType::Boolean),
        "char" => Ok(BaseType::Char),
        "float" => Ok(BaseType::Float),
        "double" => Ok(BaseType::Double),
        "byte" => Ok(BaseType::Byte),
        "short" => Ok(BaseType::Short),
        "int" => Ok(BaseType::Int),
        "long" => Ok(BaseType::Long),
        other => Err(format!("invalid primitive type `{}`", other)),
    }
}

/// Instructions without operands
fn bare_instruction(mnemonic: &str) -> Option<Instruction> {
    use Instruction::*;

    let insn = match mnemonic {
        "nop" => Nop,
        "aconst_null" => AConstNull,
        "iconst_m1" => IConstM1,
        "iconst_0" => IConst0,
        "iconst_1" => IConst1,
        "iconst_2" => IConst2,
        "iconst_3" => IConst3,
        "iconst_4" => IConst4,
        "iconst_5" => IConst5,
        "lconst_0" => LConst0,
        "lconst_1" => LConst1,
        "fconst_0" => FConst0,
        "fconst_1" => FConst1,
        "fconst_2" => FConst2,
        "dconst_0" => DConst0,
        "dconst_1" => DConst1,
        "iaload" => IALoad,
        "laload" => LALoad,
        "faload" => FALoad,
        "daload" => DALoad,
        "aaload" => AALoad,
        "baload" => BALoad,
        "caload" => CALoad,
        "saload" => SALoad,
        "iastore" => IAStore,
        "lastore" => LAStore,
        "fastore" => FAStore,
        "dastore" => DAStore,
        "aastore" => AAStore,
        "bastore" => BAStore,
        "castore" => CAStore,
        "sastore" => SAStore,
        "pop" => Pop,
        "pop2" => Pop2,
        "dup" => Dup,
        "dup_x1" => DupX1,
        "dup_x2" => DupX2,
        "dup2" => Dup2,
        "dup2_x1" => Dup2X1,
        "dup2_x2" => Dup2X2,
        "swap" => Swap,
        "iadd" => IAdd,
        "ladd" => LAdd,
        "fadd" => FAdd,
        "dadd" => DAdd,
        "isub" => ISub,
        "lsub" => LSub,
        "fsub" => FSub,
        "dsub" => DSub,
        "imul" => IMul,
        "lmul" => LMul,
        "fmul" => FMul,
        "dmul" => DMul,
        "idiv" => IDiv,
        "ldiv" => LDiv,
        "fdiv" => FDiv,
        "ddiv" => DDiv,
        "irem" => IRem,
        "lrem" => LRem,
        "frem" => FRem,
        "drem" => DRem,
        "ineg" => INeg,
        "lneg" => LNeg,
        "fneg" => FNeg,
        "dneg" => DNeg,
        "ishl" => ISh(ShiftType::Left),
        "ishr" => ISh(ShiftType::ArithmeticRight),
        "iushr" => ISh(ShiftType::LogicalRight),
        "lshl" => LSh(ShiftType::Left),
        "lshr" => LSh(ShiftType::ArithmeticRight),
        "lushr" => LSh(ShiftType::LogicalRight),
        "iand" => IAnd,
        "land" => LAnd,
        "ior" => IOr,
        "lor" => LOr,
        "ixor" => IXor,
        "lxor" => LXor,
        "i2l" => I2L,
        "i2f" => I2F,
        "i2d" => I2D,
        "l2i" => L2I,
        "l2f" => L2F,
        "l2d" => L2D,
        "f2i" => F2I,
        "f2l" => F2L,
        "f2d" => F2D,
        "d2i" => D2I,
        "d2l" => D2L,
        "d2f" => D2F,
        "i2b" => I2B,
        "i2c" => I2C,
        "i2s" => I2S,
        "lcmp" => LCmp,
        "fcmpl" => FCmp(CompareMode::L),
        "fcmpg" => FCmp(CompareMode::G),
        "dcmpl" => DCmp(CompareMode::L),
        "dcmpg" => DCmp(CompareMode::G),
        "arraylength" => ArrayLength,
        "monitorenter" => MonitorEnter,
        "monitorexit" => MonitorExit,
        _ => return None,
    };
    Some(insn)
}

/// Loads and stores, either as `iload 4` or `iload_2`
fn local_instruction(mnemonic: &str, operands: &[&str]) -> Result<Option<Instruction>, String> {
    let (base, slot) = match mnemonic.split_once('_') {
        Some((base, slot @ ("0" | "1" | "2" | "3"))) => {
            no_operands(operands)?;
            (base, number(slot)?)
        }
        Some(_) => return Ok(None),
        None => (mnemonic, 0),
    };
    let local: fn(u16) -> Instruction = match base {
        "iload" => Instruction::ILoad,
        "lload" => Instruction::LLoad,
        "fload" => Instruction::FLoad,
        "dload" => Instruction::DLoad,
        "aload" => Instruction::ALoad,
        "istore" => Instruction::IStore,
        "lstore" => Instruction::LStore,
        "fstore" => Instruction::FStore,
        "dstore" => Instruction::DStore,
        "astore" => Instruction::AStore,
        _ => return Ok(None),
    };
    if mnemonic == base {
        Ok(Some(local(number(single_operand(operands)?)?)))
    } else {
        Ok(Some(local(slot)))
    }
}

fn parse_instruction(mnemonic: &str, operands: &[&str]) -> Result<Option<Instruction>, String> {
    use Instruction::*;

    if let Some(insn) = bare_instruction(mnemonic) {
        no_operands(operands)?;
        return Ok(Some(insn));
    }
    if let Some(insn) = local_instruction(mnemonic, operands)? {
        return Ok(Some(insn));
    }

    let insn = match mnemonic {
        "bipush" => BiPush(number(single_operand(operands)?)?),
        "sipush" => SiPush(number(single_operand(operands)?)?),
        "ldc" => Ldc(constant(operands)?),
        "ldc_w" => LdcW(constant(operands)?),
        "ldc2_w" => Ldc2W(constant(operands)?),
        "iinc" => match operands {
            [slot, delta] => IInc(number(slot)?, number(delta)?),
            _ => return Err(String::from("expected `iinc <slot> <delta>`")),
        },
        "getstatic" => GetStatic(field_ref(single_operand(operands)?)?),
        "putstatic" => PutStatic(field_ref(single_operand(operands)?)?),
        "getfield" => GetField(field_ref(single_operand(operands)?)?),
        "putfield" => PutField(field_ref(single_operand(operands)?)?),
        "invokevirtual" => Invoke(InvokeType::Virtual, method_ref(single_operand(operands)?)?),
        "invokespecial" => Invoke(InvokeType::Special, method_ref(single_operand(operands)?)?),
        "invokestatic" => Invoke(InvokeType::Static, method_ref(single_operand(operands)?)?),
        "invokeinterface" => {
            let method = method_ref(single_operand(operands)?)?;
            let count = u8::try_from(method.descriptor.parameter_length(true))
                .map_err(|_| String::from("too many arguments for `invokeinterface`"))?;
            Invoke(InvokeType::Interface(count), method)
        }
        "invokedynamic" => InvokeDynamic(call_site(single_operand(operands)?)?),
        "new" => New(binary_name(single_operand(operands)?)?),
        "newarray" => NewArray(base_type(single_operand(operands)?)?),
        "anewarray" => ANewArray(ref_type(single_operand(operands)?)?),
        "multianewarray" => match operands {
            [array_type, dimensions] => MultiANewArray(ref_type(array_type)?, number(dimensions)?),
            _ => return Err(String::from("expected `multianewarray <type> <dimensions>`")),
        },
        "checkcast" => CheckCast(ref_type(single_operand(operands)?)?),
        "instanceof" => InstanceOf(ref_type(single_operand(operands)?)?),
        _ => return Ok(None),
    };
    Ok(Some(insn))
}

fn parse_branch(
    mnemonic: &str,
    operands: &[&str],
    label: &mut dyn FnMut(&str) -> SynLabel,
) -> Result<Option<BranchInstruction<SynLabel>>, String> {
    use BranchInstruction::*;

    let ord_comparison = |suffix: &str| match suffix {
        "eq" => Some(OrdComparison::EQ),
        "ne" => Some(OrdComparison::NE),
        "lt" => Some(OrdComparison::LT),
        "ge" => Some(OrdComparison::GE),
        "gt" => Some(OrdComparison::GT),
        "le" => Some(OrdComparison::LE),
        _ => None,
    };

    if let Some(op) = mnemonic.strip_prefix("if_icmp").and_then(ord_comparison) {
        return Ok(Some(IfICmp(op, label(single_operand(operands)?))));
    }
    if let Some(op) = mnemonic.strip_prefix("if").and_then(ord_comparison) {
        return Ok(Some(If(op, label(single_operand(operands)?))));
    }

    let insn = match mnemonic {
        "if_acmpeq" => IfACmp(EqComparison::EQ, label(single_operand(operands)?)),
        "if_acmpne" => IfACmp(EqComparison::NE, label(single_operand(operands)?)),
        "ifnull" => IfNull(EqComparison::EQ, label(single_operand(operands)?)),
        "ifnonnull" => IfNull(EqComparison::NE, label(single_operand(operands)?)),
        "goto" => Goto(label(single_operand(operands)?)),
        "goto_w" => GotoW(label(single_operand(operands)?)),
        "tableswitch" => match operands {
            [low, default, targets @ ..] => TableSwitch {
                default: label(default),
                low: number(low)?,
                targets: targets.iter().map(|target| label(target)).collect(),
            },
            _ => return Err(String::from("expected `tableswitch <low> <default> <labels>...`")),
        },
        "lookupswitch" => match operands {
            [default, targets @ ..] => {
                let default = label(default);
                let mut pairs = vec![];
                for target in targets {
                    let (key, target) = target
                        .split_once(':')
                        .ok_or_else(|| format!("expected `<key>:<label>`, found `{}`", target))?;
                    pairs.push((number(key)?, label(target)));
                }
                LookupSwitch {
                    default,
                    targets: pairs,
                }
            }
            _ => return Err(String::from("expected `lookupswitch <default> <key:label>...`")),
        },
        "ireturn" => IReturn,
        "lreturn" => LReturn,
        "freturn" => FReturn,
        "dreturn" => DReturn,
        "areturn" => AReturn,
        "return" => Return,
        "athrow" => AThrow,
        _ => return Ok(None),
    };
    if !insn.jump_targets().is_empty() || operands.is_empty() {
        Ok(Some(insn))
    } else {
        Err(format!("unexpected operands {:?}", operands))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const POINT: &str = "
        class me/example/Point
        method <init> (II)V
          aload_0
          invokespecial java/lang/Object.<init>()V   # super()
          return
    ";

    #[test]
    fn constructor() {
        let traced = trace_listing(POINT, &TrackerSettings::new()).unwrap();
        assert_eq!(traced.len(), 1);
        assert_eq!(traced[0].table.code_length, 5);
        assert_eq!(traced[0].table.max_locals, 3);
        assert!(traced[0].table.frames.is_empty());
    }

    #[test]
    fn loop_with_frames() {
        let listing = "
            class me/example/Loops
            method static count (I)I
              iconst_0
              istore 1
            top:
              iload_0
              ifle done
              iinc 1 1
              iinc 0 -1
              goto top
            done:
              iload_1
              ireturn
        ";
        let traced = trace_listing(listing, &TrackerSettings::new()).unwrap();
        let mut rendered = String::new();
        render(&traced[0], &mut rendered).unwrap();
        assert_eq!(
            rendered,
            "me/example/Loops.count(I)I
  code_length 17, max_stack 1, max_locals 2
      2: locals [int, int] stack []
     15: locals [int, int] stack []
"
        );
    }

    #[test]
    fn dropped_goto_and_scopes() {
        let listing = "
            class me/example/Scopes
            method static run ()V
            .scope
              lconst_1
              lstore_0
              goto next
            next:
            .endscope
              return
        ";
        let traced = trace_listing(listing, &TrackerSettings::new()).unwrap();
        assert_eq!(traced[0].elided_gotos, vec![Offset(2)]);
        assert_eq!(traced[0].table.code_length, 3);
        assert_eq!(traced[0].table.max_locals, 2);
    }

    #[test]
    fn handlers_and_switches() {
        let listing = "
            class me/example/Handlers
            method static pick (I)I
            .handler oops
            .case one two
            .try oops java/lang/ArithmeticException
              iload_0
              lookupswitch two 1:one
            one:
              iconst_1
              ireturn
            two:
              iconst_2
              ireturn
            oops:
              pop
              iconst_m1
              ireturn
        ";
        let traced = trace_listing(listing, &TrackerSettings::new()).unwrap();
        let offsets: Vec<usize> = traced[0]
            .table
            .frames
            .iter()
            .map(|(offset, _)| offset.0)
            .collect();
        assert_eq!(offsets, vec![20, 22, 24]);
        let (_, handler) = &traced[0].table.frames[2];
        assert_eq!(
            handler.stack_for_encoding(),
            vec![stackmap::jvm::verifier::VerificationType::Object(
                RefType::Object(binary_name("java/lang/ArithmeticException").unwrap())
            )]
        );
    }

    #[test]
    fn errors_carry_lines() {
        let listing = "class me/example/Bad\nmethod static run ()V\n  iadd\n";
        assert!(matches!(
            trace_listing(listing, &TrackerSettings::new()),
            Err(TraceError::Tracker { line: 3, .. })
        ));

        assert!(matches!(
            trace_listing("  nop\n", &TrackerSettings::new()),
            Err(TraceError::NotInsideMethod { line: 1 })
        ));

        let listing = "class me/example/Bad\nmethod static run ()V\n  frobnicate\n";
        assert!(matches!(
            trace_listing(listing, &TrackerSettings::new()),
            Err(TraceError::Syntax { line: 3, .. })
        ));
    }
}
