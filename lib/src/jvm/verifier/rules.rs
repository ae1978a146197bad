use super::*;
use crate::jvm::code::{BranchInstruction, Constant, Instruction, InvokeType};
use crate::jvm::{BinaryName, FieldType, FrameErrorKind, RefType};
use crate::util::{Offset, Width};

impl VerifierFrame {
    /// Update the frame to reflect the effects of the given (non-branching) instruction
    ///
    /// `insn_offset` is the offset of the instruction in the method and `allocation_site` is the
    /// site given to the value pushed by a `new` (ignored for every other instruction).
    /// `this_class` is the class whose constructor completes on `invokespecial` of an
    /// `UninitializedThis` receiver.
    ///
    /// On error, the frame may be left partially updated.
    pub fn apply_instruction(
        &mut self,
        insn: &Instruction,
        insn_offset: Offset,
        allocation_site: AllocationSite,
        this_class: &BinaryName,
    ) -> Result<(), FrameErrorKind> {
        use Instruction::*;
        use VerificationType::*;

        match insn {
            Nop => (),
            AConstNull => self.push(Null),
            IConstM1 | IConst0 | IConst1 | IConst2 | IConst3 | IConst4 | IConst5 => {
                self.push(Integer)
            }
            LConst0 | LConst1 => self.push(Long),
            FConst0 | FConst1 | FConst2 => self.push(Float),
            DConst0 | DConst1 => self.push(Double),
            BiPush(_) | SiPush(_) => self.push(Integer),
            Ldc(constant) | LdcW(constant) => {
                if constant.is_wide() {
                    return Err(FrameErrorKind::InvalidConstant);
                }
                self.push(constant_type(constant));
            }
            Ldc2W(constant) => {
                if !constant.is_wide() {
                    return Err(FrameErrorKind::InvalidConstant);
                }
                self.push(constant_type(constant));
            }

            ILoad(slot) | LLoad(slot) | FLoad(slot) | DLoad(slot) | ALoad(slot) => {
                let typ = self.get_local(*slot)?.clone();
                self.push(typ);
            }

            IALoad | BALoad | CALoad | SALoad => {
                self.pop()?;
                self.replace_with_element_type(Integer)?;
            }
            LALoad => {
                self.pop()?;
                self.replace_with_element_type(Long)?;
            }
            FALoad => {
                self.pop()?;
                self.replace_with_element_type(Float)?;
            }
            DALoad => {
                self.pop()?;
                self.replace_with_element_type(Double)?;
            }
            AALoad => {
                self.pop()?;
                self.replace_with_element_type(Null)?;
            }

            IStore(slot) | LStore(slot) | FStore(slot) | DStore(slot) | AStore(slot) => {
                let typ = self.pop()?;
                self.set_local(*slot, typ)?;
            }

            // Array, index, and value are one entry each (even if the value is wide)
            IAStore | LAStore | FAStore | DAStore | AAStore | BAStore | CAStore | SAStore => {
                self.pop_n(3)?;
            }

            Pop => {
                let _ = self.pop_expecting_width(1)?;
            }

            Pop2 => {
                let arg1 = self.pop()?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let _ = self.pop_expecting_width(1)?;
                    }

                    // Form 2
                    2 => (),

                    other => return Err(FrameErrorKind::InvalidWidth(other)),
                }
            }

            Dup => {
                let arg1 = self.pop_expecting_width(1)?;
                self.push(arg1.clone());
                self.push(arg1);
            }

            DupX1 => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop_expecting_width(1)?;
                self.push(arg1.clone());
                self.push(arg2);
                self.push(arg1);
            }

            DupX2 => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop()?;
                match arg2.width() {
                    // Form 1
                    1 => {
                        let arg3 = self.pop_expecting_width(1)?;
                        self.push(arg1.clone());
                        self.push(arg3);
                        self.push(arg2);
                        self.push(arg1);
                    }

                    // Form 2
                    2 => {
                        self.push(arg1.clone());
                        self.push(arg2);
                        self.push(arg1);
                    }

                    other => return Err(FrameErrorKind::InvalidWidth(other)),
                }
            }

            Dup2 => {
                let arg1 = self.pop()?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        self.push(arg2.clone());
                        self.push(arg1.clone());
                        self.push(arg2);
                        self.push(arg1);
                    }

                    // Form 2
                    2 => {
                        self.push(arg1.clone());
                        self.push(arg1);
                    }

                    other => return Err(FrameErrorKind::InvalidWidth(other)),
                }
            }

            Dup2X1 => {
                let arg1 = self.pop()?;
                match arg1.width() {
                    // Form 1
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        let arg3 = self.pop_expecting_width(1)?;
                        self.push(arg2.clone());
                        self.push(arg1.clone());
                        self.push(arg3);
                        self.push(arg2);
                        self.push(arg1);
                    }

                    // Form 2
                    2 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        self.push(arg1.clone());
                        self.push(arg2);
                        self.push(arg1);
                    }

                    other => return Err(FrameErrorKind::InvalidWidth(other)),
                }
            }

            Dup2X2 => {
                let arg1 = self.pop()?;
                match arg1.width() {
                    1 => {
                        let arg2 = self.pop_expecting_width(1)?;
                        let arg3 = self.pop()?;
                        match arg3.width() {
                            // Form 1
                            1 => {
                                let arg4 = self.pop_expecting_width(1)?;
                                self.push(arg2.clone());
                                self.push(arg1.clone());
                                self.push(arg4);
                                self.push(arg3);
                                self.push(arg2);
                                self.push(arg1);
                            }

                            // Form 3
                            2 => {
                                self.push(arg2.clone());
                                self.push(arg1.clone());
                                self.push(arg3);
                                self.push(arg2);
                                self.push(arg1);
                            }

                            other => return Err(FrameErrorKind::InvalidWidth(other)),
                        }
                    }

                    2 => {
                        let arg2 = self.pop()?;
                        match arg2.width() {
                            // Form 2
                            1 => {
                                let arg3 = self.pop_expecting_width(1)?;
                                self.push(arg1.clone());
                                self.push(arg3);
                                self.push(arg2);
                                self.push(arg1);
                            }

                            // Form 4
                            2 => {
                                self.push(arg1.clone());
                                self.push(arg2);
                                self.push(arg1);
                            }

                            other => return Err(FrameErrorKind::InvalidWidth(other)),
                        }
                    }

                    other => return Err(FrameErrorKind::InvalidWidth(other)),
                }
            }

            Swap => {
                let arg1 = self.pop_expecting_width(1)?;
                let arg2 = self.pop_expecting_width(1)?;
                self.push(arg1);
                self.push(arg2);
            }

            IAdd | ISub | IDiv | IMul | IRem | IAnd | IOr | IXor | ISh(_) => {
                self.pop_n(2)?;
                self.push(Integer);
            }
            LAdd | LSub | LDiv | LMul | LRem | LAnd | LOr | LXor | LSh(_) => {
                self.pop_n(2)?;
                self.push(Long);
            }
            FAdd | FSub | FDiv | FMul | FRem => {
                self.pop_n(2)?;
                self.push(Float);
            }
            DAdd | DSub | DDiv | DMul | DRem => {
                self.pop_n(2)?;
                self.push(Double);
            }
            LCmp | FCmp(_) | DCmp(_) => {
                self.pop_n(2)?;
                self.push(Integer);
            }

            INeg | L2I | F2I | D2I | I2B | I2C | I2S => self.replace_top(Integer)?,
            LNeg | I2L | F2L | D2L => self.replace_top(Long)?,
            FNeg | I2F | L2F | D2F => self.replace_top(Float)?,
            DNeg | I2D | L2D | F2D => self.replace_top(Double)?,

            IInc(slot, _) => {
                let _ = self.get_local(*slot)?;
            }

            GetStatic(field) => self.push(VType::from(field.descriptor.clone())),
            PutStatic(_) => {
                self.pop()?;
            }
            GetField(field) => self.replace_top(VType::from(field.descriptor.clone()))?,
            PutField(_) => self.pop_n(2)?,

            Invoke(invoke_type, method) => {
                let desc = &method.descriptor;
                self.pop_n(desc.parameters.len())?;

                match invoke_type {
                    InvokeType::Static => (),
                    InvokeType::Special if method.is_init() => {
                        let receiver = self.pop()?;
                        self.initialize_receiver(&receiver, this_class)?;
                    }
                    InvokeType::Special | InvokeType::Virtual | InvokeType::Interface(_) => {
                        self.pop()?;
                    }
                }

                if let Some(return_type) = &desc.return_type {
                    self.push(VType::from(return_type.clone()));
                }
            }

            InvokeDynamic(call_site) => {
                let desc = &call_site.descriptor;
                self.pop_n(desc.parameters.len())?;
                if let Some(return_type) = &desc.return_type {
                    self.push(VType::from(return_type.clone()));
                }
            }

            New(class) => self.push(Uninitialized(UninitializedRef {
                site: allocation_site,
                new_offset: insn_offset,
                class: class.clone(),
            })),
            NewArray(base_type) => {
                self.replace_top(Object(RefType::array(FieldType::Base(*base_type))))?
            }
            ANewArray(ref_type) => {
                self.replace_top(Object(RefType::array(FieldType::Ref(ref_type.clone()))))?
            }
            MultiANewArray(array_type, dimensions) => {
                let array_dimensions = match array_type {
                    RefType::Object(_) => return Err(FrameErrorKind::NotArrayType),
                    RefType::ObjectArray(arr) => arr.dimensions(),
                    RefType::PrimitiveArray(arr) => arr.dimensions(),
                };
                if *dimensions == 0 || *dimensions as usize > array_dimensions {
                    return Err(FrameErrorKind::InvalidType);
                }
                self.pop_n(*dimensions as usize)?;
                self.push(Object(array_type.clone()));
            }
            ArrayLength => {
                match self.pop()? {
                    Null | Object(RefType::PrimitiveArray(_) | RefType::ObjectArray(_)) => (),
                    _ => return Err(FrameErrorKind::NotArrayType),
                }
                self.push(Integer);
            }

            CheckCast(ref_type) => self.replace_top(Object(ref_type.clone()))?,
            InstanceOf(_) => self.replace_top(Integer)?,

            MonitorEnter | MonitorExit => {
                self.pop()?;
            }
        }

        Ok(())
    }

    /// Update the frame to reflect the effects of the given branching instruction
    ///
    /// This only pops the operands of the instruction. Snapshots at the jump targets and the
    /// offsets that need frames are the business of the caller.
    pub fn apply_branch_instruction<Lbl>(
        &mut self,
        insn: &BranchInstruction<Lbl>,
    ) -> Result<(), FrameErrorKind> {
        use BranchInstruction::*;

        match insn {
            If(_, _) | IfNull(_, _) => {
                self.pop()?;
            }
            IfICmp(_, _) | IfACmp(_, _) => self.pop_n(2)?,
            Goto(_) | GotoW(_) => (),
            TableSwitch { .. } | LookupSwitch { .. } => {
                self.pop()?;
            }
            IReturn | LReturn | FReturn | DReturn | AReturn | AThrow => {
                self.pop()?;
            }
            Return => (),
        }

        Ok(())
    }
}

/// Type pushed by loading a constant
fn constant_type(constant: &Constant) -> VType {
    match constant {
        Constant::Integer(_) => VType::Integer,
        Constant::Float(_) => VType::Float,
        Constant::Long(_) => VType::Long,
        Constant::Double(_) => VType::Double,
        Constant::String(_) => VType::Object(RefType::Object(BinaryName::STRING)),
        Constant::Class(_) => VType::Object(RefType::Object(BinaryName::CLASS)),
        Constant::MethodType(_) => VType::Object(RefType::Object(BinaryName::METHODTYPE)),
        Constant::MethodHandle => VType::Object(RefType::Object(BinaryName::METHODHANDLE)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{BranchInstruction, CompareMode, FieldRef, MethodRef, OrdComparison};
    use crate::jvm::code::Instruction::*;
    use crate::jvm::{BaseType, MethodDescriptor, Name, UnqualifiedName};
    use VerificationType::*;

    fn class(name: &str) -> BinaryName {
        BinaryName::from_string(String::from(name)).unwrap()
    }

    fn object(name: &str) -> VType {
        Object(RefType::Object(class(name)))
    }

    fn new_frame<const N: usize, const M: usize>(
        locals: [(u16, VType); N],
        stack: [VType; M],
    ) -> VerifierFrame {
        Frame {
            pc: None,
            locals: locals.into_iter().collect(),
            stack: stack.into_iter().collect(),
        }
    }

    fn apply(frame: &mut VerifierFrame, insn: Instruction) -> Result<(), FrameErrorKind> {
        frame.apply_instruction(&insn, Offset(0), AllocationSite(0), &class("me/This"))
    }

    fn method(class_name: &str, name: &str, descriptor: &str) -> MethodRef {
        use crate::jvm::ParseDescriptor;
        MethodRef {
            class: class(class_name),
            name: UnqualifiedName::from_string(String::from(name)).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
        }
    }

    #[test]
    fn arithmetic() {
        let binops = [
            (Integer, vec![IAdd, ISub, IDiv, IMul, IRem, IAnd, IOr, IXor]),
            (Long, vec![LAdd, LSub, LDiv, LMul, LRem, LAnd, LOr, LXor]),
            (Float, vec![FAdd, FSub, FDiv, FMul, FRem]),
            (Double, vec![DAdd, DSub, DDiv, DMul, DRem]),
        ];

        for (typ, instructions) in binops {
            for instruction in instructions {
                let mut frame = new_frame([], [typ.clone(), typ.clone()]);
                assert_eq!(apply(&mut frame, instruction.clone()), Ok(()));
                assert_eq!(
                    frame,
                    new_frame([], [typ.clone()]),
                    "Output frame of {:?}",
                    instruction
                );

                let mut frame = new_frame([], [typ.clone()]);
                assert_eq!(
                    apply(&mut frame, instruction.clone()),
                    Err(FrameErrorKind::EmptyStack),
                    "Underflow of {:?}",
                    instruction
                );
            }
        }
    }

    #[test]
    fn comparisons_push_int() {
        for (typ, insn) in [
            (Long, LCmp),
            (Float, FCmp(CompareMode::L)),
            (Double, DCmp(CompareMode::G)),
        ] {
            let mut frame = new_frame([], [typ.clone(), typ]);
            apply(&mut frame, insn).unwrap();
            assert_eq!(frame.stack_for_encoding(), vec![Integer]);
        }
    }

    #[test]
    fn constants_and_loads() {
        let mut frame = new_frame([(0, object("me/Foo")), (1, Double)], []);
        apply(&mut frame, IConst2).unwrap();
        apply(&mut frame, LConst1).unwrap();
        apply(&mut frame, ALoad(0)).unwrap();
        apply(&mut frame, DLoad(1)).unwrap();
        apply(&mut frame, Ldc(Constant::String(String::from("hi")))).unwrap();
        apply(&mut frame, Ldc2W(Constant::Double(1.5))).unwrap();
        assert_eq!(
            frame.stack_for_encoding(),
            vec![
                Integer,
                Long,
                object("me/Foo"),
                Double,
                object("java/lang/String"),
                Double
            ]
        );
        assert_eq!(frame.stack.offset_len(), Offset(9));

        assert_eq!(
            apply(&mut frame, Ldc(Constant::Long(1))),
            Err(FrameErrorKind::InvalidConstant)
        );
        assert_eq!(
            apply(&mut frame, Ldc2W(Constant::Integer(1))),
            Err(FrameErrorKind::InvalidConstant)
        );
        assert_eq!(
            apply(&mut frame, ILoad(2)),
            Err(FrameErrorKind::InvalidLocal(2))
        );
    }

    #[test]
    fn category_two_store_and_load() {
        let mut frame = new_frame([], [Long]);
        apply(&mut frame, LStore(3)).unwrap();
        assert_eq!(frame.locals.len(), 1);
        assert_eq!(frame.get_local(3), Ok(&Long));
        assert_eq!(frame.get_local(4), Err(FrameErrorKind::InvalidLocal(4)));

        apply(&mut frame, LLoad(3)).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Long]);

        let mut max_locals = Offset(0);
        let mut max_stack = Offset(0);
        frame.update_maximums(&mut max_locals, &mut max_stack);
        assert_eq!(max_locals, Offset(5));
        assert_eq!(max_stack, Offset(2));
    }

    #[test]
    fn array_elements() {
        let ints = Object(RefType::array(FieldType::int()));
        let bytes = Object(RefType::array(FieldType::Base(BaseType::Byte)));
        let strings = Object(RefType::array(FieldType::object(BinaryName::STRING)));

        let mut frame = new_frame([], [ints, Integer]);
        apply(&mut frame, IALoad).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Integer]);

        let mut frame = new_frame([], [bytes, Integer]);
        apply(&mut frame, BALoad).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Integer]);

        let mut frame = new_frame([], [strings.clone(), Integer]);
        apply(&mut frame, AALoad).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![object("java/lang/String")]);

        let mut frame = new_frame([], [Null, Integer]);
        apply(&mut frame, DALoad).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Double]);

        let mut frame = new_frame([], [Integer, Integer]);
        assert_eq!(apply(&mut frame, IALoad), Err(FrameErrorKind::NotArrayType));

        let mut frame = new_frame([], [strings, Integer, Null]);
        apply(&mut frame, AAStore).unwrap();
        assert!(frame.stack.is_empty());

        let mut frame = new_frame([], [Null, Integer, Long]);
        apply(&mut frame, LAStore).unwrap();
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn pop2_forms() {
        let mut frame = new_frame([], [Integer, Float]);
        apply(&mut frame, Pop2).unwrap();
        assert!(frame.stack.is_empty());

        let mut frame = new_frame([], [Integer, Long]);
        apply(&mut frame, Pop2).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Integer]);

        let mut frame = new_frame([], [Long, Float]);
        assert_eq!(apply(&mut frame, Pop2), Err(FrameErrorKind::InvalidWidth(2)));

        let mut frame = new_frame([], [Long]);
        assert_eq!(apply(&mut frame, Pop), Err(FrameErrorKind::InvalidWidth(2)));
    }

    #[test]
    fn dup_forms() {
        let cases: Vec<(Instruction, Vec<VType>, Vec<VType>)> = vec![
            (Dup, vec![Integer], vec![Integer, Integer]),
            (DupX1, vec![Float, Integer], vec![Integer, Float, Integer]),
            (
                DupX2,
                vec![Null, Float, Integer],
                vec![Integer, Null, Float, Integer],
            ),
            (DupX2, vec![Long, Integer], vec![Integer, Long, Integer]),
            (
                Dup2,
                vec![Float, Integer],
                vec![Float, Integer, Float, Integer],
            ),
            (Dup2, vec![Double], vec![Double, Double]),
            (
                Dup2X1,
                vec![Null, Float, Integer],
                vec![Float, Integer, Null, Float, Integer],
            ),
            (Dup2X1, vec![Integer, Long], vec![Long, Integer, Long]),
            (
                Dup2X2,
                vec![Null, Null, Float, Integer],
                vec![Float, Integer, Null, Null, Float, Integer],
            ),
            (
                Dup2X2,
                vec![Integer, Float, Long],
                vec![Long, Integer, Float, Long],
            ),
            (
                Dup2X2,
                vec![Double, Float, Integer],
                vec![Float, Integer, Double, Float, Integer],
            ),
            (Dup2X2, vec![Double, Long], vec![Long, Double, Long]),
            (Swap, vec![Float, Integer], vec![Integer, Float]),
        ];

        for (insn, before, after) in cases {
            let mut frame = new_frame([], []);
            frame.stack.extend(before.clone());
            apply(&mut frame, insn.clone()).unwrap();
            assert_eq!(
                frame.stack_for_encoding(),
                after,
                "{:?} on {:?}",
                insn,
                before
            );
        }

        for (insn, before) in [
            (Dup, vec![Long]),
            (DupX1, vec![Long, Integer]),
            (Dup2X1, vec![Long, Long]),
            (Swap, vec![Integer, Double]),
        ] {
            let mut frame = new_frame([], []);
            frame.stack.extend(before);
            assert_eq!(
                apply(&mut frame, insn.clone()),
                Err(FrameErrorKind::InvalidWidth(2)),
                "{:?}",
                insn
            );
        }
    }

    #[test]
    fn conversions_keep_depth() {
        for (insn, from, to) in [
            (I2L, Integer, Long),
            (L2I, Long, Integer),
            (F2D, Float, Double),
            (D2F, Double, Float),
            (I2C, Integer, Integer),
            (INeg, Integer, Integer),
        ] {
            let mut frame = new_frame([], [Null, from]);
            apply(&mut frame, insn).unwrap();
            assert_eq!(frame.stack_for_encoding(), vec![Null, to]);
        }

        let mut frame = new_frame([], [object("java/lang/Object")]);
        apply(&mut frame, CheckCast(RefType::Object(BinaryName::STRING))).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![object("java/lang/String")]);
        apply(&mut frame, InstanceOf(RefType::Object(BinaryName::STRING))).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Integer]);
    }

    #[test]
    fn fields() {
        let field = FieldRef {
            class: class("me/Foo"),
            name: UnqualifiedName::from_string(String::from("count")).unwrap(),
            descriptor: FieldType::long(),
        };
        let mut frame = new_frame([], [object("me/Foo")]);
        apply(&mut frame, GetField(field.clone())).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Long]);
        apply(&mut frame, PutStatic(field.clone())).unwrap();
        apply(&mut frame, GetStatic(field.clone())).unwrap();
        frame.push(Long);
        assert_eq!(apply(&mut frame, PutField(field)), Ok(()));
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn invocations() {
        let mut frame = new_frame([], [object("me/Foo"), Integer, Long]);
        apply(
            &mut frame,
            Invoke(InvokeType::Virtual, method("me/Foo", "bar", "(IJ)D")),
        )
        .unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Double]);

        apply(
            &mut frame,
            Invoke(InvokeType::Static, method("me/Foo", "baz", "(D)V")),
        )
        .unwrap();
        assert!(frame.stack.is_empty());

        assert_eq!(
            apply(
                &mut frame,
                Invoke(InvokeType::Interface(1), method("me/Foo", "qux", "()V")),
            ),
            Err(FrameErrorKind::EmptyStack)
        );
    }

    #[test]
    fn constructor_completion() {
        let foo = class("me/Foo");
        let mut frame = new_frame([], []);
        frame
            .apply_instruction(&New(foo.clone()), Offset(4), AllocationSite(1), &foo)
            .unwrap();
        apply(&mut frame, Dup).unwrap();
        let uninit = Uninitialized(UninitializedRef {
            site: AllocationSite(1),
            new_offset: Offset(4),
            class: foo,
        });
        assert_eq!(frame.stack_for_encoding(), vec![uninit.clone(), uninit]);

        apply(
            &mut frame,
            Invoke(InvokeType::Special, method("me/Foo", "<init>", "()V")),
        )
        .unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![object("me/Foo")]);

        // Calling a constructor on an initialized value
        frame.push(object("me/Foo"));
        assert_eq!(
            apply(
                &mut frame,
                Invoke(InvokeType::Special, method("me/Foo", "<init>", "()V")),
            ),
            Err(FrameErrorKind::InvalidType)
        );
    }

    #[test]
    fn super_constructor() {
        let mut frame = new_frame([(0, UninitializedThis), (1, Integer)], [UninitializedThis]);
        apply(
            &mut frame,
            Invoke(
                InvokeType::Special,
                method("java/lang/Object", "<init>", "()V"),
            ),
        )
        .unwrap();
        assert_eq!(
            frame,
            new_frame([(0, object("me/This")), (1, Integer)], [])
        );
    }

    #[test]
    fn arrays() {
        let mut frame = new_frame([], [Integer]);
        apply(&mut frame, NewArray(BaseType::Long)).unwrap();
        assert_eq!(
            frame.stack_for_encoding(),
            vec![Object(RefType::array(FieldType::long()))]
        );
        apply(&mut frame, ArrayLength).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Integer]);

        apply(&mut frame, ANewArray(RefType::Object(BinaryName::STRING))).unwrap();
        assert_eq!(
            frame.stack_for_encoding(),
            vec![Object(RefType::array(FieldType::object(BinaryName::STRING)))]
        );

        let matrix = RefType::array(FieldType::array(FieldType::int()));
        let mut frame = new_frame([], [Integer, Integer]);
        apply(&mut frame, MultiANewArray(matrix.clone(), 2)).unwrap();
        assert_eq!(frame.stack_for_encoding(), vec![Object(matrix.clone())]);
        assert_eq!(
            apply(&mut frame, MultiANewArray(matrix, 3)),
            Err(FrameErrorKind::InvalidType)
        );
    }

    #[test]
    fn branches_pop_operands() {
        let mut frame = new_frame([], [Integer, Integer, Null, Integer]);
        frame
            .apply_branch_instruction(&BranchInstruction::If(OrdComparison::EQ, ()))
            .unwrap();
        frame
            .apply_branch_instruction(&BranchInstruction::IfNull(
                crate::jvm::code::EqComparison::NE,
                (),
            ))
            .unwrap();
        frame
            .apply_branch_instruction(&BranchInstruction::IfICmp(OrdComparison::LT, ()))
            .unwrap();
        assert!(frame.stack.is_empty());

        frame.push(Long);
        frame
            .apply_branch_instruction::<()>(&BranchInstruction::LReturn)
            .unwrap();
        assert_eq!(
            frame.apply_branch_instruction::<()>(&BranchInstruction::AThrow),
            Err(FrameErrorKind::EmptyStack)
        );
        assert_eq!(
            frame.apply_branch_instruction::<()>(&BranchInstruction::Return),
            Ok(())
        );
    }
}
