// Copyright 2025-2026 Neil Henderson
//
//! Expression lowering: operands, arithmetic, comparisons, short-circuit logic, array element
//! addressing, assignments, and calls.

use crate::compiler_driver::diagnostics::DiagnosticKind;
use crate::parser::{AstBinaryOp, AstExpression, AstLValue, AstUnaryOp};

use super::super::instruction::{BinaryOp, CompareCond, InstrKind, IrInstruction, MoveMode};
use super::super::types::IrType;
use super::super::value::{ValueId, ValueKind};
use super::{IrTranslator, Lower};

impl IrTranslator<'_> {
    /// Creates a fresh compiler temporary of the given type.
    pub(super) fn new_temp_value(&mut self, ty: IrType) -> ValueId {
        let name = self.labels.make_temp_name();
        self.module.new_temp(self.func, &name, ty)
    }

    /// Checks that a value is usable as a 32-bit scalar operand.
    pub(super) fn expect_scalar(&mut self, id: ValueId, line: u32) -> Lower<ValueId> {
        let ty = &self.module.value(id).ty;
        if ty.is_scalar() {
            Ok(id)
        } else {
            let name = self.module.value(id).ir_name.clone();
            Err(self.error(
                DiagnosticKind::TypeMismatch,
                format!("'{name}' is not a scalar value"),
                line,
            ))
        }
    }

    /// Resolves a name: parameter overrides first, then the scope stack, then globals.
    fn resolve_name(&mut self, name: &str, line: u32) -> Lower<ValueId> {
        if let Some(&id) = self.param_overrides.get(name) {
            return Ok(id);
        }
        match self.module.find_value(name) {
            Some(id) => Ok(id),
            None => Err(self.error(
                DiagnosticKind::Undefined,
                format!("Undefined variable '{name}'"),
                line,
            )),
        }
    }

    /// Lowers an expression and returns the value holding its result.
    pub(super) fn translate_expression(
        &mut self,
        expr: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        match expr {
            AstExpression::Literal { value, .. } => Ok(self.module.new_constant(*value)),

            AstExpression::LValue(lval) => {
                if lval.indices.is_empty() {
                    self.resolve_name(&lval.name, lval.line)
                } else {
                    let (address, fully_indexed) = self.translate_array_access(lval, code)?;
                    if !fully_indexed {
                        // A partially indexed array is the address of a subarray; it is only
                        // meaningful as a call argument and is passed through unchanged.
                        return Ok(address);
                    }
                    let element = self.new_temp_value(IrType::Int32);
                    code.push(IrInstruction::new(InstrKind::Move {
                        dst: element,
                        src: address,
                        mode: MoveMode::ArrayRead,
                    }));
                    Ok(element)
                }
            }

            AstExpression::Call { name, args, line } => {
                match self.translate_call(name, args, *line, code)? {
                    Some(result) => Ok(result),
                    None => Err(self.error(
                        DiagnosticKind::TypeMismatch,
                        format!("Void function '{name}' used as a value"),
                        *line,
                    )),
                }
            }

            AstExpression::Unary { op, operand, line } => match op {
                AstUnaryOp::Negate => self.translate_negate(operand, *line, code),
                AstUnaryOp::LogicalNot => self.translate_logical_not(operand, *line, code),
            },

            AstExpression::Binary { op, lhs, rhs, line } => match op {
                AstBinaryOp::Add => self.translate_binary(BinaryOp::Add, lhs, rhs, *line, code),
                AstBinaryOp::Subtract => {
                    self.translate_binary(BinaryOp::Subtract, lhs, rhs, *line, code)
                }
                AstBinaryOp::Multiply => {
                    self.translate_binary(BinaryOp::Multiply, lhs, rhs, *line, code)
                }
                AstBinaryOp::Divide => self.translate_binary(BinaryOp::Divide, lhs, rhs, *line, code),
                AstBinaryOp::Remainder => {
                    self.translate_binary(BinaryOp::Remainder, lhs, rhs, *line, code)
                }

                AstBinaryOp::LessThan => {
                    self.translate_compare(CompareCond::LessThan, lhs, rhs, *line, code)
                }
                AstBinaryOp::LessThanOrEqualTo => {
                    self.translate_compare(CompareCond::LessThanOrEqualTo, lhs, rhs, *line, code)
                }
                AstBinaryOp::GreaterThan => {
                    self.translate_compare(CompareCond::GreaterThan, lhs, rhs, *line, code)
                }
                AstBinaryOp::GreaterThanOrEqualTo => {
                    self.translate_compare(CompareCond::GreaterThanOrEqualTo, lhs, rhs, *line, code)
                }
                AstBinaryOp::EqualTo => {
                    self.translate_compare(CompareCond::EqualTo, lhs, rhs, *line, code)
                }
                AstBinaryOp::NotEqualTo => {
                    self.translate_compare(CompareCond::NotEqualTo, lhs, rhs, *line, code)
                }

                AstBinaryOp::LogicalAnd => self.translate_logical_and(lhs, rhs, code),
                AstBinaryOp::LogicalOr => self.translate_logical_or(lhs, rhs, code),
            },
        }
    }

    /// Lowers an expression statement. A call to a `void` function is valid here.
    pub(super) fn translate_expression_for_effect(
        &mut self,
        expr: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        if let AstExpression::Call { name, args, line } = expr {
            self.translate_call(name, args, *line, code)?;
        } else {
            self.translate_expression(expr, code)?;
        }
        Ok(())
    }

    fn translate_negate(
        &mut self,
        operand: &AstExpression,
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let value = self.translate_expression(operand, code)?;
        let value = self.expect_scalar(value, line)?;

        // An i1 comparison result widens to i32 before arithmetic.
        let value = self.widen_to_int32(value, code);

        let result = self.new_temp_value(IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Negate { src: value, dst: result }));
        Ok(result)
    }

    // !x lowers to (x == 0) widened back to i32.
    fn translate_logical_not(
        &mut self,
        operand: &AstExpression,
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let value = self.translate_expression(operand, code)?;
        let value = self.expect_scalar(value, line)?;

        let zero = self.module.new_constant(0);
        let compared = self.new_temp_value(IrType::Bool);
        code.push(IrInstruction::new(InstrKind::Compare {
            cond: CompareCond::EqualTo,
            lhs: value,
            rhs: zero,
            dst: compared,
        }));

        let widened = self.new_temp_value(IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Move {
            dst: widened,
            src: compared,
            mode: MoveMode::Scalar,
        }));
        Ok(widened)
    }

    fn widen_to_int32(&mut self, value: ValueId, code: &mut Vec<IrInstruction>) -> ValueId {
        if self.module.value(value).ty != IrType::Bool {
            return value;
        }
        let widened = self.new_temp_value(IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Move {
            dst: widened,
            src: value,
            mode: MoveMode::Scalar,
        }));
        widened
    }

    fn translate_binary(
        &mut self,
        op: BinaryOp,
        lhs: &AstExpression,
        rhs: &AstExpression,
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let lhs_value = self.translate_expression(lhs, code)?;
        let lhs_value = self.expect_scalar(lhs_value, line)?;
        let rhs_value = self.translate_expression(rhs, code)?;
        let rhs_value = self.expect_scalar(rhs_value, line)?;

        let result = self.new_temp_value(IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Binary {
            op,
            lhs: lhs_value,
            rhs: rhs_value,
            dst: result,
        }));
        Ok(result)
    }

    fn translate_compare(
        &mut self,
        cond: CompareCond,
        lhs: &AstExpression,
        rhs: &AstExpression,
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let lhs_value = self.translate_expression(lhs, code)?;
        let lhs_value = self.expect_scalar(lhs_value, line)?;
        let rhs_value = self.translate_expression(rhs, code)?;
        let rhs_value = self.expect_scalar(rhs_value, line)?;

        let result = self.new_temp_value(IrType::Bool);
        code.push(IrInstruction::new(InstrKind::Compare {
            cond,
            lhs: lhs_value,
            rhs: rhs_value,
            dst: result,
        }));
        Ok(result)
    }

    // A && B with short-circuit evaluation:
    //
    //      bc (A != 0), .Lrhs, .Lfalse
    //      .Lrhs:  bc (B != 0), .Ltrue, .Lfalse
    //      .Ltrue: r = 1; br .Lend
    //      .Lfalse: r = 0
    //      .Lend:
    fn translate_logical_and(
        &mut self,
        lhs: &AstExpression,
        rhs: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let result = self.new_temp_value(IrType::Int32);
        let rhs_label = self.labels.make_label();
        let true_label = self.labels.make_label();
        let false_label = self.labels.make_label();
        let end_label = self.labels.make_label();

        let lhs_test = self.translate_operand_test(lhs, code)?;
        code.push(IrInstruction::new(InstrKind::Branch {
            cond: lhs_test,
            true_target: rhs_label.clone(),
            false_target: false_label.clone(),
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: rhs_label }));
        let rhs_test = self.translate_operand_test(rhs, code)?;
        code.push(IrInstruction::new(InstrKind::Branch {
            cond: rhs_test,
            true_target: true_label.clone(),
            false_target: false_label.clone(),
        }));

        self.emit_boolean_result(result, true_label, false_label, end_label, code);
        Ok(result)
    }

    // A || B, symmetric to &&: a true left operand skips the right one.
    fn translate_logical_or(
        &mut self,
        lhs: &AstExpression,
        rhs: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let result = self.new_temp_value(IrType::Int32);
        let rhs_label = self.labels.make_label();
        let true_label = self.labels.make_label();
        let false_label = self.labels.make_label();
        let end_label = self.labels.make_label();

        let lhs_test = self.translate_operand_test(lhs, code)?;
        code.push(IrInstruction::new(InstrKind::Branch {
            cond: lhs_test,
            true_target: true_label.clone(),
            false_target: rhs_label.clone(),
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: rhs_label }));
        let rhs_test = self.translate_operand_test(rhs, code)?;
        code.push(IrInstruction::new(InstrKind::Branch {
            cond: rhs_test,
            true_target: true_label.clone(),
            false_target: false_label.clone(),
        }));

        self.emit_boolean_result(result, true_label, false_label, end_label, code);
        Ok(result)
    }

    /// Lowers one operand of `&&`/`||` and compares it against zero.
    fn translate_operand_test(
        &mut self,
        operand: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<ValueId> {
        let value = self.translate_expression(operand, code)?;
        let value = self.expect_scalar(value, operand.line())?;
        let zero = self.module.new_constant(0);
        let test = self.new_temp_value(IrType::Bool);
        code.push(IrInstruction::new(InstrKind::Compare {
            cond: CompareCond::NotEqualTo,
            lhs: value,
            rhs: zero,
            dst: test,
        }));
        Ok(test)
    }

    /// Emits the common tail of `&&`/`||`: set the result to 1 or 0 and fall through to the end.
    fn emit_boolean_result(
        &mut self,
        result: ValueId,
        true_label: String,
        false_label: String,
        end_label: String,
        code: &mut Vec<IrInstruction>,
    ) {
        let zero = self.module.new_constant(0);
        let one = self.module.new_constant(1);

        code.push(IrInstruction::new(InstrKind::Label { name: true_label }));
        code.push(IrInstruction::new(InstrKind::Move {
            dst: result,
            src: one,
            mode: MoveMode::Scalar,
        }));
        code.push(IrInstruction::new(InstrKind::Jump { target: end_label.clone() }));

        code.push(IrInstruction::new(InstrKind::Label { name: false_label }));
        code.push(IrInstruction::new(InstrKind::Move {
            dst: result,
            src: zero,
            mode: MoveMode::Scalar,
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: end_label }));
    }

    /// Lowers an assignment.
    ///
    /// The right-hand side is evaluated before the target address, but a first assignment to a
    /// formal parameter creates the shadow local up front so the right-hand side still reads the
    /// parameter's original value.
    pub(super) fn translate_assignment(
        &mut self,
        target: &AstLValue,
        value: &AstExpression,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        if target.indices.is_empty() {
            self.create_param_override_if_needed(&target.name, code);
        }

        let rhs = self.translate_expression(value, code)?;
        let rhs = self.expect_scalar(rhs, value.line())?;

        if target.indices.is_empty() {
            let dst = self.resolve_name(&target.name, target.line)?;
            if !self.module.value(dst).ty.is_scalar() {
                return Err(self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Cannot assign to array '{}'", target.name),
                    target.line,
                ));
            }
            code.push(IrInstruction::new(InstrKind::Move {
                dst,
                src: rhs,
                mode: MoveMode::Scalar,
            }));
        } else {
            let (address, fully_indexed) = self.translate_array_access(target, code)?;
            if !fully_indexed {
                return Err(self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Cannot assign to a partially indexed array '{}'", target.name),
                    target.line,
                ));
            }
            code.push(IrInstruction::new(InstrKind::Move {
                dst: address,
                src: rhs,
                mode: MoveMode::ArrayWrite,
            }));
        }

        Ok(())
    }

    /// Formal parameters are immutable; the first assignment to one creates a shadow local with
    /// the same name, seeded with the parameter's value. Later lookups resolve to the shadow.
    fn create_param_override_if_needed(&mut self, name: &str, code: &mut Vec<IrInstruction>) {
        if self.param_overrides.contains_key(name) {
            return;
        }

        let Some(id) = self.module.find_value(name) else {
            return; // Let the ordinary assignment path report the undefined name.
        };
        let value = self.module.value(id);
        let is_scalar_param = matches!(value.kind, ValueKind::FormalParam { .. }) && value.ty.is_scalar();
        if !is_scalar_param {
            return;
        }

        let shadow = self.module.new_local(self.func, name, IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Move {
            dst: shadow,
            src: id,
            mode: MoveMode::Scalar,
        }));
        self.param_overrides.insert(name.to_string(), shadow);
    }

    /// Lowers an array access `a[i_1]…[i_k]` to the element's address:
    ///
    /// ```text
    ///  I = sum of i_j scaled by the product of the trailing dimensions
    ///  B = I * 4
    ///  P = a + B
    /// ```
    ///
    /// Returns the address value and whether every dimension was indexed. The instructions are
    /// re-emitted at every evaluation, so an access inside a loop always sees the current index
    /// values.
    pub(super) fn translate_array_access(
        &mut self,
        lval: &AstLValue,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<(ValueId, bool)> {
        let base = self.resolve_name(&lval.name, lval.line)?;
        let base_ty = self.module.value(base).ty.clone();

        if !base_ty.is_array() {
            return Err(self.error(
                DiagnosticKind::TypeMismatch,
                format!("'{}' is not an array", lval.name),
                lval.line,
            ));
        }

        let dims = base_ty.array_dims();
        if lval.indices.len() > dims.len() {
            return Err(self.error(
                DiagnosticKind::TypeMismatch,
                format!("Too many subscripts for array '{}'", lval.name),
                lval.line,
            ));
        }

        let mut linear: Option<ValueId> = None;
        for (j, index_expr) in lval.indices.iter().enumerate() {
            let index = self.translate_expression(index_expr, code)?;
            let index = self.expect_scalar(index, index_expr.line())?;

            let coefficient: u32 = dims[j + 1..].iter().product();
            let term = if coefficient == 1 {
                index
            } else {
                let scale = self.module.new_constant(coefficient as i32);
                let scaled = self.new_temp_value(IrType::Int32);
                code.push(IrInstruction::new(InstrKind::Binary {
                    op: BinaryOp::Multiply,
                    lhs: index,
                    rhs: scale,
                    dst: scaled,
                }));
                scaled
            };

            linear = Some(match linear {
                None => term,
                Some(sum) => {
                    let next = self.new_temp_value(IrType::Int32);
                    code.push(IrInstruction::new(InstrKind::Binary {
                        op: BinaryOp::Add,
                        lhs: sum,
                        rhs: term,
                        dst: next,
                    }));
                    next
                }
            });
        }

        let linear = match linear {
            Some(linear) => linear,
            None => {
                return Err(self.error(
                    DiagnosticKind::TypeMismatch,
                    format!("Array '{}' used without a subscript", lval.name),
                    lval.line,
                ));
            }
        };

        // Every element in this language is four bytes.
        let four = self.module.new_constant(4);
        let byte_offset = self.new_temp_value(IrType::Int32);
        code.push(IrInstruction::new(InstrKind::Binary {
            op: BinaryOp::Multiply,
            lhs: linear,
            rhs: four,
            dst: byte_offset,
        }));

        let element_ty = base_ty.strip_dims(lval.indices.len()).clone();
        let address = self.new_temp_value(IrType::pointer_to(element_ty));
        code.push(IrInstruction::new(InstrKind::Binary {
            op: BinaryOp::Add,
            lhs: base,
            rhs: byte_offset,
            dst: address,
        }));

        Ok((address, lval.indices.len() == dims.len()))
    }

    /// Lowers a call. Returns `None` for a call to a `void` function.
    pub(super) fn translate_call(
        &mut self,
        name: &str,
        args: &[AstExpression],
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<Option<ValueId>> {
        let Some(callee) = self.module.find_function(name) else {
            return Err(self.error(
                DiagnosticKind::Undefined,
                format!("Call to undefined function '{name}'"),
                line,
            ));
        };

        // Arguments are evaluated in source order.
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.translate_expression(arg, code)?);
        }

        let expected = self.module.function(callee).params.len();
        if arg_values.len() != expected {
            return Err(self.error(
                DiagnosticKind::ArityMismatch,
                format!(
                    "Function '{name}' expects {expected} argument(s) but {} were provided",
                    arg_values.len()
                ),
                line,
            ));
        }

        self.module.function_mut(self.func).record_call(arg_values.len());

        // Arguments beyond the fourth travel through the outgoing-argument area at the frame
        // bottom; give each one its staging slot at `[sp, #0], [sp, #4], …`.
        const SP_REG: u8 = 13;
        for position in 4..arg_values.len() {
            let offset = 4 * (position as i32 - 4);
            self.module.new_temp_mem(self.func, SP_REG, offset, IrType::Int32);
        }

        let return_type = self.module.function(callee).return_type.clone();
        let result = if return_type == IrType::Void {
            None
        } else {
            Some(self.new_temp_value(return_type))
        };

        code.push(IrInstruction::new(InstrKind::Call {
            callee: name.to_string(),
            args: arg_values,
            dst: result,
        }));

        Ok(result)
    }
}
