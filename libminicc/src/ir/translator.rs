// Copyright 2025-2026 Neil Henderson
//
//! The `translator` module lowers the AST into linear IR.
//!
//! Lowering walks each function definition and appends instructions to a flat list. Structured
//! control flow is flattened into labels and branches; `&&`, `||` and `!` short-circuit; array
//! accesses compute explicit element addresses. A diagnostic aborts the enclosing function (its
//! IR is discarded) but the remaining functions still lower, so one run can report several
//! errors.

mod expr;

use std::collections::{HashMap, HashSet};

use crate::compiler_driver::diagnostics::{Diagnostic, DiagnosticKind};
use crate::compiler_driver::Driver;
use crate::parser::{
    AstBlock, AstBlockItem, AstCompileUnit, AstFunction, AstParam, AstStatement, AstTopLevel,
    AstType, AstVarDef,
};

use super::instruction::{InstrKind, IrInstruction, MoveMode};
use super::label_maker::LabelMaker;
use super::module::{IrModule, NewFunctionError};
use super::types::IrType;
use super::value::ValueId;

/// Marker for a function whose lowering was abandoned after a diagnostic.
pub(super) struct FunctionAbort;

pub(super) type Lower<T> = Result<T, FunctionAbort>;

/// Translates the AST into a new IR module.
///
/// Diagnostics are recorded on the driver. A function that fails to lower contributes no IR;
/// everything else in the translation unit still does.
pub fn translate_ast_to_ir(driver: &mut Driver, unit: &AstCompileUnit) -> IrModule {
    let mut module = IrModule::new();
    let mut translator = IrTranslator {
        module: &mut module,
        driver,
        labels: LabelMaker::new(),
        func: 0,
        loop_stack: Vec::new(),
        param_overrides: HashMap::new(),
        local_names: HashSet::new(),
    };

    for item in &unit.items {
        match item {
            AstTopLevel::GlobalVars(defs) => {
                for def in defs {
                    translator.declare_global(def);
                }
            }
            AstTopLevel::Function(function) => translator.translate_function(function),
        }
    }

    module
}

pub(super) struct IrTranslator<'a> {
    pub module: &'a mut IrModule,
    pub driver: &'a mut Driver,
    pub labels: LabelMaker,

    /// Index of the function currently being lowered.
    pub func: usize,

    /// `(loop_start, loop_end)` label pairs for the enclosing `while` statements; `break` and
    /// `continue` consult the top entry.
    pub loop_stack: Vec<(String, String)>,

    /// Shadow locals created by assignment to a formal parameter, keyed by the parameter's name.
    /// Consulted before the ordinary scope stack.
    pub param_overrides: HashMap<String, ValueId>,

    /// Every local name already used in the current function, for collision mangling.
    pub local_names: HashSet<String>,
}

impl IrTranslator<'_> {
    pub(super) fn error(&mut self, kind: DiagnosticKind, message: String, line: u32) -> FunctionAbort {
        self.driver.add_diagnostic(Diagnostic::error_at_line(kind, message, line));
        FunctionAbort
    }

    /// Returns a function-unique spelling for a local named `base`, mangling with a numeric
    /// suffix when an earlier local already took the name.
    pub(super) fn unique_local_name(&mut self, base: &str) -> String {
        if self.local_names.insert(base.to_string()) {
            return base.to_string();
        }
        let mut k = 1;
        loop {
            let candidate = format!("{base}.{k}");
            if self.local_names.insert(candidate.clone()) {
                return candidate;
            }
            k += 1;
        }
    }

    fn declare_global(&mut self, def: &AstVarDef) {
        let ty = if def.dims.is_empty() {
            IrType::Int32
        } else {
            IrType::array_from_dims(&def.dims)
        };

        if self.module.new_global(&def.name, ty).is_none() {
            self.driver.add_diagnostic(Diagnostic::error_at_line(
                DiagnosticKind::Redefinition,
                format!("Redefinition of global variable '{}'", def.name),
                def.line,
            ));
        }
    }

    fn translate_function(&mut self, function: &AstFunction) {
        let return_type = match function.return_type {
            AstType::Int => IrType::Int32,
            AstType::Void => IrType::Void,
        };

        let defining = function.body.is_some();
        let index = match self.module.new_function(&function.name, return_type.clone(), defining) {
            Ok(index) => index,
            Err(NewFunctionError::AlreadyDefined) => {
                self.driver.add_diagnostic(Diagnostic::error_at_line(
                    DiagnosticKind::Redefinition,
                    format!("Redefinition of function '{}'", function.name),
                    function.line,
                ));
                return;
            }
        };

        self.func = index;
        self.loop_stack.clear();
        self.param_overrides.clear();
        self.local_names.clear();

        if !defining {
            self.declare_params(index, &function.params);
            return;
        }

        self.module.enter_scope();

        let mut code = Vec::new();
        let lowered = self.translate_function_body(function, return_type, &mut code);

        self.module.leave_scope();

        match lowered {
            Ok(()) => self.module.function_mut(index).instructions = code,
            // The diagnostic is already recorded; keep the function declared (so later call
            // sites still resolve) but give it no IR.
            Err(FunctionAbort) => (),
        }
    }

    fn declare_params(&mut self, index: usize, params: &[AstParam]) {
        for (position, param) in params.iter().enumerate() {
            let ty = param_type(param);
            let fallback = format!("arg{position}");
            let name = param.name.as_deref().unwrap_or(&fallback);
            self.module.new_formal_param(index, name, position, ty);
        }
    }

    fn translate_function_body(
        &mut self,
        function: &AstFunction,
        return_type: IrType,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        for (position, param) in function.params.iter().enumerate() {
            let Some(name) = param.name.as_deref() else {
                return Err(self.error(
                    DiagnosticKind::Syntax,
                    format!("Parameter {} of function '{}' has no name", position + 1, function.name),
                    param.line,
                ));
            };

            let ty = param_type(param);
            let id = self.module.new_formal_param(self.func, name, position, ty);
            self.module.bind_in_current_scope(name, id);
            self.local_names.insert(name.to_string());
        }

        let entry_label = self.labels.make_label();
        let exit_label = self.labels.make_label();

        code.push(IrInstruction::new(InstrKind::Label { name: entry_label.clone() }));
        code.push(IrInstruction::new(InstrKind::Entry));

        // Non-void functions get a dedicated return slot, initialised to zero so that falling
        // off the end of the function returns a defined value.
        let return_slot = if return_type == IrType::Void {
            None
        } else {
            let name = self.unique_local_name("ret");
            let slot = self.module.new_local(self.func, &name, IrType::Int32);
            let zero = self.module.new_constant(0);
            code.push(IrInstruction::new(InstrKind::Move {
                dst: slot,
                src: zero,
                mode: MoveMode::Scalar,
            }));
            Some(slot)
        };

        {
            let func = self.module.function_mut(self.func);
            func.entry_label = entry_label;
            func.exit_label = exit_label.clone();
            func.return_slot = return_slot;
        }

        let body = function.body.as_ref().expect("definition has a body");
        const BODY_OPENS_SCOPE: bool = false; // The function scope is already open.
        self.translate_block(body, BODY_OPENS_SCOPE, code)?;

        code.push(IrInstruction::new(InstrKind::Label { name: exit_label }));
        code.push(IrInstruction::new(InstrKind::Exit { value: return_slot }));

        Ok(())
    }

    fn translate_block(
        &mut self,
        block: &AstBlock,
        opens_scope: bool,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        if opens_scope {
            self.module.enter_scope();
        }

        let mut result = Ok(());
        for item in &block.items {
            result = match item {
                AstBlockItem::Decl(defs) => self.translate_local_decls(defs, code),
                AstBlockItem::Stmt(stmt) => self.translate_statement(stmt, code),
            };
            if result.is_err() {
                break;
            }
        }

        if opens_scope {
            self.module.leave_scope();
        }
        result
    }

    fn translate_local_decls(&mut self, defs: &[AstVarDef], code: &mut Vec<IrInstruction>) -> Lower<()> {
        for def in defs {
            let ty = if def.dims.is_empty() {
                IrType::Int32
            } else {
                IrType::array_from_dims(&def.dims)
            };

            let unique = self.unique_local_name(&def.name);
            let id = self.module.new_local(self.func, &unique, ty);
            self.module.bind_in_current_scope(&def.name, id);

            // An assignment to a parameter's name inside the function no longer targets the
            // parameter once a local shadows it.
            self.param_overrides.remove(&def.name);

            if let Some(init) = &def.init {
                let value = self.translate_expression(init, code)?;
                let value = self.expect_scalar(value, init.line())?;
                code.push(IrInstruction::new(InstrKind::Move {
                    dst: id,
                    src: value,
                    mode: MoveMode::Scalar,
                }));
            }
        }
        Ok(())
    }

    fn translate_statement(&mut self, stmt: &AstStatement, code: &mut Vec<IrInstruction>) -> Lower<()> {
        match stmt {
            AstStatement::Block(block) => {
                const OPENS_SCOPE: bool = true;
                self.translate_block(block, OPENS_SCOPE, code)
            }

            AstStatement::Assign { target, value } => self.translate_assignment(target, value, code),

            AstStatement::Expression(expr) => {
                if let Some(expr) = expr {
                    self.translate_expression_for_effect(expr, code)?;
                }
                Ok(())
            }

            AstStatement::Return { value, line } => self.translate_return(value.as_ref(), *line, code),

            AstStatement::If { cond, then_stmt, else_stmt } => match else_stmt {
                None => self.translate_if(cond, then_stmt, code),
                Some(else_stmt) => self.translate_if_else(cond, then_stmt, else_stmt, code),
            },

            AstStatement::While { cond, body } => self.translate_while(cond, body, code),

            AstStatement::Break { line } => {
                let Some((_, end_label)) = self.loop_stack.last().cloned() else {
                    return Err(self.error(
                        DiagnosticKind::MisplacedControl,
                        "'break' outside of a loop".to_string(),
                        *line,
                    ));
                };
                code.push(IrInstruction::new(InstrKind::Jump { target: end_label }));
                Ok(())
            }

            AstStatement::Continue { line } => {
                let Some((start_label, _)) = self.loop_stack.last().cloned() else {
                    return Err(self.error(
                        DiagnosticKind::MisplacedControl,
                        "'continue' outside of a loop".to_string(),
                        *line,
                    ));
                };
                code.push(IrInstruction::new(InstrKind::Jump { target: start_label }));
                Ok(())
            }
        }
    }

    fn translate_return(
        &mut self,
        value: Option<&crate::parser::AstExpression>,
        line: u32,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        let return_slot = self.module.function(self.func).return_slot;
        let exit_label = self.module.function(self.func).exit_label.clone();

        if let Some(value) = value {
            let Some(slot) = return_slot else {
                return Err(self.error(
                    DiagnosticKind::MisplacedControl,
                    "'return' with a value in a function returning void".to_string(),
                    line,
                ));
            };
            let result = self.translate_expression(value, code)?;
            let result = self.expect_scalar(result, value.line())?;
            code.push(IrInstruction::new(InstrKind::Move {
                dst: slot,
                src: result,
                mode: MoveMode::Scalar,
            }));
        }

        code.push(IrInstruction::new(InstrKind::Jump { target: exit_label }));
        Ok(())
    }

    // if (C) S:   bc C, .Lthen, .Lend; .Lthen: S; .Lend:
    fn translate_if(
        &mut self,
        cond: &crate::parser::AstExpression,
        then_stmt: &AstStatement,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        let cond_value = self.translate_expression(cond, code)?;
        let cond_value = self.expect_scalar(cond_value, cond.line())?;

        let then_label = self.labels.make_label();
        let end_label = self.labels.make_label();

        code.push(IrInstruction::new(InstrKind::Branch {
            cond: cond_value,
            true_target: then_label.clone(),
            false_target: end_label.clone(),
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: then_label }));
        self.translate_statement(then_stmt, code)?;
        code.push(IrInstruction::new(InstrKind::Label { name: end_label }));
        Ok(())
    }

    // if (C) S1 else S2:   bc C, .Lthen, .Lelse; .Lthen: S1; br .Lend; .Lelse: S2; .Lend:
    fn translate_if_else(
        &mut self,
        cond: &crate::parser::AstExpression,
        then_stmt: &AstStatement,
        else_stmt: &AstStatement,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        let cond_value = self.translate_expression(cond, code)?;
        let cond_value = self.expect_scalar(cond_value, cond.line())?;

        let then_label = self.labels.make_label();
        let else_label = self.labels.make_label();
        let end_label = self.labels.make_label();

        code.push(IrInstruction::new(InstrKind::Branch {
            cond: cond_value,
            true_target: then_label.clone(),
            false_target: else_label.clone(),
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: then_label }));
        self.translate_statement(then_stmt, code)?;
        code.push(IrInstruction::new(InstrKind::Jump { target: end_label.clone() }));

        code.push(IrInstruction::new(InstrKind::Label { name: else_label }));
        self.translate_statement(else_stmt, code)?;

        code.push(IrInstruction::new(InstrKind::Label { name: end_label }));
        Ok(())
    }

    // while (C) B:   .Lstart: bc C, .Lbody, .Lend; .Lbody: B; br .Lstart; .Lend:
    fn translate_while(
        &mut self,
        cond: &crate::parser::AstExpression,
        body: &AstStatement,
        code: &mut Vec<IrInstruction>,
    ) -> Lower<()> {
        let start_label = self.labels.make_label();
        let body_label = self.labels.make_label();
        let end_label = self.labels.make_label();

        code.push(IrInstruction::new(InstrKind::Label { name: start_label.clone() }));

        let cond_value = self.translate_expression(cond, code)?;
        let cond_value = self.expect_scalar(cond_value, cond.line())?;

        code.push(IrInstruction::new(InstrKind::Branch {
            cond: cond_value,
            true_target: body_label.clone(),
            false_target: end_label.clone(),
        }));

        code.push(IrInstruction::new(InstrKind::Label { name: body_label }));

        self.loop_stack.push((start_label.clone(), end_label.clone()));
        let body_result = self.translate_statement(body, code);
        self.loop_stack.pop();
        body_result?;

        code.push(IrInstruction::new(InstrKind::Jump { target: start_label }));
        code.push(IrInstruction::new(InstrKind::Label { name: end_label }));
        Ok(())
    }
}

fn param_type(param: &AstParam) -> IrType {
    if param.dims.is_empty() {
        IrType::Int32
    } else {
        // Array parameters decay: the outermost dimension is zero, printing as `T*`.
        IrType::array_from_dims(&param.dims)
    }
}
