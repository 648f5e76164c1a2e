// Copyright 2025-2026 Neil Henderson
//
//! The `printer` module renders the AST in an indented, one-node-per-line form for `--show-ast`.

use std::fmt::Write;

use super::abstract_syntax_tree::*;

/// Renders the AST as indented text.
pub fn print_ast(unit: &AstCompileUnit) -> String {
    let mut out = String::new();
    let mut printer = AstPrinter { out: &mut out, depth: 0 };
    printer.print_compile_unit(unit);
    out
}

struct AstPrinter<'a> {
    out: &'a mut String,
    depth: usize,
}

impl AstPrinter<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.line(header);
        self.depth += 1;
        body(self);
        self.depth -= 1;
    }

    fn print_compile_unit(&mut self, unit: &AstCompileUnit) {
        self.nested("compile-unit", |p| {
            for item in &unit.items {
                match item {
                    AstTopLevel::Function(function) => p.print_function(function),
                    AstTopLevel::GlobalVars(defs) => {
                        for def in defs {
                            p.line(&format_var_def(def, "global"));
                        }
                    }
                }
            }
        });
    }

    fn print_function(&mut self, function: &AstFunction) {
        let kind = if function.body.is_some() { "func-def" } else { "func-decl" };
        let header = format!("{kind} {} {}", function.return_type, function.name);
        self.nested(&header, |p| {
            for param in &function.params {
                let name = param.name.as_deref().unwrap_or("<anonymous>");
                if param.dims.is_empty() {
                    p.line(&format!("param int {name}"));
                } else {
                    p.line(&format!("param int {name}{}", format_dims(&param.dims)));
                }
            }
            if let Some(body) = &function.body {
                p.print_block(body);
            }
        });
    }

    fn print_block(&mut self, block: &AstBlock) {
        self.nested("block", |p| {
            for item in &block.items {
                match item {
                    AstBlockItem::Decl(defs) => {
                        for def in defs {
                            if let Some(init) = &def.init {
                                p.nested(&format_var_def(def, "decl"), |p| p.print_expression(init));
                            } else {
                                p.line(&format_var_def(def, "decl"));
                            }
                        }
                    }
                    AstBlockItem::Stmt(stmt) => p.print_statement(stmt),
                }
            }
        });
    }

    fn print_statement(&mut self, stmt: &AstStatement) {
        match stmt {
            AstStatement::Block(block) => self.print_block(block),

            AstStatement::If { cond, then_stmt, else_stmt } => {
                let header = if else_stmt.is_some() { "if-else" } else { "if" };
                self.nested(header, |p| {
                    p.print_expression(cond);
                    p.print_statement(then_stmt);
                    if let Some(else_stmt) = else_stmt {
                        p.print_statement(else_stmt);
                    }
                });
            }

            AstStatement::While { cond, body } => {
                self.nested("while", |p| {
                    p.print_expression(cond);
                    p.print_statement(body);
                });
            }

            AstStatement::Break { .. } => self.line("break"),
            AstStatement::Continue { .. } => self.line("continue"),

            AstStatement::Return { value, .. } => match value {
                Some(value) => self.nested("return", |p| p.print_expression(value)),
                None => self.line("return"),
            },

            AstStatement::Assign { target, value } => {
                self.nested("assign", |p| {
                    p.print_lvalue(target);
                    p.print_expression(value);
                });
            }

            AstStatement::Expression(expr) => match expr {
                Some(expr) => self.nested("expr-stmt", |p| p.print_expression(expr)),
                None => self.line("empty-stmt"),
            },
        }
    }

    fn print_expression(&mut self, expr: &AstExpression) {
        match expr {
            AstExpression::Literal { value, radix, .. } => {
                let mut text = format!("literal {value}");
                if *radix != 10 {
                    _ = write!(text, " (radix {radix})");
                }
                self.line(&text);
            }

            AstExpression::LValue(lval) => self.print_lvalue(lval),

            AstExpression::Call { name, args, .. } => {
                self.nested(&format!("call {name}"), |p| {
                    for arg in args {
                        p.print_expression(arg);
                    }
                });
            }

            AstExpression::Unary { op, operand, .. } => {
                self.nested(&format!("unary {op}"), |p| p.print_expression(operand));
            }

            AstExpression::Binary { op, lhs, rhs, .. } => {
                self.nested(&format!("binary {op}"), |p| {
                    p.print_expression(lhs);
                    p.print_expression(rhs);
                });
            }
        }
    }

    fn print_lvalue(&mut self, lval: &AstLValue) {
        if lval.indices.is_empty() {
            self.line(&format!("var {}", lval.name));
        } else {
            self.nested(&format!("array-access {}", lval.name), |p| {
                for index in &lval.indices {
                    p.print_expression(index);
                }
            });
        }
    }
}

fn format_var_def(def: &AstVarDef, kind: &str) -> String {
    format!("{kind} int {}{}", def.name, format_dims(&def.dims))
}

fn format_dims(dims: &[u32]) -> String {
    let mut out = String::new();
    for dim in dims {
        if *dim == 0 {
            out.push_str("[]");
        } else {
            _ = write!(out, "[{dim}]");
        }
    }
    out
}
