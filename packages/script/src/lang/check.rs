//! Static checks run after parsing: imports and call targets.

use std::collections::BTreeSet;

use super::ast::{Expr, Stmt, StmtKind, UnitDecl};
use super::builtins::{builtin_arity, module_arity, MODULES};
use super::CompileError;

pub fn check(unit: &UnitDecl) -> Result<(), CompileError> {
    let mut imported = BTreeSet::new();
    for import in &unit.imports {
        if !MODULES.contains(&import.module.as_str()) {
            return Err(CompileError::new(
                import.line,
                format!("unknown import '{}'", import.module),
            ));
        }
        imported.insert(import.module.as_str());
    }

    let checker = Checker { imported };
    for constant in &unit.consts {
        checker.expr(&constant.value)?;
    }
    if let Some(body) = &unit.invoke {
        checker.block(body)?;
    }
    Ok(())
}

struct Checker<'a> {
    imported: BTreeSet<&'a str>,
}

impl Checker<'_> {
    fn block(&self, stmts: &[Stmt]) -> Result<(), CompileError> {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn stmt(&self, stmt: &Stmt) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::Let(_, value) | StmtKind::Set(_, value) | StmtKind::Expr(value) => {
                self.expr(value)
            }
            StmtKind::Return(value) => value.as_ref().map_or(Ok(()), |v| self.expr(v)),
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond)?;
                self.block(then)?;
                self.block(otherwise)
            }
        }
    }

    fn expr(&self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(_) | Expr::Var(_) => Ok(()),
            Expr::Array(items) => items.iter().try_for_each(|item| self.expr(item)),
            Expr::Member(target, _) => self.expr(target),
            Expr::Index(target, index) => {
                self.expr(target)?;
                self.expr(index)
            }
            Expr::Unary(_, operand) => self.expr(operand),
            Expr::Binary(_, left, right) => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::Call {
                module,
                function,
                args,
                line,
            } => {
                let (qualified, arity) = match module {
                    None => (function.clone(), builtin_arity(function)),
                    Some(module) => {
                        if !MODULES.contains(&module.as_str()) {
                            return Err(CompileError::new(
                                *line,
                                format!("unknown module '{}'", module),
                            ));
                        }
                        if !self.imported.contains(module.as_str()) {
                            return Err(CompileError::new(
                                *line,
                                format!("module '{}' is not imported", module),
                            ));
                        }
                        (format!("{}.{}", module, function), module_arity(module, function))
                    }
                };

                let arity = arity.ok_or_else(|| {
                    CompileError::new(*line, format!("unknown function '{}'", qualified))
                })?;
                if !arity.accepts(args.len()) {
                    return Err(CompileError::new(
                        *line,
                        format!(
                            "{}() takes {}, got {}",
                            qualified,
                            arity.describe(),
                            args.len()
                        ),
                    ));
                }
                args.iter().try_for_each(|arg| self.expr(arg))
            }
        }
    }
}
