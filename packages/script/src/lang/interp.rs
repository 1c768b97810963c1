//! Tree-walking evaluation of unit bodies.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use loadstone_entity::Value;

use super::ast::{BinaryOp, Const, Expr, Stmt, StmtKind, UnaryOp};
use super::builtins::{call_builtin, call_module};
use super::RuntimeError;

/// Evaluate const declarations in order. Each may refer to earlier ones.
pub fn eval_consts(consts: &[Const]) -> Result<BTreeMap<String, Value>, RuntimeError> {
    let mut values = BTreeMap::new();
    for constant in consts {
        let value = {
            let frame = Frame {
                consts: &values,
                locals: HashMap::new(),
            };
            frame
                .eval(&constant.value, None)
                .map_err(|message| RuntimeError::new(constant.line, message))?
        };
        values.insert(constant.name.clone(), value);
    }
    Ok(values)
}

/// Run an invoke body against `ctx`.
pub fn run(
    body: &[Stmt],
    consts: &BTreeMap<String, Value>,
    ctx: &mut Value,
) -> Result<Value, RuntimeError> {
    let mut frame = Frame {
        consts,
        locals: HashMap::new(),
    };
    match frame.block(body, ctx)? {
        Flow::Return(value) => Ok(value),
        Flow::Next => Ok(Value::Null),
    }
}

enum Flow {
    Next,
    Return(Value),
}

struct Frame<'a> {
    consts: &'a BTreeMap<String, Value>,
    locals: HashMap<String, Value>,
}

impl Frame<'_> {
    fn block(&mut self, stmts: &[Stmt], ctx: &mut Value) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.stmt(stmt, ctx)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn stmt(&mut self, stmt: &Stmt, ctx: &mut Value) -> Result<Flow, RuntimeError> {
        let at = |message: String| RuntimeError::new(stmt.line, message);

        match &stmt.kind {
            StmtKind::Let(name, expr) => {
                let value = self.eval(expr, Some(&*ctx)).map_err(at)?;
                self.locals.insert(name.clone(), value);
            }
            StmtKind::Set(path, expr) => {
                let value = self.eval(expr, Some(&*ctx)).map_err(at)?;
                if ctx.is_null() {
                    *ctx = Value::map();
                }
                ctx.set(path, value)
                    .map_err(|e| at(format!("cannot set '{}': {}", path, e)))?;
            }
            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, Some(&*ctx)).map_err(at)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                let taken = truthy(&self.eval(cond, Some(&*ctx)).map_err(at)?);
                return self.block(if taken { then } else { otherwise }, ctx);
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, Some(&*ctx)).map_err(at)?;
            }
        }
        Ok(Flow::Next)
    }

    fn lookup(&self, name: &str, ctx: Option<&Value>) -> Result<Value, String> {
        if let Some(value) = self.locals.get(name).or_else(|| self.consts.get(name)) {
            return Ok(value.clone());
        }
        match (name, ctx) {
            ("ctx", Some(ctx)) => Ok(ctx.clone()),
            ("ctx", None) => Err("'ctx' is not available in const declarations".to_string()),
            _ => Err(format!("unknown variable '{}'", name)),
        }
    }

    fn eval(&self, expr: &Expr, ctx: Option<&Value>) -> Result<Value, String> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => self.lookup(name, ctx),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Member(target, name) => member(self.eval(target, ctx)?, name),
            Expr::Index(target, index) => {
                index_into(self.eval(target, ctx)?, self.eval(index, ctx)?)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, ctx)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                    UnaryOp::Neg => match value {
                        Value::Integer(i) => i
                            .checked_neg()
                            .map(Value::Integer)
                            .ok_or_else(|| "integer overflow".to_string()),
                        Value::Float(x) => Ok(Value::Float(-x)),
                        other => Err(format!("cannot negate {}", other.type_name())),
                    },
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let result = truthy(&self.eval(left, ctx)?) && truthy(&self.eval(right, ctx)?);
                Ok(Value::Bool(result))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let result = truthy(&self.eval(left, ctx)?) || truthy(&self.eval(right, ctx)?);
                Ok(Value::Bool(result))
            }
            Expr::Binary(op, left, right) => {
                binary(*op, self.eval(left, ctx)?, self.eval(right, ctx)?)
            }
            Expr::Call {
                module,
                function,
                args,
                ..
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                match module {
                    Some(module) => call_module(module, function, args),
                    None => call_builtin(function, args),
                }
            }
        }
    }
}

/// Null, false, zero and empty values are false; everything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
    }
}

fn member(target: Value, name: &str) -> Result<Value, String> {
    match target {
        Value::Map(mut map) => Ok(map.remove(name).unwrap_or_default()),
        Value::Null => Ok(Value::Null),
        other => Err(format!("{} has no member '{}'", other.type_name(), name)),
    }
}

fn index_into(target: Value, index: Value) -> Result<Value, String> {
    match (target, index) {
        (Value::Array(mut items), Value::Integer(i)) => {
            let len = items.len() as i64;
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                Ok(items.swap_remove(i as usize))
            } else {
                Ok(Value::Null)
            }
        }
        (Value::Map(mut map), Value::String(key)) => Ok(map.remove(&key).unwrap_or_default()),
        (Value::Null, _) => Ok(Value::Null),
        (target, index) => Err(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        )),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            (*a as f64) == *b
        }
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Result<Ordering, String> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        )
    })
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, String> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b).map(Value::Integer).ok_or_else(|| {
            if *b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Rem) {
                "division by zero".to_string()
            } else {
                "integer overflow".to_string()
            }
        }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(format!(
                "unsupported operand types {} and {}",
                left.type_name(),
                right.type_name()
            )),
        },
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, String> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Array(mut a), Value::Array(b)) => {
                a.extend(b);
                Ok(Value::Array(a))
            }
            (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left, right)))
            }
            (left, right) => arithmetic(op, &left, &right, i64::checked_add, |a, b| a + b),
        },
        BinaryOp::Sub => arithmetic(op, &left, &right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, &left, &right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => arithmetic(op, &left, &right, i64::checked_div, |a, b| a / b),
        BinaryOp::Rem => arithmetic(op, &left, &right, i64::checked_rem, |a, b| a % b),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare(&left, &right)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(&left, &right)? != Ordering::Less)),
        BinaryOp::And => Ok(Value::Bool(truthy(&left) && truthy(&right))),
        BinaryOp::Or => Ok(Value::Bool(truthy(&left) || truthy(&right))),
    }
}
