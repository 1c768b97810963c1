//! Built-in functions and importable modules.

use loadstone_entity::Value;

/// How many arguments a function takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            Arity::Exact(1) => "1 argument".to_string(),
            Arity::Exact(n) => format!("{} arguments", n),
            Arity::AtLeast(n) => format!("at least {} argument(s)", n),
        }
    }
}

/// Modules a unit may `import`.
pub const MODULES: &[&str] = &["math", "text"];

/// Arity of a global builtin, `None` if there is no such builtin.
pub fn builtin_arity(name: &str) -> Option<Arity> {
    match name {
        "len" | "str" | "int" | "keys" => Some(Arity::Exact(1)),
        "has" => Some(Arity::Exact(2)),
        _ => None,
    }
}

/// Arity of `module.name`, `None` if the module has no such function.
pub fn module_arity(module: &str, name: &str) -> Option<Arity> {
    match (module, name) {
        ("text", "upper" | "lower" | "trim") => Some(Arity::Exact(1)),
        ("text", "concat") => Some(Arity::AtLeast(0)),
        ("text", "join" | "contains") => Some(Arity::Exact(2)),
        ("text", "replace") => Some(Arity::Exact(3)),
        ("math", "min" | "max") => Some(Arity::AtLeast(1)),
        ("math", "abs" | "round") => Some(Arity::Exact(1)),
        _ => None,
    }
}

pub fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value, String> {
    let mut args = args.into_iter();
    let first = args.next().unwrap_or_default();
    match name {
        "len" => {
            let len = match &first {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::Bytes(bytes) => bytes.len(),
                other => return Err(format!("len() of {}", other.type_name())),
            };
            Ok(Value::Integer(len as i64))
        }
        "str" => Ok(Value::String(first.to_string())),
        "int" => match &first {
            Value::Integer(i) => Ok(Value::Integer(*i)),
            Value::Float(x) if x.is_finite() => Ok(Value::Integer(x.trunc() as i64)),
            Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("int(): '{}' is not an integer", s)),
            other => Err(format!("int() of {}", other.type_name())),
        },
        "keys" => match first {
            Value::Map(map) => Ok(Value::Array(map.into_keys().map(Value::String).collect())),
            other => Err(format!("keys() of {}", other.type_name())),
        },
        "has" => {
            let key = args.next().unwrap_or_default();
            match (&first, &key) {
                (Value::Map(map), Value::String(k)) => Ok(Value::Bool(map.contains_key(k))),
                (Value::Array(items), needle) => Ok(Value::Bool(items.contains(needle))),
                (Value::Null, _) => Ok(Value::Bool(false)),
                (other, _) => Err(format!("has() on {}", other.type_name())),
            }
        }
        _ => Err(format!("unknown function '{}'", name)),
    }
}

pub fn call_module(module: &str, name: &str, args: Vec<Value>) -> Result<Value, String> {
    match module {
        "text" => text(name, args),
        "math" => math(name, args),
        _ => Err(format!("unknown module '{}'", module)),
    }
}

fn text(name: &str, args: Vec<Value>) -> Result<Value, String> {
    let strings: Vec<String> = args.iter().map(Value::to_string).collect();
    let arg = |i: usize| strings.get(i).map(String::as_str).unwrap_or_default();

    let result = match name {
        "upper" => Value::String(arg(0).to_uppercase()),
        "lower" => Value::String(arg(0).to_lowercase()),
        "trim" => Value::String(arg(0).trim().to_string()),
        "concat" => Value::String(strings.concat()),
        "join" => match args.first() {
            Some(Value::Array(items)) => {
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                Value::String(parts.join(arg(1)))
            }
            Some(other) => return Err(format!("text.join() of {}", other.type_name())),
            None => Value::String(String::new()),
        },
        "contains" => Value::Bool(arg(0).contains(arg(1))),
        "replace" => Value::String(arg(0).replace(arg(1), arg(2))),
        _ => return Err(format!("unknown function 'text.{}'", name)),
    };
    Ok(result)
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("math.{}() of {}", name, value.type_name()))
}

fn math(name: &str, args: Vec<Value>) -> Result<Value, String> {
    match name {
        "min" | "max" => {
            let mut best: Option<Value> = None;
            for arg in args {
                let candidate = number(name, &arg)?;
                let replace = match &best {
                    None => true,
                    Some(current) => {
                        let current = number(name, current)?;
                        if name == "min" {
                            candidate < current
                        } else {
                            candidate > current
                        }
                    }
                };
                if replace {
                    best = Some(arg);
                }
            }
            Ok(best.unwrap_or_default())
        }
        "abs" => match args.first() {
            Some(Value::Integer(i)) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| "math.abs() overflow".to_string()),
            Some(other) => Ok(Value::Float(number(name, other)?.abs())),
            None => Ok(Value::Null),
        },
        "round" => match args.first() {
            Some(Value::Integer(i)) => Ok(Value::Integer(*i)),
            Some(other) => Ok(Value::Integer(number(name, other)?.round() as i64)),
            None => Ok(Value::Null),
        },
        _ => Err(format!("unknown function 'math.{}'", name)),
    }
}
