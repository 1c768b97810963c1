//! Template text with `${path}` placeholders.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use loadstone_entity::Value;

/// A template that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct TemplateError {
    pub line: usize,
    pub message: String,
}

impl TemplateError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder { path: String, line: usize },
}

/// Parsed template text.
///
/// `${name}` and `${a.b.c}` are replaced with the value at that path in
/// the merge context. `$$` produces a literal `$`; a `$` followed by
/// anything else is kept as is.
///
/// # Example
///
/// ```rust
/// use loadstone_entity::Value;
/// use loadstone_template::Template;
///
/// let template = Template::parse("Dear ${user.name}, you owe $$${amount}.").unwrap();
/// let context = Value::from_json(serde_json::json!({"user": {"name": "Ada"}, "amount": 12}));
/// assert_eq!(template.render(&context).unwrap(), "Dear Ada, you owe $12.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut line = 1;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\n' {
                line += 1;
            }
            if c != '$' {
                literal.push(c);
                continue;
            }

            match chars.peek() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                }
                Some('{') => {
                    chars.next();
                    let start = line;
                    let mut path = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('\n') | None => {
                                return Err(TemplateError::new(start, "unclosed placeholder"))
                            }
                            Some(c) => path.push(c),
                        }
                    }
                    let path = check_path(path.trim(), start)?;
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder { path, line: start });
                }
                _ => literal.push('$'),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }
        Ok(Self { segments })
    }

    /// Paths of every placeholder, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { path, .. } => Some(path.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Write the template to `out` with placeholders replaced from
    /// `context`. Missing and null values render as nothing.
    pub fn merge(&self, context: &Value, out: &mut dyn Write) -> io::Result<()> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.write_all(text.as_bytes())?,
                Segment::Placeholder { path, line } => match context.get(path) {
                    None | Some(Value::Null) => {
                        tracing::trace!(path = %path, line, "placeholder has no value");
                    }
                    Some(value) => write!(out, "{}", value)?,
                },
            }
        }
        Ok(())
    }

    /// Merge into a string.
    pub fn render(&self, context: &Value) -> io::Result<String> {
        let mut out = Vec::new();
        self.merge(context, &mut out)?;
        String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn check_path(path: &str, line: usize) -> Result<String, TemplateError> {
    if path.is_empty() {
        return Err(TemplateError::new(line, "empty placeholder"));
    }
    let valid = path.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    });
    if !valid {
        return Err(TemplateError::new(
            line,
            format!("invalid placeholder '${{{}}}'", path),
        ));
    }
    Ok(path.to_string())
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => f.write_str(&text.replace('$', "$$"))?,
                Segment::Placeholder { path, .. } => write!(f, "${{{}}}", path)?,
            }
        }
        Ok(())
    }
}
