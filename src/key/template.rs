//! Cache key templates with positional and named placeholders.

use serde_json::Value;
use tracing::{debug, warn};

use super::ParamNames;

// == Segments ==
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    /// `{0}`, `{1}`, ...
    Index(usize),
    /// `{user_id}`; also holds numerals too large for `usize`, which never resolve.
    Name(String),
}

// == Key Template ==
/// A parsed cache key template such as `"user:{0}:{kind}"`.
///
/// Placeholder tokens are `[A-Za-z0-9_-]+`. `{{token}}` is accepted as a synonym
/// of `{token}`. Braces around anything else are kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    /// Parses a template. Parsing never fails; malformed braces stay literal.
    pub fn new(template: impl Into<String>) -> Self {
        let raw = template.into();
        let segments = parse(&raw);
        Self { raw, segments }
    }

    /// The template text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of placeholders in the template.
    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder(_)))
            .count()
    }

    // == Resolve ==
    /// Substitutes every placeholder from `args`.
    ///
    /// Returns `None` (unresolvable) when the template is empty, or when any
    /// placeholder names an unknown parameter or an index outside `args`. There is
    /// no partial substitution.
    pub fn resolve(&self, params: &ParamNames, args: &[Value]) -> Option<String> {
        if self.raw.is_empty() {
            warn!("Key template is empty");
            return None;
        }

        let mut key = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Placeholder(placeholder) => {
                    let index = match placeholder {
                        Placeholder::Index(i) => Some(*i),
                        Placeholder::Name(name) => params.position(name),
                    };
                    let Some(arg) = index.and_then(|i| args.get(i)) else {
                        warn!(
                            template = %self.raw,
                            placeholder = ?placeholder,
                            args = args.len(),
                            "Key template placeholder cannot be resolved"
                        );
                        return None;
                    };
                    key.push_str(&render_arg(arg));
                }
            }
        }

        debug!(template = %self.raw, key = %key, "Resolved cache key");
        Some(key)
    }
}

impl From<&str> for KeyTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for KeyTemplate {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

/// One-off resolution without keeping the parsed template around.
pub fn resolve_key(template: &str, params: &ParamNames, args: &[Value]) -> Option<String> {
    KeyTemplate::new(template).resolve(params, args)
}

/// Structured arguments are embedded as canonical JSON, scalars as plain text.
fn render_arg(arg: &Value) -> String {
    match arg {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Null, arrays and maps serialize infallibly.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

// == Parsing ==
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn placeholder(token: &str) -> Placeholder {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        match token.parse::<usize>() {
            Ok(i) => Placeholder::Index(i),
            Err(_) => Placeholder::Name(token.to_string()),
        }
    } else {
        Placeholder::Name(token.to_string())
    }
}

/// Length of a `[A-Za-z0-9_-]+` run at the start of `s`.
fn token_len(s: &str) -> usize {
    s.find(|c: char| !is_token_char(c)).unwrap_or(s.len())
}

fn parse(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        let after = &rest[open..];

        // Doubled braces first: {{token}}
        let doubled = after.strip_prefix("{{").and_then(|inner| {
            let len = token_len(inner);
            (len > 0 && inner[len..].starts_with("}}")).then(|| (&inner[..len], 4 + len))
        });
        let single = || {
            let inner = &after[1..];
            let len = token_len(inner);
            (len > 0 && inner[len..].starts_with('}')).then(|| (&inner[..len], 2 + len))
        };

        match doubled.or_else(single) {
            Some((token, consumed)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(placeholder(token)));
                rest = &after[consumed..];
            }
            None => {
                literal.push('{');
                rest = &after[1..];
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}
