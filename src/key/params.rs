//! Declared parameter names of a cached operation.

/// Ordered parameter names of the wrapped operation.
///
/// Named placeholders (`{user_id}`) resolve to the argument at the position of the
/// matching name. The list is declared once when a policy is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamNames {
    names: Vec<String>,
}

impl ParamNames {
    /// Builds the index from names given in declaration order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the index from signature-like text, e.g.
    /// `"user_id: u64, mut kind: &str, page = 1"`.
    ///
    /// Comments are stripped first. Each parameter is reduced to its bound name:
    /// type annotations, default values and `mut`/`ref`/`...` markers are dropped.
    /// Destructuring patterns only get a best-effort name.
    pub fn from_signature(signature: &str) -> Self {
        let cleaned = strip_comments(signature);
        let names = split_top_level(&cleaned)
            .into_iter()
            .filter_map(|param| bound_name(&param))
            .collect();
        Self { names }
    }

    /// Position of `name`, if declared.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Splits on commas that are not nested in brackets or generics.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);
    parts
}

fn bound_name(param: &str) -> Option<String> {
    let mut binding = param.trim();
    if let Some(idx) = binding.find('=') {
        binding = &binding[..idx];
    }
    // A leading pattern keeps its own colons (struct patterns), so only cut the
    // annotation for plain identifiers.
    if !binding.starts_with(['{', '(', '[']) {
        if let Some(idx) = binding.find(':') {
            binding = &binding[..idx];
        }
    }
    let binding = binding.trim().trim_start_matches("...");
    let binding = binding
        .split_whitespace()
        .filter(|word| !matches!(*word, "mut" | "ref" | "&"))
        .last()
        .unwrap_or("");
    let name: String = binding
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
