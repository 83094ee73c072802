//! Variable expansion over scenario content
//!
//! Raw scenario bytes go through environment-variable expansion before the
//! YAML parse. At evaluation time, plugins can additionally expand
//! `$key` references against the prior-run cache.

use crate::context::RunContext;

/// Expand `$VAR` and `${VAR}` references against the process environment.
///
/// Unknown variables expand to the empty string. A literal `$$` escapes to
/// a single `$`, letting authors embed dollar-prefixed tokens in their
/// content.
pub fn expand_env(content: &str) -> String {
    expand_with(content, |name| std::env::var(name).unwrap_or_default())
}

fn expand_with(content: &str, lookup: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    out.push_str(&lookup(&name));
                } else {
                    // Unterminated brace: keep the text as written.
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut name = String::new();
                while let Some(c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&lookup(&name));
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Expand `$key` references against the context's prior-run cache.
///
/// String values pass through as-is and numbers are formatted canonically;
/// values of other types are skipped. Longer keys are substituted first so
/// a key that prefixes another cannot clobber it.
pub fn expand_prior_run(ctx: &RunContext, s: &str) -> String {
    let mut keys: Vec<&String> = ctx.prior_run().keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut out = s.to_string();
    for key in keys {
        let text = match &ctx.prior_run()[key] {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        out = out.replace(&format!("${}", key), &text);
    }
    out
}
