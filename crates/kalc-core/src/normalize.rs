//! Expression normalizer: rewrites raw user input into the constrained
//! grammar accepted by the tokenizer. Visual glyphs become ASCII operators,
//! unicode constants become identifiers, and an empty expression becomes a
//! literal zero. Constants are NOT textually substituted with decimal
//! values; the evaluator resolves them as identifiers, so names can never
//! collide with parts of other identifiers.

/// Normalize a raw expression. Unknown tokens are left as-is and surface
/// as evaluation errors downstream, not rejected here.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "0".to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '×' => out.push('*'),
            '÷' => out.push('/'),
            // U+2212 minus sign, as emitted by some frontends
            '−' => out.push('-'),
            '√' => out.push_str("sqrt"),
            'π' => out.push_str("pi"),
            'τ' => out.push_str("tau"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip an optional `f(x)=` label from a plotted function expression.
pub fn strip_plot_label(expr: &str) -> &str {
    let s = expr.trim();
    for prefix in ["f(x)=", "f(x) ="] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return rest.trim();
        }
    }
    s
}
