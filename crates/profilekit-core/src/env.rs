//! `%NAME%` placeholder expansion.

/// Replace every `%NAME%` token with the value returned by `lookup`.
///
/// Unknown tokens are kept verbatim. When a token cannot be resolved the
/// closing `%` is reused as the opening of the next candidate, matching the
/// Windows expansion rules.
pub fn expand_tokens<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => {
                out.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                out.push_str(name);
                rest = &after[end..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expand `%NAME%` tokens from the process environment.
///
/// Variable names are matched case-insensitively.
pub fn expand_env(input: &str) -> String {
    expand_tokens(input, lookup_env)
}

fn lookup_env(name: &str) -> Option<String> {
    if let Ok(value) = std::env::var(name) {
        return Some(value);
    }
    std::env::vars()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}
