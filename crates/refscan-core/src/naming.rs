/// Turns a serialized field name into the label shown to users.
///
/// `m_targetObject` becomes `Target Object`, `kMaxCount` becomes `Max Count`,
/// `HTMLParser` becomes `HTML Parser`.
pub fn nicify_variable_name(name: &str) -> String {
    let trimmed = strip_field_prefix(name);
    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
            continue;
        }
        if c == '_' {
            if !out.ends_with(' ') {
                out.push(' ');
            }
            continue;
        }

        let prev = chars[i - 1];
        let next = chars.get(i + 1).copied();
        let starts_word = c.is_uppercase()
            && (prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase())));
        if starts_word && !out.ends_with(' ') {
            out.push(' ');
        }
        out.push(c);
    }

    out.trim_end().to_string()
}

fn strip_field_prefix(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix("m_") {
        if !rest.is_empty() {
            return rest;
        }
    }
    if let Some(rest) = name.strip_prefix('_') {
        if !rest.is_empty() {
            return rest;
        }
    }
    if let Some(rest) = name.strip_prefix('k') {
        if rest.chars().next().is_some_and(|c| c.is_uppercase()) {
            return rest;
        }
    }
    name
}
