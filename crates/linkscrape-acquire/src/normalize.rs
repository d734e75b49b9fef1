/// Uppercase the first character and lowercase everything after it.
///
/// This is sentence capitalization, not title case: `"Good Link"` becomes
/// `"Good link"`. The first character takes its full uppercase mapping, not
/// its titlecase form, so `"ßig"` becomes `"SSig"` and `"ǆ"` becomes `"Ǆ"`.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.as_str().to_lowercase().chars())
            .collect(),
        None => String::new(),
    }
}
