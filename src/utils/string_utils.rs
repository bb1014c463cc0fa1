//! String formatting helpers.

/// Join items into a human-readable list using "and", without an Oxford comma.
///
/// ```
/// use isobar::utils::list_to_human;
/// assert_eq!(list_to_human(&["wind", "rain", "snow"]), "wind, rain and snow");
/// ```
pub fn list_to_human<S: AsRef<str>>(items: &[S]) -> String {
    list_to_human_with(items, "and", false)
}

/// Join items into a human-readable list.
///
/// One item is returned unchanged, two are joined with the conjunction, and
/// longer lists are comma separated with the conjunction before the last item.
pub fn list_to_human_with<S: AsRef<str>>(items: &[S], conjunction: &str, oxford_comma: bool) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} {} {}", first.as_ref(), conjunction, second.as_ref()),
        [head @ .., last] => {
            let mut joined = head
                .iter()
                .map(|item| item.as_ref())
                .collect::<Vec<_>>()
                .join(", ");
            if oxford_comma {
                joined.push(',');
            }
            format!("{} {} {}", joined, conjunction, last.as_ref())
        }
    }
}

/// Split a CamelCase string into its words.
///
/// Strings without an uppercase letter after the first character, such as
/// snake_case names, come back as a single word.
pub fn split_camel_case(s: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in s.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Uppercase the first character of a string.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
