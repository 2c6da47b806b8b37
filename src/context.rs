/// Separator written between adjacent context texts.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenate `texts` in rank order under a character budget.
///
/// A text whose addition (counting the separator that would precede it) would
/// push the result past `max_chars` is dropped whole; later texts are still
/// considered, so a smaller lower-ranked text can fill the remaining budget.
/// The relative order of included texts is never changed and the result never
/// exceeds `max_chars`.
pub fn assemble<'a, I>(texts: I, max_chars: usize) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for text in texts {
        let sep_len = if out.is_empty() {
            0
        } else {
            CONTEXT_SEPARATOR.len()
        };
        if out.len() + sep_len + text.len() > max_chars {
            continue;
        }
        if !out.is_empty() {
            out.push_str(CONTEXT_SEPARATOR);
        }
        out.push_str(text);
    }
    out
}
