use std::fmt::Display;

/// Join pieces with `sep` and append `end`, like a stream `print`.
pub fn join_text<I, D>(pieces: I, sep: &str, end: &str) -> String
where
    I: IntoIterator<Item = D>,
    D: Display,
{
    let mut out = String::new();
    for (i, piece) in pieces.into_iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(&piece.to_string());
    }
    out.push_str(end);
    out
}
