//! Minimal HTML helpers: escaping, and flattening markup to the text a rich
//! text view would show.

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "thead", "tbody",
    "tr", "pre", "blockquote", "dl", "dt", "dd", "hr",
];

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Flatten an HTML fragment to plain text.
///
/// Whitespace runs collapse to one space and never start a line, `<br>`
/// breaks the line (`</br>` is ignored), block elements end the current
/// line, table cells are tab separated, `<pre>` keeps its whitespace, and
/// entities are decoded.
pub fn html_to_plain(html: &str) -> String {
    let mut flat = Flattener::default();
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        let (text, tail) = rest.split_at(lt);
        flat.text(text);

        if let Some(body) = tail.strip_prefix("<!--") {
            rest = match body.find("-->") {
                Some(end) => body.get(end + 3..).unwrap_or_default(),
                None => "",
            };
            continue;
        }

        match tail.find('>') {
            Some(gt) => {
                let inner = tail.get(1..gt).unwrap_or_default();
                flat.tag(inner);
                rest = tail.get(gt + 1..).unwrap_or_default();
            }
            None => {
                // A lone '<' with no closing bracket is literal text.
                flat.text(tail);
                rest = "";
            }
        }
    }
    flat.text(rest);
    flat.out
}

#[derive(Default)]
struct Flattener {
    out: String,
    pending_space: bool,
    pre_depth: usize,
    row_cells: usize,
}

impl Flattener {
    fn text(&mut self, text: &str) {
        for (c, literal) in decode_entities(text) {
            if self.pre_depth > 0 || literal {
                self.flush_space();
                self.out.push(c);
            } else if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.flush_space();
                self.out.push(c);
            }
        }
    }

    fn flush_space(&mut self) {
        if self.pending_space && !self.out.is_empty() && !self.out.ends_with(['\n', '\t']) {
            self.out.push(' ');
        }
        self.pending_space = false;
    }

    fn end_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.pending_space = false;
        self.row_cells = 0;
    }

    fn tag(&mut self, inner: &str) {
        let inner = inner.trim();
        let (closing, rest) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match name.as_str() {
            "br" => {
                if !closing {
                    self.out.push('\n');
                    self.pending_space = false;
                }
            }
            "td" | "th" => {
                if !closing {
                    if self.row_cells > 0 {
                        self.out.push('\t');
                    }
                    self.row_cells += 1;
                }
                self.pending_space = false;
            }
            "pre" => {
                self.end_line();
                if closing {
                    self.pre_depth = self.pre_depth.saturating_sub(1);
                } else {
                    self.pre_depth += 1;
                }
            }
            "li" if !closing => {
                self.end_line();
                self.out.push_str("\u{2022} ");
            }
            tag if BLOCK_TAGS.contains(&tag) => self.end_line(),
            _ => {}
        }
    }
}

/// Decode character references. The flag marks characters that must not
/// take part in whitespace collapsing (`&nbsp;`).
fn decode_entities(text: &str) -> Vec<(char, bool)> {
    let mut out = Vec::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        let (before, tail) = rest.split_at(amp);
        out.extend(before.chars().map(|c| (c, false)));
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| {
                let name = tail.get(1..semi)?;
                Some((decode_entity(name)?, semi))
            });
        match decoded {
            Some(((c, literal), semi)) => {
                out.push((c, literal));
                rest = tail.get(semi + 1..).unwrap_or_default();
            }
            None => {
                out.push(('&', false));
                rest = tail.get(1..).unwrap_or_default();
            }
        }
    }
    out.extend(rest.chars().map(|c| (c, false)));
    out
}

fn decode_entity(name: &str) -> Option<(char, bool)> {
    let c = match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => return Some((' ', true)),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((c, false))
}
