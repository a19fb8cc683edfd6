//! Best-effort reStructuredText to HTML conversion.
//!
//! Covers the subset people actually print into a log: section titles,
//! paragraphs, bullet and enumerated lists, literal blocks, admonitions,
//! transitions, and the common inline markup. Anything else passes through
//! as paragraph text.

use crate::error::RstError;
use crate::html::escape_html;

const ADMONITIONS: &[&str] = &[
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "tip",
    "warning",
    "admonition",
];

/// Characters allowed right before an inline start-string.
const START_PRECEDERS: &str = "'\"([{<-/:";

/// Convert reStructuredText into an HTML body fragment.
pub fn rst_to_html(rst: &str) -> Result<String, RstError> {
    let mut parser = Parser {
        lines: rst.lines().collect(),
        pos: 0,
        html: String::new(),
        title_styles: Vec::new(),
    };
    parser.run()?;
    Ok(parser.html)
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    html: String,
    /// Adornment styles in order of first appearance; index + 1 is the level.
    title_styles: Vec<(char, bool)>,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), RstError> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                self.pos += 1;
                continue;
            }
            if self.title()? {
                continue;
            }
            if is_adornment(line) {
                self.html.push_str("<hr class=\"docutils\" />\n");
                self.pos += 1;
            } else if bullet_marker(line).is_some() {
                self.list(false)?;
            } else if enum_marker(line).is_some() {
                self.list(true)?;
            } else if let Some(rest) = line.strip_prefix(".. ") {
                self.directive(rest)?;
            } else if indent(line) > 0 {
                self.block_quote()?;
            } else {
                self.paragraph()?;
            }
        }
        Ok(())
    }

    fn line(&self, at: usize) -> Option<&'a str> {
        self.lines.get(at).copied()
    }

    fn title(&mut self) -> Result<bool, RstError> {
        let l0 = self.lines[self.pos];
        let (style, text, consumed) = match (self.line(self.pos + 1), self.line(self.pos + 2)) {
            (Some(l1), Some(l2))
                if is_adornment(l0) && !is_blank(l1) && l2.trim_end() == l0.trim_end() =>
            {
                ((adornment_char(l0), true), l1.trim(), 3)
            }
            (Some(l1), _) if !is_adornment(l0) && indent(l0) == 0 && is_adornment(l1) => {
                ((adornment_char(l1), false), l0.trim(), 2)
            }
            _ => return Ok(false),
        };

        let level = match self.title_styles.iter().position(|s| *s == style) {
            Some(i) => i + 1,
            None => {
                self.title_styles.push(style);
                self.title_styles.len()
            }
        }
        .min(6);

        let body = inline(text, self.pos + usize::from(style.1))?;
        self.html.push_str(&format!("<h{level}>{body}</h{level}>\n"));
        self.pos += consumed;
        Ok(true)
    }

    fn list(&mut self, ordered: bool) -> Result<(), RstError> {
        let tag = if ordered { "ol" } else { "ul" };
        let marker = |line: &str| {
            if ordered {
                enum_marker(line)
            } else {
                bullet_marker(line)
            }
        };

        self.html.push_str(&format!("<{tag}>\n"));
        while let Some(width) = self.line(self.pos).and_then(marker) {
            let start = self.pos;
            let first = self.lines[self.pos].get(width..).unwrap_or_default();
            let mut text = first.trim().to_string();
            self.pos += 1;
            while let Some(next) = self.line(self.pos) {
                if is_blank(next) || indent(next) == 0 {
                    break;
                }
                text.push('\n');
                text.push_str(next.trim());
                self.pos += 1;
            }
            self.html
                .push_str(&format!("<li>{}</li>\n", inline(&text, start)?));

            let mut look = self.pos;
            while self.line(look).is_some_and(is_blank) {
                look += 1;
            }
            if self.line(look).and_then(marker).is_some() {
                self.pos = look;
            } else {
                break;
            }
        }
        self.html.push_str(&format!("</{tag}>\n"));
        Ok(())
    }

    fn directive(&mut self, rest: &str) -> Result<(), RstError> {
        let start = self.pos;
        self.pos += 1;
        let body = self.indented_lines();

        let Some((name, arg)) = rest.split_once("::") else {
            // A comment.
            return Ok(());
        };
        let name = name.trim().to_ascii_lowercase();
        if !ADMONITIONS.contains(&name.as_str()) {
            return Ok(());
        }

        let arg = arg.trim();
        let (title, mut text) = if name == "admonition" {
            (arg.to_string(), String::new())
        } else {
            (capitalize(&name), arg.to_string())
        };
        if !body.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&dedent(&body).join("\n"));
        }

        self.html.push_str(&format!(
            "<div class=\"admonition {name}\">\n<p class=\"admonition-title\">{}</p>\n",
            escape_html(&title)
        ));
        for (offset, para) in paragraphs(&text) {
            self.html
                .push_str(&format!("<p>{}</p>\n", inline(&para, start + 1 + offset)?));
        }
        self.html.push_str("</div>\n");
        Ok(())
    }

    fn block_quote(&mut self) -> Result<(), RstError> {
        let start = self.pos;
        let body = dedent(&self.indented_lines()).join("\n");
        self.html.push_str("<blockquote>\n");
        for (offset, para) in paragraphs(&body) {
            self.html
                .push_str(&format!("<p>{}</p>\n", inline(&para, start + offset)?));
        }
        self.html.push_str("</blockquote>\n");
        Ok(())
    }

    fn paragraph(&mut self) -> Result<(), RstError> {
        let start = self.pos;
        let mut text_lines = Vec::new();
        while let Some(line) = self.line(self.pos) {
            if is_blank(line) {
                break;
            }
            text_lines.push(line.trim());
            self.pos += 1;
        }
        let text = text_lines.join("\n");

        let (text, literal_follows) = match text.strip_suffix("::") {
            Some(head) if head.is_empty() => (String::new(), true),
            Some(head) if head.ends_with(char::is_whitespace) => (head.trim_end().to_string(), true),
            Some(head) => (format!("{head}:"), true),
            None => (text, false),
        };

        if !text.is_empty() {
            self.html
                .push_str(&format!("<p>{}</p>\n", inline(&text, start)?));
        }
        if literal_follows {
            self.literal_block();
        }
        Ok(())
    }

    fn literal_block(&mut self) {
        let mut look = self.pos;
        while self.line(look).is_some_and(is_blank) {
            look += 1;
        }
        if !self.line(look).is_some_and(|l| indent(l) > 0) {
            return;
        }
        self.pos = look;
        let body = dedent(&self.indented_lines()).join("\n");
        self.html.push_str(&format!(
            "<pre class=\"literal-block\">\n{}\n</pre>\n",
            escape_html(&body)
        ));
    }

    /// Consume indented (and interleaved blank) lines, dropping trailing
    /// blanks.
    fn indented_lines(&mut self) -> Vec<&'a str> {
        let mut body = Vec::new();
        while let Some(line) = self.line(self.pos) {
            if !is_blank(line) && indent(line) == 0 {
                break;
            }
            body.push(line);
            self.pos += 1;
        }
        while body.last().is_some_and(|l| is_blank(l)) {
            body.pop();
        }
        while body.first().is_some_and(|l| is_blank(l)) {
            body.remove(0);
        }
        body
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn is_adornment(line: &str) -> bool {
    let line = line.trim_end();
    let mut chars = line.chars();
    match chars.next() {
        Some(first) if first.is_ascii_punctuation() => {
            line.chars().count() >= 3 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

fn adornment_char(line: &str) -> char {
    line.chars().next().unwrap_or('=')
}

/// Byte width of a bullet marker including its trailing space.
fn bullet_marker(line: &str) -> Option<usize> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some('-' | '*' | '+'), Some(' ')) => Some(2),
        (Some('-' | '*' | '+'), None) => Some(1),
        _ => None,
    }
}

/// Byte width of an enumeration marker (`1.`, `2)`, `#.`) plus its space.
fn enum_marker(line: &str) -> Option<usize> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    let head = if digits > 0 {
        digits
    } else if line.starts_with('#') {
        1
    } else {
        return None;
    };
    let rest = line.get(head..)?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('.' | ')'), Some(' ')) => Some(head + 2),
        _ => None,
    }
}

fn dedent<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let min = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|&l| {
            let skip: usize = l.chars().take(min).map(char::len_utf8).sum();
            l.get(skip..).unwrap_or_default()
        })
        .collect()
}

/// Split text on blank lines, keeping each paragraph's starting line offset.
fn paragraphs(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;
    for (i, line) in text.lines().enumerate() {
        if is_blank(line) {
            if !current.is_empty() {
                out.push((start, current.join("\n")));
                current.clear();
            }
        } else {
            if current.is_empty() {
                start = i;
            }
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        out.push((start, current.join("\n")));
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Convert inline markup. `first_line` is the zero-based line the text
/// starts on, used for error positions.
fn inline(text: &str, first_line: usize) -> Result<String, RstError> {
    let chars: Vec<char> = text.chars().collect();
    let line_at = |i: usize| first_line + 1 + chars[..i].iter().filter(|&&c| c == '\n').count();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            out.push_str(&escape_html(&chars[i + 1].to_string()));
            i += 2;
            continue;
        }

        let (start_len, markup) = if starts_with(&chars, i, "``") {
            (2, "literal")
        } else if starts_with(&chars, i, "**") {
            (2, "strong")
        } else if c == '*' {
            (1, "emphasis")
        } else if c == '`' {
            (1, "interpreted text")
        } else {
            out.push_str(&escape_html(&c.to_string()));
            i += 1;
            continue;
        };

        if !can_start(&chars, i, start_len) {
            out.push_str(&escape_html(&c.to_string()));
            i += 1;
            continue;
        }

        let delim: String = chars[i..i + start_len].iter().collect();
        let from = i + start_len;
        let Some(end) = find_end(&chars, from, &delim) else {
            return Err(RstError::UnterminatedInline {
                markup,
                line: line_at(i),
            });
        };
        let content: String = chars[from..end].iter().collect();
        let mut next = end + start_len;

        match markup {
            "literal" => out.push_str(&format!(
                "<tt class=\"docutils literal\">{}</tt>",
                escape_html(&content)
            )),
            "strong" => out.push_str(&format!("<strong>{}</strong>", escape_html(&content))),
            "emphasis" => out.push_str(&format!("<em>{}</em>", escape_html(&content))),
            _ => {
                let underscores = chars[next..].iter().take(2).take_while(|&&c| c == '_').count();
                if underscores == 0 {
                    out.push_str(&format!("<cite>{}</cite>", escape_html(&content)));
                } else {
                    next += underscores;
                    out.push_str(&link(&content, line_at(i))?);
                }
            }
        }
        i = next;
    }
    Ok(out)
}

fn link(content: &str, line: usize) -> Result<String, RstError> {
    match content.find('<') {
        Some(lt) => {
            let label = content.get(..lt).unwrap_or_default().trim();
            let target = content
                .get(lt + 1..)
                .and_then(|t| t.strip_suffix('>'))
                .ok_or(RstError::MalformedLink { line })?;
            let label = if label.is_empty() { target } else { label };
            Ok(format!(
                "<a class=\"reference external\" href=\"{}\">{}</a>",
                escape_html(target),
                escape_html(label)
            ))
        }
        None => Ok(format!(
            "<a class=\"reference internal\" href=\"#{}\">{}</a>",
            slugify(content),
            escape_html(content)
        )),
    }
}

fn starts_with(chars: &[char], at: usize, pat: &str) -> bool {
    let mut idx = at;
    for p in pat.chars() {
        if chars.get(idx) != Some(&p) {
            return false;
        }
        idx += 1;
    }
    true
}

/// Inline start-strings must follow whitespace or opening punctuation and be
/// followed by non-whitespace.
fn can_start(chars: &[char], at: usize, len: usize) -> bool {
    let before_ok = at == 0 || {
        let prev = chars[at - 1];
        prev.is_whitespace() || START_PRECEDERS.contains(prev)
    };
    let after_ok = chars.get(at + len).is_some_and(|c| !c.is_whitespace());
    before_ok && after_ok
}

/// End-strings must be preceded by non-whitespace and close non-empty content.
fn find_end(chars: &[char], from: usize, delim: &str) -> Option<usize> {
    (from + 1..chars.len()).find(|&j| {
        starts_with(chars, j, delim)
            && !chars[j - 1].is_whitespace()
            && !(delim == "*" && starts_with(chars, j, "**"))
    })
}
