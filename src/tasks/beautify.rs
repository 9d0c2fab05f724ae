// src/tasks/beautify.rs

//! Markup re-indentation.
//!
//! Line breaks of the input are kept; each line is re-indented by element
//! nesting depth (four spaces per level). Trailing whitespace is dropped and
//! runs of blank lines collapse to one. The content of `pre`, `textarea`,
//! `script` and `style` elements and the body of multi-line comments are
//! emitted untouched.

const INDENT: &str = "    ";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

const VERBATIM_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Text,
    Comment,
    /// `<!DOCTYPE ...>` or `<?xml ...?>`.
    Declaration,
    Tag {
        name: String,
        closing: bool,
        name_done: bool,
        quote: Option<char>,
        last: char,
    },
}

#[derive(Debug)]
struct Scanner {
    state: State,
    depth: usize,
    /// Open element whose content is copied verbatim.
    verbatim: Option<String>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            state: State::Text,
            depth: 0,
            verbatim: None,
        }
    }

    /// Scan one line, updating state and depth. Returns the lowest depth
    /// offset reached while scanning, relative to the depth at line start.
    fn scan(&mut self, line: &str) -> isize {
        let mut offset: isize = 0;
        let mut lowest: isize = 0;
        let mut i = 0;

        while i < line.len() {
            let rest = &line[i..];

            if let Some(name) = &self.verbatim {
                if self.state == State::Text {
                    match find_closing(rest, name) {
                        Some(at) => {
                            self.verbatim = None;
                            i += at;
                            continue;
                        }
                        None => break,
                    }
                }
            }

            let Some(c) = rest.chars().next() else { break };
            let step = c.len_utf8();

            match &mut self.state {
                State::Text if c == '<' => {
                    if rest.starts_with("<!--") {
                        self.state = State::Comment;
                        i += 4;
                        continue;
                    }
                    if rest.starts_with("<!") || rest.starts_with("<?") {
                        self.state = State::Declaration;
                        i += 2;
                        continue;
                    }
                    let next = rest[1..].chars().next();
                    if next == Some('/') && rest[2..].starts_with(|ch: char| ch.is_ascii_alphabetic()) {
                        self.state = State::Tag {
                            name: String::new(),
                            closing: true,
                            name_done: false,
                            quote: None,
                            last: '/',
                        };
                        i += 2;
                        continue;
                    }
                    if next.is_some_and(|ch| ch.is_ascii_alphabetic()) {
                        self.state = State::Tag {
                            name: String::new(),
                            closing: false,
                            name_done: false,
                            quote: None,
                            last: '<',
                        };
                        i += 1;
                        continue;
                    }
                }
                State::Text => {}
                State::Comment => {
                    if rest.starts_with("-->") {
                        self.state = State::Text;
                        i += 3;
                        continue;
                    }
                }
                State::Declaration => {
                    if c == '>' {
                        self.state = State::Text;
                    }
                }
                State::Tag {
                    name,
                    closing,
                    name_done,
                    quote,
                    last,
                } => {
                    if let Some(q) = *quote {
                        if c == q {
                            *quote = None;
                        }
                    } else if c == '"' || c == '\'' {
                        *quote = Some(c);
                    } else if c == '>' {
                        let tag = name.to_ascii_lowercase();
                        if *closing {
                            offset -= 1;
                            lowest = lowest.min(offset);
                        } else if *last != '/' && !VOID_ELEMENTS.contains(&tag.as_str()) {
                            offset += 1;
                            if VERBATIM_ELEMENTS.contains(&tag.as_str()) {
                                self.verbatim = Some(tag);
                            }
                        }
                        self.state = State::Text;
                        i += step;
                        continue;
                    } else if !*name_done {
                        if c.is_ascii_alphanumeric() || c == '-' || c == ':' {
                            name.push(c);
                        } else {
                            *name_done = true;
                        }
                    }
                    if !c.is_whitespace() {
                        *last = c;
                    }
                }
            }

            i += step;
        }

        self.depth = shift(self.depth, offset);
        lowest
    }
}

fn shift(depth: usize, offset: isize) -> usize {
    if offset < 0 {
        depth.saturating_sub(offset.unsigned_abs())
    } else {
        depth + offset as usize
    }
}

/// Byte offset of the `</name` that closes a verbatim element.
fn find_closing(haystack: &str, name: &str) -> Option<usize> {
    let needle = format!("</{name}");
    haystack.to_ascii_lowercase().find(&needle)
}

/// Re-indent `html`.
pub fn beautify(html: &str) -> String {
    let mut scanner = Scanner::new();
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut previous_blank = false;

    for line in html.lines() {
        let raw = scanner.verbatim.is_some() || scanner.state == State::Comment;
        let continuation = matches!(scanner.state, State::Tag { .. });
        let depth = scanner.depth;

        if raw {
            scanner.scan(line);
            out.push_str(line);
            out.push('\n');
            previous_blank = false;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !previous_blank {
                out.push('\n');
            }
            previous_blank = true;
            continue;
        }
        previous_blank = false;

        let level = if continuation {
            scanner.scan(trimmed);
            depth + 1
        } else {
            let lowest = scanner.scan(trimmed);
            shift(depth, lowest)
        };

        for _ in 0..level {
            out.push_str(INDENT);
        }
        out.push_str(trimmed);
        out.push('\n');
    }

    out
}
