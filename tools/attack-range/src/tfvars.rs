//! A minimal, lossless model of a Terraform `.tfvars` file.
//!
//! We only ever need to overwrite a top level `key = value` assignment, so rather than pull in
//! a full HCL parser the file is split into lines and each line is tagged as either a top level
//! assignment or something we don't interpret (comments, blank lines, the body of a multi-line
//! map, list, block comment or heredoc). Rendering concatenates the lines again, so any line that wasn't the target of
//! a [`TfVars::set_string`] comes back out byte for byte, including its line terminator.

#[derive(Clone, Debug, PartialEq, Eq)]
enum Line {
    Assignment { key: String, text: String },
    Other(String),
}

impl Line {
    fn text(&self) -> &str {
        match self {
            Line::Assignment { text, .. } | Line::Other(text) => text,
        }
    }

    fn is_assignment_of(&self, wanted: &str) -> bool {
        matches!(self, Line::Assignment { key, .. } if key == wanted)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TfVars {
    lines: Vec<Line>,
}

impl TfVars {
    pub fn parse(contents: &str) -> Self {
        let mut lines = Vec::new();
        let mut lexer = LexState::default();

        for text in contents.split_inclusive('\n') {
            let line = match assignment_key(text) {
                Some(key) if lexer.at_top_level() => Line::Assignment {
                    key: key.to_string(),
                    text: text.to_string(),
                },
                _ => Line::Other(text.to_string()),
            };

            lexer.advance(text);
            lines.push(line);
        }

        Self { lines }
    }

    /// The raw right hand side of the first top level assignment of `key`.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line.is_assignment_of(key))
            .and_then(|line| line.text().split_once('='))
            .map(|(_, value)| value.trim())
    }

    #[cfg(test)]
    pub fn assignment_count(&self, key: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| line.is_assignment_of(key))
            .count()
    }

    /// Sets `key` to a quoted string value.
    ///
    /// The first existing assignment is replaced in place and any later assignments of the same
    /// key are dropped, so exactly one remains. When the key isn't assigned at all the
    /// assignment is appended to the end of the file.
    pub fn set_string(&mut self, key: &str, value: &str) {
        let assignment = format!("{key} = \"{}\"", escape(value));

        match self.lines.iter().position(|line| line.is_assignment_of(key)) {
            Some(first) => {
                let terminator = line_terminator(self.lines[first].text());

                self.lines[first] = Line::Assignment {
                    key: key.to_string(),
                    text: format!("{assignment}{terminator}"),
                };

                let mut index = 0;
                self.lines.retain(|line| {
                    let keep = index <= first || !line.is_assignment_of(key);
                    index += 1;
                    keep
                });
            }
            None => {
                if let Some(last) = self.lines.last() {
                    if !last.text().ends_with('\n') {
                        self.lines.push(Line::Other("\n".to_string()));
                    }
                }

                self.lines.push(Line::Assignment {
                    key: key.to_string(),
                    text: format!("{assignment}\n"),
                });
            }
        }
    }

    pub fn render(&self) -> String {
        self.lines.iter().map(Line::text).collect()
    }
}

/// Returns the identifier on the left of `=` if this line looks like `ident = ...`.
fn assignment_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();

    let key_len = trimmed
        .char_indices()
        .take_while(|(i, c)| {
            c.is_ascii_alphanumeric() || *c == '_' || (*i > 0 && *c == '-')
        })
        .count();

    if key_len == 0 || trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let (key, rest) = trimmed.split_at(key_len);
    let rest = rest.trim_start();

    // `==` would be a comparison inside an expression, not an assignment
    if rest.starts_with('=') && !rest.starts_with("==") {
        Some(key)
    } else {
        None
    }
}

/// What the start of the next line is nested inside. Lines that don't start at the top level
/// are never treated as assignments.
#[derive(Debug, Default)]
struct LexState {
    /// Open `{`/`[`/`(` brackets
    depth: i32,
    in_block_comment: bool,
    /// Closing marker of the heredoc we are inside, e.g. `EOT` for `<<EOT`
    heredoc: Option<String>,
}

impl LexState {
    fn at_top_level(&self) -> bool {
        self.depth == 0 && !self.in_block_comment && self.heredoc.is_none()
    }

    /// Moves past one line, skipping string literals and comments.
    fn advance(&mut self, line: &str) {
        if let Some(marker) = &self.heredoc {
            if line.trim() == marker {
                self.heredoc = None;
            }
            return;
        }

        let mut in_string = false;
        let mut escaped = false;
        let mut chars = line.char_indices().peekable();

        while let Some((index, c)) = chars.next() {
            let next = chars.peek().map(|(_, next)| *next);

            if self.in_block_comment {
                if c == '*' && next == Some('/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }

            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            match c {
                '"' => in_string = true,
                '#' => break,
                '/' if next == Some('/') => break,
                '/' if next == Some('*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '<' if next == Some('<') => {
                    if let Some(marker) = heredoc_marker(&line[index + 2..]) {
                        self.heredoc = Some(marker.to_string());
                        break;
                    }
                }
                '{' | '[' | '(' => self.depth += 1,
                '}' | ']' | ')' => self.depth -= 1,
                _ => {}
            }
        }

        self.depth = self.depth.max(0);
    }
}

/// The marker of a heredoc opener, given what follows `<<` (`EOT` or `-EOT`) up to the end
/// of the line.
fn heredoc_marker(rest: &str) -> Option<&str> {
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    let marker = rest.trim_end();

    let starts_like_identifier = marker.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
    let is_identifier = marker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    (starts_like_identifier && is_identifier).then_some(marker)
}

fn line_terminator(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
