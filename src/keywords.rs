use std::io::{self, BufRead, Write};

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "software",
    "developer",
    "engineer",
    "backend",
    "frontend",
    "python",
    "javascript",
    "react",
    "AI",
    "machine learning",
    "data scientist",
];

const PROMPT: &str = "Enter keywords (comma separated, leave blank for defaults): ";

/// Ordered, case-insensitive keywords for one normalization pass.
///
/// Order is significant: matches are reported in list order. Duplicates are
/// kept and produce duplicate matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordList(Vec<String>);

impl KeywordList {
    /// Blank entries are dropped; everything else is kept as given.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordList(
            keywords
                .into_iter()
                .map(Into::into)
                .filter(|k| !k.trim().is_empty())
                .collect(),
        )
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }

    /// Comma-separated user input, each entry trimmed.
    pub fn parse(input: &str) -> Self {
        Self::new(input.split(',').map(str::trim))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Ask for keywords on `output`, read one line from `input`.
/// Blank input (or EOF) falls back to `defaults`.
pub fn prompt_keywords<R, W>(input: &mut R, output: &mut W, defaults: &KeywordList) -> io::Result<KeywordList>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{}", PROMPT)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(defaults.clone());
    }

    let parsed = KeywordList::parse(line);
    // " , ," parses to nothing; treat like blank input
    if parsed.is_empty() {
        Ok(defaults.clone())
    } else {
        Ok(parsed)
    }
}
