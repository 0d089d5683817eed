//! The leading `---` metadata block of a note document.
//!
//! A document is a `---` line, `Key: value` lines, a closing `---` line, a
//! blank line and free text. Lines inside the block that are not fields
//! (comments, YAML list items, blank lines) are carried verbatim so nothing a
//! human wrote there is lost on rewrite.

pub const DELIMITER: &str = "---";

pub const RESOURCE_ID: &str = "Resource ID";
pub const RESOURCE_TYPE: &str = "Resource Type";

/// Keys the reconciler writes on every pass, in the order they are appended.
pub const OWNED_KEYS: [&str; 2] = [RESOURCE_ID, RESOURCE_TYPE];

/// Ordered lines of a metadata block, without the delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBlock {
    lines: Vec<String>,
}

/// Result of looking for a metadata block at the top of a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Split<'a> {
    /// No block; the whole text is body.
    NoBlock(&'a str),
    /// A closed block followed by the remaining text.
    Block(MetadataBlock, &'a str),
}

impl<'a> Split<'a> {
    pub fn block(&self) -> Option<&MetadataBlock> {
        match self {
            Split::NoBlock(_) => None,
            Split::Block(block, _) => Some(block),
        }
    }

    pub fn body(&self) -> &'a str {
        match self {
            Split::NoBlock(body) | Split::Block(_, body) => *body,
        }
    }

    pub fn into_parts(self) -> (Option<MetadataBlock>, &'a str) {
        match self {
            Split::NoBlock(body) => (None, body),
            Split::Block(block, body) => (Some(block), body),
        }
    }
}

/// Split `content` into its metadata block and body.
///
/// The opening delimiter must be the very first line. A block that is never
/// closed is not a block, so the text stays body in full.
pub fn split(content: &str) -> Split<'_> {
    let Some(after_open) = strip_opening_delimiter(content) else {
        return Split::NoBlock(content);
    };

    let mut consumed = 0;
    let mut lines = Vec::new();
    for raw in after_open.split_inclusive('\n') {
        consumed += raw.len();
        let line = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');
        if line == DELIMITER {
            return Split::Block(MetadataBlock { lines }, &after_open[consumed..]);
        }
        lines.push(line.to_string());
    }

    Split::NoBlock(content)
}

fn strip_opening_delimiter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Key of a `Key: value` line. Indented lines, list items and comments are
/// not fields.
fn field_key(line: &str) -> Option<&str> {
    let (key, _) = line.split_once(':')?;
    let first = key.chars().next()?;
    if first.is_whitespace() || first == '#' || first == '-' {
        return None;
    }
    Some(key)
}

/// Owned-key matching is exact-prefix and case-sensitive: `Resource ID:` is
/// owned, `resource id:` and `Resource ID :` are not.
fn is_owned_line(line: &str) -> bool {
    OWNED_KEYS.iter().any(|key| line_has_key(line, key))
}

/// Indented or list-item line belonging to the field above it.
fn is_continuation(line: &str) -> bool {
    !line.trim().is_empty() && line.starts_with(|c: char| c.is_whitespace() || c == '-')
}

fn line_has_key(line: &str, key: &str) -> bool {
    line.strip_prefix(key).is_some_and(|rest| rest.starts_with(':'))
}

impl MetadataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines starting with `key:`.
    pub fn count_field(&self, key: &str) -> usize {
        self.lines.iter().filter(|line| line_has_key(line, key)).count()
    }

    /// Trimmed value of the first `key:` line.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix(key)?.strip_prefix(':'))
            .map(str::trim)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| field_key(line))
    }

    /// Append a `key: value` line. Line breaks in the value become spaces so
    /// a value can never end the block early.
    pub fn push_field(&mut self, key: &str, value: &str) {
        let value = value.replace(|c: char| c == '\r' || c == '\n', " ");
        self.lines.push(format!("{key}: {}", value.trim()));
    }

    /// Copy of the block without system-owned lines and the continuation
    /// lines under them. A block left with only blank lines becomes empty.
    pub fn without_owned_keys(&self) -> Self {
        let mut lines = Vec::with_capacity(self.lines.len());
        let mut in_owned = false;
        for line in &self.lines {
            if is_owned_line(line) {
                in_owned = true;
                continue;
            }
            if in_owned && is_continuation(line) {
                continue;
            }
            in_owned = false;
            lines.push(line.clone());
        }
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Self::new();
        }
        Self { lines }
    }

    /// Append the fields of `other` whose keys this block does not have yet.
    ///
    /// Continuation lines (indented values, list items) travel with the field
    /// above them. Lines before the first field of `other` are appended unless
    /// an identical line is already present.
    pub fn merge_missing(&mut self, other: &MetadataBlock) {
        let present: Vec<String> = self.keys().map(str::to_string).collect();
        let mut appended = Vec::new();
        let mut current_key: Option<&str> = None;

        for line in &other.lines {
            if let Some(key) = field_key(line) {
                current_key = Some(key);
            }
            let take = match current_key {
                Some(key) => !present.iter().any(|p| p == key),
                None => !line.trim().is_empty() && !self.lines.contains(line),
            };
            if take {
                appended.push(line.clone());
            }
        }

        self.lines.extend(appended);
    }

    /// Render the block including both delimiter lines, without a trailing
    /// newline.
    pub fn render(&self) -> String {
        let mut out = String::from(DELIMITER);
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(DELIMITER);
        out
    }
}

/// Build a full document: block, blank line, body. Leading blank lines of the
/// body and trailing whitespace of the document are dropped.
pub fn compose(block: &MetadataBlock, body: &str) -> String {
    let body = trim_leading_blank_lines(body);
    let mut out = block.render();
    out.push_str("\n\n");
    out.push_str(body);
    out.truncate(out.trim_end().len());
    out
}

fn trim_leading_blank_lines(text: &str) -> &str {
    let mut rest = text;
    while let Some(idx) = rest.find('\n') {
        if !rest[..idx].trim().is_empty() {
            break;
        }
        rest = &rest[idx + 1..];
    }
    if rest.trim().is_empty() { "" } else { rest }
}

/// Normalize a body for comparison: unify line endings, trim trailing
/// whitespace on every line, then trim the whole text.
pub fn normalize_body(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lines: &[&str]) -> MetadataBlock {
        MetadataBlock {
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn split_without_block_keeps_everything_as_body() {
        let split = split("Purpose: prod\nmore");
        assert_eq!(split, Split::NoBlock("Purpose: prod\nmore"));
    }

    #[test]
    fn split_reads_block_and_rest() {
        let content = "---\nOwner: alice\nResource ID: 101\n---\n\nBody text\n";
        let (block, body) = split(content).into_parts();
        let block = block.unwrap();
        assert_eq!(block.lines(), &["Owner: alice", "Resource ID: 101"]);
        assert_eq!(block.field("Owner"), Some("alice"));
        assert_eq!(body, "\nBody text\n");
    }

    #[test]
    fn split_handles_crlf() {
        let content = "---\r\nOwner: bob\r\n---\r\nBody";
        let (block, body) = split(content).into_parts();
        assert_eq!(block.unwrap().lines(), &["Owner: bob"]);
        assert_eq!(body, "Body");
    }

    #[test]
    fn unclosed_block_is_body() {
        let content = "---\nOwner: alice\nno closing line";
        assert_eq!(split(content), Split::NoBlock(content));
    }

    #[test]
    fn block_must_start_on_first_line() {
        let content = "\n---\nOwner: alice\n---\nBody";
        assert_eq!(split(content), Split::NoBlock(content));
    }

    #[test]
    fn empty_block_is_still_a_block() {
        let (block, body) = split("---\n---\nBody").into_parts();
        assert!(block.unwrap().is_empty());
        assert_eq!(body, "Body");
    }

    #[test]
    fn owned_key_matching_is_exact_and_case_sensitive() {
        let b = block(&[
            "Resource ID: 999",
            "resource id: 5",
            "Resource IDs: 1,2",
            "Resource ID : 7",
            "Resource Type: vm",
            "Owner: alice",
        ]);
        let filtered = b.without_owned_keys();
        assert_eq!(
            filtered.lines(),
            &["resource id: 5", "Resource IDs: 1,2", "Resource ID : 7", "Owner: alice"]
        );
    }

    #[test]
    fn owned_field_takes_its_continuation_lines_along() {
        let b = block(&[
            "Resource ID: 9",
            "  - orphan",
            "- stray",
            "Owner: alice",
            "tags:",
            "  - web",
            "Resource Type: vm",
            "",
            "# trailing comment",
        ]);
        assert_eq!(
            b.without_owned_keys().lines(),
            &["Owner: alice", "tags:", "  - web", "", "# trailing comment"]
        );
    }

    #[test]
    fn remote_owned_continuations_do_not_leak_into_proposal() {
        let (remote, _) = split("---\nResource ID: 9\n  - orphan\n---\nbody").into_parts();
        assert!(remote.unwrap().without_owned_keys().is_empty());
    }

    #[test]
    fn count_field_uses_exact_prefix() {
        let b = block(&["Resource ID: 1", "Resource ID: 2", "Resource IDs: 3", "Owner: x"]);
        assert_eq!(b.count_field(RESOURCE_ID), 2);
        assert_eq!(b.count_field("Owner"), 1);
        assert_eq!(b.count_field(RESOURCE_TYPE), 0);
        assert_eq!(b.field(RESOURCE_ID), Some("1"));
    }

    #[test]
    fn only_blank_lines_left_means_empty_block() {
        let b = block(&["", "Resource ID: 1", "  ", "Resource Type: vm"]);
        assert!(b.without_owned_keys().is_empty());
    }

    #[test]
    fn push_field_cannot_close_block() {
        let mut b = MetadataBlock::new();
        b.push_field(RESOURCE_ID, "1\n---\nevil");
        assert_eq!(b.lines(), &["Resource ID: 1 --- evil"]);
        let rendered = compose(&b, "body");
        let (parsed, body) = split(&rendered).into_parts();
        assert_eq!(parsed.unwrap(), b);
        assert_eq!(body.trim(), "body");
    }

    #[test]
    fn merge_missing_keeps_existing_values_and_order() {
        let mut existing = block(&["Owner: alice", "Purpose: lab"]);
        let remote = block(&["Purpose: prod", "Backup: nightly", "tags:", "  - web", "  - edge"]);
        existing.merge_missing(&remote);
        assert_eq!(
            existing.lines(),
            &["Owner: alice", "Purpose: lab", "Backup: nightly", "tags:", "  - web", "  - edge"]
        );
    }

    #[test]
    fn merge_missing_skips_duplicate_keyless_lines() {
        let mut existing = block(&["# managed by ansible", "Owner: alice"]);
        let remote = block(&["# managed by ansible", "# second comment", "Owner: bob"]);
        existing.merge_missing(&remote);
        assert_eq!(
            existing.lines(),
            &["# managed by ansible", "Owner: alice", "# second comment"]
        );
    }

    #[test]
    fn render_round_trips_untouched_block() {
        let content = "---\nOwner: alice\n# note\ntags:\n  - a\n---\n\nBody";
        let (parsed, body) = split(content).into_parts();
        assert_eq!(compose(&parsed.unwrap(), body), content);
    }

    #[test]
    fn compose_trims_blank_lines_around_body() {
        let b = block(&["Resource ID: 1"]);
        assert_eq!(compose(&b, "\n\n  indented\nline\n\n\n"), "---\nResource ID: 1\n---\n\n  indented\nline");
        assert_eq!(compose(&b, ""), "---\nResource ID: 1\n---");
    }

    #[test]
    fn normalization_ignores_line_endings_and_trailing_whitespace() {
        let a = "line one  \r\nline two\t\r\n\r\n\r\n";
        let b = "line one\nline two\n";
        assert_eq!(normalize_body(a), normalize_body(b));
        assert_ne!(normalize_body("a\nb"), normalize_body("a\n\nb"));
    }
}
