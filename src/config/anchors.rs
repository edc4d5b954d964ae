//! Anchor and alias resolution
//!
//! Anchors (`&epochs 200`) define a value once; aliases (`*epochs`) reuse it.
//! Before handing the document to the YAML parser, the raw text is scanned so
//! that every alias without a preceding definition and every anchor defined
//! twice is reported by name. The parser then substitutes alias values, which
//! leaves a [`Value`] tree with no remaining indirection.

use super::validate::{ConfigError, ValidationErrors};
use crate::error::{Error, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// An anchor definition or alias reference found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
    /// 1-based line number
    pub line: usize,
    /// 1-based column of the `&` or `*`
    pub column: usize,
}

impl Marker {
    fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }
}

/// All anchors and aliases of a document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorTable {
    pub anchors: Vec<Marker>,
    pub aliases: Vec<Marker>,
}

impl AnchorTable {
    /// Report undefined aliases and redefined anchors
    ///
    /// An alias must follow its anchor in the document. Each problem name is
    /// reported once.
    pub fn check(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut first_definition: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for anchor in &self.anchors {
            if first_definition.contains_key(anchor.name.as_str()) {
                let error = ConfigError::DuplicateAnchor {
                    anchor: anchor.name.clone(),
                };
                if !errors.contains(&error) {
                    errors.push(error);
                }
            } else {
                first_definition.insert(&anchor.name, anchor.position());
            }
        }

        for alias in &self.aliases {
            let defined_before = first_definition
                .get(alias.name.as_str())
                .is_some_and(|&position| position < alias.position());
            if !defined_before {
                let error = ConfigError::UnresolvedAlias {
                    alias: alias.name.clone(),
                };
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
        }
        errors
    }

    /// Number of alias use sites per anchor name
    pub fn use_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> = self
            .anchors
            .iter()
            .map(|a| (a.name.as_str(), 0))
            .collect();
        for alias in &self.aliases {
            *counts.entry(alias.name.as_str()).or_default() += 1;
        }
        counts
    }

    /// Anchors that no alias refers to, in definition order
    pub fn unused_anchors(&self) -> Vec<&str> {
        let counts = self.use_counts();
        self.anchors
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| counts.get(name).copied() == Some(0))
            .collect()
    }
}

/// Resolve anchors, aliases and merge keys into a plain value tree
pub fn resolve_anchors(text: &str) -> Result<Value> {
    let table = scan_anchors(text);
    let problems = table.check();
    if !problems.is_empty() {
        return Err(Error::Invalid(ValidationErrors::from(problems)));
    }
    tracing::debug!(
        anchors = table.anchors.len(),
        aliases = table.aliases.len(),
        "anchor table checked"
    );
    for anchor in table.unused_anchors() {
        tracing::debug!(anchor, "anchor is never aliased");
    }

    let mut value: Value =
        serde_yaml::from_str(text).map_err(|e| Error::Parse(e.to_string()))?;
    value
        .apply_merge()
        .map_err(|e| Error::Parse(format!("Failed to apply merge keys: {e}")))?;
    Ok(value)
}

/// Collect anchor definitions and alias references from raw YAML text
///
/// Only node properties are recognised: a `&` or `*` where a node may start
/// (after indentation, `- `, `? `, `: `, or `[`, `{` and `,` inside a flow
/// collection). Once a plain scalar has started, the rest of it is content,
/// as is text inside quoted scalars, block scalars and comments.
pub fn scan_anchors(text: &str) -> AnchorTable {
    let mut scanner = Scanner::default();
    for (index, line) in text.lines().enumerate() {
        scanner.scan_line(line, index + 1);
    }
    scanner.table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

/// Where the scanner is relative to the current node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// A node (or its properties) may start here
    #[default]
    NodeStart,
    /// Inside a plain scalar
    Plain,
    /// After a complete node, waiting for an indicator
    AfterNode,
}

#[derive(Default)]
struct Scanner {
    table: AnchorTable,
    state: State,
    /// Nesting depth of `[` / `{` collections
    flow_depth: usize,
    /// Open quoted scalar carried over from a previous line
    quote: Option<Quote>,
    /// Indentation of the line that opened a block scalar
    block_parent_indent: Option<usize>,
    /// Column of the collection entry owning an unfinished block plain
    /// scalar; more indented lines continue it
    plain_parent_indent: Option<usize>,
}

impl Scanner {
    fn scan_line(&mut self, line: &str, line_no: usize) {
        let indent = line.len() - line.trim_start_matches(' ').len();

        if let Some(parent) = self.block_parent_indent {
            if line.trim().is_empty() || indent > parent {
                return;
            }
            self.block_parent_indent = None;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        // column of the current block entry, and where its node began
        let mut entry_indent = indent;
        let mut node_begin: Option<usize> = None;

        if let Some(quote) = self.quote {
            match skip_quoted(&chars, 0, quote) {
                Some(end) => {
                    self.quote = None;
                    self.state = State::AfterNode;
                    i = end;
                }
                None => return,
            }
        } else if self.flow_depth == 0 {
            if line.trim().is_empty() {
                return;
            }
            // a more indented line continues a multi-line plain scalar
            match self.plain_parent_indent {
                Some(parent) if indent > parent => {
                    self.state = State::Plain;
                    entry_indent = parent;
                }
                _ => {
                    self.state = State::NodeStart;
                    self.plain_parent_indent = None;
                    if is_document_marker(&chars) {
                        i = 3;
                    }
                }
            }
        }

        while i < chars.len() {
            let c = chars[i];
            if c == ' ' || c == '\t' {
                i += 1;
                continue;
            }
            if c == '#' && (i == 0 || chars[i - 1] == ' ' || chars[i - 1] == '\t') {
                break;
            }
            let flow = self.flow_depth > 0;
            let indicator = is_indicator(&chars, i, flow && c == ':');

            if self.state == State::NodeStart
                && node_begin.is_none()
                && !matches!(c, '[' | '{' | ']' | '}' | ',')
                && !(matches!(c, '-' | '?' | ':') && indicator)
            {
                node_begin = Some(i);
            }

            match self.state {
                State::NodeStart => match c {
                    '&' | '*' => {
                        let end = scan_name(&chars, i + 1);
                        if end == i + 1 {
                            self.state = State::Plain;
                            i += 1;
                            continue;
                        }
                        let marker = Marker {
                            name: chars[i + 1..end].iter().collect(),
                            line: line_no,
                            column: i + 1,
                        };
                        if c == '&' {
                            // the node content follows the anchor
                            self.table.anchors.push(marker);
                        } else {
                            self.table.aliases.push(marker);
                            self.state = State::AfterNode;
                        }
                        i = end;
                        continue;
                    }
                    '!' => {
                        // tag, the node content follows it
                        i = scan_name(&chars, i + 1);
                        continue;
                    }
                    '\'' | '"' => {
                        let quote = if c == '\'' { Quote::Single } else { Quote::Double };
                        match skip_quoted(&chars, i + 1, quote) {
                            Some(end) => {
                                self.state = State::AfterNode;
                                i = end;
                                continue;
                            }
                            None => {
                                self.quote = Some(quote);
                                return;
                            }
                        }
                    }
                    '|' | '>' if !flow => {
                        let rest: String = chars[i + 1..].iter().collect();
                        let header = rest.split(" #").next().unwrap_or("").trim();
                        if header.chars().all(|h| matches!(h, '-' | '+' | '0'..='9')) {
                            self.block_parent_indent = Some(indent);
                            self.state = State::AfterNode;
                            return;
                        }
                        self.state = State::Plain;
                    }
                    '[' | '{' => self.flow_depth += 1,
                    ']' | '}' if flow => {
                        self.flow_depth -= 1;
                        self.state = State::AfterNode;
                    }
                    ',' if flow => {}
                    '-' | '?' if indicator => {
                        if !flow {
                            entry_indent = i;
                        }
                    }
                    ':' if indicator => {}
                    _ => self.state = State::Plain,
                },
                State::Plain => match c {
                    ':' if indicator => {
                        if !flow {
                            entry_indent = node_begin.unwrap_or(indent);
                        }
                        node_begin = None;
                        self.state = State::NodeStart;
                    }
                    ',' if flow => self.state = State::NodeStart,
                    ']' | '}' if flow => {
                        self.flow_depth -= 1;
                        self.state = State::AfterNode;
                    }
                    _ => {}
                },
                State::AfterNode => match c {
                    ':' if flow || indicator => {
                        if !flow {
                            entry_indent = node_begin.unwrap_or(indent);
                        }
                        node_begin = None;
                        self.state = State::NodeStart;
                    }
                    ',' if flow => self.state = State::NodeStart,
                    ']' | '}' if flow => self.flow_depth -= 1,
                    _ => {}
                },
            }
            i += 1;
        }

        if self.flow_depth == 0 && self.state == State::Plain {
            self.plain_parent_indent.get_or_insert(entry_indent);
        }
    }
}

/// `-`, `?` or `:` followed by whitespace or the end of the line; inside a
/// flow collection a `:` may also be followed by a flow indicator
fn is_indicator(chars: &[char], i: usize, flow: bool) -> bool {
    match chars.get(i + 1) {
        None | Some(' ' | '\t') => true,
        Some(',' | '[' | ']' | '{' | '}') => flow && chars[i] == ':',
        Some(_) => false,
    }
}

/// A `---` document start at the beginning of the line
fn is_document_marker(chars: &[char]) -> bool {
    chars.len() >= 3
        && chars[..3] == ['-', '-', '-']
        && chars.get(3).map_or(true, |c| *c == ' ' || *c == '\t')
}

/// End index (exclusive) of an anchor/alias/tag name starting at `start`
fn scan_name(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && !matches!(chars[end], ' ' | '\t' | ',' | '[' | ']' | '{' | '}') {
        end += 1;
    }
    end
}

/// Index just past the closing quote, or `None` if the scalar continues on
/// the next line
fn skip_quoted(chars: &[char], start: usize, quote: Quote) -> Option<usize> {
    let mut i = start;
    while i < chars.len() {
        match (quote, chars[i]) {
            (Quote::Double, '\\') => i += 2,
            (Quote::Double, '"') => return Some(i + 1),
            (Quote::Single, '\'') => {
                if chars.get(i + 1) == Some(&'\'') {
                    i += 2;
                } else {
                    return Some(i + 1);
                }
            }
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(markers: &[Marker]) -> Vec<&str> {
        markers.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_scan_scalar_anchors_and_aliases() {
        let yaml = r#"
trainer:
  epochs: &epochs 200
  preprocessing:
    train_image_size: [&height 224, &width 224]
  scheduler:
    params:
      total_iters: *epochs
"#;
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.anchors), vec!["epochs", "height", "width"]);
        assert_eq!(names(&table.aliases), vec!["epochs"]);
        assert_eq!(table.anchors[0].line, 3);
        assert!(table.check().is_empty());
    }

    #[test]
    fn test_scan_ignores_comments_and_quotes() {
        let yaml = r#"
# &not_an_anchor *nor_an_alias
name: "quoted &anchor *alias"
other: 'it''s *fine'
plain: rock & roll
word: tom&jerry
inline: value # *comment
"#;
        let table = scan_anchors(yaml);
        assert!(table.anchors.is_empty());
        assert!(table.aliases.is_empty());
    }

    #[test]
    fn test_scan_ignores_plain_scalar_content() {
        let table = scan_anchors("key: foo &bar *baz\n");
        assert!(table.anchors.is_empty());
        assert!(table.aliases.is_empty());
    }

    #[test]
    fn test_scan_ignores_block_scalars() {
        let yaml = r#"
description: |
  uses *pointer and &ref syntax
  "unbalanced quote
epochs: &epochs 10
"#;
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.anchors), vec!["epochs"]);
        assert!(table.aliases.is_empty());
    }

    #[test]
    fn test_scan_multiline_quoted_scalar() {
        let yaml = "a: \"first line\n  *still quoted\"\nb: *real\n";
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.aliases), vec!["real"]);
    }

    #[test]
    fn test_scan_sequence_items_and_tags() {
        let yaml = r#"
sizes:
  - &small 32
  - !!int &large 64
  - *small
"#;
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.anchors), vec!["small", "large"]);
        assert_eq!(names(&table.aliases), vec!["small"]);
    }

    #[test]
    fn test_check_reports_unresolved_alias() {
        let table = scan_anchors("a: *missing\nb: *missing\n");
        assert_eq!(
            table.check(),
            vec![ConfigError::UnresolvedAlias {
                alias: "missing".into()
            }]
        );
    }

    #[test]
    fn test_check_reports_alias_before_anchor() {
        let table = scan_anchors("a: *late\nb: &late 1\n");
        assert_eq!(
            table.check(),
            vec![ConfigError::UnresolvedAlias {
                alias: "late".into()
            }]
        );
    }

    #[test]
    fn test_check_reports_duplicate_anchor() {
        let table = scan_anchors("a: &epochs 10\nb: &epochs 20\nc: *epochs\n");
        assert_eq!(
            table.check(),
            vec![ConfigError::DuplicateAnchor {
                anchor: "epochs".into()
            }]
        );
    }

    #[test]
    fn test_use_counts() {
        let table = scan_anchors("a: &x 1\nb: *x\nc: *x\nd: &unused 2\n");
        let counts = table.use_counts();
        assert_eq!(counts["x"], 2);
        assert_eq!(counts["unused"], 0);
    }

    #[test]
    fn test_scan_ignores_indicators_inside_plain_values() {
        let yaml = r#"
params:
  include: images/*.jpg,*.png
  title: train - *fast* run
  pattern: arr[*idx]
  query: key?*x {*y}
  a: one, &tag
  b: two, &tag
"#;
        let table = scan_anchors(yaml);
        assert!(table.anchors.is_empty(), "{:?}", table.anchors);
        assert!(table.aliases.is_empty(), "{:?}", table.aliases);

        let value = resolve_anchors(yaml).unwrap();
        assert_eq!(value["params"]["include"], Value::from("images/*.jpg,*.png"));
        assert_eq!(value["params"]["title"], Value::from("train - *fast* run"));
        assert_eq!(value["params"]["pattern"], Value::from("arr[*idx]"));
        assert_eq!(value["params"]["b"], Value::from("two, &tag"));
    }

    #[test]
    fn test_scan_ignores_plain_scalar_continuation_lines() {
        let yaml = "note: first part\n  *second part, &third\nsizes:\n  - item one\n    *still item one\n  - &real 3\nlast: *real\n";
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.anchors), vec!["real"]);
        assert_eq!(names(&table.aliases), vec!["real"]);
    }

    #[test]
    fn test_scan_keys_below_sequence_item() {
        let yaml = r#"
nodes:
  - name: ResNet
    params: *shared
  - name: Head
    inputs: [*first, &second 2]
"#;
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.aliases), vec!["shared", "first"]);
        assert_eq!(names(&table.anchors), vec!["second"]);
    }

    #[test]
    fn test_scan_flow_collections() {
        let yaml = r#"
a: &a 0
pair: [*a, &b 1]
map: {x: *b, y: &c "two", z: [*c]}
multi: [
  &d 4,
  *d
]
after: *d
"#;
        let table = scan_anchors(yaml);
        assert_eq!(names(&table.anchors), vec!["a", "b", "c", "d"]);
        assert_eq!(names(&table.aliases), vec!["a", "b", "c", "d", "d"]);
        assert!(table.check().is_empty());

        let value = resolve_anchors(yaml).unwrap();
        assert_eq!(value["pair"][0], Value::from(0));
        assert_eq!(value["map"]["z"][0], Value::from("two"));
        assert_eq!(value["after"], Value::from(4));
    }

    #[test]
    fn test_scan_records_columns() {
        let table = scan_anchors("size: [&h 224, *h]\n");
        assert_eq!(table.anchors[0].column, 8);
        assert_eq!(table.aliases[0].column, 16);
        assert!(table.check().is_empty());
    }

    #[test]
    fn test_check_alias_before_anchor_on_same_line() {
        let table = scan_anchors("pair: [*a, &a 1]\n");
        assert_eq!(
            table.check(),
            vec![ConfigError::UnresolvedAlias { alias: "a".into() }]
        );

        let err = resolve_anchors("pair: [*a, &a 1]\n").unwrap_err();
        assert_eq!(
            err.violations(),
            &[ConfigError::UnresolvedAlias { alias: "a".into() }]
        );
    }

    #[test]
    fn test_unused_anchors() {
        let table = scan_anchors("a: &used 1\nb: &spare 2\nc: *used\n");
        assert_eq!(table.unused_anchors(), vec!["spare"]);
    }

    #[test]
    fn test_resolve_substitutes_values() {
        let yaml = "epochs: &epochs 200\nscheduler_iters: *epochs\n";
        let value = resolve_anchors(yaml).unwrap();
        assert_eq!(value["epochs"], Value::from(200));
        assert_eq!(value["scheduler_iters"], Value::from(200));
    }

    #[test]
    fn test_resolve_applies_merge_keys() {
        let yaml = r#"
base: &base
  lr: 0.1
  momentum: 0.9
tuned:
  <<: *base
  lr: 0.01
"#;
        let value = resolve_anchors(yaml).unwrap();
        assert_eq!(value["tuned"]["lr"], Value::from(0.01));
        assert_eq!(value["tuned"]["momentum"], Value::from(0.9));
    }

    #[test]
    fn test_resolve_rejects_unresolved_alias() {
        let err = resolve_anchors("epochs: *epochs\n").unwrap_err();
        assert_eq!(
            err.violations(),
            &[ConfigError::UnresolvedAlias {
                alias: "epochs".into()
            }]
        );
    }

    #[test]
    fn test_resolve_reports_syntax_errors_as_parse() {
        let err = resolve_anchors("this is not valid yaml: [}").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
