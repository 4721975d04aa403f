//! The parser collaborator interface (§6).
//!
//! The Robot Framework grammar itself is out of scope for this crate — the
//! spec treats "parse source text into a syntax tree and token stream" as an
//! external collaborator. What lives here is the *shape* of that
//! collaborator's output (the node/token model every other module in this
//! crate consumes) plus the purely mechanical `tokenize_variables` helper,
//! which sub-tokenizes a single data token into variable references and is
//! simple enough to not warrant a real grammar.

use crate::diagnostics::{Position, Range};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// The kind of a lexical token, restricted to the kinds the semantic engine
/// actually inspects (§6 lists the statement kinds it dispatches on; token
/// kinds below are the terminals those statements are built from).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    LibrarySetting,
    ResourceSetting,
    VariablesSetting,
    Name,
    Alias,
    Argument,
    Variable,
    Data,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    /// 1-based, matching Robot Framework's own token line numbering.
    pub line: u32,
    pub column: u32,
    pub end_column: u32,
    pub error: Option<String>,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, line: u32, column: u32) -> Self {
        let value = value.into();
        let end_column = column + value.chars().count() as u32;
        Self {
            token_type,
            value,
            line,
            column,
            end_column,
            error: None,
        }
    }

    pub fn range(&self) -> Range {
        Range::new(
            Position::new(self.line.saturating_sub(1), self.column),
            Position::new(self.line.saturating_sub(1), self.end_column),
        )
    }

    pub fn start(&self) -> Position {
        self.range().start
    }
}

static VARIABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$@&%]\{[^{}]*\}").expect("valid variable regex"));

/// Sub-tokenize a single data token into alternating literal/variable
/// tokens. Matches `$`, `@`, `&`, `%` sigils with `{...}` bodies; does not
/// attempt to handle nested variable references (`${${x}}`), which Robot
/// Framework itself resolves at runtime rather than statically.
pub fn tokenize_variables(token: &Token) -> Vec<Token> {
    let mut result = Vec::new();
    let mut last_end = 0usize;

    for m in VARIABLE_PATTERN.find_iter(&token.value) {
        if m.start() > last_end {
            let literal = &token.value[last_end..m.start()];
            result.push(Token::new(
                TokenType::Data,
                literal,
                token.line,
                token.column + last_end as u32,
            ));
        }
        result.push(Token::new(
            TokenType::Variable,
            m.as_str(),
            token.line,
            token.column + m.start() as u32,
        ));
        last_end = m.end();
    }

    if last_end < token.value.len() {
        result.push(Token::new(
            TokenType::Data,
            &token.value[last_end..],
            token.line,
            token.column + last_end as u32,
        ));
    }

    result
}

/// Statement/node kinds the semantic engine dispatches on (§6, §9). This is
/// a tagged union matched in the namespace builder and analyzer rather than
/// a trait-object hierarchy, per the REDESIGN note favoring a visitor table
/// over inheritance on AST node types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File,
    SettingSection,
    VariableSection,
    TestCaseSection,
    KeywordSection,
    TestCase { name: String },
    Keyword { name: String },
    LibraryImport,
    ResourceImport,
    VariablesImport,
    Variable,
    KeywordName,
    Arguments,
    KeywordCall,
    Fixture,
    Template,
    TestTemplate,
    ForHeader,
    Other,
}

/// A node in the (simplified) syntax tree produced by the parser
/// collaborator. Every statement-level node carries its own tokens plus any
/// nested nodes (e.g. a `TestCase`/`Keyword` node nests its body
/// statements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
    pub tokens: Vec<Token>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, range: Range) -> Self {
        Self {
            kind,
            range,
            tokens: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn token_of_type(&self, token_type: TokenType) -> Option<&Token> {
        self.tokens.iter().find(|t| t.token_type == token_type)
    }

    pub fn tokens_of_type(&self, token_type: TokenType) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(move |t| t.token_type == token_type)
    }

    /// Pre-order traversal of this node and all descendants.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Parse errors reported by the parser collaborator (kept distinct from
/// `RobotCodeError` — a parse error belongs to a file, not to an
/// operation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub range: Range,
}

/// The full output of parsing one source file (§6).
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub model: Node,
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
}

/// External collaborator: produces a syntax tree + token stream from
/// source text. Implementations live outside this crate in a real
/// deployment (tree-sitter/Robot's own parser bound over FFI or a pure-Rust
/// port); `robotcode-core` only depends on this trait.
pub trait RobotParser: Send + Sync {
    fn parse(&self, source_text: &str, path: &Path) -> ParseResult;
}

/// A minimal in-memory parser used by tests and by callers that only need
/// to exercise the semantic engine against hand-built trees. It recognizes
/// `*** Settings ***` / `*** Variables ***` sections and the three import
/// statement kinds line-by-line; it is intentionally not a complete Robot
/// Framework grammar.
#[derive(Debug, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Settings,
    Variables,
    Keywords,
    TestCases,
}

impl RobotParser for LineParser {
    fn parse(&self, source_text: &str, _path: &Path) -> ParseResult {
        let mut children = Vec::new();
        let mut setting_children = Vec::new();
        let mut variable_children = Vec::new();
        let mut keyword_children = Vec::new();
        let mut testcase_children = Vec::new();
        let mut section = Section::None;

        // `current_body` accumulates statement nodes for the keyword/test
        // currently being parsed; `current_header` is (name, line, indent).
        let mut current_header: Option<(String, u32)> = None;
        let mut current_body: Vec<Node> = Vec::new();

        macro_rules! flush_body_owner {
            () => {
                if let Some((name, line_no)) = current_header.take() {
                    let kind = if section == Section::Keywords {
                        NodeKind::Keyword { name }
                    } else {
                        NodeKind::TestCase { name }
                    };
                    let node = Node::new(kind, Range::new(Position::new(line_no - 1, 0), Position::new(line_no - 1, 0)))
                        .with_children(std::mem::take(&mut current_body));
                    if section == Section::Keywords {
                        keyword_children.push(node);
                    } else {
                        testcase_children.push(node);
                    }
                }
            };
        }

        for (idx, raw_line) in source_text.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                continue;
            }
            if let Some(new_section) = section_header(trimmed) {
                flush_body_owner!();
                section = new_section;
                continue;
            }

            let is_indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');

            match section {
                Section::Settings => {
                    if let Some(node) = parse_setting_line(raw_line, line_no) {
                        setting_children.push(node);
                    }
                }
                Section::Variables => {
                    if let Some(node) = parse_variable_line(raw_line, line_no) {
                        variable_children.push(node);
                    }
                }
                Section::Keywords | Section::TestCases => {
                    if !is_indented {
                        flush_body_owner!();
                        current_header = Some((trimmed.to_string(), line_no));
                    } else if current_header.is_some() {
                        if let Some(node) = parse_body_line(raw_line, line_no) {
                            current_body.push(node);
                        }
                    }
                }
                Section::None => {}
            }
        }
        flush_body_owner!();

        if !setting_children.is_empty() {
            children.push(
                Node::new(NodeKind::SettingSection, Range::zero()).with_children(setting_children),
            );
        }
        if !variable_children.is_empty() {
            children.push(
                Node::new(NodeKind::VariableSection, Range::zero())
                    .with_children(variable_children),
            );
        }
        if !testcase_children.is_empty() {
            children.push(
                Node::new(NodeKind::TestCaseSection, Range::zero())
                    .with_children(testcase_children),
            );
        }
        if !keyword_children.is_empty() {
            children.push(
                Node::new(NodeKind::KeywordSection, Range::zero()).with_children(keyword_children),
            );
        }

        let model = Node::new(NodeKind::File, Range::zero()).with_children(children);
        ParseResult {
            model,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }
}

fn section_header(trimmed: &str) -> Option<Section> {
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("*** setting") {
        Some(Section::Settings)
    } else if lower.starts_with("*** variable") {
        Some(Section::Variables)
    } else if lower.starts_with("*** keyword") {
        Some(Section::Keywords)
    } else if lower.starts_with("*** test case") || lower.starts_with("*** task") {
        Some(Section::TestCases)
    } else if trimmed.starts_with("***") {
        Some(Section::None)
    } else {
        None
    }
}

/// Parses one statement line inside a keyword/test case body: `[Arguments]`,
/// `[Setup]`/`[Teardown]` fixtures, `[Template]`, `FOR` loop headers, or a
/// plain keyword call (name + args, first field may itself be an
/// assignment target `${result} =`).
fn parse_body_line(line: &str, line_no: u32) -> Option<Node> {
    let fields = split_fields(line);
    let (first_col, first) = *fields.first()?;
    let first_lower = first.to_ascii_lowercase();

    let range = |tokens: &[Token]| {
        let end = tokens.last().map(|t| t.end_column).unwrap_or(first_col as u32);
        Range::new(
            Position::new(line_no - 1, first_col as u32),
            Position::new(line_no - 1, end),
        )
    };

    match first_lower.as_str() {
        "[arguments]" => {
            let tokens: Vec<Token> = fields
                .iter()
                .skip(1)
                .map(|&(col, v)| Token::new(TokenType::Argument, v, line_no, col as u32))
                .collect();
            let r = range(&tokens);
            Some(Node::new(NodeKind::Arguments, r).with_tokens(tokens))
        }
        "[setup]" | "[teardown]" => {
            let tokens = call_tokens(&fields[1..], line_no);
            let r = range(&tokens);
            Some(Node::new(NodeKind::Fixture, r).with_tokens(tokens))
        }
        "[template]" => {
            let tokens = call_tokens(&fields[1..], line_no);
            let r = range(&tokens);
            Some(Node::new(NodeKind::Template, r).with_tokens(tokens))
        }
        "test template" => {
            let tokens = call_tokens(&fields[1..], line_no);
            let r = range(&tokens);
            Some(Node::new(NodeKind::TestTemplate, r).with_tokens(tokens))
        }
        "for" => {
            let tokens: Vec<Token> = fields
                .iter()
                .skip(1)
                .take_while(|(_, v)| !v.eq_ignore_ascii_case("in") && !v.starts_with("IN "))
                .map(|&(col, v)| Token::new(TokenType::Argument, v, line_no, col as u32))
                .collect();
            let r = range(&tokens);
            Some(Node::new(NodeKind::ForHeader, r).with_tokens(tokens))
        }
        "[documentation]" | "[tags]" | "[timeout]" => None,
        _ => {
            let tokens = call_tokens(&fields, line_no);
            let r = range(&tokens);
            Some(Node::new(NodeKind::KeywordCall, r).with_tokens(tokens))
        }
    }
}

/// Builds tokens for a keyword-invocation-shaped field list: leading
/// `${var} =` / `${var}    ${var2} =` assignment targets (type `Variable`),
/// then the keyword `Name`, then its `Argument`s.
fn call_tokens(fields: &[(usize, &str)], line_no: u32) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut idx = 0;

    while idx < fields.len() {
        let (col, value) = fields[idx];
        let stripped = value.strip_suffix('=').map(str::trim_end).unwrap_or(value);
        if (value.starts_with('$') || value.starts_with('@'))
            && (stripped.ends_with('}') || value.ends_with('='))
        {
            tokens.push(Token::new(TokenType::Variable, stripped, line_no, col as u32));
            idx += 1;
        } else {
            break;
        }
    }

    if idx < fields.len() {
        let (col, name) = fields[idx];
        tokens.push(Token::new(TokenType::Name, name, line_no, col as u32));
        idx += 1;
    }

    for &(col, value) in &fields[idx..] {
        tokens.push(Token::new(TokenType::Argument, value, line_no, col as u32));
    }

    tokens
}

fn split_fields(line: &str) -> Vec<(usize, &str)> {
    let mut fields = Vec::new();
    let mut rest = line;
    let mut offset = 0usize;
    loop {
        let trimmed_start = rest.len() - rest.trim_start().len();
        offset += trimmed_start;
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let field_end = rest.find("  ").unwrap_or(rest.len());
        let field = &rest[..field_end];
        if !field.is_empty() {
            fields.push((offset, field));
        }
        offset += field_end;
        rest = &rest[field_end..];
        if rest.is_empty() {
            break;
        }
    }
    fields
}

fn parse_setting_line(line: &str, line_no: u32) -> Option<Node> {
    let fields = split_fields(line);
    let (col, first) = *fields.first()?;

    let kind = match first.to_ascii_lowercase().as_str() {
        "library" => NodeKind::LibraryImport,
        "resource" => NodeKind::ResourceImport,
        "variables" => NodeKind::VariablesImport,
        _ => return None,
    };

    let mut tokens = vec![match kind {
        NodeKind::LibraryImport => Token::new(TokenType::LibrarySetting, first, line_no, col as u32),
        NodeKind::ResourceImport => Token::new(TokenType::ResourceSetting, first, line_no, col as u32),
        NodeKind::VariablesImport => {
            Token::new(TokenType::VariablesSetting, first, line_no, col as u32)
        }
        _ => unreachable!(),
    }];

    if let Some(&(name_col, name_value)) = fields.get(1) {
        tokens.push(Token::new(TokenType::Name, name_value, line_no, name_col as u32));
    }

    for &(col, value) in fields.iter().skip(2) {
        if matches!(kind, NodeKind::LibraryImport) && value.starts_with("WITH NAME") {
            continue;
        }
        tokens.push(Token::new(TokenType::Argument, value, line_no, col as u32));
    }

    if matches!(kind, NodeKind::LibraryImport) {
        if let Some(pos) = fields.iter().position(|(_, v)| *v == "WITH NAME") {
            if let Some(&(alias_col, alias_value)) = fields.get(pos + 1) {
                tokens.push(Token::new(TokenType::Alias, alias_value, line_no, alias_col as u32));
            }
        }
    }

    let start_col = col as u32;
    let end_col = tokens.last().map(|t| t.end_column).unwrap_or(start_col);
    let range = Range::new(
        Position::new(line_no - 1, start_col),
        Position::new(line_no - 1, end_col),
    );

    Some(Node::new(kind, range).with_tokens(tokens))
}

fn parse_variable_line(line: &str, line_no: u32) -> Option<Node> {
    let fields = split_fields(line);
    let (col, name) = *fields.first()?;
    if !(name.starts_with('$') || name.starts_with('@') || name.starts_with('&')) {
        return None;
    }

    let mut tokens = vec![Token::new(TokenType::Variable, name, line_no, col as u32)];
    for &(arg_col, value) in fields.iter().skip(1) {
        tokens.push(Token::new(TokenType::Argument, value, line_no, arg_col as u32));
    }

    let end_col = tokens.last().map(|t| t.end_column).unwrap_or(col as u32);
    let range = Range::new(
        Position::new(line_no - 1, col as u32),
        Position::new(line_no - 1, end_col),
    );

    Some(Node::new(NodeKind::Variable, range).with_tokens(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_variables_splits_literal_and_variable_runs() {
        let token = Token::new(TokenType::Argument, "Hello ${name}!", 1, 0);
        let parts = tokenize_variables(&token);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].value, "Hello ");
        assert_eq!(parts[1].value, "${name}");
        assert_eq!(parts[1].token_type, TokenType::Variable);
        assert_eq!(parts[2].value, "!");
    }

    #[test]
    fn tokenize_variables_on_pure_literal_returns_single_token() {
        let token = Token::new(TokenType::Argument, "no variables here", 1, 0);
        let parts = tokenize_variables(&token);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].token_type, TokenType::Data);
    }

    #[test]
    fn line_parser_extracts_imports_and_variables() {
        let source = "*** Settings ***\nLibrary    Collections\nResource    common.resource\n\n*** Variables ***\n${GREETING}    Hello\n";
        let result = LineParser::new().parse(source, Path::new("t.robot"));
        let settings = result
            .model
            .children
            .iter()
            .find(|n| n.kind == NodeKind::SettingSection)
            .unwrap();
        assert_eq!(settings.children.len(), 2);
        assert_eq!(settings.children[0].kind, NodeKind::LibraryImport);
        assert_eq!(settings.children[1].kind, NodeKind::ResourceImport);

        let variables = result
            .model
            .children
            .iter()
            .find(|n| n.kind == NodeKind::VariableSection)
            .unwrap();
        assert_eq!(variables.children.len(), 1);
    }
}
