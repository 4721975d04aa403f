//! Analyzer (§4.6): the second pass over the syntax tree. Yields
//! diagnostics only — it never mutates the namespace's resolved maps.

use crate::cancellation::CancellationToken;
use crate::diagnostics::{Diagnostic, Range};
use crate::parser::{Node, NodeKind, Token, TokenType, tokenize_variables};
use crate::result::Result;
use crate::semantic::entities::RunKeywordKind;
use crate::semantic::finder;
use crate::semantic::namespace::Namespace;

/// Runs the analyzer over `namespace`'s model and returns every diagnostic
/// produced. Checks `cancel` between nodes (§4.6 "must remain cancellable
/// at every node boundary").
pub async fn analyze(namespace: &Namespace, cancel: &CancellationToken) -> Result<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let model = namespace.model();
    for top in &model.children {
        analyze_node(namespace, top, &[], cancel, &mut diagnostics).await?;
    }
    Ok(diagnostics)
}

fn analyze_node<'a>(
    namespace: &'a Namespace,
    node: &'a Node,
    enclosing: &'a [&'a Node],
    cancel: &'a CancellationToken,
    diagnostics: &'a mut Vec<Diagnostic>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        cancel.check()?;

        let mut next_enclosing: Vec<&Node> = enclosing.to_vec();
        if matches!(node.kind, NodeKind::Keyword { .. } | NodeKind::TestCase { .. }) {
            next_enclosing.push(node);
        }

        match &node.kind {
            NodeKind::KeywordCall | NodeKind::Fixture | NodeKind::Template | NodeKind::TestTemplate => {
                analyze_invocation(namespace, node, &next_enclosing, cancel, diagnostics).await?;
            }
            _ => {}
        }

        analyze_variable_tokens(namespace, node, &next_enclosing, diagnostics).await;

        for child in &node.children {
            analyze_node(namespace, child, &next_enclosing, cancel, diagnostics).await?;
        }
        Ok(())
    })
}

async fn analyze_invocation<'a>(
    namespace: &'a Namespace,
    node: &'a Node,
    enclosing: &[&'a Node],
    cancel: &CancellationToken,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let Some(name_token) = invocation_name_token(node) else {
        return Ok(());
    };
    if is_pure_variable_reference(&name_token.value) {
        return Ok(());
    }

    let doc = finder::find_keyword(namespace, &name_token.value, name_token.range(), diagnostics).await;
    let Some(doc) = doc else {
        return Ok(());
    };

    let args: Vec<&Token> = node.tokens_of_type(TokenType::Argument).collect();
    if let Some(kind) = doc.flags.run_keyword {
        analyze_run_keyword(namespace, kind, &args, name_token.range(), cancel, diagnostics).await?;
    }

    Ok(())
}

fn invocation_name_token(node: &Node) -> Option<&Token> {
    node.token_of_type(TokenType::Name)
}

fn is_pure_variable_reference(value: &str) -> bool {
    let parts = tokenize_variables(&Token::new(TokenType::Data, value, 1, 0));
    parts.len() == 1 && parts[0].token_type == TokenType::Variable
}

/// Recurses into the any-run-keyword family (§4.6). `args` are the
/// invocation's own argument tokens (i.e. everything after the `Run
/// Keyword...` name token itself).
fn analyze_run_keyword<'a>(
    namespace: &'a Namespace,
    kind: RunKeywordKind,
    args: &'a [&'a Token],
    call_range: Range,
    cancel: &'a CancellationToken,
    diagnostics: &'a mut Vec<Diagnostic>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        cancel.check()?;
        match kind {
            RunKeywordKind::RunKeyword => {
                if let Some((&name, rest)) = args.split_first() {
                    analyze_sub_call(namespace, &name.value, rest, name.range(), cancel, diagnostics).await?;
                }
            }
            RunKeywordKind::RunKeywordWithCondition => {
                if args.len() >= 2 {
                    let name = unescape(&args[1].value);
                    analyze_sub_call(namespace, &name, &args[2..], args[1].range(), cancel, diagnostics).await?;
                }
            }
            RunKeywordKind::RunKeywords => {
                for segment in split_on_and(args) {
                    if let Some((&name, rest)) = segment.split_first() {
                        analyze_sub_call(namespace, &name.value, rest, name.range(), cancel, diagnostics).await?;
                    }
                }
            }
            RunKeywordKind::RunKeywordIf => {
                analyze_run_keyword_if(namespace, args, call_range, cancel, diagnostics).await?;
            }
        }
        Ok(())
    })
}

async fn analyze_run_keyword_if<'a>(
    namespace: &'a Namespace,
    args: &'a [&'a Token],
    call_range: Range,
    cancel: &CancellationToken,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }
    let mut rest = &args[1..];

    loop {
        let Some((&name, after_name)) = rest.split_first() else {
            return Ok(());
        };
        let branch_end = after_name
            .iter()
            .position(|t| t.value.eq_ignore_ascii_case("ELSE IF") || t.value.eq_ignore_ascii_case("ELSE"))
            .unwrap_or(after_name.len());
        let branch_args = &after_name[..branch_end];
        Box::pin(analyze_sub_call(namespace, &name.value, branch_args, name.range(), cancel, diagnostics)).await?;

        if branch_end >= after_name.len() {
            return Ok(());
        }
        let marker = &after_name[branch_end];
        if marker.value.eq_ignore_ascii_case("ELSE") {
            let Some((&kw, kw_rest)) = after_name[branch_end + 1..].split_first() else {
                return Ok(());
            };
            return Box::pin(analyze_sub_call(namespace, &kw.value, kw_rest, kw.range(), cancel, diagnostics)).await;
        }
        // ELSE IF: skip the condition token, continue the loop on what follows it.
        let after_else_if = &after_name[branch_end + 1..];
        let _ = call_range;
        rest = &after_else_if[after_else_if.first().map(|_| 1).unwrap_or(0)..];
    }
}

fn analyze_sub_call<'a>(
    namespace: &'a Namespace,
    name: &'a str,
    args: &'a [&'a Token],
    range: Range,
    cancel: &'a CancellationToken,
    diagnostics: &'a mut Vec<Diagnostic>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        cancel.check()?;
        if name.trim().is_empty() || is_pure_variable_reference(name) {
            return Ok(());
        }
        let doc = finder::find_keyword(namespace, name, range, diagnostics).await;
        if let Some(doc) = doc {
            if let Some(kind) = doc.flags.run_keyword {
                analyze_run_keyword(namespace, kind, args, range, cancel, diagnostics).await?;
            }
        }
        Ok(())
    })
}

fn split_on_and<'a>(tokens: &'a [&'a Token]) -> Vec<Vec<&'a Token>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for &token in tokens {
        if token.value.eq_ignore_ascii_case("AND") {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn unescape(value: &str) -> String {
    value.replace("\\ ", " ")
}

async fn analyze_variable_tokens(namespace: &Namespace, node: &Node, enclosing: &[&Node], diagnostics: &mut Vec<Diagnostic>) {
    for token in &node.tokens {
        if matches!(token.token_type, TokenType::Name | TokenType::Alias) {
            continue;
        }
        for sub in tokenize_variables(token) {
            if sub.token_type != TokenType::Variable {
                continue;
            }
            let position = sub.start();
            if namespace.find_variable(&sub.value, enclosing, position).await.is_none() {
                diagnostics.push(
                    Diagnostic::warning(sub.range(), format!("Variable '{}' not found.", sub.value)).with_code("VariableNotFound"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SentinelRegistry;
    use crate::parser::{LineParser, RobotParser};
    use crate::semantic::imports_manager::ImportsManager;
    use crate::semantic::library_doc::LibraryDocProvider;
    use std::path::Path;
    use std::sync::Arc;

    async fn namespace_from(source_text: &str) -> Namespace {
        let path = Path::new("t.robot");
        let model = LineParser::new().parse(source_text, path).model;
        let provider = Arc::new(LibraryDocProvider::with_stdlib(Arc::new(LineParser::new())));
        let imports_manager = Arc::new(ImportsManager::new(provider, vec![]));
        Namespace::new(path, model, imports_manager, Arc::new(SentinelRegistry::default()), Vec::new())
    }

    #[tokio::test]
    async fn unresolved_keyword_call_produces_not_found_diagnostic() {
        let ns = namespace_from("*** Test Cases ***\nT1\n    Missing Keyword\n").await;
        let token = CancellationToken::new();
        let diags = analyze(&ns, &token).await.unwrap();
        assert!(diags.iter().any(|d| d.message.contains("No keyword with name 'Missing Keyword' found")));
    }

    #[tokio::test]
    async fn known_keyword_call_produces_no_diagnostic() {
        let ns = namespace_from("*** Test Cases ***\nT1\n    Log    hi\n").await;
        let token = CancellationToken::new();
        let diags = analyze(&ns, &token).await.unwrap();
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn run_keyword_if_recurses_into_else_if_branch() {
        let ns = namespace_from(
            "*** Test Cases ***\nT1\n    Run Keyword If    ${cond}    Log    hi    ELSE IF    ${c2}    Missing KW\n",
        )
        .await;
        let token = CancellationToken::new();
        let diags = analyze(&ns, &token).await.unwrap();
        assert!(diags.iter().any(|d| d.message.contains("No keyword with name 'Missing KW' found")));
        assert!(diags.iter().any(|d| d.message.contains("'${cond}' not found") || d.message.contains("'${c2}' not found")));
    }

    #[tokio::test]
    async fn cancellation_stops_analysis() {
        let ns = namespace_from("*** Test Cases ***\nT1\n    Missing Keyword\n").await;
        let token = CancellationToken::new();
        token.cancel();
        let result = analyze(&ns, &token).await;
        assert!(result.is_err());
    }
}
