//! Block-scoped variable extraction and the merge-order resolver (§4.7).

use crate::diagnostics::{Position, Range};
use crate::parser::{Node, NodeKind, TokenType};
use crate::semantic::entities::{VariableDefinition, VariableKind};
use crate::semantic::matcher::VariableMatcher;
use std::path::Path;

/// Extracts block-scoped variable definitions visible inside a single
/// `Keyword`/`TestCase` node: keyword-name embedded arguments,
/// `[Arguments]` tokens, `FOR` loop variables, and keyword-call assignment
/// targets (§4.7).
///
/// Returns definitions in source order; callers filter by "defined at or
/// before `position`" themselves via each definition's `range`.
pub fn block_scoped_variables(owner: &Node, source: &Path) -> Vec<VariableDefinition> {
    let mut out = Vec::new();

    if let NodeKind::Keyword { name } = &owner.kind {
        for token in crate::parser::tokenize_variables(&crate::parser::Token::new(
            TokenType::Data,
            name.clone(),
            owner.range.start.line + 1,
            owner.range.start.character,
        )) {
            if token.token_type == TokenType::Variable {
                out.push(VariableDefinition::new(
                    token.value.clone(),
                    token.range(),
                    source.to_path_buf(),
                    VariableKind::Argument,
                ));
            }
        }
    }

    for child in &owner.children {
        match child.kind {
            NodeKind::Arguments => {
                for token in child.tokens_of_type(TokenType::Argument) {
                    let name = token.value.split("=").next().unwrap_or(&token.value).trim();
                    out.push(VariableDefinition::new(
                        name.to_string(),
                        token.range(),
                        source.to_path_buf(),
                        VariableKind::Argument,
                    ));
                }
            }
            NodeKind::ForHeader => {
                for token in child.tokens_of_type(TokenType::Argument) {
                    out.push(VariableDefinition::new(
                        token.value.clone(),
                        token.range(),
                        source.to_path_buf(),
                        VariableKind::Local,
                    ));
                }
            }
            NodeKind::KeywordCall => {
                for token in child.tokens_of_type(TokenType::Variable) {
                    out.push(VariableDefinition::new(
                        token.value.clone(),
                        token.range(),
                        source.to_path_buf(),
                        VariableKind::Local,
                    ));
                }
            }
            _ => {}
        }
    }

    out
}

/// Variables visible strictly before `position`, innermost keyword/test
/// first (§4.4 `get_variables`: "only block-scoped locals defined at or
/// before `position` in the nearest enclosing keyword/test are
/// included").
pub fn locals_before(enclosing: &[&Node], position: Position, source: &Path) -> Vec<VariableDefinition> {
    let Some(owner) = enclosing
        .iter()
        .rev()
        .find(|n| matches!(n.kind, NodeKind::Keyword { .. } | NodeKind::TestCase { .. }))
    else {
        return Vec::new();
    };
    block_scoped_variables(owner, source)
        .into_iter()
        .filter(|def| def.range.start <= position)
        .collect()
}

/// Merges variable sources per §4.7's order and returns the first match
/// under canonical equality, or `None` if nothing matches.
///
/// Sources are passed pre-ordered by the caller (namespace builder), since
/// the merge order itself — locals, own file, resources in source order,
/// command-line, variables-files in source order, built-ins — is a matter
/// of which slices are concatenated, not logic this function needs to
/// know about.
pub fn resolve<'a>(
    name: &str,
    locals: &'a [VariableDefinition],
    own: &'a [VariableDefinition],
    resources: &'a [VariableDefinition],
    command_line: &'a [VariableDefinition],
    variables_files: &'a [VariableDefinition],
    builtins: &'a [VariableDefinition],
) -> Option<&'a VariableDefinition> {
    let target = VariableMatcher::new(name).ok()?;
    for source in [locals, own, resources, command_line, variables_files, builtins] {
        for def in source {
            if let Ok(candidate) = VariableMatcher::new(&def.name) {
                if candidate == target {
                    return Some(def);
                }
            }
        }
    }
    None
}

/// Builds the fixed set of built-in variable definitions (§3, SPEC_FULL
/// §10.7) used as the last tier of [`resolve`].
pub fn builtin_variable_definitions(source: &Path) -> Vec<VariableDefinition> {
    crate::semantic::entities::BUILTIN_VARIABLES
        .iter()
        .map(|name| {
            VariableDefinition::new(name.to_string(), Range::zero(), source.to_path_buf(), VariableKind::BuiltIn)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LineParser;
    use crate::parser::RobotParser;
    use std::path::Path;

    #[test]
    fn block_scoped_variables_extracts_arguments_and_call_assignments() {
        let source = "*** Keywords ***\nGreet\n    [Arguments]    ${name}\n    ${result} =    Build Greeting    ${name}\n";
        let result = LineParser::new().parse(source, Path::new("t.resource"));
        let keywords_section = result
            .model
            .children
            .iter()
            .find(|n| n.kind == NodeKind::KeywordSection)
            .unwrap();
        let keyword = &keywords_section.children[0];

        let vars = block_scoped_variables(keyword, Path::new("t.resource"));
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&"${name}"));
        assert!(names.contains(&"${result}"));
    }

    #[test]
    fn resolve_returns_first_hit_by_tier() {
        let source = Path::new("t.resource");
        let local = vec![VariableDefinition::new("${x}", Range::zero(), source, VariableKind::Local)];
        let own = vec![VariableDefinition::new("${x}", Range::zero(), source, VariableKind::Own).with_value("own")];

        let found = resolve("${x}", &local, &own, &[], &[], &[], &[]);
        assert_eq!(found.unwrap().kind, VariableKind::Local);
    }

    #[test]
    fn resolve_falls_through_to_builtins() {
        let source = Path::new("t.resource");
        let builtins = builtin_variable_definitions(source);
        let found = resolve("${TEMPDIR}", &[], &[], &[], &[], &[], &builtins);
        assert!(found.is_some());
        assert_eq!(found.unwrap().kind, VariableKind::BuiltIn);
    }
}
