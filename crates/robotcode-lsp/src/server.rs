//! LSP server implementation (§6 external interface, §1 scope: go-to-
//! definition, hover, diagnostics, document symbols — the protocol
//! adapters the core's query surface was designed for).

use std::path::Path;
use std::sync::Arc;

use robotcode_core::parser::{NodeKind, TokenType};
use robotcode_core::{CancellationToken, VariableKind};
use tower_lsp::jsonrpc::Result as RpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::document_store::DocumentStore;

pub struct RobotCodeLanguageServer {
    client: Client,
    documents: Arc<DocumentStore>,
}

impl RobotCodeLanguageServer {
    pub fn new(client: Client, workspace_root: std::path::PathBuf) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::new(&workspace_root)),
        }
    }

    async fn publish_diagnostics(&self, uri: Url) {
        let cancel = CancellationToken::new();
        let diagnostics = self.documents.diagnostics(&uri, &cancel).await;
        let version = self.documents.version(&uri);
        self.client.publish_diagnostics(uri, diagnostics, version).await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for RobotCodeLanguageServer {
    async fn initialize(&self, _params: InitializeParams) -> RpcResult<InitializeResult> {
        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "robotcode-lsp".to_string(),
                version: Some(robotcode_core::VERSION.to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client.log_message(MessageType::INFO, "robotcode-lsp initialized").await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        self.documents.open(uri.clone(), params.text_document.text, params.text_document.version);
        self.publish_diagnostics(uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        // Server advertises FULL sync, so the single content change carries
        // the entire new document text.
        if let Some(change) = params.content_changes.into_iter().next() {
            self.documents.change(uri.clone(), change.text, params.text_document.version);
            self.publish_diagnostics(uri).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(&params.text_document.uri);
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(namespace) = self.documents.namespace(&uri) else {
            return Ok(None);
        };

        let pos = robotcode_core::diagnostics::Position::new(position.line, position.character);
        let model = namespace.model();
        let nodes = model.walk();
        let enclosing: Vec<&robotcode_core::parser::Node> =
            nodes.iter().filter(|n| n.range.contains(pos)).copied().collect();

        for node in model.walk() {
            if !node.range.contains(pos) {
                continue;
            }
            if matches!(node.kind, NodeKind::KeywordCall | NodeKind::Fixture | NodeKind::Template | NodeKind::TestTemplate)
                && let Some(name_tok) = node.token_of_type(TokenType::Name)
                && name_tok.range().contains(pos)
                && let Some(doc) = namespace.get_keywords().await.into_iter().find(|k| robotcode_core::keyword_eq(&k.name, &name_tok.value))
            {
                return Ok(Some(Hover {
                    contents: HoverContents::Scalar(MarkedString::String(format!(
                        "**{}**({})",
                        doc.name,
                        doc.args.join(", ")
                    ))),
                    range: Some(to_lsp_range(name_tok.range())),
                }));
            }
            for token in &node.tokens {
                for sub in robotcode_core::parser::tokenize_variables(token) {
                    if sub.token_type == TokenType::Variable && sub.range().contains(pos) {
                        if let Some(def) = namespace.find_variable(&sub.value, &enclosing, pos).await {
                            let kind = match def.kind {
                                VariableKind::Own => "file",
                                VariableKind::Local => "local",
                                VariableKind::Argument => "argument",
                                VariableKind::Imported => "imported",
                                VariableKind::CommandLine => "command line",
                                VariableKind::BuiltIn => "built-in",
                                VariableKind::Environment => "environment",
                                VariableKind::NotFound => "unresolved",
                            };
                            let value = def.value.clone().unwrap_or_default();
                            return Ok(Some(Hover {
                                contents: HoverContents::Scalar(MarkedString::String(format!(
                                    "**{}** ({kind})\n\n{value}",
                                    def.name
                                ))),
                                range: Some(to_lsp_range(sub.range())),
                            }));
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(namespace) = self.documents.namespace(&uri) else {
            return Ok(None);
        };
        let pos = robotcode_core::diagnostics::Position::new(position.line, position.character);
        let model = namespace.model();

        for node in model.walk() {
            if matches!(node.kind, NodeKind::KeywordCall | NodeKind::Fixture | NodeKind::Template | NodeKind::TestTemplate)
                && let Some(name_tok) = node.token_of_type(TokenType::Name)
                && name_tok.range().contains(pos)
                && let Some(doc) = namespace.get_keywords().await.into_iter().find(|k| robotcode_core::keyword_eq(&k.name, &name_tok.value))
                && let Some(source) = &doc.source
            {
                let Ok(target_uri) = Url::from_file_path(source) else {
                    return Ok(None);
                };
                return Ok(Some(GotoDefinitionResponse::Scalar(Location {
                    uri: target_uri,
                    range: to_lsp_range(doc.range),
                })));
            }
        }
        Ok(None)
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> RpcResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(namespace) = self.documents.namespace(&uri) else {
            return Ok(None);
        };

        #[allow(deprecated)]
        let symbols: Vec<DocumentSymbol> = namespace
            .model()
            .children
            .iter()
            .flat_map(|top| top.children.iter())
            .filter_map(|node| match &node.kind {
                NodeKind::TestCase { name } => Some(DocumentSymbol {
                    name: name.clone(),
                    detail: None,
                    kind: SymbolKind::METHOD,
                    tags: None,
                    deprecated: None,
                    range: to_lsp_range(node.range),
                    selection_range: to_lsp_range(node.range),
                    children: None,
                }),
                NodeKind::Keyword { name } => Some(DocumentSymbol {
                    name: name.clone(),
                    detail: None,
                    kind: SymbolKind::FUNCTION,
                    tags: None,
                    deprecated: None,
                    range: to_lsp_range(node.range),
                    selection_range: to_lsp_range(node.range),
                    children: None,
                }),
                _ => None,
            })
            .collect();

        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }
}

fn to_lsp_range(range: robotcode_core::diagnostics::Range) -> Range {
    Range {
        start: Position::new(range.start.line, range.start.character),
        end: Position::new(range.end.line, range.end.character),
    }
}

/// File-event entry points (§6), wired up by the host's file watcher.
impl RobotCodeLanguageServer {
    pub async fn on_library_file_changed(&self, path: &Path) {
        self.documents.on_library_file_changed(path, robotcode_core::FileChangeKind::Modified);
        self.documents.invalidate_all().await;
    }

    pub async fn on_resource_file_changed(&self, path: &Path) {
        self.documents.on_resource_file_changed(path, robotcode_core::FileChangeKind::Modified);
        self.documents.invalidate_all().await;
    }

    pub async fn on_variables_file_changed(&self, path: &Path) {
        self.documents.on_variables_file_changed(path, robotcode_core::FileChangeKind::Modified);
        self.documents.invalidate_all().await;
    }
}
