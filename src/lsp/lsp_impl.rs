use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{
    CodeLens, CodeLensOptions, CodeLensParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, InitializeParams, InitializeResult,
    InitializedParams, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, Uri,
};
use tower_lsp_server::{Client, LanguageServer};
use tree_sitter::{InputEdit, Tree};
use url::Url;

use crate::config::WorkspaceSettings;
use crate::document::DocumentStore;
use crate::error::LockResultExt;
use crate::language::LanguageRegistry;

use super::client::{ClientNotifier, show_references_command_id};
use super::settings::{SettingsSource, load_settings};
use super::text_sync::apply_content_changes_with_edits;

mod text_document;

/// Convert the protocol's `Uri` into the `Url` documents are keyed by
pub(crate) fn uri_to_url(uri: &Uri) -> std::result::Result<Url, url::ParseError> {
    Url::parse(uri.as_str())
}

pub struct RefLens {
    client: Client,
    pub(crate) documents: DocumentStore,
    pub(crate) language: LanguageRegistry,
    settings: Mutex<WorkspaceSettings>,
    /// Set once during `initialize`; `None` inside means the client has no
    /// show-references command.
    show_references_command: OnceLock<Option<String>>,
}

impl std::fmt::Debug for RefLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefLens")
            .field("client", &self.client)
            .field("show_references_command", &self.show_references_command)
            .finish_non_exhaustive()
    }
}

impl RefLens {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: DocumentStore::new(),
            language: LanguageRegistry::new(),
            settings: Mutex::new(WorkspaceSettings::default()),
            show_references_command: OnceLock::new(),
        }
    }

    fn notifier(&self) -> ClientNotifier {
        ClientNotifier::new(self.client.clone())
    }

    /// The client's show-references command, if it advertised one
    pub(crate) fn show_references_command(&self) -> Option<&str> {
        self.show_references_command.get()?.as_deref()
    }

    pub(crate) fn reference_count_enabled(&self) -> bool {
        self.settings
            .lock()
            .recover_poison("RefLens::reference_count_enabled")
            .reference_count_lens
    }

    pub(crate) fn get_language_for_document(&self, uri: &Url) -> Option<String> {
        let language_id = self
            .documents
            .get(uri)
            .and_then(|doc| doc.language_id().map(str::to_string));
        self.language.language_for(uri, language_id.as_deref())
    }

    /// Parse `text` and store it with its tree; documents in unknown
    /// languages are stored without one.
    fn parse_document(&self, uri: &Url, text: String, version: Option<i32>, edits: &[InputEdit]) {
        let tree = self.parse(uri, &text, edits);
        self.documents.update_document(uri, text, version, tree);
    }

    fn parse(&self, uri: &Url, text: &str, edits: &[InputEdit]) -> Option<Tree> {
        let language_name = self.get_language_for_document(uri)?;
        let mut parser = self.language.create_parser(&language_name)?;

        let old_tree = if edits.is_empty() {
            None
        } else {
            self.documents.get_edited_tree(uri, edits)
        };

        let tree = parser.parse(text, old_tree.as_ref());
        if tree.is_none() {
            log::warn!(target: "reflens::document", "Failed to parse {uri} as {language_name}");
        }
        tree
    }

    fn resolve_root_path(params: &InitializeParams) -> Option<PathBuf> {
        let from_uri = |uri: &Uri| uri_to_url(uri).ok()?.to_file_path().ok();

        if let Some(folders) = &params.workspace_folders {
            return folders.first().and_then(|folder| from_uri(&folder.uri));
        }
        #[allow(deprecated)]
        let root_uri = params.root_uri.as_ref();
        match root_uri {
            Some(root_uri) => from_uri(root_uri),
            None => std::env::current_dir().ok(),
        }
    }
}

impl LanguageServer for RefLens {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let notifier = self.notifier();

        let command = show_references_command_id(&params.capabilities);
        if command.is_none() {
            log::info!(
                target: "reflens::code_lens",
                "Client has no showReferencesCommandId; reference lenses disabled"
            );
        }
        if self.show_references_command.set(command).is_err() {
            log::warn!(
                target: "reflens::code_lens",
                "initialize received twice; keeping the first client capabilities"
            );
        }

        let root_path = Self::resolve_root_path(&params);
        match &root_path {
            Some(path) => {
                notifier
                    .log_info(format!("Using workspace root: {}", path.display()))
                    .await
            }
            None => {
                notifier
                    .log_warning("Failed to determine workspace root - project config will not be loaded")
                    .await
            }
        }

        let outcome = load_settings(
            root_path.as_deref(),
            params
                .initialization_options
                .map(|options| (SettingsSource::InitializationOptions, options)),
        );
        notifier.log_settings_events(&outcome.events).await;

        if let Some(settings) = outcome.settings {
            let events = self.language.apply_settings(&settings);
            notifier.log_language_events(&events).await;
            *self.settings.lock().recover_poison("RefLens::initialize") = settings;
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "reflens".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(false),
                }),
                ..ServerCapabilities::default()
            },
            ..InitializeResult::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.notifier().log_info("reflens is ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let Ok(uri) = uri_to_url(&document.uri) else {
            log::warn!("Invalid URI in didOpen: {}", document.uri.as_str());
            return;
        };

        self.documents.open(
            uri.clone(),
            document.text.clone(),
            document.version,
            Some(document.language_id),
        );
        self.parse_document(&uri, document.text, Some(document.version), &[]);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Ok(uri) = uri_to_url(&params.text_document.uri) else {
            log::warn!(
                "Invalid URI in didChange: {}",
                params.text_document.uri.as_str()
            );
            return;
        };

        let Some(old_text) = self.documents.get(&uri).map(|doc| doc.text().to_string()) else {
            log::debug!(target: "reflens::document", "didChange for unopened document {uri}");
            return;
        };

        let (text, edits) = apply_content_changes_with_edits(&old_text, params.content_changes);
        self.parse_document(&uri, text, Some(params.text_document.version), &edits);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        if let Ok(uri) = uri_to_url(&params.text_document.uri) {
            self.documents.remove(&uri);
        }
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        self.code_lens_impl(params).await
    }
}
