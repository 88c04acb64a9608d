//! Code lens method for RefLens.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::{CodeLens, CodeLensParams};

use crate::analysis::code_lens::reference_count_annotations;
use crate::references::LocalsIndex;

use super::super::{RefLens, uri_to_url};

impl RefLens {
    pub(crate) async fn code_lens_impl(
        &self,
        params: CodeLensParams,
    ) -> Result<Option<Vec<CodeLens>>> {
        let lsp_uri = params.text_document.uri;
        let Ok(uri) = uri_to_url(&lsp_uri) else {
            log::warn!("Invalid URI in codeLens: {}", lsp_uri.as_str());
            return Ok(None);
        };

        // Checked before any work on the document
        let Some(command_id) = self.show_references_command() else {
            return Ok(Some(Vec::new()));
        };
        if !self.reference_count_enabled() {
            return Ok(Some(Vec::new()));
        }

        let snapshot = match self.documents.get(&uri) {
            Some(doc) => doc.snapshot(),
            None => {
                log::debug!(target: "reflens::code_lens", "No document for {uri}");
                return Ok(None);
            }
        };
        // Open but never parsed: no language for it
        let Some(snapshot) = snapshot else {
            return Ok(Some(Vec::new()));
        };

        let Some(language_name) = self
            .language
            .language_for(&uri, snapshot.language_id.as_deref())
        else {
            return Ok(Some(Vec::new()));
        };
        let Some(locals) = self.language.locals_query(&language_name) else {
            log::debug!(target: "reflens::code_lens", "No locals query for {language_name}");
            return Ok(Some(Vec::new()));
        };

        let index = LocalsIndex::build(uri.clone(), &snapshot.text, &snapshot.tree, &locals);
        let lenses: Vec<CodeLens> = reference_count_annotations(&index, &uri, Some(command_id))
            .into_iter()
            .map(CodeLens::from)
            .collect();

        log::debug!(
            target: "reflens::code_lens",
            "{} reference lenses for {}",
            lenses.len(),
            uri
        );
        Ok(Some(lenses))
    }
}
