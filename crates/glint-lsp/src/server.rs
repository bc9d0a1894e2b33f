//! Main LSP server implementation.

use crate::handlers::{completion, signature_help};
use crate::main_loop::run_main_loop;
use lsp_server::Connection;
use lsp_types::InitializeParams;

/// The LSP server.
pub struct Server {
    /// Connection to the LSP client.
    connection: Connection,
    /// Initialize parameters from client.
    init_params: InitializeParams,
}

impl Server {
    /// Create a new LSP server from a connection.
    pub fn new(connection: Connection, init_params: InitializeParams) -> Self {
        Self {
            connection,
            init_params,
        }
    }

    /// Run the server's main loop.
    pub fn run(self) {
        tracing::info!("Starting glint language server v{}", crate::VERSION);

        if let Some(folder) = self
            .init_params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
        {
            tracing::info!("Workspace root: {}", folder.uri.as_str());
        }

        let (sender, receiver) = (self.connection.sender, self.connection.receiver);
        run_main_loop(receiver, sender);

        tracing::info!("Server shutdown complete");
    }
}

/// Capabilities announced to the client.
pub fn server_capabilities() -> lsp_types::ServerCapabilities {
    let characters =
        |chars: &[&str]| -> Vec<String> { chars.iter().map(|c| (*c).to_string()).collect() };

    lsp_types::ServerCapabilities {
        position_encoding: Some(lsp_types::PositionEncodingKind::UTF16),
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Options(
            lsp_types::TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(lsp_types::TextDocumentSyncKind::FULL),
                save: Some(lsp_types::TextDocumentSyncSaveOptions::Supported(true)),
                ..Default::default()
            },
        )),
        hover_provider: Some(lsp_types::HoverProviderCapability::Simple(true)),
        completion_provider: Some(lsp_types::CompletionOptions {
            trigger_characters: Some(characters(completion::TRIGGER_CHARACTERS)),
            ..Default::default()
        }),
        signature_help_provider: Some(lsp_types::SignatureHelpOptions {
            trigger_characters: Some(characters(signature_help::TRIGGER_CHARACTERS)),
            retrigger_characters: None,
            work_done_progress_options: Default::default(),
        }),
        ..Default::default()
    }
}

/// Start the LSP server using stdio transport.
pub fn start_stdio() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!("Starting LSP server on stdio");

    let (connection, io_threads) = Connection::stdio();

    // Wait for initialize request
    let (id, params) = connection.initialize_start()?;
    let init_params: InitializeParams = serde_json::from_value(params)?;

    let init_result = lsp_types::InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(lsp_types::ServerInfo {
            name: "glint-lsp".to_string(),
            version: Some(crate::VERSION.to_string()),
        }),
    };

    connection.initialize_finish(id, serde_json::to_value(init_result)?)?;

    tracing::info!("LSP initialized successfully");

    let server = Server::new(connection, init_params);
    server.run();

    io_threads.join()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_advertise_queries() {
        let capabilities = server_capabilities();
        assert!(capabilities.hover_provider.is_some());
        assert_eq!(
            capabilities.position_encoding,
            Some(lsp_types::PositionEncodingKind::UTF16)
        );

        let Some(lsp_types::TextDocumentSyncCapability::Options(sync)) =
            capabilities.text_document_sync
        else {
            panic!("expected sync options");
        };
        assert_eq!(sync.change, Some(lsp_types::TextDocumentSyncKind::FULL));
        assert_eq!(
            sync.save,
            Some(lsp_types::TextDocumentSyncSaveOptions::Supported(true))
        );

        let completion = capabilities.completion_provider.expect("completion");
        assert_eq!(completion.trigger_characters, Some(vec![".".to_string()]));

        let signature = capabilities.signature_help_provider.expect("signature help");
        assert_eq!(
            signature.trigger_characters,
            Some(vec!["(".to_string(), ",".to_string()])
        );
    }
}
