use clap::{Parser, Subcommand};
use reflens::analysis::lenses_for_file;
use reflens::config::{LanguageConfig, QueryItem};
use reflens::language::{LanguageLogLevel, LanguageRegistry};
use reflens::lsp::{RefLens, SettingsEventKind, load_settings};
use std::path::PathBuf;
use tokio::io::{stdin, stdout};
use tower_lsp_server::{LspService, Server};

/// A language server showing reference counts as code lenses, driven by tree-sitter locals queries
#[derive(Parser)]
#[command(name = "reflens")]
#[command(version)]
#[command(about = "Reference-count code lenses from tree-sitter locals queries")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the reference lenses of a file as JSON
    Lenses {
        /// The file to analyze
        file: PathBuf,

        /// Language name (default: detected from the file extension)
        #[arg(long)]
        language: Option<String>,

        /// Parser library for the language (overrides configuration)
        #[arg(long, requires = "language")]
        library: Option<PathBuf>,

        /// locals.scm query file for the language (overrides configuration)
        #[arg(long, requires = "language")]
        locals: Option<PathBuf>,

        /// Command id placed in each lens
        #[arg(long, default_value = "reflens.showReferences")]
        command: String,
    },
}

#[tokio::main]
async fn main() {
    // stdout carries the LSP channel; logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Lenses {
            file,
            language,
            library,
            locals,
            command,
        }) => {
            let cwd = std::env::current_dir().ok();
            let outcome = load_settings(cwd.as_deref(), None);
            for event in &outcome.events {
                match event.kind {
                    SettingsEventKind::Info => log::info!("{}", event.message),
                    SettingsEventKind::Warning => log::warn!("{}", event.message),
                }
            }

            let mut settings = outcome.settings.unwrap_or_default();
            if let Some(name) = &language {
                let config = settings
                    .languages
                    .entry(name.clone())
                    .or_insert_with(LanguageConfig::default);
                if let Some(library) = library {
                    config.library = Some(library.to_string_lossy().into_owned());
                }
                if let Some(locals) = locals {
                    config.locals = Some(vec![QueryItem::Path {
                        path: locals.to_string_lossy().into_owned(),
                    }]);
                }
            }

            let registry = LanguageRegistry::new();
            for event in registry.apply_settings(&settings) {
                match event.level {
                    LanguageLogLevel::Info => log::info!("{}", event.message),
                    LanguageLogLevel::Warning => log::warn!("{}", event.message),
                    LanguageLogLevel::Error => log::error!("{}", event.message),
                }
            }

            let lenses = match lenses_for_file(&registry, &file, language.as_deref(), &command) {
                Ok(lenses) => lenses,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            match serde_json::to_string_pretty(&lenses) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            let stdin = stdin();
            let stdout = stdout();

            let (service, socket) = LspService::new(RefLens::new);
            Server::new(stdin, stdout, socket).serve(service).await;
        }
    }
}
