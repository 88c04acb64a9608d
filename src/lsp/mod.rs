mod client;
mod lsp_impl;
mod settings;
mod text_sync;

pub use lsp_impl::RefLens;
pub use settings::{
    SettingsEvent, SettingsEventKind, SettingsLoadOutcome, SettingsSource, load_settings,
};
