//! Text document related LSP methods.

mod code_lens;
