//! Narrow collaborator interfaces the indexer dispatches to. A real HDL
//! front end supplies these; this crate only defines the seam, since
//! parsing/semantic analysis of VHDL or SystemVerilog source is out of
//! scope here.

use std::path::{Path, PathBuf};

/// Which HDL dialect a file belongs to, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    Vhdl,
    SystemVerilog,
}

impl ParserKind {
    /// `None` for extensions the indexer doesn't recognize; such files are
    /// skipped during a directory walk.
    pub fn from_extension(path: &Path) -> Option<ParserKind> {
        match path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase().as_str() {
            "vhd" | "vhdl" => Some(ParserKind::Vhdl),
            "sv" | "svh" | "v" => Some(ParserKind::SystemVerilog),
            _ => None,
        }
    }
}

/// One symbol record produced by parsing a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub path: PathBuf,
    pub line: usize,
}

/// Extracts symbol entries from a single source file.
pub trait SymbolParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<Vec<SymbolEntry>, String>;
}

/// Receives parsed symbols, organized by library.
pub trait LibraryManager: Send + Sync {
    fn insert(&self, library: &str, entry: SymbolEntry);

    /// Called under the swap lock when a configuration reload replaces
    /// this manager.
    fn destroy(&self) {}
}

/// A registry of parsers keyed by dialect, used by the worker to dispatch
/// a discovered file to the right collaborator.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    vhdl: Option<std::sync::Arc<dyn SymbolParser>>,
    system_verilog: Option<std::sync::Arc<dyn SymbolParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        ParserRegistry::default()
    }

    pub fn with_vhdl(mut self, parser: std::sync::Arc<dyn SymbolParser>) -> Self {
        self.vhdl = Some(parser);
        self
    }

    pub fn with_system_verilog(mut self, parser: std::sync::Arc<dyn SymbolParser>) -> Self {
        self.system_verilog = Some(parser);
        self
    }

    pub fn for_kind(&self, kind: ParserKind) -> Option<&std::sync::Arc<dyn SymbolParser>> {
        match kind {
            ParserKind::Vhdl => self.vhdl.as_ref(),
            ParserKind::SystemVerilog => self.system_verilog.as_ref(),
        }
    }
}
