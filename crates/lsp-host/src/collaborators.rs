//! Default collaborator implementations wired into the binary. The real
//! symbol table / library manager and the VHDL/SystemVerilog parsers are
//! external collaborators deliberately left unimplemented here; this module
//! supplies the narrowest stand-ins so the host links and runs end to end.

use std::path::Path;
use std::sync::Mutex;

use lsp_core::index::collaborators::{LibraryManager, SymbolEntry, SymbolParser};

/// Holds every symbol inserted into it, grouped by library, in memory. A
/// real library manager would feed these into an elaboration/semantic
/// database instead; that facility is out of scope here.
#[derive(Default)]
pub struct InMemoryLibraryManager {
    entries: Mutex<Vec<(String, SymbolEntry)>>,
}

impl InMemoryLibraryManager {
    pub fn new() -> Self {
        InMemoryLibraryManager::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LibraryManager for InMemoryLibraryManager {
    fn insert(&self, library: &str, entry: SymbolEntry) {
        self.entries.lock().unwrap().push((library.to_string(), entry));
    }

    fn destroy(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// A parser stand-in that discovers no symbols. Wired for both VHDL and
/// SystemVerilog so the indexer's per-language parser dispatch has
/// something to call for both languages; a real frontend swaps this for
/// the VHDL/SystemVerilog parser collaborator.
pub struct NullParser;

impl SymbolParser for NullParser {
    fn parse(&self, _path: &Path) -> Result<Vec<SymbolEntry>, String> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_manager_tracks_inserts_and_clears_on_destroy() {
        let manager = InMemoryLibraryManager::new();
        manager.insert(
            "work",
            SymbolEntry {
                name: "top".into(),
                path: Path::new("/repo/top.vhd").to_path_buf(),
                line: 1,
            },
        );
        assert_eq!(manager.len(), 1);
        manager.destroy();
        assert!(manager.is_empty());
    }

    #[test]
    fn null_parser_reports_no_symbols() {
        assert_eq!(NullParser.parse(Path::new("top.vhd")).unwrap(), Vec::new());
    }
}
