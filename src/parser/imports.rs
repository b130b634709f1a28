//! Import closure: reading imported files and the state shared by every
//! parse in one closure.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use super::grammar::{self, Definitions};
use super::{validate_source, ParseOptions};
use crate::error::ParseError;
use crate::tree::IdGenerator;

/// Reads the text of an imported file given its bare file name.
pub trait SourceLoader {
    fn load(&self, name: &str) -> io::Result<String>;
}

/// Loads imports from one directory on disk.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(name))
    }
}

/// In-memory sources keyed by file name.
impl SourceLoader for HashMap<String, String> {
    fn load(&self, name: &str) -> io::Result<String> {
        self.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no source named '{}'", name))
        })
    }
}

/// State shared by a root parse and every parse in its import closure.
pub struct ParseSession<'a> {
    pub(crate) ids: IdGenerator,
    imports: Vec<String>,
    loader: &'a dyn SourceLoader,
    pub(crate) options: &'a ParseOptions,
}

impl<'a> ParseSession<'a> {
    pub fn new(loader: &'a dyn SourceLoader, options: &'a ParseOptions) -> Self {
        ParseSession {
            ids: IdGenerator::new(),
            imports: Vec::new(),
            loader,
            options,
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    pub fn has_seen(&self, name: &str) -> bool {
        self.imports.iter().any(|i| i == name)
    }

    pub(crate) fn mark_seen(&mut self, name: &str) {
        if !self.has_seen(name) {
            self.imports.push(name.to_string());
        }
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub(crate) fn into_imports(self) -> Vec<String> {
        self.imports
    }
}

/// Reduce an import target to the bare file name used for lookup:
/// the text after the last `/`, without quote characters.
pub fn normalize_import(raw: &str) -> String {
    let base = match raw.rfind('/') {
        Some(pos) => &raw[pos + 1..],
        None => raw,
    };
    base.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// Parse one import target within `session`.
///
/// Returns `Ok(None)` when the import was already seen in this closure or
/// could not be loaded; both cases are skipped without failing the parse.
pub(crate) fn load_import(
    raw: &str,
    session: &mut ParseSession<'_>,
) -> Result<Option<Definitions>, ParseError> {
    let name = normalize_import(raw);
    if name.is_empty() {
        return Ok(None);
    }
    if session.has_seen(&name) {
        log::debug!("import {} already parsed, skipping", name);
        return Ok(None);
    }
    session.mark_seen(&name);

    let text = match session.loader.load(&name) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("imported {} not found: {}", name, e);
            return Ok(None);
        }
    };
    if let Err(e) = validate_source(&text, session.options) {
        log::warn!("imported {} skipped: {}", name, e);
        return Ok(None);
    }

    log::debug!("parsing import {}", name);
    let label = file_stem(&name);
    grammar::parse_definitions(&text, &label, session).map(Some)
}

/// File name without its last extension.
pub(crate) fn file_stem(name: &str) -> String {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name[..pos].to_string(),
        _ => name.to_string(),
    }
}
