pub mod lexer;
pub mod imports;
pub mod resolve;
mod context;
mod grammar;

use std::fs;
use std::path::Path;

use crate::error::ParseError;
use crate::tree::ParsedProto;

pub use imports::{FsLoader, ParseSession, SourceLoader};

/// Shortest source text accepted by the entry guard.
pub const MINIMUM_SOURCE_LEN: usize = 35;

/// Root label used when a source string declares no service.
pub const DEFAULT_SERVICE_NAME: &str = "No service";

/// Knobs for the entry guard and root labelling.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub min_source_len: usize,
    /// Substrings every source must contain at least once.
    pub required_keywords: Vec<String>,
    /// Root label when no `service` is declared.
    pub service_name: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            min_source_len: MINIMUM_SOURCE_LEN,
            required_keywords: vec!["syntax".to_string(), "package".to_string()],
            service_name: None,
        }
    }
}

impl ParseOptions {
    fn root_label(&self) -> &str {
        self.service_name.as_deref().unwrap_or(DEFAULT_SERVICE_NAME)
    }
}

/// Cheap sanity gate run before tokenizing: minimum length and required
/// keywords. This is not grammar validation.
pub fn validate_source(text: &str, options: &ParseOptions) -> Result<(), ParseError> {
    if text.len() < options.min_source_len {
        return Err(ParseError::malformed(
            "not enough content in proto source to be valid",
        ));
    }
    for keyword in &options.required_keywords {
        if !text.contains(keyword.as_str()) {
            return Err(ParseError::malformed(format!(
                "proto source must have at least one '{}'",
                keyword
            )));
        }
    }
    Ok(())
}

/// Parse proto source text. Imports are looked up in the current directory.
pub fn parse_from_str(text: &str) -> Result<ParsedProto, ParseError> {
    let loader = FsLoader::new(".");
    parse_with_loader(text, &loader, &ParseOptions::default())
}

/// Parse a proto file. Imports are looked up next to it, and the root is
/// labelled with the file stem unless the file declares a service.
pub fn parse_from_file(path: impl AsRef<Path>) -> Result<ParsedProto, ParseError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ParseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let options = ParseOptions {
        service_name: Some(imports::file_stem(&file_name)),
        ..ParseOptions::default()
    };

    let loader = FsLoader::new(dir);
    parse_root(&text, Some(&file_name), &loader, &options)
}

/// Parse source text, reading imports through `loader`.
pub fn parse_with_loader(
    text: &str,
    loader: &dyn SourceLoader,
    options: &ParseOptions,
) -> Result<ParsedProto, ParseError> {
    parse_root(text, None, loader, options)
}

fn parse_root(
    text: &str,
    file_name: Option<&str>,
    loader: &dyn SourceLoader,
    options: &ParseOptions,
) -> Result<ParsedProto, ParseError> {
    validate_source(text, options)?;

    let mut session = ParseSession::new(loader, options);
    if let Some(name) = file_name {
        session.mark_seen(name);
    }

    let mut defs = grammar::parse_definitions(text, options.root_label(), &mut session)?;
    resolve::resolve(&mut defs, &mut session.ids);
    let root = resolve::assemble(&defs, &mut session.ids);

    Ok(ParsedProto {
        root,
        messages: defs.messages,
        enums: defs.enums,
        imports: session.into_imports(),
    })
}
