//! core::pinfile
//!
//! In-memory model of the control repository's pin file (an r10k
//! `Puppetfile` built on the `ris_int` / `ris_ext` shortcuts).
//!
//! # Grammar
//!
//! One declaration per line:
//!
//! ```text
//! ris_(int|ext) '<name>'[, '<name2>'][, <key> => <value>]*
//! ```
//!
//! Names are `[A-Za-z0-9_]+`. Lines that do not match are dropped on
//! rewrite: comments, directives and blank lines are not preserved.
//!
//! # Rendering
//!
//! [`PinFile::render`] regroups declarations into four fixed sections
//! (roles, profiles, external modules, everything else), each sorted by
//! identity. Rendering is stable under one parse round trip:
//! `render(parse(render(f))) == render(f)`.
//!
//! # Example
//!
//! ```
//! use rispuppet::core::pinfile::PinFile;
//! use rispuppet::core::types::ModuleId;
//!
//! let mut file = PinFile::parse("ris_ext 'acme', 'widget', :ref => 'v1.0'\n");
//! let widget = ModuleId::new("acme/widget").unwrap();
//! file.set_module(&widget, Some("v2.0"));
//!
//! assert_eq!(file.pinned_ref(&widget), Some("v2.0"));
//! assert!(file.render().contains("ris_ext 'acme', 'widget', :ref => 'v2.0'"));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::types::ModuleId;

/// First line of every rendered pin file.
pub const HEADER: &str = "require File.join(File.dirname(__FILE__), 'ris_shortcuts')\n";

/// Option key used for pinned references.
pub const REF_KEY: &str = ":ref";

/// Errors from pin file I/O.
#[derive(Debug, Error)]
pub enum PinFileError {
    #[error("no pin file found at {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read pin file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write pin file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("pin file is not bound to a path")]
    Unbound,
}

/// A single `key => value` option of a declaration, kept in its textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinOption {
    pub key: String,
    pub value: Option<String>,
}

impl PinOption {
    fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("{} => {}", self.key, value),
            None => self.key.clone(),
        }
    }
}

/// One parsed declaration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub id: ModuleId,
    pub options: Vec<PinOption>,
}

/// Rendering sections, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Roles,
    Profiles,
    External,
    Modules,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Roles,
        Section::Profiles,
        Section::External,
        Section::Modules,
    ];

    /// The section a module identity is rendered under.
    ///
    /// Sections partition identities: namespaced modules always land in
    /// [`Section::External`], whatever their namespace looks like.
    pub fn of(id: &ModuleId) -> Self {
        let name = id.as_str();
        if id.is_external() {
            Section::External
        } else if name.starts_with("risrole_") {
            Section::Roles
        } else if name.starts_with("risprof_") {
            Section::Profiles
        } else {
            Section::Modules
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Roles => "RIS roles",
            Section::Profiles => "RIS profiles",
            Section::External => "External modules",
            Section::Modules => "RIS modules",
        }
    }
}

/// The pin file model: a mapping from module identity to its options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinFile {
    path: Option<PathBuf>,
    modules: BTreeMap<ModuleId, Vec<PinOption>>,
}

impl PinFile {
    /// Parse pin file text. Non-declaration lines are discarded.
    ///
    /// A later declaration for the same identity overwrites an earlier one.
    pub fn parse(text: &str) -> Self {
        let mut modules = BTreeMap::new();
        for decl in parse_declarations(text) {
            modules.insert(decl.id, decl.options);
        }
        Self {
            path: None,
            modules,
        }
    }

    /// Load and parse the pin file at `path`, binding the model to it.
    ///
    /// # Errors
    ///
    /// A missing or unreadable file is an error; it is never treated as empty.
    pub fn load(path: &Path) -> Result<Self, PinFileError> {
        if !path.is_file() {
            return Err(PinFileError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| PinFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = Self::parse(&text);
        file.path = Some(path.to_path_buf());
        debug!(path = %path.display(), modules = file.len(), "loaded pin file");
        Ok(file)
    }

    /// The path this model was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pin (or unpin, with `reference = None`) a module. Replaces any
    /// previous declaration and its options.
    pub fn set_module(&mut self, id: &ModuleId, reference: Option<&str>) -> &mut Self {
        let options = reference
            .map(|r| {
                vec![PinOption {
                    key: REF_KEY.to_string(),
                    value: Some(format!("'{r}'")),
                }]
            })
            .unwrap_or_default();
        self.modules.insert(id.clone(), options);
        self
    }

    /// [`PinFile::set_module`] for `namespace/name`.
    pub fn set_external_module(
        &mut self,
        namespace: &str,
        name: &str,
        reference: Option<&str>,
    ) -> Result<&mut Self, crate::core::types::TypeError> {
        let id = ModuleId::external(namespace, name)?;
        Ok(self.set_module(&id, reference))
    }

    /// Remove a module. No-op if absent.
    pub fn unset_module(&mut self, id: &ModuleId) -> &mut Self {
        self.modules.remove(id);
        self
    }

    /// [`PinFile::unset_module`] for `namespace/name`.
    pub fn unset_external_module(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Result<&mut Self, crate::core::types::TypeError> {
        let id = ModuleId::external(namespace, name)?;
        Ok(self.unset_module(&id))
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// The unquoted `:ref` value of a module, if pinned.
    pub fn pinned_ref(&self, id: &ModuleId) -> Option<&str> {
        self.modules
            .get(id)?
            .iter()
            .find(|opt| opt.key == REF_KEY)
            .and_then(|opt| opt.value.as_deref())
            .map(|v| v.trim_matches(|c| c == '\'' || c == '"'))
    }

    pub fn options(&self, id: &ModuleId) -> Option<&[PinOption]> {
        self.modules.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Declarations in identity order.
    pub fn declarations(&self) -> impl Iterator<Item = Declaration> + '_ {
        self.modules.iter().map(|(id, options)| Declaration {
            id: id.clone(),
            options: options.clone(),
        })
    }

    /// Render the file in its canonical sectioned layout.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for section in Section::ALL {
            let title = section.title();
            out.push_str(&format!("\n\n# {}\n# {}\n", title, "=".repeat(title.len())));
            let lines: Vec<String> = self
                .modules
                .iter()
                .filter(|(id, _)| Section::of(id) == section)
                .map(|(id, options)| render_declaration(id, options))
                .collect();
            out.push_str(&lines.join("\n"));
        }
        out.push('\n');
        out
    }

    /// Write [`PinFile::render`] to the bound path, overwriting it.
    pub fn store(&self) -> Result<(), PinFileError> {
        let path = self.path.as_ref().ok_or(PinFileError::Unbound)?;
        fs::write(path, self.render()).map_err(|source| PinFileError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), modules = self.len(), "stored pin file");
        Ok(())
    }
}

fn render_declaration(id: &ModuleId, options: &[PinOption]) -> String {
    let mut line = match id.namespace() {
        Some(ns) => format!("ris_ext '{}', '{}'", ns, id.name()),
        None => format!("ris_int '{}'", id.as_str()),
    };
    for option in options {
        line.push_str(", ");
        line.push_str(&option.render());
    }
    line
}

/// Scan text for declarations, in file order.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse a single declaration line.
fn parse_line(line: &str) -> Option<Declaration> {
    let rest = line
        .strip_prefix("ris_int")
        .or_else(|| line.strip_prefix("ris_ext"))?;

    // At least one whitespace between keyword and first name.
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return None;
    }

    let (first, mut rest) = quoted_name(trimmed)?;
    let mut id = first.to_string();

    if let Some(after_comma) = rest.strip_prefix(',') {
        if let Some((second, after)) = quoted_name(after_comma.trim_start()) {
            id.push('/');
            id.push_str(second);
            rest = after;
        }
    }

    let options = parse_options(rest)?;
    let id = ModuleId::new(id).ok()?;
    Some(Declaration { id, options })
}

/// Parse `'<name>'` at the start of `s`, returning the name and the remainder.
fn quoted_name(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_prefix('\'')?;
    let end = inner.find('\'')?;
    let name = &inner[..end];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((name, &inner[end + 1..]))
}

/// Parse the trailing `, key => value` list. Returns `None` when the
/// remainder is not an option list.
fn parse_options(rest: &str) -> Option<Vec<PinOption>> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Some(Vec::new());
    }
    let list = rest.strip_prefix(',')?;

    let options = split_unquoted(list, ',')
        .into_iter()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once("=>") {
            Some((key, value)) => PinOption {
                key: key.trim().to_string(),
                value: Some(value.trim().to_string()),
            },
            None => PinOption {
                key: segment.to_string(),
                value: None,
            },
        })
        .collect();
    Some(options)
}

/// Split on `sep` outside single or double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == sep => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
