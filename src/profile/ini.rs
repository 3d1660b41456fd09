//! Section-based `key = value` documents, the on-disk form of a profile.
//!
//! ```text
//! [DEFAULT]
//! name = Default
//! version = 2.0
//!
//! [m1]
//! backlight_color = 255,0,0
//! keys_g1_name = Greeting
//! keys_g1_macro = line one
//!     line two
//! ```
//!
//! Option names are case-insensitive and stored lowercased. A value
//! continues onto following lines that start with whitespace; on write,
//! every embedded newline is followed by a tab. Lines starting with `#` or
//! `;` are comments. Entry order is preserved so an unchanged profile
//! rewrites to the same text.

use std::fmt::{self, Write as _};
use std::path::Path;

use thiserror::Error;

use crate::error::GkError;

/// Name of the section holding profile metadata.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A syntax error, with the 1-based line it was found on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }

    /// Attach the file this error came from.
    pub fn at(self, path: &Path) -> GkError {
        GkError::CorruptProfileStore {
            path: path.to_path_buf(),
            line: self.line,
            reason: self.reason,
        }
    }
}

/// Ordered option entries of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: Vec<(String, String)>,
}

impl Section {
    /// Value of an option.
    pub fn get(&self, option: &str) -> Option<&str> {
        let option = option.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == option)
            .map(|(_, v)| v.as_str())
    }

    /// Whether an option is present.
    pub fn contains(&self, option: &str) -> bool {
        self.get(option).is_some()
    }

    /// Set an option, replacing in place if it exists, else appending.
    pub fn set(&mut self, option: &str, value: impl Into<String>) {
        let option = option.to_ascii_lowercase();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == option) {
            entry.1 = value;
        } else {
            self.entries.push((option, value));
        }
    }

    /// Remove an option, returning its value.
    pub fn remove(&mut self, option: &str) -> Option<String> {
        let option = option.to_ascii_lowercase();
        let pos = self.entries.iter().position(|(k, _)| *k == option)?;
        Some(self.entries.remove(pos).1)
    }

    /// Option names in file order.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Boolean option, accepting `1/yes/true/on` and `0/no/false/off`.
    pub fn get_bool(&self, option: &str) -> Option<bool> {
        match self.get(option)?.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Some(true),
            "0" | "no" | "false" | "off" => Some(false),
            _ => None,
        }
    }
}

/// A parsed document: the `DEFAULT` section plus named sections in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    defaults: Section,
    sections: Vec<(String, Section)>,
}

impl IniDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        // Index into `sections`, or None for DEFAULT
        let mut current: Option<Option<usize>> = None;
        let mut last_option: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;

            let indented = raw.starts_with([' ', '\t']);
            if let (true, Some(section), Some(option)) = (indented, current, last_option.as_deref())
            {
                let rest = raw.strip_prefix('\t').unwrap_or_else(|| raw.trim_start());
                let target = doc.section_at_mut(section);
                let mut value = target.get(option).unwrap_or_default().to_string();
                value.push('\n');
                value.push_str(rest);
                target.set(option, value);
                continue;
            }
            if raw.trim().is_empty() {
                last_option = None;
                continue;
            }
            if raw.starts_with(['#', ';']) {
                continue;
            }
            if indented {
                return Err(ParseError::new(lineno, "continuation line without an option"));
            }

            let line = raw.trim_end();
            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| ParseError::new(lineno, format!("bad section header '{line}'")))?;
                current = Some(if name == DEFAULT_SECTION {
                    None
                } else {
                    Some(doc.ensure_section(name))
                });
                last_option = None;
                continue;
            }

            let Some(section) = current else {
                return Err(ParseError::new(lineno, "entry before any section header"));
            };
            let split = raw
                .find(['=', ':'])
                .ok_or_else(|| ParseError::new(lineno, format!("expected 'option = value', got '{line}'")))?;
            let option = raw[..split].trim();
            if option.is_empty() {
                return Err(ParseError::new(lineno, "empty option name"));
            }
            // Only the space written after the separator is dropped
            let value = &raw[split + 1..];
            let value = value.strip_prefix(' ').unwrap_or(value);
            doc.section_at_mut(section).set(option, value);
            last_option = Some(option.to_ascii_lowercase());
        }

        Ok(doc)
    }

    /// Parse, mapping syntax errors to [`GkError::CorruptProfileStore`].
    pub fn parse_file_contents(text: &str, path: &Path) -> crate::error::Result<Self> {
        Self::parse(text).map_err(|e| e.at(path))
    }

    fn section_at_mut(&mut self, index: Option<usize>) -> &mut Section {
        match index {
            None => &mut self.defaults,
            Some(i) => &mut self.sections[i].1,
        }
    }

    fn ensure_section(&mut self, name: &str) -> usize {
        if let Some(i) = self.sections.iter().position(|(n, _)| n == name) {
            return i;
        }
        self.sections.push((name.to_string(), Section::default()));
        self.sections.len() - 1
    }

    /// The `DEFAULT` section.
    pub const fn defaults(&self) -> &Section {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut Section {
        &mut self.defaults
    }

    /// A named section, if present.
    pub fn section(&self, name: &str) -> Option<&Section> {
        if name == DEFAULT_SECTION {
            return Some(&self.defaults);
        }
        self.sections.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// A named section, created empty if missing.
    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        if name == DEFAULT_SECTION {
            return &mut self.defaults;
        }
        let i = self.ensure_section(name);
        &mut self.sections[i].1
    }

    /// Names of the non-default sections, in order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(n, _)| n.as_str())
    }
}

fn write_section(out: &mut String, name: &str, section: &Section) -> fmt::Result {
    writeln!(out, "[{name}]")?;
    for (option, value) in section.iter() {
        writeln!(out, "{option} = {}", value.replace('\n', "\n\t"))?;
    }
    writeln!(out)
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if !self.defaults.is_empty() {
            write_section(&mut out, DEFAULT_SECTION, &self.defaults)?;
        }
        for (name, section) in &self.sections {
            write_section(&mut out, name, section)?;
        }
        f.write_str(&out)
    }
}
