//! In-place patching of the PHPUnit configuration shipped with the host application.
//!
//! The rewrite streams the document event by event, so comments, ordering, and
//! formatting of everything not touched survive unchanged.

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::path::Path;

pub const BASE_URL_ENV: &str = "SIMPLETEST_BASE_URL";
pub const DB_ENV: &str = "SIMPLETEST_DB";
pub const DEPRECATIONS_HELPER_ENV: &str = "SYMFONY_DEPRECATIONS_HELPER";
pub const SQLITE_DB_URL: &str = "sqlite://localhost/sites/default/files/.ht.sqlite";
const DEPRECATIONS_HELPER_DISABLED: &str = "false";

const PHPUNIT_TAG: &[u8] = b"phpunit";
const PHP_TAG: &[u8] = b"php";
const ENV_TAG: &[u8] = b"env";
const INDENT_STEP: &str = "  ";

/// Values written into the `<php>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpUnitSettings {
    base_url: String,
    database_url: String,
}

impl PhpUnitSettings {
    /// Points the functional tests at the web server on `address` and a local SQLite database.
    pub fn for_address(address: &str) -> Self {
        Self {
            base_url: format!("http://{address}"),
            database_url: SQLITE_DB_URL.to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

struct EnvPatch<'s> {
    name: &'static str,
    value: &'s str,
    overwrite: bool,
    seen: bool,
}

impl<'s> EnvPatch<'s> {
    fn set(name: &'static str, value: &'s str) -> Self {
        Self {
            name,
            value,
            overwrite: true,
            seen: false,
        }
    }

    fn add_if_missing(name: &'static str, value: &'s str) -> Self {
        Self {
            name,
            value,
            overwrite: false,
            seen: false,
        }
    }
}

/// Rewrites the PHPUnit configuration file at `path` in place.
pub async fn ensure_phpunit_config(path: &Path, settings: &PhpUnitSettings) -> Result<()> {
    let original = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let patched = patch_phpunit_config(&original, settings)
        .with_context(|| format!("failed to patch {}", path.display()))?;

    if patched == original {
        tracing::debug!(target: "orca::phpunit", path = %path.display(), "configuration already current");
        return Ok(());
    }

    tokio::fs::write(path, patched)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(target: "orca::phpunit", path = %path.display(), "configuration patched");
    Ok(())
}

/// Returns `xml` with the `phpunit/php/env` settings applied.
///
/// The base URL and database settings are overwritten (or appended when missing). The
/// deprecation helper toggle is only appended when absent, so repeated patches are stable.
pub fn patch_phpunit_config(xml: &str, settings: &PhpUnitSettings) -> Result<String> {
    let mut patches = [
        EnvPatch::set(BASE_URL_ENV, settings.base_url()),
        EnvPatch::set(DB_ENV, settings.database_url()),
        EnvPatch::add_if_missing(DEPRECATIONS_HELPER_ENV, DEPRECATIONS_HELPER_DISABLED),
    ];

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut php_sections = 0usize;
    // Whitespace inside <php> is held back so appended elements land before the closing tag.
    let mut pending_whitespace: Option<BytesText<'_>> = None;
    let mut child_indent: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("malformed XML near byte {}", reader.buffer_position()))?;
        let in_php = in_php_section(&path);

        match event {
            Event::Eof => break,
            Event::Text(text) if in_php && is_whitespace(&text) => {
                if let Some(previous) = pending_whitespace.take() {
                    writer.write_event(Event::Text(previous))?;
                }
                pending_whitespace = Some(text);
            }
            Event::End(end) if in_php && end.name().as_ref() == PHP_TAG => {
                let indent = child_indent
                    .clone()
                    .or_else(|| pending_whitespace.as_ref().and_then(nested_indent));
                append_missing(&mut writer, &mut patches, indent.as_deref())?;
                if let Some(whitespace) = pending_whitespace.take() {
                    writer.write_event(Event::Text(whitespace))?;
                }
                writer.write_event(Event::End(end))?;
                path.pop();
                php_sections += 1;
            }
            other => {
                if let Some(whitespace) = pending_whitespace.take() {
                    if in_php && child_indent.is_none() {
                        child_indent = Some(String::from_utf8_lossy(&whitespace).into_owned());
                    }
                    writer.write_event(Event::Text(whitespace))?;
                }

                match other {
                    Event::Start(start) => {
                        let start = patch_env(start, in_php, &mut patches)?;
                        path.push(start.name().as_ref().to_vec());
                        writer.write_event(Event::Start(start))?;
                    }
                    Event::Empty(empty) if is_php_section(&path, &empty) => {
                        let end = empty.to_end().into_owned();
                        writer.write_event(Event::Start(empty))?;
                        append_missing(&mut writer, &mut patches, None)?;
                        writer.write_event(Event::End(end))?;
                        php_sections += 1;
                    }
                    Event::Empty(empty) => {
                        let empty = patch_env(empty, in_php, &mut patches)?;
                        writer.write_event(Event::Empty(empty))?;
                    }
                    Event::End(end) => {
                        path.pop();
                        writer.write_event(Event::End(end))?;
                    }
                    passthrough => writer.write_event(passthrough)?,
                }
            }
        }
    }

    if php_sections == 0 {
        bail!("no <phpunit><php> section to configure");
    }

    String::from_utf8(writer.into_inner()).context("patched configuration is not valid UTF-8")
}

fn in_php_section(path: &[Vec<u8>]) -> bool {
    matches!(
        path,
        [.., parent, current] if parent.as_slice() == PHPUNIT_TAG && current.as_slice() == PHP_TAG
    )
}

fn is_php_section(path: &[Vec<u8>], element: &BytesStart<'_>) -> bool {
    element.name().as_ref() == PHP_TAG
        && path.last().map(Vec::as_slice) == Some(PHPUNIT_TAG)
}

/// One indent step deeper than the whitespace before a closing tag.
fn nested_indent(closing: &BytesText<'_>) -> Option<String> {
    let closing = String::from_utf8_lossy(closing);
    closing
        .contains('\n')
        .then(|| format!("{closing}{INDENT_STEP}"))
}

fn is_whitespace(text: &BytesText<'_>) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn patch_env<'a>(
    element: BytesStart<'a>,
    in_php: bool,
    patches: &mut [EnvPatch<'_>],
) -> Result<BytesStart<'a>> {
    if !in_php || element.name().as_ref() != ENV_TAG {
        return Ok(element);
    }
    let name = element
        .try_get_attribute("name")?
        .map(|attribute| attribute.unescape_value().map(Cow::into_owned))
        .transpose()?;
    let Some(name) = name else {
        return Ok(element);
    };
    let Some(patch) = patches.iter_mut().find(|patch| patch.name == name) else {
        return Ok(element);
    };
    if patch.seen {
        return Ok(element);
    }
    patch.seen = true;
    if !patch.overwrite {
        return Ok(element);
    }
    with_value(&element, patch.value)
}

fn with_value(element: &BytesStart<'_>, value: &str) -> Result<BytesStart<'static>> {
    let mut patched = element.clone().into_owned();
    patched.clear_attributes();
    let mut replaced = false;
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == b"value" {
            patched.push_attribute(("value", value));
            replaced = true;
        } else {
            patched.push_attribute(attribute);
        }
    }
    if !replaced {
        patched.push_attribute(("value", value));
    }
    Ok(patched)
}

fn append_missing(
    writer: &mut Writer<Vec<u8>>,
    patches: &mut [EnvPatch<'_>],
    indent: Option<&str>,
) -> Result<()> {
    for patch in patches.iter_mut().filter(|patch| !patch.seen) {
        if let Some(indent) = indent {
            writer.write_event(Event::Text(BytesText::from_escaped(indent)))?;
        }
        let mut element = BytesStart::new("env");
        element.push_attribute(("name", patch.name));
        element.push_attribute(("value", patch.value));
        writer.write_event(Event::Empty(element))?;
        patch.seen = true;
    }
    Ok(())
}
