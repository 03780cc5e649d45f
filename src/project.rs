//! Persisted project state: the `package.json` version and the changelog
//!
//! Changelog sections are delimited by `<a name="{version}"></a>` markers so
//! a single release's notes can be cut out of one branch's changelog and
//! prepended to another's.

use crate::error::{Error, Result};
use crate::version::Version;
use chrono::NaiveDate;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Version descriptor file, relative to the project root
pub const PACKAGE_JSON_PATH: &str = "package.json";

/// Changelog file, relative to the project root
pub const CHANGELOG_PATH: &str = "CHANGELOG.md";

/// Read the `version` field of a `package.json`
pub fn read_package_version(package_json: &str) -> Result<Version> {
    let value: Value = serde_json::from_str(package_json)?;
    let version = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Version("package.json has no \"version\" field".to_string()))?;
    Version::parse(version)
}

/// Read the project version from disk
pub fn read_project_version(project_dir: &Path) -> Result<Version> {
    let content = fs::read_to_string(project_dir.join(PACKAGE_JSON_PATH))?;
    read_package_version(&content)
}

/// Rewrite the `version` field of the project's `package.json`.
///
/// The file is written to a sibling temp file and renamed over the original,
/// so readers never observe a half-written descriptor.
pub fn update_project_version(project_dir: &Path, version: &Version) -> Result<()> {
    let path = project_dir.join(PACKAGE_JSON_PATH);
    let content = fs::read_to_string(&path)?;
    let mut value: Value = serde_json::from_str(&content)?;

    let object = value
        .as_object_mut()
        .ok_or_else(|| Error::Version("package.json is not a JSON object".to_string()))?;
    object.insert("version".to_string(), Value::String(version.to_string()));

    let mut serialized = serde_json::to_string_pretty(&value)?;
    serialized.push('\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serialized)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

/// Marker that opens the changelog section of a version
pub fn section_marker(version: &Version) -> String {
    format!("<a name=\"{version}\"></a>")
}

/// Render a new changelog section
pub fn render_changelog_section(version: &Version, date: NaiveDate, notes: &str) -> String {
    let notes = notes.trim();
    let mut section = format!(
        "{}\n# {version} ({})\n",
        section_marker(version),
        date.format("%Y-%m-%d")
    );
    if !notes.is_empty() {
        section.push('\n');
        section.push_str(notes);
        section.push('\n');
    }
    section
}

/// Prepend a section to the changelog, replacing an existing section for
/// the same version
pub fn prepend_changelog_section(project_dir: &Path, version: &Version, section: &str) -> Result<()> {
    let path = project_dir.join(CHANGELOG_PATH);
    let existing = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let remaining = remove_section(&existing, version);
    let mut content = section.trim_end().to_string();
    content.push_str("\n\n");
    content.push_str(remaining.trim_start());
    if !content.ends_with('\n') {
        content.push('\n');
    }

    fs::write(&path, content)?;
    Ok(())
}

/// Cut the section of a version out of changelog text
pub fn extract_changelog_section(changelog: &str, version: &Version) -> Option<String> {
    let marker = section_marker(version);
    let start = changelog.find(&marker)?;
    let body = &changelog[start + marker.len()..];
    let end = body.find("<a name=\"").unwrap_or(body.len());
    Some(format!("{marker}{}", &body[..end]).trim_end().to_string())
}

/// Read the section of a version from the project's changelog
pub fn read_changelog_section(project_dir: &Path, version: &Version) -> Result<Option<String>> {
    let path = project_dir.join(CHANGELOG_PATH);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(extract_changelog_section(&content, version))
}

fn remove_section(changelog: &str, version: &Version) -> String {
    match extract_changelog_section(changelog, version) {
        Some(section) => changelog.replacen(&section, "", 1),
        None => changelog.to_string(),
    }
}
