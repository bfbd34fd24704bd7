//! Schema field injection
//!
//! Applies a manifest of field additions to a Prisma schema. Models are parsed
//! into field lists, so duplicate detection and anchor lookup work on field
//! names rather than text patterns, and formatting elsewhere is left alone.

mod parser;

pub use parser::{Field, Model, Placement, Schema};

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Schema line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid field addition: {0}")]
    InvalidAddition(String),
}

/// One field to add to a model
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FieldAddition {
    pub model: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub attributes: Option<String>,
    /// Field the new one goes in front of
    #[serde(default)]
    pub before: Option<String>,
}

impl FieldAddition {
    fn check(&self) -> Result<(), SchemaError> {
        if !parser::is_identifier(&self.name) {
            return Err(SchemaError::InvalidAddition(format!(
                "{}.{}: not a valid field name",
                self.model, self.name
            )));
        }
        if self.field_type.trim().is_empty() || self.field_type.contains(char::is_whitespace) {
            return Err(SchemaError::InvalidAddition(format!(
                "{}.{}: invalid type {:?}",
                self.model, self.name, self.field_type
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Manifest {
    pub fields: Vec<FieldAddition>,
}

impl Manifest {
    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(Placement),
    AlreadyPresent,
    ModelMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub model: String,
    pub field: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub entries: Vec<PatchEntry>,
}

impl PatchReport {
    pub fn added(&self) -> impl Iterator<Item = &PatchEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Added(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PatchEntry> {
        self.entries
            .iter()
            .filter(|e| !matches!(e.outcome, Outcome::Added(_)))
    }

    pub fn changed(&self) -> bool {
        self.added().next().is_some()
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let target = format!("{}.{}", entry.model, entry.field);
            match &entry.outcome {
                Outcome::Added(Placement::Before(anchor)) => {
                    writeln!(f, "  added    {} (before {})", target, anchor)?
                }
                Outcome::Added(Placement::Appended) => {
                    writeln!(f, "  added    {} (after last field)", target)?
                }
                Outcome::AlreadyPresent => writeln!(f, "  skipped  {} (already present)", target)?,
                Outcome::ModelMissing => {
                    writeln!(f, "  skipped  {} (model {} not found)", target, entry.model)?
                }
            }
        }
        write!(
            f,
            "{} added, {} skipped",
            self.added().count(),
            self.skipped().count()
        )
    }
}

/// Apply every addition in `manifest` to `schema`
pub fn apply(schema: &mut Schema, manifest: &Manifest) -> Result<PatchReport, SchemaError> {
    for addition in &manifest.fields {
        addition.check()?;
    }

    let mut report = PatchReport::default();
    for addition in &manifest.fields {
        let outcome = match schema.model_mut(&addition.model) {
            None => Outcome::ModelMissing,
            Some(model) if model.has_field(&addition.name) => Outcome::AlreadyPresent,
            Some(model) => Outcome::Added(model.insert_field(
                &addition.name,
                addition.field_type.trim(),
                addition.attributes.as_deref(),
                addition.before.as_deref(),
            )),
        };

        tracing::debug!(
            model = %addition.model,
            field = %addition.name,
            outcome = ?outcome,
            "Field addition"
        );
        report.entries.push(PatchEntry {
            model: addition.model.clone(),
            field: addition.name.clone(),
            outcome,
        });
    }
    Ok(report)
}

fn read(path: &Path) -> Result<String, SchemaError> {
    fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Patch the schema file at `schema_path` in place. With `dry_run` the file
/// is left untouched and only the report is produced.
pub fn patch_file(
    schema_path: &Path,
    manifest_path: &Path,
    dry_run: bool,
) -> Result<PatchReport, SchemaError> {
    let manifest = Manifest::from_json(&read(manifest_path)?)?;
    let mut schema = Schema::parse(&read(schema_path)?)?;

    let report = apply(&mut schema, &manifest)?;

    if report.changed() && !dry_run {
        fs::write(schema_path, schema.to_string()).map_err(|source| SchemaError::Io {
            path: schema_path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %schema_path.display(), "Schema updated");
    }
    Ok(report)
}
