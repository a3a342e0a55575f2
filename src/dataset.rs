//! Reference energy tables.
//!
//! A table is a CSV file with a `tag` column, a `reference_energy` column and
//! exactly one of:
//!
//! - `path`: configuration files used as given (absolute, or relative to the
//!   current working directory)
//! - `file`: configuration files relative to the directory holding the CSV

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FitError, Result};

/// One row of a reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecord {
    pub configuration: PathBuf,
    pub tag: String,
    pub reference_energy: f64,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    file: Option<PathBuf>,
    tag: String,
    reference_energy: f64,
}

enum Location {
    Verbatim,
    RelativeTo(PathBuf),
}

/// Read a reference table into records, in file order.
pub fn read_energy_table(csv_path: &Path) -> Result<Vec<EnergyRecord>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    let has = |name: &str| headers.iter().any(|h| h == name);

    for required in ["tag", "reference_energy"] {
        if !has(required) {
            return Err(FitError::Dataset(format!(
                "{}: missing column '{}'",
                csv_path.display(),
                required
            )));
        }
    }

    let location = match (has("path"), has("file")) {
        (true, false) => Location::Verbatim,
        (false, true) => {
            let parent = csv_path.parent().unwrap_or_else(|| Path::new("."));
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            Location::RelativeTo(parent.canonicalize()?)
        }
        (true, true) => {
            return Err(FitError::Dataset(format!(
                "{}: columns 'path' and 'file' are mutually exclusive",
                csv_path.display()
            )))
        }
        (false, false) => {
            return Err(FitError::Dataset(format!(
                "{}: expected a 'path' or a 'file' column",
                csv_path.display()
            )))
        }
    };

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: Row = row?;
        let configuration = match &location {
            Location::Verbatim => row.path,
            Location::RelativeTo(base) => row.file.map(|f| base.join(f)),
        }
        .ok_or_else(|| {
            FitError::Dataset(format!(
                "{}: empty configuration entry for tag '{}'",
                csv_path.display(),
                row.tag
            ))
        })?;

        records.push(EnergyRecord {
            configuration,
            tag: row.tag,
            reference_energy: row.reference_energy,
        });
    }

    debug!(path = %csv_path.display(), records = records.len(), "Read reference table");
    Ok(records)
}
