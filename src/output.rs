//! Result persistence helpers.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{FitError, Result};
use crate::parameters::NestedParams;

/// Write `value` as pretty JSON with 4-space indentation.
pub fn dump_to_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value.serialize(&mut serializer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// First path that does not exist yet: `base`, then `base_0`, `base_1`, ...
pub fn next_free_folder(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (0..)
        .map(|i| base.with_file_name(format!("{}_{}", name, i)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| base.to_path_buf())
}

/// Initial parameters made of the `adjustable` entries of `defaults`.
///
/// Names are dotted paths; each must resolve to a leaf of `defaults`.
pub fn select_parameters<I, S>(adjustable: I, defaults: &NestedParams) -> Result<NestedParams>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut selected = NestedParams::new();
    for name in adjustable {
        let name = name.as_ref();
        let value = defaults
            .get_leaf(name)
            .ok_or_else(|| FitError::ParameterNotFound(name.to_string()))?;
        selected.insert(name, value.clone())?;
    }
    Ok(selected)
}
