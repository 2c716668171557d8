use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use super::error::*;

pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let filepath = filepath.as_ref();

    if let Some(dir) = filepath.parent() {
        fs::create_dir_all(dir).map_err(|e| Error::new(ActionKind::CreateDir, dir, e))?
    }
    fs::write(filepath, contents).map_err(|e| Error::new(ActionKind::WriteFile, filepath, e))
}

pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    let filepath = filepath.as_ref();
    fs::read_to_string(filepath).map_err(|e| Error::new(ActionKind::ReadFile, filepath, e))
}

pub fn write_json_with_mkdir<T>(filepath: impl AsRef<Path>, data: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let filepath = filepath.as_ref();
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::new(ActionKind::SerializeToJson, filepath, e))?;
    write_with_mkdir(filepath, json)
}

pub fn read_json<T: DeserializeOwned>(filepath: impl AsRef<Path>) -> Result<T> {
    let filepath = filepath.as_ref();
    let json = read_to_string(filepath)?;
    serde_json::from_str(&json)
        .map_err(|e| Error::new(ActionKind::DeserializeFromJson, filepath, e))
}

/// File names (not paths) of the regular files directly inside `dir`.
pub fn list_filenames(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| Error::new(ActionKind::ReadDir, dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::new(ActionKind::ReadDir, dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}
