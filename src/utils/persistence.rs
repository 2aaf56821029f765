use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use super::ensure_dir;
use crate::errors::Result;

const TMP_SUFFIX: &str = "tmp";

/// Serializes `value` as pretty JSON and replaces `path` atomically by staging
/// to a sibling temporary file first.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads JSON from `path`, or `None` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&data)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn write_then_read_leaves_no_temp_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("data.json");
        let value = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        write_json_atomic(&path, &value).unwrap();

        let loaded: Option<BTreeMap<String, i32>> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(value));
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let temp = tempfile::tempdir().unwrap();
        let loaded: Option<Vec<u8>> = read_json(&temp.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }
}
