use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    errors::{LedgerError, Result},
    ledger::{ledger::CURRENT_SCHEMA_VERSION, Transaction},
    utils::{
        app_data_dir, ensure_dir,
        persistence::{read_json, write_json_atomic},
    },
};

use super::{TransactionStore, WriteBatch};

const LEDGERS_DIR: &str = "ledgers";

/// One pretty-printed JSON file per owner under `root`.
///
/// A batch is applied to the loaded records in memory and the whole file is
/// replaced through a temporary sibling, so readers see either the old or the
/// new contents.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct OwnerFile {
    schema_version: u8,
    owner_id: String,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    /// Store rooted at `<app data dir>/ledgers`.
    pub fn open_default() -> Result<Self> {
        Self::new(app_data_dir().join(LEDGERS_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn owner_path(&self, owner_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", canonical_name(owner_id)))
    }

    fn read_owner(&self, owner_id: &str) -> Result<Vec<Transaction>> {
        let path = self.owner_path(owner_id);
        let Some(file) = read_json::<OwnerFile>(&path)? else {
            return Ok(Vec::new());
        };
        if file.owner_id != owner_id {
            return Err(LedgerError::Validation(format!(
                "`{}` belongs to owner `{}`",
                path.display(),
                file.owner_id
            )));
        }
        if file.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(LedgerError::Validation(format!(
                "`{}` is from a newer schema version ({})",
                path.display(),
                file.schema_version
            )));
        }
        Ok(file.transactions)
    }
}

impl TransactionStore for JsonStore {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, owner_id: &str) -> Result<Vec<Transaction>> {
        self.read_owner(owner_id)
    }

    fn apply(&self, owner_id: &str, batch: &WriteBatch) -> Result<()> {
        let mut records = self.read_owner(owner_id)?;
        batch.check_against(&records)?;
        batch.apply_to(&mut records);
        let file = OwnerFile {
            schema_version: CURRENT_SCHEMA_VERSION,
            owner_id: owner_id.to_string(),
            transactions: records,
        };
        write_json_atomic(&self.owner_path(owner_id), &file)
    }
}

fn canonical_name(owner_id: &str) -> String {
    let sanitized: String = owner_id
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "owner".into()
    } else {
        sanitized
    }
}
