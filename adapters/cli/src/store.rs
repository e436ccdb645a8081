use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use sushi_rush_system_scoring::{HighScoreStore, PersistenceError};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    high_score: i64,
}

/// Persists the high score as a small JSON document. A missing file reads as zero.
#[derive(Debug)]
pub(crate) struct JsonHighScore {
    path: PathBuf,
}

impl JsonHighScore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for JsonHighScore {
    fn load(&mut self) -> Result<i64, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(error.into()),
        };
        let record: Record = serde_json::from_str(&contents)
            .map_err(|error| PersistenceError::Malformed(error.to_string()))?;
        Ok(record.high_score)
    }

    fn save(&mut self, high_score: i64) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&Record { high_score })
            .map_err(|error| PersistenceError::Malformed(error.to_string()))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
