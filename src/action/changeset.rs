use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::Action;
use crate::error::EngineError;

/// Apply direction for a migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// Ordered list of actions, the payload of one direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A legacy numeric change set: ordered actions targeting one version.
///
/// This is the on-disk shape of `db_scheme/{version}.yaml` files and the
/// input to the legacy `DatabaseManager` path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<u32>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ChangeSet {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        load_yaml(path)
    }
}

/// On-disk migration file: either an `up`/`down` split or, for older
/// single-direction files, a flat `actions` list treated as `up`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<ActionList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<ActionList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
}

impl MigrationFile {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let file: MigrationFile = load_yaml(path)?;
        if file.up.is_none() && file.actions.is_none() {
            return Err(EngineError::MigrationFile {
                path: path.display().to_string(),
                message: "file defines neither `up` nor `actions`".to_string(),
            });
        }
        Ok(file)
    }

    /// Up actions, falling back to the flat `actions` key for
    /// single-direction files.
    pub fn up_actions(&self) -> &[Action] {
        if let Some(up) = &self.up {
            &up.actions
        } else if let Some(actions) = &self.actions {
            actions
        } else {
            &[]
        }
    }

    /// Down actions, if the file declares any.
    pub fn down_actions(&self) -> Option<&[Action]> {
        self.down.as_ref().map(|list| list.actions.as_slice())
    }

    pub fn actions_for(&self, direction: Direction) -> Option<&[Action]> {
        match direction {
            Direction::Up => Some(self.up_actions()),
            Direction::Down => self.down_actions(),
        }
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::MigrationFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| EngineError::MigrationFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
