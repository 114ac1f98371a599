//! Request-scoped caller context: office mode, locale, clock and ACL view.

use chrono::{DateTime, Utc};
use common::search_const::UNIVERSAL_READ;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    FrontOffice,
    BackOffice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadWorkspaces {
    All,
    Only(Vec<String>),
}

impl ReadWorkspaces {
    /// A list containing the `all` sentinel grants universal read access.
    pub fn from_list(list: Vec<String>) -> Self {
        if list.iter().any(|ws| ws == UNIVERSAL_READ) {
            ReadWorkspaces::All
        } else {
            ReadWorkspaces::Only(list)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub working_language: String,
    pub read_workspaces: ReadWorkspaces,
    pub write_workspaces: Vec<String>,
    pub can_write_contents: bool,
    pub can_write_dam: bool,
}

impl CurrentUser {
    pub fn can_write_workspace(&self, workspace: &str) -> bool {
        self.write_workspaces.iter().any(|ws| ws == workspace)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchContext {
    pub mode: SearchMode,
    pub locale: String,
    pub now: DateTime<Utc>,
    pub user: CurrentUser,
}

impl SearchContext {
    pub fn is_front_office(&self) -> bool {
        self.mode == SearchMode::FrontOffice
    }
}
