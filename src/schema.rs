//! The fixed schema registry.
//!
//! The application keeps ten logical domains as schemas within one physical
//! PostgreSQL database. The registry is a closed enum: a schema identifier
//! that does not exist here cannot be expressed in code, and string input
//! from a boundary fails with [`DbError::UnknownSchema`] before any pool
//! connection is touched. Renaming or removing a variant is a breaking
//! change for every caller.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A logical data domain, mapped 1:1 onto a PostgreSQL schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    /// Forum categories, threads and posts.
    Forums,
    /// Wiki pages, revisions and page metadata.
    Wiki,
    /// User profiles and account settings.
    Users,
    /// Credentials, sessions and tokens.
    Auth,
    /// Shared content blocks and templates.
    Content,
    /// File and media library.
    Library,
    /// Private messages and notifications.
    Messaging,
    /// Site settings and operational bookkeeping.
    System,
    /// Short-lived derived data; rebuildable at any time.
    Cache,
    /// Read-mostly archive imported from the previous platform.
    LegacyArchive,
}

impl Schema {
    /// Every schema in the registry, in declaration order.
    pub const ALL: [Schema; 10] = [
        Schema::Forums,
        Schema::Wiki,
        Schema::Users,
        Schema::Auth,
        Schema::Content,
        Schema::Library,
        Schema::Messaging,
        Schema::System,
        Schema::Cache,
        Schema::LegacyArchive,
    ];

    /// The schema name as it appears in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::Forums => "forums",
            Schema::Wiki => "wiki",
            Schema::Users => "users",
            Schema::Auth => "auth",
            Schema::Content => "content",
            Schema::Library => "library",
            Schema::Messaging => "messaging",
            Schema::System => "system",
            Schema::Cache => "cache",
            Schema::LegacyArchive => "legacy_archive",
        }
    }

    /// Statement that routes unqualified table names in subsequent queries on
    /// the same connection into this schema and nowhere else.
    pub fn search_path_stmt(&self) -> String {
        format!("SET search_path TO \"{}\"", self.as_str())
    }

    /// Transaction-scoped variant: the search_path reverts when the
    /// enclosing transaction commits or rolls back.
    pub fn set_local_stmt(&self) -> String {
        format!("SET LOCAL search_path TO \"{}\"", self.as_str())
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = DbError;

    /// Parse a schema name received from a boundary (config, wire, logs).
    /// Accepts the database spelling; `legacy-archive` is tolerated as an
    /// alias since the ops runbooks use the hyphenated form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forums" => Ok(Schema::Forums),
            "wiki" => Ok(Schema::Wiki),
            "users" => Ok(Schema::Users),
            "auth" => Ok(Schema::Auth),
            "content" => Ok(Schema::Content),
            "library" => Ok(Schema::Library),
            "messaging" => Ok(Schema::Messaging),
            "system" => Ok(Schema::System),
            "cache" => Ok(Schema::Cache),
            "legacy_archive" | "legacy-archive" => Ok(Schema::LegacyArchive),
            other => Err(DbError::unknown_schema(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_ten_entries() {
        assert_eq!(Schema::ALL.len(), 10);
    }

    #[test]
    fn test_round_trip_all_names() {
        for schema in Schema::ALL {
            let parsed: Schema = schema.as_str().parse().unwrap();
            assert_eq!(parsed, schema);
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "blog".parse::<Schema>().unwrap_err();
        assert!(matches!(err, DbError::UnknownSchema { name } if name == "blog"));
        assert!("".parse::<Schema>().is_err());
        assert!("Forums".parse::<Schema>().is_err());
    }

    #[test]
    fn test_legacy_archive_hyphen_alias() {
        assert_eq!(
            "legacy-archive".parse::<Schema>().unwrap(),
            Schema::LegacyArchive
        );
        assert_eq!(Schema::LegacyArchive.as_str(), "legacy_archive");
    }

    #[test]
    fn test_search_path_statements() {
        assert_eq!(
            Schema::Forums.search_path_stmt(),
            "SET search_path TO \"forums\""
        );
        assert_eq!(
            Schema::LegacyArchive.set_local_stmt(),
            "SET LOCAL search_path TO \"legacy_archive\""
        );
    }

    #[test]
    fn test_serde_names_match_database_spelling() {
        let json = serde_json::to_string(&Schema::LegacyArchive).unwrap();
        assert_eq!(json, "\"legacy_archive\"");
        let back: Schema = serde_json::from_str("\"cache\"").unwrap();
        assert_eq!(back, Schema::Cache);
    }
}
