//! Erreurs de la couche SQLite / SpatiaLite

use thiserror::Error;

/// Erreurs pouvant survenir lors de l'écriture en base
#[derive(Debug, Error)]
pub enum DbError {
    /// Erreur remontée par SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Module SpatiaLite introuvable
    #[error("Could not find SpatiaLite module")]
    SpatialiteNotFound,

    /// Fonction SpatiaLite ayant retourné un échec (0)
    #[error("SpatiaLite {function}() failed for table {table}")]
    SpatialFunction { function: String, table: String },

    /// Colonne absente de la table et `alter` désactivé
    #[error("Table {table} has no column named {column} (enable alter to add missing columns)")]
    UnknownColumn { table: String, column: String },

    /// Clé primaire absente des colonnes
    #[error("Primary key column {column} not found in rows for table {table}")]
    InvalidPrimaryKey { table: String, column: String },

    /// Ligne sans valeur pour la clé primaire (upsert impossible)
    #[error("Row has no value for primary key {column} in table {table}")]
    MissingPrimaryKey { table: String, column: String },
}

impl DbError {
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn spatial_function(function: impl Into<String>, table: impl Into<String>) -> Self {
        Self::SpatialFunction {
            function: function.into(),
            table: table.into(),
        }
    }
}
