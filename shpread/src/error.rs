//! Types d'erreurs pour le crate shpread

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'un shapefile
#[derive(Debug, Error)]
pub enum ShpError {
    /// Erreur d'I/O lors de la lecture des fichiers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive zip illisible
    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Erreur remontée par le décodeur shp/dbf
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Erreur remontée par le lecteur dBase
    #[error("DBF error: {0}")]
    Dbase(#[from] shapefile::dbase::Error),

    /// Fichier compagnon manquant (.shp, .dbf)
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Géométrie non convertible en `geo::Geometry`
    #[error("Invalid geometry for record {record}: {reason}")]
    InvalidGeometry { record: u64, reason: String },
}

impl ShpError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(record: u64, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            record,
            reason: reason.into(),
        }
    }
}
