//! Extension SpatiaLite: chargement, métadonnées et colonne géométrique

use std::path::{Path, PathBuf};

use rusqlite::LoadExtensionGuard;
use tracing::{debug, info};

use super::error::DbError;
use super::sqlite::{quote, Database};

/// Emplacements usuels de `mod_spatialite`
pub const SPATIALITE_PATHS: &[&str] = &[
    "/usr/lib/x86_64-linux-gnu/mod_spatialite.so",
    "/usr/lib/aarch64-linux-gnu/mod_spatialite.so",
    "/usr/local/lib/mod_spatialite.dylib",
    "/usr/local/lib/mod_spatialite.so",
    "/opt/homebrew/lib/mod_spatialite.dylib",
];

/// Variable d'environnement prioritaire sur les emplacements usuels
pub const SPATIALITE_ENV: &str = "SPATIALITE_LIBRARY_PATH";

/// Cherche le module SpatiaLite
pub fn find_spatialite() -> Option<PathBuf> {
    let from_env = std::env::var_os(SPATIALITE_ENV).map(PathBuf::from);

    from_env
        .into_iter()
        .chain(SPATIALITE_PATHS.iter().map(PathBuf::from))
        .find(|path| path.exists())
}

/// Module à charger: le chemin explicite tel quel, sinon `find_spatialite`.
///
/// Un nom nu (`mod_spatialite`) est passé à SQLite, qui le cherche dans les
/// répertoires du chargeur dynamique.
pub fn resolve_spatialite(explicit: Option<&Path>) -> Result<PathBuf, DbError> {
    match explicit {
        Some(lib) => Ok(lib.to_path_buf()),
        None => find_spatialite().ok_or(DbError::SpatialiteNotFound),
    }
}

/// Vrai si SpatiaLite est déjà chargé sur cette connexion
pub fn is_loaded(db: &Database) -> bool {
    db.connection()
        .query_row("SELECT spatialite_version()", [], |row| row.get::<_, String>(0))
        .is_ok()
}

/// Charge SpatiaLite et initialise les métadonnées spatiales si besoin
///
/// Un module introuvable remonte en `DbError::Sqlite` (message du chargeur).
pub fn init_spatialite(db: &Database, lib: &Path) -> Result<(), DbError> {
    let conn = db.connection();
    if is_loaded(db) {
        debug!("SpatiaLite already loaded");
    } else {
        // SAFETY: la bibliothèque chargée est le module SpatiaLite choisi par l'utilisateur
        unsafe {
            let _guard = LoadExtensionGuard::new(conn)?;
            conn.load_extension(lib, None)?;
        }
        info!(path = %lib.display(), "Loaded SpatiaLite");
    }

    if db.table_exists("spatial_ref_sys")? {
        debug!("Spatial metadata already initialized");
        return Ok(());
    }

    let ok: i64 = conn.query_row("SELECT InitSpatialMetadata(1)", [], |row| row.get(0))?;
    if ok == 0 {
        return Err(DbError::spatial_function("InitSpatialMetadata", "spatial_ref_sys"));
    }
    info!("Initialized spatial metadata");
    Ok(())
}

/// Ajoute la colonne `geometry` à la table si elle n'existe pas
pub fn ensure_table_has_geometry(db: &Database, table: &str, srid: u32) -> Result<(), DbError> {
    let has_geometry = db
        .columns(table)?
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case("geometry"));
    if has_geometry {
        return Ok(());
    }

    let ok: i64 = db.connection().query_row(
        "SELECT AddGeometryColumn(?1, 'geometry', ?2, 'GEOMETRY', 2)",
        rusqlite::params![table, srid],
        |row| row.get(0),
    )?;
    if ok == 0 {
        return Err(DbError::spatial_function("AddGeometryColumn", table));
    }

    info!(table = table, srid = srid, "Added geometry column");
    Ok(())
}

/// Nom de la table virtuelle de l'index spatial
pub fn spatial_index_name(table: &str) -> String {
    format!("idx_{}_geometry", table)
}

/// Crée l'index spatial sur `geometry` s'il n'existe pas
pub fn create_spatial_index(db: &Database, table: &str) -> Result<bool, DbError> {
    if db.table_exists(&spatial_index_name(table))? {
        debug!(table = table, "Spatial index already exists");
        return Ok(false);
    }

    let ok: i64 = db.connection().query_row(
        "SELECT CreateSpatialIndex(?1, 'geometry')",
        [table],
        |row| row.get(0),
    )?;
    if ok == 0 {
        return Err(DbError::spatial_function("CreateSpatialIndex", table));
    }

    info!(table = table, index = %quote(&spatial_index_name(table)), "Created spatial index");
    Ok(true)
}
