//! Configuration de l'import

use std::path::PathBuf;

use crate::crs::Crs;
use crate::export::sqlite::DEFAULT_BATCH_SIZE;

/// Options d'import d'un shapefile
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Table cible (défaut: nom du fichier)
    pub table: Option<String>,

    /// Clé primaire; `Some` active l'upsert
    pub pk: Option<String>,

    /// Ajouter les colonnes manquantes à une table existante
    pub alter: bool,

    /// Stocker la géométrie via SpatiaLite
    pub spatialite: bool,

    /// Chemin explicite du module SpatiaLite (implique `spatialite`)
    pub spatialite_mod: Option<PathBuf>,

    /// CRS cible de la reprojection
    pub crs: Option<Crs>,

    /// Créer un index spatial (SpatiaLite uniquement)
    pub spatial_index: bool,

    /// Colonnes extraites vers des tables de correspondance
    pub extract_columns: Vec<String>,

    /// Lignes par transaction
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            table: None,
            pk: Some("id".to_string()),
            alter: false,
            spatialite: false,
            spatialite_mod: None,
            crs: None,
            spatial_index: false,
            extract_columns: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportOptions {
    /// SpatiaLite activé, explicitement ou via `spatialite_mod`
    pub fn use_spatialite(&self) -> bool {
        self.spatialite || self.spatialite_mod.is_some()
    }

    /// CRS vers lequel reprojeter, s'il y en a un
    pub fn target_crs(&self) -> Option<Crs> {
        match self.crs {
            Some(crs) => Some(crs),
            None if self.use_spatialite() => Some(Crs::WGS84),
            None => None,
        }
    }
}

/// Charge `.env` depuis le répertoire courant, sinon depuis celui de l'exécutable
pub fn load_env() {
    if dotenvy::dotenv().is_err() {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}
