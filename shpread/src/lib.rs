//! # shpread
//!
//! Lecture en streaming de shapefiles ESRI (.shp + .dbf + .prj + .cpg), à plat ou zippés.
//!
//! ## Features
//!
//! - Décodage shp/dbf délégué au crate `shapefile`
//! - Support des archives `.zip` (lues en mémoire)
//! - Page de code DBF lue dans le `.cpg` ou l'en-tête (Latin-1 par défaut)
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//! - Attributs typés (`Value`) dans l'ordre de déclaration DBF
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shpread::open;
//! use std::path::Path;
//!
//! let mut dataset = open(Path::new("communes.zip"))?;
//! println!("Layer: {}", dataset.name());
//!
//! for feature in dataset.features() {
//!     let feature = feature?;
//!     println!("{}: {:?}", feature.id, feature.properties);
//! }
//! ```

pub mod archive;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod types;

pub use dataset::Dataset;
pub use error::ShpError;
pub use types::{Feature, SourceCrs, Value};

use std::path::Path;

/// Extrait le nom du jeu de données depuis le chemin
/// `communes.shp` → `communes`, `communes.zip` → `communes`, `communes.shp.zip` → `communes`
pub fn dataset_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let base = stem
        .strip_suffix(".shp")
        .or_else(|| stem.strip_suffix(".SHP"))
        .unwrap_or(stem);

    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Vrai si le chemin désigne une archive zip
pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"))
}

/// Ouvre un shapefile (`.shp`) ou une archive (`.zip`) contenant un shapefile.
///
/// # Errors
///
/// Retourne `ShpError` si un fichier obligatoire manque ou si l'en-tête
/// SHP/DBF est illisible.
pub fn open(path: &Path) -> Result<Dataset, ShpError> {
    if is_zip(path) {
        dataset::open_zip(path)
    } else {
        dataset::open_shp(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_name() {
        assert_eq!(
            dataset_name(Path::new("/data/features.shp")),
            Some("features".to_string())
        );
        assert_eq!(
            dataset_name(Path::new("communes.zip")),
            Some("communes".to_string())
        );
        assert_eq!(
            dataset_name(Path::new("communes.shp.zip")),
            Some("communes".to_string())
        );
        assert_eq!(dataset_name(Path::new("/")), None);
    }

    #[test]
    fn test_is_zip() {
        assert!(is_zip(Path::new("a.zip")));
        assert!(is_zip(Path::new("A.ZIP")));
        assert!(!is_zip(Path::new("a.shp")));
        assert!(!is_zip(Path::new("zip")));
    }
}
