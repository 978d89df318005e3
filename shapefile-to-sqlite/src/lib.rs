//! # shapefile-to-sqlite
//!
//! Import de shapefiles (`.shp` ou archive `.zip`) dans une base SQLite,
//! avec stockage SpatiaLite optionnel.
//!
//! ## Features
//!
//! - Une table par shapefile: `id`, `geometry` puis les attributs DBF
//! - Géométrie en GeoJSON, ou colonne SpatiaLite avec index spatial
//! - Reprojection via PROJ (feature `reproject`)
//! - Upsert sur clé primaire, ajout de colonnes (`--alter`)
//! - Extraction de colonnes vers des tables de correspondance
//!
//! ## Usage CLI
//!
//! ```bash
//! shapefile-to-sqlite places.db ./features.shp
//! shapefile-to-sqlite places.db ./features.zip --table countries -c slug
//! shapefile-to-sqlite places.db ./features.shp --spatialite --crs epsg:2227 --spatial-index
//! ```

pub mod cli;
pub mod config;
pub mod crs;
pub mod export;
pub mod import;
pub mod report;

pub use config::ImportOptions;
pub use crs::Crs;
pub use export::{Database, DbError};
pub use import::{import_features, import_path, ImportSummary};
pub use report::{ImportReport, ImportStatus};
