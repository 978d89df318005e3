//! Modules d'export (SQLite, SpatiaLite)

pub mod error;
pub mod geometry;
pub mod reproject;
pub mod spatialite;
pub mod sqlite;

pub use error::DbError;
pub use geometry::GeometryEncoding;
pub use reproject::Reprojector;
pub use sqlite::{Database, InsertOptions, Row};
