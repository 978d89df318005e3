//! Import d'un jeu de features dans une table SQLite
//!
//! Chaque feature devient une ligne `id`, `geometry`, puis ses attributs.
//! Sans SpatiaLite la géométrie est stockée en GeoJSON; avec SpatiaLite elle
//! passe par `GeomFromText(?, srid)` dans une colonne géométrique.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use shpread::{Feature, ShpError, SourceCrs, Value};
use tracing::{debug, info, warn};

use crate::config::ImportOptions;
use crate::crs::Crs;
use crate::export::sqlite::{Database, InsertOptions, Row, SAMPLE_SIZE};
use crate::export::{reproject, spatialite, GeometryEncoding, Reprojector};

/// Résultat de l'import d'un fichier
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    /// Fichier ou nom du jeu importé
    pub source: String,
    pub table: String,
    /// Lignes écrites
    pub rows: usize,
    /// Features sans géométrie
    pub null_geometries: usize,
    /// SRID de la colonne géométrique (SpatiaLite) ou CRS de reprojection
    pub srid: Option<u32>,
    pub spatialite: bool,
    pub duration_secs: f64,
}

/// Ouvre un shapefile (`.shp` ou `.zip`) et l'importe
///
/// Sans `--table`, la table porte le nom du fichier passé (`countries.zip` → `countries`).
pub fn import_path(
    db: &mut Database,
    path: &Path,
    options: &ImportOptions,
    progress: &ProgressBar,
) -> Result<ImportSummary> {
    let mut dataset = shpread::open(path)
        .with_context(|| format!("Failed to open shapefile {}", path.display()))?;

    let table = options
        .table
        .clone()
        .or_else(|| shpread::dataset_name(path))
        .unwrap_or_else(|| dataset.name().to_string());

    info!(
        path = %path.display(),
        table = %table,
        fields = dataset.fields().len(),
        records = ?dataset.record_count(),
        "Importing shapefile"
    );

    if let Some(count) = dataset.record_count() {
        progress.set_length(count);
    }

    let source_crs = dataset.crs().cloned();
    let mut summary = import_features(
        db,
        &table,
        dataset.features(),
        source_crs.as_ref(),
        options,
        progress,
    )?;
    summary.source = path.display().to_string();

    Ok(summary)
}

/// Écrit des features dans `table`
pub fn import_features<I>(
    db: &mut Database,
    table: &str,
    features: I,
    source_crs: Option<&SourceCrs>,
    options: &ImportOptions,
    progress: &ProgressBar,
) -> Result<ImportSummary>
where
    I: IntoIterator<Item = Result<Feature, ShpError>>,
{
    let start = Instant::now();
    let use_spatialite = options.use_spatialite();

    if options.spatial_index && !use_spatialite {
        bail!("A spatial index requires SpatiaLite (use --spatialite)");
    }

    if use_spatialite {
        let lib = spatialite::resolve_spatialite(options.spatialite_mod.as_deref())?;
        spatialite::init_spatialite(db, &lib)?;
    }

    let target = options.target_crs();
    let reprojector = match target {
        Some(crs) => build_reprojector(source_crs, crs, options.crs.is_some())?,
        None => None,
    };

    let encoding = if use_spatialite {
        GeometryEncoding::Wkt
    } else {
        GeometryEncoding::GeoJson
    };

    let mut insert_options = InsertOptions {
        pk: options.pk.clone(),
        alter: options.alter,
        extracts: options.extract_columns.clone(),
        batch_size: options.batch_size,
        ..Default::default()
    };

    let srid = target.map(|crs| crs.srid());
    if use_spatialite {
        let srid = srid.unwrap_or(Crs::WGS84.srid());
        insert_options
            .conversions
            .insert("geometry".to_string(), format!("GeomFromText(?, {})", srid));
    }

    let mut failure: Option<anyhow::Error> = None;
    let mut null_geometries = 0usize;

    let mut rows = features
        .into_iter()
        .map(|feature| -> Result<Row> {
            progress.inc(1);
            let feature = feature?;
            if feature.geometry.is_none() {
                null_geometries += 1;
            }
            feature_row(feature, reprojector.as_ref(), encoding)
        })
        .map_while(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                failure = Some(e);
                None
            }
        })
        .fuse();

    // SpatiaLite: la table est créée sans `geometry`, ajoutée ensuite par AddGeometryColumn
    let sample: Vec<Row> = if use_spatialite {
        let sample: Vec<Row> = rows.by_ref().take(SAMPLE_SIZE).collect();
        let srid = srid.unwrap_or(Crs::WGS84.srid());

        if db.table_exists(table)? {
            spatialite::ensure_table_has_geometry(db, table, srid)?;
        } else if !sample.is_empty() {
            db.create_table_for(table, &sample, &insert_options, &["geometry"])?;
            spatialite::ensure_table_has_geometry(db, table, srid)?;
        }
        sample
    } else {
        Vec::new()
    };

    let written = db.insert_all(table, sample.into_iter().chain(rows), &insert_options)?;

    if let Some(e) = failure {
        return Err(e.context(format!("Import into {} stopped after {} rows", table, written)));
    }

    if options.spatial_index && written > 0 {
        spatialite::create_spatial_index(db, table)?;
    }

    let summary = ImportSummary {
        source: table.to_string(),
        table: table.to_string(),
        rows: written,
        null_geometries,
        srid,
        spatialite: use_spatialite,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    info!(
        table = %summary.table,
        rows = summary.rows,
        null_geometries = summary.null_geometries,
        "Import complete"
    );

    Ok(summary)
}

fn build_reprojector(
    source_crs: Option<&SourceCrs>,
    target: Crs,
    explicit: bool,
) -> Result<Option<Reprojector>> {
    if !reproject::is_available() && !explicit {
        warn!(
            target = %target,
            "Built without the 'reproject' feature, geometries are stored as read"
        );
        return Ok(None);
    }

    let source = match source_crs {
        Some(crs) => crs.wkt.clone(),
        None => {
            warn!(
                target = %target,
                "No .prj file found, assuming EPSG:4326 for reprojection"
            );
            Crs::WGS84.definition()
        }
    };

    let reprojector = Reprojector::new(&source, &target.definition())
        .with_context(|| format!("Cannot reproject to {}", target))?;

    if reprojector.is_identity() {
        debug!(target = %target, "Source and target CRS are identical");
        return Ok(None);
    }

    Ok(Some(reprojector))
}

/// Construit la ligne d'une feature: `id`, `geometry` puis attributs
fn feature_row(
    feature: Feature,
    reprojector: Option<&Reprojector>,
    encoding: GeometryEncoding,
) -> Result<Row> {
    let geometry = match feature.geometry {
        Some(geom) => {
            let geom = match reprojector {
                Some(r) => r
                    .transform_geometry(&geom)
                    .with_context(|| format!("Failed to reproject feature {}", feature.id))?,
                None => geom,
            };
            Value::Text(encoding.encode(&geom)?)
        }
        None => Value::Null,
    };

    let mut row: Row = Vec::with_capacity(feature.properties.len() + 2);
    row.push(("id".to_string(), Value::Integer(feature.id as i64)));
    row.push(("geometry".to_string(), geometry));

    let mut used: HashSet<String> = ["id".to_string(), "geometry".to_string()].into();
    for (name, value) in feature.properties {
        let column = column_name(&name, &mut used);
        row.push((column, value));
    }

    Ok(row)
}

/// Nom de colonne unique (insensible à la casse), suffixé par `_` en cas de conflit
fn column_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut column = name.to_string();
    while used.contains(&column.to_lowercase()) {
        column.push('_');
    }
    used.insert(column.to_lowercase());
    column
}
