//! Sérialisation des géométries avec geozero (GeoJSON, WKT)

use std::io;

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use serde::{Deserialize, Serialize};

/// Format texte de la colonne `geometry`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEncoding {
    /// GeoJSON, stocké tel quel en TEXT (SQLite sans extension)
    GeoJson,
    /// WKT, passé à `GeomFromText(?, srid)` (SpatiaLite)
    Wkt,
}

impl GeometryEncoding {
    pub fn encode(self, geom: &Geometry) -> Result<String> {
        match self {
            GeometryEncoding::GeoJson => to_geojson(geom),
            GeometryEncoding::Wkt => to_wkt(geom),
        }
    }
}

/// Encode une géométrie en GeoJSON
///
/// Texte de la forme `{"type": "Point", "coordinates": [1.5, -2.25]}`:
/// séparateurs `", "` et `": "`, clés dans l'ordre `type` puis `coordinates`.
pub fn to_geojson(geom: &Geometry) -> Result<String> {
    let mut buf = Vec::with_capacity(256);
    {
        let mut writer = GeoJsonWriter::new(&mut buf);
        geom.process_geom(&mut writer)
            .context("Failed to encode geometry to GeoJSON")?;
    }

    let parsed: GeoJsonGeometry =
        serde_json::from_slice(&buf).context("GeoJSON writer produced invalid JSON")?;

    let mut out = Vec::with_capacity(buf.len() + buf.len() / 4);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    parsed
        .serialize(&mut serializer)
        .context("Failed to format GeoJSON")?;
    String::from_utf8(out).context("GeoJSON formatter produced invalid UTF-8")
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geometries: Option<Vec<GeoJsonGeometry>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Coordinates {
    Position(Vec<f64>),
    Nested(Vec<Coordinates>),
}

/// Formatter compact avec un espace après `,` et `:`
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Encode une géométrie en WKT
pub fn to_wkt(geom: &Geometry) -> Result<String> {
    let mut buf = Vec::with_capacity(256);
    {
        let mut writer = WktWriter::new(&mut buf);
        geom.process_geom(&mut writer)
            .context("Failed to encode geometry to WKT")?;
    }
    String::from_utf8(buf).context("WKT writer produced invalid UTF-8")
}
