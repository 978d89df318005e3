//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.
//! Les définitions source/cible sont des chaînes PROJ: code `EPSG:xxxx`
//! ou WKT issu d'un fichier `.prj`.

#[cfg(feature = "reproject")]
use anyhow::{Context, Result};
#[cfg(feature = "reproject")]
use geo::{
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection de géométries entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Proj,
    source: String,
    target: String,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un nouveau reprojector entre deux définitions PROJ
    pub fn new(source: &str, target: &str) -> Result<Self> {
        // new_known_crs normalise l'ordre des axes en (lon, lat) / (x, y)
        let proj = Proj::new_known_crs(source, target, None).with_context(|| {
            format!(
                "Failed to create projection from {} to {}",
                abbreviate(source),
                abbreviate(target)
            )
        })?;

        Ok(Self {
            proj,
            source: source.to_string(),
            target: target.to_string(),
        })
    }

    /// Vrai si source et cible sont identiques
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        if self.is_identity() {
            return Ok(geom.clone());
        }

        match geom {
            Geometry::Point(p) => {
                let (x, y) = self.transform_coord(p.0)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::Line(line) => {
                let (sx, sy) = self.transform_coord(line.start)?;
                let (ex, ey) = self.transform_coord(line.end)?;
                Ok(Geometry::Line(Line::new(
                    Coord { x: sx, y: sy },
                    Coord { x: ex, y: ey },
                )))
            }
            Geometry::LineString(ls) => {
                let transformed = self.transform_linestring(ls)?;
                Ok(Geometry::LineString(transformed))
            }
            Geometry::Polygon(p) => {
                let transformed = self.transform_polygon(p)?;
                Ok(Geometry::Polygon(transformed))
            }
            Geometry::MultiPoint(mp) => {
                let points: Result<Vec<Point>> =
                    mp.0.iter()
                        .map(|p| {
                            let (x, y) = self.transform_coord(p.0)?;
                            Ok(Point::new(x, y))
                        })
                        .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(points?)))
            }
            Geometry::MultiLineString(mls) => {
                let lines: Result<Vec<LineString>> = mls
                    .0
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect();
                Ok(Geometry::MultiLineString(MultiLineString::new(lines?)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>> =
                    mp.0.iter().map(|p| self.transform_polygon(p)).collect();
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys?)))
            }
            Geometry::GeometryCollection(gc) => {
                let geoms: Result<Vec<Geometry>> =
                    gc.0.iter().map(|g| self.transform_geometry(g)).collect();
                Ok(Geometry::GeometryCollection(GeometryCollection::new_from(
                    geoms?,
                )))
            }
            Geometry::Rect(rect) => {
                let transformed = self.transform_polygon(&rect.to_polygon())?;
                Ok(Geometry::Polygon(transformed))
            }
            Geometry::Triangle(triangle) => {
                let transformed = self.transform_polygon(&triangle.to_polygon())?;
                Ok(Geometry::Polygon(transformed))
            }
        }
    }

    /// Transforme une coordonnée unique
    fn transform_coord(&self, coord: Coord) -> Result<(f64, f64)> {
        self.proj
            .convert((coord.x, coord.y))
            .context("Coordinate transformation failed")
    }

    /// Transforme une LineString (conversion batch)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj
            .convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;

        let result: Vec<Coord> = coords.into_iter().map(|(x, y)| Coord { x, y }).collect();
        Ok(LineString::new(result))
    }

    /// Transforme un Polygon
    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors: Result<Vec<LineString>> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}

/// Tronque une définition (un WKT peut faire plusieurs centaines de caractères)
#[cfg(feature = "reproject")]
fn abbreviate(definition: &str) -> String {
    const MAX: usize = 60;
    if definition.chars().count() <= MAX {
        definition.to_string()
    } else {
        format!("{}...", definition.chars().take(MAX).collect::<String>())
    }
}


/// Vérifie si la reprojection est disponible
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}

// Implémentation factice quand le feature reproject est désactivé
#[cfg(not(feature = "reproject"))]
use anyhow::{bail, Result};
#[cfg(not(feature = "reproject"))]
use geo::Geometry;

/// Reprojector factice - pas de reprojection disponible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector;

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Tente de créer un reprojector - échoue sauf si source == cible
    pub fn new(source: &str, target: &str) -> Result<Self> {
        if source == target {
            Ok(Self)
        } else {
            bail!(
                "Reprojection to {} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                target
            )
        }
    }

    pub fn is_identity(&self) -> bool {
        true
    }

    /// Retourne la géométrie inchangée (pas de reprojection)
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        Ok(geom.clone())
    }
}
