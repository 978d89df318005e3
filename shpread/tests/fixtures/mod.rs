//! Générateur de shapefiles de test
//!
//! Écrit directement les octets SHP/DBF (format ESRI / dBase III) pour
//! produire des jeux de données minimaux sans fichier binaire versionné.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

/// Shape à écrire
pub enum FixtureShape {
    Null,
    Point(f64, f64),
    Polygon(Vec<(f64, f64)>),
}

/// Champ DBF (`C` caractère, `N` numérique)
pub struct FixtureField {
    pub name: &'static str,
    pub kind: u8,
    pub length: u8,
    pub decimals: u8,
}

impl FixtureField {
    pub fn character(name: &'static str, length: u8) -> Self {
        Self {
            name,
            kind: b'C',
            length,
            decimals: 0,
        }
    }

    pub fn numeric(name: &'static str, length: u8, decimals: u8) -> Self {
        Self {
            name,
            kind: b'N',
            length,
            decimals,
        }
    }
}

pub const UK_RING: [(f64, f64); 6] = [
    (-8.0859375, 60.930432202923335),
    (1.0546875, 60.06484046010452),
    (4.21875, 52.26815737376817),
    (-5.9765625, 48.922499263758255),
    (-16.875, 50.28933925329178),
    (-8.0859375, 60.930432202923335),
];

pub const USA_RING: [(f64, f64); 10] = [
    (-129.375, 47.754097979680026),
    (-115.31249999999999, 50.736455137010665),
    (-100.8984375, 50.064191736659104),
    (-84.375, 51.39920565355378),
    (-61.52343749999999, 44.33956524809713),
    (-77.34374999999999, 25.48295117535531),
    (-85.4296875, 24.206889622398023),
    (-96.6796875, 25.48295117535531),
    (-119.53125, 33.43144133557529),
    (-129.375, 47.754097979680026),
];

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// Jeu de données de référence: deux polygones (UK, USA) avec `id_`, `slug`, `about`
pub fn features_fixture(dir: &Path) -> PathBuf {
    write_shapefile(
        dir,
        "features",
        &[
            FixtureField::numeric("id_", 10, 0),
            FixtureField::character("slug", 20),
            FixtureField::character("about", 80),
        ],
        &[
            (
                FixtureShape::Polygon(UK_RING.to_vec()),
                vec!["123", "uk", "Rough area around the UK"],
            ),
            (
                FixtureShape::Polygon(USA_RING.to_vec()),
                vec!["456", "usa", "Very rough area around the USA"],
            ),
        ],
    )
}

/// Écrit `<stem>.shp` et `<stem>.dbf` dans `dir` et retourne le chemin du `.shp`
pub fn write_shapefile(
    dir: &Path,
    stem: &str,
    fields: &[FixtureField],
    records: &[(FixtureShape, Vec<&str>)],
) -> PathBuf {
    let shp_path = dir.join(format!("{}.shp", stem));
    let shapes: Vec<&FixtureShape> = records.iter().map(|(shape, _)| shape).collect();
    std::fs::write(&shp_path, shp_bytes(&shapes)).expect("write shp");

    let rows: Vec<Vec<&[u8]>> = records
        .iter()
        .map(|(_, row)| row.iter().map(|v| v.as_bytes()).collect())
        .collect();
    std::fs::write(dir.join(format!("{}.dbf", stem)), dbf_bytes(fields, &rows)).expect("write dbf");

    shp_path
}

/// Comme `write_shapefile`, avec des valeurs DBF en octets bruts (autre encodage que UTF-8)
pub fn write_shapefile_raw(
    dir: &Path,
    stem: &str,
    fields: &[FixtureField],
    records: &[(FixtureShape, Vec<&[u8]>)],
) -> PathBuf {
    let shp_path = dir.join(format!("{}.shp", stem));
    let shapes: Vec<&FixtureShape> = records.iter().map(|(shape, _)| shape).collect();
    std::fs::write(&shp_path, shp_bytes(&shapes)).expect("write shp");

    let rows: Vec<Vec<&[u8]>> = records.iter().map(|(_, row)| row.clone()).collect();
    std::fs::write(dir.join(format!("{}.dbf", stem)), dbf_bytes(fields, &rows)).expect("write dbf");

    shp_path
}

/// Écrit un `.cpg` à côté du `.shp`
pub fn write_cpg(shp_path: &Path, charset: &str) {
    std::fs::write(shp_path.with_extension("cpg"), charset).expect("write cpg");
}

/// Renseigne l'octet "language driver" de l'en-tête DBF
pub fn set_ldid(shp_path: &Path, ldid: u8) {
    let dbf_path = shp_path.with_extension("dbf");
    let mut bytes = std::fs::read(&dbf_path).expect("read dbf");
    bytes[29] = ldid;
    std::fs::write(&dbf_path, bytes).expect("write dbf");
}

/// Écrit un `.prj` à côté du `.shp`
pub fn write_prj(shp_path: &Path, wkt: &str) {
    std::fs::write(shp_path.with_extension("prj"), wkt).expect("write prj");
}

/// Emballe le shapefile (shp, dbf, prj et cpg éventuels) dans `<stem>.zip`
pub fn zip_fixture(shp_path: &Path, inner_dir: Option<&str>) -> PathBuf {
    let zip_path = shp_path.with_extension("zip");
    let file = std::fs::File::create(&zip_path).expect("create zip");
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();

    for ext in ["shp", "dbf", "prj", "cpg"] {
        let member = shp_path.with_extension(ext);
        if !member.exists() {
            continue;
        }
        let file_name = member.file_name().unwrap().to_str().unwrap().to_string();
        let name = match inner_dir {
            Some(dir) => format!("{}/{}", dir, file_name),
            None => file_name,
        };
        zip.start_file(name, options).expect("start zip member");
        zip.write_all(&std::fs::read(&member).unwrap())
            .expect("write zip member");
    }

    zip.finish().expect("finish zip");
    zip_path
}

fn shape_type(shape: &FixtureShape) -> i32 {
    match shape {
        FixtureShape::Null => 0,
        FixtureShape::Point(..) => 1,
        FixtureShape::Polygon(_) => 5,
    }
}

fn bbox(points: &[(f64, f64)]) -> [f64; 4] {
    points.iter().fold(
        [f64::MAX, f64::MAX, f64::MIN, f64::MIN],
        |[xmin, ymin, xmax, ymax], &(x, y)| [xmin.min(x), ymin.min(y), xmax.max(x), ymax.max(y)],
    )
}

fn shp_bytes(shapes: &[&FixtureShape]) -> Vec<u8> {
    let mut records = Vec::new();
    let mut all_points = Vec::new();

    for (index, shape) in shapes.iter().enumerate() {
        let mut content = Vec::new();
        content.extend_from_slice(&shape_type(shape).to_le_bytes());

        match shape {
            FixtureShape::Null => {}
            FixtureShape::Point(x, y) => {
                content.extend_from_slice(&x.to_le_bytes());
                content.extend_from_slice(&y.to_le_bytes());
                all_points.push((*x, *y));
            }
            FixtureShape::Polygon(ring) => {
                for v in bbox(ring) {
                    content.extend_from_slice(&v.to_le_bytes());
                }
                content.extend_from_slice(&1i32.to_le_bytes());
                content.extend_from_slice(&(ring.len() as i32).to_le_bytes());
                content.extend_from_slice(&0i32.to_le_bytes());
                for (x, y) in ring {
                    content.extend_from_slice(&x.to_le_bytes());
                    content.extend_from_slice(&y.to_le_bytes());
                }
                all_points.extend_from_slice(ring);
            }
        }

        records.extend_from_slice(&((index + 1) as i32).to_be_bytes());
        records.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        records.extend_from_slice(&content);
    }

    let file_type = shapes
        .iter()
        .map(|s| shape_type(s))
        .find(|&t| t != 0)
        .unwrap_or(0);
    let extent = if all_points.is_empty() {
        [0.0; 4]
    } else {
        bbox(&all_points)
    };

    let mut out = Vec::with_capacity(100 + records.len());
    out.extend_from_slice(&9994i32.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&(((100 + records.len()) / 2) as i32).to_be_bytes());
    out.extend_from_slice(&1000i32.to_le_bytes());
    out.extend_from_slice(&file_type.to_le_bytes());
    for v in extent {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 32]);
    out.extend_from_slice(&records);
    out
}

fn dbf_bytes(fields: &[FixtureField], rows: &[Vec<&[u8]>]) -> Vec<u8> {
    let record_len: u16 = 1 + fields.iter().map(|f| f.length as u16).sum::<u16>();
    let header_len: u16 = 32 + 32 * fields.len() as u16 + 1;

    let mut out = vec![0x03, 124, 1, 1];
    out.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&record_len.to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);

    for field in fields {
        let mut name = [0u8; 11];
        name[..field.name.len()].copy_from_slice(field.name.as_bytes());
        out.extend_from_slice(&name);
        out.push(field.kind);
        out.extend_from_slice(&[0u8; 4]);
        out.push(field.length);
        out.push(field.decimals);
        out.extend_from_slice(&[0u8; 14]);
    }
    out.push(0x0D);

    for row in rows {
        out.push(b' ');
        for (field, value) in fields.iter().zip(row.iter()) {
            let width = field.length as usize;
            let value = &value[..value.len().min(width)];
            let padding = vec![b' '; width - value.len()];
            if field.kind == b'C' {
                out.extend_from_slice(value);
                out.extend_from_slice(&padding);
            } else {
                out.extend_from_slice(&padding);
                out.extend_from_slice(value);
            }
        }
    }
    out.push(0x1A);
    out
}
