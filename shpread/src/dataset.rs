//! Ouverture d'un jeu de données shapefile et itération en streaming

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use dbase::FieldValue;
use geo::{Geometry, LineString, Polygon};
use shapefile::{Shape, ShapeReader};
use tracing::{debug, warn};

use crate::encoding::{self, MaskedLdid};
use crate::types::{Feature, SourceCrs, Value};
use crate::{archive, ShpError};

/// Nom du pseudo-champ de suppression exposé par certains lecteurs dBase
const DELETION_FLAG: &str = "DeletionFlag";

/// Source lisible et positionnable (fichier sur disque ou membre de zip en mémoire)
pub trait Source: Read + Seek {}

impl<T: Read + Seek> Source for T {}

/// Un shapefile ouvert, prêt à être parcouru
pub struct Dataset {
    name: String,
    fields: Vec<String>,
    crs: Option<SourceCrs>,
    record_count: Option<u64>,
    /// Nombre de décimales déclaré pour chaque champ numérique
    decimals: HashMap<String, u8>,
    reader: shapefile::Reader<Box<dyn Source>, Box<dyn Source>>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("crs", &self.crs)
            .field("record_count", &self.record_count)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Construit un dataset depuis des sources SHP et DBF déjà ouvertes
    ///
    /// `cpg` est le contenu du fichier `.cpg`. Sans lui, la page de code vient
    /// de l'en-tête DBF, puis Latin-1 par défaut.
    pub fn from_readers<S, D>(
        name: impl Into<String>,
        shp: S,
        dbf: D,
        prj: Option<String>,
        cpg: Option<String>,
    ) -> Result<Self, ShpError>
    where
        S: Source + 'static,
        D: Source + 'static,
    {
        let name = name.into();
        let mut dbf: Box<dyn Source> = Box::new(dbf);
        let header = DbfHeader::read(&mut dbf)?;

        let shape_reader = ShapeReader::new(Box::new(shp) as Box<dyn Source>)?;
        let dbf: Box<dyn Source> = Box::new(MaskedLdid::new(dbf));
        let mut dbase_reader = dbase::Reader::new(dbf)?;

        let code_page = encoding::resolve(cpg.as_deref(), header.ldid);
        if encoding::apply(&mut dbase_reader, code_page) {
            debug!(dataset = %name, code_page = ?code_page, "DBF text encoding");
        } else {
            warn!(
                dataset = %name,
                code_page = ?code_page,
                "Unsupported DBF code page, text read as UTF-8"
            );
        }

        let fields: Vec<String> = dbase_reader
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .filter(|name| name != DELETION_FLAG)
            .collect();

        let crs = prj
            .filter(|wkt| !wkt.trim().is_empty())
            .map(SourceCrs::new);

        Ok(Self {
            name,
            fields,
            crs,
            record_count: header.record_count,
            decimals: header.decimals,
            reader: shapefile::Reader::new(shape_reader, dbase_reader),
        })
    }

    /// Nom du jeu de données (stem du fichier ouvert, casse conservée)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Noms des champs DBF, dans l'ordre de déclaration
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Projection déclarée par le `.prj`
    pub fn crs(&self) -> Option<&SourceCrs> {
        self.crs.as_ref()
    }

    /// Nombre d'enregistrements annoncé par l'en-tête DBF
    pub fn record_count(&self) -> Option<u64> {
        self.record_count
    }

    /// Itère sur les features sans tout charger en mémoire
    pub fn features(&mut self) -> impl Iterator<Item = Result<Feature, ShpError>> + '_ {
        let fields = &self.fields;
        let decimals = &self.decimals;
        self.reader
            .iter_shapes_and_records()
            .enumerate()
            .map(move |(index, result)| {
                let (shape, record) = result?;
                build_feature(index as u64, shape, record, fields, decimals)
            })
    }
}

/// Ouvre un `.shp` sur disque avec ses fichiers compagnons
pub fn open_shp(path: &Path) -> Result<Dataset, ShpError> {
    let dbf_path = sibling(path, "dbf")
        .ok_or_else(|| ShpError::MissingFile(path.with_extension("dbf").display().to_string()))?;

    let shp = BufReader::new(File::open(path)?);
    let dbf = BufReader::new(File::open(&dbf_path)?);
    let prj = sibling(path, "prj")
        .map(std::fs::read_to_string)
        .transpose()?;
    let cpg = sibling(path, "cpg")
        .map(std::fs::read_to_string)
        .transpose()?;

    let name = crate::dataset_name(path).unwrap_or_else(|| "features".to_string());

    debug!(
        shp = %path.display(),
        dbf = %dbf_path.display(),
        has_prj = prj.is_some(),
        "Opening shapefile"
    );

    Dataset::from_readers(name, shp, dbf, prj, cpg)
}

/// Ouvre le premier shapefile contenu dans une archive zip
///
/// Le jeu de données porte le nom de l'archive, pas celui du membre `.shp`.
pub fn open_zip(path: &Path) -> Result<Dataset, ShpError> {
    let extracted = archive::extract(path)?;
    let name = crate::dataset_name(path).unwrap_or(extracted.name);
    Dataset::from_readers(
        name,
        Cursor::new(extracted.shp),
        Cursor::new(extracted.dbf),
        extracted.prj,
        extracted.cpg,
    )
}

/// Cherche un fichier compagnon (extension en minuscules puis majuscules)
fn sibling(path: &Path, extension: &str) -> Option<PathBuf> {
    [extension.to_lowercase(), extension.to_uppercase()]
        .into_iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Informations de l'en-tête DBF que le lecteur dBase n'expose pas
#[derive(Debug, Default)]
struct DbfHeader {
    record_count: Option<u64>,
    ldid: u8,
    decimals: HashMap<String, u8>,
}

impl DbfHeader {
    const SIZE: usize = 32;
    const DESCRIPTOR_SIZE: usize = 32;
    const TERMINATOR: u8 = 0x0D;

    /// Lit l'en-tête et les descripteurs de champs, puis rembobine la source.
    /// Un en-tête tronqué donne des valeurs vides: le lecteur dBase signalera l'erreur.
    fn read(dbf: &mut Box<dyn Source>) -> Result<Self, ShpError> {
        let header = Self::read_from(dbf)?;
        dbf.seek(SeekFrom::Start(0))?;
        Ok(header)
    }

    fn read_from(dbf: &mut Box<dyn Source>) -> Result<Self, ShpError> {
        let mut main = [0u8; Self::SIZE];
        if !read_block(dbf, &mut main)? {
            return Ok(Self::default());
        }

        let record_count = u32::from_le_bytes([main[4], main[5], main[6], main[7]]) as u64;
        let header_len = u16::from_le_bytes([main[8], main[9]]) as usize;
        let max_fields = header_len.saturating_sub(Self::SIZE + 1) / Self::DESCRIPTOR_SIZE;

        let mut decimals = HashMap::new();
        let mut descriptor = [0u8; Self::DESCRIPTOR_SIZE];
        for _ in 0..max_fields {
            if !read_block(dbf, &mut descriptor)? || descriptor[0] == Self::TERMINATOR {
                break;
            }
            let name_len = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&descriptor[..name_len]).trim().to_string();
            decimals.insert(name, descriptor[17]);
        }

        Ok(Self {
            record_count: Some(record_count),
            ldid: main[encoding::LDID_OFFSET as usize],
            decimals,
        })
    }
}

/// Remplit `buf`, ou retourne `false` si la source est trop courte
fn read_block(source: &mut Box<dyn Source>, buf: &mut [u8]) -> Result<bool, ShpError> {
    match source.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn build_feature(
    id: u64,
    shape: Shape,
    mut record: dbase::Record,
    fields: &[String],
    decimals: &HashMap<String, u8>,
) -> Result<Feature, ShpError> {
    let geometry = match shape {
        Shape::NullShape => None,
        shape => {
            let geometry = Geometry::<f64>::try_from(shape)
                .map_err(|e| ShpError::invalid_geometry(id, e.to_string()))?;
            Some(simplify_collection(geometry))
        }
    };

    let properties = fields
        .iter()
        .map(|name| {
            let scale = decimals.get(name).copied().unwrap_or(0);
            let value = record
                .remove(name)
                .map(|v| convert_value(v, scale))
                .unwrap_or(Value::Null);
            (name.clone(), value)
        })
        .collect();

    Ok(Feature {
        id,
        geometry,
        properties,
    })
}

/// Les polygones et polylignes shapefile sont toujours décodés en multi-géométries.
/// Une multi-géométrie à un seul membre est ramenée à sa forme simple.
fn simplify_collection(geometry: Geometry) -> Geometry {
    match geometry {
        Geometry::MultiPolygon(mp) if mp.0.len() == 1 => {
            let polygon: Polygon = mp.0.into_iter().next().unwrap_or_else(|| {
                Polygon::new(LineString::new(Vec::new()), Vec::new())
            });
            Geometry::Polygon(polygon)
        }
        Geometry::MultiLineString(mls) if mls.0.len() == 1 => {
            let line = mls
                .0
                .into_iter()
                .next()
                .unwrap_or_else(|| LineString::new(Vec::new()));
            Geometry::LineString(line)
        }
        other => other,
    }
}

/// Convertit une valeur dBase en valeur scalaire
///
/// `scale` est le nombre de décimales déclaré: un champ `N(8,2)` reste réel
/// même quand la valeur lue est entière.
fn convert_value(value: FieldValue, scale: u8) -> Value {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let trimmed = s.trim_end();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        FieldValue::Numeric(Some(n)) if scale > 0 => Value::Real(n),
        FieldValue::Numeric(Some(n)) => number_value(n),
        FieldValue::Float(Some(n)) => Value::Real(n as f64),
        FieldValue::Integer(n) => Value::Integer(n as i64),
        FieldValue::Double(n) | FieldValue::Currency(n) => Value::Real(n),
        FieldValue::Logical(Some(b)) => Value::Boolean(b),
        FieldValue::Date(Some(d)) => Value::Text(format!(
            "{:04}-{:02}-{:02}",
            d.year(),
            d.month(),
            d.day()
        )),
        FieldValue::DateTime(dt) => {
            let (date, time) = (dt.date(), dt.time());
            Value::Text(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                date.year(),
                date.month(),
                date.day(),
                time.hours(),
                time.minutes(),
                time.seconds()
            ))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => Value::Null,
        #[allow(unreachable_patterns)]
        other => Value::Text(format!("{:?}", other)),
    }
}

/// Les champs N sans décimales arrivent en f64: on les remet en entier
fn number_value(n: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT {
        Value::Integer(n as i64)
    } else {
        Value::Real(n)
    }
}
