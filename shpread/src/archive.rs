//! Extraction des shapefiles zippés (.zip)

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;

use crate::ShpError;

/// Contenu extrait d'une archive zip
#[derive(Debug)]
pub struct ShapefileArchive {
    /// Nom du jeu de données (stem du membre .shp)
    pub name: String,

    /// Contenu du fichier SHP (géométries)
    pub shp: Vec<u8>,

    /// Contenu du fichier DBF (attributs)
    pub dbf: Vec<u8>,

    /// Contenu du fichier PRJ (projection), souvent absent
    pub prj: Option<String>,

    /// Contenu du fichier CPG (jeu de caractères du DBF)
    pub cpg: Option<String>,
}

/// Extrait en mémoire le premier shapefile trouvé dans une archive zip
///
/// Les membres `.dbf`, `.prj` et `.cpg` doivent partager le stem du `.shp`.
/// La recherche ignore la casse et accepte les sous-répertoires.
/// Le nom retourné garde la casse du membre `.shp`.
pub fn extract(path: &Path) -> Result<ShapefileArchive, ShpError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(std::io::BufReader::new(file))?;

    // stem en minuscules (chemin complet sans extension) -> index par extension
    let mut members: HashMap<(String, String), usize> = HashMap::new();
    // (stem en minuscules, stem d'origine)
    let mut first_shp: Option<(String, String)> = None;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let Some((stem, extension)) = name.rsplit_once('.') else {
            continue;
        };
        let key = stem.to_lowercase();
        let extension = extension.to_lowercase();

        if extension == "shp" && first_shp.is_none() {
            first_shp = Some((key.clone(), stem.to_string()));
        }
        members.insert((key, extension), index);
    }

    let (stem, original_stem) = first_shp.ok_or_else(|| ShpError::MissingFile("SHP".into()))?;

    let shp_index = members[&(stem.clone(), "shp".to_string())];
    let dbf_index = *members
        .get(&(stem.clone(), "dbf".to_string()))
        .ok_or_else(|| ShpError::MissingFile(format!("{}.dbf", stem)))?;

    let shp = read_member(&mut archive, shp_index)?;
    let dbf = read_member(&mut archive, dbf_index)?;

    let prj = read_text_member(&mut archive, members.get(&(stem.clone(), "prj".to_string())))?;
    let cpg = read_text_member(&mut archive, members.get(&(stem.clone(), "cpg".to_string())))?;

    let name = original_stem
        .rsplit('/')
        .next()
        .unwrap_or(original_stem.as_str())
        .to_string();

    debug!(
        archive = %path.display(),
        layer = %name,
        shp_bytes = shp.len(),
        dbf_bytes = dbf.len(),
        has_prj = prj.is_some(),
        cpg = cpg.as_deref().unwrap_or("-"),
        "Extracted shapefile from zip"
    );

    Ok(ShapefileArchive {
        name,
        shp,
        dbf,
        prj,
        cpg,
    })
}

fn read_text_member<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    index: Option<&usize>,
) -> Result<Option<String>, ShpError> {
    match index {
        Some(&index) => {
            let bytes = read_member(archive, index)?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        None => Ok(None),
    }
}

fn read_member<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
) -> Result<Vec<u8>, ShpError> {
    let mut entry = archive.by_index(index)?;
    let mut content = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut content)?;
    Ok(content)
}
