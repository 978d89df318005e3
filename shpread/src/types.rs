//! Types de données pour le crate shpread

use std::fmt;

use geo::Geometry;

/// Une feature d'un shapefile avec sa géométrie et ses attributs
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Index de l'enregistrement dans le fichier (à partir de 0)
    pub id: u64,

    /// Géométrie, absente pour les shapes nulles
    pub geometry: Option<Geometry>,

    /// Attributs DBF dans l'ordre de déclaration des champs
    pub properties: Vec<(String, Value)>,
}

impl Feature {
    /// Récupère un attribut par son nom
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Valeur d'un attribut DBF, ramenée aux types scalaires courants
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Système de coordonnées déclaré par le fichier `.prj`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCrs {
    /// Contenu WKT du `.prj`
    pub wkt: String,
}

impl SourceCrs {
    pub fn new(wkt: impl Into<String>) -> Self {
        Self {
            wkt: wkt.into().trim().to_string(),
        }
    }
}
