//! Écriture vers SQLite: inférence de schéma, insert et upsert par lots

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use shpread::Value;
use tracing::{debug, info};

use super::error::DbError;

/// Nombre de lignes examinées pour deviner les types de colonnes
pub const SAMPLE_SIZE: usize = 100;

/// Nombre de lignes par transaction
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Une ligne: colonnes ordonnées et leurs valeurs
pub type Row = Vec<(String, Value)>;

/// Type déclaré d'une colonne
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Blob,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }

    /// Affinité SQLite d'un type déclaré (`PRAGMA table_info`)
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Float
        } else if upper.contains("BLOB") {
            ColumnType::Blob
        } else {
            ColumnType::Text
        }
    }
}

/// Colonne d'une table existante
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub declared_type: String,
    pub column_type: ColumnType,
    pub is_pk: bool,
}

/// Clé étrangère `column` → `other_table.other_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub other_table: String,
    pub other_column: String,
}

/// Options d'insertion
#[derive(Debug, Clone)]
pub struct InsertOptions {
    /// Clé primaire: active l'upsert
    pub pk: Option<String>,

    /// Ajouter les colonnes manquantes au lieu d'échouer
    pub alter: bool,

    /// Expression SQL entourant le placeholder, par colonne (ex: `GeomFromText(?, 4326)`)
    pub conversions: HashMap<String, String>,

    /// Colonnes dont les valeurs partent dans une table de correspondance du même nom
    pub extracts: Vec<String>,

    /// Nombre de lignes par transaction
    pub batch_size: usize,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            pk: None,
            alter: false,
            conversions: HashMap::new(),
            extracts: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Entoure un identifiant de guillemets doubles
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Devine le type de chaque colonne à partir d'un échantillon de lignes.
///
/// Entiers seuls → INTEGER, entiers et/ou réels → FLOAT, présence de texte → TEXT,
/// uniquement des NULL → TEXT. Les colonnes sont rendues dans l'ordre d'apparition.
pub fn suggest_column_types(rows: &[Row]) -> Vec<(String, ColumnType)> {
    #[derive(Default)]
    struct Seen {
        integer: bool,
        float: bool,
        text: bool,
    }

    let mut order: Vec<String> = Vec::new();
    let mut seen: HashMap<String, Seen> = HashMap::new();

    for row in rows {
        for (name, value) in row {
            let entry = seen.entry(name.clone()).or_insert_with(|| {
                order.push(name.clone());
                Seen::default()
            });
            match value {
                Value::Integer(_) | Value::Boolean(_) => entry.integer = true,
                Value::Real(_) => entry.float = true,
                Value::Text(_) => entry.text = true,
                Value::Null => {}
            }
        }
    }

    order
        .into_iter()
        .map(|name| {
            let column_type = match seen.get(&name) {
                Some(s) if s.text => ColumnType::Text,
                Some(s) if s.float => ColumnType::Float,
                Some(s) if s.integer => ColumnType::Integer,
                _ => ColumnType::Text,
            };
            (name, column_type)
        })
        .collect()
}

/// Valeur passée en paramètre SQLite sans copie du texte
struct Param<'a>(&'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Value::Real(n) => ToSqlOutput::Owned(SqlValue::Real(*n)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

/// Base SQLite
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Ouvre (ou crée) la base
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self { conn })
    }

    /// Base en mémoire (tests)
    pub fn open_in_memory() -> Result<Self, DbError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Accès à la connexion sous-jacente
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_names(&self) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Colonnes d'une table, dans l'ordre de déclaration
    pub fn columns(&self, table: &str) -> Result<Vec<Column>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let declared_type: String = row.get(1)?;
                let pk: i64 = row.get(2)?;
                Ok(Column {
                    column_type: ColumnType::from_declared(&declared_type),
                    name,
                    declared_type,
                    is_pk: pk > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn primary_keys(&self, table: &str) -> Result<Vec<String>, DbError> {
        Ok(self
            .columns(table)?
            .into_iter()
            .filter(|c| c.is_pk)
            .map(|c| c.name)
            .collect())
    }

    pub fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, DbError> {
        let mut stmt = self
            .conn
            .prepare(r#"SELECT "from", "table", "to" FROM pragma_foreign_key_list(?1) ORDER BY id"#)?;
        let keys = stmt
            .query_map([table], |row| {
                Ok(ForeignKey {
                    column: row.get(0)?,
                    other_table: row.get(1)?,
                    other_column: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", quote(table)), [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    /// Crée une table
    pub fn create_table(
        &self,
        table: &str,
        columns: &[(String, ColumnType)],
        pk: Option<&str>,
        foreign_keys: &[ForeignKey],
    ) -> Result<(), DbError> {
        if let Some(pk) = pk {
            if !columns.iter().any(|(name, _)| name == pk) {
                return Err(DbError::InvalidPrimaryKey {
                    table: table.to_string(),
                    column: pk.to_string(),
                });
            }
        }

        let definitions: Vec<String> = columns
            .iter()
            .map(|(name, column_type)| {
                let mut definition = format!("{} {}", quote(name), column_type.sql());
                if pk == Some(name.as_str()) {
                    definition.push_str(" PRIMARY KEY");
                }
                if let Some(fk) = foreign_keys.iter().find(|fk| &fk.column == name) {
                    definition.push_str(&format!(
                        " REFERENCES {}({})",
                        quote(&fk.other_table),
                        quote(&fk.other_column)
                    ));
                }
                definition
            })
            .collect();

        let sql = format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote(table),
            definitions.join(",\n    ")
        );

        self.conn.execute(&sql, [])?;

        info!(table = table, columns = columns.len(), pk = ?pk, "Created table");
        Ok(())
    }

    /// Crée une table à partir des types devinés sur un échantillon
    ///
    /// Les colonnes de `skip` sont ignorées (ex: `geometry`, ajoutée ensuite par SpatiaLite).
    pub fn create_table_for(
        &self,
        table: &str,
        sample: &[Row],
        options: &InsertOptions,
        skip: &[&str],
    ) -> Result<(), DbError> {
        let columns: Vec<(String, ColumnType)> = suggest_column_types(sample)
            .into_iter()
            .filter(|(name, _)| !skip.contains(&name.as_str()))
            .map(|(name, column_type)| {
                if options.extracts.contains(&name) {
                    (name, ColumnType::Integer)
                } else {
                    (name, column_type)
                }
            })
            .collect();

        let mut foreign_keys = Vec::new();
        for column in &options.extracts {
            if columns.iter().any(|(name, _)| name == column) {
                self.ensure_lookup_table(column)?;
                foreign_keys.push(ForeignKey {
                    column: column.clone(),
                    other_table: column.clone(),
                    other_column: "id".to_string(),
                });
            }
        }

        self.create_table(table, &columns, options.pk.as_deref(), &foreign_keys)
    }

    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
    ) -> Result<(), DbError> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote(table),
            quote(column),
            column_type.sql()
        );
        self.conn.execute(&sql, [])?;
        info!(table = table, column = column, column_type = column_type.sql(), "Added column");
        Ok(())
    }

    /// Table de correspondance `(id, value)` pour une colonne extraite
    fn ensure_lookup_table(&self, name: &str) -> Result<(), DbError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\"id\" INTEGER PRIMARY KEY, \"value\" TEXT);\n\
             CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} (\"value\");",
            table = quote(name),
            index = quote(&format!("idx_{}_value", name)),
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Insère (ou upsert si `pk`) toutes les lignes, par lots transactionnels.
    ///
    /// La table est créée si besoin à partir des `SAMPLE_SIZE` premières lignes.
    /// Retourne le nombre de lignes écrites.
    pub fn insert_all<I>(
        &mut self,
        table: &str,
        rows: I,
        options: &InsertOptions,
    ) -> Result<usize, DbError>
    where
        I: IntoIterator<Item = Row>,
    {
        let batch_size = options.batch_size.max(1);
        let mut rows = rows.into_iter();
        let mut pending: Vec<Row> = Vec::new();

        if !self.table_exists(table)? {
            pending.extend(rows.by_ref().take(SAMPLE_SIZE));
            if pending.is_empty() {
                debug!(table = table, "No rows to insert, table not created");
                return Ok(0);
            }
            self.create_table_for(table, &pending, options, &[])?;
        }

        let mut known: HashSet<String> = self
            .columns(table)?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut written = 0;
        loop {
            let missing = batch_size.saturating_sub(pending.len());
            pending.extend(rows.by_ref().take(missing));
            if pending.is_empty() {
                break;
            }

            let batch = std::mem::take(&mut pending);
            written += self.write_batch(table, &batch, &mut known, options)?;
            debug!(table = table, written = written, "Batch committed");
        }

        Ok(written)
    }

    fn write_batch(
        &mut self,
        table: &str,
        batch: &[Row],
        known: &mut HashSet<String>,
        options: &InsertOptions,
    ) -> Result<usize, DbError> {
        let mut missing: Vec<String> = Vec::new();
        for row in batch {
            for (name, _) in row {
                if !known.contains(name) && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
        }

        if !missing.is_empty() {
            if !options.alter {
                return Err(DbError::unknown_column(table, &missing[0]));
            }

            let suggested: HashMap<String, ColumnType> =
                suggest_column_types(batch).into_iter().collect();
            for name in missing {
                let column_type = if options.extracts.contains(&name) {
                    ColumnType::Integer
                } else {
                    suggested.get(&name).copied().unwrap_or(ColumnType::Text)
                };
                self.add_column(table, &name, column_type)?;
                known.insert(name);
            }
        }

        // Tables de correspondance des seules colonnes extraites présentes
        for column in &options.extracts {
            if batch.iter().any(|row| row.iter().any(|(name, _)| name == column)) {
                self.ensure_lookup_table(column)?;
            }
        }

        let tx = self.conn.transaction()?;
        for row in batch {
            let row = resolve_extracts(&tx, row, &options.extracts)?;
            match options.pk.as_deref() {
                Some(pk) => upsert_row(&tx, table, pk, &row, &options.conversions)?,
                None => insert_row(&tx, table, &row, &options.conversions)?,
            }
        }
        tx.commit()?;

        Ok(batch.len())
    }
}

fn placeholder<'a>(conversions: &'a HashMap<String, String>, column: &str) -> &'a str {
    conversions.get(column).map(String::as_str).unwrap_or("?")
}

fn insert_row(
    conn: &Connection,
    table: &str,
    row: &Row,
    conversions: &HashMap<String, String>,
) -> Result<(), DbError> {
    let columns: Vec<String> = row.iter().map(|(name, _)| quote(name)).collect();
    let placeholders: Vec<&str> = row
        .iter()
        .map(|(name, _)| placeholder(conversions, name))
        .collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        columns.join(", "),
        placeholders.join(", ")
    );

    conn.prepare_cached(&sql)?
        .execute(params_from_iter(row.iter().map(|(_, value)| Param(value))))?;
    Ok(())
}

/// `INSERT OR IGNORE` de la clé puis `UPDATE` des autres colonnes
fn upsert_row(
    conn: &Connection,
    table: &str,
    pk: &str,
    row: &Row,
    conversions: &HashMap<String, String>,
) -> Result<(), DbError> {
    let pk_value = row
        .iter()
        .find(|(name, _)| name == pk)
        .map(|(_, value)| value)
        .filter(|value| !value.is_null())
        .ok_or_else(|| DbError::MissingPrimaryKey {
            table: table.to_string(),
            column: pk.to_string(),
        })?;

    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES (?)",
        quote(table),
        quote(pk)
    );
    conn.prepare_cached(&sql)?
        .execute(params_from_iter(std::iter::once(Param(pk_value))))?;

    let others: Vec<&(String, Value)> = row.iter().filter(|(name, _)| name != pk).collect();
    if others.is_empty() {
        return Ok(());
    }

    let assignments: Vec<String> = others
        .iter()
        .map(|(name, _)| format!("{} = {}", quote(name), placeholder(conversions, name)))
        .collect();

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        quote(table),
        assignments.join(", "),
        quote(pk)
    );

    let params = others
        .iter()
        .map(|(_, value)| Param(value))
        .chain(std::iter::once(Param(pk_value)));
    conn.prepare_cached(&sql)?.execute(params_from_iter(params))?;
    Ok(())
}

/// Remplace les valeurs des colonnes extraites par l'id de la table de correspondance
fn resolve_extracts(conn: &Connection, row: &Row, extracts: &[String]) -> Result<Row, DbError> {
    row.iter()
        .map(|(name, value)| {
            if value.is_null() || !extracts.contains(name) {
                return Ok((name.clone(), value.clone()));
            }
            let id = lookup_id(conn, name, &value.to_string())?;
            Ok((name.clone(), Value::Integer(id)))
        })
        .collect()
}

fn lookup_id(conn: &Connection, table: &str, value: &str) -> Result<i64, DbError> {
    conn.prepare_cached(&format!(
        "INSERT OR IGNORE INTO {} (\"value\") VALUES (?1)",
        quote(table)
    ))?
    .execute([value])?;

    let id = conn
        .prepare_cached(&format!(
            "SELECT \"id\" FROM {} WHERE \"value\" = ?1",
            quote(table)
        ))?
        .query_row([value], |row| row.get(0))?;
    Ok(id)
}
