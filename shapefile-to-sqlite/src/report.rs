//! Rapport d'import
//!
//! Collecte le résultat de chaque shapefile importé et l'affiche
//! sur la console ou l'écrit en JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::import::ImportSummary;

/// Statut global de l'import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    /// Tous les fichiers importés
    Success,
    /// Aucune ligne écrite
    Empty,
}

/// Rapport complet d'import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Base SQLite cible
    pub database: String,
    /// Durée totale
    pub duration_secs: f64,
    /// Statut global
    pub status: ImportStatus,
    /// Un résumé par shapefile
    pub tables: Vec<ImportSummary>,
}

impl ImportReport {
    pub fn new(database: &Path) -> Self {
        Self {
            database: database.display().to_string(),
            duration_secs: 0.0,
            status: ImportStatus::Success,
            tables: Vec::new(),
        }
    }

    /// Enregistre le résultat d'un fichier
    pub fn record(&mut self, summary: ImportSummary) {
        self.tables.push(summary);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.total_rows() == 0 {
            ImportStatus::Empty
        } else {
            ImportStatus::Success
        };
    }

    /// Nombre total de lignes écrites
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("IMPORT REPORT - {}", self.database);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- TABLES ---");
        for t in &self.tables {
            let srid = t
                .srid
                .map(|s| format!(", SRID {}", s))
                .unwrap_or_default();
            let storage = if t.spatialite { "SpatiaLite" } else { "GeoJSON" };
            println!(
                "  {} → {}: {} rows, {} without geometry ({}{}) in {:.2}s",
                t.source, t.table, t.rows, t.null_geometries, storage, srid, t.duration_secs
            );
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows in {} table(s)",
            self.database,
            self.total_rows(),
            self.tables.len()
        )
    }
}
