// src/services/import_service.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    db::{DocumentStore, Repository, WriteBatch},
    models::{
        import::{ImportReport, ImportWorkersPayload, SkippedRow},
        new_id,
        worker::{Gender, Worker},
        Statut,
    },
    services::{
        occupancy_service::{room_key, OccupancyService},
        worker_service::normalize_cin,
    },
};

// ---
// COLUMN MATCHING
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Nom,
    Cin,
    Matricule,
    Chambre,
    Secteur,
    Sexe,
    DateEntree,
}

impl Field {
    /// Column order assumed when the headers say nothing useful.
    pub const CANONICAL: [Field; 7] = [
        Field::Nom,
        Field::Cin,
        Field::Matricule,
        Field::Chambre,
        Field::Secteur,
        Field::Sexe,
        Field::DateEntree,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Nom => "nom",
            Field::Cin => "cin",
            Field::Matricule => "matricule",
            Field::Chambre => "chambre",
            Field::Secteur => "secteur",
            Field::Sexe => "sexe",
            Field::DateEntree => "dateEntree",
        }
    }

    fn is_required(self) -> bool {
        matches!(self, Field::Nom | Field::Cin)
    }

    // Normalized spellings seen in farm spreadsheets
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Nom => &["nom", "nomcomplet", "nometprenom", "nomprenom", "name", "fullname", "ouvrier", "employe"],
            Field::Cin => &["cin", "cni", "carteidentite", "cartenationale", "nationalid", "identite"],
            Field::Matricule => &["matricule", "mle", "employeeid", "codeouvrier"],
            Field::Chambre => &["chambre", "numchambre", "nchambre", "room", "logement"],
            Field::Secteur => &["secteur", "sector", "zone", "parcelle", "equipe"],
            Field::Sexe => &["sexe", "genre", "gender", "sex"],
            Field::DateEntree => &[
                "dateentree",
                "datedentree",
                "dateembauche",
                "datedebut",
                "hiredate",
                "startdate",
                "entree",
                "embauche",
            ],
        }
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Lowercase, accents folded, everything but ASCII letters and digits dropped.
pub fn normalize_header(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(fold_accent)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    pub columns: HashMap<Field, usize>,
    /// At least one field was placed by position rather than by name.
    pub by_position: bool,
    /// Nothing matched: the header row is really the first data row.
    pub headers_are_data: bool,
}

impl ColumnMapping {
    fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }
}

pub fn map_columns(headers: &[String], column_count: usize) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut mapping = ColumnMapping::default();
    let mut used: HashSet<usize> = HashSet::new();

    // 1. Exact alias
    for field in Field::CANONICAL {
        let found = normalized
            .iter()
            .enumerate()
            .find(|(idx, header)| !used.contains(idx) && field.aliases().contains(&header.as_str()));
        if let Some((idx, _)) = found {
            mapping.columns.insert(field, idx);
            used.insert(idx);
        }
    }

    // 2. Header containing an alias, for fields still unmapped
    for field in Field::CANONICAL {
        if mapping.columns.contains_key(&field) {
            continue;
        }
        let found = normalized.iter().enumerate().find(|(idx, header)| {
            !used.contains(idx) && !header.is_empty() && field.aliases().iter().any(|alias| header.contains(alias))
        });
        if let Some((idx, _)) = found {
            mapping.columns.insert(field, idx);
            used.insert(idx);
        }
    }

    // 3. Position
    if mapping.columns.is_empty() {
        for (idx, field) in Field::CANONICAL.into_iter().enumerate().take(column_count) {
            mapping.columns.insert(field, idx);
        }
        mapping.by_position = true;
        mapping.headers_are_data = !headers.is_empty();
    } else {
        for (idx, field) in Field::CANONICAL.into_iter().enumerate() {
            if field.is_required() && !mapping.columns.contains_key(&field) && idx < column_count && !used.contains(&idx) {
                mapping.columns.insert(field, idx);
                used.insert(idx);
                mapping.by_position = true;
            }
        }
    }

    mapping
}

// ---
// CELL PARSING
// ---

pub fn parse_gender(raw: &str) -> Option<Gender> {
    match normalize_header(raw).as_str() {
        "h" | "homme" | "m" | "masculin" | "male" | "man" => Some(Gender::Homme),
        "f" | "femme" | "feminin" | "female" | "woman" => Some(Gender::Femme),
        _ => None,
    }
}

// Day 0 of spreadsheet serial dates
fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // Spreadsheet serial number, possibly with a time fraction
    let serial: f64 = raw.parse().ok()?;
    if !(1.0..=100_000.0).contains(&serial) {
        return None;
    }
    serial_epoch()?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

fn cell(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Turns one spreadsheet row into a worker, or explains why not.
pub fn parse_row(row: &[String], mapping: &ColumnMapping, ferme_id: &str, today: NaiveDate) -> Result<Worker, String> {
    let nom = cell(row, mapping.get(Field::Nom)).ok_or("missing nom")?;
    let cin = cell(row, mapping.get(Field::Cin)).ok_or("missing cin")?;

    let sexe_raw = cell(row, mapping.get(Field::Sexe)).ok_or("missing sexe")?;
    let sexe = parse_gender(sexe_raw).ok_or_else(|| format!("invalid sexe '{sexe_raw}'"))?;

    let date_entree = match cell(row, mapping.get(Field::DateEntree)) {
        Some(raw) => parse_date(raw).ok_or_else(|| format!("invalid dateEntree '{raw}'"))?,
        None => today,
    };

    let now = Utc::now();
    Ok(Worker {
        id: new_id(),
        nom: nom.to_string(),
        cin: normalize_cin(cin),
        matricule: cell(row, mapping.get(Field::Matricule)).map(str::to_string),
        ferme_id: ferme_id.to_string(),
        chambre: cell(row, mapping.get(Field::Chambre)).map(str::to_string),
        secteur: cell(row, mapping.get(Field::Secteur)).map(str::to_string),
        sexe,
        date_entree: Some(date_entree),
        date_sortie: None,
        motif_sortie: None,
        statut: Statut::Actif,
        supervisor_id: None,
        created_at: Some(now),
        updated_at: Some(now),
    })
}

// ---
// SERVICE
// ---

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn DocumentStore>,
    workers: Repository<Worker>,
    occupancy: OccupancyService,
}

impl ImportService {
    pub fn new(store: Arc<dyn DocumentStore>, occupancy: OccupancyService) -> Self {
        Self {
            workers: Repository::new(store.clone()),
            store,
            occupancy,
        }
    }

    pub async fn import_workers(&self, ferme_id: &str, payload: ImportWorkersPayload) -> Result<ImportReport, AppError> {
        let column_count = payload
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(payload.headers.len()))
            .max()
            .unwrap_or(0);
        let mapping = map_columns(&payload.headers, column_count);

        // (line number, cells); line 1 is the header row unless it holds data
        let mut lines: Vec<(usize, &[String])> = Vec::with_capacity(payload.rows.len() + 1);
        if mapping.headers_are_data {
            lines.push((1, payload.headers.as_slice()));
        }
        let first_data_line = if payload.headers.is_empty() { 1 } else { 2 };
        lines.extend(payload.rows.iter().enumerate().map(|(i, row)| (first_data_line + i, row.as_slice())));

        let mut known: HashSet<String> = self
            .workers
            .list_where(|w| w.ferme_id == ferme_id)
            .await?
            .iter()
            .map(|w| normalize_cin(&w.cin))
            .collect();

        let today = Utc::now().date_naive();
        let mut accepted: Vec<Worker> = Vec::new();
        let mut skipped: Vec<SkippedRow> = Vec::new();

        for (line, row) in lines {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match parse_row(row, &mapping, ferme_id, today) {
                Ok(worker) if !known.insert(worker.cin.clone()) => skipped.push(SkippedRow {
                    row: line,
                    reason: format!("cin {} already exists", worker.cin),
                }),
                Ok(worker) => accepted.push(worker),
                Err(reason) => skipped.push(SkippedRow { row: line, reason }),
            }
        }

        let report = ImportReport {
            imported: accepted.len(),
            skipped,
            column_mapping: mapping
                .columns
                .iter()
                .map(|(field, idx)| (field.name().to_string(), *idx))
                .collect::<BTreeMap<_, _>>(),
            matched_by_position: mapping.by_position,
            dry_run: payload.dry_run,
        };

        if payload.dry_run || accepted.is_empty() {
            tracing::info!(ferme_id, imported = report.imported, skipped = report.skipped.len(), dry_run = payload.dry_run, "Worker import evaluated");
            return Ok(report);
        }

        let mut batch = WriteBatch::new();
        for worker in &accepted {
            batch.set(worker)?;
        }
        self.store.commit(batch).await?;

        tracing::info!(
            ferme_id,
            imported = report.imported,
            skipped = report.skipped.len(),
            by_position = report.matched_by_position,
            "📥 Workers imported"
        );

        let keys: Vec<_> = accepted
            .iter()
            .filter_map(|w| w.chambre.as_deref().map(|c| room_key(&w.ferme_id, c)))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if let Err(e) = self.occupancy.reconcile_keys(&keys).await {
            tracing::warn!(ferme_id, error = %e, "Room resync after import failed");
        }

        Ok(report)
    }
}
