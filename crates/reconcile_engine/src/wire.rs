//! Wire schema of the `/upload` endpoint and its normalization into
//! [`ProcessedReport`].
//!
//! Success: `{ totals, professionals, users, professional_data, user_data }`.
//! Failure: `{ error, details? }`, with any HTTP status.
//!
//! `user_data.query_validation` is not a user: it carries the Query-side
//! reconciliation summary and is split out into [`QueryValidation`].
use std::collections::BTreeMap;

use reconcile_core::{ColumnMapping, EntityReport, ProcessedReport, QueryValidation, Totals};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{FailureKind, UploadError};

/// Parses an `/upload` response body. Transport status and payload `error`
/// are both checked.
pub fn parse_report_body(status: u16, body: &str) -> Result<ProcessedReport, UploadError> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        UploadError::new(
            FailureKind::BadResponse,
            format!("server returned a non-JSON response (http {status}): {err}"),
        )
    })?;

    if let Some(message) = value.get("error").and_then(error_text) {
        if message.to_lowercase().contains(SERVER_CANCELLED_MARKER) {
            return Err(UploadError::new(FailureKind::ServerCancelled, message));
        }
        let mut error = UploadError::new(FailureKind::ServerReported { status }, message);
        if let Some(details) = value.get("details") {
            if let Ok(details) = WireErrorDetails::deserialize(details) {
                error.crystal_columns = details.crystal_columns;
                error.query_columns = details.query_columns;
            }
        }
        return Err(error);
    }

    if !(200..300).contains(&status) {
        return Err(UploadError::new(
            FailureKind::ServerReported { status },
            format!("server returned http {status}"),
        ));
    }

    if value.get("totals").is_none() {
        let message = if value.get("records").is_some() || value.get("stats").is_some() {
            "unsupported response shape: records/stats"
        } else {
            "response is missing `totals`"
        };
        return Err(UploadError::new(FailureKind::BadResponse, message));
    }

    let malformed = |err: serde_json::Error| {
        UploadError::new(FailureKind::BadResponse, format!("malformed report: {err}"))
    };
    WireReport::deserialize(value)
        .map_err(malformed)?
        .normalize()
        .map_err(malformed)
}

/// The server's wording when it stopped a process on request.
const SERVER_CANCELLED_MARKER: &str = "cancelado";
const QUERY_VALIDATION_KEY: &str = "query_validation";

fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Non-negative count; tolerates `12.0` and `"12"` as produced by dataframe exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Count(u64);

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let parsed = match &value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            }),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .map(Count)
            .ok_or_else(|| D::Error::custom(format!("expected a count, got {value}")))
    }
}

/// One entry of a name list. Spreadsheet exports produce `null` cells and
/// numeric ids; those must not sink the whole report.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Name(Option<String>);

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        };
        Ok(Name(name))
    }
}

fn names(list: Vec<Name>) -> Vec<String> {
    list.into_iter().filter_map(|name| name.0).collect()
}

#[derive(Debug, Default, Deserialize)]
struct WireErrorDetails {
    #[serde(default)]
    crystal_columns: Vec<String>,
    #[serde(default)]
    query_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireReport {
    totals: WireTotals,
    #[serde(default)]
    professionals: Option<Vec<Name>>,
    #[serde(default)]
    users: Option<Vec<Name>>,
    #[serde(default)]
    usuarios_query: Option<Vec<Name>>,
    #[serde(default)]
    professional_data: BTreeMap<String, WireEntity>,
    #[serde(default)]
    user_data: BTreeMap<String, Value>,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    column_mapping: Option<WireColumnMapping>,
}

#[derive(Debug, Deserialize)]
struct WireTotals {
    #[serde(default)]
    total_services_crystal: Count,
    #[serde(default)]
    total_services_query: Count,
    #[serde(default)]
    num_professionals: Count,
    #[serde(default)]
    num_users: Option<Count>,
    #[serde(default)]
    num_users_crystal: Option<Count>,
    #[serde(default)]
    servicios_por_categoria: BTreeMap<String, Count>,
}

#[derive(Debug, Default, Deserialize)]
struct WireEntity {
    #[serde(default)]
    total_servicios: Option<Count>,
    #[serde(default)]
    total_usuarios: Option<Count>,
    #[serde(default)]
    servicios_por_categoria: BTreeMap<String, Count>,
    #[serde(default)]
    servicios_detallados: Option<WireDetailed>,
    #[serde(default)]
    download_link: Option<String>,
    #[serde(default)]
    nombre_archivo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireQueryValidation {
    #[serde(default)]
    total_usuarios: Count,
    #[serde(default)]
    usuarios_en_crystal: Count,
    #[serde(default)]
    usuarios_solo_query: Count,
    #[serde(default)]
    download_link: Option<String>,
    #[serde(default)]
    nombre_archivo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireDetailed {
    ByName(BTreeMap<String, Count>),
    Rows(Vec<WireDetailRow>),
}

#[derive(Debug, Deserialize)]
struct WireDetailRow {
    servicio: String,
    #[serde(default)]
    cantidad: Count,
}

#[derive(Debug, Deserialize)]
struct WireColumnMapping {
    crystal: WireCrystalColumns,
}

#[derive(Debug, Deserialize)]
struct WireCrystalColumns {
    profesional: String,
    servicio: String,
}

impl WireReport {
    fn normalize(mut self) -> Result<ProcessedReport, serde_json::Error> {
        let query_validation = self
            .user_data
            .remove(QUERY_VALIDATION_KEY)
            .map(WireQueryValidation::deserialize)
            .transpose()?
            .map(|summary| QueryValidation {
                total_users: summary.total_usuarios.0,
                users_in_crystal: summary.usuarios_en_crystal.0,
                users_only_in_query: summary.usuarios_solo_query.0,
                download_link: non_blank(summary.download_link),
                file_name: non_blank(summary.nombre_archivo),
            });
        let user_data = self
            .user_data
            .into_iter()
            .map(|(name, value)| WireEntity::deserialize(value).map(|entity| (name, entity)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let professionals = match self.professionals {
            Some(list) => names(list),
            None => self.professional_data.keys().cloned().collect(),
        };
        let users = match self.users.or(self.usuarios_query) {
            Some(list) => names(list),
            None => user_data.keys().cloned().collect(),
        };

        Ok(ProcessedReport {
            totals: Totals {
                total_services_crystal: self.totals.total_services_crystal.0,
                total_services_query: self.totals.total_services_query.0,
                num_professionals: self.totals.num_professionals.0,
                num_users: self
                    .totals
                    .num_users_crystal
                    .or(self.totals.num_users)
                    .unwrap_or_default()
                    .0,
                services_by_category: counts(self.totals.servicios_por_categoria),
            },
            professionals,
            users,
            professional_data: entities(self.professional_data),
            user_data: entities(user_data),
            query_validation,
            warning: self.warning.filter(|w| !w.trim().is_empty()),
            column_mapping: self.column_mapping.map(|mapping| ColumnMapping {
                professional: mapping.crystal.profesional,
                service: mapping.crystal.servicio,
            }),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn counts(map: BTreeMap<String, Count>) -> Vec<(String, u64)> {
    map.into_iter().map(|(name, count)| (name, count.0)).collect()
}

fn entities(map: BTreeMap<String, WireEntity>) -> BTreeMap<String, EntityReport> {
    map.into_iter()
        .map(|(name, entity)| {
            let detailed_services = match entity.servicios_detallados {
                Some(WireDetailed::ByName(map)) => counts(map),
                Some(WireDetailed::Rows(rows)) => rows
                    .into_iter()
                    .map(|row| (row.servicio, row.cantidad.0))
                    .collect(),
                None => Vec::new(),
            };
            let report = EntityReport {
                total_services: entity.total_servicios.map(|c| c.0),
                total_users: entity.total_usuarios.map(|c| c.0),
                services_by_category: counts(entity.servicios_por_categoria),
                detailed_services,
                download_link: non_blank(entity.download_link),
                file_name: non_blank(entity.nombre_archivo),
            };
            (name, report)
        })
        .collect()
}
