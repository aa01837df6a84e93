use std::fmt;

use serde::Deserializer;
use serde::{Deserialize, Serialize};

pub use crate::types::{CityName, DocumentDate, LicenseType, RecordId};

/// License status. The backend only ever stores one of these values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// License granted.
    Aprovada,
    /// Prior consultation filed.
    Consulta,
    /// Under review.
    #[serde(rename = "Análise", alias = "Analise")]
    Analise,
}

impl Status {
    /// All statuses in display order.
    pub const ALL: [Status; 3] = [Status::Aprovada, Status::Consulta, Status::Analise];

    /// Value as stored in the backend `status` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Aprovada => "Aprovada",
            Status::Consulta => "Consulta",
            Status::Analise => "Análise",
        }
    }

    /// Parse a stored status value. Accepts the unaccented spelling of `Análise`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Aprovada" => Some(Status::Aprovada),
            "Consulta" => Some(Status::Consulta),
            "Análise" | "Analise" => Some(Status::Analise),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees north, within [-90, 90].
    pub latitude: f64,
    /// Degrees east, within [-180, 180].
    pub longitude: f64,
}

/// Canonical construction license record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Backend identifier. Integer ids are normalized to strings.
    #[serde(deserialize_with = "de_record_id")]
    pub id: RecordId,
    /// Name of the source document.
    #[serde(rename = "Nome do Arquivo", default)]
    pub file_name: String,
    /// Document date exactly as stored (usually `YYYY/MM/DD`).
    #[serde(rename = "Data", default)]
    pub date: DocumentDate,
    /// License type label, e.g. `LAO`.
    #[serde(rename = "Tipo de Licença", default)]
    pub license_type: LicenseType,
    /// Company tax id (CNPJ) as written.
    #[serde(rename = "CNPJ", default)]
    pub tax_id: String,
    /// Street address.
    #[serde(rename = "Endereço", default)]
    pub address: String,
    /// Company holding the license.
    #[serde(rename = "Nome da Empresa", default)]
    pub company_name: String,
    /// City name.
    #[serde(rename = "Cidade", default)]
    pub city: CityName,
    /// Built area in square meters. Unparseable backend values decode as `None`.
    #[serde(rename = "Área Construída", default, deserialize_with = "de_area")]
    pub built_area: Option<f64>,
    /// Lot area in square meters.
    #[serde(rename = "Área do Terreno", default, deserialize_with = "de_area")]
    pub lot_area: Option<f64>,
    /// Latitude; `None`, zero, or out of range means unmapped.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude; `None`, zero, or out of range means unmapped.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// License status.
    pub status: Status,
}

impl Record {
    /// Position of this record when it can be placed on a map.
    ///
    /// Missing, zero, non-finite, and out-of-range coordinates all count as
    /// "unmapped"; such records still appear in list rendering.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        let latitude = self.latitude?;
        let longitude = self.longitude?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 || longitude == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(GeoPoint {
            latitude,
            longitude,
        })
    }

    /// Returns `true` when the record can be placed on a map.
    pub fn is_mapped(&self) -> bool {
        self.coordinates().is_some()
    }
}

fn de_record_id<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(text) => Ok(text),
        RawId::Integer(value) => Ok(value.to_string()),
    }
}

fn de_area<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawArea {
        Number(f64),
        Text(String),
    }

    let raw = Option::<RawArea>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawArea::Number(value)) if value.is_finite() => Some(value),
        Some(RawArea::Number(_)) => None,
        Some(RawArea::Text(text)) => parse_area(&text),
    })
}

/// Parse a human-entered area value.
///
/// Accepts plain numbers (`350`, `350.5`), Brazilian formatting (`1.234,50`),
/// and an optional trailing unit (`120 m²`). Returns `None` for anything else.
pub fn parse_area(text: &str) -> Option<f64> {
    let trimmed = text
        .trim()
        .trim_end_matches("m²")
        .trim_end_matches("m2")
        .trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else if trimmed.matches('.').count() > 1 {
        trimmed.replace('.', "")
    } else {
        trimmed.to_string()
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
