//! Medical record models.

use serde::{Deserialize, Serialize};

/// Plausible physiological temperature range for clinic patients, °C.
pub const TEMPERATURE_MIN_C: f64 = 35.0;
pub const TEMPERATURE_MAX_C: f64 = 45.0;

/// Kind of consultation a record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationType {
    Routine,
    Vaccination,
    Emergency,
    Surgery,
    FollowUp,
}

impl ConsultationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationType::Routine => "ROUTINE",
            ConsultationType::Vaccination => "VACCINATION",
            ConsultationType::Emergency => "EMERGENCY",
            ConsultationType::Surgery => "SURGERY",
            ConsultationType::FollowUp => "FOLLOW_UP",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ROUTINE" => Some(ConsultationType::Routine),
            "VACCINATION" => Some(ConsultationType::Vaccination),
            "EMERGENCY" => Some(ConsultationType::Emergency),
            "SURGERY" => Some(ConsultationType::Surgery),
            "FOLLOW_UP" => Some(ConsultationType::FollowUp),
            _ => None,
        }
    }
}

/// A clinical record authored by a veterinarian (or staff/admin on their
/// behalf). Records are the clinic's audit trail: the referenced pet and
/// author cannot be deleted while records point at them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    /// UUID, generated locally
    pub id: String,
    /// The pet this record belongs to
    pub pet_id: String,
    /// Authoring user
    pub veterinarian_id: String,
    /// When the consultation happened, "YYYY-MM-DD HH:MM:SS"
    pub consulted_at: String,
    /// Kind of consultation
    pub consultation_type: ConsultationType,
    /// Measured weight in kg, if taken
    pub weight_kg: Option<f64>,
    /// Measured temperature in °C, if taken
    pub temperature_c: Option<f64>,
    /// Reported symptoms
    pub symptoms: Option<String>,
    /// Diagnosis
    pub diagnosis: Option<String>,
    /// Treatment performed or planned
    pub treatment: Option<String>,
    /// Prescription text
    pub prescription: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl MedicalRecord {
    /// Create a new record with required fields.
    pub fn new(
        pet_id: String,
        veterinarian_id: String,
        consulted_at: String,
        consultation_type: ConsultationType,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pet_id,
            veterinarian_id,
            consulted_at,
            consultation_type,
            weight_kg: None,
            temperature_c: None,
            symptoms: None,
            diagnosis: None,
            treatment: None,
            prescription: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Weight must be strictly positive when present.
    pub fn weight_is_valid(&self) -> bool {
        self.weight_kg.map_or(true, |w| w > 0.0)
    }

    /// Temperature must fall in the plausible physiological range when
    /// present.
    pub fn temperature_is_valid(&self) -> bool {
        self.temperature_c
            .map_or(true, |t| (TEMPERATURE_MIN_C..=TEMPERATURE_MAX_C).contains(&t))
    }
}
