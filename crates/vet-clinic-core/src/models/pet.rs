//! Pet models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Biological sex of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::M => "M",
            Sex::F => "F",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "M" => Some(Sex::M),
            "F" => Some(Sex::F),
            _ => None,
        }
    }
}

/// A pet registered at the clinic. Always owned by exactly one tutor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    /// UUID, generated locally
    pub id: String,
    /// Owning user (tutor). Reassignable only by admin/staff.
    pub tutor_id: String,
    /// Pet name
    pub name: String,
    /// Species (e.g., "canine", "feline")
    pub species: String,
    /// Breed
    pub breed: Option<String>,
    /// Date of birth, "YYYY-MM-DD". Never in the future.
    pub birth_date: Option<String>,
    /// Sex
    pub sex: Sex,
    /// Additional notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Pet {
    /// Create a new pet with required fields.
    pub fn new(tutor_id: String, name: String, species: String, sex: Sex) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tutor_id,
            name,
            species,
            breed: None,
            birth_date: None,
            sex,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Parse the stored birth date, if any.
    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Check whether the given user is this pet's tutor.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.tutor_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pet() {
        let pet = Pet::new("tutor-1".into(), "Max".into(), "canine".into(), Sex::M);
        assert_eq!(pet.name, "Max");
        assert_eq!(pet.id.len(), 36);
        assert!(pet.is_owned_by("tutor-1"));
        assert!(!pet.is_owned_by("tutor-2"));
    }

    #[test]
    fn test_birth_date_parsing() {
        let mut pet = Pet::new("tutor-1".into(), "Luna".into(), "feline".into(), Sex::F);
        assert!(pet.birth_date().is_none());

        pet.birth_date = Some("2020-06-15".into());
        assert_eq!(
            pet.birth_date(),
            NaiveDate::from_ymd_opt(2020, 6, 15)
        );

        pet.birth_date = Some("15/06/2020".into());
        assert!(pet.birth_date().is_none());
    }

    #[test]
    fn test_sex_tokens() {
        assert_eq!(Sex::parse("M"), Some(Sex::M));
        assert_eq!(Sex::parse("F"), Some(Sex::F));
        assert_eq!(Sex::parse("x"), None);
        assert_eq!(serde_json::to_string(&Sex::F).unwrap(), "\"F\"");
    }
}
