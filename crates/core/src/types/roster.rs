//! Duty-roster types.
//!
//! A roster is an ordered list of [`WeekSchedule`]s, each naming the
//! pharmacies on duty for one calendar week. Field names accept the French
//! aliases used by historical roster files (`semaine`, `nom`, ...), so those
//! documents deserialize unchanged.

use serde::{Deserialize, Serialize};

use crate::week::{WeekInterval, WeekLabelError};

/// A pharmacy on duty for a given week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    /// Display name, unique within its week.
    #[serde(alias = "nom")]
    pub name: String,
    /// Free-form location text.
    #[serde(alias = "localisation", default)]
    pub location: String,
    /// Primary phone contact.
    #[serde(alias = "contact1", default)]
    pub primary_contact: String,
    /// Secondary phone contact.
    #[serde(alias = "contact2", default)]
    pub secondary_contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Pharmacy {
    /// Both coordinates, when the pharmacy has been geolocated.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// The pharmacies on duty for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    /// Week label, e.g. `"01/01/24 au 07/01/24"`.
    #[serde(alias = "semaine")]
    pub label: String,
    /// Pharmacies in display order.
    pub pharmacies: Vec<Pharmacy>,
}

impl WeekSchedule {
    /// Create a week schedule.
    #[must_use]
    pub fn new(label: impl Into<String>, pharmacies: Vec<Pharmacy>) -> Self {
        Self {
            label: label.into(),
            pharmacies,
        }
    }

    /// Parse the week label into a date interval.
    ///
    /// # Errors
    ///
    /// Returns a [`WeekLabelError`] if the label is malformed.
    pub fn interval(&self) -> Result<WeekInterval, WeekLabelError> {
        WeekInterval::parse(&self.label)
    }

    /// Name of the first pharmacy that appears more than once, if any.
    #[must_use]
    pub fn duplicate_pharmacy(&self) -> Option<&str> {
        self.pharmacies.iter().enumerate().find_map(|(i, p)| {
            self.pharmacies
                .iter()
                .skip(i + 1)
                .any(|other| other.name == p.name)
                .then_some(p.name.as_str())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pharmacy(name: &str) -> Pharmacy {
        Pharmacy {
            name: name.to_string(),
            location: "Centre-ville".to_string(),
            primary_contact: "0102030405".to_string(),
            secondary_contact: String::new(),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_deserializes_french_roster_fields() {
        let json = r#"{
            "semaine": "01/01/24 au 07/01/24",
            "pharmacies": [
                {"nom": "Pharmacie du Port", "localisation": "Quai 2",
                 "contact1": "0102", "contact2": "0304"}
            ]
        }"#;
        let week: WeekSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(week.label, "01/01/24 au 07/01/24");
        let p = &week.pharmacies[0];
        assert_eq!(p.name, "Pharmacie du Port");
        assert_eq!(p.location, "Quai 2");
        assert_eq!(p.primary_contact, "0102");
        assert_eq!(p.secondary_contact, "0304");
        assert!(p.coordinates().is_none());
    }

    #[test]
    fn test_duplicate_pharmacy_detection() {
        let week = WeekSchedule::new(
            "01/01/24 au 07/01/24",
            vec![pharmacy("A"), pharmacy("B"), pharmacy("A")],
        );
        assert_eq!(week.duplicate_pharmacy(), Some("A"));

        let week = WeekSchedule::new("01/01/24 au 07/01/24", vec![pharmacy("A"), pharmacy("B")]);
        assert_eq!(week.duplicate_pharmacy(), None);
    }
}
