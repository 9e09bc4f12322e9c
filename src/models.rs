use chrono::NaiveDateTime;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ============ Lead Records ============

/// Workflow state of the sales engagement with a prospect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    /// Not yet worked by sales.
    #[default]
    New,
    /// At least one contact attempt was made.
    Contacted,
    /// Deal closed.
    Closed,
    /// Prospect declined or was disqualified.
    Rejected,
}

impl LeadStatus {
    /// Wire representation (`NEW`, `CONTACTED`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "NEW",
            LeadStatus::Contacted => "CONTACTED",
            LeadStatus::Closed => "CLOSED",
            LeadStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    /// Case-insensitive, so `"contacted"` reads as `CONTACTED`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(LeadStatus::New),
            "CONTACTED" => Ok(LeadStatus::Contacted),
            "CLOSED" => Ok(LeadStatus::Closed),
            "REJECTED" => Ok(LeadStatus::Rejected),
            _ => Err(format!("Unknown lead status '{}'", s)),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored prospect as returned by the scoring backend.
///
/// Records are immutable snapshots: nothing in this crate mutates one after it
/// has been fetched. Categorical attributes are kept as the literal strings the
/// backend sent (`"yes"`, `"unknown"`, `""`, ...) without normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// Backend primary key, unique within a snapshot.
    pub id: i64,
    /// Age in years.
    #[serde(default)]
    pub age: u32,
    /// Job category (e.g. "admin.", "technician").
    #[serde(default)]
    pub job: String,
    /// Marital status.
    #[serde(default)]
    pub marital: String,
    /// Education level.
    #[serde(default)]
    pub education: String,
    /// Credit-default flag ("yes" / "no" / "unknown").
    #[serde(default)]
    pub default: String,
    /// Housing-loan flag.
    #[serde(default)]
    pub housing: String,
    /// Personal-loan flag.
    #[serde(default)]
    pub loan: String,
    /// Contact channel ("cellular" / "telephone").
    #[serde(default)]
    pub contact: String,
    /// Number of contacts performed during the campaign.
    #[serde(default)]
    pub campaign: u32,
    /// Last contact month of year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    /// Last contact day of the week.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<String>,
    /// Days since the client was last contacted in a previous campaign (999 = never).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdays: Option<i32>,
    /// Contacts performed before this campaign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<u32>,
    /// Outcome of the previous campaign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poutcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emp_var_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons_price_idx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons_conf_idx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub euribor3m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nr_employed: Option<f64>,
    /// Model probability that the prospect converts. Read it through [`LeadRecord::score`].
    #[serde(default)]
    pub prediction_score: Option<f64>,
    /// Model label ("Potential" / "Non-Potential").
    #[serde(default)]
    pub prediction_label: Option<String>,
    /// Sales workflow state, NEW when the backend omits it.
    #[serde(default, deserialize_with = "deserialize_status")]
    pub lead_status: LeadStatus,
    /// Legacy contacted flag kept by the backend.
    #[serde(default)]
    pub is_contacted: bool,
    /// Free-text sales notes.
    #[serde(default)]
    pub status_notes: Option<String>,
    /// Serialized explainability payload (JSON object feature -> contribution).
    #[serde(default)]
    pub shap_explanation: Option<String>,
    /// Creation timestamp on the backend (UTC, sent without offset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// Accepts `null` as well as a missing field for the status. An unknown value
/// is logged and read as NEW so one bad row cannot fail the whole snapshot.
fn deserialize_status<'de, D>(deserializer: D) -> Result<LeadStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(LeadStatus::default());
    };

    Ok(raw.parse().unwrap_or_else(|e| {
        tracing::warn!("{}, reading it as {}", e, LeadStatus::default());
        LeadStatus::default()
    }))
}

impl LeadRecord {
    /// Creates a record with the given id and score and every other field empty.
    pub fn new(id: i64, prediction_score: Option<f64>) -> Self {
        Self {
            id,
            age: 0,
            job: String::new(),
            marital: String::new(),
            education: String::new(),
            default: String::new(),
            housing: String::new(),
            loan: String::new(),
            contact: String::new(),
            campaign: 0,
            month: None,
            day_of_week: None,
            pdays: None,
            previous: None,
            poutcome: None,
            emp_var_rate: None,
            cons_price_idx: None,
            cons_conf_idx: None,
            euribor3m: None,
            nr_employed: None,
            prediction_score,
            prediction_label: None,
            lead_status: LeadStatus::New,
            is_contacted: false,
            status_notes: None,
            shap_explanation: None,
            created_at: None,
        }
    }

    /// Prediction score with missing, NaN and out-of-range values mapped to 0.
    pub fn score(&self) -> f64 {
        match self.prediction_score {
            Some(s) if s > 0.0 && s <= 1.0 => s,
            _ => 0.0,
        }
    }

    /// Parses the explainability payload.
    ///
    /// A malformed payload is logged and treated as absent.
    pub fn explanation(&self) -> Option<Explanation> {
        let raw = self.shap_explanation.as_deref()?;
        if raw.trim().is_empty() {
            return None;
        }

        match Explanation::parse(raw) {
            Ok(explanation) => Some(explanation),
            Err(e) => {
                tracing::warn!("Lead {}: ignoring explainability payload: {}", self.id, e);
                None
            }
        }
    }
}

// ============ Categorical Fields ============

/// Selects one categorical attribute of a [`LeadRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryField {
    Job,
    Marital,
    Education,
    Housing,
    Loan,
    Contact,
    Default,
}

impl CategoryField {
    /// Literal value of this field on `record`.
    pub fn value<'a>(&self, record: &'a LeadRecord) -> &'a str {
        match self {
            CategoryField::Job => &record.job,
            CategoryField::Marital => &record.marital,
            CategoryField::Education => &record.education,
            CategoryField::Housing => &record.housing,
            CategoryField::Loan => &record.loan,
            CategoryField::Contact => &record.contact,
            CategoryField::Default => &record.default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryField::Job => "job",
            CategoryField::Marital => "marital",
            CategoryField::Education => "education",
            CategoryField::Housing => "housing",
            CategoryField::Loan => "loan",
            CategoryField::Contact => "contact",
            CategoryField::Default => "default",
        }
    }
}

impl FromStr for CategoryField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" => Ok(CategoryField::Job),
            "marital" => Ok(CategoryField::Marital),
            "education" => Ok(CategoryField::Education),
            "housing" => Ok(CategoryField::Housing),
            "loan" => Ok(CategoryField::Loan),
            "contact" => Ok(CategoryField::Contact),
            "default" => Ok(CategoryField::Default),
            other => Err(format!("Unknown category field '{}'", other)),
        }
    }
}

// ============ Explainability ============

/// Contribution of one model feature to a lead's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureContribution {
    pub feature: String,
    /// Signed contribution; positive values push the score up.
    pub contribution: f64,
}

/// Parsed explainability payload, strongest contributions first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Explanation {
    pub contributions: Vec<FeatureContribution>,
}

/// Failure to read an explainability payload.
#[derive(Debug)]
pub enum ExplanationError {
    /// Payload is not a JSON object of feature name to number.
    Malformed(serde_json::Error),
}

impl fmt::Display for ExplanationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplanationError::Malformed(e) => write!(f, "Malformed explainability payload: {}", e),
        }
    }
}

impl std::error::Error for ExplanationError {}

impl Explanation {
    /// Parses a serialized `{"feature": contribution, ...}` object.
    ///
    /// Entries are ordered by absolute contribution, descending, then by feature name.
    pub fn parse(raw: &str) -> Result<Self, ExplanationError> {
        let mut explanation: Explanation =
            serde_json::from_str(raw).map_err(ExplanationError::Malformed)?;

        explanation.contributions.sort_by(|a, b| {
            b.contribution
                .abs()
                .total_cmp(&a.contribution.abs())
                .then_with(|| a.feature.cmp(&b.feature))
        });

        Ok(explanation)
    }

    /// Up to `n` features that raised the score the most.
    pub fn top_positive(&self, n: usize) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution > 0.0)
            .take(n)
            .collect()
    }

    /// Up to `n` features that lowered the score the most.
    pub fn top_negative(&self, n: usize) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution < 0.0)
            .take(n)
            .collect()
    }
}

impl<'de> Deserialize<'de> for Explanation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ExplanationVisitor;

        impl<'de> Visitor<'de> for ExplanationVisitor {
            type Value = Explanation;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping feature names to contributions")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = HashSet::new();
                let mut contributions = Vec::new();

                while let Some((feature, contribution)) = map.next_entry::<String, f64>()? {
                    if !seen.insert(feature.clone()) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate feature '{}'",
                            feature
                        )));
                    }
                    contributions.push(FeatureContribution {
                        feature,
                        contribution,
                    });
                }

                Ok(Explanation { contributions })
            }
        }

        deserializer.deserialize_map(ExplanationVisitor)
    }
}

// ============ Status Updates ============

/// Body of a status change forwarded to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub lead_status: LeadStatus,
    #[serde(default)]
    pub status_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_for_partial_shape() {
        let record: LeadRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "job": "admin.",
            "loan": "no",
            "created_at": "2025-08-14T09:30:12.482913"
        }))
        .unwrap();

        assert_eq!(record.lead_status, LeadStatus::New);
        assert_eq!(record.prediction_score, None);
        assert_eq!(record.score(), 0.0);
        assert_eq!(record.housing, "");
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_null_status_defaults_to_new() {
        let record: LeadRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "lead_status": null})).unwrap();
        assert_eq!(record.lead_status, LeadStatus::New);
    }

    #[test]
    fn test_unknown_status_does_not_fail_record() {
        let records: Vec<LeadRecord> = serde_json::from_value(serde_json::json!([
            {"id": 1, "lead_status": "contacted"},
            {"id": 2, "lead_status": "ARCHIVED"},
            {"id": 3, "lead_status": "CLOSED"}
        ]))
        .unwrap();

        assert_eq!(records[0].lead_status, LeadStatus::Contacted);
        assert_eq!(records[1].lead_status, LeadStatus::New);
        assert_eq!(records[2].lead_status, LeadStatus::Closed);
    }

    #[test]
    fn test_score_clamps_invalid_values() {
        assert_eq!(LeadRecord::new(1, Some(0.42)).score(), 0.42);
        assert_eq!(LeadRecord::new(1, Some(1.5)).score(), 0.0);
        assert_eq!(LeadRecord::new(1, Some(-0.1)).score(), 0.0);
        assert_eq!(LeadRecord::new(1, Some(f64::NAN)).score(), 0.0);
        assert_eq!(LeadRecord::new(1, None).score(), 0.0);
    }

    #[test]
    fn test_category_field_lookup() {
        let mut record = LeadRecord::new(1, None);
        record.job = "technician".to_string();
        record.default = "unknown".to_string();

        assert_eq!(CategoryField::Job.value(&record), "technician");
        assert_eq!(CategoryField::Default.value(&record), "unknown");
        assert_eq!("marital".parse::<CategoryField>(), Ok(CategoryField::Marital));
        assert!("salary".parse::<CategoryField>().is_err());
    }

    #[test]
    fn test_explanation_sorted_by_magnitude() {
        let explanation =
            Explanation::parse(r#"{"age": 0.1, "euribor3m": -0.4, "contact_telephone": 0.25}"#)
                .unwrap();

        let order: Vec<&str> = explanation
            .contributions
            .iter()
            .map(|c| c.feature.as_str())
            .collect();
        assert_eq!(order, vec!["euribor3m", "contact_telephone", "age"]);

        assert_eq!(explanation.top_positive(5).len(), 2);
        assert_eq!(explanation.top_negative(5)[0].feature, "euribor3m");
    }

    #[test]
    fn test_explanation_rejects_duplicates_and_garbage() {
        assert!(Explanation::parse(r#"{"age": 0.1, "age": 0.2}"#).is_err());
        assert!(Explanation::parse(r#"{"age": "high"}"#).is_err());
        assert!(Explanation::parse("[1, 2]").is_err());
        assert!(Explanation::parse("not json").is_err());
    }

    #[test]
    fn test_malformed_payload_treated_as_absent() {
        let mut record = LeadRecord::new(3, Some(0.5));
        record.shap_explanation = Some("{broken".to_string());
        assert!(record.explanation().is_none());

        record.shap_explanation = Some(r#"{"age": 0.3}"#.to_string());
        assert_eq!(record.explanation().unwrap().contributions.len(), 1);
    }
}
