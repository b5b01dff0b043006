use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==================================================================================================
// Create Lead
// ==================================================================================================

/// Payload for `POST /api/v1/leads`. Field names match the CRM wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub title: String,
    pub description: String,
    /// Monetary value, transported as a string by the CRM
    pub lead_value: String,
    pub lead_source_id: u32,
    pub lead_type_id: u32,
    pub person: LeadPerson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl CreateLeadRequest {
    #[allow(dead_code)]
    pub fn new(
        title: String,
        description: String,
        lead_value: String,
        lead_source_id: u32,
        lead_type_id: u32,
        person: LeadPerson,
    ) -> Self {
        Self {
            title,
            description,
            lead_value,
            lead_source_id,
            lead_type_id,
            person,
            expected_close_date: None,
            products: None,
            entity_type: None,
        }
    }
}

/// Contact person attached to a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadPerson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<LabeledValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_numbers: Option<Vec<LabeledValue>>,
}

impl LeadPerson {
    #[allow(dead_code)]
    pub fn new(name: String) -> Self {
        Self {
            name,
            emails: None,
            contact_numbers: None,
        }
    }
}

/// Labeled contact entry, e.g. `{"value": "a@b.com", "label": "work"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledValue {
    pub value: String,
    pub label: String,
}

// ==================================================================================================
// List Leads
// ==================================================================================================

/// Query parameters for `GET /api/v1/leads`. Every field is optional and
/// an absent field is omitted from the query string entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListLeadsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}
