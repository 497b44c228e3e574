//! Application-facing lead shape and raw-record mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crm::schema;
use crate::identity::InitiativeDirectory;

/// Lead lifecycle status. Unknown upstream codes map to `Unknown`, never to
/// null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Disqualified,
    Unknown,
}

impl LeadStatus {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => LeadStatus::New,
            Some(2) => LeadStatus::Contacted,
            Some(3) => LeadStatus::Qualified,
            Some(4) => LeadStatus::Disqualified,
            _ => LeadStatus::Unknown,
        }
    }
}

/// How the lead reached the program. Unknown upstream codes map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadSource {
    Advertisement,
    Referral,
    Partner,
    Web,
    WordOfMouth,
    Other,
}

impl LeadSource {
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => LeadSource::Advertisement,
            Some(2) | Some(3) => LeadSource::Referral,
            Some(4) => LeadSource::Partner,
            Some(8) => LeadSource::Web,
            Some(9) => LeadSource::WordOfMouth,
            _ => LeadSource::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub source: LeadSource,
    pub created_on: Option<DateTime<Utc>>,
    /// Internal initiative id; empty when the record's tenant GUID does not
    /// resolve (the page still returns).
    pub initiative: String,
    pub organization_id: Option<String>,
}

/// Mapping result carrying the raw tenant GUID for verification and audit.
#[derive(Debug, Clone)]
pub struct MappedLead {
    pub lead: Lead,
    pub tenant_guid: Option<String>,
    pub tenant_resolved: bool,
}

impl Lead {
    pub fn from_record(record: &Value, directory: &InitiativeDirectory) -> MappedLead {
        let tenant_guid = record[schema::FIELD_TENANT].as_str().map(str::to_string);
        let initiative = tenant_guid
            .as_deref()
            .and_then(|guid| directory.initiative_id_from_guid(guid))
            .map(str::to_string);
        let tenant_resolved = initiative.is_some();

        let lead = Lead {
            id: record[schema::FIELD_ID].as_str().unwrap_or_default().to_string(),
            name: record[schema::FIELD_NAME].as_str().unwrap_or_default().to_string(),
            email: record[schema::FIELD_EMAIL].as_str().map(str::to_string),
            phone: record[schema::FIELD_PHONE].as_str().map(str::to_string),
            status: LeadStatus::from_code(record[schema::FIELD_STATUS].as_i64()),
            source: LeadSource::from_code(record[schema::FIELD_SOURCE].as_i64()),
            created_on: record[schema::FIELD_CREATED_ON]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            initiative: initiative.unwrap_or_default(),
            organization_id: record[schema::FIELD_ORG_DIRECT].as_str().map(str::to_string),
        };

        MappedLead {
            lead,
            tenant_guid,
            tenant_resolved,
        }
    }
}
