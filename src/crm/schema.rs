//! Dynamics schema names for the lead-read path.
//!
//! These are the only field identifiers ever interpolated into queries, and
//! each one still passes identifier validation at build time.

/// Entity set for lead records.
pub const LEAD_ENTITY_SET: &str = "leads";

/// Active-record state value (`statecode eq 0`).
pub const STATE_ACTIVE: i64 = 0;

pub const FIELD_STATE: &str = "statecode";
pub const FIELD_STATUS: &str = "statuscode";
pub const FIELD_ID: &str = "leadid";
pub const FIELD_NAME: &str = "fullname";
pub const FIELD_EMAIL: &str = "emailaddress1";
pub const FIELD_PHONE: &str = "telephone1";
pub const FIELD_SOURCE: &str = "leadsourcecode";
pub const FIELD_CREATED_ON: &str = "createdon";

/// Lookup column carrying the initiative (tenant) GUID on each lead.
pub const FIELD_TENANT: &str = "_ec_initiative_value";

/// Direct organization lookup, used by category 100 (foster) organizations.
pub const FIELD_ORG_DIRECT: &str = "_ec_fosterorganization_value";

/// Junction navigation for category 200 (volunteer) organizations; target
/// rows are filtered with an `any()` sub-query.
pub const NAV_ORG_JUNCTION: &str = "ec_lead_volunteerorg";
pub const NAV_ORG_JUNCTION_ALIAS: &str = "o";
pub const FIELD_ORG_JUNCTION_ID: &str = "accountid";

/// Organization category codes carried in `organizationLeadType`.
pub const ORG_CATEGORY_FOSTER: u32 = 100;
pub const ORG_CATEGORY_VOLUNTEER: u32 = 200;

/// Fixed `$select` list for lead reads. Never caller-influenced.
pub const LEAD_SELECT: &[&str] = &[
    FIELD_ID,
    FIELD_NAME,
    FIELD_EMAIL,
    FIELD_PHONE,
    FIELD_STATUS,
    FIELD_SOURCE,
    FIELD_CREATED_ON,
    FIELD_TENANT,
    FIELD_ORG_DIRECT,
];

/// Fixed `$expand` clause for lead reads.
pub const LEAD_EXPAND: &str = "ec_lead_volunteerorg($select=accountid)";

/// External sort-field names mapped to internal columns. Unknown fields fall
/// back to the default sort; caller strings never reach `$orderby` directly.
pub const SORT_FIELDS: &[(&str, &str)] = &[
    ("name", FIELD_NAME),
    ("email", FIELD_EMAIL),
    ("status", FIELD_STATUS),
    ("createdOn", FIELD_CREATED_ON),
];

pub const DEFAULT_SORT: &str = "createdon desc";

pub fn sort_field(external: &str) -> Option<&'static str> {
    SORT_FIELDS
        .iter()
        .find(|(name, _)| *name == external)
        .map(|(_, internal)| *internal)
}
