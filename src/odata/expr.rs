//! Pure string-building primitives for OData `$filter` expressions.
//!
//! Two rules hold for every function here: string values are interpolated
//! only through [`quoted`] (single quotes doubled), and field names are
//! validated against an identifier pattern before concatenation. There is no
//! other interpolation path.

use chrono::{DateTime, Utc};

use super::ODataError;

/// Comparison operators supported by the lead-read path. Not a full OData
/// grammar by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_odata(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }
}

/// Double embedded single quotes. The escaped form is reversible: collapsing
/// doubled quotes recovers the original value.
pub fn escape_quotes(value: &str) -> String {
    value.replace('\'', "''")
}

/// Escape and single-quote a string value for interpolation.
pub fn quoted(value: &str) -> String {
    format!("'{}'", escape_quotes(value))
}

/// Field identifiers must match `[A-Za-z_][A-Za-z0-9_./]*`. This guards
/// against structural injection via a misconfigured field-name constant, not
/// against callers (field names are never caller-controlled).
pub fn validate_identifier(name: &str) -> Result<(), ODataError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_first || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '/') {
        return Err(ODataError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// `field op 'value'`
pub fn comparison(field: &str, op: CompareOp, value: &str) -> Result<String, ODataError> {
    validate_identifier(field)?;
    Ok(format!("{} {} {}", field, op.as_odata(), quoted(value)))
}

/// Comparison against a raw (unquoted) literal, for enum/int-typed fields.
pub fn comparison_raw(field: &str, op: CompareOp, literal: i64) -> Result<String, ODataError> {
    validate_identifier(field)?;
    Ok(format!("{} {} {}", field, op.as_odata(), literal))
}

/// `contains(field,'value')`
pub fn contains(field: &str, value: &str) -> Result<String, ODataError> {
    validate_identifier(field)?;
    Ok(format!("contains({},{})", field, quoted(value)))
}

/// `field in ('a','b',...)`
pub fn in_list(field: &str, values: &[&str]) -> Result<String, ODataError> {
    validate_identifier(field)?;
    if values.is_empty() {
        return Err(ODataError::EmptyValueList(field.to_string()));
    }
    let quoted_values: Vec<String> = values.iter().map(|v| quoted(v)).collect();
    Ok(format!("{} in ({})", field, quoted_values.join(",")))
}

/// `field ge <from> and field le <to>` - datetime literals are unquoted in
/// OData v4.
pub fn date_range(
    field: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Option<String>, ODataError> {
    validate_identifier(field)?;
    let mut parts = vec![];
    if let Some(from) = from {
        parts.push(format!("{} ge {}", field, from.to_rfc3339()));
    }
    if let Some(to) = to {
        parts.push(format!("{} le {}", field, to.to_rfc3339()));
    }
    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(parts.join(" and ")))
}

/// `nav/any(alias:alias/field eq 'value')` - sub-query over a junction
/// (many-to-many) navigation property.
pub fn any_expr(nav: &str, alias: &str, field: &str, value: &str) -> Result<String, ODataError> {
    validate_identifier(nav)?;
    validate_identifier(alias)?;
    validate_identifier(field)?;
    Ok(format!(
        "{}/any({}:{}/{} eq {})",
        nav,
        alias,
        alias,
        field,
        quoted(value)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_doubles_every_quote() {
        assert_eq!(escape_quotes("O'Brien"), "O''Brien");
        assert_eq!(escape_quotes("a''b"), "a''''b");
        assert_eq!(escape_quotes("plain"), "plain");
    }

    #[test]
    fn escape_round_trip() {
        let original = "it's a 'test' value";
        let escaped = escape_quotes(original);
        assert_eq!(escaped.replace("''", "'"), original);
    }

    #[test]
    fn quoted_wraps_escaped_value() {
        assert_eq!(quoted("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn identifier_accepts_navigation_paths() {
        assert!(validate_identifier("_ec_initiative_value").is_ok());
        assert!(validate_identifier("ec_lead_organization/accountid").is_ok());
        assert!(validate_identifier("a.b").is_ok());
    }

    #[test]
    fn identifier_rejects_structural_characters() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1field").is_err());
        assert!(validate_identifier("field eq 'x' or 1").is_err());
        assert!(validate_identifier("field)").is_err());
    }

    #[test]
    fn comparison_builds_escaped_predicate() {
        let expr = comparison("fullname", CompareOp::Eq, "O'Brien").unwrap();
        assert_eq!(expr, "fullname eq 'O''Brien'");
    }

    #[test]
    fn contains_builds_escaped_predicate() {
        let expr = contains("fullname", "o'b").unwrap();
        assert_eq!(expr, "contains(fullname,'o''b')");
    }

    #[test]
    fn in_list_rejects_empty() {
        assert!(in_list("statuscode", &[]).is_err());
        let expr = in_list("statuscode", &["1", "2"]).unwrap();
        assert_eq!(expr, "statuscode in ('1','2')");
    }

    #[test]
    fn any_builds_junction_sub_query() {
        let expr = any_expr("ec_lead_organization", "o", "accountid", "org-1").unwrap();
        assert_eq!(expr, "ec_lead_organization/any(o:o/accountid eq 'org-1')");
    }

    #[test]
    fn date_range_none_when_unbounded() {
        assert_eq!(date_range("createdon", None, None).unwrap(), None);
    }
}
