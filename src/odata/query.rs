//! OData query-string assembly and next-link parsing.

use url::Url;

/// Assembled query options for one upstream request. Select/expand lists are
/// fixed at the call site, never caller-influenced.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<String>,
    pub select: Vec<&'static str>,
    pub expand: Option<String>,
    pub order_by: Option<String>,
    pub top: Option<i32>,
    pub skip: Option<i32>,
    pub count: bool,
}

impl QueryOptions {
    /// Render as query pairs for the HTTP layer. Ordering is stable so that
    /// request logs stay diffable.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![];
        if let Some(ref filter) = self.filter {
            pairs.push(("$filter".to_string(), filter.clone()));
        }
        if !self.select.is_empty() {
            pairs.push(("$select".to_string(), self.select.join(",")));
        }
        if let Some(ref expand) = self.expand {
            pairs.push(("$expand".to_string(), expand.clone()));
        }
        if let Some(ref order_by) = self.order_by {
            pairs.push(("$orderby".to_string(), order_by.clone()));
        }
        if let Some(top) = self.top {
            pairs.push(("$top".to_string(), top.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("$skip".to_string(), skip.to_string()));
        }
        if self.count {
            pairs.push(("$count".to_string(), "true".to_string()));
        }
        pairs
    }
}

/// Reduce an `@odata.nextLink` URL to an opaque continuation token. Callers
/// never see upstream URLs; unknown link shapes yield no token rather than
/// an error.
pub fn next_page_token(next_link: &str) -> Option<String> {
    let url = Url::parse(next_link).ok()?;
    for (key, value) in url.query_pairs() {
        if key == "$skiptoken" || key == "$skip" {
            return Some(value.into_owned());
        }
    }
    None
}
