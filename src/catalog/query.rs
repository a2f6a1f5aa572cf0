//! Capture-index query construction and response parsing
//!
//! The archive's CDX endpoint takes its parameters in the query string and,
//! with `output=json`, answers with a positional JSON array: the first row
//! names the fields, every following row is a capture. An empty body or a
//! header-only array both mean "no matches".

use crate::model::Capture;

/// Builder for capture-index query URLs.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    endpoint: String,
    url_pattern: String,
    fields: Vec<String>,
    filters: Vec<String>,
    collapse: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    limit: Option<usize>,
    sort: Option<String>,
}

impl CatalogQuery {
    /// Starts a query against `endpoint` for captures matching `url_pattern`.
    pub fn new(endpoint: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            url_pattern: url_pattern.into(),
            fields: Vec::new(),
            filters: Vec::new(),
            collapse: None,
            from_date: None,
            to_date: None,
            limit: None,
            sort: None,
        }
    }

    /// All captures under a domain (wildcard suffix).
    pub fn for_domain(endpoint: impl Into<String>, domain: &str) -> Self {
        Self::new(endpoint, format!("{}/*", domain))
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn collapse(mut self, field: impl Into<String>) -> Self {
        self.collapse = Some(field.into());
        self
    }

    pub fn from_date(mut self, date: impl Into<String>) -> Self {
        self.from_date = Some(date.into());
        self
    }

    pub fn to_date(mut self, date: impl Into<String>) -> Self {
        self.to_date = Some(date.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort order, e.g. `timestamp:asc`.
    pub fn sort(mut self, order: impl Into<String>) -> Self {
        self.sort = Some(order.into());
        self
    }

    /// Builds the final request URL.
    pub fn build(&self) -> String {
        let mut params = vec![
            format!("url={}", encode_pattern(&self.url_pattern)),
            "output=json".to_string(),
        ];
        if !self.fields.is_empty() {
            params.push(format!("fl={}", self.fields.join(",")));
        }
        for filter in &self.filters {
            params.push(format!("filter={}", filter));
        }
        if let Some(collapse) = &self.collapse {
            params.push(format!("collapse={}", collapse));
        }
        if let Some(from) = &self.from_date {
            params.push(format!("from={}", from));
        }
        if let Some(to) = &self.to_date {
            params.push(format!("to={}", to));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        if let Some(sort) = &self.sort {
            params.push(format!("sort={}", sort));
        }
        format!("{}?{}", self.endpoint, params.join("&"))
    }
}

/// Percent-encodes a URL pattern while leaving the CDX wildcard intact.
fn encode_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for byte in pattern.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'*' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Parses a positional-JSON index response into raw rows.
///
/// Returns an empty list for an empty body, a header-only response, or a
/// body that is not valid JSON; the caller treats all three as "no matches
/// in this window" and keeps going.
pub fn parse_rows(body: &str) -> Vec<Vec<String>> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Vec<String>>>(body) {
        Ok(rows) if rows.len() > 1 => rows,
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!("Malformed capture-index response: {}", e);
            Vec::new()
        }
    }
}

/// Converts an index response into `Capture` records, filtered to HTML pages
/// with HTTP status 200.
///
/// Fields are located by name from the header row, so the archive is free to
/// reorder them. Rows missing a required field are skipped.
pub fn parse_captures(body: &str) -> Vec<Capture> {
    let rows = parse_rows(body);
    let Some(header) = rows.first() else {
        return Vec::new();
    };

    let index_of = |name: &str| header.iter().position(|field| field == name);
    let (Some(ts_idx), Some(url_idx)) = (index_of("timestamp"), index_of("original")) else {
        tracing::warn!("Capture-index response is missing timestamp/original fields");
        return Vec::new();
    };
    let status_idx = index_of("statuscode");
    let mime_idx = index_of("mimetype");
    let digest_idx = index_of("digest");

    let field = |row: &[String], idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| row.get(i)).cloned()
    };

    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let timestamp = row.get(ts_idx)?.clone();
            let original_url = row.get(url_idx)?.clone();
            let status = field(row, status_idx).unwrap_or_else(|| "200".to_string());
            let mime = field(row, mime_idx).unwrap_or_else(|| "text/html".to_string());
            if !mime.contains("text/html") || status != "200" {
                return None;
            }
            let digest = field(row, digest_idx).filter(|d| d != "-");
            Some(Capture::new(original_url, timestamp, status, mime, digest))
        })
        .collect()
}
