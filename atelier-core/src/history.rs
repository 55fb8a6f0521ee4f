//! Generation history: tabs, filters, page queries and rows.

use crate::MediaKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// History tab. Each tab has its own filters, pages and cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryTab {
    Video,
    Image,
    ImageEnrichment,
}

impl HistoryTab {
    pub fn all() -> &'static [HistoryTab] {
        &[
            HistoryTab::Video,
            HistoryTab::Image,
            HistoryTab::ImageEnrichment,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            HistoryTab::Video => "Videos",
            HistoryTab::Image => "Images",
            HistoryTab::ImageEnrichment => "Enrichment",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryTab::Video => "video",
            HistoryTab::Image => "image",
            HistoryTab::ImageEnrichment => "image-enrichment",
        }
    }

    pub fn history_path(&self) -> &'static str {
        match self {
            HistoryTab::Video => "/api/videos/history",
            HistoryTab::Image => "/api/images/history",
            HistoryTab::ImageEnrichment => "/api/images/enrichment-history",
        }
    }

    pub fn search_path(&self) -> &'static str {
        match self {
            HistoryTab::Video => "/api/videos/search_similarity_video",
            HistoryTab::Image => "/api/images/search_similarity_image",
            HistoryTab::ImageEnrichment => "/api/images/search_similarity_image_enrich",
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            HistoryTab::Video => MediaKind::Video,
            HistoryTab::Image | HistoryTab::ImageEnrichment => MediaKind::Image,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            HistoryTab::Video => HistoryTab::Image,
            HistoryTab::Image => HistoryTab::ImageEnrichment,
            HistoryTab::ImageEnrichment => HistoryTab::Video,
        }
    }
}

impl fmt::Display for HistoryTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-editable history filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HistoryFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub only_success: bool,
}

impl HistoryFilters {
    /// Canonical form: blank strings become `None`, text is trimmed.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }
        Self {
            start_date: self.start_date,
            end_date: self.end_date,
            status: clean(&self.status),
            model: clean(&self.model),
            is_edited: self.is_edited,
            only_success: self.only_success,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }

    /// Query-string pairs for the history endpoints.
    ///
    /// Only set filters are sent; `only_success` becomes `status=SUCCESS`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let filters = self.normalized();
        let mut pairs = Vec::new();
        if let Some(date) = filters.start_date {
            pairs.push(("start_date".into(), date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = filters.end_date {
            pairs.push(("end_date".into(), date.format("%Y-%m-%d").to_string()));
        }
        let status = if filters.only_success {
            Some("SUCCESS".to_string())
        } else {
            filters.status
        };
        if let Some(status) = status {
            pairs.push(("status".into(), status));
        }
        if let Some(model) = filters.model {
            pairs.push(("model".into(), model));
        }
        if filters.is_edited {
            pairs.push(("is_edited".into(), "true".into()));
        }
        pairs
    }

    /// JSON object merged into similarity-search bodies.
    pub fn to_json_object(&self) -> Map<String, Value> {
        self.to_query_pairs()
            .into_iter()
            .map(|(k, v)| {
                let value = if k == "is_edited" {
                    Value::Bool(true)
                } else {
                    Value::String(v)
                };
                (k, value)
            })
            .collect()
    }
}

/// One page request against a tab. Doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub tab: HistoryTab,
    pub filters: HistoryFilters,
    /// One-based page number as the backend expects it.
    pub page: u32,
    pub page_size: u32,
}

pub type CacheKey = HistoryQuery;

impl HistoryQuery {
    pub fn new(tab: HistoryTab, filters: &HistoryFilters, page: u32, page_size: u32) -> Self {
        Self {
            tab,
            filters: filters.normalized(),
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn first_page(tab: HistoryTab) -> Self {
        Self::new(tab, &HistoryFilters::default(), 1, DEFAULT_PAGE_SIZE)
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.to_query_pairs();
        pairs.push(("page".into(), self.page.to_string()));
        pairs.push(("page_size".into(), self.page_size.to_string()));
        pairs
    }

    /// Body of a similarity search for this query.
    pub fn search_body(&self, text: &str) -> Value {
        let mut body = self.filters.to_json_object();
        body.insert("text".into(), Value::String(text.to_string()));
        body.insert("page".into(), Value::from(self.page));
        body.insert("page_size".into(), Value::from(self.page_size));
        Value::Object(body)
    }
}

/// A history row. Known columns are typed; the rest is kept so the row can be
/// posted back unchanged when sharing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub trigger_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub creative_project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    /// A JSON-encoded list in some responses, a real list in others.
    #[serde(default)]
    pub output_video_gcs_paths: Option<Value>,
    #[serde(default)]
    pub output_image_gcs_path: Option<String>,
    #[serde(default)]
    pub signed_urls: Vec<String>,
    #[serde(default)]
    pub signed_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryRow {
    /// Every object-storage URI the row references.
    pub fn gcs_uris(&self) -> Vec<String> {
        let mut uris = match &self.output_video_gcs_paths {
            Some(Value::String(encoded)) => {
                serde_json::from_str::<Vec<String>>(encoded).unwrap_or_default()
            }
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };
        if let Some(uri) = &self.output_image_gcs_path {
            uris.push(uri.clone());
        }
        if let Some(Value::String(uri)) = self.extra.get("gcs_uri") {
            uris.push(uri.clone());
        }
        uris.retain(|u| !u.trim().is_empty());
        uris
    }

    pub fn primary_gcs_uri(&self) -> Option<String> {
        self.gcs_uris().into_iter().next()
    }

    pub fn display_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.signed_urls.iter().map(String::as_str).collect();
        if let Some(url) = self.signed_url.as_deref() {
            urls.push(url);
        }
        urls.retain(|u| !u.is_empty());
        urls
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status.as_deref().map(str::to_ascii_uppercase).as_deref(),
            Some("SUCCESS") | Some("COMPLETED")
        )
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Response of the history endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub rows: Vec<HistoryRow>,
    #[serde(default)]
    pub total: u64,
}

/// Response of the similarity-search endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub rows: Vec<HistoryRow>,
    #[serde(default)]
    pub total_rows: u64,
}

impl From<SearchPage> for HistoryPage {
    fn from(page: SearchPage) -> Self {
        Self {
            rows: page.rows,
            total: page.total_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_filters_normalize_to_empty() {
        let filters = HistoryFilters {
            status: Some("  ".into()),
            model: Some(String::new()),
            ..HistoryFilters::default()
        };
        assert!(filters.is_empty());
        assert_eq!(
            HistoryQuery::new(HistoryTab::Video, &filters, 1, 10),
            HistoryQuery::first_page(HistoryTab::Video)
        );
    }

    #[test]
    fn only_success_maps_to_status() {
        let filters = HistoryFilters {
            status: Some("FAILURE".into()),
            only_success: true,
            ..HistoryFilters::default()
        };
        let pairs = filters.to_query_pairs();
        assert_eq!(pairs, vec![("status".to_string(), "SUCCESS".to_string())]);
    }

    #[test]
    fn query_pairs_include_paging() {
        let filters = HistoryFilters {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 2),
            model: Some("veo".into()),
            is_edited: true,
            ..HistoryFilters::default()
        };
        let pairs = HistoryQuery::new(HistoryTab::Image, &filters, 3, 25).to_query_pairs();
        assert!(pairs.contains(&("start_date".into(), "2025-01-02".into())));
        assert!(pairs.contains(&("is_edited".into(), "true".into())));
        assert!(pairs.contains(&("page".into(), "3".into())));
        assert!(pairs.contains(&("page_size".into(), "25".into())));
    }

    #[test]
    fn tabs_are_distinct_keys() {
        assert_ne!(
            HistoryQuery::first_page(HistoryTab::Image),
            HistoryQuery::first_page(HistoryTab::ImageEnrichment)
        );
    }

    #[test]
    fn gcs_paths_accept_string_or_list() {
        let encoded: HistoryRow = serde_json::from_value(json!({
            "output_video_gcs_paths": "[\"gs://a/1.mp4\", \"gs://a/2.mp4\"]"
        }))
        .unwrap();
        assert_eq!(encoded.gcs_uris(), vec!["gs://a/1.mp4", "gs://a/2.mp4"]);

        let listed: HistoryRow = serde_json::from_value(json!({
            "output_video_gcs_paths": ["gs://b/1.mp4"]
        }))
        .unwrap();
        assert_eq!(listed.primary_gcs_uri().as_deref(), Some("gs://b/1.mp4"));

        let garbage: HistoryRow =
            serde_json::from_value(json!({"output_video_gcs_paths": "not json"})).unwrap();
        assert!(garbage.gcs_uris().is_empty());
    }

    #[test]
    fn unknown_columns_survive_round_trip() {
        let row: HistoryRow = serde_json::from_value(json!({
            "prompt": "p",
            "operation_duration": 12.5
        }))
        .unwrap();
        assert_eq!(row.to_value()["operation_duration"], json!(12.5));
    }

    #[test]
    fn search_body_merges_filters() {
        let filters = HistoryFilters {
            model: Some("imagen".into()),
            ..HistoryFilters::default()
        };
        let body = HistoryQuery::new(HistoryTab::Image, &filters, 1, 10).search_body("cat");
        assert_eq!(body["text"], json!("cat"));
        assert_eq!(body["model"], json!("imagen"));
        assert_eq!(body["page_size"], json!(10));
    }
}
