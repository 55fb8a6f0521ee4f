//! Backend-owned entities mirrored by the client: projects, groups, shared
//! items, prompts, user profile and settings.

use crate::{DocumentId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common shape of projects and groups.
pub trait Membership {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn members(&self) -> &[String];

    fn has_member(&self, email: &str) -> bool {
        self.members()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

macro_rules! impl_membership {
    ($ty:ty) => {
        impl Membership for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn members(&self) -> &[String] {
                &self.members
            }
        }
    };
}

impl_membership!(Project);
impl_membership!(Group);

/// Body of the project and group creation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
}

impl NewCollection {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".into(),
            });
        }
        Ok(Self {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMembersRequest {
    pub emails: Vec<String>,
}

/// One project or group in an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub data: Vec<ImportEntry>,
}

/// Split free text on commas and newlines into distinct email addresses.
pub fn parse_member_emails(text: &str) -> Result<Vec<String>, ValidationError> {
    let mut emails: Vec<String> = Vec::new();
    for candidate in text.split([',', '\n', ';']).map(str::trim) {
        if candidate.is_empty() {
            continue;
        }
        if !is_plausible_email(candidate) {
            return Err(ValidationError::InvalidValue {
                field: "emails".into(),
                reason: format!("not an email address: {}", candidate),
            });
        }
        if !emails.iter().any(|e| e.eq_ignore_ascii_case(candidate)) {
            emails.push(candidate.to_string());
        }
    }
    Ok(emails)
}

fn is_plausible_email(candidate: &str) -> bool {
    match candidate.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !candidate.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Parse an import file: one `name,email` pair per line, rows with the same
/// name are merged. A header line starting with `name` is skipped.
pub fn parse_import_csv(text: &str) -> Result<Vec<ImportEntry>, ValidationError> {
    let mut entries: Vec<ImportEntry> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (index == 0 && line.to_ascii_lowercase().starts_with("name")) {
            continue;
        }
        let (name, email) = line.split_once(',').ok_or_else(|| ValidationError::InvalidValue {
            field: "data".into(),
            reason: format!("line {} is not name,email", index + 1),
        })?;
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "data".into(),
                reason: format!("line {} has no name", index + 1),
            });
        }
        let members = parse_member_emails(email)?;
        match entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                for member in members {
                    if !entry.members.contains(&member) {
                        entry.members.push(member);
                    }
                }
            }
            None => entries.push(ImportEntry {
                name: name.to_string(),
                members,
            }),
        }
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaType {
    #[default]
    NoLimit,
    CostLimit,
    GenerationQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPeriod {
    #[default]
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quota {
    #[serde(rename = "type", default)]
    pub kind: QuotaType,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub period: QuotaPeriod,
}

/// Per-project cost configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub unrestricted: bool,
    #[serde(default)]
    pub quota: Quota,
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quota.kind != QuotaType::NoLimit {
            match self.quota.limit {
                Some(limit) if limit > 0.0 => {}
                _ => {
                    return Err(ValidationError::InvalidValue {
                        field: "quota.limit".into(),
                        reason: "a positive limit is required".into(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Entry of `POST /api/creative-projects/config/bulk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfigEntry {
    pub project_id: DocumentId,
    #[serde(flatten)]
    pub config: ProjectConfig,
}

/// An asset attached to a creative project, or an item shared to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedItem {
    pub id: DocumentId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub signed_url: Option<String>,
    #[serde(default)]
    pub shared_by_user_email: Option<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SharedItem {
    pub fn is_video(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("video"))
    }
}

pub type ProjectAsset = SharedItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub asset: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: DocumentId,
    pub prompt_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub created_by_email: Option<String>,
}

/// Response of `GET /api/prompts`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptPage {
    #[serde(default)]
    pub rows: Vec<PromptEntry>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrompt {
    pub prompt_text: String,
    pub keywords: Vec<String>,
}

impl NewPrompt {
    /// Build from prompt text and a comma separated keyword list.
    pub fn new(prompt_text: &str, keywords: &str) -> Result<Self, ValidationError> {
        let prompt_text = prompt_text.trim();
        if prompt_text.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "prompt_text".into(),
            });
        }
        Ok(Self {
            prompt_text: prompt_text.to_string(),
            keywords: keywords
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    AppAdmin,
    #[serde(other)]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::AppAdmin => f.write_str("admin"),
            UserRole::User => f.write_str("user"),
        }
    }
}

/// Response of `GET /api/user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Some(UserRole::AppAdmin)
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("anonymous")
    }
}

/// Response of `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub enable_upscale: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Response of the model listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Response of `GET /api/notification-banner`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationBanner {
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleJob {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub upscaled_gcs_uri: Option<String>,
    #[serde(default)]
    pub signed_url: Option<String>,
}

impl UpscaleJob {
    /// Download link, present only for completed jobs.
    pub fn download_url(&self) -> Option<&str> {
        if self.status.eq_ignore_ascii_case("completed") && self.upscaled_gcs_uri.is_some() {
            self.signed_url.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_emails_split_on_commas_and_newlines() {
        let emails = parse_member_emails("a@x.io, b@x.io\n\nA@x.io;c@y.org").unwrap();
        assert_eq!(emails, vec!["a@x.io", "b@x.io", "c@y.org"]);
    }

    #[test]
    fn member_emails_reject_garbage() {
        assert!(parse_member_emails("a@x.io, nope").is_err());
        assert!(parse_member_emails("").unwrap().is_empty());
    }

    #[test]
    fn import_csv_merges_by_name() {
        let entries =
            parse_import_csv("name,email\nTeam A,a@x.io\nTeam B,b@x.io\nTeam A,c@x.io\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].members, vec!["a@x.io", "c@x.io"]);
    }

    #[test]
    fn project_config_requires_limit_when_limited() {
        let mut config = ProjectConfig::default();
        assert!(config.validate().is_ok());
        config.quota.kind = QuotaType::CostLimit;
        assert!(config.validate().is_err());
        config.quota.limit = Some(50.0);
        assert!(config.validate().is_ok());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["quota"]["type"], json!("COST_LIMIT"));
    }

    #[test]
    fn unknown_roles_are_plain_users() {
        let user: UserProfile =
            serde_json::from_value(json!({"authenticated": true, "role": "VIEWER"})).unwrap();
        assert_eq!(user.role, Some(UserRole::User));
        assert!(!user.is_admin());
    }

    #[test]
    fn membership_lookup_ignores_case() {
        let group = Group {
            id: "g1".into(),
            name: "Editors".into(),
            members: vec!["Ann@x.io".into()],
            created_by: None,
            created_at: None,
        };
        assert!(group.has_member("ann@x.io "));
    }

    #[test]
    fn upscale_download_needs_completion() {
        let job: UpscaleJob = serde_json::from_value(json!({
            "id": "j1", "status": "processing", "signed_url": "https://u"
        }))
        .unwrap();
        assert!(job.download_url().is_none());
    }
}
