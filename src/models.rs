use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard level a KPI belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiLevel {
    Operational,
    Managerial,
    Strategic,
}

impl KpiLevel {
    pub const ALL: [KpiLevel; 3] = [KpiLevel::Operational, KpiLevel::Managerial, KpiLevel::Strategic];

    pub fn as_str(&self) -> &'static str {
        match self {
            KpiLevel::Operational => "operational",
            KpiLevel::Managerial => "managerial",
            KpiLevel::Strategic => "strategic",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            KpiLevel::Operational => "Operational",
            KpiLevel::Managerial => "Managerial",
            KpiLevel::Strategic => "Strategic",
        }
    }

    pub fn next(&self) -> KpiLevel {
        match self {
            KpiLevel::Operational => KpiLevel::Managerial,
            KpiLevel::Managerial => KpiLevel::Strategic,
            KpiLevel::Strategic => KpiLevel::Operational,
        }
    }

    /// Level strings on the wire are free text; match loosely
    pub fn matches(&self, raw: &str) -> bool {
        raw.to_lowercase().contains(self.as_str())
    }

    /// Dashboard shown to a user with this role. Viewers get the
    /// operational one; other roles have no level dashboard.
    pub fn for_role(role: &str) -> Option<KpiLevel> {
        match role.trim().to_lowercase().as_str() {
            "viewer" | "operational" => Some(KpiLevel::Operational),
            "managerial" => Some(KpiLevel::Managerial),
            "strategic" => Some(KpiLevel::Strategic),
            _ => None,
        }
    }
}

/// A KPI definition as returned by the API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub level: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub frequency: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub reporting_format: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<i64>,
}

/// Editable KPI fields, sent on create and update
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiDraft {
    pub name: String,
    pub description: Option<String>,
    pub level: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    pub unit: Option<String>,
    pub frequency: String,
    pub formula: Option<String>,
    pub reporting_format: Option<String>,
    pub data_source: Option<String>,
}

impl KpiDraft {
    /// Returns the first missing required field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("level", &self.level),
            ("type", &self.kind),
            ("target", &self.target),
            ("frequency", &self.frequency),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

impl From<&Kpi> for KpiDraft {
    fn from(kpi: &Kpi) -> Self {
        KpiDraft {
            name: kpi.name.clone(),
            description: kpi.description.clone(),
            level: kpi.level.clone(),
            kind: kpi.kind.clone(),
            target: kpi.target.clone(),
            unit: kpi.unit.clone(),
            frequency: kpi.frequency.clone(),
            formula: kpi.formula.clone(),
            reporting_format: kpi.reporting_format.clone(),
            data_source: kpi.data_source.clone(),
        }
    }
}

/// A vendor security tool whose reports can be ingested
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tool {
    /// "<type> by <vendor>", or just the type
    pub fn summary(&self) -> String {
        match &self.vendor {
            Some(vendor) if !vendor.is_empty() => format!("{} by {}", self.kind, vendor),
            _ => self.kind.clone(),
        }
    }
}

/// Editable Tool fields, sent on create and update
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolDraft {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub configuration: Option<String>,
}

impl ToolDraft {
    pub fn missing_field(&self) -> Option<&'static str> {
        [("name", &self.name), ("type", &self.kind), ("category", &self.category)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
    }
}

impl From<&Tool> for ToolDraft {
    fn from(tool: &Tool) -> Self {
        ToolDraft {
            name: tool.name.clone(),
            description: tool.description.clone(),
            kind: tool.kind.clone(),
            category: tool.category.clone(),
            vendor: tool.vendor.clone(),
            version: tool.version.clone(),
            configuration: tool.configuration.clone(),
        }
    }
}

/// The signed-in user (`/api/auth/me`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `GET /api/users/{id}/role`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UserRole {
    #[serde(default)]
    pub role: Option<RoleRef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionRef {
    pub id: i64,
    pub name: String,
}

/// A user as listed by the admin endpoint, with effective permissions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub role: Option<RoleRef>,
    #[serde(default)]
    pub permissions: Vec<PermissionRef>,
}

impl AdminUser {
    pub fn has_permission(&self, permission_id: i64) -> bool {
        self.permissions.iter().any(|p| p.id == permission_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Processing status of an uploaded file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    Pending,
    Processed,
    Failed,
    Other(String),
}

impl From<String> for FileStatus {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "pending" => FileStatus::Pending,
            "processed" => FileStatus::Processed,
            "failed" => FileStatus::Failed,
            _ => FileStatus::Other(raw),
        }
    }
}

impl From<FileStatus> for String {
    fn from(status: FileStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processed => "processed",
            FileStatus::Failed => "failed",
            FileStatus::Other(raw) => raw,
        }
    }
}

/// An uploaded report file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default = "pending")]
    pub status: FileStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn pending() -> FileStatus {
    FileStatus::Pending
}

/// Access/refresh token pair issued by the auth endpoints
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    String::from("bearer")
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CountBreakdown {
    #[serde(default)]
    pub total: u64,
    #[serde(default, alias = "by_level", alias = "by_category")]
    pub breakdown: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default, alias = "today", alias = "recent")]
    pub today: u64,
}

/// `/api/dashboard/stats`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub kpis: CountBreakdown,
    #[serde(default)]
    pub tools: CountBreakdown,
    #[serde(default)]
    pub logs: LogCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_status_tolerates_unknown_values() {
        let file: FileRecord =
            serde_json::from_str(r#"{"id": 7, "filename": "scan.nessus", "status": "queued"}"#).unwrap();
        assert_eq!(file.status, FileStatus::Other("queued".into()));

        let file: FileRecord = serde_json::from_str(r#"{"id": 7, "status": "PROCESSED"}"#).unwrap();
        assert_eq!(file.status, FileStatus::Processed);
    }

    #[test]
    fn test_kpi_uses_type_on_the_wire() {
        let kpi: Kpi = serde_json::from_str(
            r#"{"id":1,"name":"MTTD","level":"operational","type":"time","target":"< 1h","frequency":"daily"}"#,
        )
        .unwrap();
        assert_eq!(kpi.kind, "time");

        let draft = KpiDraft::from(&kpi);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["type"], "time");
        assert_eq!(draft.missing_field(), None);
    }

    #[test]
    fn test_draft_reports_first_missing_field() {
        let draft = ToolDraft {
            name: "Nessus".into(),
            kind: "  ".into(),
            ..Default::default()
        };
        assert_eq!(draft.missing_field(), Some("type"));
        assert_eq!(KpiDraft::default().missing_field(), Some("name"));
    }

    #[test]
    fn test_stats_read_backend_shape() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"kpis":{"total":3,"by_level":{"operational":2,"strategic":1}},
                "tools":{"total":2,"by_category":{"firewall":2}},
                "logs":{"total":40,"today":4}}"#,
        )
        .unwrap();
        assert_eq!(stats.kpis.breakdown.get("operational"), Some(&2));
        assert_eq!(stats.tools.total, 2);
        assert_eq!(stats.logs.today, 4);
    }

    #[test]
    fn test_level_matching_is_loose() {
        assert!(KpiLevel::Managerial.matches("Managerial KPI"));
        assert!(!KpiLevel::Strategic.matches("operational"));
    }

    #[test]
    fn test_role_names_map_to_dashboards() {
        assert_eq!(KpiLevel::for_role("Viewer"), Some(KpiLevel::Operational));
        assert_eq!(KpiLevel::for_role(" operational "), Some(KpiLevel::Operational));
        assert_eq!(KpiLevel::for_role("MANAGERIAL"), Some(KpiLevel::Managerial));
        assert_eq!(KpiLevel::for_role("Strategic"), Some(KpiLevel::Strategic));
        assert_eq!(KpiLevel::for_role("Auditor"), None);

        let none: UserRole = serde_json::from_str(r#"{"role": null}"#).unwrap();
        assert_eq!(none.role, None);
    }
}
