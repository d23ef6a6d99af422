//! Dialogs over the dashboard - KPI/Tool forms, delete confirmation, pickers

use crate::messages::NetworkCommand;
use crate::models::{Kpi, KpiDraft, Tool, ToolDraft};

const LEVELS: &[&str] = &["Operational", "Managerial", "Strategic"];

const FREQUENCIES: &[&str] = &[
    "real-time",
    "hourly",
    "daily",
    "weekly",
    "monthly",
    "quarterly",
    "yearly",
];

const TOOL_CATEGORIES: &[&str] = &[
    "data",
    "IAM",
    "IAC",
    "perimeter",
    "monitoring_response",
    "GOR",
];

const TOOL_TYPES: &[&str] = &[
    "firewall",
    "antivirus",
    "vulnerability_scanner",
    "waf",
    "ids_ips",
    "siem",
    "endpoint_protection",
    "network_monitoring",
    "log_analysis",
    "other",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldInput {
    Text,
    /// Space cycles through the options
    Choice(&'static [&'static str]),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub required: bool,
    pub input: FieldInput,
}

impl FormField {
    fn text(label: &'static str, value: impl Into<String>, required: bool) -> Self {
        FormField {
            label,
            value: value.into(),
            required,
            input: FieldInput::Text,
        }
    }

    fn choice(label: &'static str, value: &str, options: &'static [&'static str]) -> Self {
        let value = if value.is_empty() { options[0] } else { value };
        FormField {
            label,
            value: value.to_string(),
            required: true,
            input: FieldInput::Choice(options),
        }
    }

    fn cycle(&mut self, options: &[&str]) {
        let current = options
            .iter()
            .position(|o| o.eq_ignore_ascii_case(&self.value));
        let next = current.map_or(0, |i| (i + 1) % options.len());
        self.value = options[next].to_string();
    }
}

/// What a form saves; the base draft keeps fields the form doesn't show
#[derive(Clone, Debug, PartialEq)]
pub enum FormKind {
    Kpi { id: Option<i64>, base: KpiDraft },
    Tool { id: Option<i64>, base: ToolDraft },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormDialog {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
    /// Waiting for the save to come back
    pub saving: bool,
}

impl FormDialog {
    pub fn kpi(kpi: Option<&Kpi>) -> Self {
        let base = kpi.map(KpiDraft::from).unwrap_or_default();
        let fields = vec![
            FormField::text("Name", &base.name, true),
            FormField::choice("Level", &base.level, LEVELS),
            FormField::text("Description", base.description.clone().unwrap_or_default(), false),
            FormField::text("Type", &base.kind, true),
            FormField::text("Target", &base.target, true),
            FormField::text("Unit", base.unit.clone().unwrap_or_default(), false),
            FormField::choice("Frequency", &base.frequency, FREQUENCIES),
            FormField::text("Data Source", base.data_source.clone().unwrap_or_default(), false),
        ];
        FormDialog::new(FormKind::Kpi { id: kpi.map(|k| k.id), base }, fields)
    }

    pub fn tool(tool: Option<&Tool>) -> Self {
        let base = tool.map(ToolDraft::from).unwrap_or_default();
        let fields = vec![
            FormField::text("Name", &base.name, true),
            FormField::text("Description", base.description.clone().unwrap_or_default(), false),
            FormField::choice("Category", &base.category, TOOL_CATEGORIES),
            FormField::choice("Type", &base.kind, TOOL_TYPES),
            FormField::text("Vendor", base.vendor.clone().unwrap_or_default(), false),
            FormField::text("Version", base.version.clone().unwrap_or_default(), false),
        ];
        FormDialog::new(FormKind::Tool { id: tool.map(|t| t.id), base }, fields)
    }

    fn new(kind: FormKind, fields: Vec<FormField>) -> Self {
        FormDialog {
            kind,
            fields,
            focus: 0,
            error: None,
            saving: false,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::Kpi { id: Some(_), .. } => " Edit KPI ",
            FormKind::Kpi { id: None, .. } => " Add New KPI ",
            FormKind::Tool { id: Some(_), .. } => " Edit Tool ",
            FormKind::Tool { id: None, .. } => " Add New Tool ",
        }
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len() - 1);
    }

    pub fn input_char(&mut self, c: char) {
        if self.saving {
            return;
        }
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        match field.input {
            FieldInput::Text => field.value.push(c),
            FieldInput::Choice(options) if c == ' ' => field.cycle(options),
            FieldInput::Choice(_) => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if field.input == FieldInput::Text {
                field.value.pop();
            }
        }
    }

    fn value(&self, label: &str) -> String {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.trim().to_string())
            .unwrap_or_default()
    }

    fn optional(&self, label: &str) -> Option<String> {
        Some(self.value(label)).filter(|v| !v.is_empty())
    }

    /// Build the save command, or record which required field is missing
    pub fn submit(&mut self) -> Option<NetworkCommand> {
        if self.saving {
            return None;
        }
        let (cmd, missing) = match &self.kind {
            FormKind::Kpi { id, base } => {
                let draft = KpiDraft {
                    name: self.value("Name"),
                    level: self.value("Level"),
                    description: self.optional("Description"),
                    kind: self.value("Type"),
                    target: self.value("Target"),
                    unit: self.optional("Unit"),
                    frequency: self.value("Frequency"),
                    data_source: self.optional("Data Source"),
                    ..base.clone()
                };
                let missing = draft.missing_field();
                (NetworkCommand::SaveKpi { id: *id, draft }, missing)
            }
            FormKind::Tool { id, base } => {
                let draft = ToolDraft {
                    name: self.value("Name"),
                    description: self.optional("Description"),
                    category: self.value("Category"),
                    kind: self.value("Type"),
                    vendor: self.optional("Vendor"),
                    version: self.optional("Version"),
                    ..base.clone()
                };
                let missing = draft.missing_field();
                (NetworkCommand::SaveTool { id: *id, draft }, missing)
            }
        };

        if let Some(field) = missing {
            self.error = Some(format!("The {} field is required", field));
            return None;
        }
        self.error = None;
        self.saving = true;
        Some(cmd)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteKpi(i64),
    DeleteTool(i64),
    DeleteUser(i64),
}

impl ConfirmAction {
    pub fn question(&self) -> &'static str {
        match self {
            ConfirmAction::DeleteKpi(_) => "Are you sure you want to delete this KPI?",
            ConfirmAction::DeleteTool(_) => "Are you sure you want to delete this tool?",
            ConfirmAction::DeleteUser(_) => "Are you sure you want to delete this user?",
        }
    }

    pub fn command(&self) -> NetworkCommand {
        match *self {
            ConfirmAction::DeleteKpi(id) => NetworkCommand::DeleteKpi(id),
            ConfirmAction::DeleteTool(id) => NetworkCommand::DeleteTool(id),
            ConfirmAction::DeleteUser(id) => NetworkCommand::DeleteUser(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmDialog {
    pub action: ConfirmAction,
    /// Name of the thing being deleted
    pub subject: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickerKind {
    AssignRole { user_id: i64 },
    UserPermissions { user_id: i64 },
    RolePermissions { role_id: i64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickerItem {
    pub id: i64,
    pub label: String,
    pub checked: bool,
}

/// A checklist over roles or permissions
#[derive(Clone, Debug, PartialEq)]
pub struct Picker {
    pub kind: PickerKind,
    pub title: String,
    pub items: Vec<PickerItem>,
    pub selected: usize,
    pub loading: bool,
}

impl Picker {
    pub fn new(kind: PickerKind, title: String, items: Vec<PickerItem>) -> Self {
        Picker {
            kind,
            title,
            items,
            selected: 0,
            loading: false,
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.items.len() {
            self.selected += 1;
        }
    }

    /// Act on the selected row. Roles are exclusive; permissions toggle.
    pub fn activate(&mut self) -> Option<NetworkCommand> {
        if self.loading {
            return None;
        }
        let item = self.items.get_mut(self.selected)?;
        match self.kind {
            PickerKind::AssignRole { user_id } => {
                if item.checked {
                    return None;
                }
                let role_id = item.id;
                for item in &mut self.items {
                    item.checked = item.id == role_id;
                }
                Some(NetworkCommand::AssignRole { user_id, role_id })
            }
            PickerKind::UserPermissions { user_id } => {
                item.checked = !item.checked;
                Some(NetworkCommand::SetUserPermission {
                    user_id,
                    permission_id: item.id,
                    granted: item.checked,
                })
            }
            PickerKind::RolePermissions { role_id } => {
                item.checked = !item.checked;
                Some(NetworkCommand::SetRolePermission {
                    role_id,
                    permission_id: item.id,
                    granted: item.checked,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kpi_form_reports_missing_field() {
        let mut form = FormDialog::kpi(None);
        for c in "MTTR".chars() {
            form.input_char(c);
        }
        assert!(form.submit().is_none());
        assert_eq!(form.error.as_deref(), Some("The type field is required"));
        assert!(!form.saving);

        form.focus = 3;
        form.input_char('x');
        form.focus = 4;
        form.input_char('4');
        match form.submit() {
            Some(NetworkCommand::SaveKpi { id: None, draft }) => {
                assert_eq!(draft.name, "MTTR");
                assert_eq!(draft.level, "Operational");
                assert_eq!(draft.frequency, "real-time");
                assert_eq!(draft.unit, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(form.saving);
        assert!(form.submit().is_none());
    }

    #[test]
    fn test_choice_fields_cycle_on_space() {
        let mut form = FormDialog::tool(None);
        form.focus = 2;
        form.input_char('z');
        assert_eq!(form.fields[2].value, "data");
        form.input_char(' ');
        assert_eq!(form.fields[2].value, "IAM");
        form.backspace();
        assert_eq!(form.fields[2].value, "IAM");
    }

    #[test]
    fn test_edit_keeps_hidden_kpi_fields() {
        let kpi: Kpi = serde_json::from_str(
            r#"{"id": 3, "name": "Patch rate", "level": "managerial", "type": "ratio",
                "target": "95", "frequency": "monthly", "formula": "patched / total"}"#,
        )
        .unwrap();
        let mut form = FormDialog::kpi(Some(&kpi));
        assert_eq!(form.title(), " Edit KPI ");
        match form.submit() {
            Some(NetworkCommand::SaveKpi { id: Some(3), draft }) => {
                assert_eq!(draft.formula.as_deref(), Some("patched / total"));
                assert_eq!(draft.level, "managerial");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_role_picker_is_exclusive() {
        let items = vec![
            PickerItem { id: 1, label: "admin".into(), checked: true },
            PickerItem { id: 2, label: "analyst".into(), checked: false },
        ];
        let mut picker = Picker::new(PickerKind::AssignRole { user_id: 7 }, "Role".into(), items);
        assert!(picker.activate().is_none());

        picker.move_down();
        assert!(matches!(
            picker.activate(),
            Some(NetworkCommand::AssignRole { user_id: 7, role_id: 2 })
        ));
        assert!(!picker.items[0].checked);
        assert!(picker.items[1].checked);
    }

    #[test]
    fn test_permission_picker_toggles() {
        let items = vec![PickerItem { id: 5, label: "files:read".into(), checked: true }];
        let mut picker =
            Picker::new(PickerKind::UserPermissions { user_id: 2 }, "Perms".into(), items);
        assert!(matches!(
            picker.activate(),
            Some(NetworkCommand::SetUserPermission { user_id: 2, permission_id: 5, granted: false })
        ));
    }
}
