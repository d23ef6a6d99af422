//! Upload wizard - pick a tool, pick a report file, upload, watch it process

use std::path::PathBuf;

use crate::constants::PROGRESS_CAP;
use crate::messages::NetworkCommand;
use crate::models::{FileRecord, Tool};
use crate::network::upload::UploadEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WizardStep {
    #[default]
    SelectTool = 1,
    SelectFile = 2,
    Processing = 3,
    Complete = 4,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::SelectTool,
        WizardStep::SelectFile,
        WizardStep::Processing,
        WizardStep::Complete,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::SelectTool => "Select Tool",
            WizardStep::SelectFile => "Upload File",
            WizardStep::Processing => "Processing",
            WizardStep::Complete => "Complete",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WizardStep::SelectTool => "Choose your security tool",
            WizardStep::SelectFile => "Upload log file",
            WizardStep::Processing => "Parsing your data",
            WizardStep::Complete => "View KPIs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Uploading,
    Parsing,
    Calculating,
    Complete,
    Failed,
}

impl ProcessingStatus {
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Uploading | ProcessingStatus::Parsing | ProcessingStatus::Calculating
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProcessingStatus::Uploading => "Securely uploading your file...",
            ProcessingStatus::Parsing => "Analyzing security data patterns...",
            ProcessingStatus::Calculating => "Computing performance metrics...",
            ProcessingStatus::Failed => "An error occurred during processing",
            ProcessingStatus::Complete => "Your security report has been successfully analyzed",
            ProcessingStatus::Idle => "",
        }
    }
}

/// Tool category filter on the first step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolCategory {
    #[default]
    All,
    VulnerabilityScanner,
    Firewall,
    Waf,
    Antivirus,
    WebApplicationScanner,
    PatchManagement,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 7] = [
        ToolCategory::All,
        ToolCategory::VulnerabilityScanner,
        ToolCategory::Firewall,
        ToolCategory::Waf,
        ToolCategory::Antivirus,
        ToolCategory::WebApplicationScanner,
        ToolCategory::PatchManagement,
    ];

    /// Needle matched against the tool type
    pub fn id(&self) -> &'static str {
        match self {
            ToolCategory::All => "all",
            ToolCategory::VulnerabilityScanner => "vulnerability scanner",
            ToolCategory::Firewall => "firewall",
            ToolCategory::Waf => "waf",
            ToolCategory::Antivirus => "antivirus",
            ToolCategory::WebApplicationScanner => "web application scanner",
            ToolCategory::PatchManagement => "patch management",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolCategory::All => "All Tools",
            ToolCategory::VulnerabilityScanner => "Vulnerability Scanners",
            ToolCategory::Firewall => "Firewalls",
            ToolCategory::Waf => "WAF",
            ToolCategory::Antivirus => "Antivirus",
            ToolCategory::WebApplicationScanner => "Application Scanner",
            ToolCategory::PatchManagement => "Patch Management",
        }
    }

    pub fn next(&self) -> ToolCategory {
        let i = ToolCategory::ALL.iter().position(|c| c == self).unwrap_or(0);
        ToolCategory::ALL[(i + 1) % ToolCategory::ALL.len()]
    }

    pub fn matches(&self, tool: &Tool) -> bool {
        match self {
            ToolCategory::All => true,
            _ => tool.kind.to_lowercase().contains(self.id()) || tool.category == self.id(),
        }
    }
}

/// Catalogue shown when the tool list cannot be fetched
pub fn fallback_tools() -> Vec<Tool> {
    let tool = |id, name: &str, kind: &str, category: &str| Tool {
        id,
        name: name.to_string(),
        description: Some(kind.to_string()),
        kind: kind.to_string(),
        category: category.to_string(),
        vendor: None,
        version: None,
        configuration: None,
        created_at: None,
        updated_at: None,
    };
    vec![
        tool(1, "Nessus", "Vulnerability Scanner", "vulnerability_scanner"),
        tool(2, "Fortinet", "Firewall", "firewall"),
    ]
}

/// Wizard state, reset every time the wizard opens
#[derive(Clone, Debug, Default)]
pub struct UploadWizard {
    pub step: WizardStep,
    pub tools: Vec<Tool>,
    pub tools_loading: bool,
    pub search: String,
    pub category: ToolCategory,
    /// Highlighted row in the filtered tool list
    pub highlighted: usize,
    pub tool: Option<Tool>,
    pub file_path: String,
    pub status: ProcessingStatus,
    pub progress: u8,
    /// Id of the upload this wizard listens to
    pub upload_id: Option<u64>,
    pub result: Option<FileRecord>,
    pub error: Option<String>,
}

impl UploadWizard {
    pub fn new() -> Self {
        UploadWizard {
            tools_loading: true,
            ..Default::default()
        }
    }

    pub fn step_status(&self, step: WizardStep) -> StepStatus {
        if step < self.step {
            StepStatus::Completed
        } else if step == self.step {
            StepStatus::Active
        } else {
            StepStatus::Pending
        }
    }

    // ========================
    // Step 1: tool
    // ========================

    pub fn set_tools(&mut self, tools: Vec<Tool>) {
        self.tools = tools;
        self.tools_loading = false;
        self.highlighted = 0;
    }

    pub fn use_fallback_tools(&mut self) {
        self.set_tools(fallback_tools());
    }

    /// Tools matching both the search box and the category filter
    pub fn filtered_tools(&self) -> Vec<&Tool> {
        let query = self.search.to_lowercase();
        self.tools
            .iter()
            .filter(|tool| {
                tool.name.to_lowercase().contains(&query)
                    || tool.summary().to_lowercase().contains(&query)
            })
            .filter(|tool| self.category.matches(tool))
            .collect()
    }

    pub fn category_count(&self, category: ToolCategory) -> usize {
        self.tools.iter().filter(|t| category.matches(t)).count()
    }

    pub fn cycle_category(&mut self) {
        if self.step == WizardStep::SelectTool {
            self.category = self.category.next();
            self.highlighted = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.step == WizardStep::SelectTool {
            self.highlighted = self.highlighted.saturating_sub(1);
        }
    }

    pub fn move_down(&mut self) {
        if self.step == WizardStep::SelectTool {
            let len = self.filtered_tools().len();
            if self.highlighted + 1 < len {
                self.highlighted += 1;
            }
        }
    }

    /// Take the highlighted tool and go to the file step
    pub fn choose_tool(&mut self) -> bool {
        let Some(tool) = self.filtered_tools().get(self.highlighted).map(|t| (*t).clone()) else {
            return false;
        };
        self.tool = Some(tool);
        self.step = WizardStep::SelectFile;
        true
    }

    // ========================
    // Step 2: file
    // ========================

    pub fn input_char(&mut self, c: char) {
        match self.step {
            WizardStep::SelectTool => {
                self.search.push(c);
                self.highlighted = 0;
            }
            WizardStep::SelectFile => self.file_path.push(c),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.step {
            WizardStep::SelectTool => {
                self.search.pop();
                self.highlighted = 0;
            }
            WizardStep::SelectFile => {
                self.file_path.pop();
            }
            _ => {}
        }
    }

    /// The file path with a leading `~` expanded
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let raw = self.file_path.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(raw)),
        }
    }

    /// Both a tool and a file are required
    pub fn can_submit(&self) -> bool {
        self.tool.is_some() && self.resolved_path().is_some()
    }

    // ========================
    // Step 3: upload and poll
    // ========================

    pub fn begin_upload(&mut self, id: u64) -> Option<NetworkCommand> {
        if self.status.is_running() {
            return None;
        }
        let tool_id = self.tool.as_ref()?.id;
        let path = self.resolved_path()?;

        self.step = WizardStep::Processing;
        self.status = ProcessingStatus::Uploading;
        self.progress = 0;
        self.error = None;
        self.result = None;
        self.upload_id = Some(id);
        Some(NetworkCommand::StartUpload { id, tool_id, path })
    }

    /// Re-run the whole sequence after a failure
    pub fn retry(&mut self, id: u64) -> Option<NetworkCommand> {
        if self.status != ProcessingStatus::Failed {
            return None;
        }
        self.begin_upload(id)
    }

    /// Apply an event from the upload task. Events for any other upload
    /// are ignored; returns whether the event was applied.
    pub fn apply(&mut self, id: u64, event: UploadEvent) -> bool {
        if self.upload_id != Some(id) {
            tracing::debug!(id, "Ignoring event from a superseded upload");
            return false;
        }
        match event {
            UploadEvent::Progress(p) => {
                if self.status == ProcessingStatus::Uploading {
                    self.progress = self.progress.max(p.min(PROGRESS_CAP));
                }
            }
            UploadEvent::Uploaded(record) => {
                self.progress = 100;
                self.status = ProcessingStatus::Parsing;
                self.result = Some(record);
            }
            UploadEvent::Calculating => self.status = ProcessingStatus::Calculating,
            UploadEvent::Complete(record) => {
                self.status = ProcessingStatus::Complete;
                self.step = WizardStep::Complete;
                self.result = Some(record);
                self.upload_id = None;
            }
            UploadEvent::Failed { message, .. } => {
                self.status = ProcessingStatus::Failed;
                self.error = Some(message);
                self.upload_id = None;
            }
        }
        true
    }

    /// Back one step; from a failed upload this starts over
    pub fn step_back(&mut self) {
        match self.step {
            WizardStep::SelectFile => self.step = WizardStep::SelectTool,
            WizardStep::Processing if !self.status.is_running() => {
                self.step = WizardStep::SelectTool;
                self.status = ProcessingStatus::Idle;
                self.progress = 0;
                self.error = None;
            }
            _ => {}
        }
    }

    /// Closing the wizard cancels whatever upload is still running
    pub fn close(&mut self) -> Option<NetworkCommand> {
        self.upload_id.take().map(NetworkCommand::CancelUpload)
    }
}
