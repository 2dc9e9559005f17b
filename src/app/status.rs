#[derive(Debug, Clone)]
pub struct StatusLine {
    message: String,
}

pub const READY_STATUS: &str = "Ready.";

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: READY_STATUS.to_string(),
        }
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing(&mut self, label: &str) {
        self.message = format!("Editing {label}");
    }

    pub fn value_updated(&mut self, count: usize) {
        self.message = if count == 1 {
            "Value updated".to_string()
        } else {
            format!("{count} values updated")
        };
    }

    pub fn entries_changed(&mut self, label: &str) {
        self.message = format!("Updated {label}");
    }

    pub fn validation_passed(&mut self) {
        self.message = "Validation passed".to_string();
    }

    pub fn issues_remaining(&mut self, count: usize) {
        self.message = format!("{count} issue(s) remaining");
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
