//! Small text-form model shared by the login screen and the edit overlays.

/// Default input limit for free-text fields.
const MAX_FIELD_LENGTH: usize = 120;

/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Emails are short; 100 covers institutional addresses.
const MAX_EMAIL_LENGTH: usize = 100;

/// Upload paths may be long and several are joined in one field.
const MAX_PATHS_LENGTH: usize = 1024;

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
    pub max_len: usize,
}

impl FormField {
    fn can_add(&self, c: char) -> bool {
        self.value.chars().count() < self.max_len && is_valid_input_char(c)
    }

    /// Value as drawn on screen: asterisks for masked fields.
    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
}

impl Form {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            focus: 0,
            error: None,
        }
    }

    pub fn text(self, label: &'static str, value: &str) -> Self {
        self.push(label, value, false, MAX_FIELD_LENGTH)
    }

    pub fn email(self, label: &'static str, value: &str) -> Self {
        self.push(label, value, false, MAX_EMAIL_LENGTH)
    }

    pub fn password(self, label: &'static str) -> Self {
        self.push(label, "", true, MAX_PASSWORD_LENGTH)
    }

    pub fn paths(self, label: &'static str) -> Self {
        self.push(label, "", false, MAX_PATHS_LENGTH)
    }

    fn push(mut self, label: &'static str, value: &str, masked: bool, max_len: usize) -> Self {
        self.fields.push(FormField {
            label,
            value: value.chars().take(max_len).collect(),
            masked,
            max_len,
        });
        self
    }

    /// Start with the cursor on the first empty field.
    pub fn focus_first_empty(mut self) -> Self {
        self.focus = self
            .fields
            .iter()
            .position(|f| f.value.is_empty())
            .unwrap_or(0);
        self
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, index: usize, value: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.chars().take(field.max_len).collect();
        }
    }

    pub fn is_last_field(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Returns false when the character was rejected.
    pub fn push_char(&mut self, c: char) -> bool {
        match self.fields.get_mut(self.focus) {
            Some(field) if field.can_add(c) => {
                field.value.push(c);
                self.error = None;
                true
            }
            _ => false,
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Forget typed passwords, e.g. after a failed submit.
    pub fn clear_masked(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.masked) {
            field.value.clear();
        }
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
