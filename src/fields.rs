// src/fields.rs

/// Field names rendered as checkboxes even when the template calls them text.
pub const CHECKBOX_FIELDS: &[&str] = &[
    "MasterBOL",
    "Term_Pre",
    "Term_Collect",
    "Term_CustChk",
    "FromFOB",
    "ToFOB",
];

/// Always text, regardless of template type or name.
pub const FORCE_TEXT_FIELDS: &[&str] = &["PrePaid", "Collect", "3rdParty"];

const TRUTHY: &[&str] = &["on", "yes", "1", "true", "x", "✔"];

/// Value written to a template field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Checkbox(bool),
    Text(String),
}

impl FieldValue {
    /// Canonical export value: `Yes`/`Off` for checkboxes, the text otherwise.
    pub fn as_export(&self) -> &str {
        match self {
            FieldValue::Checkbox(true) => "Yes",
            FieldValue::Checkbox(false) => "Off",
            FieldValue::Text(s) => s,
        }
    }
}

pub fn is_checkbox(name: &str, template_checkbox: bool) -> bool {
    if FORCE_TEXT_FIELDS.contains(&name) {
        return false;
    }
    template_checkbox || CHECKBOX_FIELDS.contains(&name)
}

/// Decide how `value` is written to the field `name`.
///
/// `template_checkbox` is what the template itself says about the field.
/// `None` renders as empty text.
pub fn classify(name: &str, value: Option<&str>, template_checkbox: bool) -> FieldValue {
    if is_checkbox(name, template_checkbox) {
        let v = value.unwrap_or_default().trim().to_lowercase();
        FieldValue::Checkbox(TRUTHY.contains(&v.as_str()))
    } else {
        FieldValue::Text(value.unwrap_or_default().to_string())
    }
}
