//! A small typed form model.
//!
//! Forms are built by factories, filled with submitted values, validated
//! against per-field [`Rule`]s and then handed back to the factory for the
//! submit step. The whole form serializes to JSON so that any front end can
//! render it.

pub mod request_password;
pub mod user_form;

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

pub use request_password::RequestPasswordFormFactory;
pub use user_form::{UserFormDataProvider, UserFormFactory, UserFormOutcome};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid regex pattern defined in code")
    })
}

/// Loose e-mail syntax check: one `@` and a dotted domain.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Checkbox,
    Select { options: Vec<SelectOption> },
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Required { message: String },
    Email { message: String },
    Integer { message: String },
    /// Required while the checkbox `field` is checked.
    RequiredIf { field: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub group: Option<String>,
    pub placeholder: Option<String>,
    pub description: Option<String>,
    pub rules: Vec<Rule>,
    pub value: Option<String>,
    pub errors: Vec<String>,
}

impl Field {
    fn new(name: &str, label: String, kind: FieldKind, group: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            label,
            kind,
            group,
            placeholder: None,
            description: None,
            rules: Vec::new(),
            value: None,
            errors: Vec::new(),
        }
    }

    pub fn placeholder(&mut self, text: impl Into<String>) -> &mut Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn description(&mut self, text: impl Into<String>) -> &mut Self {
        self.description = Some(text.into());
        self
    }

    pub fn required(&mut self, message: impl Into<String>) -> &mut Self {
        self.rules.push(Rule::Required {
            message: message.into(),
        });
        self
    }

    pub fn email(&mut self, message: impl Into<String>) -> &mut Self {
        self.rules.push(Rule::Email {
            message: message.into(),
        });
        self
    }

    pub fn integer(&mut self, message: impl Into<String>) -> &mut Self {
        self.rules.push(Rule::Integer {
            message: message.into(),
        });
        self
    }

    pub fn required_if(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.rules.push(Rule::RequiredIf {
            field: field.to_string(),
            message: message.into(),
        });
        self
    }

    /// Trimmed value, `None` when blank.
    #[must_use]
    pub fn filled(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        matches!(
            self.value.as_deref().map(str::trim),
            Some("1" | "true" | "on" | "yes")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Form {
    pub name: String,
    pub groups: Vec<String>,
    pub fields: Vec<Field>,
    pub submit_label: Option<String>,
    /// Errors not bound to a single field.
    pub errors: Vec<String>,
    #[serde(skip)]
    current_group: Option<String>,
}

impl Form {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Start a group; fields added afterwards belong to it.
    pub fn add_group(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        self.groups.push(label.clone());
        self.current_group = Some(label);
        self
    }

    fn push_field(&mut self, name: &str, label: String, kind: FieldKind) -> &mut Field {
        let field = Field::new(name, label, kind, self.current_group.clone());
        self.fields.push(field);
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    pub fn add_text(&mut self, name: &str, label: impl Into<String>) -> &mut Field {
        self.push_field(name, label.into(), FieldKind::Text)
    }

    pub fn add_email(&mut self, name: &str, label: impl Into<String>) -> &mut Field {
        self.push_field(name, label.into(), FieldKind::Email)
    }

    pub fn add_password(&mut self, name: &str, label: impl Into<String>) -> &mut Field {
        self.push_field(name, label.into(), FieldKind::Password)
    }

    pub fn add_checkbox(&mut self, name: &str, label: impl Into<String>) -> &mut Field {
        self.push_field(name, label.into(), FieldKind::Checkbox)
    }

    pub fn add_select(
        &mut self,
        name: &str,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> &mut Field {
        self.push_field(name, label.into(), FieldKind::Select { options })
    }

    pub fn add_hidden(&mut self, name: &str) -> &mut Field {
        self.push_field(name, String::new(), FieldKind::Hidden)
    }

    pub fn set_submit_label(&mut self, label: impl Into<String>) {
        self.submit_label = Some(label.into());
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Set initial values. Unknown names are ignored.
    pub fn set_defaults(&mut self, defaults: &HashMap<String, String>) {
        for field in &mut self.fields {
            if let Some(value) = defaults.get(&field.name) {
                field.value = Some(value.clone());
            }
        }
    }

    /// Replace every field value with the submitted one. A field missing from
    /// `values` ends up empty, which for a checkbox means unchecked.
    pub fn fill(&mut self, values: &HashMap<String, String>) {
        for field in &mut self.fields {
            field.value = values.get(&field.name).cloned();
            field.errors.clear();
        }
        self.errors.clear();
    }

    /// Current values of all non-empty fields.
    #[must_use]
    pub fn values(&self) -> HashMap<String, String> {
        self.fields
            .iter()
            .filter_map(|f| f.value.clone().map(|v| (f.name.clone(), v)))
            .collect()
    }

    /// Trimmed value of a field, `None` when missing or blank.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Field::filled)
    }

    #[must_use]
    pub fn is_checked(&self, name: &str) -> bool {
        self.field(name).is_some_and(Field::is_checked)
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.field_mut(field) {
            Some(f) => f.errors.push(message),
            None => self.errors.push(message),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.fields.iter().any(|f| !f.errors.is_empty())
    }

    /// All field errors as `(field, message)` pairs followed by form errors
    /// under an empty name.
    #[must_use]
    pub fn error_list(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .flat_map(|f| f.errors.iter().map(|e| (f.name.clone(), e.clone())))
            .chain(self.errors.iter().map(|e| (String::new(), e.clone())))
            .collect()
    }

    /// Run every field rule. The first failing rule of a field stops the
    /// remaining rules of that field. Returns `true` when the form is valid.
    pub fn validate(&mut self) -> bool {
        let checked: HashMap<String, bool> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.is_checked()))
            .collect();

        for field in &mut self.fields {
            let filled = field.filled().map(str::to_string);
            for rule in &field.rules {
                let failed = match rule {
                    Rule::Required { message } => filled.is_none().then_some(message),
                    Rule::Email { message } => filled
                        .as_deref()
                        .is_some_and(|v| !is_valid_email(v))
                        .then_some(message),
                    Rule::Integer { message } => filled
                        .as_deref()
                        .is_some_and(|v| v.parse::<i64>().is_err())
                        .then_some(message),
                    Rule::RequiredIf { field: other, message } => {
                        (checked.get(other).copied().unwrap_or(false) && filled.is_none())
                            .then_some(message)
                    }
                };

                if let Some(message) = failed {
                    field.errors.push(message.clone());
                    break;
                }
            }
        }

        !self.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.sk"));
        assert!(!is_valid_email("jane"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("ja ne@example.com"));
    }

    #[test]
    fn fields_inherit_current_group() {
        let mut form = Form::new("test");
        form.add_text("a", "A");
        form.add_group("Second");
        form.add_text("b", "B");

        assert_eq!(form.field("a").unwrap().group, None);
        assert_eq!(form.field("b").unwrap().group.as_deref(), Some("Second"));
        assert_eq!(form.groups, vec!["Second".to_string()]);
    }

    #[test]
    fn required_and_email_rules() {
        let mut form = Form::new("test");
        form.add_email("email", "E-mail")
            .required("missing")
            .email("bad format");

        form.fill(&values(&[("email", "  ")]));
        assert!(!form.validate());
        assert_eq!(form.field("email").unwrap().errors, vec!["missing"]);

        form.fill(&values(&[("email", "nope")]));
        assert!(!form.validate());
        assert_eq!(form.field("email").unwrap().errors, vec!["bad format"]);

        form.fill(&values(&[("email", "jane@example.com")]));
        assert!(form.validate());
    }

    #[test]
    fn required_if_follows_checkbox() {
        let mut form = Form::new("test");
        form.add_checkbox("is_institution", "Institution");
        form.add_text("institution_name", "Name")
            .required_if("is_institution", "name needed");

        form.fill(&values(&[]));
        assert!(form.validate());

        form.fill(&values(&[("is_institution", "1")]));
        assert!(!form.validate());
        assert_eq!(
            form.error_list(),
            vec![("institution_name".to_string(), "name needed".to_string())]
        );
    }

    #[test]
    fn integer_rule_only_applies_when_filled() {
        let mut form = Form::new("test");
        form.add_text("ext_id", "External").integer("not a number");

        form.fill(&values(&[("ext_id", "")]));
        assert!(form.validate());

        form.fill(&values(&[("ext_id", "12a")]));
        assert!(!form.validate());
    }

    #[test]
    fn unknown_field_error_goes_to_form() {
        let mut form = Form::new("test");
        form.add_error("ghost", "boom");
        assert!(form.has_errors());
        assert_eq!(form.errors, vec!["boom"]);
    }

    #[test]
    fn serializes_kind_inline() {
        let mut form = Form::new("test");
        form.add_select(
            "role",
            "Role",
            vec![SelectOption {
                value: "user".into(),
                label: "User".into(),
            }],
        );

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["fields"][0]["type"], "select");
        assert_eq!(json["fields"][0]["options"][0]["value"], "user");
    }
}
