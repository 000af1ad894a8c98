use std::fmt::Write as _;
use serde_json::{Map, Value};
use crate::api::ApiError;
use crate::canvas::geometry::Point;
use crate::dialog::{escape, FormError};
use crate::editor::effects::Request;
use crate::model::schema::{parse_clock_time, FieldKind, LogicClass};
use crate::model::{NewNode, Node, NodeId, NodePatch};

pub const NAME_FIELD: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Password,
    Number { min: Option<i64>, max: Option<i64> },
    Time,
}

impl From<FieldKind> for InputKind {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String => InputKind::Text,
            FieldKind::Password => InputKind::Password,
            FieldKind::Integer { min, max } => InputKind::Number { min, max },
            FieldKind::Time => InputKind::Time,
        }
    }
}

impl InputKind {
    pub fn html_type(self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Password => "password",
            InputKind::Number { .. } => "number",
            InputKind::Time => "time",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub input: InputKind,
    pub value: String,
    pub errors: Vec<String>,
}

impl FormField {
    fn new(key: &str, label: &str, input: InputKind, value: String) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            input,
            value,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create { position: Point },
    Edit { node: NodeId },
}

/// Create/edit form for one node, laid out from its logic class schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeForm {
    pub mode: FormMode,
    pub logic_class: String,
    pub title: String,
    pub name: FormField,
    pub fields: Vec<FormField>,
    /// Messages not tied to a single input.
    pub errors: Vec<String>,
    pub disabled: bool,
}

impl NodeForm {
    pub fn create(logic_key: &str, logic: &LogicClass, position: Point) -> Self {
        Self::build(FormMode::Create { position }, logic_key, logic, "", &Map::new())
    }

    pub fn edit(node: &Node, logic: &LogicClass) -> Self {
        Self::build(
            FormMode::Edit { node: node.id },
            &node.logic_class,
            logic,
            &node.name,
            &node.settings,
        )
    }

    fn build(mode: FormMode, logic_key: &str, logic: &LogicClass, name: &str, settings: &Map<String, Value>) -> Self {
        let fields = logic
            .settings_fields
            .iter()
            .map(|(key, field)| {
                let value = match settings.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                FormField::new(key, &field.label, field.kind.into(), value)
            })
            .collect();
        Self {
            mode,
            logic_class: logic_key.to_string(),
            title: logic.name.clone(),
            name: FormField::new(NAME_FIELD, "Name", InputKind::Text, name.to_string()),
            fields,
            errors: Vec::new(),
            disabled: false,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        if key == NAME_FIELD {
            return Some(&self.name);
        }
        self.fields.iter().find(|f| f.key == key)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut FormField> {
        if key == NAME_FIELD {
            return Some(&mut self.name);
        }
        self.fields.iter_mut().find(|f| f.key == key)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), FormError> {
        if self.disabled {
            return Err(FormError::Disabled);
        }
        let field = self
            .field_mut(key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        field.value = value.to_string();
        Ok(())
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.name.errors.clear();
        for field in &mut self.fields {
            field.errors.clear();
        }
    }

    /// Collect settings values. Integer fields become numbers, blank
    /// integer and time fields are left out. Unparsable numbers and times
    /// are field errors.
    fn collect_settings(&mut self) -> Result<Map<String, Value>, FormError> {
        let mut settings = Map::new();
        let mut invalid = false;
        for field in &mut self.fields {
            let raw = field.value.trim();
            let value = match field.input {
                InputKind::Number { .. } if raw.is_empty() => continue,
                InputKind::Number { .. } => match raw.parse::<i64>() {
                    Ok(n) => Value::from(n),
                    Err(_) => {
                        field.errors.push("Enter a whole number.".to_string());
                        invalid = true;
                        continue;
                    }
                },
                InputKind::Time if raw.is_empty() => continue,
                InputKind::Time => match parse_clock_time(raw) {
                    Some(_) => Value::String(raw.to_string()),
                    None => {
                        field.errors.push("Enter a valid time.".to_string());
                        invalid = true;
                        continue;
                    }
                },
                InputKind::Text | InputKind::Password => Value::String(field.value.clone()),
            };
            settings.insert(field.key.clone(), value);
        }
        if invalid {
            return Err(FormError::Invalid);
        }
        Ok(settings)
    }

    /// Validate locally and lock the form. Returns the request to send.
    pub fn begin_submit(&mut self) -> Result<Request, FormError> {
        if self.disabled {
            return Err(FormError::Disabled);
        }
        self.clear_errors();
        let settings = self.collect_settings()?;
        let name = self.name.value.trim().to_string();
        self.disabled = true;

        Ok(match &self.mode {
            FormMode::Create { position } => Request::CreateNode(NewNode {
                name,
                logic_class: self.logic_class.clone(),
                settings,
                pos_x: position.x,
                pos_y: position.y,
            }),
            FormMode::Edit { node } => Request::UpdateNode {
                node: *node,
                patch: NodePatch {
                    name: Some(name),
                    settings: Some(settings),
                    ..NodePatch::default()
                },
            },
        })
    }

    /// Unlock the form and show the server's complaints next to their inputs.
    pub fn fail(&mut self, error: &ApiError) {
        self.disabled = false;
        let ApiError::Validation(errors) = error else {
            self.errors.push(error.to_string());
            return;
        };
        for (path, messages) in &errors.fields {
            let target = match path.strip_prefix("settings.") {
                Some(key) => self.fields.iter_mut().find(|f| f.key == key),
                None if path == NAME_FIELD => Some(&mut self.name),
                None => None,
            };
            match target {
                Some(field) => field.errors.extend(messages.iter().cloned()),
                None if path == "non_field_errors" => self.errors.extend(messages.iter().cloned()),
                None => self
                    .errors
                    .extend(messages.iter().map(|m| format!("{}: {}", path, m))),
            }
        }
    }

    pub fn render_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<form class=\"node_form\"><h2>{}</h2>", escape(&self.title));
        render_errors(&mut html, &self.errors);
        render_field(&mut html, &self.name, self.disabled);
        for field in &self.fields {
            render_field(&mut html, field, self.disabled);
        }
        let label = match self.mode {
            FormMode::Create { .. } => "Create",
            FormMode::Edit { .. } => "Save",
        };
        let _ = write!(
            html,
            "<button type=\"submit\"{}>{}</button></form>",
            disabled_attr(self.disabled),
            label
        );
        html
    }
}

fn disabled_attr(disabled: bool) -> &'static str {
    if disabled { " disabled" } else { "" }
}

fn render_errors(html: &mut String, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    html.push_str("<ul class=\"errorlist\">");
    for e in errors {
        let _ = write!(html, "<li>{}</li>", escape(e));
    }
    html.push_str("</ul>");
}

fn render_field(html: &mut String, field: &FormField, disabled: bool) {
    let id = format!("field_{}", field.key);
    let _ = write!(
        html,
        "<p><label for=\"{id}\">{}</label><input id=\"{id}\" name=\"{}\" type=\"{}\" value=\"{}\"",
        escape(&field.label),
        escape(&field.key),
        field.input.html_type(),
        escape(&field.value),
    );
    if let InputKind::Number { min, max } = field.input {
        if let Some(min) = min {
            let _ = write!(html, " min=\"{}\"", min);
        }
        if let Some(max) = max {
            let _ = write!(html, " max=\"{}\"", max);
        }
    }
    let _ = write!(html, "{}>", disabled_attr(disabled));
    render_errors(html, &field.errors);
    html.push_str("</p>");
}
