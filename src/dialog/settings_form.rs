use std::fmt::Write as _;
use crate::api::ApiError;
use crate::dialog::{escape, FormError};
use crate::editor::effects::Request;
use crate::model::schema::StaticData;
use crate::model::settings::Settings;

/// Country and timezone pickers for the two global variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    /// `(code, display name)` pairs.
    pub countries: Vec<(String, String)>,
    /// `(tz name, display label)` pairs.
    pub timezones: Vec<(String, String)>,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
    pub errors: Vec<String>,
    pub disabled: bool,
}

impl SettingsForm {
    pub fn new(data: &StaticData, current: &Settings) -> Self {
        Self {
            countries: data
                .countries
                .iter()
                .map(|(code, c)| (code.clone(), c.name.clone()))
                .collect(),
            timezones: data.timezones.clone(),
            country_code: current.country_code.clone(),
            timezone: current.timezone.clone(),
            errors: Vec::new(),
            disabled: false,
        }
    }

    /// Pick a country; its default timezone is preselected when none is chosen yet.
    pub fn select_country(&mut self, data: &StaticData, code: &str) -> Result<(), FormError> {
        if self.disabled {
            return Err(FormError::Disabled);
        }
        let country = data
            .countries
            .get(code)
            .ok_or_else(|| FormError::UnknownChoice(code.to_string()))?;
        self.country_code = Some(code.to_string());
        if self.timezone.is_none() && !country.timezones.is_empty() {
            self.timezone = Some(country.timezones.clone());
        }
        Ok(())
    }

    pub fn select_timezone(&mut self, tz: &str) -> Result<(), FormError> {
        if self.disabled {
            return Err(FormError::Disabled);
        }
        if !self.timezones.iter().any(|(name, _)| name == tz) {
            return Err(FormError::UnknownChoice(tz.to_string()));
        }
        self.timezone = Some(tz.to_string());
        Ok(())
    }

    pub fn begin_submit(&mut self) -> Result<Request, FormError> {
        if self.disabled {
            return Err(FormError::Disabled);
        }
        self.errors.clear();
        self.disabled = true;
        Ok(Request::SaveSettings(Settings {
            country_code: self.country_code.clone(),
            timezone: self.timezone.clone(),
        }))
    }

    pub fn fail(&mut self, error: &ApiError) {
        self.disabled = false;
        self.errors.push(error.to_string());
    }

    pub fn render_html(&self) -> String {
        let mut html = String::from("<form class=\"settings_form\">");
        for e in &self.errors {
            let _ = write!(html, "<p class=\"error\">{}</p>", escape(e));
        }
        render_select(&mut html, "countrycode", "Country", &self.countries, self.country_code.as_deref(), self.disabled);
        render_select(&mut html, "timezone", "Timezone", &self.timezones, self.timezone.as_deref(), self.disabled);
        let _ = write!(
            html,
            "<button type=\"submit\"{}>Save</button></form>",
            if self.disabled { " disabled" } else { "" }
        );
        html
    }
}

fn render_select(
    html: &mut String,
    name: &str,
    label: &str,
    options: &[(String, String)],
    selected: Option<&str>,
    disabled: bool,
) {
    let _ = write!(
        html,
        "<p><label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\"{}>",
        if disabled { " disabled" } else { "" }
    );
    if selected.is_none() {
        html.push_str("<option value=\"\" selected>-</option>");
    }
    for (value, text) in options {
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            escape(value),
            if Some(value.as_str()) == selected { " selected" } else { "" },
            escape(text)
        );
    }
    html.push_str("</select></p>");
}
