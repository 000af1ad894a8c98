use serde::{Serialize, Deserialize};

pub const COUNTRY_CODE_VARIABLE: &str = "countrycode";
pub const TIMEZONE_VARIABLE: &str = "timezone";

/// The two global variables edited from the settings dialog. `None` means unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub country_code: Option<String>,
    pub timezone: Option<String>,
}

impl Settings {
    pub fn new(country_code: &str, timezone: &str) -> Self {
        Self {
            country_code: Some(country_code.to_string()),
            timezone: Some(timezone.to_string()),
        }
    }

    /// Variable name/value pairs that should be written to the server.
    pub fn variables(&self) -> Vec<(&'static str, &str)> {
        let mut vars = Vec::new();
        if let Some(code) = &self.country_code {
            vars.push((COUNTRY_CODE_VARIABLE, code.as_str()));
        }
        if let Some(tz) = &self.timezone {
            vars.push((TIMEZONE_VARIABLE, tz.as_str()));
        }
        vars
    }
}
