//! Application settings used by numbering and export

use super::template::{DEFAULT_FILENAME_PATTERN, RequiredFields};
use serde::{Deserialize, Serialize};

/// How order numbers are produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NumberingMode {
    /// Pattern carries a `{SEQ}` token backed by a persistent counter
    Sequential,
    /// Pattern is formatted from date/prefix only
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Directory exports go to when the save dialog is skipped
    #[serde(default, alias = "output_directory")]
    pub output_directory: String,
    /// Date format for the template's date cell (`YYYY`, `MM`, `DD` tokens)
    #[serde(default = "default_excel_date_format", alias = "excel_date_format")]
    pub excel_date_format: String,
    #[serde(default = "default_order_number_format", alias = "order_number_format")]
    pub order_number_format: String,
    /// Value of the `{CUSTOM}` token
    #[serde(default, alias = "order_number_prefix")]
    pub order_number_prefix: String,
    #[serde(default = "default_true", alias = "order_number_reset_daily")]
    pub order_number_reset_daily: bool,
    /// Width of a bare `{SEQ}` token
    #[serde(default = "default_digits", alias = "order_number_digits")]
    pub order_number_digits: u32,
    /// Explicit numbering mode; inferred from the pattern when absent
    #[serde(default, alias = "numbering_mode")]
    pub numbering_mode: Option<NumberingMode>,
    #[serde(default, alias = "default_template_id")]
    pub default_template_id: String,
    #[serde(default = "default_filename_format", alias = "excel_filename_format")]
    pub excel_filename_format: String,
    #[serde(default, alias = "auto_open_excel")]
    pub auto_open_excel: bool,
    #[serde(default, alias = "skip_save_dialog")]
    pub skip_save_dialog: bool,
    /// Global required-field flags; replaces each template's own flags when set
    #[serde(default, alias = "template_validation")]
    pub template_validation: Option<RequiredFields>,
    #[serde(default, alias = "updated_at")]
    pub updated_at: i64,
}

fn default_excel_date_format() -> String {
    "YYYY.MM.DD".to_string()
}

fn default_order_number_format() -> String {
    "NO.{SEQ:6}".to_string()
}

fn default_filename_format() -> String {
    DEFAULT_FILENAME_PATTERN.to_string()
}

fn default_true() -> bool {
    true
}

fn default_digits() -> u32 {
    6
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            output_directory: String::new(),
            excel_date_format: default_excel_date_format(),
            order_number_format: default_order_number_format(),
            order_number_prefix: String::new(),
            order_number_reset_daily: true,
            order_number_digits: default_digits(),
            numbering_mode: None,
            default_template_id: String::new(),
            excel_filename_format: default_filename_format(),
            auto_open_excel: false,
            skip_save_dialog: false,
            template_validation: None,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.order_number_format, "NO.{SEQ:6}");
        assert_eq!(settings.excel_date_format, "YYYY.MM.DD");
        assert!(settings.order_number_reset_daily);
    }

    #[test]
    fn test_legacy_snake_case_keys() {
        let json = r#"{"skip_save_dialog":true,"output_directory":"/tmp/out","numbering_mode":"manual","order_number_digits":4}"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert!(settings.skip_save_dialog);
        assert_eq!(settings.output_directory, "/tmp/out");
        assert_eq!(settings.numbering_mode, Some(NumberingMode::Manual));
        assert_eq!(settings.order_number_digits, 4);
    }
}
