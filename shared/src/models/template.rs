//! Spreadsheet template model
//!
//! Persisted shape of an export template. Keys are camelCase on the wire;
//! snake_case keys from older settings files are accepted too.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Filename pattern used when neither template nor settings provide one
pub const DEFAULT_FILENAME_PATTERN: &str = "{date}_{customerName}_{orderNumber}";

/// Export template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    pub id: String,
    pub name: String,
    /// The xlsx file, base64 encoded
    #[serde(default, alias = "template_base64")]
    pub template_base64: String,
    /// Original file name of the uploaded workbook
    #[serde(default, alias = "file_name")]
    pub file_name: String,
    #[serde(default, alias = "filename_pattern")]
    pub filename_pattern: String,
    #[serde(default, alias = "is_default")]
    pub is_default: bool,
    #[serde(default)]
    pub mappings: TemplateMappings,
    #[serde(default, alias = "required_fields")]
    pub required_fields: RequiredFields,
    #[serde(default, alias = "created_at")]
    pub created_at: i64,
    #[serde(default, alias = "updated_at")]
    pub updated_at: i64,
}

impl TemplateConfig {
    /// Decode the workbook payload; `None` when no file was uploaded
    ///
    /// Accepts both bare base64 and `data:<mime>;base64,` URLs.
    pub fn payload(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        let raw = self.template_base64.trim();
        let raw = match raw.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).map(Some)
    }

    /// Encode workbook bytes into the payload field
    pub fn set_payload(&mut self, bytes: &[u8]) {
        self.template_base64 = STANDARD.encode(bytes);
    }
}

/// Field → cell mapping. Empty strings mean "not mapped".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMappings {
    #[serde(default, alias = "customer_name")]
    pub customer_name: String,
    #[serde(default, alias = "customer_phone")]
    pub customer_phone: String,
    #[serde(default, alias = "customer_plate")]
    pub customer_plate: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, alias = "order_number")]
    pub order_number: String,
    #[serde(default, alias = "order_remark")]
    pub order_remark: String,
    #[serde(default, alias = "total_amount")]
    pub total_amount: String,
    /// First item row (1-based)
    #[serde(default, alias = "item_start_row")]
    pub item_start_row: i32,
    /// Last item row (1-based); 0 means no limit
    #[serde(default, alias = "item_end_row")]
    pub item_end_row: i32,
    #[serde(default)]
    pub columns: TemplateColumns,
}

/// Item column letters. Empty strings mean "not mapped".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateColumns {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub remark: String,
}

/// Which mappings must be present before a template can be used
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFields {
    #[serde(default, alias = "customer_name", alias = "customerName")]
    pub require_customer_name: bool,
    #[serde(default, alias = "customer_phone", alias = "customerPhone")]
    pub require_customer_phone: bool,
    #[serde(default, alias = "customer_plate", alias = "customerPlate")]
    pub require_customer_plate: bool,
    #[serde(default, alias = "date")]
    pub require_date: bool,
    #[serde(default, alias = "order_number", alias = "orderNumber")]
    pub require_order_number: bool,
    #[serde(default, alias = "order_remark", alias = "orderRemark")]
    pub require_order_remark: bool,
    #[serde(default, alias = "total_amount", alias = "totalAmount")]
    pub require_total_amount: bool,
    #[serde(default, alias = "item_name", alias = "itemName")]
    pub require_item_name: bool,
    #[serde(default, alias = "item_unit", alias = "itemUnit")]
    pub require_item_unit: bool,
    #[serde(default, alias = "item_quantity", alias = "itemQuantity")]
    pub require_item_quantity: bool,
    #[serde(default, alias = "item_price", alias = "itemPrice")]
    pub require_item_price: bool,
    #[serde(default, alias = "item_total", alias = "itemTotal")]
    pub require_item_total: bool,
    #[serde(default, alias = "item_remark", alias = "itemRemark")]
    pub require_item_remark: bool,
}
