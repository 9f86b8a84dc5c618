//! Parsed template mappings
//!
//! Addresses are parsed once into [`CellRef`]s and column indices; binding
//! never touches "A1" text again.

use crate::core::{ValidationErrors, ValidationIssue};
use quick_xlsx::{CellRef, column_index};
use shared::models::{RequiredFields, TemplateConfig};

/// First row items may start on (row 1 holds the sheet title)
pub const MIN_ITEM_START_ROW: i32 = 2;

/// Header fields a template can map to single cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderField {
    CustomerName,
    CustomerPhone,
    CustomerPlate,
    Date,
    OrderNumber,
    OrderRemark,
    TotalAmount,
}

impl HeaderField {
    pub const ALL: [HeaderField; 7] = [
        Self::CustomerName,
        Self::CustomerPhone,
        Self::CustomerPlate,
        Self::Date,
        Self::OrderNumber,
        Self::OrderRemark,
        Self::TotalAmount,
    ];

    /// Mapping key as stored in the template
    pub fn key(&self) -> &'static str {
        match self {
            Self::CustomerName => "customerName",
            Self::CustomerPhone => "customerPhone",
            Self::CustomerPlate => "customerPlate",
            Self::Date => "date",
            Self::OrderNumber => "orderNumber",
            Self::OrderRemark => "orderRemark",
            Self::TotalAmount => "totalAmount",
        }
    }

    fn address(self, template: &TemplateConfig) -> &str {
        let m = &template.mappings;
        match self {
            Self::CustomerName => &m.customer_name,
            Self::CustomerPhone => &m.customer_phone,
            Self::CustomerPlate => &m.customer_plate,
            Self::Date => &m.date,
            Self::OrderNumber => &m.order_number,
            Self::OrderRemark => &m.order_remark,
            Self::TotalAmount => &m.total_amount,
        }
    }

    fn required(self, flags: &RequiredFields) -> bool {
        match self {
            Self::CustomerName => flags.require_customer_name,
            Self::CustomerPhone => flags.require_customer_phone,
            Self::CustomerPlate => flags.require_customer_plate,
            Self::Date => flags.require_date,
            Self::OrderNumber => flags.require_order_number,
            Self::OrderRemark => flags.require_order_remark,
            Self::TotalAmount => flags.require_total_amount,
        }
    }
}

/// Per-item attributes a template can map to columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemField {
    Name,
    Unit,
    Quantity,
    Price,
    Total,
    Remark,
}

impl ItemField {
    pub const ALL: [ItemField; 6] = [
        Self::Name,
        Self::Unit,
        Self::Quantity,
        Self::Price,
        Self::Total,
        Self::Remark,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "itemName",
            Self::Unit => "itemUnit",
            Self::Quantity => "itemQuantity",
            Self::Price => "itemPrice",
            Self::Total => "itemTotal",
            Self::Remark => "itemRemark",
        }
    }

    fn column(self, template: &TemplateConfig) -> &str {
        let c = &template.mappings.columns;
        match self {
            Self::Name => &c.name,
            Self::Unit => &c.unit,
            Self::Quantity => &c.quantity,
            Self::Price => &c.price,
            Self::Total => &c.total,
            Self::Remark => &c.remark,
        }
    }

    fn required(self, flags: &RequiredFields) -> bool {
        match self {
            Self::Name => flags.require_item_name,
            Self::Unit => flags.require_item_unit,
            Self::Quantity => flags.require_item_quantity,
            Self::Price => flags.require_item_price,
            Self::Total => flags.require_item_total,
            Self::Remark => flags.require_item_remark,
        }
    }
}

/// Last item row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowBound {
    Bounded(u32),
    Unbounded,
}

/// Template mappings, parsed and structurally checked
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    pub headers: Vec<(HeaderField, CellRef)>,
    pub start_row: u32,
    pub end_row: RowBound,
    /// Zero-based column index per mapped item attribute
    pub columns: Vec<(ItemField, u32)>,
    pub required: RequiredFields,
}

impl TemplateLayout {
    /// Parse every mapping, collecting all problems
    ///
    /// `overrides` replaces the template's own required-field flags.
    pub fn parse(
        template: &TemplateConfig,
        overrides: Option<&RequiredFields>,
    ) -> Result<Self, ValidationErrors> {
        let required = overrides.copied().unwrap_or(template.required_fields);
        let mut errors = ValidationErrors::new();

        let mut headers = Vec::new();
        for field in HeaderField::ALL {
            let address = field.address(template).trim();
            if address.is_empty() {
                if field.required(&required) {
                    errors.push(ValidationIssue::MissingRequiredMapping {
                        field: field.key().to_string(),
                    });
                }
                continue;
            }
            match CellRef::parse(address) {
                Ok(cell) => headers.push((field, cell)),
                Err(_) => errors.push(ValidationIssue::MalformedCellAddress {
                    field: field.key().to_string(),
                    address: address.to_string(),
                }),
            }
        }

        let mut columns = Vec::new();
        for field in ItemField::ALL {
            let letters = field.column(template).trim();
            if letters.is_empty() {
                if field.required(&required) {
                    errors.push(ValidationIssue::MissingRequiredColumn {
                        field: field.key().to_string(),
                    });
                }
                continue;
            }
            match column_index(&letters.replace('$', "")) {
                Ok(col) => columns.push((field, col)),
                Err(_) => errors.push(ValidationIssue::MalformedCellAddress {
                    field: field.key().to_string(),
                    address: letters.to_string(),
                }),
            }
        }

        let start = template.mappings.item_start_row;
        let end = template.mappings.item_end_row;
        if start < MIN_ITEM_START_ROW {
            errors.push(ValidationIssue::InvalidStartRow { row: start });
        }
        let end_row = match end {
            0 => RowBound::Unbounded,
            e if e < 0 || (start >= MIN_ITEM_START_ROW && e < start) => {
                errors.push(ValidationIssue::InvalidItemRegion { start, end });
                RowBound::Unbounded
            }
            e => RowBound::Bounded(e as u32),
        };

        errors.into_result()?;
        Ok(Self {
            headers,
            start_row: start as u32,
            end_row,
            columns,
            required,
        })
    }

    /// Number of item rows; `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        match self.end_row {
            RowBound::Bounded(end) => Some((end - self.start_row + 1) as usize),
            RowBound::Unbounded => None,
        }
    }

    /// Overflow check for `item_count` items
    pub fn check_items(&self, item_count: usize) -> Result<(), ValidationIssue> {
        match self.capacity() {
            Some(capacity) if item_count > capacity => Err(ValidationIssue::ItemOverflow {
                items: item_count,
                capacity,
            }),
            _ => Ok(()),
        }
    }

    pub fn header(&self, field: HeaderField) -> Option<CellRef> {
        self.headers
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, cell)| *cell)
    }

    pub fn column(&self, field: ItemField) -> Option<u32> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, col)| *col)
    }
}

/// Full validation of a template for an order with `item_count` items
///
/// Mapping problems and overflow are reported together.
pub fn validate(
    template: &TemplateConfig,
    overrides: Option<&RequiredFields>,
    item_count: usize,
) -> Result<TemplateLayout, ValidationErrors> {
    match TemplateLayout::parse(template, overrides) {
        Ok(layout) => {
            layout.check_items(item_count)?;
            Ok(layout)
        }
        Err(mut errors) => {
            let m = &template.mappings;
            if m.item_start_row >= MIN_ITEM_START_ROW && m.item_end_row >= m.item_start_row {
                let capacity = (m.item_end_row - m.item_start_row + 1) as usize;
                if item_count > capacity {
                    errors.push(ValidationIssue::ItemOverflow {
                        items: item_count,
                        capacity,
                    });
                }
            }
            Err(errors)
        }
    }
}
