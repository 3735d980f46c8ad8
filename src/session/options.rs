use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use crate::macros::builder_setters;

/// Per-message options applied to an outgoing submit_sm or deliver_sm.
///
/// Unset `data_coding` means the SMSC default alphabet and selects the
/// default part size when segmenting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub data_coding: Option<u8>,
    pub esm_class: Option<u8>,
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub registered_delivery: u8,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    builder_setters! {
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        dest_addr_ton: TypeOfNumber,
        dest_addr_npi: NumericPlanIndicator,
        protocol_id: u8,
        priority_flag: u8,
        registered_delivery: u8,
    }

    pub fn data_coding(mut self, data_coding: u8) -> Self {
        self.data_coding = Some(data_coding);
        self
    }

    pub fn esm_class(mut self, esm_class: u8) -> Self {
        self.esm_class = Some(esm_class);
        self
    }

    pub fn service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    /// Raw data_coding octet, 0 when unset
    pub fn data_coding_octet(&self) -> u8 {
        self.data_coding.unwrap_or(0)
    }
}
