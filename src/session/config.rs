// ABOUTME: Session configuration holding the identity fields passed through to bind requests
// ABOUTME: Built with a fluent builder that validates field lengths before a session is created

use crate::datatypes::{
    BindRequest, BindType, BindValidationError, CommandStatus, InterfaceVersion,
    NumericPlanIndicator, TypeOfNumber, validate_bind_fields,
};
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidField(#[from] BindValidationError),

    #[error("system_id must not be empty")]
    MissingSystemId,
}

/// Identity of this endpoint, sent unmodified in bind requests.
///
/// The server role only uses `system_id`, which it returns in bind responses.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub source_ton: TypeOfNumber,
    pub source_npi: NumericPlanIndicator,
    pub source_address_range: String,
    pub interface_version: InterfaceVersion,
}

impl SessionConfig {
    pub fn builder(system_id: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(system_id)
    }

    /// Build the bind request for `bind_type` from this configuration
    pub fn bind_request(&self, bind_type: BindType, sequence_number: u32) -> BindRequest {
        BindRequest {
            bind_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: self.system_id.clone(),
            password: self.password.clone(),
            system_type: self.system_type.clone(),
            interface_version: self.interface_version,
            addr_ton: self.source_ton,
            addr_npi: self.source_npi,
            address_range: self.source_address_range.clone(),
        }
    }
}

pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            config: SessionConfig {
                system_id: system_id.into(),
                password: String::new(),
                system_type: String::new(),
                source_ton: TypeOfNumber::Unknown,
                source_npi: NumericPlanIndicator::Unknown,
                source_address_range: String::new(),
                interface_version: InterfaceVersion::SmppV34,
            },
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn system_type(mut self, system_type: impl Into<String>) -> Self {
        self.config.system_type = system_type.into();
        self
    }

    pub fn source_ton(mut self, ton: TypeOfNumber) -> Self {
        self.config.source_ton = ton;
        self
    }

    pub fn source_npi(mut self, npi: NumericPlanIndicator) -> Self {
        self.config.source_npi = npi;
        self
    }

    pub fn source_address_range(mut self, range: impl Into<String>) -> Self {
        self.config.source_address_range = range.into();
        self
    }

    pub fn interface_version(mut self, version: InterfaceVersion) -> Self {
        self.config.interface_version = version;
        self
    }

    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        if self.config.system_id.is_empty() {
            return Err(ConfigError::MissingSystemId);
        }
        validate_bind_fields(
            &self.config.system_id,
            &self.config.password,
            &self.config.system_type,
            &self.config.source_address_range,
        )?;
        Ok(self.config)
    }
}
