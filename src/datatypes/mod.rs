mod bind;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod submit_sm;
mod type_of_number;
mod unbind;

pub use bind::{
    BindRequest, BindRequestBuilder, BindResponse, BindType, BindValidationError,
    validate_bind_fields,
};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmBuilder, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmBuilder, SubmitSmResponse};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};

// SMPP v3.4 field length limits, excluding the NUL terminator
pub const MAX_SYSTEM_ID_LENGTH: usize = 15;
pub const MAX_PASSWORD_LENGTH: usize = 8;
pub const MAX_SYSTEM_TYPE_LENGTH: usize = 12;
pub const MAX_ADDRESS_RANGE_LENGTH: usize = 40;
pub const MAX_MESSAGE_ID_LENGTH: usize = 64;
pub const MAX_ADDRESS_LENGTH: usize = 20;
pub const MAX_SERVICE_TYPE_LENGTH: usize = 5;
pub const MAX_TIME_LENGTH: usize = 16;
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// esm_class bit 6: short_message begins with a User Data Header
pub const ESM_CLASS_UDHI: u8 = 0x40;

/// registered_delivery: request an SMSC delivery receipt
pub const REGISTERED_DELIVERY_RECEIPT: u8 = 0x01;
