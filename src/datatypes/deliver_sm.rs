use crate::datatypes::CommandId;
use crate::macros::{message_id_response_pdu, short_message_pdu};

short_message_pdu!(
    /// deliver_sm (section 4.6.1): the message center delivers a short
    /// message to a bound receiver or transceiver.
    DeliverSm,
    DeliverSmBuilder,
    CommandId::DeliverSm
);

message_id_response_pdu!(
    /// deliver_sm_resp (section 4.6.2): message_id is unused and sent empty.
    DeliverSmResponse,
    CommandId::DeliverSmResp
);
