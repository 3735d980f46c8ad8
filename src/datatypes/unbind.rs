use crate::datatypes::CommandId;
use crate::macros::header_only_pdu;

header_only_pdu!(
    /// unbind (section 4.2.1): either party ends the bound session.
    Unbind,
    CommandId::Unbind
);

header_only_pdu!(
    /// unbind_resp (section 4.2.2)
    UnbindResponse,
    CommandId::UnbindResp
);
