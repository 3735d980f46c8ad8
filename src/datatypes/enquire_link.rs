use crate::datatypes::CommandId;
use crate::macros::header_only_pdu;

header_only_pdu!(
    /// enquire_link (section 4.11.1): link confirmation, valid in any bound state.
    EnquireLink,
    CommandId::EnquireLink
);

header_only_pdu!(
    /// enquire_link_resp (section 4.11.2)
    EnquireLinkResponse,
    CommandId::EnquireLinkResp
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};
    use std::io::Cursor;

    #[test]
    fn enquire_link_resp_parses() {
        let bytes = EnquireLinkResponse::new(0x1234).to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        assert_eq!(
            Frame::parse(&mut cursor).unwrap(),
            Frame::EnquireLinkResp(EnquireLinkResponse::new(0x1234))
        );
    }
}
