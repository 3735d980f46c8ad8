//! End-to-end tests: both session roles talking through encoded frames

use crate::codec::{CodecError, Encodable, Frame, PduHeader};
use crate::connection::Connection;
use crate::datatypes::*;
use crate::service::{SessionRunner, run_session};
use crate::session::segmenter::CONCAT_HEADER_LENGTH;
use crate::session::sequence::MAX_SEQUENCE_NUMBER;
use crate::session::*;
use bytes::BytesMut;
use proptest::prelude::*;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Encode then parse, as if the frame crossed a socket
fn over_the_wire(frame: Frame) -> Frame {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf).unwrap();
    let mut cursor = Cursor::new(&buf[..]);
    assert_eq!(Frame::check(&mut cursor).unwrap(), buf.len());
    Frame::parse(&mut cursor).unwrap()
}

/// Dispatch every frame in `frames` to `role`, collecting outcomes and replies
fn deliver_all<R: SessionRole>(
    role: &mut R,
    frames: Vec<Frame>,
) -> (Vec<SessionResult<Dispatched>>, Vec<Frame>) {
    let mut replies: Vec<Frame> = Vec::new();
    let outcomes = frames
        .into_iter()
        .map(|frame| dispatch(role, over_the_wire(frame), &mut replies))
        .collect();
    (outcomes, replies)
}

fn esme_config() -> SessionConfig {
    SessionConfig::builder("esme")
        .password("secret")
        .build()
        .unwrap()
}

fn bound_pair(bind_type: BindType) -> (Transmitter, ServerSession) {
    let mut esme = Transmitter::new(esme_config()).with_bind_type(bind_type);
    let mut smsc = ServerSession::new();

    let mut out: Vec<Frame> = Vec::new();
    esme.send_bind(&mut out).unwrap();
    let (outcomes, replies) = deliver_all(&mut smsc, out);
    assert!(matches!(outcomes[0], Ok(Dispatched::Bound(_))));

    let (outcomes, _) = deliver_all(&mut esme, replies);
    assert_eq!(
        outcomes[0].as_ref().unwrap(),
        &Dispatched::Bound(BindState::from(bind_type))
    );
    (esme, smsc)
}

#[test]
fn long_message_is_submitted_in_two_acknowledged_parts() {
    let (mut esme, mut smsc) = bound_pair(BindType::Transmitter);

    let body = "A".repeat(306);
    let mut out: Vec<Frame> = Vec::new();
    let sequence_numbers = esme
        .send_message("1001", "12345", "67890", body.as_bytes(), &MessageOptions::new(), &mut out)
        .unwrap();
    assert_eq!(sequence_numbers.len(), 2);
    assert_eq!(esme.ack_ids().len(), 2);

    for (index, frame) in out.iter().enumerate() {
        let Frame::SubmitSm(pdu) = frame else {
            panic!("expected submit_sm, got {frame:?}");
        };
        assert!(pdu.has_udh());
        assert_eq!(
            &pdu.short_message[..6],
            &[0x05, 0x00, 0x03, 1, 2, index as u8 + 1]
        );
        assert_eq!(pdu.short_message.len(), 6 + 153);
    }

    let (outcomes, replies) = deliver_all(&mut smsc, out);
    for outcome in &outcomes {
        assert!(matches!(outcome, Ok(Dispatched::SubmissionAccepted { .. })));
    }
    assert!(smsc.received_messages().is_empty());

    let (outcomes, _) = deliver_all(&mut esme, replies);
    for outcome in outcomes {
        match outcome.unwrap() {
            Dispatched::Acknowledged(ack) => {
                assert!(ack.is_accepted());
                assert_eq!(ack.message_id(), &MessageId::from("1001"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert!(esme.ack_ids().is_empty());
}

#[test]
fn ucs2_message_splits_into_three_parts() {
    let (mut esme, _smsc) = bound_pair(BindType::Transceiver);

    let body = [0x20u8; 140];
    let options = MessageOptions::new().data_coding(8);
    let mut out: Vec<Frame> = Vec::new();
    esme.send_message("m17", "1", "2", &body, &options, &mut out)
        .unwrap();

    let lengths: Vec<usize> = out
        .into_iter()
        .map(|frame| match over_the_wire(frame) {
            Frame::SubmitSm(pdu) => {
                assert_eq!(pdu.data_coding, 8);
                assert_eq!(pdu.esm_class & ESM_CLASS_UDHI, ESM_CLASS_UDHI);
                assert_eq!(pdu.short_message[3], 17);
                pdu.short_message.len() - CONCAT_HEADER_LENGTH
            }
            other => panic!("unexpected frame {other:?}"),
        })
        .collect();
    assert_eq!(lengths, vec![67, 67, 6]);
}

#[test]
fn short_message_goes_out_whole() {
    let (mut esme, _smsc) = bound_pair(BindType::Transmitter);

    let mut out: Vec<Frame> = Vec::new();
    esme.send_message("1", "1", "2", b"hello", &MessageOptions::new(), &mut out)
        .unwrap();
    match out.as_slice() {
        [Frame::SubmitSm(pdu)] => {
            assert!(!pdu.has_udh());
            assert_eq!(&pdu.short_message[..], b"hello");
        }
        other => panic!("unexpected frames {other:?}"),
    }
}

#[test]
fn rejected_part_is_reported_with_its_status() {
    let (mut esme, _smsc) = bound_pair(BindType::Transmitter);

    let mut out: Vec<Frame> = Vec::new();
    let sequence_numbers = esme
        .send_message("42", "1", "2", b"hi", &MessageOptions::new(), &mut out)
        .unwrap();

    let reply = Frame::SubmitSmResp(SubmitSmResponse::error(
        sequence_numbers[0],
        CommandStatus::ThrottlingError,
    ));
    let (outcomes, _) = deliver_all(&mut esme, vec![reply]);
    match outcomes.into_iter().next() {
        Some(Ok(Dispatched::Acknowledged(Acknowledgement::Rejected {
            message_id,
            status,
            ..
        }))) => {
            assert_eq!(message_id, MessageId::from("42"));
            assert_eq!(status, CommandStatus::ThrottlingError);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn duplicate_acknowledgement_is_an_orphan() {
    let (mut esme, mut smsc) = bound_pair(BindType::Transmitter);

    let mut out: Vec<Frame> = Vec::new();
    esme.send_message("5", "1", "2", b"x", &MessageOptions::new(), &mut out)
        .unwrap();
    let (_, replies) = deliver_all(&mut smsc, out);

    let twice = vec![replies[0].clone(), replies[0].clone()];
    let (outcomes, _) = deliver_all(&mut esme, twice);
    assert!(matches!(outcomes[0], Ok(Dispatched::Acknowledged(_))));
    assert!(matches!(outcomes[1], Ok(Dispatched::Orphaned(_))));
    assert!(esme.state().is_bound());
}

#[test]
fn mobile_originated_delivery_reaches_a_receiver() {
    let (mut esme, mut smsc) = bound_pair(BindType::Receiver);

    let mut out: Vec<Frame> = Vec::new();
    smsc.deliver_sm("mo-1", "555", "777", "ping", &MessageOptions::default(), &mut out)
        .unwrap();
    assert_eq!(smsc.sent_messages().len(), 1);

    let (outcomes, replies) = deliver_all(&mut esme, out);
    match &outcomes[0] {
        Ok(Dispatched::MessageReceived(pdu)) => assert_eq!(&pdu.short_message[..], b"ping"),
        other => panic!("unexpected outcome {other:?}"),
    }

    let (outcomes, _) = deliver_all(&mut smsc, replies);
    match &outcomes[0] {
        Ok(Dispatched::Acknowledged(ack)) => assert_eq!(ack.message_id().as_str(), "mo-1"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(smsc.sent_messages().is_empty());
}

#[test]
fn transmitter_bind_cannot_receive_deliveries() {
    let (_esme, mut smsc) = bound_pair(BindType::Transmitter);

    let mut out: Vec<Frame> = Vec::new();
    let err = smsc
        .deliver_sm("mo-1", "555", "777", "ping", &MessageOptions::default(), &mut out)
        .unwrap_err();
    assert!(matches!(err, SessionError::NotReceiving(BindState::BoundTx)));
    assert!(out.is_empty());
    assert!(smsc.sent_messages().is_empty());
}

#[test]
fn unbind_exchange_closes_both_sides() {
    let (mut esme, mut smsc) = bound_pair(BindType::Transceiver);

    let mut out: Vec<Frame> = Vec::new();
    send_unbind(&mut esme, &mut out).unwrap();
    let (outcomes, replies) = deliver_all(&mut smsc, out);
    assert_eq!(outcomes[0].as_ref().unwrap(), &Dispatched::Unbound);
    assert_eq!(smsc.state(), BindState::Closed);

    let (outcomes, _) = deliver_all(&mut esme, replies);
    assert_eq!(outcomes[0].as_ref().unwrap(), &Dispatched::Unbound);
    assert_eq!(esme.state(), BindState::Closed);
}

#[test]
fn submit_sm_resp_echoes_boundary_sequence_numbers() {
    let (_esme, mut smsc) = bound_pair(BindType::Transmitter);

    for sequence_number in [0, 1, MAX_SEQUENCE_NUMBER, u32::MAX] {
        let pdu = SubmitSm::builder().sequence_number(sequence_number).build();
        let mut out: Vec<Frame> = Vec::new();
        smsc.receive_submit_sm(&pdu, &mut out).unwrap();
        assert_eq!(out[0].sequence_number(), sequence_number);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn submit_sm_resp_echoes_sequence_number(sequence_number in any::<u32>()) {
        let mut smsc = ServerSession::new();
        let mut out: Vec<Frame> = Vec::new();
        let bind = BindRequest::builder(BindType::Transmitter).system_id("esme").build().unwrap();
        smsc.bind_session(&bind, &mut out).unwrap();
        out.clear();

        let pdu = SubmitSm::builder().sequence_number(sequence_number).build();
        let message_id = smsc.receive_submit_sm(&pdu, &mut out).unwrap();

        match out.as_slice() {
            [Frame::SubmitSmResp(resp)] => {
                prop_assert_eq!(resp.sequence_number, sequence_number);
                prop_assert_eq!(&resp.message_id, &message_id);
                prop_assert!(resp.command_status.is_ok());
            }
            other => prop_assert!(false, "unexpected frames {:?}", other),
        }
    }

    #[test]
    fn segments_cover_the_body(len in 1usize..2000, coding in prop::option::of(0u8..=8)) {
        let body: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let parts = segment(&MessageId::from("77"), &body, coding).unwrap();

        let joined: Vec<u8> = parts.iter().flat_map(|p| p.payload.iter().copied()).collect();
        prop_assert_eq!(joined, body);
        for (i, part) in parts.iter().enumerate() {
            prop_assert!(part.payload.len() <= max_part_size(coding));
            prop_assert_eq!(part.header.part_index as usize, i + 1);
            prop_assert_eq!(part.header.total_parts as usize, parts.len());
            prop_assert_eq!(part.header.reference_tag, 77);
        }
    }
}

#[tokio::test]
async fn loopback_session_binds_submits_and_unbinds() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let smsc = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        run_session(Connection::new(socket), ServerSession::new()).await
    });

    let connection = Connection::connect(&addr.to_string()).await.unwrap();
    let mut runner = SessionRunner::new(connection, Transmitter::new(esme_config()));
    let mut events = runner.subscribe();
    let handle = runner.handle();
    let esme = tokio::spawn(runner.run());

    handle.call(|esme, sink| esme.send_bind(sink)).await.unwrap();
    assert_eq!(
        events.recv().await,
        Some(Dispatched::Bound(BindState::BoundTx))
    );

    let body = "B".repeat(306);
    let sequence_numbers = handle
        .call(|esme, sink| {
            esme.send_message("2024", "100", "200", body.as_bytes(), &MessageOptions::new(), sink)
        })
        .await
        .unwrap();
    assert_eq!(sequence_numbers.len(), 2);

    for _ in 0..2 {
        match events.recv().await {
            Some(Dispatched::Acknowledged(ack)) => {
                assert!(ack.is_accepted());
                assert_eq!(ack.message_id(), &MessageId::from("2024"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    handle.unbind().await.unwrap();
    assert_eq!(events.recv().await, Some(Dispatched::Unbound));

    esme.await.unwrap().unwrap();
    smsc.await.unwrap().unwrap();
}

/// Read one whole PDU from a raw socket and decode it
async fn read_reply(stream: &mut TcpStream) -> Frame {
    let mut pdu = vec![0u8; PduHeader::SIZE];
    stream.read_exact(&mut pdu).await.unwrap();
    let length = u32::from_be_bytes([pdu[0], pdu[1], pdu[2], pdu[3]]) as usize;
    pdu.resize(length, 0);
    stream.read_exact(&mut pdu[PduHeader::SIZE..]).await.unwrap();
    Frame::parse(&mut Cursor::new(pdu.as_slice())).unwrap()
}

#[tokio::test]
async fn loopback_undecodable_submit_is_answered_with_its_sequence() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let smsc = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        run_session(Connection::new(socket), ServerSession::new()).await
    });

    let mut esme = TcpStream::connect(addr).await.unwrap();
    let bind = BindRequest::builder(BindType::Transmitter)
        .sequence_number(7)
        .system_id("esme")
        .build()
        .unwrap();
    esme.write_all(&bind.to_bytes().unwrap()).await.unwrap();
    match read_reply(&mut esme).await {
        Frame::BindResp(resp) => {
            assert_eq!(resp.sequence_number, 7);
            assert!(resp.command_status.is_ok());
        }
        other => panic!("unexpected reply {other:?}"),
    }

    let mut submit = SubmitSm::builder()
        .sequence_number(4242)
        .source_addr("1234")
        .destination_addr("5678")
        .short_message("hi")
        .build()
        .to_bytes()
        .unwrap()
        .to_vec();
    submit[17] = 0x09; // source_addr_ton
    esme.write_all(&submit).await.unwrap();
    match read_reply(&mut esme).await {
        Frame::SubmitSmResp(resp) => {
            assert_eq!(resp.sequence_number, 4242);
            assert_eq!(resp.command_status, CommandStatus::InvalidSourceAddrTon);
        }
        other => panic!("unexpected reply {other:?}"),
    }

    // The session carries on
    esme.write_all(&EnquireLink::new(4243).to_bytes().unwrap())
        .await
        .unwrap();
    assert_eq!(
        read_reply(&mut esme).await,
        Frame::EnquireLinkResp(EnquireLinkResponse::new(4243))
    );

    esme.write_all(&Unbind::new(4244).to_bytes().unwrap())
        .await
        .unwrap();
    assert_eq!(
        read_reply(&mut esme).await,
        Frame::UnbindResp(UnbindResponse::new(4244))
    );
    smsc.await.unwrap().unwrap();
}

#[tokio::test]
async fn loopback_close_mid_frame_ends_session_with_reset() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let smsc = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        run_session(Connection::new(socket), ServerSession::new()).await
    });

    let mut esme = TcpStream::connect(addr).await.unwrap();
    let bytes = EnquireLink::new(1).to_bytes().unwrap();
    esme.write_all(&bytes[..9]).await.unwrap();
    drop(esme);

    assert!(matches!(
        smsc.await.unwrap(),
        Err(SessionError::Codec(CodecError::ConnectionReset))
    ));
}
