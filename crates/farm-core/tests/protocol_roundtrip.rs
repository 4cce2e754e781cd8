//! Integration tests for the farm-core envelope.
//!
//! These tests drive the public API the way a transport would: build a
//! message, take its bytes, feed them to the receiving side (directly or
//! through a `FrameDecoder` in arbitrary chunks), and decode the payload.

use farm_core::{
    FrameDecoder, Message, MessageState, MessageType, Payload, ProgressState, TaskKey,
    TaskProgress, WireError, PROTOCOL_VERSION,
};

/// Sends `msg` through a decoder one byte at a time and returns what arrives.
fn trickle(msg: &Message) -> Message {
    let mut decoder = FrameDecoder::new();
    let mut out = Vec::new();
    for byte in msg.as_bytes() {
        out.extend(decoder.push(std::slice::from_ref(byte)));
    }
    assert_eq!(out.len(), 1, "exactly one frame must arrive");
    assert_eq!(decoder.pending_len(), 0);
    out.remove(0)
}

fn sample_progress(data: Option<&[u8]>) -> TaskProgress<'_> {
    TaskProgress::new(
        TaskKey {
            client_id: 12,
            job: 3400,
            block: 0,
            task: 57,
            number: 1,
        },
        ProgressState {
            status: 2,
            percent: 61,
            frame: 57,
            percent_frame: 90,
        },
        "rendering",
        data,
    )
}

#[test]
fn test_control_message_survives_trickled_transport() {
    let sent = Message::from_control(MessageType::RenderId, 42).unwrap();
    let received = trickle(&sent);

    assert_eq!(received.message_type(), MessageType::RenderId);
    assert_eq!(received.control_value(), Some(42));
    assert_eq!(received.state(), MessageState::Control);
    assert_eq!(received.version(), PROTOCOL_VERSION);
}

#[test]
fn test_string_list_round_trip() {
    let hosts = ["node-01", "node-02", ""];
    let sent = Message::from_string_list(&hosts).unwrap();
    let mut received = trickle(&sent);

    assert_eq!(received.as_string_list().unwrap(), vec!["node-01", "node-02", ""]);
}

#[test]
fn test_task_progress_round_trip_with_files() {
    // Arrange
    let log = b"Rendering frame 57\nSamples 128/128\n".to_vec();
    let mut progress = sample_progress(Some(&log));
    progress.append_file("frame.0057.exr", &vec![0x5A; 20_000]);
    progress.append_file("stats.json", br#"{"mem":"2.1G"}"#);
    let sent = Message::from_payload(MessageType::TaskUpdateState, &progress).unwrap();

    // Act
    let mut received = trickle(&sent);
    let decoded = received.decode().unwrap();

    // Assert
    let Payload::TaskProgress(back) = decoded else {
        panic!("expected a task progress payload, got {decoded:?}");
    };
    assert_eq!(back, progress.into_owned());
    assert_eq!(back.file_data(0).unwrap().len(), 20_000);
    assert_eq!(back.file_data(1).unwrap(), br#"{"mem":"2.1G"}"#);
}

#[test]
fn test_stream_of_mixed_messages() {
    let progress = sample_progress(None);
    let frames = [
        Message::from_control(MessageType::Confirm, 1).unwrap(),
        Message::from_payload(MessageType::TaskUpdatePercent, &progress).unwrap(),
        Message::from_string("done").unwrap(),
    ];
    let stream: Vec<u8> = frames.iter().flat_map(|m| m.as_bytes().to_vec()).collect();

    let mut decoder = FrameDecoder::new();
    let mut received = Vec::new();
    for chunk in stream.chunks(7) {
        received.extend(decoder.push(chunk));
    }

    assert_eq!(received.len(), 3);
    assert_eq!(received[0].message_type(), MessageType::Confirm);
    assert!(matches!(
        received[1].decode().unwrap(),
        Payload::TaskProgress(p) if p.state.percent == 61
    ));
    assert_eq!(received[2].as_string().unwrap(), "done");
}

#[test]
fn test_receiver_downgrades_unknown_type() {
    let mut raw = Vec::new();
    raw.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    raw.extend_from_slice(&(MessageType::LAST + 10).to_be_bytes());
    raw.extend_from_slice(&0i32.to_be_bytes());

    let msg = Message::from_bytes(&raw).unwrap();

    assert_eq!(msg.state(), MessageState::Invalid);
    assert_eq!(msg.fault(), Some(&WireError::UnknownType(MessageType::LAST + 10)));
}

#[test]
fn test_oversized_payload_becomes_diagnostic() {
    let huge = vec![0u8; farm_core::protocol::MAX_PAYLOAD_SIZE + 1];
    let mut msg = Message::new();

    let err = msg
        .set_payload(MessageType::Data, huge.as_slice())
        .unwrap_err();

    assert!(matches!(err, WireError::PayloadTooLarge { .. }));
    assert_eq!(msg.message_type(), MessageType::Null);
    assert_eq!(msg.diagnostic().as_deref(), Some(farm_core::protocol::OVERFLOW_TEXT));
}
