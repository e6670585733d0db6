//! End-to-end position queries against a scripted receiver

mod common;

use common::{frame_with_satellites, init_tracing, reply_frame, scripted_receiver, RecordFields, Reply};
use dgps_core::diagnostics::Severity;
use dgps_core::gps::Satellite;
use dgps_core::protocol::{
    position_request, FrameError, ProbeOutcome, QueryError, QueryStage, TransportError, ACK, NAK,
};
use pretty_assertions::assert_eq;

#[test]
fn test_query_decodes_full_fix() {
    init_tracing();
    let fields = RecordFields::default();
    let (mut rx, written, log) = scripted_receiver(vec![Reply::Bytes(reply_frame(&fields.encode()))]);

    let fix = rx.query_position().expect("query should succeed");

    assert_eq!(written.lock().unwrap().as_slice(), &position_request()[..]);
    assert_eq!(fix.latitude, fields.latitude * 180.0);
    assert_eq!(fix.longitude, fields.longitude * 180.0);
    assert_eq!(fix.altitude, 312.75);
    assert_eq!(fix.clock_offset, -0.125);
    assert_eq!(fix.frequency_offset, 2.5);
    assert_eq!(fix.pdop, 1.75);
    assert_eq!(fix.latitude_rate, 0.0);
    assert_eq!(fix.altitude_rate, -0.5);
    assert_eq!(fix.gps_msec_of_week, 302_400_000);
    assert_eq!(fix.position_flags, 0x1f);
    assert_eq!(
        fix.satellites,
        vec![
            Satellite { channel_number: 1, prn: 5 },
            Satellite { channel_number: 2, prn: 12 },
            Satellite { channel_number: 3, prn: 29 },
        ]
    );

    assert_eq!(rx.stage(), QueryStage::Succeeded);
    assert_eq!(rx.last_fix(), Some(&fix));
    assert_eq!(log.latest().unwrap().event.severity, Severity::Info);
}

#[test]
fn test_zero_satellites_is_success() {
    let (mut rx, _written, log) = scripted_receiver(vec![Reply::Bytes(frame_with_satellites(0))]);

    let fix = rx.query_position().expect("zero satellites is not an error");
    assert!(fix.satellites.is_empty());

    let latest = log.latest().unwrap().event;
    assert_eq!(latest.severity, Severity::Info);
    assert!(latest.message.contains("no tracked satellites"));
}

#[test]
fn test_nak_reply_is_rejected() {
    let (mut rx, _written, log) = scripted_receiver(vec![Reply::Bytes(vec![NAK])]);

    let err = rx.query_position().unwrap_err();
    assert!(matches!(err, QueryError::Frame(FrameError::DeviceRejected)));
    assert_eq!(rx.stage(), QueryStage::Failed);

    let events = log.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.severity, Severity::Warning);
}

#[test]
fn test_corrupted_frame_reports_checksum() {
    let mut frame = frame_with_satellites(4);
    frame[30] ^= 0x10;
    let (mut rx, _written, log) = scripted_receiver(vec![Reply::Bytes(frame)]);

    let err = rx.query_position().unwrap_err();
    assert!(matches!(
        err,
        QueryError::Frame(FrameError::ChecksumMismatch { .. })
    ));
    assert!(log.latest().unwrap().event.message.contains("Checksum mismatch"));
}

#[test]
fn test_timeout_leaves_channel_usable() {
    let (mut rx, _written, log) = scripted_receiver(vec![
        Reply::Silence,
        Reply::Bytes(frame_with_satellites(2)),
    ]);

    let err = rx.query_position().unwrap_err();
    assert!(matches!(err, QueryError::Transport(TransportError::Timeout)));
    assert_eq!(log.latest().unwrap().event.severity, Severity::Error);

    let fix = rx.query_position().expect("second query should succeed");
    assert_eq!(fix.satellites.len(), 2);
}

#[test]
fn test_failure_keeps_previous_fix() {
    let (mut rx, _written, _log) = scripted_receiver(vec![
        Reply::Bytes(frame_with_satellites(1)),
        Reply::Bytes(vec![0x00; 90]),
        Reply::Bytes(frame_with_satellites(5)),
    ]);

    let first = rx.query_position().unwrap();
    assert!(matches!(
        rx.query_position(),
        Err(QueryError::Frame(FrameError::MissingStx { found: 0x00 }))
    ));
    assert_eq!(rx.last_fix(), Some(&first));

    let third = rx.query_position().unwrap();
    assert_eq!(third.satellites.len(), 5);
    assert_eq!(rx.last_fix(), Some(&third));
}

#[test]
fn test_disconnected_link() {
    let (mut rx, _written, _log) = scripted_receiver(vec![Reply::HangUp]);
    assert!(matches!(
        rx.query_position(),
        Err(QueryError::Transport(TransportError::Disconnected))
    ));
}

#[test]
fn test_short_write_is_reported() {
    let (mut rx, written, log) = scripted_receiver(vec![Reply::ShortWrite(4)]);
    assert!(matches!(
        rx.query_position(),
        Err(QueryError::Transport(TransportError::WriteIncomplete {
            written: 4,
            expected: 9
        }))
    ));
    assert_eq!(written.lock().unwrap().len(), 4);
    assert_eq!(rx.stage(), QueryStage::Failed);

    let event = log.latest().unwrap().event;
    assert_eq!(event.severity, Severity::Warning);
    assert_eq!(event.message, "Only 4 of 9 request bytes were transmitted");
}

#[test]
fn test_probe_then_query() {
    let (mut rx, written, _log) = scripted_receiver(vec![
        Reply::Bytes(vec![ACK]),
        Reply::Bytes(frame_with_satellites(3)),
    ]);

    assert_eq!(rx.probe(), ProbeOutcome::Ready);
    let fix = rx.query_position().unwrap();
    assert_eq!(fix.satellites.len(), 3);
    assert_eq!(written.lock().unwrap()[0], 0x05);
}

#[test]
fn test_probe_hang_up_is_no_response() {
    let (mut rx, _written, log) = scripted_receiver(vec![Reply::HangUp]);
    assert_eq!(rx.probe(), ProbeOutcome::NoResponse);
    assert!(log.latest().unwrap().event.message.contains("does not respond"));
}

#[test]
fn test_query_inside_async_context_is_an_error() {
    let (mut rx, written, log) = scripted_receiver(vec![Reply::Bytes(frame_with_satellites(2))]);
    let outer = tokio::runtime::Builder::new_current_thread().build().unwrap();

    let result = outer.block_on(async { rx.query_position() });
    assert!(matches!(
        result,
        Err(QueryError::Transport(TransportError::Runtime(_)))
    ));
    assert!(written.lock().unwrap().is_empty());
    assert_eq!(log.latest().unwrap().event.severity, Severity::Error);

    // Back on a plain thread the same receiver works
    let fix = rx.query_position().unwrap();
    assert_eq!(fix.satellites.len(), 2);
}
