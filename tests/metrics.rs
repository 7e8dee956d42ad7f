#![cfg(feature = "metrics")]
//! Tests for `wirelink` metrics.
//!
//! Synchronous paths are observed through a thread-local
//! `metrics_util::debugging::DebuggingRecorder`. Session metrics are recorded
//! on runtime tasks, so those tests share one global recorder and run
//! serially.

use std::sync::OnceLock;

use bytes::Bytes;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use serial_test::serial;
use wirelink::{
    FRAGMENTS_TOTAL,
    FRAMES_TOTAL,
    SESSIONS_OPEN,
    SessionBuilder,
    codec::DEFAULT_FRAME_LENGTH,
    metrics::{Direction, inc_errors, inc_reconnects},
};
use wirelink_testing::{EchoServer, channel_handler, next_within};

mod support;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn global_snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let (snapshotter, recorder) = debugging_recorder_setup();
        assert!(recorder.install().is_ok(), "no other global recorder");
        snapshotter
    })
}

/// Current value of a counter, optionally filtered by its direction label.
fn counter(snapshotter: &Snapshotter, name: &str, direction: Option<Direction>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(k, _, _, _)| {
            k.key().name() == name
                && direction.is_none_or(|d| {
                    k.key()
                        .labels()
                        .any(|l| l.key() == "direction" && l.value() == d.as_str())
                })
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(c) => c,
            _ => 0,
        })
        .sum()
}

fn gauge(snapshotter: &Snapshotter, name: &str) -> f64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(k, _, _, v)| match v {
            DebugValue::Gauge(g) if k.key().name() == name => Some(g.into_inner()),
            _ => None,
        })
        .unwrap_or_default()
}

#[rstest]
#[case::reconnects(wirelink::RECONNECTS_TOTAL, inc_reconnects as fn())]
#[case::errors(wirelink::ERRORS_TOTAL, inc_errors as fn())]
fn plain_counters_increment(#[case] name: &str, #[case] record: fn()) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        record();
        record();
    });
    assert_eq!(counter(&snapshotter, name, None), 2);
}

#[test]
fn fragments_are_counted_in_both_directions() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let envelope = support::envelope().with_max_frame_length(64);
    let frames = metrics::with_local_recorder(&recorder, || {
        let frames = envelope
            .encode_frames(&support::Msg::blob(1000))
            .expect("encode");
        for frame in &frames {
            envelope.accept(frame.clone()).expect("accept");
        }
        frames
    });

    let produced = frames.len() as u64;
    assert!(produced > 1);
    assert_eq!(
        counter(&snapshotter, FRAGMENTS_TOTAL, Some(Direction::Outbound)),
        produced
    );
    assert_eq!(
        counter(&snapshotter, FRAGMENTS_TOTAL, Some(Direction::Inbound)),
        produced
    );
}

#[test]
fn unfragmented_messages_record_no_fragments() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let envelope = support::envelope();
    metrics::with_local_recorder(&recorder, || {
        let frames = envelope
            .encode_frames(&support::Msg::chat("short"))
            .expect("encode");
        assert_eq!(frames.len(), 1);
        envelope
            .accept(Bytes::clone(&frames[0]))
            .expect("accept");
    });
    assert_eq!(counter(&snapshotter, FRAGMENTS_TOTAL, None), 0);
}

#[tokio::test]
#[serial]
async fn session_frames_and_open_gauge_are_recorded() {
    let snapshotter = global_snapshotter();
    let server = EchoServer::spawn(DEFAULT_FRAME_LENGTH)
        .await
        .expect("bind echo server");
    let outbound = counter(snapshotter, FRAMES_TOTAL, Some(Direction::Outbound));
    let inbound = counter(snapshotter, FRAMES_TOTAL, Some(Direction::Inbound));
    let open = gauge(snapshotter, SESSIONS_OPEN);

    let (handler, mut frames) = channel_handler();
    let session = SessionBuilder::new()
        .remote(server.addr())
        .handler(handler)
        .connect()
        .await
        .expect("connect");
    assert!((gauge(snapshotter, SESSIONS_OPEN) - open - 1.0).abs() < f64::EPSILON);

    session.send_frame(b"counted").await.expect("send");
    next_within(&mut frames).await.expect("echo");
    assert_eq!(
        counter(snapshotter, FRAMES_TOTAL, Some(Direction::Outbound)),
        outbound + 1
    );
    assert_eq!(
        counter(snapshotter, FRAMES_TOTAL, Some(Direction::Inbound)),
        inbound + 1
    );

    session.close().await.expect("close");
    assert!((gauge(snapshotter, SESSIONS_OPEN) - open).abs() < f64::EPSILON);
}
