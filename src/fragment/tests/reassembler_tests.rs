//! Tests for concurrent reassembly and stale group eviction.

use std::{
    thread,
    time::{Duration, Instant},
};

use bytes::Bytes;

use crate::fragment::{
    FragmentError,
    FragmentFrame,
    FragmentHeader,
    FragmentIndex,
    Fragmenter,
    GroupId,
    Reassembler,
};

fn fragment(group: u64, index: u32, count: u32, payload: &'static [u8]) -> FragmentFrame {
    FragmentFrame::new(
        FragmentHeader::new(GroupId::new(group), FragmentIndex::new(index), count),
        Bytes::from_static(payload),
    )
}

#[test]
fn interleaved_groups_complete_independently() {
    let reassembler = Reassembler::new();

    assert!(reassembler.push(fragment(1, 2, 2, b"B")).expect("ok").is_none());
    assert!(reassembler.push(fragment(2, 1, 2, b"x")).expect("ok").is_none());
    assert_eq!(reassembler.buffered_len(), 2);

    let done = reassembler
        .push(fragment(1, 1, 2, b"A"))
        .expect("ok")
        .expect("group 1 completes");
    assert_eq!(done.group_id(), GroupId::new(1));
    assert_eq!(done.payload().as_ref(), b"AB");
    assert_eq!(reassembler.buffered_len(), 1);
    assert_eq!(reassembler.group_len(GroupId::new(2)), Some(1));
}

#[test]
fn single_fragment_group_is_never_buffered() {
    let reassembler = Reassembler::new();
    let done = reassembler
        .push(fragment(4, 1, 1, b"whole"))
        .expect("ok")
        .expect("complete immediately");
    assert_eq!(done.into_payload().as_ref(), b"whole");
    assert_eq!(reassembler.buffered_len(), 0);
}

#[test]
fn rejected_fragment_keeps_existing_group() {
    let reassembler = Reassembler::new();
    reassembler.push(fragment(3, 1, 2, b"a")).expect("ok");

    let err = reassembler
        .push(fragment(3, 2, 5, b"b"))
        .expect_err("count conflict");
    assert!(matches!(err, FragmentError::CountMismatch { .. }));
    assert_eq!(reassembler.group_len(GroupId::new(3)), Some(1));

    let done = reassembler
        .push(fragment(3, 2, 2, b"b"))
        .expect("ok")
        .expect("completes");
    assert_eq!(done.payload().as_ref(), b"ab");
}

#[test]
fn invalid_first_fragment_creates_no_group() {
    let reassembler = Reassembler::new();
    reassembler
        .push(fragment(3, 0, 2, b"a"))
        .expect_err("index 0");
    assert_eq!(reassembler.buffered_len(), 0);
}

#[test]
fn stale_groups_are_purged_on_request() {
    let reassembler = Reassembler::new();
    let start = Instant::now();
    reassembler
        .push_at(fragment(10, 1, 2, b"old"), start)
        .expect("ok");
    reassembler
        .push_at(fragment(11, 1, 2, b"new"), start + Duration::from_secs(20))
        .expect("ok");

    let evicted = reassembler.purge_stale_at(start + Duration::from_secs(30), Duration::from_secs(30));
    assert_eq!(evicted, vec![GroupId::new(10)]);
    assert_eq!(reassembler.buffered_len(), 1);
    assert_eq!(reassembler.group_len(GroupId::new(11)), Some(1));
}

#[test]
fn purge_stale_measures_age_from_now() {
    let reassembler = Reassembler::new();
    reassembler.push(fragment(12, 1, 2, b"young")).expect("ok");

    assert!(reassembler.purge_stale(Duration::from_secs(3_600)).is_empty());
    assert_eq!(reassembler.buffered_len(), 1);
    assert_eq!(reassembler.purge_stale(Duration::ZERO), vec![GroupId::new(12)]);
    assert_eq!(reassembler.buffered_len(), 0);
}

#[test]
fn concurrent_pushes_for_different_groups() {
    let fragmenter = Fragmenter::new();
    let reassembler = Reassembler::new();
    let streams: Vec<Bytes> = (0_u8..8)
        .map(|seed| Bytes::from(vec![seed; 2_000]))
        .collect();
    let batches: Vec<_> = streams
        .iter()
        .map(|stream| fragmenter.split(stream.clone(), 64).expect("fits"))
        .collect();

    let rebuilt: Vec<Bytes> = thread::scope(|scope| {
        let handles: Vec<_> = batches
            .iter()
            .map(|batch| {
                let reassembler = &reassembler;
                scope.spawn(move || {
                    let mut done = None;
                    for fragment in batch.fragments().iter().rev() {
                        if let Some(message) = reassembler.push(fragment.clone()).expect("ok") {
                            done = Some(message.into_payload());
                        }
                    }
                    done.expect("every group completes")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker panicked"))
            .collect()
    });

    assert_eq!(rebuilt, streams);
    assert_eq!(reassembler.buffered_len(), 0);
}
