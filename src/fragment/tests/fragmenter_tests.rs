//! Tests for splitting streams into size-bounded fragments.

use bytes::Bytes;
use rstest::rstest;

use crate::fragment::{
    FragmentIndex,
    FragmentationError,
    Fragmenter,
    GroupId,
    decode_fragment,
};

#[expect(clippy::cast_possible_truncation, reason = "values are reduced modulo 251")]
fn patterned(len: usize) -> Bytes {
    Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>())
}

#[test]
fn ten_thousand_bytes_split_at_512() {
    let stream = patterned(10_000);
    let batch = Fragmenter::new()
        .split(stream.clone(), 512)
        .expect("512 bytes fits a header");

    let count = u32::try_from(batch.len()).expect("small batch");
    let mut rebuilt = Vec::new();
    for (position, fragment) in batch.fragments().iter().enumerate() {
        let header = fragment.header();
        assert_eq!(usize::try_from(header.index().get()).expect("u32 fits"), position + 1);
        assert_eq!(header.count(), count);
        assert!(fragment.encode().len() <= 512);
        rebuilt.extend_from_slice(fragment.payload());
    }
    assert_eq!(rebuilt.len(), 10_000);
    assert_eq!(rebuilt, stream.as_ref());
}

#[rstest]
#[case::single_fragment(40, 64)]
#[case::exact_multiple(120, 64)]
#[case::many_small(1_000, 8)]
#[case::minimal_frame(100, 5)]
#[case::large(100_000, 4_096)]
fn fragments_respect_frame_size_and_carry_true_count(#[case] len: usize, #[case] max: usize) {
    let stream = patterned(len);
    let batch = Fragmenter::new()
        .split(stream.clone(), max)
        .expect("frame fits a header");
    let count = u32::try_from(batch.len()).expect("count fits u32");

    let mut rebuilt = Vec::with_capacity(len);
    for fragment in batch.encode_all() {
        assert!(fragment.len() <= max, "{} > {max}", fragment.len());
        let decoded = decode_fragment(fragment.slice(1..)).expect("well-formed");
        assert_eq!(decoded.header().count(), count);
        assert_eq!(decoded.header().group_id(), batch.group_id());
        rebuilt.extend_from_slice(decoded.payload());
    }
    assert_eq!(rebuilt, stream.as_ref());
}

#[test]
fn more_than_127_fragments_widen_count_field() {
    let batch = Fragmenter::new()
        .split(patterned(1_000), 8)
        .expect("8 bytes fits a header");
    assert!(batch.len() > 127);
    let last = batch.fragments().last().expect("non-empty batch");
    assert_eq!(last.header().encoded_len(), 1 + 2 + 2);
}

#[test]
fn empty_stream_yields_single_empty_fragment() {
    let batch = Fragmenter::new()
        .split(Bytes::new(), 16)
        .expect("empty stream");
    assert_eq!(batch.len(), 1);
    assert!(!batch.is_fragmented());

    let fragment = &batch.fragments()[0];
    assert_eq!(fragment.header().index(), FragmentIndex::first());
    assert_eq!(fragment.header().count(), 1);
    assert!(fragment.payload().is_empty());
}

#[rstest]
#[case::no_payload_room(4)]
#[case::no_header_room(2)]
fn undersized_frames_are_rejected(#[case] max: usize) {
    let err = Fragmenter::new()
        .split(Bytes::from_static(b"payload"), max)
        .expect_err("frame too small");
    assert!(matches!(
        err,
        FragmentationError::FrameTooSmall { max_frame_size, .. } if max_frame_size == max
    ));
}

#[test]
fn group_ids_increase_per_fragmenter() {
    let fragmenter = Fragmenter::with_starting_id(GroupId::new(7));
    let first = fragmenter
        .split(Bytes::from_static(b"a"), 16)
        .expect("fits");
    let second = fragmenter
        .split(Bytes::from_static(b"b"), 16)
        .expect("fits");
    assert_eq!(first.group_id(), GroupId::new(7));
    assert_eq!(second.group_id(), GroupId::new(8));

    let other = Fragmenter::new();
    assert_eq!(other.next_group_id(), GroupId::new(1));
}

#[test]
fn group_id_counter_wraps() {
    let fragmenter = Fragmenter::with_starting_id(GroupId::new(u64::MAX));
    assert_eq!(fragmenter.next_group_id(), GroupId::new(u64::MAX));
    assert_eq!(fragmenter.next_group_id(), GroupId::new(0));
}

#[test]
fn fragments_share_stream_buffer() {
    let stream = patterned(64);
    let batch = Fragmenter::new().split(stream.clone(), 16).expect("fits");
    let first = batch.fragments()[0].payload();
    assert_eq!(first.as_ptr(), stream.as_ptr());
}
