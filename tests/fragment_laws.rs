//! Property tests for the fragmentation protocol.
//!
//! Splitting then reassembling must reproduce the original stream whatever
//! the frame size and whatever order the fragments arrive in.

use bytes::Bytes;
use proptest::{collection::vec, prelude::*};
use rstest::rstest;
use wirelink::fragment::{Fragmenter, Reassembler, decode_fragment};

const FRAGMENT_TAG: u8 = 0xFF;

fn split(data: &[u8], max_frame_size: usize) -> Vec<Bytes> {
    Fragmenter::new()
        .split(Bytes::copy_from_slice(data), max_frame_size)
        .expect("frame size carries a header")
        .encode_all()
}

/// Feed encoded fragment envelopes to a fresh reassembler, returning the
/// stream rebuilt by the final one and how many pushes completed a group.
fn reassemble(frames: &[Bytes]) -> (Option<Bytes>, usize) {
    let reassembler = Reassembler::new();
    let mut rebuilt = None;
    let mut completions = 0;
    for frame in frames {
        assert_eq!(frame.first(), Some(&FRAGMENT_TAG));
        let fragment = decode_fragment(frame.slice(1..)).expect("well-formed fragment");
        if let Some(message) = reassembler.push(fragment).expect("fragment fits group") {
            completions += 1;
            rebuilt = Some(message.into_payload());
        }
    }
    assert_eq!(reassembler.buffered_len(), 0);
    (rebuilt, completions)
}

fn shuffled_fragments() -> impl Strategy<Value = (Vec<u8>, usize, Vec<Bytes>)> {
    (vec(any::<u8>(), 0..4096), 16_usize..600).prop_flat_map(|(data, max)| {
        let frames = split(&data, max);
        (Just(data), Just(max), Just(frames).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn fragments_fit_and_reassemble_in_any_order((data, max, frames) in shuffled_fragments()) {
        prop_assert!(frames.iter().all(|frame| frame.len() <= max));
        let (rebuilt, completions) = reassemble(&frames);
        prop_assert_eq!(completions, 1);
        prop_assert_eq!(rebuilt.as_deref(), Some(data.as_slice()));
    }

    #[test]
    fn interleaved_groups_stay_separate(
        first in vec(any::<u8>(), 1..2048),
        second in vec(any::<u8>(), 1..2048),
        max in 16_usize..256,
    ) {
        let fragmenter = Fragmenter::new();
        let a = fragmenter.split(Bytes::from(first.clone()), max).expect("split").encode_all();
        let b = fragmenter.split(Bytes::from(second.clone()), max).expect("split").encode_all();

        let mut interleaved = Vec::with_capacity(a.len() + b.len());
        let mut a = a.into_iter();
        let mut b = b.into_iter().rev();
        loop {
            match (a.next(), b.next()) {
                (None, None) => break,
                (x, y) => interleaved.extend(x.into_iter().chain(y)),
            }
        }

        let reassembler = Reassembler::new();
        let mut rebuilt = Vec::new();
        for frame in interleaved {
            let fragment = decode_fragment(frame.slice(1..)).expect("well-formed fragment");
            if let Some(message) = reassembler.push(fragment).expect("fragment fits group") {
                rebuilt.push(message.into_payload());
            }
        }
        let mut expected = vec![Bytes::from(first), Bytes::from(second)];
        rebuilt.sort();
        expected.sort();
        prop_assert_eq!(rebuilt, expected);
    }
}

#[test]
fn ten_thousand_bytes_survive_reverse_delivery() {
    let data: Vec<u8> = (0..10_000_u32).map(|i| (i % 251) as u8).collect();
    let mut frames = split(&data, 512);
    assert!(frames.len() > 1);
    assert!(frames.iter().all(|frame| frame.len() <= 512));

    frames.reverse();
    let (rebuilt, completions) = reassemble(&frames);
    assert_eq!(completions, 1);
    assert_eq!(rebuilt.as_deref(), Some(data.as_slice()));
}

#[rstest]
#[case::single_byte_payloads(20, 16)]
#[case::exact_fit(500, 64)]
#[case::many_fragments(50_000, 128)]
fn forward_delivery_completes_on_last_fragment(#[case] len: usize, #[case] max: usize) {
    let data = vec![0xA5_u8; len];
    let frames = split(&data, max);
    let (rebuilt, completions) = reassemble(&frames);
    assert_eq!(completions, 1);
    assert_eq!(rebuilt.map(|b| b.len()), Some(len));
}
