//! Property tests for the instrumented stream: transparency, rewind
//! neutrality and one-pass multi-digest correctness.

use std::io::{Cursor, Read};

use filepipe_core::{
    HashAlgorithm, HashCalculatorManager, InstrumentedStream, MarkReader, ProgressRecorder,
    Rewind,
};
use proptest::prelude::*;

fn single_pass(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut manager = HashCalculatorManager::new().with_algorithm(algorithm);
    manager.update(data);
    manager
        .hash_info()
        .get_algorithm(algorithm)
        .expect("digest present")
        .to_string()
}

proptest! {
    #[test]
    fn rewind_is_neutral(
        data in proptest::collection::vec(any::<u8>(), 1..4096),
        split in 0usize..4096,
        peek in 1usize..512,
        chunk in 1usize..97,
    ) {
        let n = split % data.len();
        let m = peek.min(data.len() - n);

        let mut recorder = ProgressRecorder::new();
        let mut stream = InstrumentedStream::new(MarkReader::with_read_ahead(64, Cursor::new(data.clone())))
            .with_total(Some(data.len() as u64))
            .with_progress(&mut recorder)
            .with_hashes(HashCalculatorManager::with_algorithms([HashAlgorithm::Md5, HashAlgorithm::Sha256]));

        let mut out = vec![0u8; n];
        stream.read_exact(&mut out).unwrap();

        stream.mark(m + 1);
        let mut peeked = vec![0u8; m];
        stream.read_exact(&mut peeked).unwrap();
        prop_assert_eq!(stream.progressed(), n as u64);
        stream.reset().unwrap();

        let mut buf = vec![0u8; chunk];
        loop {
            let read = stream.read(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            out.extend_from_slice(&buf[..read]);
        }

        prop_assert_eq!(&out, &data);
        prop_assert_eq!(stream.progressed(), data.len() as u64);
        let info = stream.take_hash_info().unwrap();
        prop_assert_eq!(info.md5().unwrap(), single_pass(HashAlgorithm::Md5, &data));
        prop_assert_eq!(info.sha256().unwrap(), single_pass(HashAlgorithm::Sha256, &data));
        drop(stream);

        prop_assert_eq!(recorder.starts, 1);
        prop_assert_eq!(recorder.finishes, 1);
        prop_assert_eq!(recorder.consumed(), data.len() as u64);
    }

    #[test]
    fn multi_hash_matches_independent_passes(
        data in proptest::collection::vec(any::<u8>(), 0..8192),
        chunk in 1usize..1024,
    ) {
        let mut stream = InstrumentedStream::new(Cursor::new(data.clone()))
            .with_hashes(HashCalculatorManager::with_algorithms(HashAlgorithm::ALL));
        let mut buf = vec![0u8; chunk];
        while stream.read(&mut buf).unwrap() > 0 {}

        let info = stream.take_hash_info().unwrap();
        for algorithm in HashAlgorithm::ALL {
            prop_assert_eq!(
                info.get_algorithm(algorithm).unwrap(),
                single_pass(algorithm, &data)
            );
        }
    }
}

#[test]
fn progress_is_monotonic() {
    let data = vec![1u8; 10_000];
    let mut recorder = ProgressRecorder::new();
    let mut stream = InstrumentedStream::new(Cursor::new(data)).with_progress(&mut recorder);
    std::io::copy(&mut stream, &mut std::io::sink()).unwrap();
    drop(stream);

    assert!(recorder.updates.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(recorder.consumed(), 10_000);
}
