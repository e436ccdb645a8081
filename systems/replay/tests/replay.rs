use std::{collections::VecDeque, time::Duration};

use proptest::prelude::*;
use sushi_rush_system_replay::{Config, HighlightCadence, ReplayBuffer};

#[test]
fn full_buffer_keeps_the_most_recent_frames() {
    let mut buffer =
        ReplayBuffer::new(Config::new(3, Duration::from_millis(100))).expect("config");
    let mut frames = ["C1", "C2", "C3", "C4", "C5"].into_iter();
    let mut source = || frames.next();

    buffer.start();
    for _ in 0..5 {
        assert!(buffer.tick(Duration::from_millis(100), &mut source));
    }

    assert_eq!(
        buffer.frames().copied().collect::<Vec<_>>(),
        vec!["C3", "C4", "C5"]
    );
    assert!(buffer.audit().is_ok());
}

#[test]
fn highlight_clips_are_evicted_whole() {
    let config = Config::new(1, Duration::from_millis(100)).with_highlights(HighlightCadence::new(
        Duration::from_millis(300),
        Duration::from_millis(200),
        2,
    ));
    let mut buffer = ReplayBuffer::new(config).expect("config");
    let mut next = 0u32;
    let mut source = || {
        next += 1;
        Some(next)
    };
    assert_eq!(buffer.capacity(), 6);

    buffer.start();
    for _ in 0..12 {
        let _ = buffer.tick(Duration::from_millis(100), &mut source);
    }
    assert_eq!(
        buffer.frames().copied().collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );

    let _ = buffer.tick(Duration::from_millis(100), &mut source);
    assert_eq!(
        buffer.frames().copied().collect::<Vec<_>>(),
        vec![4, 5, 6, 7, 8, 9]
    );
    assert_eq!(buffer.clip_lengths().collect::<Vec<_>>(), vec![3, 3]);
    assert!(buffer.audit().is_ok());
}

#[test]
fn highlight_gap_leaves_time_uncaptured() {
    let config = Config::new(1, Duration::from_millis(100)).with_highlights(HighlightCadence::new(
        Duration::from_millis(200),
        Duration::from_secs(1),
        4,
    ));
    let mut buffer = ReplayBuffer::new(config).expect("config");
    let mut source = || Some(());

    buffer.start();
    let captured = (0..12)
        .filter(|_| buffer.tick(Duration::from_millis(100), &mut source))
        .count();

    assert_eq!(captured, 3);
    assert_eq!(buffer.clip_count(), 1);
    assert_eq!(buffer.len(), 2);
}

#[test]
fn stopped_buffer_keeps_frames_until_cleared() {
    let mut buffer =
        ReplayBuffer::new(Config::new(8, Duration::from_millis(100))).expect("config");
    let mut source = || Some(());

    buffer.start();
    let _ = buffer.tick(Duration::from_millis(100), &mut source);
    let _ = buffer.tick(Duration::from_millis(100), &mut source);
    buffer.stop();
    assert!(!buffer.tick(Duration::from_millis(100), &mut source));
    assert_eq!(buffer.len(), 2);

    buffer.clear();
    assert!(buffer.is_empty());
    assert!(!buffer.is_capturing());
}

#[test]
fn empty_source_stores_nothing() {
    let mut buffer =
        ReplayBuffer::<u8>::new(Config::new(4, Duration::from_millis(100))).expect("config");
    let mut source = || None::<u8>;

    buffer.start();
    assert!(!buffer.tick(Duration::from_millis(100), &mut source));
    assert!(buffer.is_empty());
}

proptest! {
    #[test]
    fn buffer_behaves_like_a_bounded_fifo(
        capacity in 1usize..16,
        frames in prop::collection::vec(any::<u16>(), 0..100),
    ) {
        let mut buffer = ReplayBuffer::new(Config::new(capacity, Duration::from_millis(100)))
            .expect("config");
        let mut model = VecDeque::new();

        for frame in frames {
            let evicted = buffer.push(frame);
            model.push_back(frame);
            let expected: Vec<u16> = if model.len() > capacity {
                model.pop_front().into_iter().collect()
            } else {
                Vec::new()
            };

            prop_assert_eq!(evicted, expected);
            prop_assert!(buffer.len() <= capacity);
            prop_assert!(buffer.frames().copied().eq(model.iter().copied()));
        }
    }
}
