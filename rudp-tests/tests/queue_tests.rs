//! Queue behaviour through the public API

use proptest::prelude::*;
use rudp_queue::{
    comparator, natural_order, Capability, FixedSize, Hooks, IndexedList, Prioritized,
    PriorityQueue, ReadOnly, Sequence, SequenceError, Synchronized,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Message {
    priority: u8,
    producer: usize,
    index: usize,
}

impl Prioritized for Message {
    fn priority(&self) -> u8 {
        self.priority
    }
}

fn contents<S: Sequence<u32>>(seq: &S) -> Vec<u32> {
    (0..seq.len()).map(|i| *seq.get(i).unwrap()).collect()
}

#[test]
fn test_priority_order_from_mixed_input() {
    let queue = PriorityQueue::new();
    for (index, priority) in [5u8, 3, 7, 1, 4].into_iter().enumerate() {
        queue
            .enqueue(Message {
                priority,
                producer: 0,
                index,
            })
            .unwrap();
    }

    let order: Vec<u8> = std::iter::from_fn(|| queue.dequeue().ok())
        .map(|m| m.priority)
        .collect();
    assert_eq!(order, vec![1, 3, 4, 5, 7]);
}

#[test]
fn test_concurrent_producers_keep_per_priority_fifo() {
    rudp_tests::init_tracing();
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;

    let queue = Arc::new(PriorityQueue::new());
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let queue = queue.clone();
            thread::spawn(move || {
                for index in 0..PER_PRODUCER {
                    let priority = (index % 8 + 1) as u8;
                    queue
                        .enqueue(Message {
                            priority,
                            producer,
                            index,
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let drained = queue.drain();
    assert_eq!(drained.len(), PRODUCERS * PER_PRODUCER);

    // Priorities never decrease in dequeue order
    assert!(drained.windows(2).all(|w| w[0].priority <= w[1].priority));

    // Within a priority, each producer's messages keep their enqueue order
    let mut last_seen = vec![vec![None::<usize>; 9]; PRODUCERS];
    for message in &drained {
        let slot = &mut last_seen[message.producer][message.priority as usize];
        if let Some(previous) = *slot {
            assert!(previous < message.index);
        }
        *slot = Some(message.index);
    }
}

#[test]
fn test_consumers_wake_on_close() {
    let queue: Arc<PriorityQueue<Message>> = Arc::new(PriorityQueue::new());
    let woken = Arc::new(AtomicUsize::new(0));

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            let woken = woken.clone();
            thread::spawn(move || {
                assert_eq!(queue.wait_dequeue(), None);
                woken.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    queue.close();
    for consumer in consumers {
        consumer.join().unwrap();
    }
    assert_eq!(woken.load(Ordering::SeqCst), 3);
    assert!(queue.is_closed());
}

#[test]
fn test_wait_dequeue_timeout_returns_late_item() {
    let queue = Arc::new(PriorityQueue::new());
    let producer = {
        let queue = queue.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            queue
                .enqueue(Message {
                    priority: 2,
                    producer: 0,
                    index: 0,
                })
                .unwrap();
        })
    };

    let message = queue.wait_dequeue_timeout(rudp_tests::WAIT).unwrap();
    assert_eq!(message.priority, 2);
    producer.join().unwrap();
    assert!(queue.wait_dequeue_timeout(Duration::from_millis(10)).is_none());
}

#[test]
fn test_views_over_sorted_list() {
    let list: IndexedList<u32> = [9, 2, 7, 4].into_iter().collect();
    let mut fixed = FixedSize::new(list);

    fixed
        .set_comparator(Some(natural_order()), true)
        .unwrap();
    assert_eq!(contents(&fixed), vec![2, 4, 7, 9]);
    assert!(fixed.is_sorted_maintained());

    let err = fixed.push(1).unwrap_err();
    assert_eq!(
        err,
        SequenceError::NotPermitted {
            operation: "push",
            capability: Capability::FixedSize,
        }
    );

    // Replacing keeps the order and the length
    fixed.set(0, 8).unwrap();
    assert_eq!(contents(&fixed), vec![4, 7, 8, 9]);

    let mut read_only = ReadOnly::new(fixed.into_inner());
    assert!(read_only.is_read_only());
    assert!(read_only.set(0, 1).unwrap_err().is_capability_violation());
    assert!(read_only.sort().unwrap_err().is_capability_violation());
    assert_eq!(contents(&read_only), vec![4, 7, 8, 9]);
}

#[test]
fn test_synchronized_list_with_hooks() {
    let inserted = Arc::new(AtomicUsize::new(0));
    let hooks = {
        let inserted = inserted.clone();
        Hooks::new()
            .validate(|v: &u32| {
                if *v == 0 {
                    Err("zero".to_string())
                } else {
                    Ok(())
                }
            })
            .on_insert(move |_, _| {
                inserted.fetch_add(1, Ordering::SeqCst);
            })
    };
    let shared = Arc::new(Synchronized::new(IndexedList::sorted().with_hooks(hooks)));

    let handles: Vec<_> = (1..=4u32)
        .map(|t| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    shared.push(t * 1000 + i).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(matches!(shared.push(0), Err(SequenceError::Rejected(_))));
    assert_eq!(inserted.load(Ordering::SeqCst), 200);
    let values = shared.drain();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
}

proptest! {
    #[test]
    fn prop_sort_is_stable(pairs in prop::collection::vec((0u8..6, any::<u16>()), 0..300)) {
        let mut list: IndexedList<(u8, u16)> = pairs.iter().copied().collect();
        list.set_comparator(Some(comparator(|a: &(u8, u16), b: &(u8, u16)| a.0.cmp(&b.0))), false)
            .unwrap();
        list.sort().unwrap();

        let mut expected = pairs.clone();
        expected.sort_by_key(|p| p.0);
        prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn prop_sorted_push_matches_model(values in prop::collection::vec(any::<i32>(), 0..200)) {
        let mut list = IndexedList::sorted();
        let mut model: Vec<i32> = Vec::new();
        for v in values {
            let index = list.push(v).unwrap();
            let expected = model.partition_point(|x| *x <= v);
            model.insert(expected, v);
            prop_assert_eq!(index, expected);
        }
        prop_assert_eq!(list.iter().copied().collect::<Vec<_>>(), model);
    }
}
