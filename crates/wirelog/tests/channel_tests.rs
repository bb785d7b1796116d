//! Scenario tests for the in-process channels: registration, FIFO
//! round-trips, schema enforcement, overflow policies and the two-thread
//! handoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use wirelog::{
    log_event, log_sample, BoundArg, ChannelConfig, ChannelError, Contention, EventAttributes,
    EventChannel, EventFormatter, OverflowPolicy, SampleChannel, SampleFormatter, Sink, SpinQueue,
    Tag, ThreadId,
};

/// Owned, comparable copy of one decoded argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    tag: Tag,
    scalar: u64,
    payload: Vec<u8>,
}

impl Seen {
    fn of(bound: &BoundArg<'_>) -> Seen {
        Seen {
            tag: bound.tag,
            scalar: bound.scalar,
            payload: bound.payload.to_vec(),
        }
    }

    fn scalar(tag: Tag, scalar: u64) -> Seen {
        Seen {
            tag,
            scalar,
            payload: Vec::new(),
        }
    }

    fn chars(text: &str) -> Seen {
        Seen {
            tag: Tag::ArrChar,
            scalar: 0,
            payload: text.as_bytes().to_vec(),
        }
    }
}

/// Formatter that records everything it is handed, shared with the test
/// through an `Arc`.
#[derive(Default, Clone)]
struct Recorder {
    attributes: Arc<Mutex<Vec<EventAttributes>>>,
    events: Arc<Mutex<Vec<(u32, Vec<Seen>)>>>,
    schemas: Arc<Mutex<Vec<Vec<Tag>>>>,
    samples: Arc<Mutex<Vec<Vec<Seen>>>>,
}

impl EventFormatter for Recorder {
    fn format_attributes(
        &mut self,
        _sink: &mut dyn Sink,
        attrs: &EventAttributes,
    ) -> Result<(), ChannelError> {
        self.attributes.lock().unwrap().push(attrs.clone());
        Ok(())
    }

    fn format_event(
        &mut self,
        _sink: &mut dyn Sink,
        attrs: &EventAttributes,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        self.events
            .lock()
            .unwrap()
            .push((attrs.id, args.iter().map(Seen::of).collect()));
        Ok(())
    }
}

impl SampleFormatter for Recorder {
    fn format_expected_types(
        &mut self,
        _sink: &mut dyn Sink,
        schema: &[Tag],
    ) -> Result<(), ChannelError> {
        self.schemas.lock().unwrap().push(schema.to_vec());
        Ok(())
    }

    fn format_values(
        &mut self,
        _sink: &mut dyn Sink,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        self.samples
            .lock()
            .unwrap()
            .push(args.iter().map(Seen::of).collect());
        Ok(())
    }
}

/// Sink that swallows everything; the recorder does the observing.
struct NullSink;

impl Sink for NullSink {
    fn write(&mut self, data: &[u8]) -> u32 {
        data.len() as u32
    }
    fn flush(&mut self) -> bool {
        true
    }
}

#[test]
fn test_register_once_log_twice() {
    let recorder = Recorder::default();
    let (producer, mut consumer) = EventChannel::create(
        recorder.clone(),
        NullSink,
        ChannelConfig::default(),
    );

    let texts = ["4", "some text"];
    for (i, text) in texts.iter().enumerate() {
        log_event!(
            producer,
            "1234567890-",
            1u32,
            -1i32 - i as i32,
            0.2f64,
            '3',
            *text
        )
        .unwrap();
    }

    while consumer.try_process_one().unwrap() {}

    let attributes = recorder.attributes.lock().unwrap();
    assert_eq!(attributes.len(), 1, "one attributes record per call site");
    let attrs = &attributes[0];
    assert!(attrs.id >= 1);
    assert_eq!(attrs.expected_argc, 5);
    assert_eq!(attrs.message_format, "1234567890-");
    assert_eq!(attrs.file, "channel_tests.rs");
    assert!(attrs.function.contains("register_once_log_twice"));

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 2);
    for (i, (id, args)) in events.iter().enumerate() {
        assert_eq!(*id, attrs.id);
        let expected = vec![
            Seen::scalar(Tag::U32, 1),
            Seen {
                tag: Tag::I32,
                scalar: u64::from((-1i32 - i as i32) as u32),
                payload: Vec::new(),
            },
            Seen::scalar(Tag::F64, 0.2f64.to_bits()),
            Seen::scalar(Tag::Char, u64::from(b'3')),
            Seen::chars(texts[i]),
        ];
        assert_eq!(args, &expected);
    }
}

#[test]
fn test_sample_schema_then_values() {
    let recorder = Recorder::default();
    let (producer, mut consumer) = SampleChannel::create(
        recorder.clone(),
        NullSink,
        ChannelConfig::default(),
        vec![Tag::ArrChar, Tag::I64, Tag::Thread],
    );

    let tid = ThreadId::current();
    let rows: [(&str, i64); 4] = [("some text", -3), ("some", -2), ("text", 0), ("`", 65536)];
    for (text, value) in rows {
        log_sample!(producer, text, value, tid).unwrap();
    }

    while consumer.try_process_one().unwrap() {}

    let schemas = recorder.schemas.lock().unwrap();
    assert_eq!(
        *schemas,
        vec![vec![Tag::ArrChar, Tag::I64, Tag::Thread]],
        "schema is published exactly once"
    );

    let samples = recorder.samples.lock().unwrap();
    assert_eq!(samples.len(), 4);
    for (i, (text, value)) in rows.iter().enumerate() {
        let expected = vec![
            Seen::chars(text),
            Seen {
                tag: Tag::I64,
                scalar: u64::from_le_bytes(value.to_le_bytes()),
                payload: Vec::new(),
            },
            Seen::scalar(Tag::Thread, u64::from(tid.0)),
        ];
        assert_eq!(samples[i], expected);
    }
}

#[test]
fn test_schema_mismatch_never_reaches_consumer() {
    let recorder = Recorder::default();
    let (producer, mut consumer) = SampleChannel::create(
        recorder.clone(),
        NullSink,
        ChannelConfig::default(),
        vec![Tag::U32, Tag::F64],
    );

    assert!(matches!(
        log_sample!(producer, 1u32),
        Err(ChannelError::SchemaMismatch { index: 1 })
    ));
    assert!(matches!(
        log_sample!(producer, 1u32, 2u32),
        Err(ChannelError::SchemaMismatch { index: 1 })
    ));
    assert!(log_sample!(producer, 1u32, 2.5f64).is_ok());

    while consumer.try_process_one().unwrap() {}
    assert_eq!(recorder.samples.lock().unwrap().len(), 1);
}

#[test]
fn test_fifo_round_trip_mixed_payloads() {
    let recorder = Recorder::default();
    let (producer, mut consumer) = EventChannel::create(
        recorder.clone(),
        NullSink,
        ChannelConfig::default(),
    );

    let count = 100u64;
    for i in 0..count {
        let text = format!("payload-{i:04}");
        let series: Vec<u32> = (0..(i % 7) as u32).collect();
        log_event!(producer, "step {} of {}", i, text, series).unwrap();
    }

    while consumer.try_process_one().unwrap() {}

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), count as usize);
    for (i, (_, args)) in events.iter().enumerate() {
        let i = i as u64;
        let series: Vec<u8> = (0..(i % 7) as u32)
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(args[0], Seen::scalar(Tag::U64, i));
        assert_eq!(args[1], Seen::chars(&format!("payload-{i:04}")));
        assert_eq!(
            args[2],
            Seen {
                tag: Tag::ArrU32,
                scalar: 0,
                payload: series,
            }
        );
    }
}

#[test]
fn test_concurrent_registration_yields_one_id() {
    let recorder = Recorder::default();
    let (producer, mut consumer) = EventChannel::create(
        recorder.clone(),
        NullSink,
        ChannelConfig::default(),
    );

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let mut workers = Vec::new();
    for _ in 0..threads {
        let producer = producer.clone();
        let barrier = Arc::clone(&barrier);
        workers.push(thread::spawn(move || {
            barrier.wait();
            log_event!(producer, "racing registration", 1u8).unwrap();
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    while consumer.try_process_one().unwrap() {}

    let attributes = recorder.attributes.lock().unwrap();
    assert_eq!(attributes.len(), 1, "attributes are published exactly once");
    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), threads);
    assert!(events.iter().all(|(id, _)| *id == attributes[0].id));
}

#[test]
fn test_drop_policy_accounts_for_every_event() {
    let recorder = Recorder::default();
    let config = ChannelConfig::new(128, 2).with_overflow(OverflowPolicy::Drop);
    let (producer, mut consumer) = EventChannel::create(recorder.clone(), NullSink, config);

    let done = Arc::new(AtomicBool::new(false));
    let drain_done = Arc::clone(&done);
    let drainer = thread::spawn(move || loop {
        match consumer.try_process_one() {
            Ok(true) => {}
            Ok(false) => {
                if drain_done.load(Ordering::Acquire) {
                    // one final sweep after the producer stopped
                    while consumer.try_process_one().unwrap() {}
                    return consumer;
                }
                thread::yield_now();
            }
            Err(err) => panic!("consumer failed: {err}"),
        }
    });

    let total = 10u64;
    let mut accepted = 0u64;
    for i in 0..total {
        let text = format!("pay{i:05}");
        if log_event!(producer, "burst", i, text).is_ok() {
            accepted += 1;
        }
    }

    done.store(true, Ordering::Release);
    let consumer = drainer.join().unwrap();

    let delivered = recorder.events.lock().unwrap().len() as u64;
    let dropped = consumer.dropped_events();
    assert_eq!(delivered, accepted);
    assert_eq!(
        delivered + dropped,
        total,
        "every event is either delivered or counted as dropped"
    );

    // every delivered event is byte-identical to its source
    for (_, args) in recorder.events.lock().unwrap().iter() {
        assert_eq!(args[0].tag, Tag::U64);
        let i = args[0].scalar;
        assert_eq!(args[1], Seen::chars(&format!("pay{i:05}")));
    }
}

#[test]
fn test_fail_policy_does_not_count() {
    let recorder = Recorder::default();
    let config = ChannelConfig::new(4096, 4).with_overflow(OverflowPolicy::Fail);
    let (producer, _consumer) = EventChannel::create(recorder, NullSink, config);

    // registration occupies one slot; two occurrences fill the rest
    let mut results = Vec::new();
    for _ in 0..3 {
        results.push(log_event!(producer, "fill"));
    }
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(ChannelError::QueueFull)));
    assert_eq!(producer.dropped_events(), 0);
}

#[test]
fn test_queue_two_threads_one_million_items() {
    #[derive(Clone, Copy)]
    struct Item {
        p: u64,
        v: u64,
    }

    let queue = Arc::new(SpinQueue::new(
        1024,
        Contention::Multi,
        Contention::Multi,
    ));
    let tx = Arc::clone(&queue);

    const COUNT: u64 = 1_000_000;
    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            tx.push(Item { p: i, v: i + 1 });
        }
    });

    for i in 0..COUNT {
        let item = queue.pop();
        assert_eq!(item.p, i);
        assert_eq!(item.v, i + 1);
    }
    producer.join().unwrap();
    assert!(queue.is_empty());
}
