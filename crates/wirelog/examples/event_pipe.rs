//! Two-thread producer/consumer pipe writing plain text to stdout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use wirelog::{
    log_event, ChannelConfig, EventChannel, OverflowPolicy, PlainTextEventFormatter, StreamSink,
    ThreadId,
};

fn main() {
    let config = ChannelConfig::default().with_overflow(OverflowPolicy::Block);
    let (producer, mut consumer) = EventChannel::create(
        PlainTextEventFormatter::new(),
        StreamSink::new(std::io::stdout()),
        config,
    );

    let done = Arc::new(AtomicBool::new(false));
    let drain_done = Arc::clone(&done);

    let drainer = thread::spawn(move || {
        loop {
            match consumer.try_process_one() {
                Ok(true) => {}
                Ok(false) => {
                    if drain_done.load(Ordering::Acquire) {
                        break;
                    }
                    thread::yield_now();
                }
                Err(err) => {
                    eprintln!("consumer error: {err}");
                    break;
                }
            }
        }
    });

    for batch in 0..4u32 {
        for item in 0..8u64 {
            log_event!(
                producer,
                "processed item {} of batch {} on {}",
                item,
                batch,
                ThreadId::current()
            )
            .expect("log_event");
        }
    }

    done.store(true, Ordering::Release);
    drainer.join().expect("drainer panicked");
}
