/// How many threads may drive an end of a channel or queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Contention {
    /// One thread; the end runs gate-free.
    Single,
    /// Several threads; the end is serialised by an atomic latch.
    #[default]
    Multi,
}

/// What a producer does when the arena or queue cannot take an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Spin with adaptive backoff until space frees up.
    #[default]
    Block,
    /// Count the entry as dropped and return the error.
    Drop,
    /// Return the error without touching the dropped counter.
    Fail,
}

/// Construction parameters for the in-process channels.
#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// Argument arena size in bytes.
    pub arena_capacity: u32,
    /// Descriptor queue size in entries. One entry is sacrificed to tell
    /// full from empty.
    pub queue_capacity: u32,
    /// Producer behaviour under backpressure.
    pub overflow: OverflowPolicy,
    /// Number of threads sharing the producer half.
    pub producers: Contention,
}

impl ChannelConfig {
    /// Creates a configuration with the given capacities and the default
    /// `Block`/`Multi` behaviour.
    pub const fn new(arena_capacity: u32, queue_capacity: u32) -> Self {
        assert!(arena_capacity >= 2, "arena capacity must be at least 2 bytes");
        assert!(queue_capacity >= 2, "queue capacity must be at least 2 entries");
        Self {
            arena_capacity,
            queue_capacity,
            overflow: OverflowPolicy::Block,
            producers: Contention::Multi,
        }
    }

    /// Sets the overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Sets the producer contention strategy.
    pub fn with_producers(mut self, producers: Contention) -> Self {
        self.producers = producers;
        self
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(64 * 1024, 1024)
    }
}

/// Small-footprint preset (8 KiB arena, 128 descriptors).
pub const LOW_FOOTPRINT_CONFIG: ChannelConfig = ChannelConfig::new(8 * 1024, 128);

/// High-throughput preset (1 MiB arena, 8192 descriptors).
pub const HIGH_THROUGHPUT_CONFIG: ChannelConfig = ChannelConfig::new(1024 * 1024, 8192);
