//! Call-site registration and the consumer-side attribute store.
//!
//! Each logging call site owns one [`CallSite`] static. The first use
//! resolves it to an [`EventAttributes`] record with an id drawn from a
//! process-wide counter; every later use returns the same record. The
//! publication claim is a separate one-shot so the owning channel can put
//! the attributes in front of the consumer exactly once, ahead of any
//! occurrence.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::OnceLock;

/// Identifier assigned to a call site, unique within the process.
pub type EventId = u32;

static NEXT_EVENT_ID: AtomicU32 = AtomicU32::new(1);

/// Immutable call-site record.
///
/// Strings are borrowed program text on the producer side and owned buffers
/// in a consumer-side [`AttributeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttributes {
    pub id: EventId,
    pub line: u32,
    pub expected_argc: u16,
    pub message_format: Cow<'static, str>,
    pub function: Cow<'static, str>,
    pub file: Cow<'static, str>,
}

/// Static call-site metadata gathered by the logging macros.
#[derive(Debug, Clone, Copy)]
pub struct EventMeta {
    pub message_format: &'static str,
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub argc: u16,
}

/// Per-call-site registration state; one `static` per source location.
pub struct CallSite {
    attrs: OnceLock<EventAttributes>,
    published: AtomicBool,
}

impl CallSite {
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            attrs: OnceLock::new(),
            published: AtomicBool::new(false),
        }
    }

    /// Resolve the attributes, assigning the id on first use.
    ///
    /// Concurrent first calls race on one initialisation; all of them
    /// observe the same record and the same id.
    pub fn attributes(&'static self, meta: &EventMeta) -> &'static EventAttributes {
        self.attrs.get_or_init(|| EventAttributes {
            id: NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed),
            line: meta.line,
            expected_argc: meta.argc,
            message_format: Cow::Borrowed(meta.message_format),
            function: Cow::Borrowed(trim_function_name(meta.function)),
            file: Cow::Borrowed(file_basename(meta.file)),
        })
    }

    /// True exactly once across the process: the caller that wins publishes
    /// the attributes to its channel.
    pub fn claim_publication(&self) -> bool {
        !self.published.swap(true, Ordering::AcqRel)
    }
}

/// Text after the last path separator.
pub(crate) fn file_basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Strip the probe-function suffix left by the function-name macro.
pub(crate) fn trim_function_name(name: &str) -> &str {
    name.strip_suffix("::f").unwrap_or(name)
}

/// Consumer-side id → attributes map with owned string storage.
///
/// Used by receivers that share no memory with their producer; the
/// in-process channel resolves attributes through the descriptor itself.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    records: HashMap<EventId, EventAttributes>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any previous one under the same id.
    pub fn insert(&mut self, attrs: EventAttributes) -> &EventAttributes {
        match self.records.entry(attrs.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(attrs);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(attrs),
        }
    }

    pub fn get(&self, id: EventId) -> Option<&EventAttributes> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        static A: CallSite = CallSite::new();
        static B: CallSite = CallSite::new();
        let meta = EventMeta {
            message_format: "m",
            function: "f",
            file: "src/lib.rs",
            line: 1,
            argc: 0,
        };

        let a = A.attributes(&meta);
        let b = B.attributes(&meta);
        assert!(a.id >= 1);
        assert!(b.id > a.id);

        // re-registration returns the same record
        assert_eq!(A.attributes(&meta).id, a.id);
    }

    #[test]
    fn test_publication_claim_is_one_shot() {
        static SITE: CallSite = CallSite::new();
        assert!(SITE.claim_publication());
        assert!(!SITE.claim_publication());
    }

    #[test]
    fn test_file_basename() {
        assert_eq!(file_basename("src/diag/event.rs"), "event.rs");
        assert_eq!(file_basename("src\\diag\\event.rs"), "event.rs");
        assert_eq!(file_basename("event.rs"), "event.rs");
    }

    #[test]
    fn test_trim_function_name() {
        assert_eq!(trim_function_name("app::worker::run::f"), "app::worker::run");
        assert_eq!(trim_function_name("run"), "run");
    }

    #[test]
    fn test_registry_overwrites_by_id() {
        let mut registry = AttributeRegistry::new();
        let attrs = EventAttributes {
            id: 7,
            line: 3,
            expected_argc: 2,
            message_format: Cow::Owned("fmt".into()),
            function: Cow::Owned("fun".into()),
            file: Cow::Owned("file.rs".into()),
        };
        registry.insert(attrs.clone());
        assert_eq!(registry.get(7), Some(&attrs));
        assert_eq!(registry.get(8), None);

        let replaced = EventAttributes {
            line: 4,
            ..attrs
        };
        registry.insert(replaced.clone());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(7), Some(&replaced));
    }
}
