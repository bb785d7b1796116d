//! Call-site macros.

/// Name of the enclosing function, resolved through a probe item.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        name_of(f)
    }};
}

/// Log one event through an event producer.
///
/// Expands to the per-site static registration state and the log call; the
/// site registers itself on first execution (function name, file basename,
/// line, argument count) and only logs afterwards.
///
/// ```ignore
/// log_event!(producer, "cache miss for {}", key_hash, ThreadId::current())?;
/// ```
#[macro_export]
macro_rules! log_event {
    ($producer:expr, $message:literal $(, $arg:expr)* $(,)?) => {{
        static SITE: $crate::CallSite = $crate::CallSite::new();
        const ARGC: u16 = 0 $(+ {
            let _ = stringify!($arg);
            1
        })*;
        let attrs = $producer.register_event(
            &SITE,
            $crate::EventMeta {
                message_format: $message,
                function: $crate::__function_name!(),
                file: file!(),
                line: line!(),
                argc: ARGC,
            },
        );
        $producer.log_event(attrs, &[$(&$arg as &dyn $crate::Encodable),*])
    }};
}

/// Log one sample through a sample producer.
///
/// ```ignore
/// log_sample!(producer, "phase", -3i64, ThreadId::current())?;
/// ```
#[macro_export]
macro_rules! log_sample {
    ($producer:expr $(, $arg:expr)+ $(,)?) => {
        $producer.log_sample(&[$(&$arg as &dyn $crate::Encodable),+])
    };
}
