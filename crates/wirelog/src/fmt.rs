//! Formatter contracts and the plain-text / dummy implementations.

use crate::arg::{ArrayView, BoundArg, Tag, Value};
use crate::error::ChannelError;
use crate::registry::EventAttributes;
use crate::sink::{write_all, Sink};
use std::fmt::Write as _;

/// Turns decoded event records into sink bytes.
pub trait EventFormatter {
    /// Called once per call site, before any occurrence of it.
    fn format_attributes(
        &mut self,
        sink: &mut dyn Sink,
        attrs: &EventAttributes,
    ) -> Result<(), ChannelError>;

    /// Called once per occurrence.
    fn format_event(
        &mut self,
        sink: &mut dyn Sink,
        attrs: &EventAttributes,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError>;
}

/// Turns decoded sample records into sink bytes.
pub trait SampleFormatter {
    /// Called once with the channel schema, before any sample.
    fn format_expected_types(
        &mut self,
        sink: &mut dyn Sink,
        schema: &[Tag],
    ) -> Result<(), ChannelError>;

    /// Called once per sample.
    fn format_values(
        &mut self,
        sink: &mut dyn Sink,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError>;
}

/// Human-readable event rendering:
/// `[ function - file: line ] "message" // arg // arg`.
#[derive(Debug, Default)]
pub struct PlainTextEventFormatter {
    line: String,
}

impl PlainTextEventFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventFormatter for PlainTextEventFormatter {
    fn format_attributes(
        &mut self,
        _sink: &mut dyn Sink,
        _attrs: &EventAttributes,
    ) -> Result<(), ChannelError> {
        // the occurrence line already carries the call-site fields
        Ok(())
    }

    fn format_event(
        &mut self,
        sink: &mut dyn Sink,
        attrs: &EventAttributes,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        self.line.clear();
        let _ = write!(
            self.line,
            "[ {} - {}: {} ] \"{}\"",
            attrs.function, attrs.file, attrs.line, attrs.message_format
        );
        for arg in args {
            self.line.push_str(" // ");
            push_value(&mut self.line, arg.value());
        }
        self.line.push('\n');
        write_all(sink, self.line.as_bytes())
    }
}

/// Human-readable sample rendering: one schema line, then one line of
/// comma-separated values per sample.
#[derive(Debug, Default)]
pub struct PlainTextSampleFormatter {
    line: String,
}

impl PlainTextSampleFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleFormatter for PlainTextSampleFormatter {
    fn format_expected_types(
        &mut self,
        sink: &mut dyn Sink,
        schema: &[Tag],
    ) -> Result<(), ChannelError> {
        self.line.clear();
        self.line.push_str("sample:");
        for tag in schema {
            self.line.push(' ');
            self.line.push_str(tag.name());
        }
        self.line.push('\n');
        write_all(sink, self.line.as_bytes())
    }

    fn format_values(
        &mut self,
        sink: &mut dyn Sink,
        args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        self.line.clear();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.line.push_str(", ");
            }
            push_value(&mut self.line, arg.value());
        }
        self.line.push('\n');
        write_all(sink, self.line.as_bytes())
    }
}

fn push_value(out: &mut String, value: Value<'_>) {
    match value {
        Value::None => out.push_str("none"),
        Value::U8(v) => {
            let _ = write!(out, "{v}");
        }
        Value::U16(v) => {
            let _ = write!(out, "{v}");
        }
        Value::U32(v) => {
            let _ = write!(out, "{v}");
        }
        Value::U64(v) => {
            let _ = write!(out, "{v}");
        }
        Value::I8(v) => {
            let _ = write!(out, "{v}");
        }
        Value::I16(v) => {
            let _ = write!(out, "{v}");
        }
        Value::I32(v) => {
            let _ = write!(out, "{v}");
        }
        Value::I64(v) => {
            let _ = write!(out, "{v}");
        }
        Value::F32(v) => {
            let _ = write!(out, "{v}");
        }
        Value::F64(v) => {
            let _ = write!(out, "{v}");
        }
        Value::Char(c) => out.push(c),
        Value::Thread(t) => {
            let _ = write!(out, "thread-{}", t.0);
        }
        Value::EpochNs(t) => {
            let _ = write!(out, "{}ns", t.0);
        }
        Value::Chars(bytes) => out.push_str(&String::from_utf8_lossy(bytes)),
        Value::Array(view) => push_array(out, view),
    }
}

fn push_array(out: &mut String, view: ArrayView<'_>) {
    out.push('[');
    for (i, value) in view.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_value(out, value);
    }
    out.push(']');
}

/// Formatter that discards events; benchmark and sender-end filler.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyEventFormatter;

impl EventFormatter for DummyEventFormatter {
    fn format_attributes(
        &mut self,
        _sink: &mut dyn Sink,
        _attrs: &EventAttributes,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    fn format_event(
        &mut self,
        _sink: &mut dyn Sink,
        _attrs: &EventAttributes,
        _args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Formatter that discards samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummySampleFormatter;

impl SampleFormatter for DummySampleFormatter {
    fn format_expected_types(
        &mut self,
        _sink: &mut dyn Sink,
        _schema: &[Tag],
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    fn format_values(
        &mut self,
        _sink: &mut dyn Sink,
        _args: &[BoundArg<'_>],
    ) -> Result<(), ChannelError> {
        Ok(())
    }
}
