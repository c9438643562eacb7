//! Terminal rendering of tracing events.
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use super::STAGE_TARGET;
use super::fields::EventFields;

/// Renders stage headers as `==> Title`, plain messages indented, and
/// warnings and errors with a coloured level tag.
///
/// Structured fields are only shown on debug lines, which only reach the
/// terminal with `--verbose`.
#[derive(Debug)]
pub(super) struct ConsoleFormatter;

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let fields = EventFields::of(event);
        let msg = &fields.message;

        match *meta.level() {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31merror:\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mwarning:\x1b[0m {msg}"),
            tracing::Level::INFO if meta.target() == STAGE_TARGET => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO => writeln!(writer, "    {msg}"),
            _ => writeln!(writer, "    \x1b[2m{msg}{}\x1b[0m", fields.suffix()),
        }
    }
}
