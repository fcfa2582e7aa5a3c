use std::fmt;

use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::filter::IndicatifFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::terminal::{colors, spinner};

/// Environment variable that overrides the log filter, e.g. `SWEEPR_LOG=debug`.
pub const LOG_ENV: &str = "SWEEPR_LOG";

pub struct SweeprFormatter;

impl<S, N> FormatEvent<S, N> for SweeprFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        match meta.target() {
            "sweepr::print" => {
                let mut raw = RawMessage::default();
                event.record(&mut raw);
                return writeln!(writer, "{}", raw.0);
            }
            "sweepr::success" => write!(writer, "{} ", "[✓]".color(colors::SUCCESS).bold())?,
            "sweepr::status" => write!(writer, "{} ", ">".color(colors::SEPARATOR))?,
            _ => {
                let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
                    Level::TRACE => ("[ ]", |s| s.dimmed()),
                    Level::DEBUG => ("[?]", |s| s.blue()),
                    Level::INFO => ("[+]", |s| s.green().bold()),
                    Level::WARN => ("[*]", |s| s.yellow().bold()),
                    Level::ERROR => ("[-]", |s| s.red().bold()),
                };
                write!(writer, "{} ", color_func(symbol.into()))?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Pulls the `raw_msg` field out of a print event.
#[derive(Default)]
struct RawMessage(String);

impl Visit for RawMessage {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "raw_msg" {
            self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "raw_msg" {
            self.0 = format!("{value:?}");
        }
    }
}

fn default_filter(q_level: u8) -> &'static str {
    match q_level {
        0 => "info",
        1 => "warn,sweepr::print=info,sweepr::success=info",
        _ => "error",
    }
}

/// Installs the global subscriber: the formatter above on stderr, plus
/// progress bars for spans carrying `indicatif.pb_show`.
pub fn init_logging(q_level: u8) {
    let indicatif_layer = IndicatifLayer::new().with_progress_style(spinner::style());
    let writer = indicatif_layer.get_stderr_writer();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter(q_level)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(SweeprFormatter)
        .with_writer(writer);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(indicatif_layer.with_filter(IndicatifFilter::new(false)))
        .try_init();
}
