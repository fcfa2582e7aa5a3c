use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use sweepr_common::utils::time::clock;
use sweepr_core::supervisor::ProgressSink;

use crate::terminal::colors;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

pub fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Renders every supervised unit as a spinner bound to its own span. The
/// span lives from `started` to `finished`, so the bar disappears with it.
#[derive(Default)]
pub struct SpinnerProgress {
    spans: Mutex<HashMap<String, Span>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_span(&self, label: &str, f: impl FnOnce(&Span)) {
        if let Ok(spans) = self.spans.lock() {
            if let Some(span) = spans.get(label) {
                f(span);
            }
        }
    }
}

fn message(label: &str, elapsed: Duration, budget: Duration) -> String {
    format!(
        "{} {} {}",
        label.color(colors::TEXT_DEFAULT),
        clock(elapsed).color(colors::ACCENT),
        format!("/ {}", clock(budget)).color(colors::SEPARATOR)
    )
}

impl ProgressSink for SpinnerProgress {
    fn started(&self, label: &str, budget: Duration) {
        let span = info_span!("unit", indicatif.pb_show = true);
        span.pb_set_style(&style());
        span.pb_set_message(&message(label, Duration::ZERO, budget));
        span.pb_start();
        if let Ok(mut spans) = self.spans.lock() {
            spans.insert(label.to_string(), span);
        }
    }

    fn tick(&self, label: &str, elapsed: Duration, budget: Duration) {
        self.with_span(label, |span| span.pb_set_message(&message(label, elapsed, budget)));
    }

    fn finished(&self, label: &str, _elapsed: Duration, _timed_out: bool) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.remove(label);
        }
    }
}
