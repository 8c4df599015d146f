//! Rendering of a collection in Prometheus text exposition format.

use std::fmt::Write;
use std::time::Duration;

use crate::catalog::{self, MetricIdentity};
use crate::collector::{Collection, MetricEvent, Sample};

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Lines gathered for one metric family.
struct Family {
    identity: &'static MetricIdentity,
    samples: Vec<String>,
    errors: Vec<String>,
}

impl Family {
    fn new(identity: &'static MetricIdentity) -> Self {
        Self {
            identity,
            samples: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn push(&mut self, event: MetricEvent<'_>) {
        match event {
            MetricEvent::Sample(sample) => {
                let mut line = String::from(sample.identity.name);
                write_labels(&mut line, &sorted_labels(&sample));
                line.push(' ');
                line.push_str(&format_value(sample.value));
                self.samples.push(line);
            }
            MetricEvent::Invalid {
                identity,
                period,
                error,
            } => {
                let message = error.to_string().replace('\n', " ");
                self.errors.push(format!(
                    "# ERROR {} period=\"{}\": {}",
                    identity.name, period, message
                ));
            }
        }
    }
}

/// Render a collection, followed by the exporter's own scrape metrics.
///
/// Every catalog family gets HELP and TYPE lines, even if it has no
/// samples. Failed metrics are written as `# ERROR` comments.
pub fn render(collection: &Collection, duration: Duration) -> String {
    let mut families: Vec<Family> = catalog::all_identities().map(Family::new).collect();

    for event in collection.events() {
        let name = event.identity().name;
        if let Some(family) = families.iter_mut().find(|f| f.identity.name == name) {
            family.push(event);
        }
    }

    let mut output = String::with_capacity(8 * 1024);

    for family in &families {
        let identity = family.identity;
        writeln!(output, "# HELP {} {}", identity.name, escape_help(identity.help)).ok();
        writeln!(output, "# TYPE {} {}", identity.name, identity.kind.as_str()).ok();

        for line in family.errors.iter().chain(family.samples.iter()) {
            writeln!(output, "{}", line).ok();
        }
    }

    writeln!(
        output,
        "# HELP purpleair_scrape_success Whether fetching the sensor document for a period succeeded"
    )
    .ok();
    writeln!(output, "# TYPE purpleair_scrape_success gauge").ok();
    for outcome in collection.outcomes() {
        writeln!(
            output,
            "purpleair_scrape_success{{period=\"{}\"}} {}",
            outcome.period,
            if outcome.result.is_ok() { 1 } else { 0 }
        )
        .ok();
    }

    writeln!(
        output,
        "# HELP purpleair_scrape_duration_seconds Time spent collecting from the sensor"
    )
    .ok();
    writeln!(output, "# TYPE purpleair_scrape_duration_seconds gauge").ok();
    writeln!(
        output,
        "purpleair_scrape_duration_seconds {}",
        format_value(duration.as_secs_f64())
    )
    .ok();

    output
}

fn sorted_labels(sample: &Sample) -> Vec<(&'static str, &str)> {
    let mut labels: Vec<_> = sample.label_pairs().collect();
    labels.sort_by(|a, b| a.0.cmp(b.0));
    labels
}

/// Append a `{name="value",...}` label set; nothing for an empty set.
fn write_labels(out: &mut String, labels: &[(&str, &str)]) {
    let Some(((first_name, first_value), rest)) = labels.split_first() else {
        return;
    };

    out.push('{');
    push_label(out, first_name, first_value);
    for (name, value) in rest {
        out.push(',');
        push_label(out, name, value);
    }
    out.push('}');
}

fn push_label(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str("=\"");
    push_escaped_label_value(out, value);
    out.push('"');
}

/// Label values escape backslashes, double quotes and newlines.
fn push_escaped_label_value(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
}

/// HELP text escapes only backslashes and newlines.
fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
