//! Log output for the native library
//!
//! Events are prefixed with a timestamp and the component that emitted them,
//! derived from the event target, so registry failures at load time stand out
//! from per-call bridge traffic.

use lscan_bridge::LoggingConfig;
use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::io;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{
    format::{FormatEvent, FormatFields, Writer},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Native,
    Registry,
    Bridge,
}

impl Component {
    pub fn from_target(target: &str) -> Self {
        if target.starts_with("lscan_bridge::registry") {
            Component::Registry
        } else if target.starts_with("lscan_bridge") {
            Component::Bridge
        } else {
            Component::Native
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Native => "JNI",
            Component::Registry => "REGISTRY",
            Component::Bridge => "BRIDGE",
        }
    }

    pub fn color_style(&self) -> Style {
        match self {
            Component::Native => Style::new().cyan().bold(),
            Component::Registry => Style::new().magenta().bold(),
            Component::Bridge => Style::new().green().bold(),
        }
    }
}

pub struct TaggedFormatter {
    pub color: bool,
}

impl<S, N> FormatEvent<S, N> for TaggedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let component = Component::from_target(metadata.target());
        let now = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        let prefix = format!("[{:8}]", component.as_str());
        let level = match *metadata.level() {
            Level::ERROR => "ERROR",
            Level::WARN => "WARN ",
            Level::INFO => "INFO ",
            Level::DEBUG => "DEBUG",
            Level::TRACE => "TRACE",
        };

        if self.color {
            write!(writer, "{} ", now.dimmed())?;
            write!(writer, "{} ", prefix.style(component.color_style()))?;
            let level_style = match *metadata.level() {
                Level::ERROR => Style::new().red().bold(),
                Level::WARN => Style::new().yellow().bold(),
                Level::INFO => Style::new().green().bold(),
                Level::DEBUG => Style::new().blue().bold(),
                Level::TRACE => Style::new().dimmed().bold(),
            };
            write!(writer, "{} ", level.style(level_style))?;
        } else {
            write!(writer, "{} {} {} ", now, prefix, level)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Install the process-wide subscriber.
///
/// Fails if one is already installed, e.g. when the host embeds several
/// Rust libraries.
pub fn init_logger(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(TaggedFormatter {
            color: config.color,
        })
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
