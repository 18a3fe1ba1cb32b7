use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{AssembleSummary, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints one progress line per file to stderr.
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        let mut stderr = io::stderr();
        let line = match event.source {
            Some(source) => format!(
                "{} {}/{} {}",
                format!("Reading {} Data:", source.label()).cyan(),
                event.done,
                event.total,
                event.message.dim()
            ),
            None => match event.elapsed {
                Some(elapsed) => format!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
                None => event.message,
            },
        };
        let _ = writeln!(stderr, "{line}");
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &AssembleSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub fn print_human_summary(summary: &AssembleSummary) {
    println!("{}", "KIRA-SA summary".cyan());
    let sources = [
        ("behavior", &summary.behavior),
        ("light", &summary.light),
        ("time", &summary.time),
    ];
    for (name, source) in sources {
        println!("{} {} samples", format!("{name}:").green(), source.samples.len());
        for sample in &source.samples {
            println!(
                "   {} rows={} columns={}",
                sample.sample_id,
                sample.rows,
                sample.columns.len()
            );
        }
    }
    if !summary.behavior_counts.counts.is_empty() {
        println!("{}", "behavior counts:".green());
        for count in &summary.behavior_counts.counts {
            println!("   {} {}", count.column, count.positive);
        }
    }
    for sample in &summary.behavior_overwritten {
        println!("{} duplicate behavior sample {sample}", "warning:".yellow());
    }
    let time_source = match summary.time_source {
        crate::time::TimeSource::Cache => "cache",
        crate::time::TimeSource::Computed => "computed",
    };
    println!("time data: {time_source}");
}
