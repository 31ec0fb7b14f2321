//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::io::Write;

use eyre::{Context, Result};
use log::trace;

use super::{MetricSink, ValueList};

/// Writes value lists with the plain text protocol of collectd's exec plugin.
///
/// https://collectd.org/wiki/index.php/Plain_text_protocol#PUTVAL
pub struct PutvalSink<W: Write> {
    writer: W,
}

impl<W: Write> PutvalSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn format_value(value: f64) -> String {
        if value.is_finite() {
            value.to_string()
        } else {
            "U".to_string()
        }
    }
}

impl<W: Write> MetricSink for PutvalSink<W> {
    fn dispatch(&mut self, value_list: ValueList) -> Result<()> {
        let line = format!(
            "PUTVAL \"{}\" interval={:.3} {:.3}:{}",
            value_list.identifier()?,
            value_list.interval.as_secs_f64(),
            value_list.time.timestamp_millis() as f64 / 1000.0,
            Self::format_value(value_list.value)
        );
        trace!("{}", line);
        writeln!(self.writer, "{}", line).wrap_err("Unable to write PUTVAL command")?;
        self.writer.flush().wrap_err("Unable to flush PUTVAL command")
    }
}
