// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
use std::io::{self, Write};

/// The pipeline's message log.  Passes record diagnostics (conflict
/// resolutions, warnings, errors) as they happen; the log is written to
/// standard error in one piece when the pipeline ends, so diagnostics are
/// never interleaved with generated output.
#[derive(Debug)]
pub struct MessageLog {
    tag: String,
    messages: Vec<String>,
}

impl MessageLog {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            messages: vec![],
        }
    }

    pub fn record(&mut self, message: String) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for message in self.messages.iter() {
            writeln!(out, "{}: {}", self.tag, message)?;
        }
        Ok(())
    }
}
