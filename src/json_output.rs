//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico
//! del binario (wrapper, script di build, CI).
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga per ogni `BatchEvent`
//! - Aggiunge il livello dell'evento e il messaggio leggibile
//! - Filtra gli eventi di debug se non richiesti
//!
//! ## Esempio di riga:
//! ```json
//! {"level":"info","message":"minified [[ assets/a.png ]] ...","type":"file_evaluated", ...}
//! ```

use crate::events::{BatchEvent, EventLevel, EventSink};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Serialize)]
struct JsonLine<'a> {
    level: EventLevel,
    message: String,
    #[serde(flatten)]
    event: &'a BatchEvent,
}

/// Sink that writes one JSON object per event
pub struct JsonSink<W: Write + Send> {
    writer: Mutex<W>,
    include_debug: bool,
}

impl JsonSink<std::io::Stdout> {
    /// Emette su stdout
    pub fn stdout(include_debug: bool) -> Self {
        Self::new(std::io::stdout(), include_debug)
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W, include_debug: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            include_debug,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventSink for JsonSink<W> {
    fn emit(&self, event: &BatchEvent) {
        let level = event.level();
        if level == EventLevel::Debug && !self.include_debug {
            return;
        }

        let line = JsonLine {
            level,
            message: event.message(),
            event,
        };

        if let Ok(json) = serde_json::to_string(&line) {
            let mut writer = self
                .writer
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = writeln!(writer, "{}", json);
            let _ = writer.flush();
        }
    }
}
