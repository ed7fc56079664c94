//! Single-pass statistics collection

use super::statistics::{Statistics, StatisticsFormat};
use crate::config::StatisticsConfig;
use crate::core::progress::PassContext;
use crate::core::xml::{XmlEvent, XmlEventReader};
use crate::domain::{Path, Result};
use std::io::BufRead;

/// Streams a document once and counts every element and attribute path
///
/// Attributes are counted when their element opens; elements are counted
/// when they close, with their direct text. Namespace declarations are not
/// counted.
pub struct StatisticsCollector {
    format: StatisticsFormat,
    limits: StatisticsConfig,
}

impl StatisticsCollector {
    pub fn new(format: StatisticsFormat, limits: &StatisticsConfig) -> Self {
        Self {
            format,
            limits: limits.clone(),
        }
    }

    pub fn collect<R: BufRead>(
        &self,
        events: &mut XmlEventReader<R>,
        ctx: &mut PassContext<'_>,
    ) -> Result<Statistics> {
        let mut statistics = Statistics::new(self.format, self.limits.max_value_length);
        let mut path = Path::root();
        let mut texts: Vec<String> = Vec::new();

        loop {
            match events.next_event()? {
                XmlEvent::Start {
                    tag, attributes, ..
                } => {
                    path.push(tag);
                    for attribute in attributes {
                        statistics
                            .fields
                            .entry(path.child(attribute.tag))
                            .or_default()
                            .record(&attribute.value, &self.limits);
                    }
                    texts.push(String::new());
                }
                XmlEvent::Text(text) => {
                    if let Some(current) = texts.last_mut() {
                        current.push_str(&text);
                    }
                }
                XmlEvent::End(_) => {
                    let text = texts.pop().unwrap_or_default();
                    statistics
                        .fields
                        .entry(path.clone())
                        .or_default()
                        .record(&text, &self.limits);
                    path.pop();
                    statistics.element_count += 1;
                    if statistics.element_count % self.limits.progress_step.max(1) == 0 {
                        ctx.checkpoint(statistics.element_count)?;
                    }
                }
                XmlEvent::Eof => break,
            }
        }

        ctx.checkpoint(statistics.element_count)?;
        tracing::debug!(
            format = %self.format,
            elements = statistics.element_count,
            paths = statistics.fields.len(),
            "Statistics collected"
        );
        Ok(statistics)
    }
}
