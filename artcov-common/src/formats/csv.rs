//! CSV report export
//!
//! One header row (`Article Names`, subject names in rank order, `L`, `C`,
//! `h`) followed by one row per article in model order. Subject cells hold
//! the appearance and first-appearance markers.

use csv::{Terminator, WriterBuilder};

use super::DataExporter;
use crate::grid::{APPEARANCE_MARKER, FIRST_APPEARANCE_MARKER};
use crate::model::ComputedModel;
use crate::{Error, Result};

/// CSV report exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl CsvFormat {
    pub fn export(model: &ComputedModel) -> Result<String> {
        let bytes = Self::export_bytes(model)?;
        String::from_utf8(bytes).map_err(|e| Error::Format(format!("CSV is not UTF-8: {}", e)))
    }

    fn export_bytes(model: &ComputedModel) -> Result<Vec<u8>> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let mut header = vec!["Article Names".to_string()];
        header.extend(model.subjects().iter().map(|s| s.name.clone()));
        header.extend(["L", "C", "h"].map(String::from));
        writer.write_record(&header)?;

        for article in model.articles() {
            let mut record = Vec::with_capacity(header.len());
            record.push(article.name.clone());

            for subject in model.subjects() {
                let mut cell = String::new();
                if model.is_article_appeared_at(article.id, subject.id) {
                    cell.push_str(APPEARANCE_MARKER);
                }
                if model.is_article_first_appeared_at(article.id, subject.id) {
                    cell.push_str(FIRST_APPEARANCE_MARKER);
                }
                record.push(cell);
            }

            let scores = model.computed_data_for_article(article.id);
            record.push(scores.l.to_string());
            record.push(scores.c.to_string());
            record.push(scores.h.to_string());

            writer.write_record(&record)?;
        }

        writer.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

impl DataExporter for CsvFormat {
    fn export_data(&self, model: &ComputedModel) -> Result<Vec<u8>> {
        Self::export_bytes(model)
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}
