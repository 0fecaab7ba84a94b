//! Import and export collaborators
//!
//! Importers always hand their result to the validator, so an import either
//! yields [`VerifiedData`] or the reason it was rejected. Exporters only read
//! through the model's accessors.

mod csv;
mod json;

pub use csv::CsvFormat;
pub use json::JsonFormat;

use crate::data::VerifiedData;
use crate::model::ComputedModel;
use crate::Result;

/// Turns bytes into validated data
pub trait DataImporter {
    fn import_data(&self, bytes: &[u8]) -> Result<VerifiedData>;
}

/// Serializes the current state of a model
pub trait DataExporter {
    fn export_data(&self, model: &ComputedModel) -> Result<Vec<u8>>;

    /// Conventional file extension, without the dot
    fn extension(&self) -> &'static str;
}

/// Exporter for a format name as given on the command line
pub fn exporter_for(name: &str) -> Option<Box<dyn DataExporter>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(JsonFormat)),
        "csv" => Some(Box::new(CsvFormat)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_lookup() {
        assert_eq!(exporter_for("json").unwrap().extension(), "json");
        assert_eq!(exporter_for("CSV").unwrap().extension(), "csv");
        assert!(exporter_for("xlsx").is_none());
    }
}
