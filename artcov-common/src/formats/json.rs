//! JSON document format
//!
//! ```json
//! {
//!   "subjects": [{ "id": 1, "name": "Algebra" }],
//!   "articles": [{ "id": 1, "name": "Limits" }],
//!   "appearance": { "1": [1] },
//!   "firstAppearance": { "1": 1 }
//! }
//! ```
//!
//! Subject order in the array is rank order. Map keys are article ids and
//! may appear only once per map.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

use super::{DataExporter, DataImporter};
use crate::data::{Article, RawData, Subject, VerifiedData};
use crate::ids::{ArticleId, SubjectId};
use crate::model::ComputedModel;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    subjects: Vec<Subject>,
    articles: Vec<Article>,
    appearance: BTreeMap<ArticleId, Vec<SubjectId>>,
    first_appearance: BTreeMap<ArticleId, SubjectId>,
}

/// Document as read, with map entries kept in input order so repeated keys
/// can be reported
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputDocument {
    subjects: Vec<Subject>,
    articles: Vec<Article>,
    #[serde(deserialize_with = "map_entries")]
    appearance: Vec<(ArticleId, Vec<SubjectId>)>,
    #[serde(default, deserialize_with = "map_entries")]
    first_appearance: Vec<(ArticleId, SubjectId)>,
}

fn map_entries<'de, D, V>(deserializer: D) -> std::result::Result<Vec<(ArticleId, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
        type Value = Vec<(ArticleId, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map keyed by article id")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

/// JSON importer and exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl JsonFormat {
    /// Parse and validate a document
    pub fn import(bytes: &[u8]) -> Result<VerifiedData> {
        let document: InputDocument = serde_json::from_slice(bytes)?;

        let mut appearance = BTreeMap::new();
        for (article, subjects) in document.appearance {
            if appearance.contains_key(&article) {
                return Err(Error::Format(format!(
                    "duplicate article id {article} in 'appearance'"
                )));
            }
            let mut set = BTreeSet::new();
            for subject in subjects {
                if !set.insert(subject) {
                    return Err(Error::Format(format!(
                        "duplicate subject id {subject} in 'appearance' list of article {article}"
                    )));
                }
            }
            appearance.insert(article, set);
        }

        let mut first_appearance = BTreeMap::new();
        for (article, subject) in document.first_appearance {
            if first_appearance.insert(article, subject).is_some() {
                return Err(Error::Format(format!(
                    "duplicate article id {article} in 'firstAppearance'"
                )));
            }
        }

        let raw = RawData {
            subjects: document.subjects,
            articles: document.articles,
            appearance,
            first_appearance,
        };

        let verified = VerifiedData::verify(raw).map_err(|e| {
            warn!("Rejected imported document: {}", e);
            e
        })?;
        debug!(
            subjects = verified.data().subjects.len(),
            articles = verified.data().articles.len(),
            "Imported JSON document"
        );
        Ok(verified)
    }

    /// Serialize verified data as pretty-printed JSON
    pub fn export(data: &VerifiedData) -> Result<Vec<u8>> {
        let data = data.data();
        let document = Document {
            subjects: data.subjects.clone(),
            articles: data.articles.clone(),
            appearance: data
                .appearance
                .iter()
                .map(|(article, subjects)| (*article, subjects.iter().copied().collect()))
                .collect(),
            first_appearance: data.first_appearance.clone(),
        };
        Ok(serde_json::to_vec_pretty(&document)?)
    }
}

impl DataImporter for JsonFormat {
    fn import_data(&self, bytes: &[u8]) -> Result<VerifiedData> {
        Self::import(bytes)
    }
}

impl DataExporter for JsonFormat {
    fn export_data(&self, model: &ComputedModel) -> Result<Vec<u8>> {
        Self::export(&model.data())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
