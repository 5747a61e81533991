//! Parse dataset dump files into records.
//!
//! Dump files are not pure JSON: an arbitrary preamble (e.g.
//! `window.YTD.tweets.part0 = `) precedes a JSON array of record objects.
//! Each record object has exactly one top-level key, the dataset's type tag,
//! whose value is the mapping that actually gets stored.

use crate::{errors::ImportError, Result};
use serde_json::{Map, Value};

/// One record of a dataset: the type tag and the inner mapping.
///
/// Only `fields` is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub type_tag: String,
    pub fields: Map<String, Value>,
}

/// Drop everything before the first `[`.
///
/// Returns `None` when the input contains no `[` at all.
pub fn strip_preamble(raw: &str) -> Option<&str> {
    raw.find('[').map(|idx| &raw[idx..])
}

/// Parse the contents of a dump file into records.
pub fn parse_dump(raw: &str) -> Result<Vec<Record>> {
    let Some(json) = strip_preamble(raw) else {
        return Err(ImportError::Parse {
            reason: "no JSON array found in file".to_string(),
        }.into());
    };

    let values: Vec<Value> = serde_json::from_str(json)
        .map_err(|err| ImportError::Parse { reason: err.to_string() })?;

    values.into_iter()
          .enumerate()
          .map(|(index, value)| Record::from_wrapper(index, value))
          .collect()
}

impl Record {
    /// Unwrap one `{ "<type_tag>": { ... } }` object.
    fn from_wrapper(index: usize, value: Value) -> Result<Record> {
        let Value::Object(wrapper) = value else {
            return Err(ImportError::RecordShape { index }.into());
        };

        if wrapper.len() != 1 {
            return Err(ImportError::RecordShape { index }.into());
        }

        let (type_tag, inner) = wrapper.into_iter()
                                       .next()
                                       .expect("wrapper len checked above");

        let Value::Object(fields) = inner else {
            return Err(ImportError::RecordShape { index }.into());
        };

        Ok(Record {
            type_tag,
            fields,
        })
    }
}
