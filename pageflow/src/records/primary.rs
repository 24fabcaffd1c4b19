//! Primary item annotation for the structured record file.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::Record;

/// Field prepended to each primary item in the structured record file.
pub const PAGE_REVIEW_FIELD: &str = "Page_Review";

const PHOTOS_FIELD: &str = "Photos";

static PHOTO_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"review_page(\d+)_(\d+)_photo_").ok());

/// Derives `"<page>_<index>"` from the record's first photo path.
///
/// Photos may be an array of paths or a comma-separated string. Returns an
/// empty string when there is no photo or the name does not match.
#[must_use]
pub fn page_review_tag(record: &Record) -> String {
    let first = match record.get(PHOTOS_FIELD) {
        Some(Value::Array(items)) => items.first().and_then(Value::as_str).map(str::to_string),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .find(|p| !p.is_empty())
            .map(str::to_string),
        _ => None,
    };

    first
        .and_then(|path| {
            PHOTO_NAME
                .as_ref()?
                .captures(&path)
                .map(|caps| format!("{}_{}", &caps[1], &caps[2]))
        })
        .unwrap_or_default()
}

/// Returns a copy of the record with [`PAGE_REVIEW_FIELD`] as its first field.
#[must_use]
pub fn annotate_page_review(record: &Record) -> Record {
    let mut fields = Map::with_capacity(record.len() + 1);
    fields.insert(PAGE_REVIEW_FIELD.to_string(), Value::String(page_review_tag(record)));
    for (key, value) in record.fields() {
        if key != PAGE_REVIEW_FIELD {
            fields.insert(key.clone(), value.clone());
        }
    }
    Record::from_map(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_from_array() {
        let record = Record::new().with_field(
            "Photos",
            json!(["photos/review_page3_7_photo_1.jpg", "photos/review_page3_7_photo_2.jpg"]),
        );
        assert_eq!(page_review_tag(&record), "3_7");
    }

    #[test]
    fn test_tag_from_joined_string() {
        let record =
            Record::new().with_field("Photos", " , photos/review_page12_1_photo_1.jpg, other.jpg");
        assert_eq!(page_review_tag(&record), "12_1");
    }

    #[test]
    fn test_tag_absent() {
        assert_eq!(page_review_tag(&Record::new()), "");
        let record = Record::new().with_field("Photos", json!(["unrelated.jpg"]));
        assert_eq!(page_review_tag(&record), "");
    }

    #[test]
    fn test_annotation_is_first_field() {
        let record = Record::new()
            .with_field("Reviewer Name", "kim")
            .with_field("Photos", json!(["review_page1_2_photo_1.jpg"]));
        let annotated = annotate_page_review(&record);

        let keys: Vec<_> = annotated.keys().cloned().collect();
        assert_eq!(keys, vec!["Page_Review", "Reviewer Name", "Photos"]);
        assert_eq!(annotated.text("Page_Review"), "1_2");
    }
}
