use serde_json::{Map, Value};

use crate::error::Error;

/// One API record: field name to JSON value, nested objects and lists included.
pub type Record = Map<String, Value>;

// Envelope fields other than `result` (paging links, counts) are ignored.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct PageResponse {
    pub(crate) result: Vec<Record>,
}

pub(crate) fn decode_page(url: &str, body: &str) -> Result<Vec<Record>, Error> {
    serde_json::from_str::<PageResponse>(body)
        .map(|page| page.result)
        .map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_array_is_extracted_in_order() {
        let body = json!({
            "paging": {"next": "https://x/v2/measurements?page=2"},
            "result": [{"id": 1}, {"id": 2, "nested": {"a": true}}]
        })
        .to_string();

        let records = decode_page("u", &body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], json!(1));
        assert_eq!(records[1]["nested"], json!({"a": true}));
    }

    #[test]
    fn empty_result_is_valid() {
        assert!(decode_page("u", r#"{"result": []}"#).unwrap().is_empty());
    }

    #[test]
    fn other_shapes_are_decode_errors() {
        for body in [
            "not json",
            r#"{"results": []}"#,
            r#"{"result": {"id": 1}}"#,
            r#"{"result": [1, 2]}"#,
            r#"[{"id": 1}]"#,
        ] {
            let err = decode_page("https://x/v2/m", body).unwrap_err();
            assert!(
                matches!(&err, Error::Decode { url, .. } if url == "https://x/v2/m"),
                "{body}: {err:?}"
            );
        }
    }
}
