//! JSON bodies exchanged with the matcher.

use serde::{Deserialize, Serialize};

use landmark_core::{Error, KeypointId, Match, Registration, Result, TreeId};

#[derive(Debug, Serialize)]
pub(crate) struct ProcessRequest<'a> {
    pub filename: &'a str,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessResponse {
    pub keypoint_id: Option<KeypointId>,
    #[serde(default)]
    pub tree_id: Option<TreeId>,
}

impl ProcessResponse {
    pub fn into_registration(self) -> Result<Registration> {
        let keypoint_id = self
            .keypoint_id
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Matcher("register response has no keypointId".to_string()))?;
        Ok(Registration {
            keypoint_id,
            tree_id: self.tree_id.filter(|t| !t.is_empty()),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub filename: &'a str,
    pub tree_ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMatch {
    pub id: KeypointId,
    #[serde(default)]
    pub score: f64,
}

/// Current servers answer with scored `matches`; older ones with a bare,
/// already ranked `keypointIds` list. A missing or null list means no match
/// passed the matcher's threshold.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub matches: Option<Vec<WireMatch>>,
    #[serde(default, rename = "keypointIds")]
    pub keypoint_ids: Option<Vec<KeypointId>>,
}

impl SearchResponse {
    pub fn into_matches(self) -> Vec<Match> {
        match (self.matches, self.keypoint_ids) {
            (Some(matches), _) => matches
                .into_iter()
                .map(|m| Match::new(m.id, m.score))
                .collect(),
            (None, Some(ids)) => ids.into_iter().map(|id| Match::new(id, 0.0)).collect(),
            (None, None) => Vec::new(),
        }
    }
}

/// Decode a response body, reporting malformed JSON as a matcher failure.
pub(crate) fn decode<T: for<'de> Deserialize<'de>>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::Matcher(format!("Failed to parse {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_response_numeric_ids() {
        let resp: ProcessResponse = decode(r#"{"keypointId": 42, "treeId": 7}"#, "register").unwrap();
        let reg = resp.into_registration().unwrap();
        assert_eq!(reg.keypoint_id.as_str(), "42");
        assert_eq!(reg.tree_id, Some(TreeId::new("7")));
    }

    #[test]
    fn test_process_response_null_and_missing_tree() {
        let reg = decode::<ProcessResponse>(r#"{"keypointId": "kp-1", "treeId": null}"#, "register")
            .unwrap()
            .into_registration()
            .unwrap();
        assert!(reg.tree_id.is_none());

        let reg = decode::<ProcessResponse>(r#"{"keypointId": "kp-1"}"#, "register")
            .unwrap()
            .into_registration()
            .unwrap();
        assert!(reg.tree_id.is_none());

        let reg = decode::<ProcessResponse>(r#"{"keypointId": "kp-1", "treeId": ""}"#, "register")
            .unwrap()
            .into_registration()
            .unwrap();
        assert!(reg.tree_id.is_none());
    }

    #[test]
    fn test_process_response_without_keypoint_is_error() {
        let err = decode::<ProcessResponse>(r#"{"treeId": "t"}"#, "register")
            .unwrap()
            .into_registration()
            .unwrap_err();
        assert!(matches!(err, Error::Matcher(_)));
    }

    #[test]
    fn test_search_request_serializes_tree_ids_as_strings() {
        let body = serde_json::to_value(SearchRequest {
            filename: "q.jpg",
            tree_ids: vec!["1", "t-2"],
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"filename": "q.jpg", "tree_ids": ["1", "t-2"]})
        );
    }

    #[test]
    fn test_search_response_matches_keep_order() {
        let matches = decode::<SearchResponse>(
            r#"{"matches": [{"id": "b", "score": 0.4}, {"id": 3, "score": 0.9}]}"#,
            "search",
        )
        .unwrap()
        .into_matches();
        assert_eq!(matches, vec![Match::new("b", 0.4), Match::new("3", 0.9)]);
    }

    #[test]
    fn test_search_response_legacy_keypoint_ids() {
        let matches = decode::<SearchResponse>(r#"{"keypointIds": [5, "x"]}"#, "search")
            .unwrap()
            .into_matches();
        assert_eq!(matches, vec![Match::new("5", 0.0), Match::new("x", 0.0)]);
    }

    #[test]
    fn test_search_response_without_list_is_no_match() {
        for body in ["{}", r#"{"matches": null}"#, r#"{"keypointIds": null}"#] {
            let matches = decode::<SearchResponse>(body, "search")
                .unwrap()
                .into_matches();
            assert!(matches.is_empty(), "{}", body);
        }
    }

    #[test]
    fn test_search_response_non_object_is_error() {
        for body in ["null", "\"ok\"", r#"{"matches": "none"}"#] {
            let err = decode::<SearchResponse>(body, "search").unwrap_err();
            assert!(matches!(err, Error::Matcher(_)), "{}", body);
        }
    }

    #[test]
    fn test_decode_garbage_is_matcher_error() {
        let err = decode::<SearchResponse>("<html>", "search").unwrap_err();
        assert!(err.to_string().contains("Failed to parse search response"));
    }
}
