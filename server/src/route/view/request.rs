use serde::Deserialize;

/// Optional exact-match filters for the history view.
#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub status: Option<String>,
    pub date: Option<String>,
}
