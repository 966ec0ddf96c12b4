use serde::{Deserialize, Serialize};

use crate::catalog::Row;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Row>,
}

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    #[serde(rename = "doriNomi")]
    pub dori_nomi: String,
}

#[derive(Debug, Serialize)]
pub struct Banner {
    pub message: &'static str,
}
