use serde::Deserialize;

/// Query string of `GET /product`.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}
