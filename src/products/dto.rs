use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "crate::dashboard::queries::default_popular_count")]
    pub count: i64,
}
