//! Test fixtures for REST API testing.
//!
//! Films with a title, a year, a star rating and a completion input, and
//! the endpoint definitions used to search them.

use serde_json::{Map, Value, json};

/// A film record body, as sent to `POST /records/`.
#[derive(Debug, Clone)]
pub struct FilmFixture {
    /// Film title.
    pub title: &'static str,
    /// Release year.
    pub year: u32,
    /// Star rating.
    pub stars: u32,
    /// Owner user ids.
    pub owners: Vec<&'static str>,
}

impl FilmFixture {
    /// Creates a film owned by nobody.
    pub fn new(title: &'static str, year: u32, stars: u32) -> Self {
        Self {
            title,
            year,
            stars,
            owners: Vec::new(),
        }
    }

    /// Sets the owners.
    pub fn with_owners(mut self, owners: Vec<&'static str>) -> Self {
        self.owners = owners;
        self
    }

    /// Converts to the JSON body.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "title": self.title,
            "year": self.year,
            "stars": self.stars,
            "suggest_title": {"input": [self.title]},
        });
        if !self.owners.is_empty() {
            body["owners"] = json!(self.owners);
        }
        body
    }
}

/// The four films most tests search.
///
/// Created in this order they get the identifiers 1 to 4.
pub fn films() -> Vec<FilmFixture> {
    vec![
        FilmFixture::new("Back to the Future", 2015, 4),
        FilmFixture::new("Back to the Past", 2042, 3),
        FilmFixture::new("The Hitchhiker's Guide to the Galaxy", 1985, 4),
        FilmFixture::new("Unknown film", 4242, 5),
    ]
}

/// Search settings for the built-in `recid` endpoint.
pub fn film_search_settings() -> Value {
    json!({
        "sort_options": {
            "year": {"title": "Year", "fields": ["year"], "default_order": "desc", "order": 2},
            "title": {"title": "Title", "fields": ["title"], "order": 1},
        },
        "default_sort": {"noquery": "year"},
        "facets": {
            "aggs": {"stars": {"terms": {"field": "stars"}}},
            "filters": {"year": {"range": "year"}},
            "post_filters": {"stars": {"terms": "stars"}},
        },
        "suggesters": {
            "title": {"completion": {"field": "suggest_title", "size": 3}},
            "title_by_year": {"completion": {"field": "suggest_title", "context": "year"}},
        },
    })
}

/// The built-in endpoint definitions with `overrides` merged into `recid`.
pub fn recid_endpoint_with(overrides: Value) -> Map<String, Value> {
    let mut endpoints = pidrest_rest::default_endpoints();
    if let (Some(Value::Object(recid)), Value::Object(overrides)) =
        (endpoints.get_mut("recid"), overrides)
    {
        recid.extend(overrides);
    }
    endpoints
}
