//! Filter, sort and aggregation evaluation over JSON documents.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::error::SearchError;
use crate::types::{Aggregation, Filter, RangeBound, SortField};

/// Default number of buckets in a terms aggregation.
pub const DEFAULT_BUCKET_SIZE: usize = 10;

/// Returns every value reachable through a dotted path.
///
/// Arrays are flattened at each step, so `authors.name` yields the names
/// of every author.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(items.iter().filter_map(|v| v.get(segment))),
                _ => {}
            }
        }
        current = next;
    }

    let mut out = Vec::with_capacity(current.len());
    for value in current {
        match value {
            Value::Array(items) => out.extend(items.iter()),
            other => out.push(other),
        }
    }
    out
}

/// Text form of a scalar value. Objects, arrays and null have none.
pub fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Compares two scalar texts, numerically when both parse as numbers.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Rejects filters that cannot be evaluated.
pub fn validate_filter(filter: &Filter) -> Result<(), SearchError> {
    let field = match filter {
        Filter::Terms { field, .. } | Filter::Range { field, .. } => field,
    };
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(SearchError::InvalidFilter {
            field: field.clone(),
            message: "invalid field path".to_string(),
        });
    }
    if let Filter::Range {
        lower: None,
        upper: None,
        ..
    } = filter
    {
        return Err(SearchError::InvalidFilter {
            field: field.clone(),
            message: "range needs at least one bound".to_string(),
        });
    }
    Ok(())
}

/// Evaluates a filter against a document.
pub fn matches_filter(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Terms { field, values } => lookup(doc, field)
            .into_iter()
            .filter_map(leaf_text)
            .any(|text| values.iter().any(|v| *v == text)),
        Filter::Range {
            field,
            lower,
            upper,
        } => lookup(doc, field)
            .into_iter()
            .filter_map(leaf_text)
            .any(|text| within(&text, lower.as_ref(), upper.as_ref())),
    }
}

fn within(text: &str, lower: Option<&RangeBound>, upper: Option<&RangeBound>) -> bool {
    let above = lower.is_none_or(|bound| match compare_text(text, &bound.value) {
        Ordering::Greater => true,
        Ordering::Equal => bound.inclusive,
        Ordering::Less => false,
    });
    let below = upper.is_none_or(|bound| match compare_text(text, &bound.value) {
        Ordering::Less => true,
        Ordering::Equal => bound.inclusive,
        Ordering::Greater => false,
    });
    above && below
}

/// Orders two documents by a list of sort criteria.
///
/// Documents missing a field sort last in either direction. `_score`
/// criteria are skipped, leaving ties in their natural order.
pub fn compare_documents(a: &Value, b: &Value, sort: &[SortField]) -> Ordering {
    for criterion in sort {
        if criterion.field == "_score" {
            continue;
        }
        let left = first_scalar(a, &criterion.field);
        let right = first_scalar(b, &criterion.field);
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = compare_values(x, y);
                if criterion.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn first_scalar<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(doc, path)
        .into_iter()
        .find(|v| leaf_text(v).is_some())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        // numbers before strings
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        _ => leaf_text(a).cmp(&leaf_text(b)),
    }
}

/// Computes an aggregation over a set of documents.
pub fn aggregate(docs: &[&Value], aggregation: &Aggregation) -> Value {
    match aggregation {
        Aggregation::Terms { field, size } => terms_buckets(docs, field, size.unwrap_or(DEFAULT_BUCKET_SIZE)),
    }
}

fn terms_buckets(docs: &[&Value], field: &str, size: usize) -> Value {
    let mut counts: HashMap<String, (Value, u64)> = HashMap::new();
    for doc in docs {
        let mut seen = Vec::new();
        for value in lookup(doc, field) {
            let Some(text) = leaf_text(value) else {
                continue;
            };
            if seen.contains(&text) {
                continue;
            }
            counts
                .entry(text.clone())
                .or_insert_with(|| (value.clone(), 0))
                .1 += 1;
            seen.push(text);
        }
    }

    let mut buckets: Vec<(String, Value, u64)> = counts
        .into_iter()
        .map(|(text, (key, count))| (text, key, count))
        .collect();
    buckets.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| compare_text(&a.0, &b.0)));

    let other: u64 = buckets.iter().skip(size).map(|b| b.2).sum();
    let buckets: Vec<Value> = buckets
        .into_iter()
        .take(size)
        .map(|(_, key, count)| json!({"key": key, "doc_count": count}))
        .collect();

    json!({
        "doc_count_error_upper_bound": 0,
        "sum_other_doc_count": other,
        "buckets": buckets,
    })
}

/// Returns completion inputs stored under `field`.
///
/// Accepts plain strings, arrays of strings, and `{"input": ...}` objects.
pub fn completion_inputs(doc: &Value, field: &str) -> Vec<String> {
    let mut inputs = Vec::new();
    for value in lookup(doc, field) {
        match value {
            Value::String(s) => inputs.push(s.clone()),
            Value::Object(map) => match map.get("input") {
                Some(Value::String(s)) => inputs.push(s.clone()),
                Some(Value::Array(items)) => {
                    inputs.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)))
                }
                _ => {}
            },
            _ => {}
        }
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn films() -> Vec<Value> {
        vec![
            json!({"title": "Back to the Future", "year": 2015, "stars": 4}),
            json!({"title": "Back to the Past", "year": 2042, "stars": 3}),
            json!({"title": "The Hitchhiker's Guide to the Galaxy", "year": 1985, "stars": 4}),
            json!({"title": "Unknown film", "year": 4242, "stars": 5}),
        ]
    }

    #[test]
    fn test_lookup_flattens_arrays() {
        let doc = json!({"authors": [{"name": "Ada"}, {"name": "Grace"}], "tags": ["a", "b"]});
        assert_eq!(lookup(&doc, "authors.name").len(), 2);
        assert_eq!(lookup(&doc, "tags").len(), 2);
        assert!(lookup(&doc, "missing.path").is_empty());
    }

    #[test]
    fn test_range_filter_bounds() {
        let docs = films();
        let filter = Filter::Range {
            field: "year".to_string(),
            lower: Some(RangeBound::inclusive("2015")),
            upper: Some(RangeBound::exclusive("4242")),
        };
        let matched: Vec<_> = docs.iter().filter(|d| matches_filter(d, &filter)).collect();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_terms_filter() {
        let filter = Filter::Terms {
            field: "stars".to_string(),
            values: vec!["4".to_string()],
        };
        assert_eq!(films().iter().filter(|d| matches_filter(d, &filter)).count(), 2);
    }

    #[test]
    fn test_sort_with_missing_values_last() {
        let mut docs = films();
        docs.push(json!({"title": "No year"}));
        let sort = [SortField::parse("-year")];
        docs.sort_by(|a, b| compare_documents(a, b, &sort));
        assert_eq!(docs[0]["year"], 4242);
        assert_eq!(docs[3]["year"], 1985);
        assert_eq!(docs[4]["title"], "No year");
    }

    #[test]
    fn test_terms_aggregation_ordering() {
        let docs = films();
        let refs: Vec<&Value> = docs.iter().collect();
        let result = aggregate(
            &refs,
            &Aggregation::Terms {
                field: "stars".to_string(),
                size: Some(2),
            },
        );
        assert_eq!(result["buckets"][0], json!({"key": 4, "doc_count": 2}));
        assert_eq!(result["buckets"][1], json!({"key": 3, "doc_count": 1}));
        assert_eq!(result["sum_other_doc_count"], 1);
    }

    #[test]
    fn test_validate_filter() {
        let empty_range = Filter::Range {
            field: "year".to_string(),
            lower: None,
            upper: None,
        };
        assert!(validate_filter(&empty_range).is_err());
        let bad_path = Filter::Terms {
            field: "a..b".to_string(),
            values: vec![],
        };
        assert!(validate_filter(&bad_path).is_err());
    }

    #[test]
    fn test_completion_inputs() {
        let doc = json!({"suggest": {"input": ["Back to the Future", "BTTF"]}, "alt": "Future"});
        assert_eq!(completion_inputs(&doc, "suggest").len(), 2);
        assert_eq!(completion_inputs(&doc, "alt"), vec!["Future".to_string()]);
    }
}
