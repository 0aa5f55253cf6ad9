//! Query engine of the in-memory client
//!
//! Matching, sorting, projection and update application over [`Document`]s. Only the
//! subset of the query language the client's operations need is understood; anything
//! else fails with an operation failure rather than silently matching.

use crate::error::{MongodogError, Result};
use crate::value::{Document, Value};
use std::cmp::Ordering;

/// A resolved read: filter, projection, window and ordering
#[derive(Debug, Clone, Default)]
pub(crate) struct Query {
    pub spec: Document,
    pub fields: Value,
    pub skip: i64,
    pub limit: i64,
    pub ordering: Option<Document>,
}

impl Query {
    pub fn run(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut matched = Vec::new();
        for doc in documents {
            if matches(doc, &self.spec)? {
                matched.push(doc.clone());
            }
        }

        if let Some(ordering) = &self.ordering {
            sort_documents(&mut matched, ordering);
        }

        let skip = self.skip.max(0) as usize;
        let limit = match self.limit.unsigned_abs() as usize {
            0 => usize::MAX,
            n => n,
        };

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(&doc, &self.fields))
            .collect()
    }
}

/// Turn a `spec_or_id` argument into a filter document: null matches everything,
/// a non-document value matches by `_id`
pub(crate) fn spec_from(spec_or_id: &Value) -> Document {
    match spec_or_id {
        Value::Null => Document::new(),
        Value::Document(doc) => doc.clone(),
        other => {
            let mut spec = Document::new();
            spec.insert("_id", other.clone());
            spec
        }
    }
}

/// Accepts a document, a list of `[key, direction]` pairs, a list of keys or a single key
pub(crate) fn ordering_from(sort: &Value) -> Result<Option<Document>> {
    match sort {
        Value::Null => Ok(None),
        Value::Document(doc) => Ok(Some(doc.clone())),
        Value::String(key) => {
            let mut ordering = Document::new();
            ordering.insert(key.as_str(), 1);
            Ok(Some(ordering))
        }
        Value::Array(items) => {
            let mut ordering = Document::new();
            for item in items {
                match item {
                    Value::String(key) => {
                        ordering.insert(key.as_str(), 1);
                    }
                    Value::Array(pair) if pair.len() == 2 => {
                        let key = pair[0].as_str().ok_or_else(|| invalid_sort(sort))?;
                        ordering.insert(key, pair[1].clone());
                    }
                    _ => return Err(invalid_sort(sort)),
                }
            }
            Ok(Some(ordering))
        }
        _ => Err(invalid_sort(sort)),
    }
}

fn invalid_sort(sort: &Value) -> MongodogError {
    MongodogError::OperationFailure(format!("invalid sort specification: {}", sort))
}

pub(crate) fn matches(doc: &Document, spec: &Document) -> Result<bool> {
    for (key, condition) in spec.iter() {
        let matched = match key {
            "$and" => all_of(doc, condition)?.iter().all(|m| *m),
            "$or" => all_of(doc, condition)?.iter().any(|m| *m),
            "$nor" => !all_of(doc, condition)?.iter().any(|m| *m),
            _ => match_field(doc.get_path(key), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_of(doc: &Document, clauses: &Value) -> Result<Vec<bool>> {
    let clauses = clauses
        .as_array()
        .ok_or_else(|| MongodogError::OperationFailure("$and/$or/$nor expect an array".to_string()))?;
    clauses
        .iter()
        .map(|clause| match clause {
            Value::Document(spec) => matches(doc, spec),
            other => Err(MongodogError::OperationFailure(format!(
                "expected a query document, got {}",
                other
            ))),
        })
        .collect()
}

fn is_operator_document(condition: &Value) -> bool {
    match condition {
        Value::Document(doc) => !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn match_field(value: Option<&Value>, condition: &Value) -> Result<bool> {
    let operators = match condition {
        Value::Document(doc) if is_operator_document(condition) => doc,
        _ => return Ok(equals(value, condition)),
    };

    for (operator, operand) in operators.iter() {
        let matched = match operator {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => in_list(value, operand)?,
            "$nin" => !in_list(value, operand)?,
            "$exists" => value.is_some() == operand.is_truthy(),
            other => {
                return Err(MongodogError::OperationFailure(format!("unknown operator: {}", other)));
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(actual) if actual == expected => true,
        Some(Value::Array(items)) => items.contains(expected),
        Some(_) => false,
    }
}

fn compares(value: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |candidate: &Value| {
        type_rank(candidate) == type_rank(operand) && accept(compare_values(candidate, operand))
    };
    match value {
        None => false,
        Some(Value::Array(items)) => items.iter().any(check),
        Some(candidate) => check(candidate),
    }
}

fn in_list(value: Option<&Value>, operand: &Value) -> Result<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| MongodogError::OperationFailure("$in/$nin expect an array".to_string()))?;
    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::String(_) => 2,
        Value::Document(_) => 3,
        Value::Array(_) => 4,
        Value::Binary(_) => 5,
        Value::ObjectId(_) => 6,
        Value::Bool(_) => 7,
    }
}

/// Total order across value types, numbers compared numerically
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::ObjectId(x), Value::ObjectId(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Document(x), Value::Document(y)) => x.to_string().cmp(&y.to_string()),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

pub(crate) fn sort_documents(documents: &mut [Document], ordering: &Document) {
    documents.sort_by(|a, b| {
        for (key, direction) in ordering.iter() {
            let left = a.get_path(key).unwrap_or(&Value::Null);
            let right = b.get_path(key).unwrap_or(&Value::Null);
            let mut order = compare_values(left, right);
            if direction.as_f64().is_some_and(|d| d < 0.0) {
                order = order.reverse();
            }
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    });
}

/// Apply a field selection: null keeps everything, a list of names or a document of
/// truthy flags includes (plus `_id` unless excluded), a document of falsy flags excludes
pub(crate) fn project(doc: &Document, fields: &Value) -> Result<Document> {
    let selection: Document = match fields {
        Value::Null => return Ok(doc.clone()),
        Value::Array(names) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(|n| (n.to_string(), Value::Int(1)))
                    .ok_or_else(|| MongodogError::OperationFailure(format!("invalid field name: {}", name)))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .collect(),
        Value::Document(selection) => selection.clone(),
        other => {
            return Err(MongodogError::OperationFailure(format!("invalid fields: {}", other)));
        }
    };

    let inclusive = selection.iter().any(|(k, v)| k != "_id" && v.is_truthy());
    let mut projected = Document::new();

    if inclusive {
        let keep_id = selection.get("_id").map_or(true, Value::is_truthy);
        for (key, value) in doc.iter() {
            let included = if key == "_id" {
                keep_id
            } else {
                selection.get(key).is_some_and(Value::is_truthy)
            };
            if included {
                projected.insert(key, value.clone());
            }
        }
    } else {
        for (key, value) in doc.iter() {
            if selection.get(key).map_or(true, Value::is_truthy) {
                projected.insert(key, value.clone());
            }
        }
    }

    Ok(projected)
}

pub(crate) fn is_operator_update(update: &Document) -> bool {
    update.keys().any(|k| k.starts_with('$'))
}

/// Apply an update document in place: `$set`, `$unset`, `$inc` and `$push`, or a
/// whole-document replacement that keeps `_id`
pub(crate) fn apply_update(doc: &mut Document, update: &Document) -> Result<()> {
    if !is_operator_update(update) {
        let id = doc.get("_id").cloned();
        let mut replacement = Document::new();
        if let Some(id) = id {
            replacement.insert("_id", id);
        }
        for (key, value) in update.iter() {
            if key != "_id" {
                replacement.insert(key, value.clone());
            }
        }
        *doc = replacement;
        return Ok(());
    }

    if update.keys().any(|k| !k.starts_with('$')) {
        return Err(MongodogError::OperationFailure(
            "cannot mix update operators and plain fields".to_string(),
        ));
    }

    for (operator, fields) in update.iter() {
        let fields = fields.as_document().ok_or_else(|| {
            MongodogError::OperationFailure(format!("{} expects a document", operator))
        })?;
        for (path, operand) in fields.iter() {
            match operator {
                "$set" => set_path(doc, path, operand.clone())?,
                "$unset" => remove_path(doc, path),
                "$inc" => {
                    let current = doc.get_path(path).cloned().unwrap_or(Value::Int(0));
                    set_path(doc, path, add_numbers(&current, operand)?)?;
                }
                "$push" => {
                    let mut items = match doc.get_path(path) {
                        None => Vec::new(),
                        Some(Value::Array(items)) => items.clone(),
                        Some(other) => {
                            return Err(MongodogError::OperationFailure(format!(
                                "cannot $push to non-array field {}: {}",
                                path, other
                            )));
                        }
                    };
                    items.push(operand.clone());
                    set_path(doc, path, Value::Array(items))?;
                }
                other => {
                    return Err(MongodogError::OperationFailure(format!(
                        "unknown update operator: {}",
                        other
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Seed document for an upsert: the plain equality fields of the filter
pub(crate) fn upsert_seed(spec: &Document) -> Document {
    spec.iter()
        .filter(|(key, condition)| !key.starts_with('$') && !is_operator_document(condition))
        .map(|(key, condition)| (key.to_string(), condition.clone()))
        .collect()
}

pub(crate) fn add_numbers(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(match a.checked_add(*b) {
            Some(sum) => Value::Int(sum),
            None => Value::Float(*a as f64 + *b as f64),
        }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(MongodogError::OperationFailure(format!(
                "cannot add {} and {}",
                left, right
            ))),
        },
    }
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head).and_then(Value::as_document_mut) {
                Some(child) => set_path(child, rest, value),
                None => Err(MongodogError::OperationFailure(format!(
                    "cannot set {} inside a non-document field",
                    path
                ))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = doc.get_mut(head).and_then(Value::as_document_mut) {
                remove_path(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn sample() -> Vec<Document> {
        (0..10).map(|x| doc! { "a" => x % 2, "b" => x }).collect()
    }

    #[test]
    fn test_find_with_sort_skip_limit() {
        let query = Query {
            spec: doc! { "a" => 0 },
            skip: 1,
            limit: 2,
            ordering: Some(doc! { "b" => -1 }),
            ..Default::default()
        };

        let found = query.run(&sample()).unwrap();
        let bs: Vec<_> = found.iter().map(|d| d.get("b").cloned().unwrap()).collect();
        assert_eq!(bs, vec![Value::Int(6), Value::Int(4)]);
    }

    #[test]
    fn test_comparison_operators() {
        let doc = doc! { "b" => 3, "tags" => vec!["x", "y"] };

        assert!(matches(&doc, &doc! { "b" => doc! { "$gt" => 2, "$lt" => 5 } }).unwrap());
        assert!(!matches(&doc, &doc! { "b" => doc! { "$gte" => 4 } }).unwrap());
        assert!(matches(&doc, &doc! { "b" => doc! { "$in" => vec![1, 3] } }).unwrap());
        assert!(matches(&doc, &doc! { "tags" => "y" }).unwrap());
        assert!(matches(&doc, &doc! { "c" => doc! { "$exists" => false } }).unwrap());
        assert!(!matches(&doc, &doc! { "b" => doc! { "$ne" => 3 } }).unwrap());
    }

    #[test]
    fn test_or_clause() {
        let doc = doc! { "b" => 3 };
        let spec = doc! { "$or" => vec![doc! { "b" => 1 }, doc! { "b" => 3 }] };
        assert!(matches(&doc, &spec).unwrap());
    }

    #[test]
    fn test_unknown_operator_fails() {
        let err = matches(&doc! { "b" => 1 }, &doc! { "b" => doc! { "$where" => "x" } }).unwrap_err();
        assert!(err.to_string().contains("unknown operator: $where"));
    }

    #[test]
    fn test_range_operators_do_not_cross_types() {
        let doc = doc! { "b" => "3" };
        assert!(!matches(&doc, &doc! { "b" => doc! { "$gt" => 1 } }).unwrap());
    }

    #[test]
    fn test_ordering_from_pairs() {
        let sort = Value::from(vec![Value::from(vec![Value::from("b"), Value::Int(-1)])]);
        assert_eq!(ordering_from(&sort).unwrap(), Some(doc! { "b" => -1 }));
        assert_eq!(ordering_from(&Value::Null).unwrap(), None);
        assert!(ordering_from(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_projection_inclusion_and_exclusion() {
        let doc = doc! { "_id" => 1, "a" => 2, "b" => 3 };

        let included = project(&doc, &Value::from(doc! { "_id" => false, "a" => true })).unwrap();
        assert_eq!(included, doc! { "a" => 2 });

        let listed = project(&doc, &Value::from(vec!["b"])).unwrap();
        assert_eq!(listed, doc! { "_id" => 1, "b" => 3 });

        let excluded = project(&doc, &Value::from(doc! { "b" => 0 })).unwrap();
        assert_eq!(excluded, doc! { "_id" => 1, "a" => 2 });
    }

    #[test]
    fn test_operator_update() {
        let mut doc = doc! { "_id" => 1, "n" => 1, "gone" => true };
        let update = doc! {
            "$set" => doc! { "c" => "foo", "nested.x" => 1 },
            "$inc" => doc! { "n" => 2 },
            "$unset" => doc! { "gone" => "" },
            "$push" => doc! { "list" => 5 },
        };

        apply_update(&mut doc, &update).unwrap();
        assert_eq!(
            doc,
            doc! {
                "_id" => 1,
                "n" => 3,
                "c" => "foo",
                "nested" => doc! { "x" => 1 },
                "list" => vec![5],
            }
        );
    }

    #[test]
    fn test_replacement_update_keeps_id() {
        let mut doc = doc! { "_id" => 1, "a" => 1 };
        apply_update(&mut doc, &doc! { "b" => 2 }).unwrap();
        assert_eq!(doc, doc! { "_id" => 1, "b" => 2 });
    }

    #[test]
    fn test_mixed_update_rejected() {
        let mut doc = doc! { "_id" => 1 };
        let err = apply_update(&mut doc, &doc! { "$set" => doc! { "a" => 1 }, "b" => 2 }).unwrap_err();
        assert!(err.to_string().contains("cannot mix"));
    }

    #[test]
    fn test_upsert_seed_skips_operators() {
        let spec = doc! { "a" => 1, "b" => doc! { "$gt" => 1 } };
        assert_eq!(upsert_seed(&spec), doc! { "a" => 1 });
    }

    #[test]
    fn test_add_numbers_overflow_becomes_float() {
        assert_eq!(add_numbers(&Value::Int(2), &Value::Int(3)).unwrap(), Value::Int(5));

        let sum = add_numbers(&Value::Int(i64::MAX), &Value::Int(1)).unwrap();
        assert_eq!(sum, Value::Float(i64::MAX as f64 + 1.0));

        let sum = add_numbers(&Value::Int(i64::MIN), &Value::Int(-1)).unwrap();
        assert!(matches!(sum, Value::Float(f) if f < 0.0));
    }

    #[test]
    fn test_spec_from_id() {
        assert_eq!(spec_from(&Value::Int(7)), doc! { "_id" => 7 });
        assert!(spec_from(&Value::Null).is_empty());
    }
}
