//! Original implementations of the client's interceptable operations
//!
//! Each function here is what a [`DispatchTable`] runs for an operation when nothing has
//! been patched over it. They all have the same shape: check the receiver, bind the
//! call's arguments against the operation's published signature, then act on the store.

use super::operations::*;
use super::query::{
    add_numbers, apply_update, compare_values, is_operator_update, matches, ordering_from, project,
    sort_documents, spec_from, upsert_seed, Query,
};
use super::{Collection, Cursor, Database};
use crate::dispatch::{BoundArgs, DispatchTable, Invocation, Method, Reply};
use crate::doc;
use crate::error::{MongodogError, Result};
use crate::value::{Document, ObjectId, Value};
use std::cmp::Ordering;
use std::sync::Arc;

type Original = fn(&Invocation) -> Result<Reply>;

const ORIGINALS: &[(Operation, Original)] = &[
    (DATABASE_COMMAND, command),
    (COLLECTION_AGGREGATE, aggregate),
    (COLLECTION_COUNT, count),
    (COLLECTION_DISTINCT, distinct),
    (COLLECTION_FIND, find),
    (COLLECTION_FIND_AND_MODIFY, find_and_modify),
    (COLLECTION_FIND_ONE, find_one),
    (COLLECTION_GROUP, group),
    (COLLECTION_INLINE_MAP_REDUCE, inline_map_reduce),
    (COLLECTION_INSERT, insert),
    (COLLECTION_MAP_REDUCE, map_reduce),
    (COLLECTION_REMOVE, remove),
    (COLLECTION_SAVE, save),
    (COLLECTION_UPDATE, update),
    (CURSOR_ITER, cursor_iter),
];

/// Bind the built-in method of every operation that has no binding yet
pub(crate) fn register_methods(table: &DispatchTable) {
    for (operation, original) in ORIGINALS {
        let original = *original;
        table.bind_if_absent(operation.path, || -> Method { Arc::new(original) });
    }

    #[cfg(feature = "odm")]
    crate::odm::register_methods(table);
}

fn bind(operation: &Operation, invocation: &Invocation) -> Result<BoundArgs> {
    operation.signature.bind(&invocation.args, &invocation.kwargs)
}

fn failure(message: impl Into<String>) -> MongodogError {
    MongodogError::OperationFailure(message.into())
}

fn require_document<'a>(method: &str, name: &str, value: &'a Value) -> Result<&'a Document> {
    value.as_document().ok_or_else(|| {
        MongodogError::invalid_arguments(method, format!("{} must be a document, got {}", name, value))
    })
}

fn ok(mut reply: Document) -> Reply {
    reply.insert("ok", 1);
    Reply::Value(reply.into())
}

// Commands

fn command(invocation: &Invocation) -> Result<Reply> {
    let database = invocation.receiver.as_database("command")?;
    let bound = bind(&DATABASE_COMMAND, invocation)?;

    let (name, argument, mut options) = match bound.get("command") {
        Value::String(name) => (name.clone(), bound.get("value").clone(), Document::new()),
        Value::Document(doc) => {
            let mut entries = doc.iter();
            let (name, argument) = entries
                .next()
                .ok_or_else(|| failure("command document is empty"))?;
            let options: Document = entries.map(|(k, v)| (k.to_string(), v.clone())).collect();
            (name.to_string(), argument.clone(), options)
        }
        other => {
            return Err(MongodogError::invalid_arguments(
                "command",
                format!("command must be a string or a document, got {}", other),
            ));
        }
    };
    options.extend(bound.extra().clone());

    match run_command(database, &name, &argument, &options) {
        Ok(reply) => Ok(Reply::Value(reply)),
        Err(MongodogError::OperationFailure(message))
            if !bound.get("check").is_truthy() || allowed(&bound, &message) =>
        {
            Ok(Reply::Value(doc! { "ok" => 0, "errmsg" => message }.into()))
        }
        Err(err) => Err(err),
    }
}

fn allowed(bound: &BoundArgs, message: &str) -> bool {
    bound
        .get("allowable_errors")
        .as_array()
        .is_some_and(|errors| errors.iter().any(|e| e.as_str() == Some(message)))
}

fn run_command(database: &Database, name: &str, argument: &Value, options: &Document) -> Result<Value> {
    match name.to_ascii_lowercase().as_str() {
        "ping" => Ok(doc! { "ok" => 1 }.into()),
        "buildinfo" => Ok(doc! { "version" => env!("CARGO_PKG_VERSION"), "ok" => 1 }.into()),
        "count" => {
            let collection = database.collection(command_target(name, argument)?);
            let spec = spec_from(options.get("query").unwrap_or(&Value::Null));
            let query = Query {
                spec,
                ..Default::default()
            };
            let n = collection.read(|docs| Ok(query.run(docs)?.len()))?;
            Ok(doc! { "n" => n, "ok" => 1 }.into())
        }
        "drop" => {
            let target = command_target(name, argument)?;
            let dropped = database
                .client()
                .with_store(|store| Ok(store.drop_collection(database.name(), target)))?;
            if !dropped {
                return Err(failure("ns not found"));
            }
            Ok(doc! { "ns" => format!("{}.{}", database.name(), target), "ok" => 1 }.into())
        }
        "dropdatabase" => {
            database
                .client()
                .with_store(|store| Ok(store.drop_database(database.name())))?;
            Ok(doc! { "dropped" => database.name(), "ok" => 1 }.into())
        }
        _ => Err(failure(format!("no such cmd: {}", name))),
    }
}

fn command_target<'a>(name: &str, argument: &'a Value) -> Result<&'a str> {
    argument
        .as_str()
        .ok_or_else(|| failure(format!("{} expects a collection name, got {}", name, argument)))
}

// Writes

fn with_id(doc: Document) -> (Document, Value) {
    if let Some(id) = doc.get("_id") {
        let id = id.clone();
        return (doc, id);
    }
    let id = Value::from(ObjectId::new());
    let mut stored = Document::new();
    stored.insert("_id", id.clone());
    stored.extend(doc);
    (stored, id)
}

fn duplicate_key(collection: &Collection, id: &Value) -> MongodogError {
    failure(format!(
        "E11000 duplicate key error index: {}.$_id_ dup key: {{ : {} }}",
        collection.full_name(),
        id
    ))
}

fn contains_id(documents: &[Document], id: &Value) -> bool {
    documents.iter().any(|doc| doc.get("_id") == Some(id))
}

fn insert(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("insert")?;
    let bound = bind(&COLLECTION_INSERT, invocation)?;

    let (docs, single) = match bound.get("doc_or_docs") {
        Value::Document(doc) => (vec![doc.clone()], true),
        Value::Array(items) => {
            let docs = items
                .iter()
                .map(|item| require_document("insert", "doc_or_docs", item).cloned())
                .collect::<Result<Vec<_>>>()?;
            (docs, false)
        }
        other => {
            return Err(MongodogError::invalid_arguments(
                "insert",
                format!("doc_or_docs must be a document or a list of documents, got {}", other),
            ));
        }
    };
    if docs.is_empty() {
        return Err(failure("cannot do an empty bulk insert"));
    }
    let continue_on_error = bound.get("continue_on_error").is_truthy();

    collection.write(|stored| {
        let mut ids = Vec::with_capacity(docs.len());
        let mut first_error = None;

        for doc in docs {
            let (doc, id) = with_id(doc);
            if contains_id(stored, &id) {
                let err = duplicate_key(collection, &id);
                if !continue_on_error {
                    return Err(err);
                }
                first_error.get_or_insert(err);
                continue;
            }
            stored.push(doc);
            ids.push(id);
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        Ok(if single {
            Reply::Value(ids.into_iter().next().unwrap_or_default())
        } else {
            Reply::Value(Value::Array(ids))
        })
    })
}

fn save(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("save")?;
    let bound = bind(&COLLECTION_SAVE, invocation)?;
    let (doc, id) = with_id(require_document("save", "to_save", bound.get("to_save"))?.clone());

    collection.write(|stored| {
        match stored.iter_mut().find(|existing| existing.get("_id") == Some(&id)) {
            Some(existing) => *existing = doc,
            None => stored.push(doc),
        }
        Ok(Reply::Value(id))
    })
}

fn update(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("update")?;
    let bound = bind(&COLLECTION_UPDATE, invocation)?;
    let spec = require_document("update", "spec", bound.get("spec"))?.clone();
    let document = require_document("update", "document", bound.get("document"))?.clone();
    let upsert = bound.get("upsert").is_truthy();
    let multi = bound.get("multi").is_truthy();

    if multi && !is_operator_update(&document) {
        return Err(failure("multi update only works with $ operators"));
    }

    collection.write(|stored| {
        let mut n = 0;
        for doc in stored.iter_mut() {
            if matches(doc, &spec)? {
                apply_update(doc, &document)?;
                n += 1;
                if !multi {
                    break;
                }
            }
        }

        if n == 0 && upsert {
            let (seeded, id) = with_id(upserted(&spec, &document)?);
            stored.push(seeded);
            return Ok(ok(doc! { "n" => 1, "updatedExisting" => false, "upserted" => id }));
        }
        Ok(ok(doc! { "n" => n, "updatedExisting" => n > 0 }))
    })
}

/// Document created by an upsert that matched nothing
fn upserted(spec: &Document, update: &Document) -> Result<Document> {
    if !is_operator_update(update) {
        return Ok(update.clone());
    }
    let mut seeded = upsert_seed(spec);
    apply_update(&mut seeded, update)?;
    Ok(seeded)
}

fn remove(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("remove")?;
    let bound = bind(&COLLECTION_REMOVE, invocation)?;
    let spec = spec_from(bound.get("spec_or_id"));

    collection.write(|stored| {
        let matched = stored
            .iter()
            .map(|doc| matches(doc, &spec))
            .collect::<Result<Vec<_>>>()?;
        let n = matched.iter().filter(|m| **m).count();

        let mut matched = matched.into_iter();
        stored.retain(|_| !matched.next().unwrap_or(false));
        Ok(ok(doc! { "n" => n }))
    })
}

fn find_and_modify(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("find_and_modify")?;
    let bound = bind(&COLLECTION_FIND_AND_MODIFY, invocation)?;
    let extra = bound.extra();
    let remove = extra.get("remove").is_some_and(Value::is_truthy);
    let return_new = extra.get("new").is_some_and(Value::is_truthy);
    let upsert = bound.get("upsert").is_truthy();

    let update = match bound.get("update") {
        Value::Null if remove => None,
        Value::Null => return Err(failure("must specify remove or update")),
        other => Some(require_document("find_and_modify", "update", other)?.clone()),
    };
    if remove && (update.is_some() || return_new) {
        return Err(failure("remove cannot be combined with update or new"));
    }

    let query = Query {
        spec: spec_from(bound.get("query")),
        limit: 1,
        ordering: ordering_from(bound.get("sort"))?,
        ..Default::default()
    };
    let fields = extra.get("fields").cloned().unwrap_or_default();

    let value = collection.write(|stored| {
        let target = query.run(stored)?.into_iter().next();
        let index = target
            .as_ref()
            .and_then(|doc| stored.iter().position(|d| d.get("_id") == doc.get("_id")));

        let result = match (index, &update) {
            (Some(index), _) if remove => Some(stored.remove(index)),
            (Some(index), Some(update)) => {
                let before = stored[index].clone();
                apply_update(&mut stored[index], update)?;
                Some(if return_new { stored[index].clone() } else { before })
            }
            (None, Some(update)) if upsert => {
                let (seeded, _) = with_id(upserted(&query.spec, update)?);
                stored.push(seeded.clone());
                return_new.then_some(seeded)
            }
            _ => None,
        };

        result.map(|doc| project(&doc, &fields)).transpose()
    })?;

    if bound.get("full_response").is_truthy() {
        return Ok(ok(doc! { "value" => value }));
    }
    Ok(Reply::Value(value.into()))
}

// Reads

fn find(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("find")?;
    let bound = bind(&COLLECTION_FIND, invocation)?;
    Ok(Reply::Cursor(Cursor::from_find(collection.clone(), &bound)?))
}

fn find_one(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("find_one")?;
    let bound = bind(&COLLECTION_FIND_ONE, invocation)?;

    let query = Query {
        spec: spec_from(bound.get("spec_or_id")),
        fields: bound.get("fields").clone(),
        skip: bound.get("skip").as_i64().unwrap_or(0),
        limit: 1,
        ordering: ordering_from(bound.get("sort"))?,
    };
    let found = collection.read(|docs| query.run(docs))?;
    Ok(Reply::Value(found.into_iter().next().into()))
}

fn count(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("count")?;
    bind(&COLLECTION_COUNT, invocation)?;
    let n = collection.read(|docs| Ok(docs.len()))?;
    Ok(Reply::Value(n.into()))
}

fn distinct(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("distinct")?;
    let bound = bind(&COLLECTION_DISTINCT, invocation)?;
    let key = bound
        .get("key")
        .as_str()
        .ok_or_else(|| MongodogError::invalid_arguments("distinct", "key must be a string"))?;

    let values = collection.read(|docs| {
        let mut values: Vec<Value> = Vec::new();
        let mut push = |value: &Value| {
            if !values.contains(value) {
                values.push(value.clone());
            }
        };
        for doc in docs {
            match doc.get_path(key) {
                Some(Value::Array(items)) => items.iter().for_each(&mut push),
                Some(value) => push(value),
                None => {}
            }
        }
        Ok(values)
    })?;
    Ok(Reply::Value(Value::Array(values)))
}

fn cursor_iter(invocation: &Invocation) -> Result<Reply> {
    let cursor = invocation.receiver.as_cursor("iter")?;
    bind(&CURSOR_ITER, invocation)?;
    let query = cursor.query();
    let docs = cursor.collection().read(|docs| query.run(docs))?;
    Ok(Reply::Value(docs.into()))
}

// Aggregation

fn aggregate(invocation: &Invocation) -> Result<Reply> {
    let collection = invocation.receiver.as_collection("aggregate")?;
    let bound = bind(&COLLECTION_AGGREGATE, invocation)?;

    let stages = match bound.get("pipeline") {
        Value::Array(stages) => stages
            .iter()
            .map(|stage| require_document("aggregate", "pipeline stage", stage))
            .collect::<Result<Vec<_>>>()?,
        stage @ Value::Document(_) => vec![require_document("aggregate", "pipeline", stage)?],
        other => {
            return Err(MongodogError::invalid_arguments(
                "aggregate",
                format!("pipeline must be a list of stages, got {}", other),
            ));
        }
    };

    let mut docs = collection.read(|docs| Ok(docs.to_vec()))?;
    for stage in stages {
        docs = run_stage(docs, stage)?;
    }
    Ok(ok(doc! { "result" => docs }))
}

fn run_stage(mut docs: Vec<Document>, stage: &Document) -> Result<Vec<Document>> {
    let mut entries = stage.iter();
    let (operator, operand) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(failure(format!("a pipeline stage must have exactly one field: {}", stage))),
    };

    match operator {
        "$match" => {
            let spec = require_document("aggregate", "$match", operand)?;
            let mut kept = Vec::new();
            for doc in docs {
                if matches(&doc, spec)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }
        "$sort" => {
            sort_documents(&mut docs, require_document("aggregate", "$sort", operand)?);
            Ok(docs)
        }
        "$skip" => {
            let n = stage_count(operator, operand)?;
            Ok(docs.into_iter().skip(n).collect())
        }
        "$limit" => {
            let n = stage_count(operator, operand)?;
            Ok(docs.into_iter().take(n).collect())
        }
        "$project" => docs.iter().map(|doc| project(doc, operand)).collect(),
        "$group" => group_stage(&docs, require_document("aggregate", "$group", operand)?),
        other => Err(failure(format!("unrecognized pipeline stage name: '{}'", other))),
    }
}

fn stage_count(operator: &str, operand: &Value) -> Result<usize> {
    operand
        .as_i64()
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .ok_or_else(|| failure(format!("{} expects a non-negative integer, got {}", operator, operand)))
}

/// `"$field"` reads a field of the input document; anything else is a literal
fn evaluate(doc: &Document, expression: &Value) -> Value {
    match expression.as_str().and_then(|s| s.strip_prefix('$')) {
        Some(path) => doc.get_path(path).cloned().unwrap_or_default(),
        None => expression.clone(),
    }
}

fn group_stage(docs: &[Document], spec: &Document) -> Result<Vec<Document>> {
    let key = spec
        .get("_id")
        .ok_or_else(|| failure("a group specification must include an _id"))?;

    let mut groups: Vec<(Value, Document)> = Vec::new();
    for doc in docs {
        let id = evaluate(doc, key);
        let index = match groups.iter().position(|(existing, _)| *existing == id) {
            Some(index) => index,
            None => {
                let mut output = Document::new();
                output.insert("_id", id.clone());
                groups.push((id, output));
                groups.len() - 1
            }
        };
        let output = &mut groups[index].1;

        for (field, accumulator) in spec.iter().filter(|(field, _)| *field != "_id") {
            let accumulator = require_document("aggregate", field, accumulator)?;
            let (operator, expression) = accumulator
                .iter()
                .next()
                .ok_or_else(|| failure(format!("empty accumulator for {}", field)))?;
            let value = evaluate(doc, expression);
            let current = output.get(field).cloned();
            let next = accumulate(operator, current, value)?;
            output.insert(field, next);
        }
    }

    Ok(groups.into_iter().map(|(_, output)| output).collect())
}

fn accumulate(operator: &str, current: Option<Value>, value: Value) -> Result<Value> {
    Ok(match (operator, current) {
        ("$sum", total) => sum(total.unwrap_or(Value::Int(0)), &value)?,
        ("$min", None) | ("$max", None) | ("$first", None) => value,
        ("$min", Some(current)) => pick(current, value, Ordering::Less),
        ("$max", Some(current)) => pick(current, value, Ordering::Greater),
        ("$first", Some(current)) => current,
        ("$push", None) => Value::Array(vec![value]),
        ("$push", Some(Value::Array(mut items))) => {
            items.push(value);
            Value::Array(items)
        }
        (other, _) => return Err(failure(format!("unknown group operator '{}'", other))),
    })
}

fn pick(current: Value, candidate: Value, wanted: Ordering) -> Value {
    if compare_values(&candidate, &current) == wanted {
        candidate
    } else {
        current
    }
}

/// `$sum` ignores non-numeric inputs
fn sum(total: Value, value: &Value) -> Result<Value> {
    match value {
        Value::Int(_) | Value::Float(_) => add_numbers(&total, value),
        _ => Ok(total),
    }
}

// Server-side script operations

fn script_unsupported(method: &str) -> MongodogError {
    MongodogError::Unsupported(format!(
        "{} runs server-side JavaScript, which the in-memory client does not execute",
        method
    ))
}

fn group(invocation: &Invocation) -> Result<Reply> {
    invocation.receiver.as_collection("group")?;
    bind(&COLLECTION_GROUP, invocation)?;
    Err(script_unsupported("group"))
}

fn inline_map_reduce(invocation: &Invocation) -> Result<Reply> {
    invocation.receiver.as_collection("inline_map_reduce")?;
    bind(&COLLECTION_INLINE_MAP_REDUCE, invocation)?;
    Err(script_unsupported("inline_map_reduce"))
}

fn map_reduce(invocation: &Invocation) -> Result<Reply> {
    invocation.receiver.as_collection("map_reduce")?;
    bind(&COLLECTION_MAP_REDUCE, invocation)?;
    Err(script_unsupported("map_reduce"))
}
