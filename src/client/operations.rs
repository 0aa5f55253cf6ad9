//! Published call surface of the client library
//!
//! Each interceptable method is identified by an [`Operation`]: the patch-table path the
//! method dispatches through and the signature it accepts. Anything that needs to read a
//! call's arguments (the client's own implementations, the sniffer's normalizers) binds
//! them against these signatures so both always agree on the call conventions.

use crate::dispatch::{Param, ParamDefault, Signature, TargetPath};

/// Patch-table path and signature of one interceptable method
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub path: TargetPath,
    pub signature: Signature,
}

impl Operation {
    pub const fn new(path: TargetPath, signature: Signature) -> Self {
        Self { path, signature }
    }
}

pub const DATABASE_TYPE: &str = "client.Database";
pub const COLLECTION_TYPE: &str = "client.Collection";
pub const CURSOR_TYPE: &str = "client.Cursor";

use ParamDefault::{Bool, Int, Null, Str};

const COMMAND_PARAMS: &[Param] = &[
    Param::required("command"),
    Param::optional("value", Int(1)),
    Param::optional("check", Bool(true)),
    Param::optional("allowable_errors", ParamDefault::EmptyArray),
    Param::optional("uuid_subtype", Int(3)),
    Param::optional("compile_re", Bool(true)),
];

const AGGREGATE_PARAMS: &[Param] = &[Param::required("pipeline")];

const DISTINCT_PARAMS: &[Param] = &[Param::required("key")];

/// Everything after the filter argument of `find` and `find_one`
macro_rules! query_tail_params {
    ($first:expr) => {
        &[
            $first,
            Param::optional("fields", Null),
            Param::optional("skip", Int(0)),
            Param::optional("limit", Int(0)),
            Param::optional("timeout", Bool(true)),
            Param::optional("snapshot", Bool(false)),
            Param::optional("tailable", Bool(false)),
            Param::optional("sort", Null),
            Param::optional("max_scan", Null),
            Param::optional("as_class", Null),
            Param::optional("slave_okay", Bool(false)),
            Param::optional("await_data", Bool(false)),
            Param::optional("partial", Bool(false)),
            Param::optional("manipulate", Bool(true)),
            Param::optional("read_preference", Str("PRIMARY")),
            Param::optional("tag_sets", ParamDefault::ArrayOfEmptyDocument),
            Param::optional("secondary_acceptable_latency_ms", Null),
            Param::optional("_must_use_master", Bool(false)),
            Param::optional("_uuid_subtype", Null),
        ]
    };
}

const FIND_PARAMS: &[Param] = query_tail_params!(Param::optional("spec", Null));

const FIND_ONE_PARAMS: &[Param] = query_tail_params!(Param::optional("spec_or_id", Null));

const FIND_AND_MODIFY_PARAMS: &[Param] = &[
    Param::optional("query", ParamDefault::EmptyDocument),
    Param::optional("update", Null),
    Param::optional("upsert", Bool(false)),
    Param::optional("sort", Null),
    Param::optional("full_response", Bool(false)),
];

const GROUP_PARAMS: &[Param] = &[
    Param::required("key"),
    Param::required("condition"),
    Param::required("initial"),
    Param::required("reduce"),
    Param::optional("finalize", Null),
];

const INLINE_MAP_REDUCE_PARAMS: &[Param] = &[
    Param::required("map"),
    Param::required("reduce"),
    Param::optional("full_response", Bool(false)),
];

const INSERT_PARAMS: &[Param] = &[
    Param::required("doc_or_docs"),
    Param::optional("manipulate", Bool(true)),
    Param::optional("safe", Null),
    Param::optional("check_keys", Bool(true)),
    Param::optional("continue_on_error", Bool(false)),
];

const MAP_REDUCE_PARAMS: &[Param] = &[
    Param::required("map"),
    Param::required("reduce"),
    Param::required("out"),
    Param::optional("full_response", Bool(false)),
];

const REMOVE_PARAMS: &[Param] = &[Param::optional("spec_or_id", Null), Param::optional("safe", Null)];

const SAVE_PARAMS: &[Param] = &[
    Param::required("to_save"),
    Param::optional("manipulate", Bool(true)),
    Param::optional("safe", Null),
    Param::optional("check_keys", Bool(true)),
];

const UPDATE_PARAMS: &[Param] = &[
    Param::required("spec"),
    Param::required("document"),
    Param::optional("upsert", Bool(false)),
    Param::optional("manipulate", Bool(false)),
    Param::optional("safe", Null),
    Param::optional("multi", Bool(false)),
    Param::optional("check_keys", Bool(true)),
];

pub const DATABASE_COMMAND: Operation = Operation::new(
    TargetPath::new(DATABASE_TYPE, "command"),
    Signature::new("command", COMMAND_PARAMS, true),
);

pub const COLLECTION_AGGREGATE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "aggregate"),
    Signature::new("aggregate", AGGREGATE_PARAMS, true),
);

pub const COLLECTION_COUNT: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "count"),
    Signature::new("count", &[], false),
);

pub const COLLECTION_DISTINCT: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "distinct"),
    Signature::new("distinct", DISTINCT_PARAMS, false),
);

pub const COLLECTION_FIND: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "find"),
    Signature::new("find", FIND_PARAMS, true),
);

pub const COLLECTION_FIND_AND_MODIFY: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "find_and_modify"),
    Signature::new("find_and_modify", FIND_AND_MODIFY_PARAMS, true),
);

pub const COLLECTION_FIND_ONE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "find_one"),
    Signature::new("find_one", FIND_ONE_PARAMS, true),
);

pub const COLLECTION_GROUP: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "group"),
    Signature::new("group", GROUP_PARAMS, false),
);

pub const COLLECTION_INLINE_MAP_REDUCE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "inline_map_reduce"),
    Signature::new("inline_map_reduce", INLINE_MAP_REDUCE_PARAMS, true),
);

pub const COLLECTION_INSERT: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "insert"),
    Signature::new("insert", INSERT_PARAMS, true),
);

pub const COLLECTION_MAP_REDUCE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "map_reduce"),
    Signature::new("map_reduce", MAP_REDUCE_PARAMS, true),
);

pub const COLLECTION_REMOVE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "remove"),
    Signature::new("remove", REMOVE_PARAMS, true),
);

pub const COLLECTION_SAVE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "save"),
    Signature::new("save", SAVE_PARAMS, true),
);

pub const COLLECTION_UPDATE: Operation = Operation::new(
    TargetPath::new(COLLECTION_TYPE, "update"),
    Signature::new("update", UPDATE_PARAMS, true),
);

pub const CURSOR_ITER: Operation = Operation::new(
    TargetPath::new(CURSOR_TYPE, "iter"),
    Signature::new("iter", &[], false),
);

/// Stored query state a cursor exposes, in the order it is reported
pub const CURSOR_STATE_FIELDS: &[&str] = &[
    "spec",
    "fields",
    "skip",
    "limit",
    "timeout",
    "snapshot",
    "tailable",
    "ordering",
    "explain",
    "hint",
    "batch_size",
    "max_scan",
    "as_class",
    "slave_okay",
    "await_data",
    "partial",
    "manipulate",
    "read_preference",
    "tag_sets",
    "secondary_acceptable_latency_ms",
    "must_use_master",
    "uuid_subtype",
    "query_flags",
    "kwargs",
];
