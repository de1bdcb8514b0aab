//! Curated verb dictionary for the function-naming rule.
//!
//! A function name passes the verb check when its first token (after
//! stripping leading underscores) appears here. The list is deliberately
//! broad: the rule should nudge, not fight, existing Django codebases.

use std::collections::BTreeSet;
use std::sync::LazyLock;

static VERBS: LazyLock<BTreeSet<&'static str>> = LazyLock::new(|| {
    [
        "add", "aggregate", "annotate", "append", "apply", "assert", "assign", "attach", "build",
        "bulk", "calculate", "call", "cancel", "check", "clean", "clear", "clone", "close",
        "collect", "compare", "compile", "compute", "configure", "confirm", "connect", "convert",
        "copy", "count", "create", "deactivate", "decode", "delete", "deserialize", "detach",
        "disable", "dispatch", "do", "download", "drop", "dump", "emit", "enable", "encode",
        "enqueue", "ensure", "evaluate", "execute", "expire", "export", "extract", "fetch",
        "fill", "filter", "find", "finish", "flush", "format", "generate", "get", "handle",
        "import", "increment", "init", "initialize", "insert", "invalidate", "invoke", "link",
        "list", "load", "lock", "log", "lookup", "make", "map", "mark", "merge", "migrate",
        "normalize", "notify", "open", "parse", "patch", "perform", "persist", "populate",
        "post", "prefetch", "prepare", "process", "publish", "pull", "purge", "push", "put",
        "read", "rebuild", "receive", "record", "refresh", "register", "release", "reload",
        "remove", "rename", "render", "replace", "report", "request", "require", "reset",
        "resolve", "restore", "retrieve", "retry", "revoke", "rotate", "run", "save", "schedule",
        "search", "select", "send", "serialize", "set", "show", "skip", "sort", "split", "start",
        "stop", "store", "submit", "subscribe", "sync", "synchronize", "toggle", "track",
        "transform", "translate", "trigger", "truncate", "unlink", "unlock", "unregister",
        "unsubscribe", "update", "upload", "upsert", "validate", "verify", "wait", "write",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` starts with a recognized verb token.
///
/// Token boundaries are underscores (snake_case) or a lowercase-to-uppercase
/// transition (camelCase), so `getUser` and `get_user` both match on `get`.
#[must_use]
pub fn starts_with_verb(name: &str) -> bool {
    let name = name.trim_start_matches('_');
    let token_end = name
        .char_indices()
        .find(|&(i, c)| c == '_' || (i > 0 && c.is_ascii_uppercase()))
        .map_or(name.len(), |(i, _)| i);
    let token = name[..token_end].to_ascii_lowercase();
    !token.is_empty() && VERBS.contains(token.as_str())
}
