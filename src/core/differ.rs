use serde_json::Value;

/// One segment of a path locating a field inside a character record tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

/// One structural difference between two normalized character records
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    Change {
        path: Vec<PathSeg>,
        old: Value,
        new: Value,
    },
    Remove {
        path: Vec<PathSeg>,
        removed: Value,
    },
    Add {
        path: Vec<PathSeg>,
        added: Value,
    },
}

/// Compute the structural differences between two records.
///
/// Mappings are walked by key, sequences strictly by index: an insertion in
/// the middle of a list shows up as per-index changes plus a trailing add,
/// not as a shift. Scalar comparison is type-sensitive, so `32` and `"32"`
/// differ.
pub fn diff(old: &Value, new: &Value) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let mut path = Vec::new();
    walk(&mut path, old, new, &mut entries);
    entries
}

fn walk(path: &mut Vec<PathSeg>, old: &Value, new: &Value, out: &mut Vec<DiffEntry>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, old_value) in a {
                path.push(PathSeg::Key(key.clone()));
                match b.get(key) {
                    Some(new_value) => walk(path, old_value, new_value, out),
                    None => out.push(DiffEntry::Remove {
                        path: path.clone(),
                        removed: old_value.clone(),
                    }),
                }
                path.pop();
            }
            for (key, new_value) in b {
                if !a.contains_key(key) {
                    path.push(PathSeg::Key(key.clone()));
                    out.push(DiffEntry::Add {
                        path: path.clone(),
                        added: new_value.clone(),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let shared = a.len().min(b.len());
            for i in 0..shared {
                path.push(PathSeg::Index(i));
                walk(path, &a[i], &b[i], out);
                path.pop();
            }
            for (i, removed) in a.iter().enumerate().skip(shared) {
                path.push(PathSeg::Index(i));
                out.push(DiffEntry::Remove {
                    path: path.clone(),
                    removed: removed.clone(),
                });
                path.pop();
            }
            for (i, added) in b.iter().enumerate().skip(shared) {
                path.push(PathSeg::Index(i));
                out.push(DiffEntry::Add {
                    path: path.clone(),
                    added: added.clone(),
                });
                path.pop();
            }
        }
        _ => {
            if old != new {
                out.push(DiffEntry::Change {
                    path: path.clone(),
                    old: old.clone(),
                    new: new.clone(),
                });
            }
        }
    }
}

/// Render a diff as the human-readable report: one line per entry, all lines
/// sorted lexicographically as strings, newline-joined, surrounding
/// whitespace trimmed. An empty diff renders as the empty string.
pub fn render(entries: &[DiffEntry]) -> String {
    let mut lines: Vec<String> = entries.iter().map(render_entry).collect();
    lines.sort();
    lines.join("\n").trim().to_string()
}

/// Convenience wrapper: diff two records and render the report in one step.
pub fn diff_text(old: &Value, new: &Value) -> String {
    render(&diff(old, new))
}

fn render_entry(entry: &DiffEntry) -> String {
    match entry {
        DiffEntry::Change { path, old, new } => format!(
            "change {} from {} to {}",
            render_path(path),
            render_value(old),
            render_value(new)
        ),
        DiffEntry::Remove { path, removed } => {
            format!("remove {} {}", render_path(path), render_value(removed))
        }
        DiffEntry::Add { path, added } => {
            format!("add {} {}", render_path(path), render_value(added))
        }
    }
}

/// Dotted notation when every segment is a plain string key; otherwise the
/// literal ordered-sequence form, e.g. `["items", 0, "armor"]`.
fn render_path(path: &[PathSeg]) -> String {
    let all_plain = path.iter().all(|seg| match seg {
        PathSeg::Key(key) => is_plain_key(key),
        PathSeg::Index(_) => false,
    });
    if all_plain {
        let keys: Vec<&str> = path
            .iter()
            .map(|seg| match seg {
                PathSeg::Key(key) => key.as_str(),
                PathSeg::Index(_) => unreachable!(),
            })
            .collect();
        keys.join(".")
    } else {
        let parts: Vec<String> = path
            .iter()
            .map(|seg| match seg {
                PathSeg::Key(key) => format!("{:?}", key),
                PathSeg::Index(i) => i.to_string(),
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scalars render bare (strings without quotes, numbers/booleans/null as
/// their JSON tokens); subtrees render as compact JSON with sorted keys.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
