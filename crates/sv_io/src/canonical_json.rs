//! Canonical JSON for vote-state fingerprints, plus replace-by-rename file writes.
//! - Objects: keys sorted by UTF-8 byte order, at every depth
//! - Arrays: order preserved (callers sort rows before serializing)
//! - Output: compact, no trailing newline
//! - File writes go through a sibling temp file and a rename

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::{IoError, IoResult};

/// Canonical bytes of an already-parsed value.
pub fn to_canonical_bytes(v: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_value(v, &mut out);
    out
}

/// Canonical bytes of any serializable value.
pub fn canonical_bytes_of<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let v = serde_json::to_value(value)?;
    Ok(to_canonical_bytes(&v))
}

/// Replace `path` with `bytes` via temp file + rename.
///
/// The temp file lives next to the target so the final rename stays on one
/// filesystem.
pub fn write_bytes_replacing(path: &Path, bytes: &[u8]) -> IoResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp = sibling_tmp_path(path);
    let res = (|| -> std::io::Result<()> {
        let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(IoError::Path(format!("write {}: {e}", path.display())));
    }
    Ok(())
}

fn sibling_tmp_path(target: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target.file_name().and_then(|s| s.to_str()).unwrap_or("out");
    target.with_file_name(format!(".{name}.{}.{n}.tmp", std::process::id()))
}

fn write_value(v: &Value, out: &mut Vec<u8>) {
    match v {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // Display of a scalar Value is its compact JSON literal.
            out.extend_from_slice(v.to_string().as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push(b'{');
            for (i, (k, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(k.clone()).to_string().as_bytes());
                out.push(b':');
                write_value(val, out);
            }
            out.push(b'}');
        }
    }
}
