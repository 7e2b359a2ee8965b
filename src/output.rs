//! Output path convention for rewritten units.
//!
//! `dir/sub/name.ext` is written to `dir_op/sub/name_op.ext`: the root
//! directory segment and the file stem are tagged, deeper structure is kept.
//! A bare `name.ext` becomes `name_op.ext`. Absolute inputs are written next
//! to the input.

use std::path::{Component, Path, PathBuf};

/// Default tag appended to rewritten names.
pub const DEFAULT_TAG: &str = "_op";

/// Tag a file name before its last extension.
pub fn tagged_file_name(name: &str, tag: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}{}.{}", stem, tag, ext),
        None => format!("{}{}", name, tag),
    }
}

/// Path of the rewritten unit for `input`.
pub fn output_path(input: &Path, tag: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = tagged_file_name(&name, tag);
    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    if input.is_absolute() {
        return parent.join(file_name);
    }

    let mut out = PathBuf::new();
    let mut tagged_root = false;
    for component in parent.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(segment) if !tagged_root => {
                out.push(format!("{}{}", segment.to_string_lossy(), tag));
                tagged_root = true;
            }
            other => out.push(other.as_os_str()),
        }
    }
    out.join(file_name)
}
