//! Path-safety predicates and list-wide invariants of parsed mounts.
//!
//! The predicates are pure and reusable outside the parser. The `check_*`
//! wrappers turn a failed predicate into an error that names the token.

use std::collections::HashSet;

use appmount_common::constants::{
    MAX_CONTENT_BYTES, MAX_ENCODED_CONTENT_LEN, MAX_NAME_LENGTH, RESERVED_NAMES,
};
use appmount_common::error::{MountError, Result};
use base64::Engine as _;
use nom::{
    Parser,
    bytes::complete::{take_while, take_while_m_n},
    combinator::all_consuming,
};

use super::ast::{CONTENT_ENGINE, ParsedContainerData};
use super::lexer::RawToken;

fn container_path_violation(path: &str) -> Option<&'static str> {
    if path.is_empty() {
        Some("container path must not be empty")
    } else if !path.starts_with('/') {
        Some("container path must be absolute")
    } else if path.contains('\0') {
        Some("container path must not contain a null byte")
    } else if path.split('/').any(|segment| segment == "..") {
        Some("container path must not contain '..'")
    } else {
        None
    }
}

const fn is_safe_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn local_name_violation(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("name must not be empty")
    } else if name.len() > MAX_NAME_LENGTH {
        Some("name exceeds 255 characters")
    } else if name.contains('/') || name.contains('\\') {
        Some("name must not contain a path separator")
    } else if name.contains("..") {
        Some("name must not contain '..'")
    } else if RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        Some("name is reserved")
    } else if !name.chars().all(is_safe_name_char) {
        Some("name may only contain letters, digits, '.', '_' and '-'")
    } else {
        None
    }
}

/// Returns true for an absolute, traversal-free, null-byte-free container path.
pub fn is_valid_container_path(path: &str) -> bool {
    container_path_violation(path).is_none()
}

/// Returns true for a safe, non-reserved subdirectory or filename.
pub fn is_valid_local_name(name: &str) -> bool {
    local_name_violation(name).is_none()
}

const fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/'
}

/// Returns true if `content` only uses the standard base64 alphabet
/// followed by at most two padding characters.
pub fn is_base64_charset(content: &str) -> bool {
    all_consuming((
        take_while(is_base64_char),
        take_while_m_n(0, 2, |c: char| c == '='),
    ))
    .parse(content)
    .map_err(|_: nom::Err<nom::error::Error<&str>>| ())
    .is_ok()
}

pub(crate) fn check_container_path(token: &RawToken<'_>, path: &str) -> Result<()> {
    container_path_violation(path).map_or(Ok(()), |reason| {
        Err(MountError::UnsafePath {
            index: token.index,
            token: token.text.to_owned(),
            reason: reason.to_owned(),
        })
    })
}

pub(crate) fn check_local_name(token: &RawToken<'_>, name: &str) -> Result<()> {
    local_name_violation(name).map_or(Ok(()), |reason| {
        Err(MountError::UnsafePath {
            index: token.index,
            token: token.text.to_owned(),
            reason: format!("invalid name \"{name}\": {reason}"),
        })
    })
}

pub(crate) fn check_content(token: &RawToken<'_>, content: &str) -> Result<()> {
    let content_err = |reason: String| MountError::Content {
        index: token.index,
        reason,
    };
    if content.len() > MAX_ENCODED_CONTENT_LEN {
        return Err(content_err(format!(
            "encoded content is {} bytes, limit is {MAX_ENCODED_CONTENT_LEN}",
            content.len()
        )));
    }
    if !is_base64_charset(content) {
        return Err(content_err("content is not base64".to_owned()));
    }
    let decoded = CONTENT_ENGINE
        .decode(content)
        .map_err(|e| content_err(format!("content is not base64: {e}")))?;
    if decoded.len() > MAX_CONTENT_BYTES {
        return Err(content_err(format!(
            "decoded content is {} bytes, limit is {MAX_CONTENT_BYTES}",
            decoded.len()
        )));
    }
    Ok(())
}

/// Checks the invariants that span the whole mount list.
///
/// # Checks performed
///
/// 1. No two mounts share a container path.
/// 2. No two local mounts share a subdirectory or filename.
///
/// # Errors
///
/// Returns the first violation found, in token order.
pub fn validate(parsed: &ParsedContainerData) -> Result<()> {
    tracing::debug!(mounts = parsed.len(), "validating mount list");
    check_duplicate_container_paths(parsed)?;
    check_duplicate_local_names(parsed)?;
    Ok(())
}

fn check_duplicate_container_paths(parsed: &ParsedContainerData) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, mount) in parsed.all_mounts().enumerate() {
        if !seen.insert(mount.container_path.as_str()) {
            return Err(MountError::DuplicateContainerPath {
                index,
                path: mount.container_path.clone(),
            });
        }
    }
    Ok(())
}

fn check_duplicate_local_names(parsed: &ParsedContainerData) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, mount) in parsed.all_mounts().enumerate() {
        if mount.mount_type().is_local() && !seen.insert(mount.subdir.as_str()) {
            return Err(MountError::DuplicateLocalName {
                index,
                name: mount.subdir.clone(),
            });
        }
    }
    Ok(())
}
