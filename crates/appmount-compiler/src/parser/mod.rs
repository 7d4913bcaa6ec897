//! containerData parser.
//!
//! Transforms a raw containerData string into a validated AST through
//! tokenization, per-token grammar rules, and list-wide validation.
//!
//! | Position | Token                                  | Mount                 |
//! |----------|----------------------------------------|-----------------------|
//! | 0        | `[flags:]<path>`                       | primary               |
//! | >0       | `<index>:<path>`                       | component primary     |
//! | >0       | `m:<subdir>:<path>`                    | directory             |
//! | >0       | `f:<filename>:<path>[:<base64>]`       | file                  |
//! | >0       | `c:<index>:<subdir>:<path>`            | component directory   |
//! | >0       | `cf:<index>:<filename>:<path>`         | component file        |

pub mod ast;
pub mod lexer;
pub mod validator;

use appmount_common::constants::{PRIMARY_SUBDIR, SEGMENT_SEPARATOR, TOKEN_SEPARATOR};
use appmount_common::error::{MountError, Result};
use appmount_common::types::{MountFlags, ReplicationFlag};

use self::ast::{MountKind, ParsedContainerData, ParsedMount, RequiredPath};
use self::lexer::{Head, RawToken};

fn syntax_err(token: &RawToken<'_>, reason: impl Into<String>) -> MountError {
    MountError::Syntax {
        index: token.index,
        token: token.text.to_owned(),
        reason: reason.into(),
    }
}

fn expect_arity(token: &RawToken<'_>, expected: &[usize], form: &str) -> Result<()> {
    if expected.contains(&token.arity()) {
        Ok(())
    } else {
        Err(syntax_err(
            token,
            format!("expected {form}, got {} segments", token.arity()),
        ))
    }
}

fn parse_index(token: &RawToken<'_>, segment: &str) -> Result<usize> {
    let digits = lexer::digits(segment).ok_or_else(|| {
        syntax_err(token, format!("component index \"{segment}\" is not a number"))
    })?;
    digits
        .parse()
        .map_err(|_| syntax_err(token, format!("component index \"{digits}\" is out of range")))
}

/// Parses a containerData string into its mount list.
///
/// # Errors
///
/// Returns an error naming the offending token if any token violates the
/// grammar or a path-safety rule, or if the list repeats a container path or
/// local name. No partial result is ever returned.
pub fn parse_container_data(container_data: &str) -> Result<ParsedContainerData> {
    tracing::info!(len = container_data.len(), "parsing containerData");
    let tokens = lexer::tokenize(container_data);
    let Some((first, rest)) = tokens.split_first() else {
        return Err(MountError::Syntax {
            index: 0,
            token: String::new(),
            reason: "containerData is empty".into(),
        });
    };
    if rest.is_empty() && first.text.is_empty() {
        return Err(syntax_err(first, "containerData is empty"));
    }

    let primary = parse_primary(first)?;
    let additional = rest
        .iter()
        .map(parse_additional)
        .collect::<Result<Vec<_>>>()?;

    let parsed = ParsedContainerData::new(primary, additional);
    validator::validate(&parsed)?;
    Ok(parsed)
}

fn parse_primary(token: &RawToken<'_>) -> Result<ParsedMount> {
    let (flags, path) = match token.segments.as_slice() {
        [path] => (MountFlags::new(), *path),
        [flag_segment, path] => {
            let flags = MountFlags::from_segment(flag_segment);
            if flags.len() != flag_segment.chars().count() {
                tracing::warn!(
                    segment = %flag_segment,
                    "ignoring unrecognized characters in primary mount flags"
                );
            }
            (flags, *path)
        }
        _ => {
            return Err(syntax_err(token, "primary mount expects [flags:]<path>"));
        }
    };
    if path.is_empty() && token.arity() == 1 {
        return Err(syntax_err(token, "missing primary mount"));
    }
    validator::check_container_path(token, path)?;
    tracing::debug!(index = token.index, path, flags = %flags, "parsed primary mount");
    Ok(ParsedMount::primary(flags, path))
}

fn parse_additional(token: &RawToken<'_>) -> Result<ParsedMount> {
    let segs = &token.segments;
    let mount = match lexer::classify_head(segs[0]) {
        Head::Index(_) => {
            expect_arity(token, &[2], "<index>:<path>")?;
            ParsedMount {
                kind: MountKind::ComponentPrimary {
                    component_index: parse_index(token, segs[0])?,
                },
                subdir: PRIMARY_SUBDIR.to_owned(),
                container_path: segs[1].to_owned(),
            }
        }
        Head::Directory => {
            expect_arity(token, &[3], "m:<subdir>:<path>")?;
            validator::check_local_name(token, segs[1])?;
            ParsedMount {
                kind: MountKind::Directory,
                subdir: segs[1].to_owned(),
                container_path: segs[2].to_owned(),
            }
        }
        Head::File => {
            expect_arity(token, &[3, 4], "f:<filename>:<path>[:<base64>]")?;
            validator::check_local_name(token, segs[1])?;
            let content = segs.get(3).filter(|c| !c.is_empty());
            if let Some(content) = content {
                validator::check_content(token, content)?;
            }
            ParsedMount {
                kind: MountKind::File {
                    content: content.map(|c| (*c).to_owned()),
                },
                subdir: segs[1].to_owned(),
                container_path: segs[2].to_owned(),
            }
        }
        Head::ComponentDirectory => {
            expect_arity(token, &[4], "c:<index>:<subdir>:<path>")?;
            validator::check_local_name(token, segs[2])?;
            ParsedMount {
                kind: MountKind::ComponentDirectory {
                    component_index: parse_index(token, segs[1])?,
                },
                subdir: segs[2].to_owned(),
                container_path: segs[3].to_owned(),
            }
        }
        Head::ComponentFile => {
            expect_arity(token, &[4], "cf:<index>:<filename>:<path>")?;
            validator::check_local_name(token, segs[2])?;
            ParsedMount {
                kind: MountKind::ComponentFile {
                    component_index: parse_index(token, segs[1])?,
                },
                subdir: segs[2].to_owned(),
                container_path: segs[3].to_owned(),
            }
        }
        Head::Other => return Err(syntax_err(token, "unknown mount syntax")),
    };
    validator::check_container_path(token, &mount.container_path)?;
    tracing::debug!(
        index = token.index,
        kind = ?mount.mount_type(),
        path = %mount.container_path,
        "parsed mount"
    );
    Ok(mount)
}

/// Host paths of the component's own mounts that must exist before the
/// container is created, in token order.
///
/// File mounts without seed content are included with `content: None` so the
/// caller creates an empty file; a missing bind source would otherwise be
/// created as a directory by the runtime.
pub fn get_required_local_paths(parsed: &ParsedContainerData) -> Vec<RequiredPath> {
    parsed
        .all_mounts()
        .filter(|m| m.mount_type().is_local())
        .map(|m| RequiredPath {
            name: m.subdir.clone(),
            is_file: m.is_file(),
            content: m.content().map(str::to_owned),
        })
        .collect()
}

/// Replication flags of the primary mount.
pub fn primary_flags(parsed: &ParsedContainerData) -> &MountFlags {
    parsed.primary().flags()
}

/// Checks the raw containerData string for a primary mount flag without parsing it.
///
/// Only the first token's flag segment is inspected; a first token without a
/// flag segment never carries flags.
pub fn has_flag(container_data: &str, flag: ReplicationFlag) -> bool {
    let first = container_data
        .split(TOKEN_SEPARATOR)
        .next()
        .unwrap_or_default();
    let mut segments = first.split(SEGMENT_SEPARATOR);
    match (segments.next(), segments.next()) {
        (Some(flag_segment), Some(_)) => flag_segment.contains(flag.as_char()),
        _ => false,
    }
}

/// Component indexes referenced by the mount list, in token order.
pub fn component_references(parsed: &ParsedContainerData) -> Vec<usize> {
    parsed
        .all_mounts()
        .filter_map(ParsedMount::component_index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::MountType;

    #[test]
    fn parse_bare_primary() {
        let parsed = parse_container_data("/data").expect("should parse");
        let primary = parsed.primary();
        assert_eq!(primary.mount_type(), MountType::Primary);
        assert_eq!(primary.container_path, "/data");
        assert_eq!(primary.subdir, "appdata");
        assert!(primary.flags().is_empty());
        assert!(parsed.additional().is_empty());
    }

    #[test]
    fn parse_primary_flags() {
        let parsed = parse_container_data("rgs:/data").expect("should parse");
        let flags = primary_flags(&parsed);
        assert_eq!(flags.len(), 3);
        assert!(flags.contains(ReplicationFlag::R));
        assert!(flags.contains(ReplicationFlag::G));
        assert!(flags.contains(ReplicationFlag::S));
    }

    #[test]
    fn parse_primary_with_unknown_flag_characters() {
        let parsed = parse_container_data("rx:/data").expect("should parse");
        assert_eq!(primary_flags(&parsed).to_string(), "r");
    }

    #[test]
    fn parse_primary_with_too_many_segments_fails() {
        let err = parse_container_data("m:logs:/data").unwrap_err();
        assert!(matches!(err, MountError::Syntax { index: 0, .. }), "got: {err}");
    }

    #[test]
    fn parse_directory_mount() {
        let parsed = parse_container_data("/data|m:logs:/var/log").expect("should parse");
        let dir = &parsed.additional()[0];
        assert_eq!(dir.mount_type(), MountType::Directory);
        assert_eq!(dir.subdir, "logs");
        assert_eq!(dir.container_path, "/var/log");
        assert!(!dir.is_file());
    }

    #[test]
    fn parse_file_mount_with_content() {
        let parsed =
            parse_container_data("/data|f:config.yaml:/etc/config.yaml:SGVsbG8gV29ybGQh")
                .expect("should parse");
        let file = &parsed.additional()[0];
        assert_eq!(file.mount_type(), MountType::File);
        assert!(file.is_file());
        assert_eq!(file.content(), Some("SGVsbG8gV29ybGQh"));
    }

    #[test]
    fn parse_file_mount_without_content() {
        let parsed = parse_container_data("/data|f:app.conf:/etc/app.conf").expect("should parse");
        assert_eq!(parsed.additional()[0].content(), None);
    }

    #[test]
    fn parse_file_mount_with_empty_content_segment() {
        let parsed = parse_container_data("/data|f:app.conf:/etc/app.conf:").expect("should parse");
        assert_eq!(parsed.additional()[0].content(), None);
    }

    #[test]
    fn parse_component_references() {
        let parsed =
            parse_container_data("/data|0:/shared|c:1:logs:/peer/logs|cf:2:app.conf:/etc/peer.conf")
                .expect("should parse");
        let kinds: Vec<_> = parsed.additional().iter().map(ParsedMount::mount_type).collect();
        assert_eq!(
            kinds,
            vec![
                MountType::ComponentPrimary,
                MountType::ComponentDirectory,
                MountType::ComponentFile
            ]
        );
        assert_eq!(parsed.additional()[0].subdir, "appdata");
        assert_eq!(parsed.additional()[2].subdir, "app.conf");
        assert_eq!(component_references(&parsed), vec![0, 1, 2]);
    }

    #[test]
    fn parse_full_example() {
        let parsed = parse_container_data(
            "r:/data|m:logs:/var/log|f:config.yaml:/etc/config.yaml|0:/shared",
        )
        .expect("should parse");
        assert_eq!(parsed.len(), 4);
        assert!(parsed.primary().flags().contains(ReplicationFlag::R));
    }

    #[test]
    fn parse_is_deterministic() {
        let input = "g:/data|m:logs:/var/log|c:0:cache:/cache";
        let a = parse_container_data(input).expect("first");
        let b = parse_container_data(input).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn parse_error_unknown_prefix() {
        let err = parse_container_data("/data|x:foo:/bar").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown mount syntax"), "got: {msg}");
        assert!(msg.contains("token 1"), "got: {msg}");
    }

    #[test]
    fn parse_error_flag_syntax_outside_primary() {
        let err = parse_container_data("/data|r:/other").unwrap_err();
        assert!(matches!(err, MountError::Syntax { index: 1, .. }), "got: {err}");
    }

    #[test]
    fn parse_error_wrong_arity() {
        assert!(parse_container_data("/data|m:/var/log").is_err());
        assert!(parse_container_data("/data|m:logs:/var/log:extra").is_err());
        assert!(parse_container_data("/data|c:0:/cache").is_err());
        assert!(parse_container_data("/data|cf:0:a.conf:/a.conf:SGk=").is_err());
        assert!(parse_container_data("/data|0:logs:/x").is_err());
    }

    #[test]
    fn parse_error_non_numeric_component_index() {
        let err = parse_container_data("/data|c:x:logs:/logs").unwrap_err();
        assert!(err.to_string().contains("not a number"), "got: {err}");
    }

    #[test]
    fn parse_error_oversized_component_index() {
        let err = parse_container_data("/data|99999999999999999999999:/x").unwrap_err();
        assert!(err.to_string().contains("out of range"), "got: {err}");
    }

    #[test]
    fn parse_error_empty_input() {
        let err = parse_container_data("").unwrap_err();
        assert!(err.to_string().contains("empty"), "got: {err}");
    }

    #[test]
    fn parse_error_missing_primary() {
        let err = parse_container_data("|m:a:/b").unwrap_err();
        assert!(matches!(err, MountError::Syntax { index: 0, .. }), "got: {err}");
        let message = err.to_string();
        assert!(message.contains("missing primary mount"), "got: {message}");
        assert!(!message.contains("empty"), "got: {message}");
    }

    #[test]
    fn parse_error_trailing_pipe() {
        assert!(parse_container_data("/data|").is_err());
    }

    #[test]
    fn parse_error_relative_path() {
        let err = parse_container_data("data").unwrap_err();
        assert!(matches!(err, MountError::UnsafePath { .. }), "got: {err}");
    }

    #[test]
    fn parse_error_traversal() {
        assert!(parse_container_data("/data/../etc").is_err());
        assert!(parse_container_data("/data|m:logs:/var/../etc").is_err());
        assert!(parse_container_data("/data|m:..:/var/log").is_err());
    }

    #[test]
    fn parse_error_reserved_subdir() {
        let err = parse_container_data("/data|m:appdata:/other").unwrap_err();
        assert!(err.to_string().contains("reserved"), "got: {err}");
    }

    #[test]
    fn parse_error_bad_base64() {
        let err = parse_container_data("/data|f:a.txt:/a.txt:not*base64").unwrap_err();
        assert!(matches!(err, MountError::Content { index: 1, .. }), "got: {err}");
    }

    #[test]
    fn parse_error_duplicate_container_path() {
        let err = parse_container_data("/data|m:logs:/data").unwrap_err();
        assert!(
            err.to_string().contains("duplicate container path"),
            "got: {err}"
        );
    }

    #[test]
    fn parse_error_duplicate_local_name() {
        let err = parse_container_data("/data|m:logs:/a|f:logs:/b").unwrap_err();
        assert!(matches!(err, MountError::DuplicateLocalName { index: 2, .. }), "got: {err}");
    }

    #[test]
    fn required_paths_cover_local_mounts_only() {
        let parsed = parse_container_data(
            "/data|m:logs:/var/log|f:seed.txt:/seed.txt:SGk=|f:empty.txt:/empty.txt|0:/shared|c:0:logs:/peer",
        )
        .expect("should parse");
        let required = get_required_local_paths(&parsed);
        let names: Vec<_> = required.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["appdata", "logs", "seed.txt", "empty.txt"]);
        assert!(!required[0].is_file);
        assert_eq!(required[2].content.as_deref(), Some("SGk="));
        assert!(required[3].is_file);
        assert!(required[3].content.is_none());
    }

    #[test]
    fn has_flag_reads_first_token_only() {
        assert!(has_flag("r:/data", ReplicationFlag::R));
        assert!(has_flag("gs:/data|m:logs:/var/log", ReplicationFlag::S));
        assert!(!has_flag("/data", ReplicationFlag::R));
        assert!(!has_flag("/data|0:/shared", ReplicationFlag::G));
        assert!(!has_flag("s:/data", ReplicationFlag::G));
        assert!(!has_flag("", ReplicationFlag::R));
    }
}
