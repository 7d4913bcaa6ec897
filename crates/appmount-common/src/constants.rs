//! Grammar keywords, limits, and default paths.

/// Default host directory under which component data directories live.
pub const DEFAULT_APPS_ROOT: &str = "/var/lib/appmount/apps";

/// Default prefix applied by the bundled platform naming transform.
pub const DEFAULT_NAME_PREFIX: &str = "flux";

/// Host subdirectory backing every primary mount.
pub const PRIMARY_SUBDIR: &str = "appdata";

/// Names a local subdirectory or filename may never take.
pub const RESERVED_NAMES: [&str; 3] = [PRIMARY_SUBDIR, ".", ".."];

/// Maximum length of a local subdirectory or filename.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum decoded size of seeded file content (10 MiB).
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Maximum base64-encoded length accepted for seeded file content.
pub const MAX_ENCODED_CONTENT_LEN: usize = MAX_CONTENT_BYTES.div_ceil(3) * 4;

/// Separator between mount tokens.
pub const TOKEN_SEPARATOR: char = '|';

/// Separator between segments of one token.
pub const SEGMENT_SEPARATOR: char = ':';

/// Token prefix for a named directory mount.
pub const DIRECTORY_PREFIX: &str = "m";

/// Token prefix for a file mount.
pub const FILE_PREFIX: &str = "f";

/// Token prefix for a reference to another component's directory.
pub const COMPONENT_DIRECTORY_PREFIX: &str = "c";

/// Token prefix for a reference to another component's file.
pub const COMPONENT_FILE_PREFIX: &str = "cf";

/// First application specification version that carries a compose list.
pub const COMPOSE_SPEC_VERSION: u32 = 4;

/// Mount type emitted for every modern mount record.
pub const BIND_MOUNT_TYPE: &str = "bind";

/// Bind propagation emitted for every modern mount record.
pub const BIND_PROPAGATION: &str = "rprivate";
