//! Domain primitive types shared by the parser, volume constructor, and policy helpers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Replication marker carried on the primary mount.
///
/// The markers are consumed by the data-synchronization subsystem; this
/// workspace only parses and forwards them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReplicationFlag {
    /// `r` marker.
    #[serde(rename = "r")]
    R,
    /// `g` marker. Also forces a non-restarting container.
    #[serde(rename = "g")]
    G,
    /// `s` marker.
    #[serde(rename = "s")]
    S,
}

impl ReplicationFlag {
    /// All recognized markers, in canonical order.
    pub const ALL: [Self; 3] = [Self::R, Self::G, Self::S];

    /// Maps a marker character to its flag.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::R),
            'g' => Some(Self::G),
            's' => Some(Self::S),
            _ => None,
        }
    }

    /// Returns the marker character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::R => 'r',
            Self::G => 'g',
            Self::S => 's',
        }
    }
}

impl fmt::Display for ReplicationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Ordered set of replication markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountFlags(BTreeSet<ReplicationFlag>);

impl MountFlags {
    /// Creates an empty flag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Recognizes markers by substring match on a raw flag segment.
    ///
    /// Characters outside `{r, g, s}` do not contribute a flag.
    #[must_use]
    pub fn from_segment(segment: &str) -> Self {
        Self(segment.chars().filter_map(ReplicationFlag::from_char).collect())
    }

    /// Returns true if `flag` is present.
    #[must_use]
    pub fn contains(&self, flag: ReplicationFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Returns true if no flag is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct flags present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<ReplicationFlag> for MountFlags {
    fn from_iter<I: IntoIterator<Item = ReplicationFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for MountFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.0 {
            write!(f, "{flag}")?;
        }
        Ok(())
    }
}

/// Container restart policy handed to the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Never restart automatically.
    No,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
}

impl RestartPolicy {
    /// Returns the runtime's name for this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One component of a composed application, as found in the registration record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Component name, unique within the application.
    pub name: String,
    /// Raw mount specification.
    #[serde(default)]
    pub container_data: String,
}

impl ComponentSpec {
    /// Creates a component specification.
    #[must_use]
    pub fn new(name: impl Into<String>, container_data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_data: container_data.into(),
        }
    }
}

/// Application registration record, reduced to the fields mount compilation reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Application name.
    pub name: String,
    /// Specification version. Version 4 and later carry a compose list.
    pub version: u32,
    /// Owner identity.
    #[serde(default)]
    pub owner: String,
    /// Ordered components of a composed application.
    #[serde(default)]
    pub compose: Vec<ComponentSpec>,
    /// Mount specification of a single-component application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_data: Option<String>,
}

impl AppSpec {
    /// Returns true for composed (multi-component) applications.
    #[must_use]
    pub const fn is_composed(&self) -> bool {
        self.version >= crate::constants::COMPOSE_SPEC_VERSION
    }

    /// Number of components addressable by index.
    #[must_use]
    pub fn component_count(&self) -> usize {
        if self.is_composed() {
            self.compose.len()
        } else {
            1
        }
    }

    /// Position of the component named `name` in the compose list.
    #[must_use]
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.compose.iter().position(|c| c.name == name)
    }

    /// Composite identifier of the component at `index`.
    ///
    /// Composed applications yield `"<component>_<app>"`; legacy applications
    /// only have index 0, whose identifier is the application name.
    #[must_use]
    pub fn component_identifier(&self, index: usize) -> Option<String> {
        if self.is_composed() {
            self.compose
                .get(index)
                .map(|c| component_identifier(&c.name, &self.name))
        } else {
            (index == 0).then(|| self.name.clone())
        }
    }
}

/// Identifier of a component of a composed application: `"<component>_<app>"`.
#[must_use]
pub fn component_identifier(component: &str, app: &str) -> String {
    format!("{component}_{app}")
}
