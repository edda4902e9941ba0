//! Room sources.
//!
//! A room is two JSON documents: the body layout (`<room>.json`) and the
//! interaction rules (`<room>.interactions.json`). Sources only fetch and
//! parse; validation happens when the service loads the room.

use std::collections::HashMap;
use std::future::Future;

use crate::error::LoadError;
use crate::protocol::{BodyDescriptor, RuleDescriptor};

pub const LAYOUT_SUFFIX: &str = ".json";
pub const RULES_SUFFIX: &str = ".interactions.json";

/// A parsed, not yet validated room.
#[derive(Debug, Clone)]
pub struct RoomData {
    pub name: String,
    pub bodies: Vec<BodyDescriptor>,
    pub rules: Vec<RuleDescriptor>,
    /// md5 over both source documents.
    pub digest: String,
}

impl RoomData {
    /// Parse a room from its two documents. A missing rule document means
    /// the room has no rules.
    pub fn from_json_strs(
        name: &str,
        layout: &str,
        rules: Option<&str>,
    ) -> Result<RoomData, LoadError> {
        let bodies = serde_json::from_str(layout).map_err(|source| LoadError::Json {
            room: name.to_string(),
            file: "layout",
            source,
        })?;
        let parsed_rules = match rules {
            Some(text) => serde_json::from_str(text).map_err(|source| LoadError::Json {
                room: name.to_string(),
                file: "interactions",
                source,
            })?,
            None => Vec::new(),
        };

        let mut both = layout.as_bytes().to_vec();
        both.extend_from_slice(rules.unwrap_or_default().as_bytes());

        Ok(RoomData {
            name: name.to_string(),
            bodies,
            rules: parsed_rules,
            digest: format!("{:x}", md5::compute(&both)),
        })
    }
}

/// Anything that can produce a room by name.
pub trait RoomSource: Send + Sync {
    fn fetch(&self, room: &str) -> impl Future<Output = Result<RoomData, LoadError>> + Send;
}

/// Rooms held in memory; used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoomSource {
    rooms: HashMap<String, (String, Option<String>)>,
}

impl MemoryRoomSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        room: impl Into<String>,
        layout: impl Into<String>,
        rules: Option<String>,
    ) -> &mut Self {
        self.rooms.insert(room.into(), (layout.into(), rules));
        self
    }

    pub fn with_room(mut self, room: &str, layout: &str, rules: &str) -> Self {
        self.insert(room, layout, Some(rules.to_string()));
        self
    }

    fn load(&self, room: &str) -> Result<RoomData, LoadError> {
        let (layout, rules) = self
            .rooms
            .get(room)
            .ok_or_else(|| LoadError::NotFound(room.to_string()))?;
        RoomData::from_json_strs(room, layout, rules.as_deref())
    }
}

impl RoomSource for MemoryRoomSource {
    fn fetch(&self, room: &str) -> impl Future<Output = Result<RoomData, LoadError>> + Send {
        std::future::ready(self.load(room))
    }
}

#[cfg(feature = "runtime")]
pub use fs::FsRoomSource;

#[cfg(feature = "runtime")]
mod fs {
    use std::io::ErrorKind;
    use std::path::PathBuf;

    use log::debug;

    use super::*;

    /// Reads `<root>/<room>.json` and `<root>/<room>.interactions.json`.
    #[derive(Debug, Clone)]
    pub struct FsRoomSource {
        root: PathBuf,
    }

    impl FsRoomSource {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        pub fn root(&self) -> &std::path::Path {
            &self.root
        }
    }

    impl RoomSource for FsRoomSource {
        fn fetch(&self, room: &str) -> impl Future<Output = Result<RoomData, LoadError>> + Send {
            let layout_path = self.root.join(format!("{room}{LAYOUT_SUFFIX}"));
            let rules_path = self.root.join(format!("{room}{RULES_SUFFIX}"));
            let room = room.to_string();

            async move {
                let layout = match tokio::fs::read_to_string(&layout_path).await {
                    Ok(text) => text,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(LoadError::NotFound(room));
                    }
                    Err(source) => return Err(LoadError::Io { room, source }),
                };
                let rules = match tokio::fs::read_to_string(&rules_path).await {
                    Ok(text) => Some(text),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!("Room '{}' has no interactions file", room);
                        None
                    }
                    Err(source) => return Err(LoadError::Io { room, source }),
                };
                RoomData::from_json_strs(&room, &layout, rules.as_deref())
            }
        }
    }
}
