//! Body registry: stable ids → simulation bodies and their visual assets.
//!
//! The registry owns the [`PhysicsWorld`]; registering a body inserts it into
//! the world and unregistering removes it synchronously, together with its
//! tether, cling attachments and any drag binding.
//!
//! Visual assets load asynchronously. Every registration gets a fresh
//! generation number and asset requests carry it, so a load that completes
//! after its body was removed (or after the id was reused) is discarded.

use bytes::Bytes;
use log::{debug, trace};
use std::collections::HashMap;

use crate::error::RegistryError;
use crate::physics::{BodyHandle, BodyParams, BodyState, PhysicsWorld};
use crate::types::Vec2;

/// Loaded image bytes for a body.
#[derive(Debug, Clone)]
pub struct VisualAsset {
    pub path: String,
    pub data: Bytes,
}

/// A pending asset load, handed to whoever fetches images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTicket {
    pub body_id: String,
    pub generation: u64,
    pub path: String,
}

#[derive(Debug)]
enum AssetSlot {
    None,
    Pending,
    Ready(VisualAsset),
    Failed,
}

#[derive(Debug)]
struct Entry {
    handle: BodyHandle,
    generation: u64,
    texture: Option<String>,
    asset: AssetSlot,
}

pub struct BodyRegistry {
    physics: PhysicsWorld,
    entries: HashMap<String, Entry>,
    by_handle: HashMap<BodyHandle, String>,
    requests: Vec<AssetTicket>,
    next_generation: u64,
}

impl BodyRegistry {
    pub fn new(physics: PhysicsWorld) -> Self {
        Self {
            physics,
            entries: HashMap::new(),
            by_handle: HashMap::new(),
            requests: Vec::new(),
            next_generation: 1,
        }
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Create a body under `id`, optionally requesting its texture.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        params: BodyParams,
        texture: Option<String>,
    ) -> Result<BodyHandle, RegistryError> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let handle = self.physics.insert(params);
        let generation = self.next_generation;
        self.next_generation += 1;

        let asset = match &texture {
            Some(path) => {
                self.requests.push(AssetTicket {
                    body_id: id.clone(),
                    generation,
                    path: path.clone(),
                });
                AssetSlot::Pending
            }
            None => AssetSlot::None,
        };

        trace!("Registered body '{}' as {}", id, handle);
        self.by_handle.insert(handle, id.clone());
        self.entries.insert(
            id,
            Entry {
                handle,
                generation,
                texture,
                asset,
            },
        );
        Ok(handle)
    }

    /// Remove a body from the world and drop its asset.
    pub fn unregister(&mut self, id: &str) -> Option<BodyState> {
        let entry = self.entries.remove(id)?;
        self.by_handle.remove(&entry.handle);
        self.requests
            .retain(|t| !(t.body_id == id && t.generation == entry.generation));
        self.physics.remove(entry.handle)
    }

    /// Remove every body, tether and latch.
    pub fn clear(&mut self) {
        debug!("Clearing {} registered bodies", self.entries.len());
        self.entries.clear();
        self.by_handle.clear();
        self.requests.clear();
        self.physics.clear();
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&BodyState> {
        let entry = self.entries.get(id)?;
        self.physics.get(entry.handle)
    }

    /// Set the velocity of a registered dynamic body.
    pub fn set_velocity(&mut self, id: &str, velocity: Vec2) -> bool {
        match self.entries.get(id) {
            Some(entry) => self.physics.set_velocity(entry.handle, velocity),
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn handle_of(&self, id: &str) -> Option<BodyHandle> {
        self.entries.get(id).map(|e| e.handle)
    }

    pub fn id_of(&self, handle: BodyHandle) -> Option<&str> {
        self.by_handle.get(&handle).map(String::as_str)
    }

    /// Registered bodies tagged with `group`, in creation order.
    pub fn all_with_group<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a BodyState)> + 'a {
        self.iter().filter(move |(_, b)| b.metadata.is_group(group))
    }

    pub fn ids_with_group(&self, group: &str) -> Vec<String> {
        self.all_with_group(group)
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Every registered body in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BodyState)> + '_ {
        self.physics
            .bodies()
            .filter_map(|(h, b)| self.by_handle.get(&h).map(|id| (id.as_str(), b)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    pub fn texture(&self, id: &str) -> Option<&str> {
        self.entries.get(id)?.texture.as_deref()
    }

    pub fn asset(&self, id: &str) -> Option<&VisualAsset> {
        match &self.entries.get(id)?.asset {
            AssetSlot::Ready(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn asset_pending(&self, id: &str) -> bool {
        matches!(
            self.entries.get(id).map(|e| &e.asset),
            Some(AssetSlot::Pending)
        )
    }

    /// Asset loads requested since the last call.
    pub fn take_asset_requests(&mut self) -> Vec<AssetTicket> {
        std::mem::take(&mut self.requests)
    }

    /// Deliver a finished load. Returns `false` when the ticket is stale.
    pub fn resolve_asset(&mut self, ticket: &AssetTicket, result: Result<Bytes, String>) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.body_id) else {
            trace!("Discarding asset for removed body '{}'", ticket.body_id);
            return false;
        };
        if entry.generation != ticket.generation {
            trace!("Discarding stale asset for '{}'", ticket.body_id);
            return false;
        }

        entry.asset = match result {
            Ok(data) => AssetSlot::Ready(VisualAsset {
                path: ticket.path.clone(),
                data,
            }),
            Err(e) => {
                debug!("Asset '{}' failed to load: {}", ticket.path, e);
                AssetSlot::Failed
            }
        };
        true
    }
}
