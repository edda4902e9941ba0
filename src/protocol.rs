//! Room file formats and outbound room events.
//!
//! This module owns **every structure that crosses the crate boundary**:
//! the two JSON files describing a room (body layout and interaction rules)
//! and the events / snapshots handed to the renderer and other subsystems.
//!
//! ## Design rules
//!
//! 1. Room files use camelCase JSON, matching the authoring tools.
//! 2. Numeric layout fields accept numbers or numeric strings.
//! 3. Free-form bags (`options`, `metadata`) keep unknown keys so a
//!    descriptor survives a parse / serialise round trip unchanged.
//! 4. Every outbound event is wrapped in [`RoomEvent`] with `room` and `frame`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Vec2;

// ---------------------------------------------------------------------------
// Common envelope
// ---------------------------------------------------------------------------

/// Every outbound message is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent<T> {
    pub room: String,
    pub frame: u64,
    pub payload: T,
}

impl<T> RoomEvent<T> {
    pub fn new(room: impl Into<String>, frame: u64, payload: T) -> Self {
        Self {
            room: room.into(),
            frame,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient numbers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    Text(String),
}

impl NumberOrString {
    fn into_f32<E: serde::de::Error>(self) -> Result<f32, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f32>()
                .map_err(|_| E::custom(format!("'{}' is not a number", s))),
        }
    }
}

fn lenient_f32<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
    NumberOrString::deserialize(d)?.into_f32()
}

fn lenient_opt_f32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f32>, D::Error> {
    Option::<NumberOrString>::deserialize(d)?
        .map(NumberOrString::into_f32)
        .transpose()
}

// ---------------------------------------------------------------------------
// Body layout file  (<room>.json)
// ---------------------------------------------------------------------------

/// One entry of a room's body layout file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDescriptor {
    pub id: String,
    /// `circle` or `rectangle`; anything else fails the room load.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "lenient_f32")]
    pub x: f32,
    #[serde(deserialize_with = "lenient_f32")]
    pub y: f32,
    #[serde(default, deserialize_with = "lenient_opt_f32", skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, deserialize_with = "lenient_opt_f32", skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, deserialize_with = "lenient_opt_f32", skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub options: BodyOptions,
    #[serde(default)]
    pub metadata: BodyMetadata,
}

/// Physical options bag of a body descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyOptions {
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_sensor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restitution: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_air: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_filter: Option<FilterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderOptions>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BodyOptions {
    /// Sprite path under `render.sprite.texture`, if any.
    pub fn texture(&self) -> Option<&str> {
        self.render
            .as_ref()
            .and_then(|r| r.sprite.as_ref())
            .and_then(|s| s.texture.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RenderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<SpriteOptions>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpriteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Gameplay metadata attached to a body. `group` drives rule matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Multiplies rotational inertia by 40.
    #[serde(default)]
    pub resist_rotation: bool,
    /// `Some(false)` forbids pointer grabs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickable: Option<bool>,
    /// Places the body on the rope/vine collision layer.
    #[serde(default)]
    pub is_rope: bool,
    /// Room clock (ms) at which a timed body appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_time: Option<f64>,
    /// Tether max stretch override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_limit: Option<f32>,
    #[serde(default)]
    pub cling_to_origin: bool,
    /// `Some(false)` skips the spawn-point tether.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tethered: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BodyMetadata {
    pub fn with_group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Default::default()
        }
    }

    pub fn is_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }
}

// ---------------------------------------------------------------------------
// Interaction rule file  (<room>.interactions.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Collision,
    Cluster,
    Update,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::Collision => "collision",
            TriggerKind::Cluster => "cluster",
            TriggerKind::Update => "update",
        }
    }
}

/// One raw interaction rule, exactly as authored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescriptor {
    pub trigger: TriggerKind,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionDescriptor>,
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<PopupDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_tolerance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub still_threshold: Option<f32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConditionDescriptor {
    #[serde(rename = "type")]
    pub metric: Metric,
    pub operator: Comparator,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    /// Magnitude of the difference of the two velocity vectors.
    ImpactSpeed,
    /// Vertical velocity of the acting body.
    VelocityY,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Comparator {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
}

impl Comparator {
    pub fn compare(self, metric: f32, value: f32) -> bool {
        match self {
            Comparator::Ge => metric >= value,
            Comparator::Gt => metric > value,
            Comparator::Le => metric <= value,
            Comparator::Lt => metric < value,
            Comparator::Eq => metric == value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopupDescriptor {
    pub text: String,
    #[serde(default)]
    pub offset: Vec2,
}

/// Raw action, tagged by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionDescriptor {
    RemoveSelf,
    RemoveOther,
    Spawn(SpawnDescriptor),
    Cling(ClingDescriptor),
    RemoveGroup,
    Seek(SeekDescriptor),
    ExitPath(ExitPathDescriptor),
}

impl ActionDescriptor {
    pub fn name(&self) -> &'static str {
        match self {
            ActionDescriptor::RemoveSelf => "removeSelf",
            ActionDescriptor::RemoveOther => "removeOther",
            ActionDescriptor::Spawn(_) => "spawn",
            ActionDescriptor::Cling(_) => "cling",
            ActionDescriptor::RemoveGroup => "removeGroup",
            ActionDescriptor::Seek(_) => "seek",
            ActionDescriptor::ExitPath(_) => "exitPath",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpawnAt {
    #[default]
    #[serde(rename = "self")]
    Actor,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpawnDescriptor {
    /// Id template; supports `{id}`, `{timestamp}`, `{tick}` and `{seq}`.
    pub new_id: String,
    pub shape: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub options: BodyOptions,
    #[serde(default)]
    pub metadata: BodyMetadata,
    /// Texture template; same placeholders as `new_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default)]
    pub at: SpawnAt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClingDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeekDescriptor {
    /// Group whose nearest member is chased.
    pub target: String,
    pub speed: f32,
    #[serde(default = "default_stop_distance")]
    pub stop_distance: f32,
    /// The body is kept at or above this y (screen coordinates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_y: Option<f32>,
}

fn default_stop_distance() -> f32 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExitPathDescriptor {
    /// Horizontal velocity, units per reference frame.
    pub drift_x: f32,
    /// Peak vertical displacement of the oscillation.
    #[serde(default)]
    pub amplitude: f32,
    /// Oscillation frequency in Hz.
    #[serde(default)]
    pub frequency: f32,
    /// Disable collisions while exiting so walls do not block the path.
    #[serde(default = "default_ghost")]
    pub ghost: bool,
}

fn default_ghost() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// A floating text appeared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopupShown {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// A collision rule with `emitEvent` matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleEventFired {
    pub name: String,
    pub body_id: String,
    /// Index of the rule in the room's rule file.
    pub rule: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodySpawned {
    pub body_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyRemoved {
    pub body_id: String,
}

// ---------------------------------------------------------------------------
// Renderer snapshot
// ---------------------------------------------------------------------------

/// Per-body draw state for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyTransform {
    pub body_id: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    /// The visual asset has finished loading.
    pub asset_ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupView {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// 1.0 when fresh, fading to 0.0 at the end of its lifetime.
    pub alpha: f32,
}

/// Everything the renderer needs to draw one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: Option<String>,
    pub frame: u64,
    pub bodies: Vec<BodyTransform>,
    pub popups: Vec<PopupView>,
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

/// Topic names used when outbound events are published.
pub mod subjects {
    pub const ROOM_LOADED: &str = "room.loaded";

    pub const POPUP_SHOWN: &str = "room.popup";
    pub const RULE_EVENT: &str = "room.rule.event";

    pub const BODY_SPAWNED: &str = "room.body.spawned";
    pub const BODY_REMOVED: &str = "room.body.removed";
    pub const TETHER_DETACHED: &str = "room.tether.detached";
}
