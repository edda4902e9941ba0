//! Turning layout descriptors into body parameters.
//!
//! Everything here is pure validation / construction; nothing touches the
//! world, so a room can be fully checked before the current one is cleared.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::physics::{BodyParams, CollisionFilter, PhysicsConfig, Shape};
use crate::protocol::{BodyDescriptor, BodyMetadata, BodyOptions};
use crate::types::{FrameConfig, Vec2};

/// A validated layout entry, ready to register.
#[derive(Debug, Clone)]
pub struct LayoutBody {
    pub id: String,
    pub params: BodyParams,
    pub texture: Option<String>,
    /// Tether max stretch, `None` for untethered bodies.
    pub tether: Option<f32>,
}

/// Static fixtures installed with every room.
#[derive(Debug, Clone)]
pub struct FramePlan {
    /// Ground, ceiling and walls; simulated but never registered.
    pub walls: Vec<BodyParams>,
    /// Named fixtures (panels, sensor zones), registered under their id.
    pub zones: Vec<LayoutBody>,
}

pub fn shape_from(
    id: &str,
    kind: &str,
    radius: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
) -> Result<Shape, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBody {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    match kind {
        "circle" => match radius {
            Some(r) if r > 0.0 => Ok(Shape::Circle { radius: r }),
            _ => Err(invalid("circle needs a positive radius")),
        },
        "rectangle" => match (width, height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok(Shape::Rectangle {
                width: w,
                height: h,
            }),
            _ => Err(invalid("rectangle needs a positive width and height")),
        },
        other => Err(ConfigError::UnknownShape {
            id: id.to_string(),
            kind: other.to_string(),
        }),
    }
}

/// Body parameters from an options bag and metadata.
pub fn params_from(
    label: &str,
    shape: Shape,
    position: Vec2,
    options: &BodyOptions,
    metadata: &BodyMetadata,
) -> BodyParams {
    let mut params = BodyParams::new(options.label.as_deref().unwrap_or(label), shape, position)
        .with_metadata(metadata.clone());

    if options.is_sensor {
        params = params.sensor();
    } else if options.is_static {
        params = params.fixed();
    }
    if metadata.is_rope && !options.is_sensor {
        params.filter = CollisionFilter::rope();
    }
    params.filter = params.filter.with_overrides(options.collision_filter.as_ref());

    if let Some(angle) = options.angle {
        params.angle = angle;
    }
    if let Some(density) = options.density {
        params.density = density;
    }
    if let Some(restitution) = options.restitution {
        params.restitution = restitution;
    }
    if let Some(friction) = options.friction {
        params.friction = friction;
    }
    if let Some(air) = options.friction_air {
        params.friction_air = air;
    }
    params
}

pub fn plan_body(desc: &BodyDescriptor, physics: &PhysicsConfig) -> Result<LayoutBody, ConfigError> {
    let shape = shape_from(&desc.id, &desc.kind, desc.radius, desc.width, desc.height)?;
    let params = params_from(
        &desc.id,
        shape,
        Vec2::new(desc.x, desc.y),
        &desc.options,
        &desc.metadata,
    );

    let meta = &desc.metadata;
    let tether = if params.is_static || params.is_sensor || meta.tethered == Some(false) {
        None
    } else {
        Some(meta.constraint_limit.unwrap_or(if meta.cling_to_origin {
            physics.cling_to_origin_stretch
        } else {
            physics.tether_max_stretch
        }))
    };

    Ok(LayoutBody {
        id: desc.id.clone(),
        params,
        texture: desc.options.texture().map(str::to_string),
        tether,
    })
}

/// Validate a whole layout. Fails on the first bad entry or duplicate id.
pub fn plan_layout(
    descs: &[BodyDescriptor],
    physics: &PhysicsConfig,
) -> Result<Vec<LayoutBody>, ConfigError> {
    let mut seen = HashSet::new();
    descs
        .iter()
        .map(|desc| {
            if !seen.insert(desc.id.as_str()) {
                return Err(ConfigError::DuplicateBodyId(desc.id.clone()));
            }
            plan_body(desc, physics)
        })
        .collect()
}

pub fn plan_frame(frame: &FrameConfig) -> FramePlan {
    let (w, h, t) = (frame.width, frame.height, frame.wall_thickness);
    let rect = |label: &str, x: f32, y: f32, width: f32, height: f32| {
        BodyParams::new(label, Shape::Rectangle { width, height }, Vec2::new(x, y)).fixed()
    };

    let walls = vec![
        rect("Ground", w / 2.0, frame.ground_y, w, frame.ground_height),
        rect("Ceiling", w / 2.0, -t / 2.0, w, t).with_filter(CollisionFilter::ceiling()),
        rect("LeftWall", -t / 2.0, h / 2.0, t, h * 4.0),
        rect("RightWall", w + t / 2.0, h / 2.0, t, h * 4.0),
    ];

    let zones = frame
        .zones
        .iter()
        .map(|z| {
            let metadata = BodyMetadata {
                group: z.group.clone(),
                ..Default::default()
            };
            let params = rect(&z.id, z.x, z.y, z.width, z.height).with_metadata(metadata);
            LayoutBody {
                id: z.id.clone(),
                params: if z.sensor { params.sensor() } else { params },
                texture: None,
                tether: None,
            }
        })
        .collect();

    FramePlan { walls, zones }
}
