//! Layout planning unit tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tidepool::error::ConfigError;
    use tidepool::layout::{plan_body, plan_frame, plan_layout, shape_from};
    use tidepool::physics::filter::{CollisionFilter, CATEGORY_CEILING, CATEGORY_ROPE};
    use tidepool::physics::{PhysicsConfig, Shape};
    use tidepool::protocol::BodyDescriptor;
    use tidepool::types::{FrameConfig, ZoneConfig};

    fn desc(value: serde_json::Value) -> BodyDescriptor {
        serde_json::from_value(value).unwrap()
    }

    fn cfg() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    // -----------------------------------------------------------------------
    // Shapes
    // -----------------------------------------------------------------------

    #[test]
    fn shapes_need_positive_sizes() {
        assert_eq!(
            shape_from("a", "circle", Some(4.0), None, None).unwrap(),
            Shape::Circle { radius: 4.0 }
        );
        assert!(matches!(
            shape_from("a", "circle", Some(0.0), None, None),
            Err(ConfigError::InvalidBody { .. })
        ));
        assert!(matches!(
            shape_from("a", "rectangle", None, Some(3.0), None),
            Err(ConfigError::InvalidBody { .. })
        ));
        match shape_from("tri", "polygon", None, None, None) {
            Err(ConfigError::UnknownShape { id, kind }) => {
                assert_eq!(id, "tri");
                assert_eq!(kind, "polygon");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    #[test]
    fn dynamic_bodies_get_the_default_tether() {
        let body = plan_body(
            &desc(json!({ "id": "crab_1", "type": "circle", "x": 100, "y": 200, "radius": 20 })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(body.tether, Some(cfg().tether_max_stretch));
        assert_eq!(body.params.label, "crab_1");
        assert_eq!(body.params.position.x, 100.0);
    }

    #[test]
    fn tether_limit_overrides() {
        let limited = plan_body(
            &desc(json!({
                "id": "a", "type": "circle", "x": 0, "y": 0, "radius": 5,
                "metadata": { "constraintLimit": 40, "clingToOrigin": true }
            })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(limited.tether, Some(40.0));

        let clinging = plan_body(
            &desc(json!({
                "id": "b", "type": "circle", "x": 0, "y": 0, "radius": 5,
                "metadata": { "clingToOrigin": true }
            })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(clinging.tether, Some(cfg().cling_to_origin_stretch));

        let free = plan_body(
            &desc(json!({
                "id": "c", "type": "circle", "x": 0, "y": 0, "radius": 5,
                "metadata": { "tethered": false }
            })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(free.tether, None);
    }

    #[test]
    fn static_and_sensor_bodies_are_untethered() {
        let rock = plan_body(
            &desc(json!({
                "id": "rock", "type": "rectangle", "x": 0, "y": 0, "width": 10, "height": 10,
                "options": { "isStatic": true }
            })),
            &cfg(),
        )
        .unwrap();
        assert!(rock.params.is_static);
        assert_eq!(rock.tether, None);

        let pool = plan_body(
            &desc(json!({
                "id": "pool", "type": "circle", "x": 0, "y": 0, "radius": 30,
                "options": { "isSensor": true }
            })),
            &cfg(),
        )
        .unwrap();
        assert!(pool.params.is_sensor);
        assert!(pool.params.is_static);
        assert_eq!(pool.params.filter, CollisionFilter::sensor());
        assert_eq!(pool.tether, None);
    }

    #[test]
    fn options_and_texture_carry_through() {
        let body = plan_body(
            &desc(json!({
                "id": "vine", "type": "rectangle", "x": "12.5", "y": "40",
                "width": 4, "height": 90,
                "options": {
                    "label": "Vine",
                    "angle": 0.5,
                    "restitution": 0.3,
                    "render": { "sprite": { "texture": "/img/vine.png", "xScale": 0.5 } }
                },
                "metadata": { "isRope": true, "group": "vine" }
            })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(body.params.label, "Vine");
        assert_eq!(body.params.position.x, 12.5);
        assert_eq!(body.params.angle, 0.5);
        assert_eq!(body.params.restitution, 0.3);
        assert_eq!(body.params.filter, CollisionFilter::rope());
        assert_eq!(body.params.filter.mask & CATEGORY_CEILING, 0);
        assert_eq!(body.texture.as_deref(), Some("/img/vine.png"));
        assert_eq!(body.params.metadata.group.as_deref(), Some("vine"));
    }

    #[test]
    fn authored_filter_overrides_the_layer() {
        let body = plan_body(
            &desc(json!({
                "id": "a", "type": "circle", "x": 0, "y": 0, "radius": 5,
                "metadata": { "isRope": true },
                "options": { "collisionFilter": { "mask": 1 } }
            })),
            &cfg(),
        )
        .unwrap();
        assert_eq!(body.params.filter.category, CATEGORY_ROPE);
        assert_eq!(body.params.filter.mask, 1);
    }

    #[test]
    fn layout_rejects_duplicate_ids() {
        let descs = vec![
            desc(json!({ "id": "a", "type": "circle", "x": 0, "y": 0, "radius": 5 })),
            desc(json!({ "id": "a", "type": "circle", "x": 9, "y": 0, "radius": 5 })),
        ];
        let err = plan_layout(&descs, &cfg()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBodyId(id) if id == "a"));
    }

    #[test]
    fn layout_fails_on_first_bad_body() {
        let descs = vec![
            desc(json!({ "id": "a", "type": "circle", "x": 0, "y": 0, "radius": 5 })),
            desc(json!({ "id": "b", "type": "hexagon", "x": 0, "y": 0 })),
        ];
        assert!(matches!(
            plan_layout(&descs, &cfg()),
            Err(ConfigError::UnknownShape { .. })
        ));
    }

    #[test]
    fn non_numeric_strings_fail_to_parse() {
        let parsed = serde_json::from_value::<BodyDescriptor>(json!({
            "id": "a", "type": "circle", "x": "left", "y": 0, "radius": 5
        }));
        assert!(parsed.is_err());
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    #[test]
    fn frame_builds_walls_around_the_screen() {
        let frame = FrameConfig::default();
        let plan = plan_frame(&frame);
        let labels: Vec<&str> = plan.walls.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["Ground", "Ceiling", "LeftWall", "RightWall"]);
        assert!(plan.walls.iter().all(|w| w.is_static));

        let ceiling = &plan.walls[1];
        assert_eq!(ceiling.filter, CollisionFilter::ceiling());
        assert!(!ceiling.filter.can_collide(&CollisionFilter::rope()));

        let right = &plan.walls[3];
        assert!(right.position.x > frame.width);
    }

    #[test]
    fn frame_zones_keep_group_and_sensor_flag() {
        let frame = FrameConfig {
            zones: vec![
                ZoneConfig {
                    id: "pool".into(),
                    group: Some("POOL".into()),
                    x: 100.0,
                    y: 100.0,
                    width: 50.0,
                    height: 20.0,
                    sensor: true,
                },
                ZoneConfig {
                    id: "panel".into(),
                    group: None,
                    x: 400.0,
                    y: 100.0,
                    width: 50.0,
                    height: 20.0,
                    sensor: false,
                },
            ],
            ..FrameConfig::default()
        };
        let plan = plan_frame(&frame);
        assert_eq!(plan.zones.len(), 2);

        let pool = &plan.zones[0];
        assert_eq!(pool.id, "pool");
        assert!(pool.params.is_sensor);
        assert_eq!(pool.params.metadata.group.as_deref(), Some("POOL"));
        assert_eq!(pool.tether, None);

        let panel = &plan.zones[1];
        assert!(panel.params.is_static);
        assert!(!panel.params.is_sensor);
    }
}
