//! PhysicsWorld unit tests

#[cfg(test)]
mod tests {
    use tidepool::physics::filter::{CATEGORY_SENSOR, POINTER_MASK};
    use tidepool::physics::{
        BodyParams, CollisionFilter, PhysicsConfig, PhysicsWorld, Shape, REFERENCE_FRAME_MS,
    };
    use tidepool::protocol::BodyMetadata;
    use tidepool::types::Vec2;

    const DT: f32 = REFERENCE_FRAME_MS;

    fn zero_g() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig {
            gravity: Vec2::zero(),
            ..Default::default()
        })
    }

    fn ball(x: f32, y: f32, r: f32) -> BodyParams {
        BodyParams::new("ball", Shape::Circle { radius: r }, Vec2::new(x, y))
    }

    // -----------------------------------------------------------------------
    // Speed cap
    // -----------------------------------------------------------------------

    #[test]
    fn speed_is_capped_before_integration() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 10.0));
        assert!(world.set_velocity(h, Vec2::new(400.0, 0.0)));

        let before = world.get(h).unwrap().position;
        world.advance(DT);
        let body = world.get(h).unwrap();

        assert!(body.speed() <= 50.0 + 1e-3, "speed was {}", body.speed());
        assert!(body.position.x - before.x <= 50.0 + 1e-3);
    }

    #[test]
    fn static_bodies_never_move() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let h = world.insert(ball(10.0, 10.0, 5.0).fixed());
        for _ in 0..10 {
            world.advance(DT);
        }
        assert_eq!(world.get(h).unwrap().position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn gravity_pulls_down() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        let h = world.insert(ball(100.0, 100.0, 10.0));
        for _ in 0..10 {
            world.advance(DT);
        }
        assert!(world.get(h).unwrap().position.y > 100.0);
    }

    // -----------------------------------------------------------------------
    // Tethers
    // -----------------------------------------------------------------------

    #[test]
    fn overstretched_tether_detaches_same_tick() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 10.0));
        world.add_tether(h, 15.0).unwrap();

        assert!(world.set_position(h, Vec2::new(200.0, 100.0)));
        let report = world.advance(DT);

        assert_eq!(report.detached_tethers, vec![h]);
        assert!(world.tether_of(h).is_none());
        assert!(world.tethers().is_empty());
    }

    #[test]
    fn tether_within_limit_holds_and_pulls_back() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 10.0));
        world.add_tether(h, 15.0).unwrap();

        assert!(world.set_position(h, Vec2::new(110.0, 100.0)));
        let report = world.advance(DT);

        assert!(report.detached_tethers.is_empty());
        assert!(world.tether_of(h).is_some());
        assert!(world.get(h).unwrap().position.x < 110.0);
    }

    #[test]
    fn static_bodies_are_never_tethered() {
        let mut world = zero_g();
        let h = world.insert(ball(0.0, 0.0, 5.0).fixed());
        assert!(world.add_tether(h, 15.0).is_none());
    }

    #[test]
    fn removing_a_body_drops_its_tether() {
        let mut world = zero_g();
        let h = world.insert(ball(0.0, 0.0, 5.0));
        world.add_tether(h, 15.0).unwrap();
        assert!(world.remove(h).is_some());
        assert!(world.tethers().is_empty());
        assert!(world.get(h).is_none());
    }

    // -----------------------------------------------------------------------
    // Collisions & layers
    // -----------------------------------------------------------------------

    #[test]
    fn overlapping_bodies_report_collision_start_once() {
        let mut world = zero_g();
        let a = world.insert(ball(100.0, 100.0, 20.0).fixed());
        let b = world.insert(ball(130.0, 100.0, 20.0));

        let first = world.advance(DT);
        assert_eq!(first.collisions.len(), 1);
        assert_eq!((first.collisions[0].a, first.collisions[0].b), (a, b));
        // Normal points from A to B.
        assert!(first.collisions[0].contact.normal.x > 0.0);

        // Pushed apart but still touching: no second start event.
        let second = world.advance(DT);
        assert!(second.collisions.is_empty());
        assert!(world.get(b).unwrap().position.x > 130.0);
    }

    #[test]
    fn collision_start_carries_approach_velocity() {
        let mut world = zero_g();
        let rock = world.insert(ball(200.0, 100.0, 20.0).fixed());
        let crab = world.insert(ball(145.0, 100.0, 20.0));
        world.set_velocity(crab, Vec2::new(20.0, 0.0));

        let mut event = None;
        for _ in 0..5 {
            let report = world.advance(DT);
            if let Some(e) = report.collisions.into_iter().next() {
                event = Some(e);
                break;
            }
        }
        let event = event.expect("crab never reached the rock");
        assert_eq!((event.a, event.b), (rock, crab));
        assert_eq!(event.velocity_of(rock), Some(Vec2::zero()));

        let approach = event.velocity_of(crab).unwrap();
        assert!(approach.x > 19.0, "approach speed was {}", approach.x);
        assert!(world.get(crab).unwrap().velocity.x < approach.x);
    }

    #[test]
    fn two_static_bodies_never_collide() {
        let mut world = zero_g();
        world.insert(ball(100.0, 100.0, 20.0).fixed());
        world.insert(ball(110.0, 100.0, 20.0).fixed());
        assert!(world.advance(DT).collisions.is_empty());
    }

    #[test]
    fn sensors_report_but_do_not_push() {
        let mut world = zero_g();
        let zone = BodyParams::new(
            "zone",
            Shape::Rectangle {
                width: 200.0,
                height: 50.0,
            },
            Vec2::new(100.0, 100.0),
        )
        .sensor();
        world.insert(zone);
        let h = world.insert(ball(100.0, 100.0, 10.0));

        let report = world.advance(DT);
        assert_eq!(report.collisions.len(), 1);
        let body = world.get(h).unwrap();
        assert_eq!(body.velocity, Vec2::zero());
        assert_eq!(body.position, Vec2::new(100.0, 100.0));

        // Still inside the zone: no new start event.
        assert!(world.advance(DT).collisions.is_empty());
    }

    #[test]
    fn ropes_pass_through_the_ceiling() {
        let rope = CollisionFilter::rope();
        let ceiling = CollisionFilter::ceiling();
        assert!(!rope.can_collide(&ceiling));
        assert!(rope.can_collide(&CollisionFilter::default()));
        assert!(ceiling.can_collide(&CollisionFilter::default()));
        assert!(CollisionFilter::sensor().category == CATEGORY_SENSOR);
    }

    #[test]
    fn ghost_filter_collides_with_nothing() {
        let ghost = CollisionFilter::default().ghost();
        assert!(!ghost.can_collide(&CollisionFilter::default()));
        assert!(!ghost.can_collide(&CollisionFilter::sensor()));
    }

    #[test]
    fn resting_on_a_floor_stays_above_it() {
        let mut world = PhysicsWorld::new(PhysicsConfig::default());
        world.insert(
            BodyParams::new(
                "floor",
                Shape::Rectangle {
                    width: 400.0,
                    height: 20.0,
                },
                Vec2::new(200.0, 300.0),
            )
            .fixed(),
        );
        let h = world.insert(ball(200.0, 270.0, 10.0));
        for _ in 0..300 {
            world.advance(DT);
        }
        let y = world.get(h).unwrap().position.y;
        assert!(y < 292.0, "ball sank into the floor: y = {}", y);
    }

    // -----------------------------------------------------------------------
    // Cling
    // -----------------------------------------------------------------------

    #[test]
    fn cling_replaces_tether_and_follows_anchor() {
        let mut world = zero_g();
        let crab = world.insert(ball(100.0, 100.0, 10.0));
        let rock = world.insert(ball(125.0, 100.0, 15.0));
        world.add_tether(crab, 15.0).unwrap();

        world
            .cling(crab, rock, Vec2::new(110.0, 100.0), 0.05)
            .unwrap();
        assert!(world.tether_of(crab).is_none());
        assert!(world.attachment_of(crab).is_some());
        assert_eq!(world.joints().len(), 1);

        assert!(world.set_velocity(rock, Vec2::new(5.0, 0.0)));
        for _ in 0..5 {
            world.advance(DT);
        }
        let (c, r) = (world.get(crab).unwrap(), world.get(rock).unwrap());
        assert!(r.position.x > 125.0);
        assert!((r.position.x - c.position.x - 25.0).abs() < 1e-2);
        assert_eq!(c.angular_velocity, 0.0);
    }

    #[test]
    fn second_cling_replaces_the_first() {
        let mut world = zero_g();
        let crab = world.insert(ball(100.0, 100.0, 10.0));
        let rock = world.insert(ball(125.0, 100.0, 15.0));
        let shell = world.insert(ball(75.0, 100.0, 15.0));

        world.cling(crab, rock, Vec2::new(110.0, 100.0), 0.05).unwrap();
        world.cling(crab, shell, Vec2::new(90.0, 100.0), 0.05).unwrap();

        assert_eq!(world.joints().len(), 1);
        assert_eq!(world.attachments().len(), 1);
        assert_eq!(world.attachment_of(crab).unwrap().anchor_body, shell);
    }

    #[test]
    fn cannot_cling_to_self() {
        let mut world = zero_g();
        let crab = world.insert(ball(100.0, 100.0, 10.0));
        assert!(world.cling(crab, crab, Vec2::zero(), 0.05).is_none());
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    #[test]
    fn non_clickable_body_refuses_grab() {
        let mut world = zero_g();
        let params = ball(100.0, 100.0, 20.0).with_metadata(BodyMetadata {
            clickable: Some(false),
            ..Default::default()
        });
        world.insert(params);

        assert!(world.pointer_down(Vec2::new(100.0, 100.0)).is_none());
        assert!(world.pointer().drag().is_none());
    }

    #[test]
    fn sensors_and_static_bodies_cannot_be_grabbed() {
        let mut world = zero_g();
        world.insert(ball(100.0, 100.0, 20.0).fixed());
        world.insert(ball(300.0, 100.0, 20.0).sensor());
        assert!(world.pointer_down(Vec2::new(100.0, 100.0)).is_none());
        assert!(world.pointer_down(Vec2::new(300.0, 100.0)).is_none());
        assert_eq!(CATEGORY_SENSOR & POINTER_MASK, 0);
    }

    #[test]
    fn grab_picks_the_newest_body_under_the_pointer() {
        let mut world = zero_g();
        let older = world.insert(ball(100.0, 100.0, 20.0));
        let newer = world.insert(ball(110.0, 100.0, 20.0));

        assert_eq!(world.pointer_down(Vec2::new(105.0, 100.0)), Some(newer));
        assert_eq!(world.pointer().drag().unwrap().body, newer);
        assert_eq!(world.query_point(Vec2::new(105.0, 100.0)), vec![older, newer]);
    }

    #[test]
    fn removing_the_dragged_body_releases_the_pointer() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 20.0));
        world.pointer_down(Vec2::new(100.0, 100.0)).unwrap();

        world.remove(h).unwrap();
        assert!(world.pointer().drag().is_none());
        world.advance(DT);
    }

    #[test]
    fn sustained_drag_latches_sandbox() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 20.0));
        assert_eq!(world.pointer_down(Vec2::new(100.0, 100.0)), Some(h));

        for _ in 0..14 {
            world.advance(DT);
        }
        assert!(!world.pointer().sandbox_started());
        world.advance(DT);
        assert!(world.pointer().sandbox_started());

        world.pointer_up();
        assert!(world.pointer().sandbox_started());
    }

    #[test]
    fn early_release_resets_drag_counter() {
        let mut world = zero_g();
        world.insert(ball(100.0, 100.0, 20.0));
        world.pointer_down(Vec2::new(100.0, 100.0)).unwrap();
        for _ in 0..5 {
            world.advance(DT);
        }
        assert_eq!(world.pointer().drag_ticks(), 5);

        world.pointer_up();
        assert_eq!(world.pointer().drag_ticks(), 0);
        assert!(!world.pointer().sandbox_started());
    }

    #[test]
    fn drag_pulls_body_toward_pointer() {
        let mut world = zero_g();
        let h = world.insert(ball(100.0, 100.0, 20.0));
        world.pointer_down(Vec2::new(100.0, 100.0)).unwrap();
        world.pointer_move(Vec2::new(200.0, 100.0));
        for _ in 0..3 {
            world.advance(DT);
        }
        assert!(world.get(h).unwrap().position.x > 100.0);
    }

    #[test]
    fn hover_wiggles_until_sandbox_starts() {
        let mut world = zero_g();
        let hovered = world.insert(ball(100.0, 100.0, 20.0));
        let idle = world.insert(ball(400.0, 100.0, 20.0));
        world.pointer_move(Vec2::new(100.0, 100.0));

        world.advance(DT);

        assert!(world.get(hovered).unwrap().speed() > 0.0);
        assert_eq!(world.get(idle).unwrap().speed(), 0.0);
    }

    #[test]
    fn clear_resets_latch_and_bodies() {
        let mut world = zero_g();
        world.insert(ball(100.0, 100.0, 20.0));
        world.pointer_down(Vec2::new(100.0, 100.0)).unwrap();
        for _ in 0..20 {
            world.advance(DT);
        }
        assert!(world.pointer().sandbox_started());

        world.clear();
        assert!(world.is_empty());
        assert!(!world.pointer().sandbox_started());
        assert!(world.pointer().drag().is_none());
    }
}
