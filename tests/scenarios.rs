mod common;
use composable_mixins::{
    CollisionPolicy, CompositionError, ConstMessage, Domain, DomainConfig, GlobalMessage, Mixin,
    MixinBuilder, MulticastMessage, MutationError, Object, kind,
};

struct Geometry {
    domain: Domain,
    area: ConstMessage<(), f64>,
    circle: Mixin<common::Circle>,
    square: Mixin<common::Square>,
}

fn geometry(collision: CollisionPolicy) -> Geometry {
    let domain = Domain::new(DomainConfig::default().with_collision(collision));
    let area: ConstMessage<(), f64> = domain.declare_message("area").unwrap();
    let circle = domain
        .register_mixin(
            MixinBuilder::<common::Circle>::new("circle")
                .implements_const(&area, |c, ()| 3.0 * c.radius * c.radius),
        )
        .unwrap();
    let square = domain
        .register_mixin(
            MixinBuilder::<common::Square>::new("square").implements_const(&area, |s, ()| s.side * s.side),
        )
        .unwrap();
    Geometry {
        domain,
        area,
        circle,
        square,
    }
}

#[test]
fn test_area_first_wins() {
    let g = geometry(CollisionPolicy::FirstWins);
    let mut object = Object::new(&g.domain);

    object
        .mutate(&g.domain)
        .add(&g.square)
        .add(&g.circle)
        .apply()
        .unwrap();

    // circle was registered first, so its area is used regardless of add order.
    assert_eq!(object.call_const(&g.area, ()), Ok(3.0));
    assert_eq!(object.num_implementers(&g.area), 2);
}

#[test]
fn test_area_reject() {
    let g = geometry(CollisionPolicy::Reject);
    let mut object = Object::new(&g.domain);
    object.mutate(&g.domain).add(&g.circle).apply().unwrap();

    let result = object.mutate(&g.domain).add(&g.square).apply();
    match result {
        Err(MutationError::Composition(CompositionError::Ambiguous {
            message,
            first,
            second,
            ..
        })) => {
            assert_eq!(message, "area");
            assert_eq!(first, "circle");
            assert_eq!(second, "square");
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
    assert_eq!(object.call_const(&g.area, ()), Ok(3.0));
}

#[derive(Debug, Default)]
struct Physics {
    steps: u32,
}

#[derive(Debug, Default)]
struct Animation {
    frames: u32,
}

#[derive(Debug, Default)]
struct Audio;

struct Tick {
    domain: Domain,
    on_tick: MulticastMessage<(), &'static str>,
    physics: Mixin<Physics>,
    animation: Mixin<Animation>,
    audio: Mixin<Audio>,
}

/// Registers the `on_tick` participants in the given order.
fn tick_domain(order: [&str; 3]) -> Tick {
    let domain = Domain::default();
    let on_tick: MulticastMessage<(), &'static str> = domain.declare_message("on_tick").unwrap();
    let (mut physics, mut animation, mut audio) = (None, None, None);

    for name in order {
        match name {
            "physics" => {
                physics = Some(
                    domain
                        .register_mixin(MixinBuilder::<Physics>::new(name).implements(&on_tick, |p, ()| {
                            p.steps += 1;
                            "physics"
                        }))
                        .unwrap(),
                )
            }
            "animation" => {
                animation = Some(
                    domain
                        .register_mixin(MixinBuilder::<Animation>::new(name).implements(
                            &on_tick,
                            |a, ()| {
                                a.frames += 1;
                                "animation"
                            },
                        ))
                        .unwrap(),
                )
            }
            _ => {
                audio = Some(
                    domain
                        .register_mixin(
                            MixinBuilder::<Audio>::new(name).implements(&on_tick, |_, ()| "audio"),
                        )
                        .unwrap(),
                )
            }
        }
    }

    Tick {
        domain,
        on_tick,
        physics: physics.unwrap(),
        animation: animation.unwrap(),
        audio: audio.unwrap(),
    }
}

#[test]
fn test_on_tick_reaches_every_participant_in_any_order() {
    let orders = [
        ["physics", "animation", "audio"],
        ["audio", "animation", "physics"],
        ["animation", "physics", "audio"],
    ];
    for order in orders {
        let t = tick_domain(order);
        let mut object = Object::new(&t.domain);
        object
            .mutate(&t.domain)
            .add(&t.audio)
            .add(&t.physics)
            .add(&t.animation)
            .apply()
            .unwrap();

        // Participants run in registration order.
        let results = object.call_all(&t.on_tick, ()).unwrap();
        assert_eq!(results, order.to_vec(), "registered as {order:?}");

        object.call_all(&t.on_tick, ()).unwrap();
        assert_eq!(object.get(&t.physics).unwrap().steps, 2);
        assert_eq!(object.get(&t.animation).unwrap().frames, 2);
    }
}

#[test]
fn test_on_tick_skips_removed_participants() {
    let t = tick_domain(["physics", "animation", "audio"]);
    let mut object = Object::new(&t.domain);
    object
        .mutate(&t.domain)
        .add(&t.physics)
        .add(&t.animation)
        .add(&t.audio)
        .apply()
        .unwrap();

    object.mutate(&t.domain).remove(&t.animation).apply().unwrap();
    assert_eq!(
        object.call_all(&t.on_tick, ()).unwrap(),
        vec!["physics", "audio"]
    );

    // Removing it again is a no-op.
    object.mutate(&t.domain).remove(&t.animation).apply().unwrap();
    assert_eq!(object.num_implementers(&t.on_tick), 2);
}

#[test]
fn test_global_declarations_agree_in_any_order() {
    static ON_TICK_A: GlobalMessage<(), u32, kind::Mutable, kind::Multicast> =
        GlobalMessage::new("scenario-on-tick");
    static ON_TICK_B: GlobalMessage<(), u32, kind::Mutable, kind::Multicast> =
        GlobalMessage::new("scenario-on-tick");

    // Two independent declarations of the same message agree on its identity,
    // whichever is touched first.
    let b = ON_TICK_B.get().unwrap().id();
    let a = ON_TICK_A.get().unwrap().id();
    assert_eq!(a, b);
}
