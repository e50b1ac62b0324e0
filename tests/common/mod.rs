#![allow(dead_code)]

use composable_mixins::{
    ConstMessage, ConstMulticastMessage, Definitions, Domain, DomainConfig, FeatureId, Message,
    Mixin, MixinBuilder, MulticastMessage, Object, load_definitions,
};
use std::io::Write;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::{Builder, NamedTempFile};

pub struct TestFile(NamedTempFile);

impl Deref for TestFile {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.path()
    }
}

pub fn create_toml_test_file(content: &str) -> TestFile {
    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    write!(temp_file, "{}", content).unwrap();
    TestFile(temp_file)
}

pub fn create_test_file_with_suffix(content: &str, suffix: &str) -> TestFile {
    let mut temp_file = Builder::new().suffix(suffix).tempfile().unwrap();
    write!(temp_file, "{}", content).unwrap();
    TestFile(temp_file)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Default for Circle {
    fn default() -> Self {
        Self { radius: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Square {
    pub side: f64,
}

impl Default for Square {
    fn default() -> Self {
        Self { side: 2.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ticker {
    pub ticks: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Logger {
    pub lines: Vec<String>,
}

/// A small shapes domain shared by most tests.
///
/// `circle` is registered before `square`, and both implement `area` and
/// `scale` with the default priority.
pub struct Shapes {
    pub domain: Domain,
    pub area: ConstMessage<(), f64>,
    pub scale: Message<f64, f64>,
    pub on_tick: MulticastMessage<(), String>,
    pub describe: ConstMulticastMessage<(), String>,
    pub log: Message<String, usize>,
    pub circle: Mixin<Circle>,
    pub square: Mixin<Square>,
    pub ticker: Mixin<Ticker>,
    pub logger: Mixin<Logger>,
}

pub fn shapes() -> Shapes {
    shapes_with_config(DomainConfig::default())
}

pub fn shapes_with_config(config: DomainConfig) -> Shapes {
    let domain = Domain::new(config);
    let area: ConstMessage<(), f64> = domain.declare_message("area").unwrap();
    let scale: Message<f64, f64> = domain.declare_message("scale").unwrap();
    let on_tick: MulticastMessage<(), String> = domain.declare_message("on_tick").unwrap();
    let describe: ConstMulticastMessage<(), String> = domain.declare_message("describe").unwrap();
    let log: Message<String, usize> = domain.declare_message("log").unwrap();

    let circle = domain
        .register_mixin(
            MixinBuilder::<Circle>::new("circle")
                .cloneable()
                .implements_const(&area, |c, ()| std::f64::consts::PI * c.radius * c.radius)
                .implements(&scale, |c, factor| {
                    c.radius *= factor;
                    c.radius
                })
                .implements(&on_tick, |_, ()| "circle".to_string())
                .implements_const(&describe, |c, ()| format!("circle r={}", c.radius)),
        )
        .unwrap();
    let square = domain
        .register_mixin(
            MixinBuilder::<Square>::new("square")
                .cloneable()
                .implements_const(&area, |s, ()| s.side * s.side)
                .implements(&scale, |s, factor| {
                    s.side *= factor;
                    s.side
                })
                .implements(&on_tick, |_, ()| "square".to_string())
                .implements_const(&describe, |s, ()| format!("square s={}", s.side)),
        )
        .unwrap();
    let ticker = domain
        .register_mixin(
            MixinBuilder::<Ticker>::new("ticker")
                .cloneable()
                .implements(&on_tick, |t, ()| {
                    t.ticks += 1;
                    format!("tick {}", t.ticks)
                }),
        )
        .unwrap();
    let logger = domain
        .register_mixin(
            MixinBuilder::<Logger>::new("logger")
                .cloneable()
                .implements(&log, |l, line| {
                    l.lines.push(line);
                    l.lines.len()
                })
                .implements_const(&describe, |l, ()| format!("logger lines={}", l.lines.len())),
        )
        .unwrap();

    Shapes {
        domain,
        area,
        scale,
        on_tick,
        describe,
        log,
        circle,
        square,
        ticker,
        logger,
    }
}

/// Counts constructions and drops of a mixin.
#[derive(Clone, Default)]
pub struct Counters {
    pub constructed: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicUsize>,
}

impl Counters {
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

pub struct Tracked {
    dropped: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn register_tracked(domain: &Domain, name: &str) -> (Mixin<Tracked>, Counters) {
    let counters = Counters::default();
    let constructed = Arc::clone(&counters.constructed);
    let dropped = Arc::clone(&counters.dropped);
    let mixin = domain
        .register_mixin(MixinBuilder::with_constructor(name, move || {
            constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Tracked {
                dropped: Arc::clone(&dropped),
            })
        }))
        .unwrap();
    (mixin, counters)
}

pub fn object_with(domain: &Domain, mixins: &[FeatureId]) -> Object {
    let mut object = Object::new(domain);
    mutate_and_assert_ok(domain, &mut object, mixins, &[]);
    object
}

pub fn mutate_and_assert_ok(
    domain: &Domain,
    object: &mut Object,
    add: &[FeatureId],
    remove: &[FeatureId],
) {
    let result = domain.mutate(object, add, remove);
    assert!(result.is_ok(), "mutate failed with: {:?}", result.err());
}

pub fn load_definitions_and_assert_ok(paths: &[PathBuf]) -> Definitions {
    let definitions_result = load_definitions(paths);
    assert!(
        definitions_result.is_ok(),
        "load_definitions failed with: {:?}",
        definitions_result.err()
    );
    definitions_result.unwrap()
}
