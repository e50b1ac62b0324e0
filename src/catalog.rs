//! Demo mixins used by the interactive session.
//!
//! Every message takes its arguments as a list of JSON values and returns a JSON
//! value, so the REPL can call any of them without knowing their types.

use composable_mixins::{
    ConstMessage, ConstMulticastMessage, DispatchError, Domain, Message, MixinBuilder,
    MulticastMessage, Object, RegistrationError,
};
use serde_json::{Value, json};

type Args = Vec<Value>;

enum Handle {
    Call(Message<Args, Value>),
    Const(ConstMessage<Args, Value>),
    All(MulticastMessage<Args, Value>),
    AllConst(ConstMulticastMessage<Args, Value>),
}

pub struct CatalogMessage {
    pub name: &'static str,
    pub usage: &'static str,
    handle: Handle,
}

impl CatalogMessage {
    pub fn kind(&self) -> &'static str {
        match self.handle {
            Handle::Call(_) => "unicast",
            Handle::Const(_) => "const unicast",
            Handle::All(_) => "multicast",
            Handle::AllConst(_) => "const multicast",
        }
    }

    pub fn implementers(&self, object: &Object) -> usize {
        match &self.handle {
            Handle::Call(m) => object.num_implementers(m),
            Handle::Const(m) => object.num_implementers(m),
            Handle::All(m) => object.num_implementers(m),
            Handle::AllConst(m) => object.num_implementers(m),
        }
    }

    pub fn invoke(&self, object: &mut Object, args: Args) -> Result<Value, DispatchError> {
        match &self.handle {
            Handle::Call(m) => object.call_or_default(m, args),
            Handle::Const(m) => object.call_const_or_default(m, args),
            Handle::All(m) => object.call_all(m, args).map(Value::Array),
            Handle::AllConst(m) => object.call_all_const(m, args).map(Value::Array),
        }
    }
}

pub struct Catalog {
    pub messages: Vec<CatalogMessage>,
}

impl Catalog {
    pub fn message(&self, name: &str) -> Option<&CatalogMessage> {
        self.messages.iter().find(|message| message.name == name)
    }
}

#[derive(Debug, Clone, Default)]
struct Transform {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone)]
struct Circle {
    radius: f64,
}

#[derive(Debug, Clone)]
struct Square {
    side: f64,
}

#[derive(Debug, Clone, Default)]
struct Ticker {
    ticks: u64,
}

#[derive(Debug, Clone)]
struct Label {
    text: String,
}

fn number(args: &[Value], index: usize, fallback: f64) -> f64 {
    args.get(index).and_then(Value::as_f64).unwrap_or(fallback)
}

pub fn register(domain: &Domain) -> Result<Catalog, RegistrationError> {
    let area: ConstMessage<Args, Value> = domain.declare_message("area")?;
    let perimeter: ConstMessage<Args, Value> = domain.declare_message("perimeter")?;
    let resize: Message<Args, Value> = domain.declare_message("resize")?;
    let translate: Message<Args, Value> = domain.declare_message("translate")?;
    let position: ConstMessage<Args, Value> = domain.declare_message("position")?;
    let tick: MulticastMessage<Args, Value> = domain.declare_message("tick")?;
    let inspect: ConstMulticastMessage<Args, Value> = domain.declare_message("inspect")?;
    let name: ConstMessage<Args, Value> = domain.declare_message("name")?;
    let rename: Message<Args, Value> = domain.declare_message("rename")?;

    domain.define_const_default(&name, |_, _| json!("unnamed"))?;
    domain.define_const_default(&position, |_, _| json!([0.0, 0.0]))?;

    domain.register_mixin(
        MixinBuilder::<Transform>::new("transform")
            .cloneable()
            .implements(&translate, |t, args| {
                t.x += number(&args, 0, 0.0);
                t.y += number(&args, 1, 0.0);
                json!([t.x, t.y])
            })
            .implements_const(&position, |t, _| json!([t.x, t.y]))
            .implements(&tick, |t, _| json!({ "transform": [t.x, t.y] }))
            .implements_const(&inspect, |t, _| json!(format!("{t:?}"))),
    )?;

    domain.register_mixin(
        MixinBuilder::with_constructor("circle", || Ok(Circle { radius: 1.0 }))
            .cloneable()
            .implements_const(&area, |c: &Circle, _| {
                json!(std::f64::consts::PI * c.radius * c.radius)
            })
            .implements_const(&perimeter, |c, _| json!(2.0 * std::f64::consts::PI * c.radius))
            .implements(&resize, |c, args| {
                c.radius = number(&args, 0, c.radius);
                json!(c.radius)
            })
            .implements_const(&inspect, |c, _| json!(format!("{c:?}"))),
    )?;

    domain.register_mixin(
        MixinBuilder::with_constructor("square", || Ok(Square { side: 1.0 }))
            .cloneable()
            .implements_const(&area, |s: &Square, _| json!(s.side * s.side))
            .implements_const(&perimeter, |s, _| json!(4.0 * s.side))
            .implements(&resize, |s, args| {
                s.side = number(&args, 0, s.side);
                json!(s.side)
            })
            .implements_const(&inspect, |s, _| json!(format!("{s:?}"))),
    )?;

    domain.register_mixin(
        MixinBuilder::<Ticker>::new("ticker")
            .cloneable()
            .implements(&tick, |t, _| {
                t.ticks += 1;
                json!({ "ticks": t.ticks })
            })
            .priority(&tick, 1)
            .implements_const(&inspect, |t, _| json!(format!("{t:?}"))),
    )?;

    domain.register_mixin(
        MixinBuilder::with_constructor("label", || {
            Ok(Label {
                text: String::from("label"),
            })
        })
        .cloneable()
        .without_defaults()
        .implements_const(&name, |l: &Label, _| json!(l.text))
        .implements(&rename, |l, args| {
            if let Some(text) = args.first().and_then(Value::as_str) {
                l.text = text.to_string();
            }
            json!(l.text)
        })
        .implements_const(&inspect, |l, _| json!(format!("{l:?}"))),
    )?;

    let messages = vec![
        CatalogMessage {
            name: "area",
            usage: "area",
            handle: Handle::Const(area),
        },
        CatalogMessage {
            name: "perimeter",
            usage: "perimeter",
            handle: Handle::Const(perimeter),
        },
        CatalogMessage {
            name: "resize",
            usage: "resize <size>",
            handle: Handle::Call(resize),
        },
        CatalogMessage {
            name: "translate",
            usage: "translate <dx> <dy>",
            handle: Handle::Call(translate),
        },
        CatalogMessage {
            name: "position",
            usage: "position",
            handle: Handle::Const(position),
        },
        CatalogMessage {
            name: "tick",
            usage: "tick",
            handle: Handle::All(tick),
        },
        CatalogMessage {
            name: "inspect",
            usage: "inspect",
            handle: Handle::AllConst(inspect),
        },
        CatalogMessage {
            name: "name",
            usage: "name",
            handle: Handle::Const(name),
        },
        CatalogMessage {
            name: "rename",
            usage: "rename <text>",
            handle: Handle::Call(rename),
        },
    ];
    Ok(Catalog { messages })
}
