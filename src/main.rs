use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use composable_mixins::{Domain, DomainGraph, Object, ObjectTemplate, load_definitions};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod catalog;

use catalog::Catalog;

#[derive(Parser)]
#[command(name = "mixins")]
#[command(about = "Compose objects from mixins and send them messages")]
struct Cli {
    #[command(flatten)]
    mode: ModeArgs,

    /// Definition files (.toml) with domain settings, rules and templates
    definitions: Vec<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ModeArgs {
    /// Perform a dry run, printing the domain graph without starting a session
    #[arg(long, short)]
    dry_run: bool,

    /// Export domain graph to DOT file (graph.dot)
    #[arg(long, short)]
    export: bool,

    /// Start interactive session for composing objects and sending messages
    #[arg(long, short)]
    interactive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List mixins, messages and templates
    List,
    /// Show details for a mixin or message
    Describe { target: String },
    /// Create an object, optionally from a template
    New {
        object: String,
        template: Option<String>,
    },
    /// Add mixins to an object
    Add { object: String, mixins: Vec<String> },
    /// Remove mixins from an object
    Remove { object: String, mixins: Vec<String> },
    /// Send a message to an object
    Call {
        object: String,
        message: String,
        args: Vec<String>,
    },
    /// Show an object's composition
    Show { object: String },
    /// List objects of the session
    Objects,
}

struct Session {
    domain: Domain,
    catalog: Catalog,
    templates: BTreeMap<String, ObjectTemplate>,
    objects: BTreeMap<String, Object>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    println!("Loading definitions from: {:?}...", cli.definitions);
    let definitions = load_definitions(&cli.definitions)?;
    let domain = definitions.create_domain();
    let catalog = catalog::register(&domain)?;
    definitions.install_rules(&domain)?;
    let templates = definitions.build_templates(&domain)?;
    let graph = DomainGraph::build(&domain);

    if cli.mode.dry_run {
        println!("--- Domain Graph (Dry Run) ---");
        println!("{graph:#?}");
        let order: Vec<String> = graph
            .dependency_order()?
            .into_iter()
            .filter_map(|id| domain.mixin(id).map(|mixin| mixin.name().to_string()))
            .collect();
        println!("Dependency order: {}", order.join(", "));
        for (name, template) in &templates {
            println!(
                "Template '{name}': {}",
                template.type_info().mixin_names().join(", ")
            );
        }
        println!("-----------------------------");
    } else if cli.mode.export {
        let filename = "graph.dot";
        graph.write_dot_file(filename)?;
        println!("Graph exported to {filename}");
    } else if cli.mode.interactive {
        let mut session = Session {
            domain,
            catalog,
            templates,
            objects: BTreeMap::new(),
        };
        run_interactive_session(&mut session)?;
    }

    Ok(())
}

fn run_interactive_session(session: &mut Session) -> Result<()> {
    println!(
        "Domain has {} mixins and {} messages.",
        session.domain.mixins().len(),
        session.catalog.messages.len()
    );

    println!("Starting interactive session. Type 'help' for commands.");
    let mut rl = Editor::<(), DefaultHistory>::new()?;
    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if handle_command(line, session).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    Ok(())
}

fn parse_command(parts: &[String]) -> Result<Option<Commands>, ()> {
    let Some(command_str) = parts.first() else {
        return Ok(None);
    };
    let arg = |index: usize| parts.get(index).cloned();
    let rest = |from: usize| parts.get(from..).unwrap_or(&[]).to_vec();

    let command = match command_str.as_str() {
        "list" => Some(Commands::List),
        "describe" => arg(1).map(|target| Commands::Describe { target }),
        "new" => arg(1).map(|object| Commands::New {
            object,
            template: arg(2),
        }),
        "add" => arg(1).map(|object| Commands::Add {
            object,
            mixins: rest(2),
        }),
        "remove" => arg(1).map(|object| Commands::Remove {
            object,
            mixins: rest(2),
        }),
        "call" => arg(1).zip(arg(2)).map(|(object, message)| Commands::Call {
            object,
            message,
            args: rest(3),
        }),
        "show" => arg(1).map(|object| Commands::Show { object }),
        "objects" => Some(Commands::Objects),
        "help" => {
            println!("Available commands:");
            println!("  list                              - List mixins, messages and templates");
            println!("  describe <mixin|message>          - Show details for a mixin or message");
            println!("  new <object> [template]           - Create an object");
            println!("  add <object> <mixin>...           - Add mixins to an object");
            println!("  remove <object> <mixin>...        - Remove mixins from an object");
            println!("  call <object> <message> [args...] - Send a message to an object");
            println!("  show <object>                     - Show an object's composition");
            println!("  objects                           - List objects");
            println!("  help                              - Show this help message");
            println!("  exit, quit                        - Exit the interactive session");
            return Ok(None);
        }
        "exit" | "quit" => return Err(()),
        _ => {
            eprintln!("Unknown command. Type 'help' for a list of commands.");
            return Ok(None);
        }
    };
    if command.is_none() {
        eprintln!("Missing arguments. Type 'help' for usage.");
    }
    Ok(command)
}

fn handle_command(line: String, session: &mut Session) -> Result<(), ()> {
    let parts = parse_quoted_args(&line);
    let Some(command) = parse_command(&parts)? else {
        return Ok(());
    };

    match command {
        Commands::List => {
            println!("Mixins:");
            for mixin in session.domain.mixins() {
                println!("- {}", mixin.name());
            }
            println!("Messages:");
            for message in &session.catalog.messages {
                println!("- {} ({})", message.usage, message.kind());
            }
            if !session.templates.is_empty() {
                println!("Templates:");
                for (name, template) in &session.templates {
                    println!("- {name}: {}", template.type_info().mixin_names().join(", "));
                }
            }
        }
        Commands::Describe { target } => describe(session, &target),
        Commands::New { object, template } => {
            let created = match template {
                Some(template) => match session.templates.get(&template) {
                    Some(template) => template.instantiate(),
                    None => {
                        eprintln!("Error: Template '{template}' not found.");
                        return Ok(());
                    }
                },
                None => Ok(Object::new(&session.domain)),
            };
            match created {
                Ok(created) => {
                    println!("{object}: {:?}", created.mixin_names());
                    session.objects.insert(object, created);
                }
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Add { object, mixins } => mutate(session, &object, &mixins, true),
        Commands::Remove { object, mixins } => mutate(session, &object, &mixins, false),
        Commands::Call {
            object,
            message,
            args,
        } => {
            let Some(target) = session.objects.get_mut(&object) else {
                eprintln!("Error: Object '{object}' not found.");
                return Ok(());
            };
            let Some(message) = session.catalog.message(&message) else {
                eprintln!("Error: Message '{message}' not found.");
                return Ok(());
            };
            // Parse each argument as JSON, falling back to a string.
            let args = args
                .iter()
                .map(|arg| {
                    let trimmed = arg.trim();
                    serde_json::from_str(trimmed)
                        .unwrap_or_else(|_| serde_json::Value::String(trimmed.to_string()))
                })
                .collect();
            match message.invoke(target, args) {
                Ok(result) => match serde_json::to_string_pretty(&result) {
                    Ok(result) => println!("{result}"),
                    Err(e) => eprintln!("Error: {e}"),
                },
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        Commands::Show { object } => match session.objects.get(&object) {
            Some(target) => {
                println!("Object: {object}");
                println!("Mixins: {}", target.mixin_names().join(", "));
                println!("Defaults enabled: {}", target.type_info().defaults_enabled());
                println!("Messages:");
                for message in &session.catalog.messages {
                    let count = message.implementers(target);
                    if count > 0 {
                        println!("- {} ({count} implementers)", message.name);
                    }
                }
            }
            None => eprintln!("Error: Object '{object}' not found."),
        },
        Commands::Objects => {
            if session.objects.is_empty() {
                println!("(none)");
            }
            for (name, object) in &session.objects {
                println!("- {name}: {}", object.mixin_names().join(", "));
            }
        }
    }
    Ok(())
}

fn describe(session: &Session, target: &str) {
    if let Some(mixin) = session.domain.mixin_by_name(target) {
        println!("Mixin: {}", mixin.name());
        println!("Type: {}", mixin.type_name());
        println!("Size: {} (align {})", mixin.size(), mixin.align());
        println!("Cloneable: {}", mixin.is_cloneable());
        println!("Enables defaults: {}", mixin.enables_defaults());
        println!("Implements:");
        for (id, priority) in mixin.messages() {
            if let Some(feature) = session.domain.feature(id) {
                println!("- {} (priority {priority})", feature.name);
            }
        }
    } else if let Some(feature) = session.domain.feature_by_name(target)
        && let Some(signature) = feature.signature
    {
        println!("Message: {}", feature.name);
        println!("Signature: {signature}");
        println!("Default implementation: {}", feature.has_default);
        let implementers: Vec<String> = session
            .domain
            .mixins()
            .iter()
            .filter(|mixin| mixin.implements(feature.id))
            .map(|mixin| mixin.name().to_string())
            .collect();
        println!("Implemented by: {}", implementers.join(", "));
    } else {
        eprintln!("Error: '{target}' is neither a mixin nor a message.");
    }
}

fn mutate(session: &mut Session, object: &str, names: &[String], adding: bool) {
    let Some(target) = session.objects.get_mut(object) else {
        eprintln!("Error: Object '{object}' not found.");
        return;
    };
    let mut ids = Vec::new();
    for name in names {
        match session.domain.mixin_by_name(name) {
            Some(mixin) => ids.push(mixin.id()),
            None => {
                eprintln!("Error: Mixin '{name}' not found.");
                return;
            }
        }
    }
    let result = if adding {
        session.domain.mutate(target, &ids, &[])
    } else {
        session.domain.mutate(target, &[], &ids)
    };
    match result {
        Ok(()) => println!("{object}: {:?}", target.mixin_names()),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn parse_quoted_args(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote_char: Option<char> = None;

    for ch in line.trim().chars() {
        match (ch, quote_char) {
            ('"', None) | ('\'', None) => {
                quote_char = Some(ch);
            }
            (ch, Some(open_char)) if ch == open_char => {
                quote_char = None;
            }
            (' ', None) => {
                if !current.is_empty() {
                    parts.push(current);
                    current = String::new();
                }
            }
            (ch, _) => {
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
