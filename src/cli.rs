//! fsm-canvas CLI - inspect a state machine definition without the GUI

use fsm_canvas::{EditorOptions, EditorResult, GraphModel, StateMachineDefinition};
use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn usage() {
    println!("fsm-canvas CLI - state machine inspector");
    println!("Usage: fsm-canvas-cli [--options <opts.json>] <machine.json>");
    println!();
    println!("Example: fsm-canvas-cli demos/door.json");
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut options_path = None;
    let mut machine_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--options" => match args.next() {
                Some(path) => options_path = Some(path),
                None => {
                    eprintln!("❌ --options needs a file argument");
                    return ExitCode::FAILURE;
                }
            },
            "-h" | "--help" => {
                usage();
                return ExitCode::SUCCESS;
            }
            _ => machine_path = Some(arg),
        }
    }

    let Some(machine_path) = machine_path else {
        usage();
        return ExitCode::FAILURE;
    };

    let options = match options_path {
        Some(path) => match EditorOptions::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("❌ Could not load options '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => EditorOptions::default(),
    };

    match inspect(&machine_path, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}: {}", machine_path, e);
            ExitCode::FAILURE
        }
    }
}

fn inspect(path: &str, options: &EditorOptions) -> EditorResult<()> {
    let content = fs::read_to_string(path)?;
    let def = StateMachineDefinition::parse_validated(&content)?;
    let model = GraphModel::from_definition(&def)?;

    println!("✅ Loaded {}", path);
    println!("  States: {}", model.states().len());
    for state in model.states() {
        let marker = if state.is_initial { " (initial)" } else { "" };
        println!(
            "    - {} at ({}, {}){}",
            state.name, state.position.x, state.position.y, marker
        );
    }

    println!("  Transitions: {}", model.transitions().len());
    let params = options.link_params();
    for transition in model.transitions() {
        let src = model.state(transition.src).map(|s| s.name.as_str()).unwrap_or("?");
        let dest = transition
            .dest
            .and_then(|d| model.state(d))
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        println!("    {} --> {} : {}", src, dest, transition.name);
        if let Some(geometry) = model.geometry(transition, params) {
            println!("      path:  {}", geometry.link);
            println!("      arrow: {}", geometry.arrow);
        }
    }

    match model.initial_state() {
        Some(initial) => println!("  Initial State: {}", initial.name),
        None => println!("  Initial State: (none)"),
    }
    Ok(())
}
