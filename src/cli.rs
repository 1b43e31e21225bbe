//! Command-line interface and REPL

use anyhow::Result;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;

use crate::modes::{ModeId, ViewId};
use crate::runtime::RuntimeCommand;

fn mode_by_name(name: &str) -> Option<ModeId> {
    match name {
        "volume" => Some(ModeId::Volume),
        "pan" => Some(ModeId::Pan),
        "send" => Some(ModeId::Send),
        "device" => Some(ModeId::Device),
        "browse" => Some(ModeId::Browse),
        _ => None,
    }
}

fn view_by_name(name: &str) -> Option<ViewId> {
    match name {
        "session" => Some(ViewId::Session),
        "drum" => Some(ViewId::Drum),
        "play" => Some(ViewId::Play),
        "select" => Some(ViewId::Select),
        _ => None,
    }
}

/// Parse one REPL line into a runtime command. None means "not a command"
/// (help is printed by the caller).
fn parse_command(line: &str) -> Option<RuntimeCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let arg = words.next().unwrap_or("");

    match verb {
        "mode" => mode_by_name(arg).map(RuntimeCommand::ActivateMode),
        "view" => view_by_name(arg).map(RuntimeCommand::ActivateView),
        "temp-mode" => mode_by_name(arg).map(RuntimeCommand::TemporaryMode),
        "temp-view" => view_by_name(arg).map(RuntimeCommand::TemporaryView),
        "restore-mode" => Some(RuntimeCommand::RestoreMode),
        "restore-view" => Some(RuntimeCommand::RestoreView),
        "status" => Some(RuntimeCommand::Status),
        "exit" | "quit" => Some(RuntimeCommand::Shutdown),
        _ => None,
    }
}

fn print_help() {
    println!("commands:");
    println!("  mode <volume|pan|send|device|browse>   switch knob/button mode");
    println!("  view <session|drum|play|select>        switch pad view");
    println!("  temp-mode <name> / temp-view <name>    temporary overlay");
    println!("  restore-mode / restore-view            pop the overlay");
    println!("  status                                 session + stacks");
    println!("  exit | quit");
}

/// Interactive console; forwards parsed commands to the runtime loop.
///
/// Blocking — run it on its own thread, not inside the async runtime.
pub fn run_repl(commands: mpsc::Sender<RuntimeCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("padgrid> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                match parse_command(line) {
                    Some(command) => {
                        let quit = command == RuntimeCommand::Shutdown;
                        if commands.blocking_send(command).is_err() {
                            break; // runtime gone
                        }
                        if quit {
                            break;
                        }
                    }
                    None => print_help(),
                }
            }
            Err(_) => {
                let _ = commands.blocking_send(RuntimeCommand::Shutdown);
                break;
            }
        }
    }

    Ok(())
}
