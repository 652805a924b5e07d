// SPDX-FileCopyrightText: 2026 Flowdeck contributors
// SPDX-License-Identifier: GPL-2.0-or-later

//! Flowdeck CLI entrypoint.
//!
//! Starts the interactive TUI over the notebook lifecycle controller. Files named on the
//! command line open as tabs; the previous session's tabs are restored first unless
//! `--no-restore` is given.

use std::error::Error;
use std::path::{Path, PathBuf};

use flowdeck::console;
use flowdeck::controller::{LifecycleController, RaiseFatal};
use flowdeck::platform::Platform;
use flowdeck::store::{default_config_dir, Prefs, WriteDurability};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<file>...] [--config-dir <dir>] [--blocks-dir <dir>] [--no-restore] [--durable-writes]\n\nOpens each <file> as a notebook tab. Tabs from the previous session are restored first;\n--no-restore skips that.\n\n--config-dir overrides where session state is kept (default: XDG config dir).\n--blocks-dir replaces the built-in block definitions with *.json files from <dir>.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    files: Vec<String>,
    config_dir: Option<String>,
    blocks_dir: Option<String>,
    no_restore: bool,
    durable_writes: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-dir" => {
                if options.config_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.config_dir = Some(dir);
            }
            "--blocks-dir" => {
                if options.blocks_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.blocks_dir = Some(dir);
            }
            "--no-restore" => {
                if options.no_restore {
                    return Err(());
                }
                options.no_restore = true;
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                options.files.push(arg);
            }
        }
    }

    Ok(options)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "flowdeck".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let (platform, warnings) =
            Platform::build(options.blocks_dir.as_deref().map(Path::new))?;

        let config_dir =
            options.config_dir.map(PathBuf::from).unwrap_or_else(default_config_dir);
        let console = console::shared();
        for warning in warnings {
            console.lock().expect("console lock poisoned").log(format!(">>> Warning: {warning}"));
        }

        let prefs = match Prefs::load(&config_dir) {
            Ok(prefs) => prefs,
            Err(error) => {
                console
                    .lock()
                    .expect("console lock poisoned")
                    .log(format!(">>> Warning: cannot read session state: {error}"));
                Prefs::default()
            }
        };

        let durability = if options.durable_writes {
            WriteDurability::Durable
        } else {
            WriteDurability::BestEffort
        };
        let mut controller = LifecycleController::new(platform, console, &config_dir)
            .with_durability(durability)
            .with_fatal_handler(Box::new(RaiseFatal));
        controller.set_console_visible(prefs.console_visible);
        controller.set_blocks_visible(prefs.blocks_visible);

        if !options.no_restore {
            for path in &prefs.open_files {
                controller.open_document(Some(path), false)?;
            }
            if let Some(path) = &prefs.file_open {
                if controller.notebook().find_by_path(path).is_some() {
                    controller.open_document(Some(path), true)?;
                }
            }
        }
        for file in &options.files {
            controller.open_document(Some(Path::new(file)), true)?;
        }
        if controller.notebook().is_empty() {
            controller.new_page()?;
        }

        flowdeck::tui::run(controller)
    })();

    if let Err(err) = result {
        eprintln!("flowdeck: {err}");
        std::process::exit(1);
    }
}
