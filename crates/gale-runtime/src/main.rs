// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interactive console over the gale core engine.
//!
//! Each line read from stdin is evaluated as a shell command, e.g.
//! `lsmod()`, `core.lsfunc("shell")` or `quit()`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gale_control::{CoreEngine, CoreEvent, EngineConfig, ModuleCallbacks, ThreadId, MAIN_THREAD};
use gale_telemetry::{init_logger, ShellLevel};

#[derive(Parser, Debug)]
#[command(name = "gale", version, about = "Interactive console for the gale core engine")]
struct Args {
    /// JSON engine configuration; defaults are used for missing fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mod to load before starting.
    #[arg(short = 'm', long = "mod")]
    mod_name: Option<String>,

    /// Shell display level, from 0 (user) to 4 (hard debug).
    #[arg(short, long, default_value_t = 1)]
    level: i32,

    /// Append every shell message to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Main loop period in milliseconds, used when the configuration leaves
    /// the main timer at zero.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Write the effective configuration to this file and exit.
    #[arg(long)]
    save_config: Option<PathBuf>,
}

const CONSOLE: &str = "console";

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger("info");

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(path) = &args.save_config {
        config.to_file(path)?;
        log::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let engine = CoreEngine::new(config);
    let shell = engine.shell();
    shell.set_level(ShellLevel::clamped(args.level));
    if let Some(path) = &args.log_file {
        shell
            .start_logging(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
    }
    // Other levels already reach the terminal through the logger.
    shell.set_print_callback(|level, msg| {
        if level == ShellLevel::User {
            println!("{msg}");
        }
    });

    let console = engine.declare_module(
        CONSOLE,
        ModuleCallbacks::new()
            .on_event(open_console)
            .on_thread(console_step),
    )?;
    // The console blocks on stdin; the main loop only pumps global events.
    if let Some(timer) = main_timer(engine.config(), args.frame_ms) {
        engine.set_thread_timer(console, MAIN_THREAD, timer)?;
    }

    if let Some(name) = &args.mod_name {
        engine
            .load_data(name)
            .with_context(|| format!("loading mod '{name}'"))?;
    }

    engine.start()?;
    engine.shutdown()?;
    Ok(())
}

/// Period for the main thread, unless the configuration already sets one.
fn main_timer(config: &EngineConfig, frame_ms: u64) -> Option<Duration> {
    (config.main_timer_ms == 0 && frame_ms > 0).then(|| Duration::from_millis(frame_ms))
}

fn open_console(engine: &CoreEngine, event: CoreEvent) {
    if event != CoreEvent::Ready {
        return;
    }
    if let Some(console) = engine.module_id(CONSOLE) {
        if engine.create_thread(console, CONSOLE, false).is_err() {
            engine.stop();
        }
    }
}

fn console_step(engine: &CoreEngine, _thread: ThreadId, _elapsed: Duration) {
    print!("> ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => engine.stop(),
        Ok(_) => {
            let command = line.trim();
            if !command.is_empty() {
                // Failures are already printed by the shell channel.
                let _ = engine.shell_exec_command(command);
            }
        }
    }
}
