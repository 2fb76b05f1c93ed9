// SPDX-License-Identifier: MIT
//
// vimkey — drive the engine from a script.
//
//   vimkey [--config FILE] [--file FILE] [KEYS...]
//
// Loads the config (defaults without one) and the text into an in-memory
// editor, feeds KEYS (or stdin, one notation string per line) through the
// engine, then prints the mode, the status line, and the buffer. Input that
// ends while a remap is waiting is flushed as if its timeout passed.
//
//   args → Config + MemoryEditor → VimEngine::feed → stdout
//
// Set RUST_LOG=debug to watch the pipeline.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use vimkey_core::{
    Config, EditorHost, EditorId, KeyDisposition, MemoryCommands, MemoryEditor, SharedState,
    VimEngine,
};
use vimkey_input::parse_keys;

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    file: Option<PathBuf>,
    keys: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(path.into());
            }
            "--file" | "-f" => {
                let path = args.next().ok_or("--file needs a path")?;
                parsed.file = Some(path.into());
            }
            "--" => parsed.keys.extend(args.by_ref()),
            _ => parsed.keys.push(arg),
        }
    }
    Ok(parsed)
}

/// Feed every line of `script` and report the final state.
fn run(config: Config, text: &str, script: &[String]) -> Result<String, String> {
    let mut editor = MemoryEditor::from_text(text);
    let mut commands = MemoryCommands::new();
    let shared = SharedState::from_config(&config);
    let mut engine = VimEngine::new(EditorId(0), Arc::new(config), shared);

    for line in script.iter().filter(|l| !l.is_empty()) {
        let keys = parse_keys(line).map_err(|e| format!("{line:?}: {e}"))?;
        for key in keys {
            engine.feed(key, &mut editor, &mut commands);
        }
    }
    if let KeyDisposition::Pending { deadline: Some(_) } = engine.flush(&mut editor, &mut commands) {
        log::warn!("keys still pending after flush");
    }

    let mut out = String::new();
    let _ = writeln!(out, "mode: {}", engine.mode());
    if let Some(status) = engine.status() {
        let _ = writeln!(out, "status: {status}");
    }
    let cursor = editor.cursor();
    let _ = writeln!(out, "cursor: {}:{}", cursor.line + 1, cursor.col + 1);
    let _ = writeln!(out, "---");
    out.push_str(&editor.text());
    Ok(out)
}

fn main() {
    env_logger::init();

    let args = parse_args(env::args().skip(1)).unwrap_or_else(|e| {
        eprintln!("vimkey: {e}");
        process::exit(2);
    });

    let config = match &args.config {
        Some(path) => Config::load(path),
        None => Config::builtin(),
    }
    .unwrap_or_else(|e| {
        eprintln!("vimkey: {e}");
        process::exit(1);
    });

    let text = match &args.file {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("vimkey: {}: {e}", path.display());
            process::exit(1);
        }),
        None => String::new(),
    };

    let script = if args.keys.is_empty() {
        let mut input = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut input) {
            eprintln!("vimkey: reading stdin: {e}");
            process::exit(1);
        }
        input.lines().map(str::to_string).collect()
    } else {
        args.keys
    };

    match run(config, &text, &script) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("vimkey: {e}");
            process::exit(1);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn args_split_options_from_keys() {
        let args = parse_args(strings(&["-f", "a.txt", "dw", "--config", "c.toml", "--", "-f"])).unwrap();
        assert_eq!(
            args,
            Args {
                config: Some("c.toml".into()),
                file: Some("a.txt".into()),
                keys: strings(&["dw", "-f"]),
            }
        );
        assert!(parse_args(strings(&["--file"])).is_err());
    }

    #[test]
    fn run_reports_state() {
        let report = run(Config::builtin().unwrap(), "one two", &strings(&["dw", "A!<Esc>"])).unwrap();
        assert_eq!(report, "mode: NORMAL\ncursor: 1:4\n---\ntwo!");
    }

    #[test]
    fn trailing_remap_prefix_is_flushed() {
        let config = Config::from_toml("[[insert_remaps]]\nbefore = \"jj\"\nafter = \"<Esc>\"\n").unwrap();
        let report = run(config, "", &strings(&["ij"])).unwrap();
        assert!(report.ends_with("---\nj"));
    }

    #[test]
    fn bad_notation_is_reported() {
        assert!(run(Config::builtin().unwrap(), "", &strings(&["<Ecs>"])).is_err());
    }
}
