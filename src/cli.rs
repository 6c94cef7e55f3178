use anyhow::{Context, Result, anyhow};
use log::info;
use pico_args::Arguments;
use std::{
    env, fs,
    io::{self, BufReader},
};

use touchmanip::config::{Profile, ProfileStore};
use touchmanip::replay::{self, InertiaOptions, ReplayOptions};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("replay") => {
            let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;
            let no_inertia = pargs.contains("--no-inertia");
            let path: String = pargs.free_from_str().map_err(|_| {
                anyhow!("usage: touchmanip replay <trace.jsonl|-> [--profile NAME] [--no-inertia]")
            })?;

            let store = ProfileStore::load_or_install_default()?;
            let profile = match profile_name {
                Some(name) => store.profile_named(&name)?,
                None => store.profile.clone(),
            };
            let opts = replay_options(&profile, no_inertia)?;

            let stdout = io::stdout().lock();
            let summary = if path == "-" {
                replay::replay(io::stdin().lock(), stdout, &opts)?
            } else {
                let file = fs::File::open(&path).with_context(|| format!("failed to open {path}"))?;
                replay::replay(BufReader::new(file), stdout, &opts)?
            };
            info!("{path}: {} frame(s) replayed", summary.frames);
            Ok(())
        }

        Some("list") => {
            let store = ProfileStore::load_or_install_default()?;
            for name in store.list_profiles() {
                let mark = if name == store.active_name { '*' } else { ' ' };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: touchmanip use <profile_name>"))?;
            let mut store = ProfileStore::load_or_install_default()?;
            store.set_active(&name)?;
            println!("ok: active profile is now {name}");
            Ok(())
        }

        Some("show") => {
            let name: Option<String> = pargs.free_from_str().ok();
            let store = ProfileStore::load_or_install_default()?;
            let profile = match name {
                Some(n) => store.profile_named(&n)?,
                None => store.profile.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn replay_options(profile: &Profile, no_inertia: bool) -> Result<ReplayOptions> {
    let inertia = (profile.inertia.enabled && !no_inertia).then(|| InertiaOptions {
        defaults: profile.inertia_defaults(),
        tick_ms: profile.inertia.tick_ms,
    });
    Ok(ReplayOptions {
        settings: profile.manipulation_settings()?,
        inertia,
    })
}

fn print_help() {
    println!(
        r#"touchmanip - multi-touch manipulation and inertia processor

USAGE:
  touchmanip help [command]               Show general or command-specific help
  touchmanip replay <trace.jsonl|->       Replay a contact trace, print events as JSON lines
  touchmanip list                         List profiles
  touchmanip use <name>                   Switch active profile
  touchmanip show [name]                  Print a profile as JSON

TIPS:
  - Profiles: ~/.config/touchmanip/profiles
  - Active profile pointer: ~/.config/touchmanip/active
  - RUST_LOG=debug shows sequence and inertia lifecycle
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "replay" => println!(
            "usage: touchmanip replay <trace.jsonl|-> [--profile NAME] [--no-inertia]\n\
             Each line is {{\"t\": <100ns ticks>, \"contacts\": [{{\"id\": 1, \"x\": 0.0, \"y\": 0.0}}]}}.\n\
             Releases hand off to inertia unless disabled."
        ),
        "list" => {
            println!("usage: touchmanip list\nLists available profiles; marks active with '*'.")
        }
        "use" => println!("usage: touchmanip use <name>\nSwitches active profile to <name>."),
        "show" => println!(
            "usage: touchmanip show [name]\nPrints the named (or active) profile as JSON."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}
