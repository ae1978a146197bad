mod error;
mod listing;

use clap::{Arg, ArgAction, Command};
use error::TraceError;
use stackmap::TrackerSettings;
use std::fs;
use std::io::{self, Read};

fn main() -> Result<(), TraceError> {
    env_logger::init();

    let matches = Command::new("Stack map frame tracer")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Print the stack map frames of the methods in a bytecode listing")
        .arg(
            Arg::new("no-goto-elision")
                .long("no-goto-elision")
                .action(ArgAction::SetTrue)
                .help("Keep a `goto` even if its target is placed right after it"),
        )
        .arg(
            Arg::new("strict-merges")
                .long("strict-merges")
                .action(ArgAction::SetTrue)
                .help("Reject merges of frames whose types don't match"),
        )
        .arg(
            Arg::new("scope-frames")
                .long("scope-frames")
                .action(ArgAction::SetTrue)
                .help("Require a frame wherever a `.endscope` closes a scope"),
        )
        .arg(
            Arg::new("no-entry-frame")
                .long("no-entry-frame")
                .action(ArgAction::SetTrue)
                .help("Don't record the entry frame of each method"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Listing to read (defaults to standard input)")
                .required(false)
                .index(1),
        )
        .get_matches();

    let mut settings = TrackerSettings::new();
    settings.elide_redundant_gotos = !matches.get_flag("no-goto-elision");
    settings.strict_merges = matches.get_flag("strict-merges");
    settings.frame_at_scope_exit = matches.get_flag("scope-frames");
    settings.record_entry_frame = !matches.get_flag("no-entry-frame");

    let source = match matches.get_one::<String>("INPUT") {
        Some(path) => {
            log::info!("Reading listing '{}'", path);
            fs::read_to_string(path)?
        }
        None => {
            log::info!("Reading listing from standard input");
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            source
        }
    };

    let methods = listing::trace_listing(&source, &settings)?;
    let mut output = String::new();
    for method in &methods {
        // Writing to a `String` never fails
        let _ = listing::render(method, &mut output);
    }
    print!("{}", output);

    Ok(())
}
