#![cfg(feature = "cli")]

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead};

use clap::Parser;
use patricia_store::{Family, PrefixMap, PrefixMapOptions};

/// Interactive longest-prefix-match query tool over a loaded prefix list.
#[derive(Parser)]
struct Args {
    /// Newline-delimited `prefix,value` file; reads stdin if omitted.
    file: Option<String>,

    /// Build a V6 map instead of the V4 default.
    #[arg(long)]
    v6: bool,
}

fn load_prefixes(
    map: &mut PrefixMap<String>,
    reader: impl BufRead,
) -> Result<usize, Box<dyn Error>> {
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((prefix, value)) = line.split_once(',') else {
            println!("skipping malformed line: {line:?}");
            continue;
        };
        map.insert(prefix.trim(), value.trim().to_string())?;
        count += 1;
    }
    Ok(count)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let family = if args.v6 { Family::V6 } else { Family::V4 };
    let maxbits = family.maxbits();
    let mut map = PrefixMap::with_options(PrefixMapOptions {
        maxbits,
        family,
        raw_output: false,
    });

    let loaded = match &args.file {
        Some(path) => {
            let file = io::BufReader::new(File::open(path)?);
            load_prefixes(&mut map, file)?
        }
        None => load_prefixes(&mut map, io::stdin().lock())?,
    };
    println!("loaded {loaded} prefixes ({} stored)", map.len());

    println!(
        "commands: get <prefix>, contains <prefix>, children <prefix>, \
         parent <prefix>, freeze, thaw, quit"
    );
    let stdin = io::stdin();
    loop {
        print!("(patricia-store)> ");
        io::Write::flush(&mut io::stdout())?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let mut parts = line.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim();

        match cmd {
            "get" => match map.get(arg) {
                Ok(Some(v)) => println!("{v}"),
                Ok(None) => println!("no match"),
                Err(e) => println!("{e}"),
            },
            "contains" => println!("{}", map.contains(arg)),
            "children" => match map.children(arg) {
                Ok(keys) => {
                    for k in keys {
                        println!("{k}");
                    }
                }
                Err(e) => println!("{e}"),
            },
            "parent" => match map.parent(arg) {
                Ok(Some(k)) => println!("{k}"),
                Ok(None) => println!("no parent"),
                Err(e) => println!("{e}"),
            },
            "freeze" => {
                map.freeze();
                println!("frozen");
            }
            "thaw" => {
                map.thaw();
                println!("thawed");
            }
            "quit" => break,
            "" => {}
            other => println!("unknown command {other:?}"),
        }
    }
    Ok(())
}
