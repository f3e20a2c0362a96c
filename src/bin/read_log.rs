use std::{collections::BTreeMap, path::Path};

use clap::Parser;
use cold_mail::send_log::{read_entries, skip_set_from};

#[derive(Parser, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
#[command(author, version, about)]
/// Prints the entries of a send log and what a resumed run would skip
struct Cli {
    /// Specifies the send log to be read in
    #[arg(value_name = "PATH", default_value = "sent_log.csv")]
    log_filename: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let entries = read_entries(Path::new(&cli.log_filename))?;

    let mut per_status: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries.iter() {
        *per_status.entry(entry.status.to_string()).or_default() += 1;
        match &entry.error {
            Some(error) => println!("{} {} {} ({error})", entry.timestamp, entry.status, entry.email),
            None => println!("{} {} {}", entry.timestamp, entry.status, entry.email),
        }
    }

    println!("-----");
    for (status, count) in per_status {
        println!("{status}: {count}");
    }
    println!("Addresses skipped on resume: {}", skip_set_from(&entries).len());
    Ok(())
}
