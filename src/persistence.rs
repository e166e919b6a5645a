// Roster files: one `type,name,x,y,alive` record per line, no header.

use crate::agent::{Agent, AgentKind, Bounds};
use crate::error::Result;
use crate::roster::Roster;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct LoadedRoster {
    pub roster: Roster,
    pub loaded: usize,
    pub skipped: usize,
}

pub fn save_roster<W: Write>(roster: &Roster, out: W, alive_only: bool) -> Result<usize> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    let mut written = 0;

    for agent in roster.snapshot() {
        if alive_only && !agent.is_alive() {
            continue;
        }
        let pos = agent.position();
        let (x, y) = (pos.x.to_string(), pos.y.to_string());
        writer.write_record([
            agent.kind().name(),
            agent.name(),
            x.as_str(),
            y.as_str(),
            if agent.is_alive() { "1" } else { "0" },
        ])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}

pub fn save_roster_file(
    roster: &Roster,
    path: impl AsRef<Path>,
    alive_only: bool,
) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    save_roster(roster, file, alive_only)
}

/// Reads records, skipping (and counting) anything that can't become an agent.
/// Only I/O failures abort the load.
pub fn load_roster<R: Read>(input: R, bounds: Bounds) -> Result<LoadedRoster> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let roster = Roster::new();
    let mut loaded = 0;
    let mut skipped = 0;

    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable roster line {}: {}", line + 1, e);
                skipped += 1;
                continue;
            }
        };

        match parse_record(&record, bounds) {
            Some(agent) => match roster.insert(agent) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    warn!("Skipping roster line {}: {}", line + 1, e);
                    skipped += 1;
                }
            },
            None => {
                warn!("Skipping malformed roster line {}: {:?}", line + 1, record);
                skipped += 1;
            }
        }
    }

    debug!("Loaded {} agents, skipped {}", loaded, skipped);
    Ok(LoadedRoster { roster, loaded, skipped })
}

pub fn load_roster_file(path: impl AsRef<Path>, bounds: Bounds) -> Result<LoadedRoster> {
    let file = std::fs::File::open(path)?;
    load_roster(file, bounds)
}

fn parse_record(record: &StringRecord, bounds: Bounds) -> Option<Agent> {
    if record.len() < 5 {
        return None;
    }

    let kind: AgentKind = record.get(0)?.parse().ok()?;
    let name = record.get(1)?;
    if name.is_empty() {
        return None;
    }
    let x: i32 = record.get(2)?.parse().ok()?;
    let y: i32 = record.get(3)?.parse().ok()?;
    let alive = record.get(4)?.parse::<i64>().ok()? != 0;

    let agent = Agent::new(name, kind, x, y, bounds).ok()?;
    if !alive {
        agent.die();
    }
    Some(agent)
}
