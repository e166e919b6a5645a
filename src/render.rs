use crate::agent::{AgentKind, Bounds};
use crate::roster::{AgentView, RosterStats};
use std::collections::HashMap;
use std::fmt::Write;

/// Downsamples the map into a `display` x `display` grid by sampling evenly
/// spaced map cells. Later agents overwrite earlier ones in the same cell;
/// dead agents are not drawn. Cost depends on the agent count and `display`,
/// never on the map size.
pub fn render_map(views: &[AgentView], bounds: Bounds, display: usize) -> String {
    let width = bounds.width.max(1) as usize;
    let height = bounds.height.max(1) as usize;
    let display = display.max(1);

    let occupied: HashMap<(usize, usize), char> = views
        .iter()
        .filter(|v| v.alive && bounds.contains(v.x, v.y))
        .map(|v| ((v.x as usize, v.y as usize), v.kind.symbol()))
        .collect();

    let mut out = String::with_capacity(display * (display + 1));
    for row in 0..display {
        let map_y = row * height / display;
        for col in 0..display {
            let map_x = col * width / display;
            out.push(occupied.get(&(map_x, map_y)).copied().unwrap_or('.'));
        }
        out.push('\n');
    }
    out
}

pub fn render_stats(stats: &RosterStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Alive: {}/{}", stats.alive, stats.total);
    for kind in AgentKind::ALL {
        let _ = writeln!(out, "{}: {}", plural(kind), stats.alive_of(kind));
    }
    out
}

pub fn render_frame(
    views: &[AgentView],
    bounds: Bounds,
    display: usize,
    elapsed_secs: u64,
) -> String {
    let stats = RosterStats::from_views(views);
    format!(
        "=== Game Time: {}s ===\nMap ({}x{}):\n{}\nStatistics:\n{}=========================",
        elapsed_secs,
        bounds.width,
        bounds.height,
        render_map(views, bounds, display),
        render_stats(&stats),
    )
}

fn plural(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::Rogue => "Rogues",
        AgentKind::Orc => "Orcs",
        AgentKind::Werewolf => "Werewolves",
        AgentKind::Pegasus => "Pegasus",
    }
}
