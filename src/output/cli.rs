use crate::model::{GameCandidate, ScanResult, SourceKind};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct GameRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Executable")]
    executable: String,
    #[tabled(rename = "ID")]
    id: String,
}

#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "Strategy")]
    name: String,
    #[tabled(rename = "Found")]
    found: usize,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    println!();
    println!(
        "Scan completed at: {}",
        result.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    if result.games.is_empty() {
        println!("No games found.");
    } else {
        println!("Found {} games:", result.games.len());
        println!();

        let rows: Vec<GameRow> = result.games.iter().map(game_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    if result.strategies.iter().any(|s| s.error.is_some()) {
        println!();
        println!("Strategies:");
        println!();

        let rows: Vec<StrategyRow> = result
            .strategies
            .iter()
            .map(|s| StrategyRow {
                name: s.name.clone(),
                found: s.found,
                status: match &s.error {
                    Some(e) => format!("\x1b[31mfailed\x1b[0m: {}", truncate(e, 50)),
                    None => "ok".to_string(),
                },
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    println!();
    print_summary(result);

    Ok(())
}

fn game_row(game: &GameCandidate) -> GameRow {
    GameRow {
        source: game.source.display_name().to_string(),
        name: truncate(&game.display_name, 40),
        executable: match &game.executable_path {
            Some(path) => truncate_left(&path.to_string_lossy(), 60),
            None => "-".to_string(),
        },
        id: if game.has_identity() {
            truncate(&game.identity_key, 40)
        } else {
            "-".to_string()
        },
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Keeps the end of long paths, where the file name is.
fn truncate_left(s: &str, max_len: usize) -> String {
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - max_len.saturating_sub(3)).collect();
        format!("...{}", tail)
    }
}

fn print_summary(result: &ScanResult) {
    let unresolved = result
        .games
        .iter()
        .filter(|g| g.executable_path.is_none())
        .count();

    println!("Summary:");
    if unresolved > 0 {
        println!(
            "  Total games: {} ({} without a resolved executable)",
            result.games.len(),
            unresolved
        );
    } else {
        println!("  Total games: {}", result.games.len());
    }

    let by_source: Vec<String> = SourceKind::all()
        .iter()
        .map(|s| (s, result.count_by_source(*s)))
        .filter(|(_, count)| *count > 0)
        .map(|(s, count)| format!("{} {}", count, s.display_name()))
        .collect();

    // Show breakdown by source if multiple sources
    if by_source.len() > 1 {
        println!("  By source: {}", by_source.join(", "));
    }
}
