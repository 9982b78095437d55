use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::actions::Action;
use crate::board::{Board, ALL_LINES};
use crate::cards::{Card, Suit};
use crate::hand_evaluator::evaluate;
use crate::royalty::Royalties;

pub fn colored_card(card: &Card) -> String {
    let text = card.to_string();
    match card.suit {
        Suit::Spades => text.white().to_string(),
        Suit::Hearts => text.red().to_string(),
        Suit::Diamonds => text.blue().to_string(),
        Suit::Clubs => text.green().to_string(),
    }
}

pub fn cards_display(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "-".dimmed().to_string();
    }
    cards.iter().map(colored_card).collect::<Vec<_>>().join(" ")
}

/// One row per line: cards, open slots and current hand class.
pub fn board_table(board: &Board) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Line"),
        Cell::new("Cards"),
        Cell::new("Free").set_alignment(CellAlignment::Right),
        Cell::new("Hand"),
    ]);

    for line in ALL_LINES {
        let cards = board.line(line);
        let hand = if cards.len() == line.capacity() {
            evaluate(cards).kind.to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(line.as_str().bold().to_string()),
            Cell::new(cards_display(cards)),
            Cell::new(board.free_slots(line)).set_alignment(CellAlignment::Right),
            Cell::new(hand),
        ]);
    }

    table.to_string()
}

pub fn action_display(action: &Action) -> String {
    let mut parts = Vec::new();
    for line in ALL_LINES {
        let placed = action.placed(line);
        if !placed.is_empty() {
            parts.push(format!("{} {}", line.as_str().bold(), cards_display(placed)));
        }
    }
    if !action.discarded.is_empty() {
        parts.push(format!("{} {}", "discard".dimmed(), cards_display(&action.discarded)));
    }
    parts.join("  ")
}

/// Ranked candidate moves with their scores.
pub fn actions_table(rows: &[(Action, f64)], limit: usize) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("Top"),
        Cell::new("Middle"),
        Cell::new("Bottom"),
        Cell::new("Discard"),
        Cell::new("Score").set_alignment(CellAlignment::Right),
    ]);

    for (i, (action, score)) in rows.iter().take(limit).enumerate() {
        let score_str = if *score >= 0.0 {
            format!("{:.2}", score).green().to_string()
        } else {
            format!("{:.2}", score).red().to_string()
        };
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(cards_display(&action.top)),
            Cell::new(cards_display(&action.middle)),
            Cell::new(cards_display(&action.bottom)),
            Cell::new(cards_display(&action.discarded)),
            Cell::new(score_str).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn royalty_table(royalties: &Royalties, dead: bool) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Line").set_alignment(CellAlignment::Left),
        Cell::new("Royalty").set_alignment(CellAlignment::Right),
    ]);

    for line in ALL_LINES {
        table.add_row(vec![
            Cell::new(line.as_str().bold().to_string()),
            Cell::new(royalties.get(line)).set_alignment(CellAlignment::Right),
        ]);
    }

    let total = if dead {
        "dead hand".red().bold().to_string()
    } else {
        royalties.total().to_string().green().bold().to_string()
    };
    table.add_row(vec![
        Cell::new("Total".bold().to_string()),
        Cell::new(total).set_alignment(CellAlignment::Right),
    ]);

    table.to_string()
}

pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    format!("{} {:.1}%", bar.cyan(), fraction * 100.0)
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
