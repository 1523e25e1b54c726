//! Terminal output formatting.

use colored::Colorize;

use estate_graph::queries::analytics::{DistrictAverage, DistrictCount, DistrictRooms, ExpensiveApartment};

/// Print average prices per district as a table.
pub fn print_district_averages(rows: &[DistrictAverage]) {
    if rows.is_empty() {
        println!("{}", "No priced apartments found.".dimmed());
        return;
    }

    println!("{:<6} {:<24} {:>14}", "PLZ", "District", "Avg. price");
    println!("{}", "─".repeat(46));
    for row in rows {
        println!(
            "{:<6} {:<24} {:>14}",
            row.postal_code,
            truncate(&row.district, 22),
            format_price(row.average_price).cyan()
        );
    }
}

/// Print apartment counts per district as a table.
pub fn print_district_counts(rows: &[DistrictCount]) {
    if rows.is_empty() {
        println!("{}", "No apartments found.".dimmed());
        return;
    }

    println!("{:<6} {:<24} {:>10}", "PLZ", "District", "Apartments");
    println!("{}", "─".repeat(42));
    for row in rows {
        println!(
            "{:<6} {:<24} {:>10}",
            row.postal_code,
            truncate(&row.district, 22),
            row.apartment_count.to_string().cyan()
        );
    }
}

/// Print apartments priced above the district average multiple.
pub fn print_expensive_apartments(rows: &[ExpensiveApartment], factor: f64) {
    if rows.is_empty() {
        println!("{}", format!("No apartment costs more than {}x its district average.", factor).dimmed());
        return;
    }

    println!("{:<16} {:<24} {:>14} {:>14}", "Apartment", "District", "Price", "District avg.");
    println!("{}", "─".repeat(71));
    for row in rows {
        println!(
            "{:<16} {:<24} {:>14} {:>14}",
            row.id,
            truncate(&row.district, 22),
            format_price(row.price as f64).red(),
            format_price(row.district_average_price)
        );
    }
}

/// Print districts below the room threshold.
pub fn print_overcrowded_districts(rows: &[DistrictRooms], threshold: f64) {
    if rows.is_empty() {
        println!("{}", format!("No district averages fewer than {} rooms.", threshold).dimmed());
        return;
    }

    println!("{:<6} {:<24} {:>10}", "PLZ", "District", "Avg. rooms");
    println!("{}", "─".repeat(42));
    for row in rows {
        println!(
            "{:<6} {:<24} {:>10}",
            row.postal_code,
            truncate(&row.district, 22),
            format!("{:.2}", row.average_rooms).yellow()
        );
    }
}

/// Format a price with thousands separators, rounded to whole euros.
pub fn format_price(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-€ {}", grouped)
    } else {
        format!("€ {}", grouped)
    }
}

/// Truncate a string to max display length.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(200000.0), "€ 200.000");
        assert_eq!(format_price(999.6), "€ 1.000");
        assert_eq!(format_price(1_500_001.0), "€ 1.500.001");
        assert_eq!(format_price(0.0), "€ 0");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Rudolfsheim-Fünfhaus", 22), "Rudolfsheim-Fünfhaus");
        assert_eq!(truncate("Rudolfsheim-Fünfhaus", 10), "Rudolfs...");
    }
}
