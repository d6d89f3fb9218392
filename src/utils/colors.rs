// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipecheck contributors

//! Terminal styling shared by the CLI commands

use colored::Colorize;

/// Print a styled section heading
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a file that passed validation
pub fn print_valid(name: &str, detail: &str) {
    println!("  {} {} {}", "✓".green(), name, detail.dimmed());
}

/// Print a file that failed validation, on stderr
pub fn print_invalid(name: &str) {
    eprintln!("  {} {}", "✗".red(), name);
}

/// Dimmed ` [needs: a, b]` suffix, empty when there is nothing needed
pub fn needs_suffix(needs: &[String]) -> String {
    if needs.is_empty() {
        String::new()
    } else {
        format!(" [needs: {}]", needs.join(", ")).dimmed().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_suffix() {
        colored::control::set_override(false);
        assert_eq!(needs_suffix(&[]), "");
        assert_eq!(
            needs_suffix(&["a".to_string(), "b".to_string()]),
            " [needs: a, b]"
        );
    }
}
