//! Command-line interface definition using clap.

use clap::Parser;

/// Consolidate Google Voice Takeout HTML exports into per-conversation
/// JSON archives with exact statistics.
#[derive(Parser, Debug, Clone)]
#[command(name = "voicepack")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    voicepack Takeout/Voice/Calls --own-number +15550100100
    voicepack Calls --own-number +15550100100 --newer-than 2024-01-01
    voicepack Calls --own-number +15550100100 --aliases contacts.json --require-alias
    voicepack Calls --own-number +15550100100 --stats-csv stats.csv")]
pub struct Args {
    /// Directory containing the Takeout HTML fragments
    pub input: String,

    /// Output directory for conversation artifacts and the run index
    #[arg(short, long, default_value = "voicepack_out")]
    pub output: String,

    /// The account holder's phone number
    #[arg(long, value_name = "E164")]
    pub own_number: String,

    /// Keep only messages on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub newer_than: Option<String>,

    /// Keep only messages on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub older_than: Option<String>,

    /// JSON file mapping phone numbers to contact aliases
    #[arg(long, value_name = "FILE")]
    pub aliases: Option<String>,

    /// Keep only conversations whose counterpart has a registered alias
    #[arg(long)]
    pub require_alias: bool,

    /// Keep toll-free and short-code counterparts
    #[arg(long)]
    pub include_service_codes: bool,

    /// Directory containing attachment files (defaults to the input
    /// directory)
    #[arg(long, value_name = "DIR")]
    pub attachments_dir: Option<String>,

    /// Also write a per-conversation statistics table to this CSV file
    #[arg(long, value_name = "FILE")]
    pub stats_csv: Option<String>,

    /// Worker pool size for fragment processing
    #[arg(long, default_value_t = 4)]
    pub workers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["voicepack", "Calls", "--own-number", "+15550100100"]);
        assert_eq!(args.input, "Calls");
        assert_eq!(args.own_number, "+15550100100");
        assert_eq!(args.workers, 4);
        assert!(!args.require_alias);
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "voicepack",
            "Calls",
            "--own-number",
            "+15550100100",
            "--newer-than",
            "2024-01-01",
            "--require-alias",
            "--workers",
            "8",
            "--stats-csv",
            "stats.csv",
        ]);
        assert_eq!(args.newer_than.as_deref(), Some("2024-01-01"));
        assert!(args.require_alias);
        assert_eq!(args.workers, 8);
        assert_eq!(args.stats_csv.as_deref(), Some("stats.csv"));
    }
}
