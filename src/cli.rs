//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use refcheck_core::{
    DEFAULT_CACHE_TTL, DEFAULT_LINK_CONCURRENCY, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_RETRACTION_CONCURRENCY, DEFAULT_SERVICE_INTERVAL,
};

/// Verify reference links and check DOIs for retractions.
///
/// Refcheck extracts URLs, DOIs, and arXiv identifiers from a text document,
/// probes each link for reachability, and checks each DOI against retraction
/// records.
#[derive(Parser, Debug)]
#[command(name = "refcheck")]
#[command(author, version, about)]
pub struct Args {
    /// Input file to read references from (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Check links for reachability
    #[arg(short = 'c', long)]
    pub check_links: bool,

    /// Check DOIs for retractions
    #[arg(short = 'r', long)]
    pub check_retractions: bool,

    /// Emit the report as JSON instead of a text summary
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Submit reachable URLs to the Wayback Machine after checking
    #[arg(short = 'a', long)]
    pub archive: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent link probes (1-100)
    #[arg(long, default_value_t = DEFAULT_LINK_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum concurrent DOI lookups (1-10)
    #[arg(long, default_value_t = DEFAULT_RETRACTION_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub retraction_concurrency: u8,

    /// Per-request timeout in seconds (1-120)
    #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=120))]
    pub timeout: u64,

    /// Minimum delay between requests to the same service in milliseconds (0 to disable, max 60000)
    #[arg(long, default_value_t = DEFAULT_SERVICE_INTERVAL.as_millis() as u64, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: u64,

    /// How long check results stay cached, in seconds
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    pub cache_ttl: u64,
}

impl Args {
    /// Whether the link check should run.
    ///
    /// Selecting neither check runs both.
    #[must_use]
    pub fn links_enabled(&self) -> bool {
        self.check_links || !self.check_retractions
    }

    /// Whether the retraction check should run.
    ///
    /// Selecting neither check runs both.
    #[must_use]
    pub fn retractions_enabled(&self) -> bool {
        self.check_retractions || !self.check_links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["refcheck"]).unwrap();
        assert!(args.input.is_none());
        assert!(!args.check_links);
        assert!(!args.check_retractions);
        assert!(!args.json);
        assert!(args.output_file.is_none());
        assert!(!args.archive);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 5); // DEFAULT_LINK_CONCURRENCY
        assert_eq!(args.retraction_concurrency, 2); // DEFAULT_RETRACTION_CONCURRENCY
        assert_eq!(args.timeout, 10);
        assert_eq!(args.rate_limit, 1000);
        assert_eq!(args.cache_ttl, 900);
    }

    #[test]
    fn test_cli_positional_input_file() {
        let args = Args::try_parse_from(["refcheck", "paper.txt"]).unwrap();
        assert_eq!(args.input.unwrap(), PathBuf::from("paper.txt"));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["refcheck", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["refcheck", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["refcheck", "--verbose", "--verbose"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["refcheck", "-q"]).unwrap();
        assert!(args.quiet);

        let args = Args::try_parse_from(["refcheck", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let result = Args::try_parse_from(["refcheck", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        // --version causes early exit, so we check it returns an error with Version kind
        let result = Args::try_parse_from(["refcheck", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["refcheck", "--invalid-flag"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Check Selection Tests ====================

    #[test]
    fn test_cli_no_selection_enables_both_checks() {
        let args = Args::try_parse_from(["refcheck"]).unwrap();
        assert!(args.links_enabled());
        assert!(args.retractions_enabled());
    }

    #[test]
    fn test_cli_check_links_only() {
        let args = Args::try_parse_from(["refcheck", "-c"]).unwrap();
        assert!(args.check_links);
        assert!(args.links_enabled());
        assert!(!args.retractions_enabled());
    }

    #[test]
    fn test_cli_check_retractions_only() {
        let args = Args::try_parse_from(["refcheck", "--check-retractions"]).unwrap();
        assert!(args.check_retractions);
        assert!(!args.links_enabled());
        assert!(args.retractions_enabled());
    }

    #[test]
    fn test_cli_both_checks_selected_explicitly() {
        let args = Args::try_parse_from(["refcheck", "-c", "-r"]).unwrap();
        assert!(args.links_enabled());
        assert!(args.retractions_enabled());
    }

    // ==================== Output Flag Tests ====================

    #[test]
    fn test_cli_json_flag() {
        let args = Args::try_parse_from(["refcheck", "-j"]).unwrap();
        assert!(args.json);

        let args = Args::try_parse_from(["refcheck", "--json"]).unwrap();
        assert!(args.json);
    }

    #[test]
    fn test_cli_output_file_flag() {
        let args = Args::try_parse_from(["refcheck", "-o", "report.json"]).unwrap();
        assert_eq!(args.output_file.unwrap(), PathBuf::from("report.json"));
    }

    #[test]
    fn test_cli_archive_flag() {
        let args = Args::try_parse_from(["refcheck", "-a"]).unwrap();
        assert!(args.archive);

        let args = Args::try_parse_from(["refcheck", "--archive"]).unwrap();
        assert!(args.archive);
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_cli_concurrency_flag() {
        let args = Args::try_parse_from(["refcheck", "--concurrency", "20"]).unwrap();
        assert_eq!(args.concurrency, 20);
    }

    #[test]
    fn test_cli_concurrency_min_value() {
        let args = Args::try_parse_from(["refcheck", "--concurrency", "1"]).unwrap();
        assert_eq!(args.concurrency, 1);
    }

    #[test]
    fn test_cli_concurrency_max_value() {
        let args = Args::try_parse_from(["refcheck", "--concurrency", "100"]).unwrap();
        assert_eq!(args.concurrency, 100);
    }

    #[test]
    fn test_cli_concurrency_zero_rejected() {
        let result = Args::try_parse_from(["refcheck", "--concurrency", "0"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let result = Args::try_parse_from(["refcheck", "--concurrency", "101"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_retraction_concurrency_flag() {
        let args = Args::try_parse_from(["refcheck", "--retraction-concurrency", "10"]).unwrap();
        assert_eq!(args.retraction_concurrency, 10);
    }

    #[test]
    fn test_cli_retraction_concurrency_over_max_rejected() {
        let result = Args::try_parse_from(["refcheck", "--retraction-concurrency", "11"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Timeout Tests ====================

    #[test]
    fn test_cli_timeout_flag() {
        let args = Args::try_parse_from(["refcheck", "--timeout", "30"]).unwrap();
        assert_eq!(args.timeout, 30);
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let result = Args::try_parse_from(["refcheck", "--timeout", "0"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_max_value() {
        let args = Args::try_parse_from(["refcheck", "--timeout", "120"]).unwrap();
        assert_eq!(args.timeout, 120);
    }

    #[test]
    fn test_cli_timeout_over_max_rejected() {
        let result = Args::try_parse_from(["refcheck", "--timeout", "121"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Rate Limit Tests ====================

    #[test]
    fn test_cli_rate_limit_flag() {
        let args = Args::try_parse_from(["refcheck", "--rate-limit", "500"]).unwrap();
        assert_eq!(args.rate_limit, 500);
    }

    #[test]
    fn test_cli_rate_limit_zero_disables() {
        let args = Args::try_parse_from(["refcheck", "--rate-limit", "0"]).unwrap();
        assert_eq!(args.rate_limit, 0);
    }

    #[test]
    fn test_cli_rate_limit_max_value() {
        let args = Args::try_parse_from(["refcheck", "--rate-limit", "60000"]).unwrap();
        assert_eq!(args.rate_limit, 60000);
    }

    #[test]
    fn test_cli_rate_limit_over_max_rejected() {
        let result = Args::try_parse_from(["refcheck", "--rate-limit", "60001"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Cache TTL Tests ====================

    #[test]
    fn test_cli_cache_ttl_flag() {
        let args = Args::try_parse_from(["refcheck", "--cache-ttl", "60"]).unwrap();
        assert_eq!(args.cache_ttl, 60);
    }

    #[test]
    fn test_cli_combined_flags() {
        let args = Args::try_parse_from([
            "refcheck",
            "refs.txt",
            "-c",
            "-j",
            "--concurrency",
            "20",
            "--timeout",
            "30",
            "--rate-limit",
            "2000",
        ])
        .unwrap();
        assert_eq!(args.input.unwrap(), PathBuf::from("refs.txt"));
        assert!(args.check_links);
        assert!(args.json);
        assert_eq!(args.concurrency, 20);
        assert_eq!(args.timeout, 30);
        assert_eq!(args.rate_limit, 2000);
    }
}
