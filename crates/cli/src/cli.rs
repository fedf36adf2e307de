use clap::{Args, Parser, Subcommand};

/// Root CLI entrypoint for the council review pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "council",
    version,
    about = "Council review pipeline: tool server, run trigger and stage runner",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the control-plane tools over stdio (newline-delimited JSON-RPC)
    Serve,
    /// Print the staging area status
    Status,
    /// Submit a pipeline run for the current staged report and critique
    Trigger,
    /// Execute the three review stages in this process
    Run(RunArgs),
    /// Print a persisted review document
    Show(ShowArgs),
}

/// Inputs for an in-process pipeline run.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run identifier (`run_<8 hex>`); generated when omitted
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Run configuration JSON as submitted by the trigger
    #[arg(long, value_name = "JSON")]
    pub conf: Option<String>,

    /// Staged report file name; overrides the value in --conf
    #[arg(long, value_name = "FILE")]
    pub report: Option<String>,

    /// Critique file name; overrides the value in --conf
    #[arg(long, value_name = "FILE")]
    pub critique: Option<String>,

    /// Write review documents to an in-memory store instead of MongoDB
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Collection name (`reviews` or `council_review`)
    #[arg(long, value_name = "NAME")]
    pub collection: String,

    /// Document id returned by a stage
    #[arg(long, value_name = "ID")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse() {
        let args = RootArgs::try_parse_from([
            "council",
            "run",
            "--run-id",
            "run_0123abcd",
            "--report",
            "report_A.json",
            "--dry-run",
        ])
        .unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.run_id.as_deref(), Some("run_0123abcd"));
        assert_eq!(run.report.as_deref(), Some("report_A.json"));
        assert!(run.dry_run);
        assert!(run.conf.is_none());
    }

    #[test]
    fn show_requires_collection_and_id() {
        let parsed = RootArgs::try_parse_from(["council", "show", "--collection", "reviews"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(RootArgs::try_parse_from(["council"]).is_err());
    }
}
