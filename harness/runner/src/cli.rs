use std::path::PathBuf;

use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct ParleyRunnerCli {
    /// Base URL of the chat service under test. The runner talks to
    /// `<endpoint>/chat` and probes `<endpoint>/health`.
    #[clap(short, long)]
    pub endpoint: Url,

    /// Path to the scenario corpus file (JSON or YAML, chosen by extension)
    #[clap(short, long)]
    pub corpus: PathBuf,

    /// The maximum number of scenarios simulated at the same time.
    ///
    /// This is a hard ceiling, not a target. Conversational services tend to
    /// be slow, so the default is deliberately low.
    #[clap(long, default_value = "2")]
    pub concurrency: usize,

    /// Poll the health probe until the service is ready instead of failing
    /// the run on the first unsuccessful probe.
    #[clap(long, default_value = "false")]
    pub wait_for_service: bool,

    /// How long to keep polling the health probe for, in seconds
    #[clap(long, default_value = "60")]
    pub wait_timeout: u64,

    /// Per-request timeout for calls to the chat service, in seconds.
    ///
    /// A call that exceeds it fails its scenario like any other transport
    /// fault, so a hung endpoint cannot hold a concurrency slot forever.
    #[clap(long, default_value = "30")]
    pub request_timeout: u64,

    /// Directory that report files are written into
    #[clap(long, default_value = "reports")]
    pub report_dir: PathBuf,

    /// Do not show the live progress line.
    ///
    /// Recommended for CI logs, where the redrawn line is only noise.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Use this run id instead of generating one
    #[clap(long)]
    pub run_id: Option<String>,
}
