use crate::demo::{
    run_breakdown, run_demo, run_rank, run_recommend, BreakdownArgs, DemoArgs, RankArgs,
    RecommendArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use talent_match::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Talent Match",
    about = "Score employees against high-performer benchmarks from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Rank candidates against a benchmark population
    Rank(RankArgs),
    /// Explain one employee's score variable by variable
    Breakdown(BreakdownArgs),
    /// Rank positions by how well an employee fits their high performers
    Recommend(RecommendArgs),
    /// Run ranking, breakdown and recommendations on the built-in sample dataset
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rank(args) => run_rank(args),
        Command::Breakdown(args) => run_breakdown(args),
        Command::Recommend(args) => run_recommend(args),
        Command::Demo(args) => run_demo(args),
    }
}
