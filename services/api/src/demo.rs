use crate::infra::{build_engine, DataSource, Engine};
use chrono::Local;
use clap::Args;
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use talent_match::config::{AppConfig, MatchingConfig};
use talent_match::error::AppError;
use talent_match::matching::{
    dataset, Baseline, BenchmarkFilters, BenchmarkSpec, EmployeeId, InMemoryReadingsProvider,
    MatchBreakdown, Pagination, PositionRecommendations, RankQuery, RankedPage, ResultFilter,
};

const DEMO_EMPLOYEES: &str = "\
employee_id,fullname,position_id,department_id,division_id,grade_id,rating
EMP001,Ayu Lestari,1,10,100,3,5
EMP002,Budi Santoso,1,10,100,3,4
EMP003,Citra Dewanti,2,20,100,4,5
EMP004,Dimas Pratama,2,20,100,3,3
EMP005,Eka Putri,3,30,200,4,5
EMP006,Fajar Nugroho,3,30,200,2,2
EMP007,Gita Maharani,1,10,100,2,5
EMP008,Hendra Wijaya,2,20,100,2,
";

const DEMO_POSITIONS: &str = "\
position_id,name
1,Data Analyst
2,Software Engineer
3,Product Manager
";

/// One row per employee, one column per variable; converted to the long CSV layout on load.
const DEMO_READINGS_WIDE: &str = "\
employee_id,GDR,CEX,IDS,QDD,STO,SEA,VCU,LIE,FTC,CSI,iq,gtq,tiki,pauli,faxtor,Papi_N,Papi_L,Papi_F,Papi_I,Papi_K,Papi_Z,Papi_T,Papi_G,Papi_A,mbti,disc,strength_top
EMP001,5,4,5,4,4,3,4,4,5,4,124,31,8,62,58,7,6,7,3,4,3,4,7,6,INTJ,DC,Analytical
EMP002,4,4,4,3,4,4,3,3,4,3,112,27,7,55,51,6,5,6,4,5,5,4,6,5,ISTJ,C,Deliberative
EMP003,4,5,4,5,3,3,4,4,4,4,128,33,9,70,61,8,5,6,2,3,4,3,8,7,INTP,DC,Learner
EMP004,3,4,3,3,4,4,3,2,3,3,109,25,6,48,47,5,4,5,6,6,6,5,5,5,ENFP,I,Ideation
EMP005,5,4,4,4,5,5,5,5,4,5,118,29,8,64,56,7,8,8,4,3,3,4,7,8,ENTJ,D,Command
EMP006,2,3,2,3,3,4,2,2,2,2,97,21,5,41,39,4,3,4,7,8,7,6,4,3,ISFP,S,Harmony
EMP007,4,5,5,4,4,4,4,3,5,4,121,30,,60,55,7,6,7,3,4,4,3,7,6,intj,DC,analytical
EMP008,3,3,,3,3,3,3,2,3,3,,24,6,45,,5,4,5,5,5,5,5,5,4,ISTP,C,Focus
";

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct SourceArgs {
    /// Directory containing employees.csv, readings.csv and positions.csv (defaults to MATCH_DATA_DIR, then the demo dataset)
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// JSON variable registry (defaults to MATCH_REGISTRY_PATH, then the standard model)
    #[arg(long)]
    pub(crate) registry: Option<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct BenchmarkArgs {
    /// Minimum rating for benchmark membership (defaults to MATCH_MIN_RATING)
    #[arg(long, value_parser = crate::infra::parse_rating)]
    pub(crate) min_rating: Option<u8>,
    /// Comma-separated employee ids used as a manual benchmark
    #[arg(long, value_delimiter = ',')]
    pub(crate) benchmark: Vec<String>,
    /// Restrict the benchmark to a position
    #[arg(long)]
    pub(crate) position: Option<u32>,
    /// Restrict the benchmark to a department
    #[arg(long)]
    pub(crate) department: Option<u32>,
    /// Restrict the benchmark to a division
    #[arg(long)]
    pub(crate) division: Option<u32>,
    /// Restrict the benchmark to a grade
    #[arg(long)]
    pub(crate) grade: Option<u32>,
}

impl BenchmarkArgs {
    fn spec(&self, default_min_rating: u8) -> BenchmarkSpec {
        let spec = BenchmarkSpec::new(self.min_rating.unwrap_or(default_min_rating)).with_filters(
            BenchmarkFilters {
                position_id: self.position,
                department_id: self.department,
                division_id: self.division,
                grade_id: self.grade,
            },
        );
        if self.benchmark.is_empty() {
            spec
        } else {
            spec.with_manual(self.benchmark.iter().map(String::as_str))
        }
    }
}

/// Narrows the ranked results; the benchmark is unaffected.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ResultFilterArgs {
    /// Case-insensitive name search applied to the ranked results
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Comma-separated employee ids to score instead of everyone
    #[arg(long, value_delimiter = ',')]
    pub(crate) candidates: Vec<String>,
    /// Only rank employees in this position
    #[arg(long)]
    pub(crate) filter_position: Option<u32>,
    /// Only rank employees in this department
    #[arg(long)]
    pub(crate) filter_department: Option<u32>,
    /// Only rank employees in this division
    #[arg(long)]
    pub(crate) filter_division: Option<u32>,
    /// Only rank employees in this grade
    #[arg(long)]
    pub(crate) filter_grade: Option<u32>,
    /// Lowest rating shown in the results (default 1)
    #[arg(long, value_parser = crate::infra::parse_rating)]
    pub(crate) filter_min_rating: Option<u8>,
    /// Highest rating shown in the results (default 5)
    #[arg(long, value_parser = crate::infra::parse_rating)]
    pub(crate) filter_max_rating: Option<u8>,
}

impl ResultFilterArgs {
    fn filter(&self) -> ResultFilter {
        let defaults = ResultFilter::default();
        let candidate_ids = if self.candidates.is_empty() {
            None
        } else {
            Some(
                self.candidates
                    .iter()
                    .map(|id| EmployeeId::from(id.as_str()))
                    .collect(),
            )
        };

        ResultFilter {
            position_id: self.filter_position,
            department_id: self.filter_department,
            division_id: self.filter_division,
            grade_id: self.filter_grade,
            min_rating: self.filter_min_rating.unwrap_or(defaults.min_rating),
            max_rating: self.filter_max_rating.unwrap_or(defaults.max_rating),
            name_contains: self.name.clone(),
            candidate_ids,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct RankArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    #[command(flatten)]
    pub(crate) benchmark: BenchmarkArgs,
    #[command(flatten)]
    pub(crate) filter: ResultFilterArgs,
    /// Page to display (1-based)
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
    /// Results per page (defaults to MATCH_PAGE_SIZE)
    #[arg(long)]
    pub(crate) per_page: Option<usize>,
    /// Print the ranked page as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BreakdownArgs {
    /// Employee to explain
    pub(crate) employee_id: String,
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    #[command(flatten)]
    pub(crate) benchmark: BenchmarkArgs,
    /// Number of strongest and weakest variables to list
    #[arg(long, default_value_t = 3)]
    pub(crate) top: usize,
    /// Print the full breakdown as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Employee to place
    pub(crate) employee_id: String,
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    /// Minimum rating for each position's benchmark (defaults to MATCH_MIN_RATING)
    #[arg(long, value_parser = crate::infra::parse_rating)]
    pub(crate) min_rating: Option<u8>,
    /// Print the recommendations as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Employee used for the breakdown and recommendation sections
    #[arg(long, default_value = "EMP004")]
    pub(crate) employee: String,
    /// Number of ranked candidates and gap rows to show
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            employee: "EMP004".to_string(),
            top: 5,
        }
    }
}

/// Sample directory and readings bundled with the binary.
pub(crate) fn demo_provider() -> Result<InMemoryReadingsProvider, AppError> {
    let mut readings = Vec::new();
    dataset::pivot_wide_readings(Cursor::new(DEMO_READINGS_WIDE), &mut readings)?;
    let provider = dataset::from_readers(
        Cursor::new(DEMO_EMPLOYEES),
        Cursor::new(readings),
        Some(Cursor::new(DEMO_POSITIONS)),
    )?;
    Ok(provider)
}

fn engine_for(source: &SourceArgs) -> Result<(Arc<Engine>, DataSource, MatchingConfig), AppError> {
    let mut config = AppConfig::load()?.matching;
    if let Some(dir) = &source.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(path) = &source.registry {
        config.registry_path = Some(path.clone());
    }
    let (engine, data_source) = build_engine(&config)?;
    Ok((engine, data_source, config))
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let (engine, source, config) = engine_for(&args.source)?;
    let query = RankQuery {
        benchmark: args.benchmark.spec(config.min_rating),
        filter: args.filter.filter(),
        pagination: Pagination::new(args.page, args.per_page.unwrap_or(config.page_size)),
    };
    let page = engine.rank_candidates(&query)?;

    if args.json {
        print_json(&page);
    } else {
        println!("Data source: {}", source.label());
        render_ranked_page(&page);
    }
    Ok(())
}

pub(crate) fn run_breakdown(args: BreakdownArgs) -> Result<(), AppError> {
    let (engine, source, config) = engine_for(&args.source)?;
    let spec = args.benchmark.spec(config.min_rating);
    let breakdown = engine.breakdown_for(&EmployeeId::from(args.employee_id.as_str()), &spec)?;

    if args.json {
        print_json(&breakdown);
    } else {
        println!("Data source: {}", source.label());
        render_breakdown(&breakdown, args.top);
    }
    Ok(())
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let (engine, source, config) = engine_for(&args.source)?;
    let min_rating = args.min_rating.unwrap_or(config.min_rating);
    let recommendations =
        engine.recommend_positions_for(&EmployeeId::from(args.employee_id.as_str()), min_rating)?;

    if args.json {
        print_json(&recommendations);
    } else {
        println!("Data source: {}", source.label());
        render_recommendations(&recommendations);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (engine, _, config) = build_demo_engine()?;
    let employee_id = EmployeeId::from(args.employee.as_str());

    println!("Talent match demo");
    println!("Generated at {}", Local::now().format("%Y-%m-%d %H:%M"));
    println!(
        "Benchmark: employees rated {} or higher across the organisation",
        config.min_rating
    );

    let page = engine.rank_candidates(&RankQuery {
        benchmark: BenchmarkSpec::new(config.min_rating),
        filter: ResultFilter::default(),
        pagination: Pagination::new(1, args.top.max(1)),
    })?;
    println!();
    render_ranked_page(&page);

    let breakdown = match engine.breakdown_for(&employee_id, &BenchmarkSpec::new(config.min_rating)) {
        Ok(breakdown) => breakdown,
        Err(err) => {
            println!("\nBreakdown unavailable: {}", err);
            return Ok(());
        }
    };
    println!();
    render_breakdown(&breakdown, args.top);

    match engine.recommend_positions_for(&employee_id, config.min_rating) {
        Ok(recommendations) => {
            println!();
            render_recommendations(&recommendations);
        }
        Err(err) => println!("\nRecommendations unavailable: {}", err),
    }

    Ok(())
}

fn build_demo_engine() -> Result<(Arc<Engine>, DataSource, MatchingConfig), AppError> {
    let config = MatchingConfig::default();
    let (engine, source) = build_engine(&config)?;
    Ok((engine, source, config))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("JSON output unavailable: {}", err),
    }
}

pub(crate) fn render_ranked_page(page: &RankedPage) {
    println!(
        "Ranking against {} benchmark of {} employees (fingerprint {})",
        page.benchmark.mode.label(),
        page.benchmark.size,
        page.benchmark.fingerprint
    );
    println!(
        "Page {}/{} | {} candidates scored",
        page.page, page.total_pages, page.total
    );

    if page.items.is_empty() {
        println!("- no candidates matched the result filters");
    }
    for item in &page.items {
        let rating = item
            .rating
            .map(|rating| rating.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}. {} {} | rating {} | score {:.1}",
            item.rank, item.employee_id, item.fullname, rating, item.final_score
        );
    }

    if page.skipped.count > 0 {
        let skipped: Vec<&str> = page
            .skipped
            .employee_ids
            .iter()
            .map(EmployeeId::as_str)
            .collect();
        println!("Skipped unknown candidates: {}", skipped.join(", "));
    }
    if !page.undefined_baselines.is_empty() {
        println!(
            "Variables without benchmark readings (scored neutral): {}",
            page.undefined_baselines.join(", ")
        );
    }
}

pub(crate) fn render_breakdown(breakdown: &MatchBreakdown, top: usize) {
    println!(
        "Match breakdown for {} | final score {:.1}",
        breakdown.employee_id, breakdown.final_score
    );
    println!(
        "Benchmark: {} selection, {} employees",
        breakdown.benchmark.mode.label(),
        breakdown.benchmark.size
    );

    println!("\nGroup scores");
    for group in &breakdown.groups {
        println!(
            "- {} (weight {:.2}): {:.1} from {} variables",
            group.group, group.weight, group.match_rate, group.contributing_variables
        );
    }

    println!("\nStrongest variables");
    for row in breakdown.strongest(top) {
        println!("- {} [{}]: {:.1}", row.label, row.group, row.match_rate);
    }

    println!("\nLargest gaps");
    for row in breakdown.weakest(top) {
        let candidate = row
            .candidate_value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "missing".to_string());
        let baseline = match &row.baseline {
            Some(Baseline::Numeric(value)) => format!("{value:.1}"),
            Some(Baseline::Categorical(value)) => value.clone(),
            None => "undefined".to_string(),
        };
        println!(
            "- {} [{}, {}]: {:.1} (candidate {}, benchmark {})",
            row.label,
            row.group,
            row.kind.label(),
            row.match_rate,
            candidate,
            baseline
        );
    }

    if breakdown.is_low_confidence() {
        println!(
            "\nLow confidence: {} warnings attached to this score",
            breakdown.warnings.len()
        );
    }
}

pub(crate) fn render_recommendations(recommendations: &PositionRecommendations) {
    println!(
        "Position fit for {} (benchmarks rated {} or higher)",
        recommendations.employee_id, recommendations.min_rating
    );
    if recommendations.matches.is_empty() {
        println!("- no position has a qualifying benchmark");
    }
    for (index, entry) in recommendations.matches.iter().enumerate() {
        println!(
            "{:>3}. {} (#{}) | score {:.1} | benchmark of {}",
            index + 1,
            entry.position_name,
            entry.position_id,
            entry.final_score,
            entry.benchmark_size
        );
    }
    if !recommendations.skipped_positions.is_empty() {
        let skipped: Vec<String> = recommendations
            .skipped_positions
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("Positions without high performers: {}", skipped.join(", "));
    }
}
