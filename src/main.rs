use clap::{Parser, Subcommand};

use files::SearchConfig;
use model::ScheduleError;
use optimize::{optimize, Method};

mod bayesian;
mod files;
mod generate;
mod genetic;
mod heuristics;
mod model;
mod optimize;
mod random_search;
mod simulate;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solves a given instance of the hybrid flow-shop scheduling problem
    Solve {
        /// Input CSV file containing jobs in the format "id,p_0,...,p_{s-1}"
        /// where each column p_i is the job's processing time at stage i.
        #[arg(short, long)]
        job_file: String,

        /// Input CSV file containing stage machine counts in the format
        /// "stage,machines".
        #[arg(short, long)]
        machines_file: String,

        /// Optimization method: spt, lpt, first-stage-spt, last-stage-spt,
        /// bottleneck, random, bayesian, or ga.
        #[arg(long)]
        method: String,

        /// Total objective evaluations (random/bayesian) or generations (ga).
        /// Ignored by the heuristic methods.
        #[arg(long, default_value_t = 100)]
        max_iterations: usize,

        /// Seed for the search RNG. Omit for a nondeterministic run.
        #[arg(long)]
        seed: Option<u64>,

        /// GA population size.
        #[arg(long, default_value_t = 30)]
        ga_population_size: usize,

        /// GA per-offspring mutation probability, in [0,1].
        #[arg(long, default_value_t = 0.2)]
        ga_mutation_rate: f64,

        /// GA tournament selection size.
        #[arg(long, default_value_t = 3)]
        ga_tournament_size: usize,

        /// GA elitism count.
        #[arg(long, default_value_t = 1)]
        ga_elitism_count: usize,

        /// Output CSV file for the resulting schedule. Defaults to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Generates a random instance of the hybrid flow-shop scheduling problem
    Generate {
        /// Number of jobs to generate
        #[arg(long)]
        jobs: usize,

        /// Number of stages to generate
        #[arg(long)]
        stages: usize,

        /// Minimum number of machines per stage
        #[arg(long, default_value_t = 1)]
        min_machines: usize,

        /// Maximum number of machines per stage
        #[arg(long, default_value_t = 1)]
        max_machines: usize,

        /// Minimum per-stage processing time
        #[arg(long, default_value_t = 1.0)]
        min_processing_time: f64,

        /// Maximum per-stage processing time
        #[arg(long, default_value_t = 10.0)]
        max_processing_time: f64,

        /// Seed for the instance generator. Omit for a nondeterministic run.
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV file for the generated jobs
        #[arg(long)]
        job_file: String,

        /// Output CSV file for the generated machine counts
        #[arg(long)]
        machines_file: String,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(err) = run(&cli.command) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(command: &Commands) -> Result<(), ScheduleError> {
    match command {
        Commands::Solve {
            job_file,
            machines_file,
            method,
            max_iterations,
            seed,
            ga_population_size,
            ga_mutation_rate,
            ga_tournament_size,
            ga_elitism_count,
            output,
        } => {
            let config = SearchConfig {
                max_iterations: *max_iterations,
                random_seed: *seed,
                ga_population_size: *ga_population_size,
                ga_mutation_rate: *ga_mutation_rate,
                ga_tournament_size: *ga_tournament_size,
                ga_elitism_count: *ga_elitism_count,
            };
            let instance = files::read_instance(job_file, machines_file, config)?;
            let method: Method = method.parse()?;

            let result = optimize(&instance, method)?;
            log::info!("method {method} found makespan {}", result.makespan);

            match output {
                Some(path) => files::write_result(path, &result)?,
                None => print_result(&result),
            }
            Ok(())
        }
        Commands::Generate {
            jobs,
            stages,
            min_machines,
            max_machines,
            min_processing_time,
            max_processing_time,
            seed,
            job_file,
            machines_file,
        } => {
            let instance = generate::instance(
                *jobs,
                *stages,
                *min_machines,
                *max_machines,
                *min_processing_time,
                *max_processing_time,
                *seed,
                100,
                30,
                0.2,
                3,
                1,
            );
            files::write_jobs(job_file, &instance)?;
            files::write_machines(machines_file, &instance)?;
            log::info!(
                "generated instance with {} jobs and {} stages",
                instance.num_jobs,
                instance.num_stages
            );
            Ok(())
        }
    }
}

fn print_result(result: &model::ScheduleResult) {
    println!("makespan,{}", result.makespan);
    println!("job_id,stage_id,machine_id,global_machine_id,start_time,end_time");
    for task in &result.schedule {
        println!(
            "{},{},{},{},{},{}",
            task.job_id,
            task.stage_id,
            task.machine_id,
            task.global_machine_id,
            task.start_time,
            task.end_time
        );
    }
}
