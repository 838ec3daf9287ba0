//! The optimizer façade: a single entry point, `optimize`, dispatching to
//! the heuristics and search algorithms by `Method`. See `SPEC_FULL.md`
//! §4.6.

use crate::genetic::genetic_search;
use crate::heuristics;
use crate::model::{Instance, ScheduleError, ScheduleResult};
use crate::random_search::random_search;
use crate::{bayesian::bayesian_search, simulate::simulate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The optimization methods exposed by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Method {
    Spt,
    Lpt,
    FirstStageSpt,
    LastStageSpt,
    Bottleneck,
    Random,
    Bayesian,
    Ga,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Spt => "SPT",
            Method::Lpt => "LPT",
            Method::FirstStageSpt => "FirstStageSPT",
            Method::LastStageSpt => "LastStageSPT",
            Method::Bottleneck => "Bottleneck",
            Method::Random => "Random",
            Method::Bayesian => "Bayesian",
            Method::Ga => "GA",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Method {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spt" => Ok(Method::Spt),
            "lpt" => Ok(Method::Lpt),
            "firststagespt" | "first-stage-spt" | "first_stage_spt" => Ok(Method::FirstStageSpt),
            "laststagespt" | "last-stage-spt" | "last_stage_spt" => Ok(Method::LastStageSpt),
            "bottleneck" => Ok(Method::Bottleneck),
            "random" => Ok(Method::Random),
            "bayesian" => Ok(Method::Bayesian),
            "ga" | "genetic" => Ok(Method::Ga),
            other => Err(ScheduleError::UnknownMethod(other.to_string())),
        }
    }
}

/// Runs `method` against `instance` and returns the resulting schedule.
///
/// Every branch validates `instance` before running any simulation, either
/// directly or transitively through the heuristic/search function it calls.
///
/// # Errors
/// Returns `ScheduleError::InvalidInstance` if `instance` fails validation,
/// or whatever error the chosen method's search loop produces.
pub fn optimize(instance: &Instance, method: Method) -> Result<ScheduleResult, ScheduleError> {
    instance.validate()?;
    log::info!("optimizing {} jobs with method {method}", instance.num_jobs);

    match method {
        Method::Spt => simulate(instance, &heuristics::spt(instance)?),
        Method::Lpt => simulate(instance, &heuristics::lpt(instance)?),
        Method::FirstStageSpt => simulate(instance, &heuristics::first_stage_spt(instance)?),
        Method::LastStageSpt => simulate(instance, &heuristics::last_stage_spt(instance)?),
        Method::Bottleneck => simulate(instance, &heuristics::bottleneck(instance)?),
        Method::Random => random_search(instance),
        Method::Bayesian => bayesian_search(instance),
        Method::Ga => genetic_search(instance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Job;

    fn instance() -> Instance {
        Instance {
            num_jobs: 3,
            num_stages: 2,
            machines_per_stage: vec![1, 1],
            jobs: vec![
                Job { id: 0, processing_times: vec![4.0, 1.0] },
                Job { id: 1, processing_times: vec![1.0, 4.0] },
                Job { id: 2, processing_times: vec![2.0, 2.0] },
            ],
            max_iterations: 10,
            random_seed: Some(1),
            ga_population_size: 4,
            ga_mutation_rate: 0.2,
            ga_tournament_size: 2,
            ga_elitism_count: 1,
        }
    }

    #[test]
    fn all_methods_succeed() {
        let inst = instance();
        for method in [
            Method::Spt,
            Method::Lpt,
            Method::FirstStageSpt,
            Method::LastStageSpt,
            Method::Bottleneck,
            Method::Random,
            Method::Bayesian,
            Method::Ga,
        ] {
            let result = optimize(&inst, method).unwrap();
            inst.validate_permutation(&result.permutation).unwrap();
        }
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("spt".parse::<Method>().unwrap(), Method::Spt);
        assert_eq!("GA".parse::<Method>().unwrap(), Method::Ga);
        assert_eq!("Bayesian".parse::<Method>().unwrap(), Method::Bayesian);
    }

    #[test]
    fn unknown_method_is_an_error() {
        let err = "quantum".parse::<Method>().unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownMethod(_)));
    }
}
