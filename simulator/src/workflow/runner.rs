use crate::generator::profile::Fleet;
use crate::workflow::config::ScenarioConfig;
use crate::workflow::rules::RuleEngine;
use rand::{rngs::StdRng, Rng, SeedableRng};
use seaxcore::ais_interface::{PositionRecord, VesselState, ViolationEvent};

/// Output of one simulation tick, in publication order.
#[derive(Debug, Default)]
pub struct TickResult {
    pub positions: Vec<PositionRecord>,
    pub violations: Vec<ViolationEvent>,
    pub redelivered: usize,
}

pub struct Runner {
    config: ScenarioConfig,
    fleet: Fleet,
    rules: RuleEngine,
    rng: StdRng,
    ticks: u64,
}

impl Runner {
    pub fn new(config: ScenarioConfig) -> Self {
        let fleet = Fleet::generate(&config.fleet);
        let rules = RuleEngine::new(config.zones.clone(), config.collision_distance_nm);
        let rng = StdRng::seed_from_u64(config.fleet.seed.wrapping_add(1));
        Self {
            config,
            fleet,
            rules,
            rng,
            ticks: 0,
        }
    }

    /// Advances the fleet by one tick and runs the rule check.
    pub fn step(&mut self) -> TickResult {
        self.ticks += 1;
        let positions = self.fleet.advance(self.config.tick());
        let mut violations = Vec::new();
        let mut redelivered = 0;

        let probability = self.config.duplicate_probability.clamp(0.0, 1.0);
        for event in self.rules.evaluate(self.fleet.vessels()) {
            let duplicate = probability > 0.0 && self.rng.gen_bool(probability);
            if duplicate {
                violations.push(event.clone());
                redelivered += 1;
            }
            violations.push(event);
        }

        TickResult {
            positions,
            violations,
            redelivered,
        }
    }

    pub fn vessels(&self) -> &[VesselState] {
        self.fleet.vessels()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn fleet_size(&self) -> usize {
        self.fleet.len()
    }

    pub fn clock_ms(&self) -> i64 {
        self.fleet.clock_ms()
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::rules::ZoneConfig;
    use std::collections::HashSet;

    #[test]
    fn runner_executes_ticks() {
        let cfg = ScenarioConfig::from_args(30, 3, 1);
        let mut runner = Runner::new(cfg.clone());
        let mut total = 0;
        for _ in 0..10 {
            total += runner.step().positions.len();
        }
        assert_eq!(runner.ticks(), 10);
        assert!(total > 0);
        assert_eq!(runner.vessels().len(), 30);
    }

    #[test]
    fn duplicates_repeat_an_existing_vid() {
        let mut cfg = ScenarioConfig::from_args(60, 9, 1);
        cfg.duplicate_probability = 1.0;
        cfg.collision_distance_nm = 50.0;
        cfg.zones = vec![ZoneConfig::default()];
        let mut runner = Runner::new(cfg);

        let result = runner.step();
        assert!(!result.violations.is_empty());
        assert_eq!(result.redelivered * 2, result.violations.len());
        let distinct: HashSet<&str> = result.violations.iter().map(|e| e.vid.as_str()).collect();
        assert_eq!(distinct.len(), result.redelivered);
    }
}
