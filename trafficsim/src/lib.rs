/*!
# Shared-medium traffic simulation

Runs `N - 1` [`TrafficSource`]s sending to a single sink over one shared
bus and reports the contention statistics of the run.

```
use trafficsim::{SimConfig, Simulation};
use std::time::Duration;

let config = SimConfig {
    nodes: 4,
    horizon: Duration::from_millis(100),
    start: Duration::ZERO,
    ..SimConfig::default()
};

let report = Simulation::new(config).unwrap().run().unwrap();
assert_eq!(report.sent_per_source.len(), 3);
```
*/

mod config;
pub mod host;
mod simulation;

// convenient re-export of `trafficsim_core` core objects
pub use trafficsim_core::{
    DataRate, DivisionUndefined, NodeId, SimTime, Statistics, TrafficSource, defaults,
};

pub use self::{
    config::{ConfigError, SimConfig},
    simulation::{Event, Report, Simulation},
};
