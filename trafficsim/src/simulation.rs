use crate::{
    config::SimConfig,
    host::{Backoff, DropTailQueue, PacketSink, SharedMedium, Station, StationChannel, StationState},
};
use anyhow::{Context as _, Result};
use std::{fmt, sync::Arc, time::Duration};
use trafficsim_core::{
    CountersSnapshot, EventCounters, EventId, IntervalSampler, LinkObserver, NodeId, Packet,
    PacketIdGenerator, QueueDepth, Scheduler, SendDue, SimTime, Statistics, TrafficSource,
};

/// Everything that can happen on the timeline of a [`Simulation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// start the traffic source of the host
    Start(NodeId),
    /// stop the traffic source of the host
    Stop(NodeId),
    SendDue(SendDue),
    /// the host senses the medium to transmit its head of line packet
    TransmitAttempt(NodeId),
    /// the frame of the host has fully reached the other end
    TransmitComplete { host: NodeId, packet: Packet },
}

impl From<SendDue> for Event {
    fn from(value: SendDue) -> Self {
        Self::SendDue(value)
    }
}

/// Outcome of a [`Simulation::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub statistics: Statistics,
    pub counters: CountersSnapshot,
    /// packets sent by each source, indexed by the source's [`NodeId`]
    pub sent_per_source: Vec<u64>,
    pub delivered_packets: u64,
    pub delivered_bytes: u64,
    /// packets still waiting in a transmit queue at the horizon
    pub queued_at_horizon: u64,
}

/// A shared bus with `N - 1` traffic sources sending to one sink.
pub struct Simulation {
    config: SimConfig,
    scheduler: Scheduler<Event>,
    sources: Vec<TrafficSource<StationChannel>>,
    stations: Vec<Station>,
    medium: SharedMedium,
    backoff: Backoff,
    sink: PacketSink,
    counters: Arc<EventCounters>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate().context("Invalid simulation configuration")?;

        let sources = config.sources();
        let sink = config.sink();
        let counters = Arc::new(EventCounters::new(sources as usize));
        let observer: Arc<dyn LinkObserver> = counters.clone();
        let packet_ids = PacketIdGenerator::new();

        let mut traffic_sources = Vec::with_capacity(sources as usize);
        let mut stations = Vec::with_capacity(sources as usize);

        for index in 0..sources {
            let id = NodeId::new(index);
            let queue = Arc::new(DropTailQueue::new(
                id,
                config.queue_capacity,
                Arc::clone(&observer),
            ));
            let sampler = IntervalSampler::for_source(config.rate, id, config.seed)?;

            let source = TrafficSource::builder(id)
                .destination(sink)
                .packet_size(config.packet_size)
                .time_unit(config.time_unit)
                .channel(StationChannel::new(id, Arc::clone(&queue)))
                .sampler(sampler)
                .queue(Arc::clone(&queue) as Arc<dyn QueueDepth>)
                .counters(Arc::clone(&counters))
                .packet_ids(packet_ids.clone())
                .build()
                .with_context(|| format!("Failed to set up {}", id.label()))?;

            traffic_sources.push(source);
            stations.push(Station::new(id, queue));
        }

        // the sink's index is never the seed of a sampler
        let backoff = Backoff::new(
            config.backoff_slot,
            config.backoff_ceiling,
            config.max_backoff_retries,
            config.seed.wrapping_add(sink.into_u64()),
        );

        Ok(Self {
            medium: SharedMedium::new(config.data_rate, config.propagation_delay),
            backoff,
            sink: PacketSink::new(sink),
            scheduler: Scheduler::new(),
            sources: traffic_sources,
            stations,
            counters,
            config,
        })
    }

    /// Run until the horizon, then stop every source and report.
    pub fn run(mut self) -> Result<Report> {
        let horizon = SimTime::from_duration(self.config.horizon);
        let start = SimTime::from_duration(self.config.start);
        let stop = SimTime::from_duration(self.config.stop_time());

        tracing::info!(
            sources = self.sources.len(),
            rate = self.config.rate,
            %horizon,
            data_rate = %self.config.data_rate,
            "simulation started"
        );

        for source in &self.sources {
            self.scheduler.schedule_at(start, Event::Start(source.id()));
        }
        for source in &self.sources {
            self.scheduler.schedule_at(stop, Event::Stop(source.id()));
        }

        let mut events = 0u64;
        while let Some((id, event)) = self.scheduler.pop_until(horizon) {
            self.handle(id, event)?;
            events += 1;
        }

        self.scheduler.advance_to(horizon);
        for source in &mut self.sources {
            source.stop(&mut self.scheduler);
        }

        let report = self.report();
        tracing::info!(
            events,
            sent = report.counters.total_sent,
            dropped = report.counters.total_dropped,
            delivered = report.delivered_packets,
            "simulation finished"
        );

        Ok(report)
    }

    fn handle(&mut self, id: EventId, event: Event) -> Result<()> {
        match event {
            Event::Start(host) => {
                self.sources[host.index()]
                    .start(&mut self.scheduler)
                    .with_context(|| format!("Failed to start {}", host.label()))?;
            }
            Event::Stop(host) => self.sources[host.index()].stop(&mut self.scheduler),
            Event::SendDue(SendDue { source }) => {
                self.sources[source.index()]
                    .on_send_due(id, &mut self.scheduler)
                    .context("Traffic source failed")?;
                self.wake_up(source);
            }
            Event::TransmitAttempt(host) => self.transmit_attempt(host),
            Event::TransmitComplete { host, packet } => self.transmit_complete(host, packet),
        }

        Ok(())
    }

    /// schedule a transmit attempt of `host` if it has something to send
    /// and is not already contending or transmitting
    fn wake_up(&mut self, host: NodeId) {
        let station = &mut self.stations[host.index()];
        if station.needs_wake_up() {
            station.set_state(StationState::Contending);
            self.scheduler
                .schedule_in(Duration::ZERO, Event::TransmitAttempt(host));
        }
    }

    fn transmit_attempt(&mut self, host: NodeId) {
        let now = self.scheduler.now();
        let station = &mut self.stations[host.index()];

        let Some(bytes) = station.queue().head_size() else {
            station.set_state(StationState::Idle);
            return;
        };

        if !self.medium.is_busy(now) {
            let Some(packet) = station.queue().dequeue() else {
                station.set_state(StationState::Idle);
                return;
            };
            station.reset_retries();
            station.set_state(StationState::Transmitting);

            let until = self.medium.occupy(now, bytes);
            self.scheduler
                .schedule_at(until, Event::TransmitComplete { host, packet });
            return;
        }

        self.counters.on_backoff(host);
        let retries = station.defer();

        if self.backoff.exhausted(retries) {
            tracing::debug!(host = %host.label(), retries, "too many deferrals, head of line packet dropped");
            station.queue().discard_head();
            station.reset_retries();
            station.set_state(StationState::Idle);
            self.wake_up(host);
            return;
        }

        let delay = self.backoff.delay(retries);
        self.scheduler
            .schedule_in(delay, Event::TransmitAttempt(host));
    }

    fn transmit_complete(&mut self, host: NodeId, packet: Packet) {
        if !self.sink.receive(&packet) {
            tracing::warn!(host = %host.label(), packet = %packet.id(), to = %packet.to(), "no host to receive the packet");
        }

        self.stations[host.index()].set_state(StationState::Idle);
        self.wake_up(host);
    }

    fn report(&self) -> Report {
        let counters = self.counters.snapshot();

        Report {
            statistics: Statistics::aggregate(&counters),
            sent_per_source: self.sources.iter().map(|s| s.packets_sent()).collect(),
            delivered_packets: self.sink.packets(),
            delivered_bytes: self.sink.bytes(),
            queued_at_horizon: self.stations.iter().map(|s| s.queue().len()).sum(),
            counters,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.statistics)?;
        write!(
            f,
            "Packets delivered: {} ({} bytes)",
            self.delivered_packets, self.delivered_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(nodes: u32) -> SimConfig {
        SimConfig {
            nodes,
            start: Duration::ZERO,
            horizon: Duration::from_millis(200),
            rate: 50.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Simulation::new(SimConfig {
            nodes: 1,
            ..SimConfig::default()
        })
        .is_err());
    }

    #[test]
    fn single_source_never_backs_off() {
        let report = Simulation::new(config(2)).unwrap().run().unwrap();

        assert!(report.counters.total_sent > 0);
        assert_eq!(report.counters.total_backoffs, 0);
        assert_eq!(report.counters.total_dropped, 0);
        assert_eq!(report.statistics.mean_backoff_rate, Ok(0.0));
    }

    #[test]
    fn every_packet_is_accounted_for() {
        let report = Simulation::new(SimConfig {
            rate: 5_000.0,
            queue_capacity: 4,
            ..config(8)
        })
        .unwrap()
        .run()
        .unwrap();

        let c = &report.counters;
        assert!(c.total_dropped > 0);

        // a frame still on the medium at the horizon is neither delivered,
        // queued nor dropped
        let accounted = report.delivered_packets + report.queued_at_horizon + c.total_dropped;
        assert!(accounted <= c.total_sent);
        assert!(c.total_sent - accounted <= report.sent_per_source.len() as u64);
    }

    #[test]
    fn contention_causes_backoffs() {
        let report = Simulation::new(SimConfig {
            rate: 2_000.0,
            ..config(10)
        })
        .unwrap()
        .run()
        .unwrap();

        assert!(report.counters.total_backoffs > 0);
        assert!(report.statistics.mean_backoff_rate.is_ok());
    }

    #[test]
    fn report_display() {
        let report = Simulation::new(config(3)).unwrap().run().unwrap();
        let text = report.to_string();

        assert!(text.starts_with("Total packets sent: "));
        assert!(text.contains("Max queue depth: "));
        assert!(text.ends_with("bytes)"));
    }
}
