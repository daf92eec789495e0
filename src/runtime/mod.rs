//! The simulation drivers.
//!
//! A [`Runtime`] owns the [`World`] and a user [`Scenario`] and drives one
//! of two execution models, chosen by [`SimConfig::mode`]:
//!
//! - **synchronous**: time advances in unit rounds; every round, every node
//!   steps once through a fixed phase sequence (global timers, mobility,
//!   connectivity, revalidation, interference, node steps),
//! - **asynchronous**: time jumps from event to event; a node only acts
//!   when a packet reaches it or one of its timers fires.
//!
//! Both drivers honor the same [`RuntimeLimit`]s and report to the same
//! [`Observer`]s.
//!
//! [`SimConfig::mode`]: crate::config::SimConfig

mod builder;
mod error;
mod limit;

pub use builder::Builder;
pub use error::{CreationError, RequirementError, RuntimeError};
pub use limit::RuntimeLimit;

use crate::config::{Mode, SimConfig};
use crate::event::Event;
use crate::node::{Api, NodeId};
use crate::observer::Observer;
use crate::packet::PacketHandle;
use crate::time::SimTime;
use crate::world::{Arrival, Notification, World};
use std::fmt::{self, Display};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

///
/// The user-defined frame around a simulation run.
///
/// All hooks are defaulted, and `()` implements the trait, so the minimal
/// scenario is no scenario at all. [`terminated`](Scenario::terminated) is
/// polled before every round (or event) and ends the run with
/// [`StopReason::Terminated`].
///
#[allow(unused_variables)]
pub trait Scenario: 'static {
    ///
    /// Checked once before the run starts. An `Err` reports the reason and
    /// ends the run with [`StopReason::RequirementsFailed`] before any
    /// round or event is processed.
    ///
    fn check_requirements(&self, config: &SimConfig) -> Result<(), RequirementError> {
        Ok(())
    }

    /// Invoked once before the first round or event.
    fn pre_run(&mut self, world: &mut World) {}

    /// Invoked before every synchronous round.
    fn pre_round(&mut self, world: &mut World) {}

    /// Invoked after every synchronous round.
    fn post_round(&mut self, world: &mut World) {}

    /// Polled before every round or event; `true` ends the run.
    fn terminated(&mut self, world: &World) -> bool {
        false
    }

    ///
    /// Invoked once when the asynchronous event queue runs dry, before the
    /// driver gives up. Injecting fresh work (timers, sends via node logic)
    /// keeps the run alive.
    ///
    fn on_empty_queue(&mut self, world: &mut World) {}
}

impl Scenario for () {}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The scenario reported termination.
    Terminated,
    /// A run limit struck.
    LimitReached,
    /// The asynchronous event queue ran dry.
    QueueExhausted,
    /// The run was aborted through an [`AbortHandle`].
    Aborted,
    /// The scenario's requirement check failed before the run started.
    RequirementsFailed,
    /// A user hook panicked; the panic was contained and the run halted.
    Panicked,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Terminated => "scenario terminated",
            Self::LimitReached => "limit reached",
            Self::QueueExhausted => "event queue exhausted",
            Self::Aborted => "aborted",
            Self::RequirementsFailed => "scenario requirements not met",
            Self::Panicked => "halted by panic",
        };
        write!(f, "{s}")
    }
}

///
/// The result of a completed run: final counters, the stop reason and the
/// scenario and world handed back for inspection.
///
#[derive(Debug)]
pub struct Summary<S> {
    /// Completed rounds (zero in asynchronous mode).
    pub rounds: u64,
    /// Handled events (zero in synchronous mode).
    pub events: usize,
    /// The final simulation time.
    pub time: SimTime,
    /// Why the run ended.
    pub stop: StopReason,
    /// The scenario, handed back.
    pub scenario: S,
    /// The final world state.
    pub world: World,
}

///
/// A thread-safe switch that stops a running simulation at the next round
/// or event boundary.
///
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests the abort.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

///
/// A ready-to-run simulation. Built by [`Builder`], consumed by
/// [`run`](Runtime::run).
///
pub struct Runtime<S: Scenario> {
    world: World,
    scenario: S,
    limit: RuntimeLimit,
    observers: Vec<Box<dyn Observer>>,
    events_handled: usize,
    abort: Arc<AtomicBool>,
}

impl<S: Scenario> Runtime<S> {
    pub(crate) fn new(world: World, scenario: S, limit: RuntimeLimit) -> Self {
        Self {
            world,
            scenario,
            limit,
            observers: Vec::new(),
            events_handled: 0,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the world, for setup before the run.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns the world mutably, for setup before the run.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Returns the scenario.
    #[must_use]
    pub fn scenario(&self) -> &S {
        &self.scenario
    }

    /// Returns the scenario mutably.
    pub fn scenario_mut(&mut self) -> &mut S {
        &mut self.scenario
    }

    /// Attaches an observer.
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Returns a handle that stops the run from another thread.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    ///
    /// Drives the simulation to completion and returns the [`Summary`].
    ///
    /// Panics in user hooks are contained: the run halts with
    /// [`StopReason::Panicked`] and the summary still reports the state
    /// reached so far.
    ///
    pub fn run(mut self) -> Summary<S> {
        debug!(
            "starting simulation: {:?} mode, limit: {}",
            self.world.config().mode,
            self.limit
        );

        if let Err(e) = self.scenario.check_requirements(self.world.config()) {
            error!("{e}");
            return Summary {
                rounds: self.world.round(),
                events: self.events_handled,
                time: self.world.now(),
                stop: StopReason::RequirementsFailed,
                scenario: self.scenario,
                world: self.world,
            };
        }

        let mode = self.world.config().mode;
        let stop = match catch_unwind(AssertUnwindSafe(|| {
            self.scenario.pre_run(&mut self.world);
            match mode {
                Mode::Synchronous => self.run_sync(),
                Mode::Asynchronous => self.run_async(),
            }
        })) {
            Ok(stop) => stop,
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!("simulation halted by panic: {msg}");
                StopReason::Panicked
            }
        };

        debug!(
            "simulation ended ({stop}) after {} round(s), {} event(s), t = {}",
            self.world.round(),
            self.events_handled,
            self.world.now()
        );
        Summary {
            rounds: self.world.round(),
            events: self.events_handled,
            time: self.world.now(),
            stop,
            scenario: self.scenario,
            world: self.world,
        }
    }

    // # The synchronous driver

    fn run_sync(&mut self) -> StopReason {
        loop {
            self.flush_notifications();
            if self.abort.load(Ordering::Relaxed) {
                return StopReason::Aborted;
            }
            if self.scenario.terminated(&self.world) {
                return StopReason::Terminated;
            }
            if self
                .limit
                .applies(self.world.round(), self.events_handled, self.world.now())
            {
                return StopReason::LimitReached;
            }

            self.world.advance_round();
            self.scenario.pre_round(&mut self.world);

            for entry in self.world.drain_due_global_timers() {
                entry.timer.fire(&mut self.world);
            }
            if self.world.config().mobility {
                self.world.mobility_phase();
            }
            self.world.connectivity_phase();
            self.world.revalidation_phase();
            self.world.update_orphans();
            if self.world.config().interference {
                self.world.test_for_interference();
            }

            for id in self.world.node_order() {
                self.step_node(id);
            }

            self.scenario.post_round(&mut self.world);

            let round = self.world.round();
            for observer in &mut self.observers {
                observer.round_complete(round);
            }
            let rate = self.world.config().refresh_rate;
            if rate > 0 && round % rate == 0 {
                for observer in &mut self.observers {
                    observer.redraw_requested(&self.world);
                }
            }
            trace!("round {round} complete");
        }
    }

    ///
    /// Runs one node's step: buffer scan, `pre_step`, neighborhood change,
    /// due timers, nacks, `handle_messages`, `post_step`. The inbox
    /// packets are freed once the step is over.
    ///
    fn step_node(&mut self, id: NodeId) {
        let Some(mut behavior) = self.world.take_behavior(id) else {
            return;
        };
        self.world.update_message_buffer(id);
        let inbox = self.world.collect_inbox(id);
        let nack_generation = self.world.config().nack_generation;

        let mut api = Api {
            world: &mut self.world,
            node: id,
        };
        behavior.pre_step(&mut api);
        if api.world.take_neighborhood_changed(id) {
            behavior.neighborhood_change(&mut api);
        }
        for entry in api.world.drain_due_node_timers(id) {
            entry.timer.fire(&mut api);
        }
        if nack_generation {
            let nacks = api.world.collect_nack_inbox(id);
            behavior.handle_nack_messages(&mut api, &nacks);
            api.world.free_inbox(&nacks);
        }
        behavior.handle_messages(&mut api, &inbox);
        behavior.post_step(&mut api);
        drop(api);

        self.world.free_inbox(&inbox);
        self.world.put_behavior(id, behavior);
    }

    // # The asynchronous driver

    fn run_async(&mut self) -> StopReason {
        let mut queue_retried = false;
        loop {
            self.flush_notifications();
            if self.abort.load(Ordering::Relaxed) {
                return StopReason::Aborted;
            }
            if self.scenario.terminated(&self.world) {
                return StopReason::Terminated;
            }

            let Some(event) = self.world.next_event() else {
                if !queue_retried {
                    // Give the scenario one chance to refill the queue.
                    queue_retried = true;
                    self.scenario.on_empty_queue(&mut self.world);
                    continue;
                }
                return StopReason::QueueExhausted;
            };
            queue_retried = false;

            if self
                .limit
                .applies(self.world.round(), self.events_handled, event.time)
            {
                self.world.requeue_event(event);
                return StopReason::LimitReached;
            }

            self.world.set_time(event.time);
            self.events_handled += 1;
            let owner = event.owner;
            trace!("handling event {} at {}", event.id, event.time);

            match event.event {
                Event::Delivery { packet } => self.handle_delivery(packet),
                Event::NodeTimer {
                    node,
                    timer_id,
                    timer,
                } => {
                    self.world.clear_timer_event(timer_id);
                    if self.world.node_core(node).is_some() {
                        let mut api = Api {
                            world: &mut self.world,
                            node,
                        };
                        timer.fire(&mut api);
                    }
                }
                Event::GlobalTimer { timer_id, timer } => {
                    self.world.clear_timer_event(timer_id);
                    timer.fire(&mut self.world);
                }
            }

            let number = self.events_handled;
            for observer in &mut self.observers {
                observer.event_handled(number, owner);
            }
            let rate = self.world.config().refresh_rate;
            if rate > 0 && number as u64 % rate == 0 {
                for observer in &mut self.observers {
                    observer.redraw_requested(&self.world);
                }
            }
        }
    }

    fn handle_delivery(&mut self, packet: PacketHandle) {
        match self.world.process_arrival(packet) {
            Arrival::Delivered { dest } => self.step_node_async(dest),
            Arrival::Dropped { origin } => {
                // No round boundaries to wait for: the nack is handed to the
                // sender right away.
                let nacks = self.world.make_inbox(vec![packet]);
                if let Some(mut behavior) = self.world.take_behavior(origin) {
                    let mut api = Api {
                        world: &mut self.world,
                        node: origin,
                    };
                    behavior.handle_nack_messages(&mut api, &nacks);
                    drop(api);
                    self.world.put_behavior(origin, behavior);
                }
                self.world.free_inbox(&nacks);
            }
            Arrival::Consumed => {}
        }
    }

    /// Runs a node's step around a single delivered packet.
    fn step_node_async(&mut self, id: NodeId) {
        let Some(mut behavior) = self.world.take_behavior(id) else {
            return;
        };
        let inbox = self.world.collect_inbox(id);

        let mut api = Api {
            world: &mut self.world,
            node: id,
        };
        behavior.pre_step(&mut api);
        if api.world.take_neighborhood_changed(id) {
            behavior.neighborhood_change(&mut api);
        }
        behavior.handle_messages(&mut api, &inbox);
        behavior.post_step(&mut api);
        drop(api);

        self.world.free_inbox(&inbox);
        self.world.put_behavior(id, behavior);
    }

    fn flush_notifications(&mut self) {
        for notification in self.world.drain_notifications() {
            for observer in &mut self.observers {
                match notification {
                    Notification::NodeAdded(id) => observer.node_added(id),
                    Notification::NodeRemoved(id) => observer.node_removed(id),
                }
            }
        }
    }
}

impl<S: Scenario> fmt::Debug for Runtime<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("world", &self.world)
            .field("limit", &self.limit)
            .field("events_handled", &self.events_handled)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Inbox;
    use crate::node::Node;

    struct Idle;
    impl Node for Idle {
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    #[test]
    fn round_limit_bounds_the_run() {
        let mut rt = Builder::seeded(7).max_rounds(25).build(());
        rt.world_mut().add_node(Box::new(Idle)).unwrap();

        let summary = rt.run();
        assert_eq!(summary.rounds, 25);
        assert_eq!(summary.stop, StopReason::LimitReached);
        assert_eq!(summary.time, SimTime::from(25.0));
    }

    #[test]
    fn abort_handle_stops_the_run_immediately() {
        let rt = Builder::seeded(7).max_rounds(1_000_000).build(());
        let handle = rt.abort_handle();
        handle.abort();

        let summary = rt.run();
        assert_eq!(summary.stop, StopReason::Aborted);
        assert_eq!(summary.rounds, 0);
    }

    #[test]
    fn scenario_termination_wins_over_limits() {
        struct StopAtFive;
        impl Scenario for StopAtFive {
            fn terminated(&mut self, world: &World) -> bool {
                world.round() >= 5
            }
        }

        let summary = Builder::seeded(7)
            .max_rounds(1000)
            .build(StopAtFive)
            .run();
        assert_eq!(summary.stop, StopReason::Terminated);
        assert_eq!(summary.rounds, 5);
    }

    #[test]
    fn async_timer_bookkeeping_is_fully_reclaimed() {
        use crate::timer::{GlobalTimer, Timer};

        struct Tick;
        impl Timer for Tick {
            fn fire(self: Box<Self>, _api: &mut Api<'_>) {}
        }

        struct Arm;
        impl Node for Arm {
            fn init(&mut self, api: &mut Api<'_>) {
                api.set_timer(Box::new(Tick), 1.0);
                api.set_timer(Box::new(Tick), 5.0);
            }
            fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
        }

        struct Reap {
            victim: NodeId,
        }
        impl GlobalTimer for Reap {
            fn fire(self: Box<Self>, world: &mut World) {
                world.remove_node(self.victim);
            }
        }

        let mut rt = Builder::seeded(7)
            .config(SimConfig {
                mode: Mode::Asynchronous,
                ..SimConfig::default()
            })
            .build(());
        let victim = rt.world_mut().add_node(Box::new(Arm)).unwrap();
        rt.world_mut().set_global_timer(Box::new(Reap { victim }), 2.0);

        let summary = rt.run();
        // The t=1 tick fires, the removal at t=2 takes the t=5 timer with
        // it; no timer-to-event mapping may outlive its timer.
        assert_eq!(summary.events, 2);
        assert_eq!(summary.stop, StopReason::QueueExhausted);
        assert_eq!(summary.world.scheduled_timer_events(), 0);
    }

    #[test]
    fn failed_scenario_requirements_stop_the_run_before_it_starts() {
        struct Picky;
        impl Scenario for Picky {
            fn check_requirements(&self, config: &SimConfig) -> Result<(), RequirementError> {
                if config.mobility {
                    Ok(())
                } else {
                    Err(RequirementError::new("mobility must be enabled"))
                }
            }
        }

        let summary = Builder::seeded(7).max_rounds(10).build(Picky).run();
        assert_eq!(summary.stop, StopReason::RequirementsFailed);
        assert_eq!(summary.rounds, 0);
    }

    #[test]
    fn pre_run_happens_once_before_the_first_round() {
        struct Recorder {
            seen_round: Option<u64>,
        }
        impl Scenario for Recorder {
            fn pre_run(&mut self, world: &mut World) {
                assert!(self.seen_round.is_none());
                self.seen_round = Some(world.round());
            }
        }

        let summary = Builder::seeded(7)
            .max_rounds(3)
            .build(Recorder { seen_round: None })
            .run();
        assert_eq!(summary.scenario.seen_round, Some(0));
        assert_eq!(summary.rounds, 3);
    }

    #[test]
    fn hook_panics_are_contained() {
        struct Bomb;
        impl Node for Bomb {
            fn pre_step(&mut self, api: &mut Api<'_>) {
                if api.round() == 3 {
                    panic!("boom");
                }
            }
            fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
        }

        let mut rt = Builder::seeded(7).max_rounds(10).build(());
        rt.world_mut().add_node(Box::new(Bomb)).unwrap();

        let summary = rt.run();
        assert_eq!(summary.stop, StopReason::Panicked);
        assert_eq!(summary.rounds, 3);
    }
}
