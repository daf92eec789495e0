use algosim::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Ping;

impl Message for Ping {
    fn clone_message(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }
}

fn async_config() -> SimConfig {
    SimConfig {
        mode: Mode::Asynchronous,
        ..SimConfig::default()
    }
}

/// Fires one second into the run and opens the conversation.
struct Kickoff {
    target: Rc<RefCell<Option<NodeId>>>,
}

impl Timer for Kickoff {
    fn fire(self: Box<Self>, api: &mut Api<'_>) {
        let target = self.target.borrow().expect("target wired up before t=1");
        api.send(&Ping, target);
    }
}

/// Replies to every packet's origin until the shared counter hits `limit`.
struct Echo {
    count: Rc<RefCell<usize>>,
    limit: usize,
    kickoff: Option<Rc<RefCell<Option<NodeId>>>>,
}

impl Node for Echo {
    fn init(&mut self, api: &mut Api<'_>) {
        if let Some(target) = &self.kickoff {
            api.set_timer(
                Box::new(Kickoff {
                    target: target.clone(),
                }),
                1.0,
            );
        }
    }

    fn handle_messages(&mut self, api: &mut Api<'_>, inbox: &Inbox) {
        let mut replies = Vec::new();
        for handle in inbox.iter() {
            *self.count.borrow_mut() += 1;
            if *self.count.borrow() < self.limit {
                replies.push(api.packet(handle).origin());
            }
        }
        for to in replies {
            api.send(&Ping, to);
        }
    }
}

fn ping_pong(limit: usize, max_events: Option<usize>) -> (Runtime<()>, Rc<RefCell<usize>>) {
    let count = Rc::new(RefCell::new(0));
    let target = Rc::new(RefCell::new(None));

    let mut builder = Builder::seeded(11).config(async_config());
    if let Some(n) = max_events {
        builder = builder.max_events(n);
    }
    let mut rt = builder.build(());
    let a = rt
        .world_mut()
        .add_node(Box::new(Echo {
            count: count.clone(),
            limit,
            kickoff: Some(target.clone()),
        }))
        .unwrap();
    let b = rt
        .world_mut()
        .add_node(Box::new(Echo {
            count: count.clone(),
            limit,
            kickoff: None,
        }))
        .unwrap();
    *target.borrow_mut() = Some(b);
    rt.world_mut().add_edge(a, b, true);
    rt.world_mut().add_edge(b, a, true);
    (rt, count)
}

#[test]
fn events_drive_the_clock_from_jump_to_jump() {
    let (rt, count) = ping_pong(5, None);

    let summary = rt.run();
    assert_eq!(summary.stop, StopReason::QueueExhausted);
    assert_eq!(*count.borrow(), 5);
    // One kickoff timer plus five deliveries, one second apart.
    assert_eq!(summary.events, 6);
    assert_eq!(summary.time, SimTime::from(6.0));
    assert_eq!(summary.rounds, 0);
}

#[test]
fn event_budget_cuts_an_endless_exchange() {
    let (rt, _count) = ping_pong(usize::MAX, Some(10));
    let summary = rt.run();
    assert_eq!(summary.stop, StopReason::LimitReached);
    assert_eq!(summary.events, 10);
}

#[test]
fn async_nacks_are_delivered_immediately() {
    struct Lonely {
        nack_times: Rc<RefCell<Vec<f64>>>,
        target: Rc<RefCell<Option<NodeId>>>,
    }
    impl Node for Lonely {
        fn init(&mut self, api: &mut Api<'_>) {
            api.set_timer(
                Box::new(Kickoff {
                    target: self.target.clone(),
                }),
                1.0,
            );
        }
        fn handle_nack_messages(&mut self, api: &mut Api<'_>, nacks: &Inbox) {
            for _ in nacks.iter() {
                self.nack_times.borrow_mut().push(api.now().into());
            }
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    struct Mute;
    impl Node for Mute {
        fn handle_messages(&mut self, _api: &mut Api<'_>, inbox: &Inbox) {
            assert!(inbox.is_empty());
        }
    }

    let nack_times = Rc::new(RefCell::new(Vec::new()));
    let target = Rc::new(RefCell::new(None));

    let mut rt = Builder::seeded(11)
        .config(SimConfig {
            nack_generation: true,
            ..async_config()
        })
        .build(());
    rt.world_mut()
        .add_node(Box::new(Lonely {
            nack_times: nack_times.clone(),
            target: target.clone(),
        }))
        .unwrap();
    let b = rt.world_mut().add_node(Box::new(Mute)).unwrap();
    *target.borrow_mut() = Some(b);
    // No edge: the packet can never arrive.

    let summary = rt.run();
    // Sent at t=1, would have arrived at t=2; the nack comes at exactly
    // that moment instead of a round later.
    assert_eq!(*nack_times.borrow(), vec![2.0]);
    assert_eq!(summary.events, 2);
    assert_eq!(summary.stop, StopReason::QueueExhausted);
}

#[test]
fn cancelled_async_timers_never_fire_or_count() {
    struct Cancel {
        victim: Rc<RefCell<Option<TimerHandle>>>,
        log: Rc<RefCell<Vec<f64>>>,
    }
    impl Timer for Cancel {
        fn fire(self: Box<Self>, api: &mut Api<'_>) {
            self.log.borrow_mut().push(api.now().into());
            let handle = self.victim.borrow_mut().take().expect("victim scheduled");
            assert!(api.cancel_timer(handle));
        }
    }

    struct Never {
        log: Rc<RefCell<Vec<f64>>>,
    }
    impl Timer for Never {
        fn fire(self: Box<Self>, api: &mut Api<'_>) {
            self.log.borrow_mut().push(api.now().into());
        }
    }

    struct Arm {
        victim: Rc<RefCell<Option<TimerHandle>>>,
        log: Rc<RefCell<Vec<f64>>>,
    }
    impl Node for Arm {
        fn init(&mut self, api: &mut Api<'_>) {
            let handle = api.set_timer(
                Box::new(Never {
                    log: self.log.clone(),
                }),
                2.0,
            );
            *self.victim.borrow_mut() = Some(handle);
            api.set_timer(
                Box::new(Cancel {
                    victim: self.victim.clone(),
                    log: self.log.clone(),
                }),
                1.0,
            );
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    let victim = Rc::new(RefCell::new(None));
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut rt = Builder::seeded(11).config(async_config()).build(());
    rt.world_mut()
        .add_node(Box::new(Arm {
            victim: victim.clone(),
            log: log.clone(),
        }))
        .unwrap();

    let summary = rt.run();
    assert_eq!(*log.borrow(), vec![1.0]);
    // The revoked event is skipped silently, not handled.
    assert_eq!(summary.events, 1);
}

#[test]
fn empty_queue_hook_may_refill_the_queue_once() {
    struct Bump {
        fired: Rc<RefCell<usize>>,
    }
    impl GlobalTimer for Bump {
        fn fire(self: Box<Self>, _world: &mut World) {
            *self.fired.borrow_mut() += 1;
        }
    }

    struct Refill {
        used: bool,
        fired: Rc<RefCell<usize>>,
    }
    impl Scenario for Refill {
        fn on_empty_queue(&mut self, world: &mut World) {
            if !self.used {
                self.used = true;
                world.set_global_timer(
                    Box::new(Bump {
                        fired: self.fired.clone(),
                    }),
                    1.0,
                );
                assert_eq!(world.pending_events(), 1);
            }
        }
    }

    let fired = Rc::new(RefCell::new(0));
    let rt = Builder::seeded(11).config(async_config()).build(Refill {
        used: false,
        fired: fired.clone(),
    });

    let summary = rt.run();
    assert_eq!(summary.stop, StopReason::QueueExhausted);
    assert_eq!(*fired.borrow(), 1);
    assert_eq!(summary.events, 1);
    assert!(summary.scenario.used);
}
