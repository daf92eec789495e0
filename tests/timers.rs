use algosim::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Pushes a label and the current round when it fires.
struct Note {
    label: &'static str,
    log: Rc<RefCell<Vec<(&'static str, u64)>>>,
}

impl Timer for Note {
    fn fire(self: Box<Self>, api: &mut Api<'_>) {
        self.log.borrow_mut().push((self.label, api.round()));
    }
}

struct Idle;

impl Node for Idle {
    fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
}

#[test]
fn timer_fires_exactly_once_at_its_round() {
    struct Alarm {
        log: Rc<RefCell<Vec<(&'static str, u64)>>>,
    }
    impl Node for Alarm {
        fn pre_step(&mut self, api: &mut Api<'_>) {
            if api.round() == 1 {
                api.set_timer(
                    Box::new(Note {
                        label: "alarm",
                        log: self.log.clone(),
                    }),
                    5.0,
                );
            }
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Builder::seeded(9).max_rounds(10).build(());
    rt.world_mut()
        .add_node(Box::new(Alarm { log: log.clone() }))
        .unwrap();

    rt.run();
    assert_eq!(*log.borrow(), vec![("alarm", 6)]);
}

#[test]
fn simultaneous_timers_fire_in_scheduling_order() {
    struct TwoAlarms {
        log: Rc<RefCell<Vec<(&'static str, u64)>>>,
    }
    impl Node for TwoAlarms {
        fn pre_step(&mut self, api: &mut Api<'_>) {
            if api.round() == 1 {
                api.set_timer(
                    Box::new(Note {
                        label: "first",
                        log: self.log.clone(),
                    }),
                    2.0,
                );
                api.set_timer(
                    Box::new(Note {
                        label: "second",
                        log: self.log.clone(),
                    }),
                    2.0,
                );
            }
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Builder::seeded(9).max_rounds(5).build(());
    rt.world_mut()
        .add_node(Box::new(TwoAlarms { log: log.clone() }))
        .unwrap();

    rt.run();
    assert_eq!(*log.borrow(), vec![("first", 3), ("second", 3)]);
}

#[test]
fn cancelled_timer_never_fires() {
    struct Canceller {
        pending: Option<TimerHandle>,
        log: Rc<RefCell<Vec<(&'static str, u64)>>>,
    }
    impl Node for Canceller {
        fn pre_step(&mut self, api: &mut Api<'_>) {
            match api.round() {
                1 => {
                    api.set_timer(
                        Box::new(Note {
                            label: "kept",
                            log: self.log.clone(),
                        }),
                        3.0,
                    );
                    self.pending = Some(api.set_timer(
                        Box::new(Note {
                            label: "cancelled",
                            log: self.log.clone(),
                        }),
                        3.0,
                    ));
                }
                2 => {
                    let handle = self.pending.take().expect("timer scheduled in round 1");
                    assert!(api.cancel_timer(handle));
                    assert!(!api.cancel_timer(handle));
                }
                _ => {}
            }
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Builder::seeded(9).max_rounds(8).build(());
    rt.world_mut()
        .add_node(Box::new(Canceller {
            pending: None,
            log: log.clone(),
        }))
        .unwrap();

    rt.run();
    assert_eq!(*log.borrow(), vec![("kept", 4)]);
}

#[test]
fn timers_can_reschedule_themselves() {
    struct Beat {
        log: Rc<RefCell<Vec<u64>>>,
    }
    impl Timer for Beat {
        fn fire(self: Box<Self>, api: &mut Api<'_>) {
            self.log.borrow_mut().push(api.round());
            let log = self.log.clone();
            api.set_timer(Box::new(Beat { log }), 1.0);
        }
    }

    struct Metronome {
        log: Rc<RefCell<Vec<u64>>>,
    }
    impl Node for Metronome {
        fn init(&mut self, api: &mut Api<'_>) {
            api.set_timer(
                Box::new(Beat {
                    log: self.log.clone(),
                }),
                1.0,
            );
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Builder::seeded(9).max_rounds(5).build(());
    rt.world_mut()
        .add_node(Box::new(Metronome { log: log.clone() }))
        .unwrap();

    rt.run();
    assert_eq!(*log.borrow(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn global_timers_fire_before_any_node_steps() {
    struct Mark {
        log: Rc<RefCell<Vec<u64>>>,
    }
    impl GlobalTimer for Mark {
        fn fire(self: Box<Self>, world: &mut World) {
            self.log.borrow_mut().push(world.round());
        }
    }

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut rt = Builder::seeded(9).max_rounds(6).build(());
    rt.world_mut().add_node(Box::new(Idle)).unwrap();
    rt.world_mut()
        .set_global_timer(Box::new(Mark { log: log.clone() }), 3.0);
    let doomed = rt
        .world_mut()
        .set_global_timer(Box::new(Mark { log: log.clone() }), 4.0);
    assert!(rt.world_mut().cancel_global_timer(doomed));

    rt.run();
    assert_eq!(*log.borrow(), vec![3]);
}
