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

/// Records the rounds in which its neighborhood changed.
struct Probe {
    changes: Rc<RefCell<Vec<u64>>>,
}

impl Node for Probe {
    fn neighborhood_change(&mut self, api: &mut Api<'_>) {
        self.changes.borrow_mut().push(api.round());
    }

    fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
}

struct Idle;

impl Node for Idle {
    fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
}

#[test]
fn static_connectivity_keeps_hand_built_edges_alive() {
    let mut rt = Builder::seeded(3).max_rounds(10).build(());
    let a = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    let b = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    rt.world_mut().add_bidirectional_edge(a, b, true);

    let summary = rt.run();
    assert_eq!(summary.world.num_edges(), 2);
    assert_eq!(summary.world.neighbors(a), vec![b]);
    assert_eq!(summary.world.neighbors(b), vec![a]);
}

#[test]
fn unvalidated_edges_die_on_the_second_pass() {
    struct EdgeWatch {
        counts: Rc<RefCell<Vec<usize>>>,
    }
    impl Scenario for EdgeWatch {
        fn post_round(&mut self, world: &mut World) {
            self.counts.borrow_mut().push(world.num_edges());
        }
    }

    let changes = Rc::new(RefCell::new(Vec::new()));
    let counts = Rc::new(RefCell::new(Vec::new()));

    let mut rt = Builder::seeded(3).max_rounds(3).build(EdgeWatch {
        counts: counts.clone(),
    });
    let a = rt
        .world_mut()
        .add_node(Box::new(Probe {
            changes: changes.clone(),
        }))
        .unwrap();
    let b = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    rt.world_mut().add_bidirectional_edge(a, b, true);
    rt.world_mut().set_connectivity_model(a, Box::new(NoConnectivity));
    rt.world_mut().set_connectivity_model(b, Box::new(NoConnectivity));

    rt.run();
    // Pass 1 invalidates the edges, pass 2 deletes them.
    assert_eq!(*counts.borrow(), vec![2, 0, 0]);
    // Round 1: the setup additions. Round 2: the deletions.
    assert_eq!(*changes.borrow(), vec![1, 2]);
}

#[test]
fn unit_disk_tracks_positions_across_rounds() {
    struct MoveAway {
        node: Option<NodeId>,
        counts: Rc<RefCell<Vec<usize>>>,
    }
    impl Scenario for MoveAway {
        fn post_round(&mut self, world: &mut World) {
            if world.round() == 2 {
                let node = self.node.expect("scenario not wired up");
                world.set_position(node, Position::new_2d(500.0, 0.0));
            }
            self.counts.borrow_mut().push(world.num_edges());
        }
    }

    let counts = Rc::new(RefCell::new(Vec::new()));

    let mut rt = Builder::seeded(3).max_rounds(4).build(MoveAway {
        node: None,
        counts: counts.clone(),
    });
    let a = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    let b = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    let c = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    rt.world_mut().set_position(a, Position::new_2d(0.0, 0.0));
    rt.world_mut().set_position(b, Position::new_2d(3.0, 0.0));
    rt.world_mut().set_position(c, Position::new_2d(100.0, 0.0));
    for &id in &[a, b, c] {
        rt.world_mut()
            .set_connectivity_model(id, Box::new(UnitDiskConnectivity::new(5.0)));
    }
    rt.scenario_mut().node = Some(b);

    rt.run();
    // a <-> b within range, c isolated; after b moves away the pair decays
    // within one revalidation cycle.
    assert_eq!(*counts.borrow(), vec![2, 2, 0, 0]);
}

#[test]
fn removing_a_node_detaches_it_completely() {
    struct RemoveMiddle {
        node: Option<NodeId>,
    }
    impl Scenario for RemoveMiddle {
        fn post_round(&mut self, world: &mut World) {
            if world.round() == 2 {
                let node = self.node.expect("scenario not wired up");
                assert!(world.remove_node(node));
            }
        }
    }

    let changes_a = Rc::new(RefCell::new(Vec::new()));
    let changes_c = Rc::new(RefCell::new(Vec::new()));

    let mut rt = Builder::seeded(3).max_rounds(4).build(RemoveMiddle { node: None });
    let a = rt
        .world_mut()
        .add_node(Box::new(Probe {
            changes: changes_a.clone(),
        }))
        .unwrap();
    let b = rt.world_mut().add_node(Box::new(Idle)).unwrap();
    let c = rt
        .world_mut()
        .add_node(Box::new(Probe {
            changes: changes_c.clone(),
        }))
        .unwrap();
    rt.world_mut().add_bidirectional_edge(a, b, true);
    rt.world_mut().add_bidirectional_edge(b, c, true);
    rt.scenario_mut().node = Some(b);

    let summary = rt.run();
    assert_eq!(summary.world.num_nodes(), 2);
    assert_eq!(summary.world.num_edges(), 0);
    assert!(summary.world.neighbors(a).is_empty());
    assert!(summary.world.node_core(b).is_none());
    // Round 1: setup additions. Round 3: the removal from round 2's end.
    assert_eq!(*changes_a.borrow(), vec![1, 3]);
    assert_eq!(*changes_c.borrow(), vec![1, 3]);
}

#[test]
fn edge_removed_mid_flight_kills_the_packet() {
    struct CutLink {
        link: Option<(NodeId, NodeId)>,
    }
    impl Scenario for CutLink {
        fn post_round(&mut self, world: &mut World) {
            if world.round() == 1 {
                let (from, to) = self.link.expect("scenario not wired up");
                assert!(world.remove_edge(from, to));
            }
        }
    }

    struct OneShot {
        target: NodeId,
        nacked: Rc<RefCell<Vec<u64>>>,
    }
    impl Node for OneShot {
        fn pre_step(&mut self, api: &mut Api<'_>) {
            if api.round() == 1 {
                api.send(&Ping, self.target);
            }
        }
        fn handle_nack_messages(&mut self, api: &mut Api<'_>, nacks: &Inbox) {
            for _ in nacks.iter() {
                self.nacked.borrow_mut().push(api.round());
            }
        }
        fn handle_messages(&mut self, _api: &mut Api<'_>, _inbox: &Inbox) {}
    }

    struct Counter {
        received: Rc<RefCell<usize>>,
    }
    impl Node for Counter {
        fn handle_messages(&mut self, _api: &mut Api<'_>, inbox: &Inbox) {
            *self.received.borrow_mut() += inbox.len();
        }
    }

    let received = Rc::new(RefCell::new(0));
    let nacked = Rc::new(RefCell::new(Vec::new()));

    let mut rt = Builder::seeded(3)
        .max_rounds(5)
        .config(SimConfig {
            nack_generation: true,
            ..SimConfig::default()
        })
        .build(CutLink { link: None });
    let receiver = rt
        .world_mut()
        .add_node(Box::new(Counter {
            received: received.clone(),
        }))
        .unwrap();
    let sender = rt
        .world_mut()
        .add_node(Box::new(OneShot {
            target: receiver,
            nacked: nacked.clone(),
        }))
        .unwrap();
    rt.world_mut().add_edge(sender, receiver, true);
    rt.scenario_mut().link = Some((sender, receiver));

    rt.run();
    assert_eq!(*received.borrow(), 0);
    assert_eq!(*nacked.borrow(), vec![3]);
}
