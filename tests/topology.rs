//! End-to-end resolution properties over complete models.

use capsule_model::{
    Capsule, Connector, ConnectorEnd, Model, Part, Port, Protocol, ProtocolId,
};
use capsule_resolver::{resolve, ResolveError};

fn comm(model: &mut Model) -> ProtocolId {
    model.add_protocol(Protocol::new("Comm"))
}

#[test]
fn test_port_capacity_is_never_silently_truncated() {
    let mut model = Model::standard();
    let proto = comm(&mut model);

    let mut a = Capsule::new("A");
    a.add_port(Port::new("p", proto));
    let a_id = model.add_capsule(a);
    let mut b = Capsule::new("B");
    b.add_port(Port::new("q", proto).conjugated());
    let b_id = model.add_capsule(b);
    let mut c = Capsule::new("C");
    c.add_port(Port::new("s", proto).conjugated());
    let c_id = model.add_capsule(c);

    let mut top = Capsule::new("Top");
    top.add_part(Part::new("a", a_id));
    top.add_part(Part::new("b", b_id));
    top.add_part(Part::new("c", c_id));
    // `a.p` has replication 1; the second connector asks for a second slot.
    top.add_connector(Connector::between(
        "first",
        ConnectorEnd::on_part("a", "p"),
        ConnectorEnd::on_part("b", "q"),
    ));
    top.add_connector(Connector::between(
        "second",
        ConnectorEnd::on_part("a", "p"),
        ConnectorEnd::on_part("c", "s"),
    ));
    let top_id = model.add_capsule(top);

    let err = resolve(&model, top_id).unwrap_err();
    assert_eq!(
        err,
        ResolveError::CapacityExceeded {
            connector: "second".to_string(),
            port: "a.p".to_string(),
        }
    );
}

#[test]
fn test_round_robin_fans_replicated_part_into_replicated_port() {
    let mut model = Model::standard();
    let proto = comm(&mut model);

    let mut worker = Capsule::new("Worker");
    worker.add_port(Port::new("p", proto));
    let worker_id = model.add_capsule(worker);
    let mut hub = Capsule::new("Hub");
    hub.add_port(Port::new("q", proto).conjugated().with_replication(3u32));
    let hub_id = model.add_capsule(hub);

    let mut top = Capsule::new("Top");
    top.add_part(Part::new("worker", worker_id).with_bounds(3, 3u32));
    top.add_part(Part::new("hub", hub_id));
    top.add_connector(Connector::between(
        "fan",
        ConnectorEnd::on_part("worker", "p"),
        ConnectorEnd::on_part("hub", "q"),
    ));
    let top_id = model.add_capsule(top);

    let tree = resolve(&model, top_id).unwrap();
    assert_eq!(tree.connections().len(), 3);

    let root = tree.instance(tree.root());
    let workers = &root.contained["worker"];
    let hub_instance = root.contained["hub"][0];
    let q = tree.instance(hub_instance).ports["q"];
    assert_eq!(tree.port(q).peers().len(), 3);

    // Each worker's single far end lands on a distinct slot of `hub.q`.
    let mut slots = Vec::new();
    for (i, &w) in workers.iter().enumerate() {
        let p = tree.instance(w).ports["p"];
        let peers = tree.port(p).peers();
        assert_eq!(peers.len(), 1);
        let far = tree.far_end(peers[0]);
        assert_eq!(far.owner, q);
        slots.push(far.index);

        // Reciprocal: the hub's i-th peer points back at this worker.
        let back = tree.far_end(tree.port(q).peers()[i]);
        assert_eq!(back.owner, p);
        assert_eq!(back.index, 0);
    }
    slots.sort_unstable();
    assert_eq!(slots, vec![0, 1, 2]);
}

#[test]
fn test_relay_port_resolves_to_a_single_direct_pair() {
    let mut model = Model::standard();
    let proto = comm(&mut model);

    let mut inner = Capsule::new("Inner");
    inner.add_port(Port::new("r", proto).conjugated());
    let inner_id = model.add_capsule(inner);

    let mut top = Capsule::new("Top");
    top.add_port(Port::new("p", proto).relay());
    top.add_part(Part::new("c", inner_id));
    top.add_connector(Connector::between(
        "through",
        ConnectorEnd::own("p"),
        ConnectorEnd::on_part("c", "r"),
    ));
    let top_id = model.add_capsule(top);

    let tree = resolve(&model, top_id).unwrap();
    assert_eq!(tree.connections().len(), 1);

    let root = tree.instance(tree.root());
    let p = root.ports["p"];
    let r = tree.instance(root.contained["c"][0]).ports["r"];

    // One reciprocal pair, no intermediate hop.
    let p_peers = tree.port(p).peers();
    assert_eq!(p_peers.len(), 1);
    assert_eq!(tree.far_end(p_peers[0]).owner, r);
    let r_peers = tree.port(r).peers();
    assert_eq!(r_peers.len(), 1);
    assert_eq!(tree.far_end(r_peers[0]).owner, p);
}

#[test]
fn test_top_level_port_refuses_relay_conversion() {
    let mut model = Model::standard();
    let proto = comm(&mut model);
    let mut top = Capsule::new("Top");
    top.add_port(Port::new("t", proto).relay());
    let top_id = model.add_capsule(top);

    let mut tree = resolve(&model, top_id).unwrap();
    let t = tree.instance(tree.root()).ports["t"];
    let err = tree.convert_to_relay(t).unwrap_err();
    assert_eq!(
        err,
        ResolveError::TopLevelRelay {
            port: "Top#t".to_string(),
        }
    );
}
