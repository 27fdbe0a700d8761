//! Resolution of a capsule type into a fully wired [`InstanceTree`].
//!
//! Resolution runs in two passes. The expansion pass instantiates the part
//! hierarchy: one capsule instance per replication slot of every part,
//! recursively, each with one port instance per declared or inherited port.
//! The wiring pass then walks the tree top-down and, at every level that owns
//! connectors, pairs far ends across each connector, collapsing border ports
//! that turn out to be pure pass-throughs.

use capsule_model::{CapsuleId, Model, PartIdTable, PartKind, PortIdTable};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, debug_span, trace};

use crate::error::ResolveError;
use crate::instance::{CapsuleInstance, FarEndId, InstanceId, InstanceTree, PortInstance};

/// Resolve the given top capsule type into a connected instance tree.
///
/// The top instance itself is never dynamic and occupies no part; its border
/// ports stay addressable from outside and are never collapsed.
pub fn resolve(model: &Model, top: CapsuleId) -> Result<InstanceTree, ResolveError> {
    resolve_depth(model, top, true)
}

/// Resolve only the top capsule's own connectors, leaving the contained
/// levels unwired. This is what the wiring generator consumes when it emits
/// one capsule class: each class wires exactly its own structure.
pub fn resolve_shallow(model: &Model, top: CapsuleId) -> Result<InstanceTree, ResolveError> {
    resolve_depth(model, top, false)
}

fn resolve_depth(model: &Model, top: CapsuleId, deep: bool) -> Result<InstanceTree, ResolveError> {
    let _span = debug_span!("resolve", capsule = %model.capsule(top).name).entered();

    let mut tree = InstanceTree::default();
    let root = expand(model, &mut tree, top, None, None, false, None);
    tree.root = root;
    debug!(
        instances = tree.instances.len(),
        ports = tree.ports.len(),
        "instance tree expanded"
    );

    connect_level(model, &mut tree, root, deep)?;
    debug!(connections = tree.connections.len(), "topology wired");
    Ok(tree)
}

/// Expansion pass: create the instance, its port instances and, recursively,
/// the instances of all its parts.
fn expand(
    model: &Model,
    tree: &mut InstanceTree,
    capsule: CapsuleId,
    part: Option<capsule_model::PartRef>,
    index: Option<u32>,
    dynamic: bool,
    container: Option<InstanceId>,
) -> InstanceId {
    let part_name = part.map(|p| model.part(p).name.clone());
    let id = tree.add_instance(CapsuleInstance {
        capsule,
        capsule_name: model.capsule(capsule).name.clone(),
        part,
        part_name,
        index,
        dynamic,
        container,
        contained: IndexMap::new(),
        ports: IndexMap::new(),
    });

    for (_, name, port_ref) in PortIdTable::build(model, capsule).iter() {
        let capacity = model.port(port_ref).replication.assume();
        let port_id = tree.add_port(PortInstance {
            owner: id,
            port: port_ref,
            name: name.to_string(),
            capacity,
            unconnected: capacity,
            peers: SmallVec::new(),
            relay: None,
        });
        tree.instances[id.0].ports.insert(name.to_string(), port_id);
    }

    // Contained parts sorted purely by name for a stable ordering across
    // regenerations.
    let mut parts: Vec<(String, capsule_model::PartRef)> = PartIdTable::build(model, capsule)
        .iter()
        .map(|(_, name, part_ref)| (name.to_string(), part_ref))
        .collect();
    parts.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (name, part_ref) in parts {
        let decl = model.part(part_ref);
        let lower = decl.lower;
        let upper = decl.upper.assume();
        // An instance inside a dynamic instance is itself dynamic, as is
        // every occupant of an optional or plugin part.
        let mut child_dynamic =
            lower == 0 || dynamic || !matches!(decl.kind, PartKind::Fixed);

        let mut instances = Vec::new();
        if upper == 1 {
            instances.push(expand(
                model,
                tree,
                decl.capsule,
                Some(part_ref),
                None,
                child_dynamic,
                Some(id),
            ));
        } else {
            for i in 0..upper {
                if i == lower {
                    child_dynamic = true;
                }
                instances.push(expand(
                    model,
                    tree,
                    decl.capsule,
                    Some(part_ref),
                    Some(i),
                    child_dynamic,
                    Some(id),
                ));
            }
        }
        tree.instances[id.0].contained.insert(name, instances);
    }

    id
}

/// A connector end resolved against a concrete instance.
struct End {
    /// `None` when the end is on the instance's own port.
    part_name: Option<String>,
    port_name: String,
    num_parts: u32,
    num_port_instances: u32,
    /// Whether the end's port should be collapsed into a pass-through.
    relay: bool,
    desc: String,
}

/// Wiring pass: resolve this level's connectors, then recurse into every
/// non-dynamic contained instance. Dynamic instances are wired on demand by
/// the runtime, not here.
fn connect_level(
    model: &Model,
    tree: &mut InstanceTree,
    id: InstanceId,
    deep: bool,
) -> Result<(), ResolveError> {
    for (owner, index) in all_connectors(model, tree.instance(id).capsule) {
        let connector = &model.capsule(owner).connectors[index];
        connect_connector(model, tree, id, connector)?;
    }

    if !deep {
        return Ok(());
    }
    let children: Vec<InstanceId> = tree
        .instance(id)
        .contained
        .values()
        .flatten()
        .copied()
        .collect();
    for child in children {
        if !tree.instance(child).dynamic {
            connect_level(model, tree, child, true)?;
        }
    }
    Ok(())
}

/// Connectors of a capsule type including inherited ones, super-type first,
/// each level in declaration order.
fn all_connectors(model: &Model, capsule: CapsuleId) -> Vec<(CapsuleId, usize)> {
    let mut out = Vec::new();
    collect_connectors(model, capsule, &mut out);
    out
}

fn collect_connectors(model: &Model, id: CapsuleId, out: &mut Vec<(CapsuleId, usize)>) {
    let capsule = model.capsule(id);
    if let Some(super_id) = capsule.redefines {
        collect_connectors(model, super_id, out);
    }
    out.extend((0..capsule.connectors.len()).map(|i| (id, i)));
}

fn connect_connector(
    model: &Model,
    tree: &mut InstanceTree,
    id: InstanceId,
    connector: &capsule_model::Connector,
) -> Result<(), ResolveError> {
    let end0 = resolve_end(model, tree, id, connector, &connector.ends[0])?;
    let end1 = resolve_end(model, tree, id, connector, &connector.ends[1])?;

    // The end with the most port instances drives the pairing; ties go to
    // the first end.
    let (primary, secondary) = if end0.num_port_instances >= end1.num_port_instances {
        (end0, end1)
    } else {
        (end1, end0)
    };
    if primary.num_parts == 0 {
        return Ok(());
    }
    let per_primary_role = secondary.num_port_instances / primary.num_parts;

    trace!(
        connector = %connector.name,
        primary = %primary.desc,
        secondary = %secondary.desc,
        per_primary_role,
        "wiring connector"
    );

    let primary_instances = instances_for(tree, id, primary.part_name.as_deref());
    let secondary_instances = instances_for(tree, id, secondary.part_name.as_deref());

    let insufficient = || ResolveError::InsufficientInstances {
        connector: connector.name.clone(),
        primary: primary.desc.clone(),
        secondary: secondary.desc.clone(),
    };

    let mut secondary_iter = secondary_instances.into_iter();
    let mut current_secondary = secondary_iter.next();
    for cap0 in primary_instances {
        for _ in 0..per_primary_role {
            let Some(secondary_capsule) = current_secondary else {
                break;
            };

            let far0 = end_far_end(tree, cap0, &primary, connector)?.ok_or_else(|| {
                ResolveError::CapacityExceeded {
                    connector: connector.name.clone(),
                    port: primary.desc.clone(),
                }
            })?;
            let far1 = match end_far_end(tree, secondary_capsule, &secondary, connector)? {
                Some(far) => far,
                None => {
                    // This secondary instance is fully connected; round-robin
                    // to the next one.
                    let next = secondary_iter.next().ok_or_else(insufficient)?;
                    current_secondary = Some(next);
                    end_far_end(tree, next, &secondary, connector)?.ok_or_else(insufficient)?
                }
            };
            tree.connect(far0, far1);
            tree.connections.push(crate::instance::Connection {
                connector: connector.name.clone(),
                ends: [far0, far1],
            });
        }
    }
    Ok(())
}

fn resolve_end(
    model: &Model,
    tree: &InstanceTree,
    id: InstanceId,
    connector: &capsule_model::Connector,
    end: &capsule_model::ConnectorEnd,
) -> Result<End, ResolveError> {
    let instance = tree.instance(id);
    match &end.part {
        Some(part_name) => {
            let part_ref = PartIdTable::build(model, instance.capsule)
                .get(part_name)
                .ok_or_else(|| ResolveError::UnknownPart {
                    connector: connector.name.clone(),
                    part: part_name.clone(),
                })?;
            let part = model.part(part_ref);
            let port_ref = PortIdTable::build(model, part.capsule)
                .get(&end.port)
                .ok_or_else(|| ResolveError::UnknownPort {
                    connector: connector.name.clone(),
                    port: end.port.clone(),
                })?;
            let num_parts = part.upper.assume();
            Ok(End {
                part_name: Some(part_name.clone()),
                port_name: end.port.clone(),
                num_parts,
                num_port_instances: num_parts * model.port(port_ref).replication.assume(),
                relay: false,
                desc: format!("{}.{}", part_name, end.port),
            })
        }
        None => {
            let port_ref = PortIdTable::build(model, instance.capsule)
                .get(&end.port)
                .ok_or_else(|| ResolveError::UnknownPort {
                    connector: connector.name.clone(),
                    port: end.port.clone(),
                })?;
            let port = model.port(port_ref);
            // The end sits on the instance itself; replication of the part
            // the instance occupies scales the pairing arithmetic.
            let num_parts = match instance.part {
                Some(part_ref) => model.part(part_ref).upper.assume(),
                None => 1,
            };
            Ok(End {
                part_name: None,
                port_name: end.port.clone(),
                num_parts,
                num_port_instances: num_parts * port.replication.assume(),
                relay: !instance.dynamic && port.border,
                desc: format!("{}.{}", model.capsule(instance.capsule).name, end.port),
            })
        }
    }
}

/// The concrete instances a resolved end fans out over: the occupants of the
/// named part, or the enclosing instance itself for an own-port end.
fn instances_for(tree: &InstanceTree, id: InstanceId, part_name: Option<&str>) -> Vec<InstanceId> {
    match part_name {
        None => vec![id],
        Some(name) => tree
            .instance(id)
            .contained
            .get(name)
            .cloned()
            .unwrap_or_default(),
    }
}

/// Take a far end for one pairing of the given end on the given instance.
///
/// Own-port ends eligible for pass-through are collapsed here, except on the
/// top instance: a top-level port has no outside to forward to, so it keeps
/// its own far ends even when a connector would otherwise relay through it.
fn end_far_end(
    tree: &mut InstanceTree,
    id: InstanceId,
    end: &End,
    connector: &capsule_model::Connector,
) -> Result<Option<FarEndId>, ResolveError> {
    let port_id = *tree
        .instance(id)
        .ports
        .get(&end.port_name)
        .ok_or_else(|| ResolveError::UnknownPort {
            connector: connector.name.clone(),
            port: end.port_name.clone(),
        })?;

    if end.relay && !tree.is_top_level_port(port_id) {
        tree.convert_to_relay(port_id).map(Some)
    } else {
        Ok(tree.mint_far_end(port_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_model::{Capsule, Connector, ConnectorEnd, Part, Port, Protocol};

    /// Model with Top { a: A, b: B } and a connector a.p <-> b.q.
    fn simple_pair() -> (Model, CapsuleId) {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut a = Capsule::new("A");
        a.add_port(Port::new("p", proto));
        let a_id = model.add_capsule(a);

        let mut b = Capsule::new("B");
        b.add_port(Port::new("q", proto).conjugated());
        let b_id = model.add_capsule(b);

        let mut top = Capsule::new("Top");
        top.add_part(Part::new("a", a_id));
        top.add_part(Part::new("b", b_id));
        top.add_connector(Connector::between(
            "c",
            ConnectorEnd::on_part("a", "p"),
            ConnectorEnd::on_part("b", "q"),
        ));
        let top_id = model.add_capsule(top);
        (model, top_id)
    }

    fn port_of(tree: &InstanceTree, path: &[&str], port: &str) -> crate::instance::PortInstanceId {
        let mut id = tree.root();
        for step in path {
            id = tree.instance(id).contained[*step][0];
        }
        tree.instance(id).ports[port]
    }

    #[test]
    fn test_simple_connection_is_reciprocal() {
        let (model, top) = simple_pair();
        let tree = resolve(&model, top).unwrap();

        let p = port_of(&tree, &["a"], "p");
        let q = port_of(&tree, &["b"], "q");

        assert_eq!(tree.port(p).peers().len(), 1);
        assert_eq!(tree.port(q).peers().len(), 1);
        // Each port's peer entry is the other port's far end.
        let p_peer = tree.far_end(tree.port(p).peers()[0]);
        let q_peer = tree.far_end(tree.port(q).peers()[0]);
        assert_eq!(p_peer.owner, q);
        assert_eq!(q_peer.owner, p);
        assert_eq!(p_peer.index, 0);
        assert_eq!(q_peer.index, 0);
    }

    #[test]
    fn test_replicated_fan_out_round_robin() {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut client = Capsule::new("Client");
        client.add_port(Port::new("p", proto).with_replication(3u32));
        let client_id = model.add_capsule(client);

        let mut worker = Capsule::new("Worker");
        worker.add_port(Port::new("q", proto).conjugated());
        let worker_id = model.add_capsule(worker);

        let mut top = Capsule::new("Top");
        top.add_part(Part::new("client", client_id));
        top.add_part(Part::new("workers", worker_id).with_bounds(3, 3u32));
        top.add_connector(Connector::between(
            "fan",
            ConnectorEnd::on_part("client", "p"),
            ConnectorEnd::on_part("workers", "q"),
        ));
        let top_id = model.add_capsule(top);

        let tree = resolve(&model, top_id).unwrap();
        let p = port_of(&tree, &["client"], "p");
        assert_eq!(tree.port(p).peers().len(), 3);

        // Each worker got exactly one connection, in replication order.
        let workers = &tree.instance(tree.root()).contained["workers"];
        for (i, &w) in workers.iter().enumerate() {
            let q = tree.instance(w).ports["q"];
            let peers = tree.port(q).peers();
            assert_eq!(peers.len(), 1, "worker {} should have one peer", i);
            let far = tree.far_end(peers[0]);
            assert_eq!(far.owner, p);
            assert_eq!(far.index, i as u32);
        }
    }

    #[test]
    fn test_insufficient_instances_is_reported() {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut client = Capsule::new("Client");
        client.add_port(Port::new("p", proto).with_replication(2u32));
        let client_id = model.add_capsule(client);

        let mut worker = Capsule::new("Worker");
        worker.add_port(Port::new("q", proto).conjugated());
        let worker_id = model.add_capsule(worker);

        // Two clients compete for the same two worker slots; the second
        // connector exhausts the round-robin.
        let mut top = Capsule::new("Top");
        top.add_part(Part::new("clientA", client_id));
        top.add_part(Part::new("clientB", client_id));
        top.add_part(Part::new("workers", worker_id).with_bounds(2, 2u32));
        top.add_connector(Connector::between(
            "fanA",
            ConnectorEnd::on_part("clientA", "p"),
            ConnectorEnd::on_part("workers", "q"),
        ));
        top.add_connector(Connector::between(
            "fanB",
            ConnectorEnd::on_part("clientB", "p"),
            ConnectorEnd::on_part("workers", "q"),
        ));
        let top_id = model.add_capsule(top);

        let err = resolve(&model, top_id).unwrap_err();
        match err {
            ResolveError::InsufficientInstances { connector, .. } => {
                assert_eq!(connector, "fanB");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Mid has a border pass-through port wired to an inner part; the outer
    /// connection must collapse onto the inner port.
    fn relay_model() -> (Model, CapsuleId) {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut inner = Capsule::new("Inner");
        inner.add_port(Port::new("r", proto));
        let inner_id = model.add_capsule(inner);

        let mut mid = Capsule::new("Mid");
        mid.add_port(Port::new("fwd", proto).relay());
        mid.add_part(Part::new("inner", inner_id));
        mid.add_connector(Connector::between(
            "through",
            ConnectorEnd::own("fwd"),
            ConnectorEnd::on_part("inner", "r"),
        ));
        let mid_id = model.add_capsule(mid);

        let mut other = Capsule::new("Other");
        other.add_port(Port::new("s", proto).conjugated());
        let other_id = model.add_capsule(other);

        let mut top = Capsule::new("Top");
        top.add_part(Part::new("mid", mid_id));
        top.add_part(Part::new("other", other_id));
        top.add_connector(Connector::between(
            "outer",
            ConnectorEnd::on_part("other", "s"),
            ConnectorEnd::on_part("mid", "fwd"),
        ));
        let top_id = model.add_capsule(top);
        (model, top_id)
    }

    #[test]
    fn test_relay_port_collapses_onto_inner_port() {
        let (model, top) = relay_model();
        let tree = resolve(&model, top).unwrap();

        let s = port_of(&tree, &["other"], "s");
        let fwd = port_of(&tree, &["mid"], "fwd");
        let r = port_of(&tree, &["mid", "inner"], "r");

        assert!(tree.port(fwd).is_relay());
        assert!(tree.port(fwd).peers().is_empty());

        // The outer port and the inner port are now direct peers.
        assert_eq!(tree.port(s).peers().len(), 1);
        assert_eq!(tree.far_end(tree.port(s).peers()[0]).owner, r);
        assert_eq!(tree.port(r).peers().len(), 1);
        assert_eq!(tree.far_end(tree.port(r).peers()[0]).owner, s);
    }

    #[test]
    fn test_top_level_port_is_never_collapsed() {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut child = Capsule::new("Child");
        child.add_port(Port::new("p", proto));
        let child_id = model.add_capsule(child);

        let mut top = Capsule::new("Top");
        top.add_port(Port::new("t", proto).conjugated().relay());
        top.add_part(Part::new("c", child_id));
        top.add_connector(Connector::between(
            "edge",
            ConnectorEnd::own("t"),
            ConnectorEnd::on_part("c", "p"),
        ));
        let top_id = model.add_capsule(top);

        let tree = resolve(&model, top_id).unwrap();
        let t = tree.instance(tree.root()).ports["t"];
        let p = port_of(&tree, &["c"], "p");

        assert!(!tree.port(t).is_relay());
        assert_eq!(tree.port(t).peers().len(), 1);
        assert_eq!(tree.far_end(tree.port(t).peers()[0]).owner, p);
    }

    #[test]
    fn test_double_conversion_fans_out_through_one_slot() {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));

        let mut leaf_c = Capsule::new("C");
        leaf_c.add_port(Port::new("r", proto));
        let c_id = model.add_capsule(leaf_c);
        let mut leaf_d = Capsule::new("D");
        leaf_d.add_port(Port::new("s", proto));
        let d_id = model.add_capsule(leaf_d);

        // Mid relays one border port to two different inner parts.
        let mut mid = Capsule::new("Mid");
        mid.add_port(Port::new("fwd", proto).relay().with_replication(2u32));
        mid.add_part(Part::new("c", c_id));
        mid.add_part(Part::new("d", d_id));
        mid.add_connector(Connector::between(
            "y",
            ConnectorEnd::own("fwd"),
            ConnectorEnd::on_part("c", "r"),
        ));
        mid.add_connector(Connector::between(
            "z",
            ConnectorEnd::own("fwd"),
            ConnectorEnd::on_part("d", "s"),
        ));
        let mid_id = model.add_capsule(mid);

        let mut other = Capsule::new("Other");
        other.add_port(Port::new("out", proto).conjugated().with_replication(2u32));
        let other_id = model.add_capsule(other);

        let mut top = Capsule::new("Top");
        top.add_part(Part::new("mid", mid_id));
        top.add_part(Part::new("other", other_id));
        top.add_connector(Connector::between(
            "outer",
            ConnectorEnd::on_part("other", "out"),
            ConnectorEnd::on_part("mid", "fwd"),
        ));
        let top_id = model.add_capsule(top);

        let tree = resolve(&model, top_id).unwrap();
        let out = port_of(&tree, &["other"], "out");
        let fwd = port_of(&tree, &["mid"], "fwd");
        let r = port_of(&tree, &["mid", "c"], "r");
        let s = port_of(&tree, &["mid", "d"], "s");

        assert!(tree.port(fwd).is_relay());
        // Both inner connectors reuse the single re-exposed far end, so the
        // outer port fans out to both inner ports.
        let out_peers: Vec<_> = tree
            .port(out)
            .peers()
            .iter()
            .map(|&fe| tree.far_end(fe).owner)
            .collect();
        assert!(out_peers.contains(&r));
        assert!(out_peers.contains(&s));
    }

    #[test]
    fn test_converting_a_top_level_port_is_fatal() {
        let mut model = Model::standard();
        let proto = model.add_protocol(Protocol::new("P"));
        let mut top = Capsule::new("Top");
        top.add_port(Port::new("t", proto));
        let top_id = model.add_capsule(top);

        let mut tree = resolve(&model, top_id).unwrap();
        let t = tree.instance(tree.root()).ports["t"];
        let err = tree.convert_to_relay(t).unwrap_err();
        assert_eq!(
            err,
            ResolveError::TopLevelRelay {
                port: "Top#t".to_string()
            }
        );
    }

    #[test]
    fn test_shallow_resolution_skips_contained_levels() {
        let (model, top) = relay_model();
        let tree = resolve_shallow(&model, top).unwrap();

        // The outer connector is wired, the one inside Mid is not: the
        // pass-through port keeps its outer connection.
        let s = port_of(&tree, &["other"], "s");
        let fwd = port_of(&tree, &["mid"], "fwd");
        let r = port_of(&tree, &["mid", "inner"], "r");

        assert!(!tree.port(fwd).is_relay());
        assert_eq!(tree.port(s).peers().len(), 1);
        assert_eq!(tree.far_end(tree.port(s).peers()[0]).owner, fwd);
        assert!(tree.port(r).peers().is_empty());
        assert_eq!(tree.connections().len(), 1);
        assert_eq!(tree.connections()[0].connector, "outer");
    }

    #[test]
    fn test_dynamic_marking() {
        let mut model = Model::standard();
        let leaf = model.add_capsule(Capsule::new("Leaf"));
        let mut inner = Capsule::new("Inner");
        inner.add_part(Part::new("leaf", leaf));
        let inner_id = model.add_capsule(inner);

        let mut top = Capsule::new("Top");
        top.add_part(Part::new("fixed", inner_id).with_bounds(1, 3u32));
        top.add_part(Part::new("opt", inner_id).optional());
        let top_id = model.add_capsule(top);

        let tree = resolve(&model, top_id).unwrap();
        let root = tree.instance(tree.root());

        // Replicated fixed part: instances at or past the lower bound are
        // dynamic.
        let fixed = &root.contained["fixed"];
        assert!(!tree.instance(fixed[0]).dynamic);
        assert!(tree.instance(fixed[1]).dynamic);
        assert!(tree.instance(fixed[2]).dynamic);

        // Dynamism propagates to all descendants.
        let dyn_leaf = tree.instance(fixed[1]).contained["leaf"][0];
        assert!(tree.instance(dyn_leaf).dynamic);
        let static_leaf = tree.instance(fixed[0]).contained["leaf"][0];
        assert!(!tree.instance(static_leaf).dynamic);

        // Optional parts are dynamic from index zero.
        assert!(tree.instance(root.contained["opt"][0]).dynamic);
    }

    #[test]
    fn test_qualified_names() {
        let (model, top) = simple_pair();
        let tree = resolve(&model, top).unwrap();
        let a = tree.instance(tree.root()).contained["a"][0];
        assert_eq!(tree.qualified_name(a, '.'), "Top.a");
        assert_eq!(tree.qualified_name(a, '_'), "Top_a");
        let p = tree.instance(a).ports["p"];
        assert_eq!(tree.port_qualified_name(p), "Top.a#p");
    }
}
