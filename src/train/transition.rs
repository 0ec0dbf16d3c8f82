//! Choosing the next edge when a follower runs off the end of its current one.

use tracing::debug;

use super::{EdgeDirection, SwitchRouter};
use crate::track_graph::{GraphEdge, TrackGraph};

/// Where a follower enters the edge it transitions onto.
#[derive(Clone, Debug, PartialEq)]
pub(super) struct EdgeEntry {
    pub edge_id: String,
    pub t: f64,
    pub direction: EdgeDirection,
}

/// Finds the edge to continue on after `exhausted` ends at `node_id`, or `None` at a
/// dead end.
///
/// A single candidate is taken as is. At a junction the router is asked first for the
/// exhausted edge's piece, then for the piece of each candidate. Without an answer the
/// follower never turns back into the piece it just left, and otherwise takes the first
/// candidate in graph order.
pub(super) fn next_edge<R: SwitchRouter + ?Sized>(
    graph: &TrackGraph,
    router: &R,
    exhausted: &GraphEdge,
    node_id: &str,
) -> Option<EdgeEntry> {
    let candidates: Vec<&GraphEdge> = graph
        .get_edges_connected_to_node(node_id)
        .into_iter()
        .filter(|edge| edge.id != exhausted.id)
        .collect();

    let next = match candidates.as_slice() {
        [] => return None,
        [only] => *only,
        _ => routed_candidate(router, &candidates, exhausted, node_id)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|edge| edge.piece_id != exhausted.piece_id)
                    .copied()
            })
            .unwrap_or(candidates[0]),
    };

    Some(entry_at(next, node_id))
}

fn routed_candidate<'a, R: SwitchRouter + ?Sized>(
    router: &R,
    candidates: &[&'a GraphEdge],
    exhausted: &GraphEdge,
    node_id: &str,
) -> Option<&'a GraphEdge> {
    let mut pieces = vec![exhausted.piece_id.as_str()];
    for edge in candidates {
        if !pieces.contains(&edge.piece_id.as_str()) {
            pieces.push(&edge.piece_id);
        }
    }

    pieces.into_iter().find_map(|piece_id| {
        let route = router.route_for_piece(piece_id, &exhausted.id, node_id)?;
        let edge = candidates.iter().find(|edge| edge.id == route).copied();
        if edge.is_none() {
            debug!(piece_id, route, node_id, "Routed edge is not reachable from this node");
        }
        edge
    })
}

fn entry_at(edge: &GraphEdge, node_id: &str) -> EdgeEntry {
    let (t, direction) = if edge.from_node_id == node_id {
        (0., EdgeDirection::Forward)
    } else {
        (1., EdgeDirection::Backward)
    };
    EdgeEntry {
        edge_id: edge.id.clone(),
        t,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{track_graph::CurveDefinition, vec3::Vec3};

    /// Routes every question about `piece` to `edge`.
    struct FixedRoute {
        piece: &'static str,
        edge: &'static str,
    }

    impl SwitchRouter for FixedRoute {
        fn route_for_piece(&self, piece_id: &str, _: &str, _: &str) -> Option<&str> {
            (piece_id == self.piece).then_some(self.edge)
        }
    }

    /// Edge "in" arrives at node "j" where three edges continue: "x" and "y" on piece
    /// "sw", and "z" on piece "other" which is stored pointing into "j".
    fn junction() -> TrackGraph {
        let mut graph = TrackGraph::new();
        for (i, id) in ["s", "j", "x1", "y1", "z0"].iter().enumerate() {
            graph.add_node(Vec3::new(i as f64, 0., 0.), Some(id));
        }
        let straight = CurveDefinition::Straight;
        graph.add_edge("s", "j", 1., straight, "approach", Some("in"));
        graph.add_edge("z0", "j", 1., straight, "other", Some("z"));
        graph.add_edge("j", "x1", 1., straight, "sw", Some("x"));
        graph.add_edge("j", "y1", 1., straight, "sw", Some("y"));
        graph
    }

    fn next(graph: &TrackGraph, router: &impl SwitchRouter, from: &str, node: &str) -> Option<EdgeEntry> {
        next_edge(graph, router, graph.get_edge(from).unwrap(), node)
    }

    #[test]
    fn dead_end_and_single_continuation() {
        let mut graph = junction();
        assert_eq!(next(&graph, &(), "in", "s"), None);
        assert_eq!(next(&graph, &(), "x", "x1"), None);

        graph.add_node(Vec3::new(9., 0., 0.), Some("x2"));
        graph.add_edge("x2", "x1", 1., CurveDefinition::Straight, "tail", Some("t"));
        let router = FixedRoute { piece: "tail", edge: "nowhere" };
        assert_eq!(
            next(&graph, &router, "x", "x1"),
            Some(EdgeEntry {
                edge_id: "t".to_string(),
                t: 1.,
                direction: EdgeDirection::Backward,
            })
        );
    }

    #[test]
    fn router_decides_at_junction() {
        let graph = junction();
        let router = FixedRoute { piece: "sw", edge: "y" };
        assert_eq!(
            next(&graph, &router, "in", "j"),
            Some(EdgeEntry {
                edge_id: "y".to_string(),
                t: 0.,
                direction: EdgeDirection::Forward,
            })
        );
    }

    #[test]
    fn without_a_route_first_candidate_wins() {
        let graph = junction();
        let entry = next(&graph, &(), "in", "j").unwrap();
        assert_eq!(entry.edge_id, "z");
        // Stored pointing into the node, so entered at its end going backwards
        assert_eq!(entry.t, 1.);
        assert_eq!(entry.direction, EdgeDirection::Backward);
    }

    #[test]
    fn unreachable_route_is_ignored() {
        let graph = junction();
        let router = FixedRoute { piece: "sw", edge: "nowhere" };
        assert_eq!(next(&graph, &router, "in", "j").unwrap().edge_id, "z");
    }

    #[test]
    fn leaving_a_piece_does_not_turn_back_into_it() {
        let graph = junction();
        assert_eq!(next(&graph, &(), "x", "j").unwrap().edge_id, "in");
    }
}
