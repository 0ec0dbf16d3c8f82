//! Path search over the track network. Edges are traversable both ways.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use ordered_float::OrderedFloat;

use super::{GraphEdge, TrackGraph};

impl TrackGraph {
    /// Edges touching `node_id` paired with the node on their other side.
    fn neighbors<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = (&'a GraphEdge, &'a str)> {
        self.edges
            .iter()
            .filter_map(move |edge| Some((edge, edge.other_node(node_id)?)))
    }

    /// Breadth-first search from `start_id` to `end_id`, returning the edge ids of the
    /// first path found with the fewest hops. Empty if there is no path or the two are equal.
    pub fn find_path(&self, start_id: &str, end_id: &str) -> Vec<String> {
        if start_id == end_id || self.get_node(start_id).is_none() {
            return vec![];
        }

        // node id -> (previous node id, edge id used to get here)
        let mut came_from: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut queue = VecDeque::from([start_id]);

        while let Some(current) = queue.pop_front() {
            for (edge, next) in self.neighbors(current) {
                if next == start_id || came_from.contains_key(next) {
                    continue;
                }
                came_from.insert(next, (current, edge.id.as_str()));
                if next == end_id {
                    return trace_back(&came_from, start_id, end_id);
                }
                queue.push_back(next);
            }
        }
        vec![]
    }

    /// Dijkstra search with edge lengths as costs. Returns the edge ids of the shortest
    /// path by length, or empty if there is none.
    pub fn find_path_by_length(&self, start_id: &str, end_id: &str) -> Vec<String> {
        if start_id == end_id || self.get_node(start_id).is_none() {
            return vec![];
        }

        let mut came_from: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut costs: HashMap<&str, f64> = HashMap::from([(start_id, 0.)]);
        let mut queue = BinaryHeap::new();
        queue.push((Reverse(OrderedFloat(0.)), start_id));

        while let Some((Reverse(OrderedFloat(cost)), current)) = queue.pop() {
            if current == end_id {
                return trace_back(&came_from, start_id, end_id);
            }
            if costs.get(current).is_some_and(|best| *best < cost) {
                continue;
            }
            for (edge, next) in self.neighbors(current) {
                let new_cost = cost + edge.length_m;
                if new_cost.is_nan() || costs.get(next).is_some_and(|best| *best <= new_cost) {
                    continue;
                }
                costs.insert(next, new_cost);
                came_from.insert(next, (current, edge.id.as_str()));
                queue.push((Reverse(OrderedFloat(new_cost)), next));
            }
        }
        vec![]
    }
}

fn trace_back<'a>(
    came_from: &HashMap<&'a str, (&'a str, &'a str)>,
    start_id: &str,
    end_id: &'a str,
) -> Vec<String> {
    let mut route = vec![];
    let mut node = end_id;
    while node != start_id {
        let Some(&(prev, edge_id)) = came_from.get(node) else {
            break;
        };
        route.push(edge_id.to_string());
        node = prev;
    }
    route.reverse();
    route
}

#[cfg(test)]
mod tests {
    use crate::{
        track_graph::{CurveDefinition, TrackGraph},
        vec3::Vec3,
    };

    fn add_line(graph: &mut TrackGraph, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            graph.add_node(Vec3::new(i as f64, 0., 0.), Some(name));
        }
    }

    #[test]
    fn path_along_a_line() {
        let mut graph = TrackGraph::new();
        add_line(&mut graph, &["A", "B", "C", "D"]);
        graph.add_edge("A", "B", 1., CurveDefinition::Straight, "p", Some("AB"));
        // Stored against the search direction; still traversable
        graph.add_edge("C", "B", 1., CurveDefinition::Straight, "p", Some("BC"));
        graph.add_edge("C", "D", 1., CurveDefinition::Straight, "p", Some("CD"));

        assert_eq!(graph.find_path("A", "D"), ["AB", "BC", "CD"]);
        assert_eq!(graph.find_path("D", "A"), ["CD", "BC", "AB"]);
        assert!(graph.find_path("A", "A").is_empty());
    }

    #[test]
    fn no_path_between_islands() {
        let mut graph = TrackGraph::new();
        add_line(&mut graph, &["A", "B", "C"]);
        graph.add_edge("A", "B", 1., CurveDefinition::Straight, "p", Some("AB"));
        assert!(graph.find_path("A", "C").is_empty());
        assert!(graph.find_path("missing", "A").is_empty());
        assert!(graph.find_path_by_length("A", "C").is_empty());
    }

    #[test]
    fn hop_count_versus_length() {
        // A -- long -- D, and A - B - C - D with short edges
        let mut graph = TrackGraph::new();
        add_line(&mut graph, &["A", "B", "C", "D"]);
        graph.add_edge("A", "D", 10., CurveDefinition::Straight, "p", Some("AD"));
        graph.add_edge("A", "B", 1., CurveDefinition::Straight, "p", Some("AB"));
        graph.add_edge("B", "C", 1., CurveDefinition::Straight, "p", Some("BC"));
        graph.add_edge("C", "D", 1., CurveDefinition::Straight, "p", Some("CD"));

        assert_eq!(graph.find_path("A", "D"), ["AD"]);
        assert_eq!(graph.find_path_by_length("A", "D"), ["AB", "BC", "CD"]);
    }
}
