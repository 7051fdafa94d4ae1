use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::tile::Tile;

/// A maximally connected set of land (or water) tiles, used by the safety
/// heuristics of the adventure planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapRegion {
    pub id: u32,
    pub tile_count: u32,
    pub neighbours: Vec<u32>,
}

impl MapRegion {
    pub fn neighbour_count(&self) -> usize {
        self.neighbours.len()
    }
}

/// Splits the map into regions: connected components of same-surface tiles,
/// with region adjacency derived from the cross-surface edges.
pub fn build_regions(tiles: &mut [Tile], width: i32) -> Vec<MapRegion> {
    let height = tiles.len() as i32 / width.max(1);

    let mut graph: UnGraph<i32, bool> = UnGraph::new_undirected();
    let mut nodes: Vec<NodeIndex> = Vec::with_capacity(tiles.len());
    for tile in tiles.iter() {
        nodes.push(graph.add_node(tile.index));
    }

    for tile in tiles.iter() {
        let x = tile.index % width;
        let y = tile.index / width;

        // Right and down are enough for an undirected graph.
        for dir in [Direction::Right, Direction::Bottom, Direction::BottomRight, Direction::BottomLeft] {
            let (dx, dy) = dir.offset();
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }

            let neighbour = (ny * width + nx) as usize;
            let same_surface = tiles[neighbour].is_water() == tile.is_water();
            graph.add_edge(nodes[tile.index as usize], nodes[neighbour], same_surface);
        }
    }

    // Union same-surface neighbours into components.
    let mut components: UnionFind<usize> = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        if *edge.weight() {
            components.union(edge.source().index(), edge.target().index());
        }
    }

    let labels = components.into_labeling();
    let mut region_ids: HashMap<usize, u32> = HashMap::new();
    for (tile, &label) in tiles.iter_mut().zip(labels.iter()) {
        let next_id = region_ids.len() as u32;
        let id = *region_ids.entry(label).or_insert(next_id);
        tile.region = id;
    }

    let mut regions: Vec<MapRegion> = (0..region_ids.len() as u32)
        .map(|id| MapRegion { id, ..MapRegion::default() })
        .collect();

    for tile in tiles.iter() {
        regions[tile.region as usize].tile_count += 1;
    }

    // Region adjacency: cross-surface edges connect the two regions they span.
    for edge in graph.edge_references() {
        if *edge.weight() {
            continue;
        }
        let a = tiles[edge.source().index()].region;
        let b = tiles[edge.target().index()].region;
        if a == b {
            continue;
        }
        if !regions[a as usize].neighbours.contains(&b) {
            regions[a as usize].neighbours.push(b);
        }
        if !regions[b as usize].neighbours.contains(&a) {
            regions[b as usize].neighbours.push(a);
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Ground;

    fn strip(grounds: &[Ground]) -> Vec<Tile> {
        grounds
            .iter()
            .enumerate()
            .map(|(index, &ground)| Tile::new(index as i32, ground))
            .collect()
    }

    #[test]
    fn water_splits_land_into_regions() {
        // Two land columns separated by water on a 3x2 map.
        let mut tiles = strip(&[
            Ground::Grass, Ground::Water, Ground::Grass,
            Ground::Grass, Ground::Water, Ground::Grass,
        ]);
        let regions = build_regions(&mut tiles, 3);

        assert_eq!(regions.len(), 3);
        assert_ne!(tiles[0].region, tiles[2].region);
        assert_eq!(tiles[0].region, tiles[3].region);
    }

    #[test]
    fn land_regions_touch_through_the_water_between_them() {
        let mut tiles = strip(&[
            Ground::Grass, Ground::Water, Ground::Grass,
            Ground::Grass, Ground::Water, Ground::Grass,
        ]);
        let regions = build_regions(&mut tiles, 3);

        let water_region = tiles[1].region;
        let left_region = tiles[0].region;
        assert!(regions[left_region as usize].neighbours.contains(&water_region));
    }

    #[test]
    fn uniform_map_is_one_region() {
        let mut tiles = strip(&[Ground::Grass; 9]);
        let regions = build_regions(&mut tiles, 3);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].tile_count, 9);
        assert!(regions[0].neighbours.is_empty());
    }
}
