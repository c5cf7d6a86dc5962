//! Candidate sets for nearest-neighbour searches.
//!
//! Only pseudojets closer than R in the rapidity-azimuth plane can be nearest neighbours, so a
//! search around a point may be restricted to the pseudojets that could be that close. The plain
//! variant returns every active pseudojet; the tiled variant returns the pseudojets in the 3x3
//! block of tiles around the point, with tile edges no shorter than R and azimuth wrapping.

use std::f64::consts::TAU;

/// Rapidities beyond this magnitude all land in the outermost tile rows.
const MAX_TILED_RAPIDITY: f64 = 10.0;

/// Tiles are never narrower than this, which bounds the grid at 200 x 62 tiles for any radius.
const MIN_TILE_EDGE: f64 = 0.1;

#[derive(Debug)]
pub(crate) enum Neighbourhood {
    Plain(PlainSet),
    Tiled(TileGrid),
}

impl Neighbourhood {
    pub(crate) fn insert(&mut self, jet: usize, rapidity: f64, phi: f64) {
        match self {
            Self::Plain(set) => set.insert(jet),
            Self::Tiled(grid) => grid.insert(jet, rapidity, phi),
        }
    }

    pub(crate) fn remove(&mut self, jet: usize, rapidity: f64, phi: f64) {
        match self {
            Self::Plain(set) => set.remove(jet),
            Self::Tiled(grid) => grid.remove(jet, rapidity, phi),
        }
    }

    /// Replaces the contents of `out` with every active pseudojet that could lie within R of
    /// at least one of `points`. Each pseudojet appears once.
    pub(crate) fn candidates_around(&self, points: &[(f64, f64)], out: &mut Vec<usize>) {
        out.clear();

        match self {
            Self::Plain(set) => out.extend_from_slice(&set.members),
            Self::Tiled(grid) => grid.candidates_around(points, out),
        }
    }
}

/// Every active pseudojet is a candidate.
#[derive(Debug, Default)]
pub(crate) struct PlainSet {
    members: Vec<usize>,
}

impl PlainSet {
    fn insert(&mut self, jet: usize) {
        self.members.push(jet);
    }

    fn remove(&mut self, jet: usize) {
        if let Some(position) = self.members.iter().position(|&member| member == jet) {
            self.members.swap_remove(position);
        }
    }
}

#[derive(Debug)]
pub(crate) struct TileGrid {
    rapidity_min: f64,
    rapidity_edge: f64,
    rapidity_tiles: usize,
    phi_edge: f64,
    phi_tiles: usize,
    tiles: Vec<Vec<usize>>,
}

impl TileGrid {
    /// Lays out tiles covering the given rapidities with edges of at least `radius`.
    pub(crate) fn new(radius: f64, rapidities: impl IntoIterator<Item = f64>) -> Self {
        let min_edge = radius.max(MIN_TILE_EDGE);

        let (low, high) = rapidities
            .into_iter()
            .map(|y| y.clamp(-MAX_TILED_RAPIDITY, MAX_TILED_RAPIDITY))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), y| {
                (low.min(y), high.max(y))
            });

        let (low, high) = if low <= high { (low, high) } else { (0.0, 0.0) };

        let rapidity_tiles = tile_count(high - low, min_edge);
        #[expect(
            clippy::cast_precision_loss,
            reason = "tile counts are tiny compared to the f64 mantissa"
        )]
        let rapidity_edge = if rapidity_tiles > 1 {
            (high - low) / rapidity_tiles as f64
        } else {
            f64::INFINITY
        };

        // With fewer than three azimuth tiles the 3x3 neighbourhood would wrap onto itself and
        // tiles would be narrower than R, so the whole circle becomes a single tile.
        let phi_tiles = match tile_count(TAU, min_edge) {
            count if count >= 3 => count,
            _ => 1,
        };
        #[expect(
            clippy::cast_precision_loss,
            reason = "tile counts are tiny compared to the f64 mantissa"
        )]
        let phi_edge = TAU / phi_tiles as f64;

        let tile_total = rapidity_tiles
            .checked_mul(phi_tiles)
            .expect("tile counts are bounded by the clamped rapidity range and 2π over the minimum edge");

        Self {
            rapidity_min: low,
            rapidity_edge,
            rapidity_tiles,
            phi_edge,
            phi_tiles,
            tiles: vec![Vec::new(); tile_total],
        }
    }

    fn rapidity_index(&self, rapidity: f64) -> usize {
        bucket((rapidity - self.rapidity_min) / self.rapidity_edge, self.rapidity_tiles)
    }

    fn phi_index(&self, phi: f64) -> usize {
        bucket(phi / self.phi_edge, self.phi_tiles)
    }

    #[expect(
        clippy::arithmetic_side_effects,
        reason = "indexes are below the tile counts whose product was checked at construction"
    )]
    fn tile_index(&self, rapidity_index: usize, phi_index: usize) -> usize {
        rapidity_index * self.phi_tiles + phi_index
    }

    fn tile_of(&self, rapidity: f64, phi: f64) -> usize {
        self.tile_index(self.rapidity_index(rapidity), self.phi_index(phi))
    }

    #[expect(
        clippy::indexing_slicing,
        reason = "tile_of always yields an index below the tile count"
    )]
    fn insert(&mut self, jet: usize, rapidity: f64, phi: f64) {
        let tile = self.tile_of(rapidity, phi);
        self.tiles[tile].push(jet);
    }

    #[expect(
        clippy::indexing_slicing,
        reason = "tile_of always yields an index below the tile count"
    )]
    fn remove(&mut self, jet: usize, rapidity: f64, phi: f64) {
        let index = self.tile_of(rapidity, phi);
        let tile = &mut self.tiles[index];

        if let Some(position) = tile.iter().position(|&member| member == jet) {
            tile.swap_remove(position);
        }
    }

    fn candidates_around(&self, points: &[(f64, f64)], out: &mut Vec<usize>) {
        let mut visited = Vec::with_capacity(points.len().saturating_mul(9));

        for &(rapidity, phi) in points {
            let center_rapidity = self.rapidity_index(rapidity);
            let center_phi = self.phi_index(phi);

            for rapidity_index in neighbours_clamped(center_rapidity, self.rapidity_tiles) {
                for phi_index in neighbours_wrapped(center_phi, self.phi_tiles) {
                    let tile = self.tile_index(rapidity_index, phi_index);
                    if !visited.contains(&tile) {
                        visited.push(tile);
                    }
                }
            }
        }

        for tile in visited {
            if let Some(members) = self.tiles.get(tile) {
                out.extend_from_slice(members);
            }
        }
    }
}

fn tile_count(span: f64, edge: f64) -> usize {
    let count = (span / edge).floor();

    if count.is_finite() && count >= 1.0 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "count is a positive whole number bounded by the clamped span over the edge"
        )]
        let count = count as usize;
        count
    } else {
        1
    }
}

fn bucket(position: f64, count: usize) -> usize {
    let last = count.saturating_sub(1);

    if position.is_nan() || position <= 0.0 {
        return 0;
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "position is positive and the result is clamped to the tile count"
    )]
    let index = position.floor() as usize;

    index.min(last)
}

fn neighbours_clamped(center: usize, count: usize) -> impl Iterator<Item = usize> {
    let first = center.saturating_sub(1);
    let last = center.saturating_add(1).min(count.saturating_sub(1));
    first..=last
}

fn neighbours_wrapped(center: usize, count: usize) -> impl Iterator<Item = usize> {
    let offsets: &[usize] = if count >= 3 { &[0, 1, 2] } else { &[1] };

    offsets.iter().map(move |&offset| {
        // center + count - 1 + offset walks center-1, center, center+1 modulo count.
        #[expect(
            clippy::arithmetic_side_effects,
            reason = "count is non-zero and the sum stays far below usize::MAX"
        )]
        let index = (center + count + offset - 1) % count;
        index
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sorted(mut values: Vec<usize>) -> Vec<usize> {
        values.sort_unstable();
        values
    }

    #[test]
    fn plain_returns_every_member() {
        let mut neighbourhood = Neighbourhood::Plain(PlainSet::default());
        for jet in 0..5 {
            neighbourhood.insert(jet, 0.0, 0.0);
        }
        neighbourhood.remove(2, 0.0, 0.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(0.0, 0.0)], &mut out);

        assert_eq!(sorted(out), vec![0, 1, 3, 4]);
    }

    #[test]
    fn tiled_finds_neighbours_across_phi_wrap() {
        let mut neighbourhood = Neighbourhood::Tiled(TileGrid::new(0.4, [-3.0, 3.0]));

        neighbourhood.insert(0, 0.0, 0.05);
        neighbourhood.insert(1, 0.0, TAU - 0.05);
        neighbourhood.insert(2, 0.0, 3.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(0.0, 0.05)], &mut out);

        let out = sorted(out);
        assert!(out.contains(&0));
        assert!(out.contains(&1));
        assert!(!out.contains(&2));
    }

    #[test]
    fn tiled_excludes_distant_rapidity() {
        let mut neighbourhood = Neighbourhood::Tiled(TileGrid::new(0.4, [-3.0, 3.0]));

        neighbourhood.insert(0, -2.9, 1.0);
        neighbourhood.insert(1, 2.9, 1.0);
        neighbourhood.insert(2, 50.0, 1.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(2.95, 1.0)], &mut out);

        assert_eq!(sorted(out), vec![1, 2]);
    }

    #[test]
    fn tiled_union_has_no_duplicates() {
        let mut neighbourhood = Neighbourhood::Tiled(TileGrid::new(0.4, [-3.0, 3.0]));
        neighbourhood.insert(7, 0.0, 1.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(0.0, 1.0), (0.1, 1.1)], &mut out);

        assert_eq!(out, vec![7]);
    }

    #[test]
    fn large_radius_collapses_phi_tiles() {
        let grid = TileGrid::new(2.5, [0.0]);
        assert_eq!(grid.phi_tiles, 1);
        assert_eq!(grid.rapidity_tiles, 1);
    }

    #[test]
    fn tiny_radius_keeps_grid_small() {
        let grid = TileGrid::new(1.0e-300, [-50.0, 50.0]);

        assert!(grid.rapidity_tiles <= 200);
        assert!(grid.phi_tiles <= 63);
        assert_eq!(grid.tiles.len(), grid.rapidity_tiles * grid.phi_tiles);
    }

    #[test]
    fn small_radius_still_finds_close_neighbours() {
        let mut neighbourhood = Neighbourhood::Tiled(TileGrid::new(1.0e-3, [-1.0, 1.0]));
        neighbourhood.insert(0, 0.0, 1.0);
        neighbourhood.insert(1, 0.0005, 1.0005);
        neighbourhood.insert(2, 0.9, 4.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(0.0, 1.0)], &mut out);

        assert_eq!(sorted(out), vec![0, 1]);
    }

    #[test]
    fn tiled_removal() {
        let mut neighbourhood = Neighbourhood::Tiled(TileGrid::new(0.4, [-1.0, 1.0]));
        neighbourhood.insert(0, 0.5, 2.0);
        neighbourhood.insert(1, 0.5, 2.0);
        neighbourhood.remove(0, 0.5, 2.0);

        let mut out = Vec::new();
        neighbourhood.candidates_around(&[(0.5, 2.0)], &mut out);

        assert_eq!(out, vec![1]);
    }
}
