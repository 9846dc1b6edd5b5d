/*!
# Optical duplicate finder
Splits a set of content duplicates into optical duplicates and the rest.

Two reads are optical duplicates when they were imaged on the same tile of the same read group
within a small pixel distance of each other in both x and y.
Reads that are transitively close form one cluster, and every cluster keeps exactly one read unmarked.
If a keeper is given and has a location, it is always the unmarked read of its cluster.

## Example usage
```rust
use lodestar::data_types::physical_location::ReadLocation;
use lodestar::optical_duplicate_finder::{OpticalDuplicateConfigBuilder, OpticalDuplicateFinder};

let config = OpticalDuplicateConfigBuilder::default()
    .pixel_distance(10)
    .build().unwrap();
let finder = OpticalDuplicateFinder::new(config);
let reads = [
    ReadLocation::new(1, 5, 100, 100),
    ReadLocation::new(1, 5, 105, 100),
    ReadLocation::new(1, 5, 500, 500)
];
assert_eq!(finder.find_optical_duplicates(&reads, None), vec![false, true, false]);
```
*/

use derive_builder::Builder;
use log::{debug, info, warn};
use serde::Serialize;

use crate::data_types::physical_location::PhysicalLocation;
use crate::parsing::read_name_parser::{ParsedReadName, ReadNameParser};
use crate::util::union_find::UnionFind;
use rustc_hash::FxHashMap as HashMap;

/// Default maximum pixel distance in x and y for two reads to be optical duplicates
pub const DEFAULT_OPTICAL_DUPLICATE_PIXEL_DISTANCE: i32 = 100;
/// Sets at least this large are logged
pub const DEFAULT_BIG_DUPLICATE_SET_SIZE: usize = 1000;
/// Sets larger than this are not examined
pub const DEFAULT_MAX_DUPLICATE_SET_SIZE: usize = 300000;

/// Parameters for optical duplicate detection, distances are not validated
#[derive(Builder, Clone, Copy, Debug, Serialize)]
#[builder(default)]
pub struct OpticalDuplicateConfig {
    /// Maximum distance in pixels, applied to x and y separately
    pixel_distance: i32,
    /// Duplicate sets at least this large are reported in the log
    big_duplicate_set_size: usize,
    /// Duplicate sets larger than this are reported as having no optical duplicates
    max_duplicate_set_size: usize
}

impl Default for OpticalDuplicateConfig {
    fn default() -> Self {
        Self {
            pixel_distance: DEFAULT_OPTICAL_DUPLICATE_PIXEL_DISTANCE,
            big_duplicate_set_size: DEFAULT_BIG_DUPLICATE_SET_SIZE,
            max_duplicate_set_size: DEFAULT_MAX_DUPLICATE_SET_SIZE
        }
    }
}

impl OpticalDuplicateConfig {
    // getters
    pub fn pixel_distance(&self) -> i32 {
        self.pixel_distance
    }

    pub fn big_duplicate_set_size(&self) -> usize {
        self.big_duplicate_set_size
    }

    pub fn max_duplicate_set_size(&self) -> usize {
        self.max_duplicate_set_size
    }
}

/// Finds optical duplicates within sets of content duplicates
#[derive(Debug, Default)]
pub struct OpticalDuplicateFinder {
    config: OpticalDuplicateConfig,
    read_name_parser: ReadNameParser
}

impl OpticalDuplicateFinder {
    /// Constructor
    pub fn new(config: OpticalDuplicateConfig) -> Self {
        Self {
            config,
            read_name_parser: ReadNameParser::new()
        }
    }

    /// Parses the flowcell location out of a read name, see [`ReadNameParser::parse`]
    pub fn parse_read_name(&self, read_name: &str) -> Option<ParsedReadName> {
        self.read_name_parser.parse(read_name)
    }

    /// Flags the optical duplicates in a set of content duplicates.
    /// The returned flags line up with `locations`.
    /// # Arguments
    /// * `locations` - the reads of one duplicate set
    /// * `keeper` - optional index of the read that must stay unmarked; ignored if out of range or without a location
    pub fn find_optical_duplicates<L: PhysicalLocation>(&self, locations: &[L], keeper: Option<usize>) -> Vec<bool> {
        let length = locations.len();
        let mut flags = vec![false; length];
        if length < 2 {
            return flags;
        }
        if length > self.config.max_duplicate_set_size {
            warn!(
                "Skipping optical duplicate detection for a set of {length} reads, larger than the maximum of {}",
                self.config.max_duplicate_set_size
            );
            return flags;
        }

        let keeper = keeper.filter(|&k| k < length && locations[k].has_location());
        if length >= self.config.big_duplicate_set_size {
            info!("Large duplicate set of {length} reads, clustering optical duplicates...");
        }

        let min_graph_size = if keeper.is_some() { 4 } else { 3 };
        if length >= min_graph_size {
            self.flag_with_graph(locations, keeper, &mut flags);
        } else {
            self.flag_pairwise(locations, keeper, &mut flags);
        }
        flags
    }

    /// True if both reads are on the same tile of the same read group within the pixel distance
    fn close_enough<L: PhysicalLocation>(&self, lhs: &L, rhs: &L) -> bool {
        lhs.has_location() && rhs.has_location() &&
            lhs.read_group() == rhs.read_group() &&
            lhs.tile() == rhs.tile() &&
            within_distance(lhs.x(), rhs.x(), self.config.pixel_distance) &&
            within_distance(lhs.y(), rhs.y(), self.config.pixel_distance)
    }

    /// Direct pairwise comparison for small sets
    fn flag_pairwise<L: PhysicalLocation>(&self, locations: &[L], keeper: Option<usize>, flags: &mut [bool]) {
        let length = locations.len();
        if let Some(k) = keeper {
            for (i, flag) in flags.iter_mut().enumerate() {
                *flag = i != k && self.close_enough(&locations[k], &locations[i]);
            }
        }

        for i in 0..length {
            if Some(i) == keeper {
                continue;
            }
            for j in (i + 1)..length {
                if Some(j) == keeper || (flags[i] && flags[j]) {
                    continue;
                }
                if self.close_enough(&locations[i], &locations[j]) {
                    let index = if flags[j] { i } else { j };
                    flags[index] = true;
                }
            }
        }
    }

    /// Clusters the set with a union-find per read group and tile, then keeps one read per cluster.
    /// Without a keeper the read with the smallest (x, y) represents a cluster.
    fn flag_with_graph<L: PhysicalLocation>(&self, locations: &[L], keeper: Option<usize>, flags: &mut [bool]) {
        let mut buckets: HashMap<i32, Vec<usize>> = Default::default();
        for (i, loc) in locations.iter().enumerate() {
            if loc.has_location() {
                let key = ((loc.read_group() as i32) << 16) + loc.tile() as i32;
                buckets.entry(key).or_default().push(i);
            }
        }

        let mut clusters = UnionFind::new(locations.len());
        let distance = self.config.pixel_distance;
        for bucket in buckets.values_mut().filter(|b| b.len() > 1) {
            bucket.sort_by_key(|&i| locations[i].x());
            for (offset, &i) in bucket.iter().enumerate() {
                for &j in bucket[(offset + 1)..].iter() {
                    // sorted by x, nothing further along can be close
                    if !within_distance(locations[j].x(), locations[i].x(), distance) {
                        break;
                    }
                    if self.close_enough(&locations[i], &locations[j]) {
                        clusters.union(i, j);
                    }
                }
            }
        }

        let mut representatives: HashMap<usize, usize> = Default::default();
        let keeper_cluster = keeper.map(|k| {
            let cluster = clusters.find(k);
            representatives.insert(cluster, k);
            cluster
        });

        for index in 0..locations.len() {
            let cluster = clusters.find(index);
            match representatives.get(&cluster).copied() {
                Some(rep) if Some(index) != keeper => {
                    let current = &locations[index];
                    let rep_loc = &locations[rep];
                    let is_smaller = (current.x(), current.y()) < (rep_loc.x(), rep_loc.y());
                    if Some(cluster) != keeper_cluster && is_smaller {
                        flags[rep] = true;
                        representatives.insert(cluster, index);
                    } else {
                        flags[index] = true;
                    }
                },
                _ => {
                    representatives.insert(cluster, index);
                }
            };
        }

        if locations.len() >= self.config.big_duplicate_set_size {
            debug!(
                "Large duplicate set of {} reads has {} optical duplicates",
                locations.len(), flags.iter().filter(|&&f| f).count()
            );
        }
    }

    // getters
    pub fn config(&self) -> &OpticalDuplicateConfig {
        &self.config
    }
}

/// True if two pixel coordinates are at most `distance` apart, without overflowing at the i32 extremes
fn within_distance(a: i32, b: i32, distance: i32) -> bool {
    i64::from(a.abs_diff(b)) <= i64::from(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::physical_location::ReadLocation;

    fn loc(tile: i16, x: i32, y: i32) -> ReadLocation {
        ReadLocation::new(1, tile, x, y)
    }

    fn finder(pixel_distance: i32) -> OpticalDuplicateFinder {
        OpticalDuplicateFinder::new(
            OpticalDuplicateConfigBuilder::default()
                .pixel_distance(pixel_distance)
                .build().unwrap()
        )
    }

    fn standard_set() -> Vec<ReadLocation> {
        vec![
            loc(7, 1500, 1500),
            loc(7, 1501, 1501),
            loc(5, 1500, 1500),
            loc(7, 1490, 1502),
            loc(7, 2500, 2500),
            loc(7, 10, 10)
        ]
    }

    #[test]
    fn test_small_sets() {
        let finder = finder(100);
        let empty: Vec<ReadLocation> = vec![];
        assert!(finder.find_optical_duplicates(&empty, None).is_empty());
        assert_eq!(finder.find_optical_duplicates(&[loc(1, 1, 1)], None), vec![false]);
        assert_eq!(finder.find_optical_duplicates(&[loc(1, 1, 1)], Some(0)), vec![false]);
        assert_eq!(finder.find_optical_duplicates(&[loc(1, 1, 1), loc(1, 2, 2)], None), vec![false, true]);
        assert_eq!(finder.find_optical_duplicates(&[loc(1, 1, 1), loc(1, 2, 2)], Some(1)), vec![true, false]);
    }

    #[test]
    fn test_keepers() {
        let finder = finder(100);
        let reads = standard_set();
        assert_eq!(finder.find_optical_duplicates(&reads, None), vec![true, true, false, false, false, false]);
        assert_eq!(finder.find_optical_duplicates(&reads, Some(0)), vec![false, true, false, true, false, false]);
        assert_eq!(finder.find_optical_duplicates(&reads, Some(1)), vec![true, false, false, true, false, false]);
        assert_eq!(finder.find_optical_duplicates(&reads, Some(3)), vec![true, true, false, false, false, false]);
        // an out of range keeper is ignored
        assert_eq!(finder.find_optical_duplicates(&reads, Some(10)), vec![true, true, false, false, false, false]);
    }

    #[test]
    fn test_keeper_without_location() {
        let finder = finder(100);
        let mut reads = standard_set();
        reads[0] = ReadLocation::default();
        // read 0 is ignored as keeper and cannot be clustered
        assert_eq!(finder.find_optical_duplicates(&reads, Some(0)), vec![false, true, false, false, false, false]);
    }

    #[test]
    fn test_chain_with_keeper() {
        let finder = finder(15);
        let reads = [loc(1, 10, 0), loc(1, 20, 0), loc(1, 30, 0)];
        assert_eq!(finder.find_optical_duplicates(&reads, Some(2)), vec![true, true, false]);
    }

    #[test]
    fn test_isolated_read() {
        let finder = finder(10);
        let reads = [loc(5, 100, 100), loc(5, 105, 100), loc(5, 500, 500)];
        let flags = finder.find_optical_duplicates(&reads, None);
        assert_eq!(flags.iter().take(2).filter(|&&f| f).count(), 1);
        assert!(!flags[2]);
    }

    #[test]
    fn test_single_survivor_per_cluster() {
        let finder = finder(100);
        for n in 2..20 {
            let reads: Vec<ReadLocation> = (0..n).map(|i| loc(3, 1000 + 5 * i, 2000 - 3 * i)).collect();
            let marked = finder.find_optical_duplicates(&reads, None).iter().filter(|&&f| f).count();
            assert_eq!(marked, n as usize - 1);

            let keeper = (n as usize) / 2;
            let flags = finder.find_optical_duplicates(&reads, Some(keeper));
            assert!(!flags[keeper]);
            assert_eq!(flags.iter().filter(|&&f| f).count(), n as usize - 1);
        }
    }

    #[test]
    fn test_read_groups_and_tiles_separate() {
        let finder = finder(100);
        let reads = [
            ReadLocation::new(1, 1, 100, 100),
            ReadLocation::new(2, 1, 100, 100),
            ReadLocation::new(1, 2, 100, 100),
            ReadLocation::new(1, 1, 150, 150)
        ];
        assert_eq!(finder.find_optical_duplicates(&reads, None), vec![false, false, false, true]);
    }

    #[test]
    fn test_max_set_size() {
        let finder = OpticalDuplicateFinder::new(
            OpticalDuplicateConfigBuilder::default()
                .max_duplicate_set_size(1)
                .build().unwrap()
        );
        let reads = standard_set();
        assert!(finder.find_optical_duplicates(&reads, None).iter().all(|&f| !f));
    }

    #[test]
    fn test_parse_read_name() {
        let finder = OpticalDuplicateFinder::default();
        let parsed = finder.parse_read_name("M1:8:FC:1:1101:15589:1331").unwrap();
        assert_eq!((parsed.tile, parsed.x, parsed.y), (1101, 15589, 1331));
        assert_eq!(finder.config().pixel_distance(), DEFAULT_OPTICAL_DUPLICATE_PIXEL_DISTANCE);
    }

    #[test]
    fn test_extreme_coordinates() {
        let finder = finder(100);
        let far_apart = [loc(1, i32::MIN, 0), loc(1, i32::MAX, 0)];
        assert_eq!(finder.find_optical_duplicates(&far_apart, None), vec![false, false]);
        let graph = [loc(1, i32::MIN, i32::MAX), loc(1, i32::MAX, i32::MIN), loc(1, i32::MAX - 50, i32::MIN + 50)];
        // the smaller x of a cluster stays unmarked
        assert_eq!(finder.find_optical_duplicates(&graph, None), vec![false, true, false]);
        assert!(within_distance(i32::MAX, i32::MAX - 100, 100));
        assert!(!within_distance(i32::MIN, i32::MAX, i32::MAX));
        assert!(!within_distance(5, 5, -1));
    }
}
