/*!
# Mark queue
Marks duplicates in a coordinate sorted stream of read ends.

Read ends with the same [`DuplicateKey`] are duplicates of each other.
Only the best end of each key is kept in the queue; every other end is marked as a duplicate as soon as it arrives.
When both ends of the best pair land on the same key, the second one is parked in a pair set and released with it.
Once the stream has moved more than `min_distance` past a key, the key is closed by [`MarkQueue::poll`],
which also runs optical duplicate detection over the flowcell locations collected for that key.

## Example usage
```rust
use lodestar::data_types::read_ends::{ReadEndBuilder, ReadOrientation};
use lodestar::mark_queue::MarkQueue;
use lodestar::optical_duplicate_finder::OpticalDuplicateFinder;

let mut queue = MarkQueue::new(100, OpticalDuplicateFinder::default());
for (index, (name, score)) in [("a", 10), ("b", 30)].into_iter().enumerate() {
    let end = ReadEndBuilder::default()
        .read_name(name)
        .record_index(index as u64)
        .read1_reference_index(0)
        .read1_coordinate(500)
        .orientation(ReadOrientation::F)
        .score(score)
        .build().unwrap();
    queue.poll_ready(0, 500);
    queue.add(end);
}
let kept = queue.flush();
assert_eq!(kept.len(), 1);
assert_eq!(kept[0].read_name(), "b");
assert_eq!(queue.result_state(0), Some(true));
assert_eq!(queue.result_state(1), Some(false));
```
*/

use indexmap::IndexMap;
use log::{debug, trace};
use rustc_hash::FxHashMap as HashMap;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::data_types::duplication_metrics::DuplicationMetrics;
use crate::data_types::physical_location::ReadLocation;
use crate::data_types::read_ends::{DuplicateKey, ReadEnd, ReadOrientation};
use crate::optical_duplicate_finder::OpticalDuplicateFinder;

/// Flowcell locations of the eligible ends of one key, in arrival order
type LocationSet = IndexMap<ReadLocation, ReadOrientation>;

/// Coordinate ordered working set of the best read end per duplicate key
#[derive(Debug)]
pub struct MarkQueue {
    /// Best end per key
    set: BTreeMap<DuplicateKey, ReadEnd>,
    /// The other end of the best pair, when it shares the key
    pair_set: BTreeMap<DuplicateKey, ReadEnd>,
    /// Locations collected for optical duplicate detection
    location_sets: HashMap<DuplicateKey, LocationSet>,
    /// Decided duplicate flag per record index
    result_states: HashMap<u64, bool>,
    /// Raw counters per library
    metrics: BTreeMap<i16, DuplicationMetrics>,
    optical_duplicate_finder: OpticalDuplicateFinder,
    /// Keys further than this behind the stream position are closed
    min_distance: i32,
    num_duplicates: u64
}

impl MarkQueue {
    /// Constructor
    /// # Arguments
    /// * `min_distance` - how far the stream must move past a key before it can be closed, usually derived from the read length
    /// * `optical_duplicate_finder` - used when a key is closed
    pub fn new(min_distance: i32, optical_duplicate_finder: OpticalDuplicateFinder) -> Self {
        Self {
            set: Default::default(),
            pair_set: Default::default(),
            location_sets: Default::default(),
            result_states: Default::default(),
            metrics: Default::default(),
            optical_duplicate_finder,
            min_distance,
            num_duplicates: 0
        }
    }

    /// Adds a read end, marking whichever end loses against the current best of its key
    pub fn add(&mut self, other: ReadEnd) {
        self.count_examined(&other);

        let key = other.key();
        let location = other.should_be_in_locations()
            .then(|| (other.location(), other.orientation_for_optical_duplicates()));
        let mut add_to_location_set = true;

        let duplicate = match self.set.remove(&key) {
            Some(current) if current.read_name() == other.read_name() => {
                // both ends of one pair share the key, the other end waits in the pair set
                add_to_location_set = false;
                let (best, pair) = if current.compare_best(&other) == Ordering::Greater {
                    (other, current)
                } else {
                    (current, other)
                };
                self.set.insert(key, best);
                self.pair_set.insert(key, pair);
                None
            },
            Some(current) => {
                if current.compare_best(&other) == Ordering::Greater {
                    if let Some(pair) = self.pair_set.remove(&key) {
                        self.mark_duplicate(&pair);
                    }
                    self.set.insert(key, other);
                    Some(current)
                } else {
                    self.set.insert(key, current);
                    Some(other)
                }
            },
            None => {
                self.set.insert(key, other);
                None
            }
        };

        if let (Some((read_location, orientation)), true) = (location, add_to_location_set) {
            self.location_sets.entry(key).or_default()
                .entry(read_location)
                .or_insert(orientation);
        }

        if let Some(duplicate) = duplicate {
            trace!("Marking {} as duplicate", duplicate.read_name());
            self.mark_duplicate(&duplicate);
        }
    }

    /// Closes the first key in the queue, returning its best end.
    /// The parked pair end is released, a colliding fragment is marked as a duplicate,
    /// and optical duplicates are counted for the key.
    pub fn poll(&mut self) -> Option<ReadEnd> {
        let (key, current) = self.set.pop_first()?;

        if let Some(pair) = self.pair_set.remove(&key) {
            self.result_states.insert(pair.record_index(), false);
        }

        if current.is_paired() {
            if let Some(fragment) = self.set.remove(&current.fragment_key()) {
                self.mark_duplicate(&fragment);
            }
        }

        // only the first of pair end counts optical duplicates, the mate key holds the same molecules
        if let Some(locations) = self.location_sets.remove(&key) {
            if current.should_be_in_locations() && current.first_of_pair() && locations.len() > 1 {
                self.track_optical_duplicates(current.library_id(), &locations);
            }
        }

        self.result_states.insert(current.record_index(), false);
        Some(current)
    }

    /// The first key's best end, without closing it
    pub fn peek(&self) -> Option<&ReadEnd> {
        self.set.first_key_value().map(|(_key, end)| end)
    }

    /// Closes every key that the stream has moved past.
    /// # Arguments
    /// * `reference_index` - reference of the next read end in the stream
    /// * `coordinate` - coordinate of the next read end in the stream
    pub fn poll_ready(&mut self, reference_index: i32, coordinate: i32) -> Vec<ReadEnd> {
        let mut ret = vec![];
        while let Some(next) = self.peek() {
            let in_window = next.read1_reference_index() == reference_index &&
                coordinate - next.read1_coordinate() <= self.min_distance;
            if in_window {
                break;
            }
            match self.poll() {
                Some(end) => ret.push(end),
                None => break
            };
        }
        ret
    }

    /// Closes all remaining keys, for the end of the stream
    pub fn flush(&mut self) -> Vec<ReadEnd> {
        let mut ret = Vec::with_capacity(self.set.len());
        while let Some(end) = self.poll() {
            ret.push(end);
        }
        debug!("Flushed {} read ends, {} duplicates marked in total", ret.len(), self.num_duplicates);
        ret
    }

    /// Duplicate flag decided for a record, None if nothing was decided yet
    pub fn result_state(&self, record_index: u64) -> Option<bool> {
        self.result_states.get(&record_index).copied()
    }

    /// Finalized metrics per library, ordered by library
    pub fn metrics(&self) -> Vec<DuplicationMetrics> {
        self.metrics.values()
            .map(|m| m.finalized())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    // getters
    pub fn num_duplicates(&self) -> u64 {
        self.num_duplicates
    }

    pub fn result_states(&self) -> &HashMap<u64, bool> {
        &self.result_states
    }

    fn library_metrics(&mut self, library_id: i16) -> &mut DuplicationMetrics {
        self.metrics.entry(library_id)
            .or_insert_with(|| DuplicationMetrics::new(library_id))
    }

    fn count_examined(&mut self, end: &ReadEnd) {
        let is_unpaired = !end.is_paired() || end.has_unmapped();
        let metrics = self.library_metrics(end.library_id());
        if is_unpaired {
            metrics.unpaired_reads_examined += 1;
        } else {
            // halved when finalized
            metrics.read_pairs_examined += 1;
        }
    }

    fn mark_duplicate(&mut self, duplicate: &ReadEnd) {
        self.result_states.insert(duplicate.record_index(), true);
        let is_unpaired = !duplicate.is_paired() || duplicate.has_unmapped();
        let metrics = self.library_metrics(duplicate.library_id());
        if is_unpaired {
            metrics.unpaired_read_duplicates += 1;
        } else {
            metrics.read_pair_duplicates += 1;
        }
        self.num_duplicates += 1;
    }

    /// Counts optical duplicates in a closed key.
    /// When both FR and RF pairs are present they are examined separately and ends with any other orientation are skipped.
    fn track_optical_duplicates(&mut self, library_id: i16, locations: &LocationSet) {
        let has_fr = locations.values().any(|&o| o == ReadOrientation::FR);
        let has_rf = locations.values().any(|&o| o == ReadOrientation::RF);

        let groups: Vec<Vec<ReadLocation>> = if has_fr && has_rf {
            let mut fr = vec![];
            let mut rf = vec![];
            for (&location, orientation) in locations.iter() {
                match orientation {
                    ReadOrientation::FR => fr.push(location),
                    ReadOrientation::RF => rf.push(location),
                    _ => {}
                };
            }
            vec![fr, rf]
        } else {
            vec![locations.keys().copied().collect()]
        };

        let optical_duplicates: u64 = groups.iter()
            .map(|group| {
                self.optical_duplicate_finder.find_optical_duplicates(group, None)
                    .into_iter()
                    .filter(|&is_optical| is_optical)
                    .count() as u64
            })
            .sum();

        if optical_duplicates > 0 {
            trace!("Found {optical_duplicates} optical duplicates in library {library_id}");
            self.library_metrics(library_id).read_pair_optical_duplicates += optical_duplicates;
        }
    }
}
