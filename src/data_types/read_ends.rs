/*!
# Read ends
The per-read summary used by duplicate marking, with its orientation, scoring strategy and duplicate key.
Two ends with equal [`DuplicateKey`]s are duplicates of each other.
*/

use derive_builder::Builder;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::hash::{Hash, Hasher};

use crate::data_types::physical_location::{PhysicalLocation, ReadLocation, UNSET_LOCATION};
use crate::parsing::read_name_parser::ParsedReadName;

/// Strand orientation of a fragment or pair, ordered by the numeric codes used for sorting
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, strum_macros::Display)]
pub enum ReadOrientation {
    /// Fragment on the forward strand
    #[default]
    F = 0,
    /// Fragment on the reverse strand
    R = 1,
    FF = 2,
    FR = 3,
    RR = 4,
    RF = 5
}

impl ReadOrientation {
    /// Orientation of a single read
    pub fn fragment(negative_strand: bool) -> Self {
        if negative_strand { ReadOrientation::R } else { ReadOrientation::F }
    }

    /// Orientation of a pair given the strands of its two ends, in order
    pub fn pair(read1_negative_strand: bool, read2_negative_strand: bool) -> Self {
        match (read1_negative_strand, read2_negative_strand) {
            (false, false) => ReadOrientation::FF,
            (false, true) => ReadOrientation::FR,
            (true, true) => ReadOrientation::RR,
            (true, false) => ReadOrientation::RF
        }
    }

    /// True for the four pair orientations
    pub fn is_pair(&self) -> bool {
        !matches!(self, ReadOrientation::F | ReadOrientation::R)
    }

    /// The fragment orientation of the first end of a pair orientation
    pub fn first_end(&self) -> Self {
        match self {
            ReadOrientation::F | ReadOrientation::FF | ReadOrientation::FR => ReadOrientation::F,
            ReadOrientation::R | ReadOrientation::RR | ReadOrientation::RF => ReadOrientation::R
        }
    }
}

/// How the best read end of a duplicate set is chosen, higher scores win
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, strum_macros::Display, strum_macros::EnumString, clap::ValueEnum)]
pub enum ScoringStrategy {
    /// Aligned reference bases of the read and its mate
    #[default]
    #[strum(ascii_case_insensitive, serialize = "total-mapped-reference-length")]
    TotalMappedReferenceLength,
    /// Sum of base qualities of at least 15
    #[strum(ascii_case_insensitive, serialize = "sum-of-base-qualities")]
    SumOfBaseQualities,
    /// A stable pseudo-random value derived from the read name
    #[strum(ascii_case_insensitive, serialize = "random")]
    Random
}

impl ScoringStrategy {
    /// Computes the score of a read end
    /// # Arguments
    /// * `read_name` - used by the random strategy only
    /// * `mapped_reference_length` - reference bases covered by the read and its mate
    /// * `sum_of_base_qualities` - sum of the qualities counted for the read and its mate
    pub fn score(&self, read_name: &str, mapped_reference_length: u64, sum_of_base_qualities: u64) -> i64 {
        match self {
            ScoringStrategy::TotalMappedReferenceLength => mapped_reference_length as i64,
            ScoringStrategy::SumOfBaseQualities => sum_of_base_qualities as i64,
            ScoringStrategy::Random => {
                let mut hasher = FxHasher::default();
                read_name.hash(&mut hasher);
                (hasher.finish() >> 1) as i64
            }
        }
    }
}

/// Sort key of the mark queue, read ends with equal keys are duplicates of each other.
/// Pair orientations sort before fragment orientations at the same coordinate.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DuplicateKey {
    pub library_id: i16,
    pub read1_reference_index: i32,
    pub read1_coordinate: i32,
    pub orientation: Reverse<ReadOrientation>,
    pub read2_reference_index: i32,
    pub read2_coordinate: i32
}

/// Alignment summary of one read, with the 5' positions of itself and its mate
#[derive(Builder, Clone, Debug, Serialize)]
#[builder(default)]
pub struct ReadEnd {
    /// Read name, shared by both ends of a pair
    #[builder(setter(into))]
    read_name: String,
    /// Position of the record in the input, used to report the duplicate flag
    record_index: u64,
    library_id: i16,
    read1_reference_index: i32,
    read1_coordinate: i32,
    orientation: ReadOrientation,
    /// -1 unless the read is paired with a mapped mate
    read2_reference_index: i32,
    read2_coordinate: i32,
    /// True if this is the first read of its pair
    first_of_pair: bool,
    /// True if this read or its mate is unmapped
    has_unmapped: bool,
    /// Score from the configured [`ScoringStrategy`]
    score: i64,
    /// Pair orientation used to split optical duplicate sets
    orientation_for_optical_duplicates: ReadOrientation,
    read_group: i16,
    tile: i16,
    x: i32,
    y: i32
}

impl Default for ReadEnd {
    fn default() -> Self {
        Self {
            read_name: String::new(),
            record_index: 0,
            library_id: 0,
            read1_reference_index: -1,
            read1_coordinate: -1,
            orientation: ReadOrientation::F,
            read2_reference_index: -1,
            read2_coordinate: -1,
            first_of_pair: false,
            has_unmapped: false,
            score: 0,
            orientation_for_optical_duplicates: ReadOrientation::F,
            read_group: UNSET_LOCATION as i16,
            tile: UNSET_LOCATION as i16,
            x: UNSET_LOCATION,
            y: UNSET_LOCATION
        }
    }
}

impl ReadEnd {
    /// Paired means the mate coordinates are set
    pub fn is_paired(&self) -> bool {
        self.read2_reference_index != -1
    }

    /// Only pairs with both ends mapped take part in optical duplicate detection
    pub fn should_be_in_locations(&self) -> bool {
        self.is_paired() && !self.has_unmapped
    }

    /// The queue key of this end
    pub fn key(&self) -> DuplicateKey {
        DuplicateKey {
            library_id: self.library_id,
            read1_reference_index: self.read1_reference_index,
            read1_coordinate: self.read1_coordinate,
            orientation: Reverse(self.orientation),
            read2_reference_index: self.read2_reference_index,
            read2_coordinate: self.read2_coordinate
        }
    }

    /// Key of the fragment end that this pair's first end would collide with
    pub fn fragment_key(&self) -> DuplicateKey {
        DuplicateKey {
            library_id: self.library_id,
            read1_reference_index: self.read1_reference_index,
            read1_coordinate: self.read1_coordinate,
            orientation: Reverse(self.orientation.first_end()),
            read2_reference_index: -1,
            read2_coordinate: -1
        }
    }

    /// Orders two read ends best first.
    /// Ties on key are broken by pairing, unmapped mates, score (descending), read name, and finally first of pair.
    pub fn compare_best(&self, other: &ReadEnd) -> Ordering {
        self.key().cmp(&other.key())
            .then_with(|| other.is_paired().cmp(&self.is_paired()))
            .then_with(|| self.has_unmapped.cmp(&other.has_unmapped))
            .then_with(|| other.score.cmp(&self.score))
            .then_with(|| self.read_name.cmp(&other.read_name))
            .then_with(|| {
                if self.is_paired() && other.is_paired() {
                    if self.first_of_pair { Ordering::Less } else { Ordering::Greater }
                } else {
                    Ordering::Equal
                }
            })
    }

    /// Sets the flowcell location from a parsed read name
    pub fn set_location(&mut self, read_group: i16, parsed: ParsedReadName) {
        self.read_group = read_group;
        self.tile = parsed.tile;
        self.x = parsed.x;
        self.y = parsed.y;
    }

    /// The flowcell location as a standalone value
    pub fn location(&self) -> ReadLocation {
        ReadLocation::new(self.read_group, self.tile, self.x, self.y)
    }

    // getters
    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    pub fn record_index(&self) -> u64 {
        self.record_index
    }

    pub fn library_id(&self) -> i16 {
        self.library_id
    }

    pub fn read1_reference_index(&self) -> i32 {
        self.read1_reference_index
    }

    pub fn read1_coordinate(&self) -> i32 {
        self.read1_coordinate
    }

    pub fn orientation(&self) -> ReadOrientation {
        self.orientation
    }

    pub fn read2_reference_index(&self) -> i32 {
        self.read2_reference_index
    }

    pub fn read2_coordinate(&self) -> i32 {
        self.read2_coordinate
    }

    pub fn first_of_pair(&self) -> bool {
        self.first_of_pair
    }

    pub fn has_unmapped(&self) -> bool {
        self.has_unmapped
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn orientation_for_optical_duplicates(&self) -> ReadOrientation {
        self.orientation_for_optical_duplicates
    }
}

impl PhysicalLocation for ReadEnd {
    fn read_group(&self) -> i16 {
        self.read_group
    }

    fn tile(&self) -> i16 {
        self.tile
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_end(name: &str, coordinate: i32, score: i64) -> ReadEnd {
        ReadEndBuilder::default()
            .read_name(name)
            .read1_reference_index(0)
            .read1_coordinate(coordinate)
            .orientation(ReadOrientation::FR)
            .read2_reference_index(0)
            .read2_coordinate(coordinate + 300)
            .first_of_pair(true)
            .score(score)
            .build().unwrap()
    }

    #[test]
    fn test_orientation() {
        assert_eq!(ReadOrientation::pair(false, true), ReadOrientation::FR);
        assert_eq!(ReadOrientation::pair(true, false), ReadOrientation::RF);
        assert_eq!(ReadOrientation::fragment(true), ReadOrientation::R);
        assert!(ReadOrientation::RR.is_pair());
        assert!(!ReadOrientation::F.is_pair());
        assert_eq!(ReadOrientation::FR.first_end(), ReadOrientation::F);
        assert_eq!(ReadOrientation::RF.first_end(), ReadOrientation::R);
        assert_eq!(ReadOrientation::FF.to_string(), "FF");
    }

    #[test]
    fn test_key_order() {
        let pair = pair_end("a", 100, 10);
        let fragment = ReadEndBuilder::default()
            .read_name("b")
            .read1_reference_index(0)
            .read1_coordinate(100)
            .orientation(ReadOrientation::F)
            .build().unwrap();
        // pairs come first at the same coordinate
        assert!(pair.key() < fragment.key());
        assert_eq!(pair.fragment_key(), fragment.key());
        assert!(pair.key() < pair_end("c", 101, 10).key());
        assert!(pair.is_paired());
        assert!(!fragment.is_paired());
        assert!(pair.should_be_in_locations());
    }

    #[test]
    fn test_compare_best() {
        let high = pair_end("b", 100, 50);
        let low = pair_end("a", 100, 10);
        assert_eq!(high.compare_best(&low), Ordering::Less);
        assert_eq!(low.compare_best(&high), Ordering::Greater);

        // ties go to the smaller read name
        let tied = pair_end("c", 100, 50);
        assert_eq!(high.compare_best(&tied), Ordering::Less);

        // same pair, first of pair wins
        let mut second = high.clone();
        second.first_of_pair = false;
        assert_eq!(high.compare_best(&second), Ordering::Less);
        assert_eq!(second.compare_best(&high), Ordering::Greater);
    }

    #[test]
    fn test_scoring() {
        assert_eq!(ScoringStrategy::TotalMappedReferenceLength.score("r", 300, 20), 300);
        assert_eq!(ScoringStrategy::SumOfBaseQualities.score("r", 300, 20), 20);
        let random = ScoringStrategy::Random.score("read1", 0, 0);
        assert!(random >= 0);
        assert_eq!(random, ScoringStrategy::Random.score("read1", 5, 5));
        assert_eq!("random".parse::<ScoringStrategy>().unwrap(), ScoringStrategy::Random);
    }

    #[test]
    fn test_location() {
        let mut end = pair_end("a", 1, 1);
        assert!(!end.has_location());
        end.set_location(2, ParsedReadName { tile: 1101, x: 5, y: 6 });
        assert!(end.has_location());
        assert_eq!(end.location(), ReadLocation::new(2, 1101, 5, 6));
    }
}
