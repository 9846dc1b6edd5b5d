/*!
# Haplotype map
Loads and writes the fingerprinting panel: the haplotype blocks, their SNPs, and the sequence order from the header.

The file is tab-delimited with SAM-style `@` header lines followed by rows of
`CHROMOSOME POSITION NAME MAJOR_ALLELE MINOR_ALLELE MAF [ANCHOR_SNP] [PANELS]`.
A row with no anchor, or anchored to itself, starts a new block; any other row joins the block of its anchor.

Panels can also be stored as a single-sample VCF, see [`HaplotypeMap::from_vcf`] and [`HaplotypeMap::write_vcf`].
Each record carries the MAF in `AF`, and SNPs of one block share a `PS` phase set on a phased heterozygous GT.

## Example usage
```rust
use lodestar::parsing::haplotype_map::HaplotypeMap;

let panel = "@HD\tVN:1.5\n\
@SQ\tSN:chr1\tLN:1000\n\
#CHROMOSOME\tPOSITION\tNAME\tMAJOR_ALLELE\tMINOR_ALLELE\tMAF\tANCHOR_SNP\tPANELS\n\
chr1\t100\trs1\tA\tG\t0.3\t\t\n\
chr1\t150\trs2\tC\tT\t0.3\trs1\t\n\
chr1\t500\trs3\tG\tT\t0.1\n";
let map = HaplotypeMap::from_reader(panel.as_bytes()).unwrap();
assert_eq!(map.haplotypes().len(), 2);
assert_eq!(map.haplotype_for_snp("rs2").unwrap().first_snp().unwrap().name(), "rs1");
assert_eq!(map.snp_at("chr1", 500).unwrap().name(), "rs3");
```
*/

use anyhow::{Context, anyhow, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, info};
use noodles::core::Position;
use noodles::vcf;
use noodles::vcf::header::record::value::{Map, map};
use noodles::vcf::variant::io::Write as _;
use noodles::vcf::variant::record::info::field::key as info_key;
use noodles::vcf::variant::record::samples::keys::key as vcf_key;
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record_buf;
use noodles::vcf::variant::record_buf::info::field::Value as InfoValue;
use noodles::vcf::variant::record_buf::info::field::value::Array as InfoArray;
use noodles::vcf::variant::record_buf::samples::sample::Value;
use noodles_util::variant::io::reader::Builder as VcfBuilder;
use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::data_types::haplotype_block::HaplotypeBlock;
use crate::data_types::snp::Snp;

/// Column header line written before the rows
pub const HAPLOTYPE_MAP_COLUMNS: &str = "#CHROMOSOME\tPOSITION\tNAME\tMAJOR_ALLELE\tMINOR_ALLELE\tMAF\tANCHOR_SNP\tPANELS";
/// Name of the single sample in a VCF panel
pub const HET_GENOTYPE_FOR_PHASING: &str = "HetGenotypeForPhasing";

/// The fingerprinting panel.
/// Blocks are the single source of truth; the lookup indices are only ever extended through [`HaplotypeMap::add_haplotype`].
#[derive(Clone, Debug, Default)]
pub struct HaplotypeMap {
    /// Raw `@` header lines, without the trailing newline
    header_lines: Vec<String>,
    /// Sequence names in dictionary order
    sequence_names: IndexSet<String>,
    /// All haplotype blocks in insertion order
    haplotype_blocks: Vec<Arc<HaplotypeBlock>>,
    /// SNP name to index in `haplotype_blocks`
    block_by_snp_name: HashMap<String, usize>,
    /// (chromosome, position) to SNP name
    snp_name_by_locus: HashMap<(String, u64), String>
}

/// A single parsed row, before blocks are assembled
struct PanelRow {
    line_number: usize,
    line: String,
    snp: Snp,
    anchor: Option<String>
}

impl HaplotypeMap {
    /// Creates an empty map with the given header lines.
    /// `@SQ` lines with an `SN:` tag define the sequence order.
    pub fn new(header_lines: Vec<String>) -> Self {
        let sequence_names = header_lines.iter()
            .filter(|l| l.starts_with("@SQ"))
            .filter_map(|l| l.split('\t').find_map(|tag| tag.strip_prefix("SN:")))
            .map(|s| s.to_string())
            .collect();
        Self {
            header_lines,
            sequence_names,
            ..Default::default()
        }
    }

    /// Loads a panel from a plain or gzip-compressed file
    /// # Arguments
    /// * `filename` - path to the panel, ".gz" files are decompressed and VCF names are loaded with [`HaplotypeMap::from_vcf`]
    /// # Errors
    /// * if the file cannot be opened or read
    /// * if any row is malformed, names an unknown anchor or contig, or duplicates a SNP
    pub fn from_path(filename: &Path) -> anyhow::Result<Self> {
        if is_vcf_path(filename) {
            return Self::from_vcf(filename);
        }
        info!("Loading haplotype map from {filename:?}...");
        let fp: Box<dyn std::io::Read> = if filename.extension().unwrap_or_default() == "gz" {
            Box::new(flate2::read::MultiGzDecoder::new(
                File::open(filename).with_context(|| format!("Error while opening {filename:?}:"))?
            ))
        } else {
            Box::new(File::open(filename).with_context(|| format!("Error while opening {filename:?}:"))?)
        };
        let map = Self::from_reader(BufReader::new(fp))
            .with_context(|| format!("Error while parsing {filename:?}:"))?;
        info!("Loaded {} haplotype blocks containing {} SNPs.", map.haplotypes().len(), map.num_snps());
        Ok(map)
    }

    /// Loads a panel from any buffered reader
    /// # Errors
    /// * if any row is malformed, names an unknown anchor or contig, or duplicates a SNP
    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut header_lines = vec![];
        let mut rows = vec![];
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            if line.starts_with('@') {
                ensure!(rows.is_empty(), "Header line found after data rows at line {line_number}: {line:?}");
                header_lines.push(line);
            } else if line.trim().is_empty() || line.starts_with('#') {
                continue;
            } else {
                let (snp, anchor) = parse_row(&line)
                    .with_context(|| format!("Error at line {line_number}: {line:?}"))?;
                rows.push(PanelRow { line_number, line, snp, anchor });
            }
        }

        let mut map = Self::new(header_lines);
        if !map.sequence_names.is_empty() {
            for row in rows.iter() {
                ensure!(
                    map.sequence_names.contains(row.snp.chrom()),
                    "Contig {} is not in the header at line {}: {:?}", row.snp.chrom(), row.line_number, row.line
                );
            }
        } else {
            // no dictionary, so use the order contigs first appear in
            map.sequence_names = rows.iter().map(|r| r.snp.chrom().to_string()).collect();
        }

        // first pass builds a block for every anchor row, second pass attaches the rest
        let mut blocks: IndexMap<String, HaplotypeBlock> = Default::default();
        let mut deferred = vec![];
        for row in rows.into_iter() {
            let is_anchor = match row.anchor.as_deref() {
                None => true,
                Some(anchor) => anchor == row.snp.name()
            };
            if is_anchor {
                ensure!(
                    !blocks.contains_key(row.snp.name()),
                    "Duplicate SNP name {} at line {}: {:?}", row.snp.name(), row.line_number, row.line
                );
                let mut block = HaplotypeBlock::new(row.snp.maf())
                    .with_context(|| format!("Error at line {}: {:?}", row.line_number, row.line))?;
                let name = row.snp.name().to_string();
                block.add_snp(row.snp)
                    .with_context(|| format!("Error at line {}: {:?}", row.line_number, row.line))?;
                blocks.insert(name, block);
            } else {
                deferred.push(row);
            }
        }

        for row in deferred.into_iter() {
            let anchor = row.anchor.as_deref().unwrap_or_default();
            let block = blocks.get_mut(anchor)
                .ok_or_else(|| anyhow!("Unknown anchor SNP {anchor} at line {}: {:?}", row.line_number, row.line))?;
            block.add_snp(row.snp)
                .with_context(|| format!("Error at line {}: {:?}", row.line_number, row.line))?;
        }

        for (_anchor, block) in blocks.into_iter() {
            map.add_haplotype(block)?;
        }
        debug!("Parsed {} haplotype blocks.", map.haplotype_blocks.len());
        Ok(map)
    }

    /// Loads a panel from a VCF with contig header lines and at most one sample.
    /// The ID is the SNP name and `AF` the MAF; a GT whose first allele is not REF swaps the alleles and uses `1 - AF`.
    /// Records sharing a `PS` on one contig form a block, records without one are blocks of their own.
    /// # Errors
    /// * if the file cannot be read or has no contig header lines
    /// * if the file has more than one sample
    /// * if a record is not a bi-allelic SNP with an `AF` value
    /// * if a phased GT has no `PS` or is not heterozygous
    pub fn from_vcf(filename: &Path) -> anyhow::Result<Self> {
        info!("Loading haplotype map from VCF {filename:?}...");
        let mut vcf_reader = VcfBuilder::default()
            .build_from_path(filename)
            .with_context(|| format!("Error while opening {filename:?}:"))?;
        let vcf_header = vcf_reader.read_header()
            .with_context(|| format!("Error while reading header of {filename:?}:"))?;
        ensure!(!vcf_header.contigs().is_empty(), "Haplotype map VCF has no contig header lines: {filename:?}");
        ensure!(
            vcf_header.sample_names().len() <= 1,
            "Haplotype map VCF must contain at most one sample, found {}: {filename:?}", vcf_header.sample_names().len()
        );

        let header_lines = vcf_header.contigs().iter()
            .map(|(name, contig)| match contig.length() {
                Some(length) => format!("@SQ\tSN:{name}\tLN:{length}"),
                None => format!("@SQ\tSN:{name}")
            })
            .collect();
        let mut map = Self::new(header_lines);

        let mut blocks: IndexMap<String, HaplotypeBlock> = Default::default();
        for result in vcf_reader.records(&vcf_header) {
            let record: Box<dyn vcf::variant::Record> = result
                .with_context(|| format!("Error while reading record from {filename:?}:"))?;
            let record_buf = vcf::variant::RecordBuf::try_from_variant_record(&vcf_header, record.as_ref())?;
            let locus = format!(
                "{}:{}", record_buf.reference_sequence_name(),
                record_buf.variant_start().map(|p| p.get()).unwrap_or_default()
            );

            let (block_key, snp) = panel_snp_from_record(&record_buf)
                .with_context(|| format!("Error at {locus} in {filename:?}:"))?;
            let block = match blocks.entry(block_key) {
                indexmap::map::Entry::Occupied(entry) => entry.into_mut(),
                indexmap::map::Entry::Vacant(entry) => entry.insert(HaplotypeBlock::new(snp.maf())?)
            };
            block.add_snp(snp)
                .with_context(|| format!("Error at {locus} in {filename:?}:"))?;
        }

        for (_key, block) in blocks.into_iter() {
            map.add_haplotype(block)?;
        }
        info!("Loaded {} haplotype blocks containing {} SNPs.", map.haplotypes().len(), map.num_snps());
        Ok(map)
    }

    /// Adds a block and indexes its SNPs.
    /// # Errors
    /// * if any SNP name or locus is already present in the map
    pub fn add_haplotype(&mut self, block: HaplotypeBlock) -> anyhow::Result<()> {
        let mut seen_loci: IndexSet<(String, u64)> = Default::default();
        for snp in block.snps() {
            ensure!(!self.block_by_snp_name.contains_key(snp.name()), "Duplicate SNP name in haplotype map: {}", snp.name());
            let locus = (snp.chrom().to_string(), snp.position());
            ensure!(
                !self.snp_name_by_locus.contains_key(&locus) && seen_loci.insert(locus),
                "Duplicate SNP locus in haplotype map: {}", snp.locus()
            );
        }

        let block_index = self.haplotype_blocks.len();
        for snp in block.snps() {
            self.block_by_snp_name.insert(snp.name().to_string(), block_index);
            self.snp_name_by_locus.insert((snp.chrom().to_string(), snp.position()), snp.name().to_string());
        }
        if !block.chrom().is_empty() && !self.sequence_names.contains(block.chrom()) {
            self.sequence_names.insert(block.chrom().to_string());
        }
        self.haplotype_blocks.push(Arc::new(block));
        Ok(())
    }

    /// The block containing the named SNP
    pub fn haplotype_for_snp(&self, name: &str) -> Option<&Arc<HaplotypeBlock>> {
        self.block_by_snp_name.get(name).map(|&i| &self.haplotype_blocks[i])
    }

    /// Looks up a SNP by name
    pub fn snp(&self, name: &str) -> Option<&Snp> {
        self.haplotype_for_snp(name).and_then(|b| b.snp(name))
    }

    /// Looks up a SNP by its 1-based position
    pub fn snp_at(&self, chrom: &str, position: u64) -> Option<&Snp> {
        self.snp_name_by_locus.get(&(chrom.to_string(), position))
            .and_then(|name| self.snp(name))
    }

    /// All SNPs across all blocks
    pub fn all_snps(&self) -> impl Iterator<Item = &Snp> {
        self.haplotype_blocks.iter().flat_map(|b| b.snps())
    }

    pub fn num_snps(&self) -> usize {
        self.block_by_snp_name.len()
    }

    /// Copy of this map without any block on the given chromosomes
    pub fn without_chromosomes(&self, chroms: &[&str]) -> anyhow::Result<HaplotypeMap> {
        let mut ret = HaplotypeMap::new(self.header_lines.clone());
        ret.sequence_names = self.sequence_names.clone();
        for block in self.haplotype_blocks.iter() {
            if !chroms.contains(&block.chrom()) {
                ret.add_haplotype(block.as_ref().clone())?;
            }
        }
        Ok(ret)
    }

    /// Position of a contig in the sequence dictionary, unknown contigs sort last
    fn sequence_index(&self, chrom: &str) -> usize {
        self.sequence_names.get_index_of(chrom).unwrap_or(usize::MAX)
    }

    /// Writes the map in the same format it is loaded from, rows sorted by sequence order, position, and name
    /// # Arguments
    /// * `filename` - output path, ".gz" files are compressed
    pub fn write_to_path(&self, filename: &Path) -> anyhow::Result<()> {
        let file: Box<dyn std::io::Write> = if filename.extension().unwrap_or_default() == "gz" {
            Box::new(flate2::write::GzEncoder::new(
                File::create(filename)?,
                flate2::Compression::default()
            ))
        } else {
            Box::new(File::create(filename)?)
        };
        self.write(BufWriter::new(file))
            .with_context(|| format!("Error while writing haplotype map to {filename:?}:"))
    }

    /// Writes the map to any writer
    pub fn write<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        for line in self.header_lines.iter() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer, "{HAPLOTYPE_MAP_COLUMNS}")?;

        let mut rows = vec![];
        for block in self.haplotype_blocks.iter() {
            let anchor = block.first_snp().map(|s| s.name());
            for snp in block.snps() {
                rows.push(PanelWriteRow {
                    chromosome: snp.chrom(),
                    position: snp.position(),
                    name: snp.name(),
                    major_allele: snp.allele1() as char,
                    minor_allele: snp.allele2() as char,
                    maf: snp.maf(),
                    anchor_snp: anchor.filter(|&a| a != snp.name()).unwrap_or_default(),
                    panels: snp.fingerprint_panels().iter().join(",")
                });
            }
        }
        rows.sort_by(|a, b| {
            self.sequence_index(a.chromosome).cmp(&self.sequence_index(b.chromosome))
                .then(a.position.cmp(&b.position))
                .then(a.name.cmp(b.name))
        });

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(writer);
        for row in rows.iter() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the map as a VCF with the single sample [`HET_GENOTYPE_FOR_PHASING`].
    /// REF is the major allele and `AF` the MAF. SNPs of a multi-SNP block get a phased `0|1`
    /// with `PS` at the position of the block's first SNP, everything else an unphased `0/1`.
    /// # Arguments
    /// * `filename` - output path, ".gz" files are bgzip compressed
    pub fn write_vcf(&self, filename: &Path) -> anyhow::Result<()> {
        let vcf_header = self.vcf_header();
        let records = self.vcf_records()?;

        let mut builder = vcf::io::writer::Builder::default();
        if filename.extension().unwrap_or_default() == "gz" {
            builder = builder.set_compression_method(vcf::io::CompressionMethod::Bgzf);
        }
        let mut vcf_writer = builder.build_from_path(filename)
            .with_context(|| format!("Error while creating {filename:?}:"))?;
        vcf_writer.write_header(&vcf_header)
            .with_context(|| format!("Error while writing header to {filename:?}:"))?;
        for record in records.iter() {
            vcf_writer.write_variant_record(&vcf_header, record)
                .with_context(|| format!("Error while writing record to {filename:?}:"))?;
        }
        debug!("Wrote {} records to {filename:?}", records.len());
        Ok(())
    }

    fn vcf_header(&self) -> vcf::Header {
        let mut builder = vcf::Header::builder();
        for name in self.sequence_names.iter() {
            let mut contig = Map::<map::Contig>::new();
            *contig.length_mut() = self.sequence_length(name);
            builder = builder.add_contig(name.as_str(), contig);
        }
        builder
            .add_info(info_key::ALLELE_FREQUENCIES, Map::<map::Info>::from(info_key::ALLELE_FREQUENCIES))
            .add_format(vcf_key::GENOTYPE, Map::<map::Format>::from(vcf_key::GENOTYPE))
            .add_format(vcf_key::PHASE_SET, Map::<map::Format>::from(vcf_key::PHASE_SET))
            .add_sample_name(HET_GENOTYPE_FOR_PHASING)
            .build()
    }

    /// One record per SNP, sorted by sequence order and position
    fn vcf_records(&self) -> anyhow::Result<Vec<vcf::variant::RecordBuf>> {
        let mut entries: Vec<(&Snp, Option<i32>)> = Vec::with_capacity(self.num_snps());
        for block in self.haplotype_blocks.iter() {
            let mut snps: Vec<&Snp> = block.snps().collect();
            snps.sort_by_key(|snp| snp.position());
            let phase_set = match snps.first() {
                Some(anchor) if snps.len() > 1 => Some(
                    i32::try_from(anchor.position())
                        .with_context(|| format!("Position of {anchor} does not fit in a phase set"))?
                ),
                _ => None
            };
            entries.extend(snps.into_iter().map(|snp| (snp, phase_set)));
        }
        entries.sort_by(|(a, _), (b, _)| {
            self.sequence_index(a.chrom()).cmp(&self.sequence_index(b.chrom()))
                .then(a.position().cmp(&b.position()))
        });

        entries.into_iter()
            .map(|(snp, phase_set)| snp_vcf_record(snp, phase_set))
            .collect()
    }

    /// Length from the `LN:` tag of the contig's `@SQ` line
    fn sequence_length(&self, name: &str) -> Option<usize> {
        self.header_lines.iter()
            .filter(|l| l.starts_with("@SQ"))
            .find(|l| l.split('\t').any(|tag| tag.strip_prefix("SN:") == Some(name)))
            .and_then(|l| l.split('\t').find_map(|tag| tag.strip_prefix("LN:")))
            .and_then(|length| length.parse().ok())
    }

    // getters
    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }

    pub fn sequence_names(&self) -> &IndexSet<String> {
        &self.sequence_names
    }

    pub fn haplotypes(&self) -> &[Arc<HaplotypeBlock>] {
        &self.haplotype_blocks
    }
}

/// A single output row of the panel file
#[derive(Serialize)]
struct PanelWriteRow<'a> {
    chromosome: &'a str,
    position: u64,
    name: &'a str,
    major_allele: char,
    minor_allele: char,
    maf: f64,
    anchor_snp: &'a str,
    panels: String
}

/// Parses one data row into a SNP and its optional anchor name
fn parse_row(line: &str) -> anyhow::Result<(Snp, Option<String>)> {
    let fields: Vec<&str> = line.split('\t').collect();
    if !(6..=8).contains(&fields.len()) {
        bail!("Expected 6 to 8 tab-delimited fields, found {}", fields.len());
    }

    let position: u64 = fields[1].trim().parse()
        .with_context(|| format!("Invalid position {:?}", fields[1]))?;
    let allele1 = parse_allele(fields[3])?;
    let allele2 = parse_allele(fields[4])?;
    let maf: f64 = fields[5].trim().parse()
        .with_context(|| format!("Invalid minor allele frequency {:?}", fields[5]))?;
    let anchor = fields.get(6)
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string());
    let panels = fields.get(7)
        .map(|p| p.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect())
        .unwrap_or_default();

    let snp = Snp::new(
        fields[2].trim().to_string(), fields[0].trim().to_string(), position,
        allele1, allele2, maf, panels
    )?;
    Ok((snp, anchor))
}

/// True for ".vcf", ".vcf.gz", ".vcf.bgz" and ".bcf" names
fn is_vcf_path(filename: &Path) -> bool {
    let name = filename.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    [".vcf", ".vcf.gz", ".vcf.bgz", ".bcf"].iter().any(|ext| name.ends_with(ext))
}

/// Converts one VCF panel record into its block key and SNP
fn panel_snp_from_record(record: &vcf::variant::RecordBuf) -> anyhow::Result<(String, Snp)> {
    let chrom = record.reference_sequence_name();
    let position = record.variant_start()
        .ok_or(anyhow!("Record has no position"))?
        .get() as u64;

    let alternates = record.alternate_bases().as_ref();
    ensure!(alternates.len() == 1, "Expected exactly one ALT allele, found {}", alternates.len());
    let (ref_base, alt_base) = match (record.reference_bases().as_bytes(), alternates[0].as_bytes()) {
        ([ref_base], [alt_base]) => (*ref_base, *alt_base),
        _ => bail!("Only SNPs are allowed, found {} > {}", record.reference_bases(), alternates[0])
    };
    let allele_frequency = info_allele_frequency(record.info().get(info_key::ALLELE_FREQUENCIES))
        .ok_or(anyhow!("Missing or invalid AF INFO value"))?;

    let sample = record.samples().get_index(0);
    let phase_set = sample.as_ref().and_then(|s| match s.get(vcf_key::PHASE_SET) {
        Some(Some(Value::Integer(ps))) => Some(ps.to_string()),
        Some(Some(Value::String(ps))) => Some(ps.clone()),
        _ => None
    });

    let mut swapped = false;
    if let Some(Some(Some(Value::Genotype(genotype)))) = sample.as_ref().map(|s| s.get(vcf_key::GENOTYPE)) {
        let alleles = genotype.as_ref();
        let is_phased = alleles.iter().skip(1).any(|a| a.phasing() == Phasing::Phased);
        if is_phased {
            ensure!(phase_set.is_some(), "Phased genotypes must have a phase set (PS)");
            let is_het = matches!(
                alleles,
                [a, b] if a.position().is_some() && b.position().is_some() && a.position() != b.position()
            );
            ensure!(is_het, "Phased genotypes must be heterozygous");
        }
        swapped = alleles.first().is_some_and(|a| a.position() != Some(0));
    }

    let (major, minor, maf) = if swapped {
        (alt_base, ref_base, 1.0 - allele_frequency)
    } else {
        (ref_base, alt_base, allele_frequency)
    };
    let name = record.ids().as_ref().iter().next()
        .cloned()
        .unwrap_or_else(|| format!("{chrom}:{position}"));
    let snp = Snp::new(name, chrom.to_string(), position, major, minor, maf, vec![])?;

    let block_key = match phase_set {
        Some(ps) => format!("PhaseSet_{chrom}_{ps}"),
        None => format!("Synthetic_{chrom}_{position}")
    };
    Ok((block_key, snp))
}

/// The first `AF` value, None if missing or not a float
fn info_allele_frequency(value: Option<Option<&InfoValue>>) -> Option<f64> {
    let allele_frequency = match value {
        Some(Some(InfoValue::Float(af))) => *af,
        Some(Some(InfoValue::Array(InfoArray::Float(values)))) => values.first().copied().flatten()?,
        _ => return None
    };
    // shortest decimal form of the f32, so an AF of 0.4 loads as 0.4
    allele_frequency.to_string().parse().ok()
}

/// A single VCF panel record for a SNP, with the phase set of its block if it has one
fn snp_vcf_record(snp: &Snp, phase_set: Option<i32>) -> anyhow::Result<vcf::variant::RecordBuf> {
    let position = usize::try_from(snp.position()).ok()
        .and_then(Position::new)
        .ok_or(anyhow!("Invalid position for SNP {snp}"))?;
    let ids: record_buf::Ids = [snp.name().to_string()].into_iter().collect();
    let alternate_bases = record_buf::AlternateBases::from(vec![(snp.allele2() as char).to_string()]);
    let info: record_buf::Info = [(
        info_key::ALLELE_FREQUENCIES.to_string(),
        Some(InfoValue::Array(InfoArray::Float(vec![Some(snp.maf() as f32)])))
    )].into_iter().collect();

    let format_keys: record_buf::samples::Keys = [
        vcf_key::GENOTYPE.to_string(),
        vcf_key::PHASE_SET.to_string()
    ].into_iter().collect();
    let values = match phase_set {
        Some(ps) => vec![Some(Value::from("0|1")), Some(Value::from(ps))],
        None => vec![Some(Value::from("0/1")), None]
    };
    let samples = record_buf::Samples::new(format_keys, vec![values]);

    Ok(vcf::variant::RecordBuf::builder()
        .set_reference_sequence_name(snp.chrom())
        .set_variant_start(position)
        .set_ids(ids)
        .set_reference_bases((snp.allele1() as char).to_string())
        .set_alternate_bases(alternate_bases)
        .set_info(info)
        .set_samples(samples)
        .build())
}

fn parse_allele(field: &str) -> anyhow::Result<u8> {
    match field.trim().as_bytes() {
        [allele] => Ok(*allele),
        _ => bail!("Allele must be a single base, found {field:?}")
    }
}
