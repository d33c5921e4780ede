//! Run-length encoding
//!
//! Codec for data dominated by byte runs.  A single forward pass splits
//! the input into tagged segments: a run of at least `threshold`
//! identical bytes becomes a `0xFF` run segment (count + value), and
//! everything between runs is gathered into a `0xFE` literal segment so
//! short repeats never pay the run framing.  Counts use the
//! variable-length form from `tools::bytepack`.
//!
//! The analyzer histograms run lengths without encoding anything, which
//! is enough to predict whether this codec will shrink or inflate a file.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::analysis;
use crate::container;
use crate::tools::bytepack::{self,ByteReader};
use crate::Error;

pub const DEFAULT_THRESHOLD: usize = 3;

#[derive(FromPrimitive)]
enum SegmentTag {
    Run = 0xFF,
    Literal = 0xFE
}

/// One encoder output unit.  Expanding the segments in order restores
/// the original buffer exactly.
enum Segment<'a> {
    Run { value: u8, count: usize },
    Literal(&'a [u8])
}

/// Length of the run starting at `i`
fn run_length(dat: &[u8],i: usize) -> usize {
    let mut n = 1;
    while i + n < dat.len() && dat[i+n] == dat[i] {
        n += 1;
    }
    n
}

/// Split the buffer into run and literal segments.  A literal never
/// contains a run of `threshold` or more, and never borders another
/// literal.
fn segment(dat: &[u8],threshold: usize) -> Vec<Segment> {
    let mut segs = Vec::new();
    let mut i = 0;
    while i < dat.len() {
        let r = run_length(dat,i);
        if r >= threshold {
            segs.push(Segment::Run { value: dat[i], count: r });
            i += r;
        } else {
            let start = i;
            i += r;
            while i < dat.len() {
                let next = run_length(dat,i);
                if next >= threshold {
                    break;
                }
                i += next;
            }
            segs.push(Segment::Literal(&dat[start..i]));
        }
    }
    segs
}

#[derive(Debug,Clone)]
pub struct CompressStats {
    pub original_size: usize,
    /// segment stream only, excluding container metadata
    pub compressed_size: usize,
    pub artifact_size: usize,
    pub compression_ratio: f64,
    pub space_saved_percent: f64,
    pub run_segments: usize,
    pub literal_segments: usize,
    pub threshold: usize,
    pub unique_bytes: usize,
    pub most_common_byte: Option<(u8,u64)>
}

#[derive(Debug,Clone)]
pub struct ExpandStats {
    pub original_size: usize,
    pub expanded_size: usize,
    pub threshold: usize,
    pub runs_processed: usize,
    pub literals_processed: usize
}

/// Run-length analysis predicting codec effectiveness.
#[derive(Debug,Clone)]
pub struct Analysis {
    pub file_size: usize,
    pub unique_bytes: usize,
    /// counts of runs of length 2 through 10, index 0 holding length 2
    pub run_distribution: [u64;9],
    /// runs of length 11 and up
    pub long_runs: u64,
    /// bytes inside runs that reach the threshold
    pub compressible_bytes: usize,
    pub compressible_fraction: f64,
    pub top_bytes: Vec<(u8,u64)>,
    pub recommendation: Recommendation
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Recommendation {
    NoRuns,
    MayInflate,
    Modest,
    Good
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self,f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            Self::NoRuns => "rle not recommended - no compressible runs found",
            Self::MayInflate => "rle may increase file size - few compressible runs",
            Self::Modest => "rle may provide modest compression",
            Self::Good => "rle should provide good compression - many repetitive sequences found"
        };
        write!(f,"{}",msg)
    }
}

/// Main compression function
pub fn compress(dat: &[u8],threshold: usize) -> Result<(Vec<u8>,CompressStats),Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    if threshold < 1 {
        return Err(Error::InvalidParam("threshold must be at least 1".to_string()));
    }
    if dat.len() > u32::MAX as usize {
        return Err(Error::InvalidParam("input exceeds the 4 GiB container limit".to_string()));
    }
    let segs = segment(dat,threshold);
    let mut artifact = Vec::new();
    artifact.extend_from_slice(&container::RLE_MAGIC);
    artifact.extend_from_slice(&u32::to_le_bytes(dat.len() as u32));
    artifact.extend_from_slice(&u32::to_le_bytes(threshold as u32));
    let mut runs = 0;
    let mut literals = 0;
    for seg in &segs {
        match seg {
            Segment::Run { value, count } => {
                artifact.push(SegmentTag::Run as u8);
                bytepack::put_varlen(&mut artifact,*count);
                artifact.push(*value);
                runs += 1;
            },
            Segment::Literal(bytes) => {
                artifact.push(SegmentTag::Literal as u8);
                bytepack::put_varlen(&mut artifact,bytes.len());
                artifact.extend_from_slice(bytes);
                literals += 1;
            }
        }
    }
    let freq = analysis::frequency_table(dat);
    let compressed_size = artifact.len() - container::MAGIC_LEN - 8;
    let (ratio,saved) = analysis::ratios(dat.len(),compressed_size);
    let stats = CompressStats {
        original_size: dat.len(),
        compressed_size,
        artifact_size: artifact.len(),
        compression_ratio: ratio,
        space_saved_percent: saved,
        run_segments: runs,
        literal_segments: literals,
        threshold,
        unique_bytes: analysis::unique_bytes(&freq),
        most_common_byte: analysis::most_common_byte(&freq)
    };
    Ok((artifact,stats))
}

/// Main expansion function
pub fn expand(dat: &[u8]) -> Result<(Vec<u8>,ExpandStats),Error> {
    let body = container::check_magic(dat,&container::RLE_MAGIC,"rle")?;
    let mut rd = ByteReader::new(body);
    let original_size = rd.get_u32_le()? as usize;
    let threshold = rd.get_u32_le()? as usize;
    // sized on demand, the recorded length is not yet trusted
    let mut ans: Vec<u8> = Vec::new();
    let mut runs = 0;
    let mut literals = 0;
    while rd.remaining() > 0 {
        let tag = rd.get_u8()?;
        match SegmentTag::from_u8(tag) {
            Some(SegmentTag::Run) => {
                let count = bytepack::get_varlen(&mut rd)?;
                let value = rd.get_u8()?;
                if ans.len() + count > original_size {
                    return Err(Error::SizeMismatch { expected: original_size, actual: ans.len() + count });
                }
                ans.resize(ans.len() + count,value);
                runs += 1;
            },
            Some(SegmentTag::Literal) => {
                let count = bytepack::get_varlen(&mut rd)?;
                let bytes = rd.get_slice(count)?;
                if ans.len() + count > original_size {
                    return Err(Error::SizeMismatch { expected: original_size, actual: ans.len() + count });
                }
                ans.extend_from_slice(bytes);
                literals += 1;
            },
            None => {
                return Err(Error::Corrupt(format!("unexpected tag byte {:02x}",tag)));
            }
        }
    }
    if ans.len() != original_size {
        return Err(Error::SizeMismatch { expected: original_size, actual: ans.len() });
    }
    let stats = ExpandStats {
        original_size,
        expanded_size: ans.len(),
        threshold,
        runs_processed: runs,
        literals_processed: literals
    };
    Ok((ans,stats))
}

/// Histogram the runs in the buffer and predict codec effectiveness.
pub fn analyze(dat: &[u8],threshold: usize) -> Result<Analysis,Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut distribution = [0u64;9];
    let mut long_runs = 0;
    let mut compressible = 0;
    let mut i = 0;
    while i < dat.len() {
        let r = run_length(dat,i);
        if r >= 2 {
            match r <= 10 {
                true => distribution[r-2] += 1,
                false => long_runs += 1
            }
        }
        if r >= threshold {
            compressible += r;
        }
        i += r;
    }
    let fraction = compressible as f64 / dat.len() as f64;
    let recommendation = if compressible == 0 {
        Recommendation::NoRuns
    } else if fraction < 0.1 {
        Recommendation::MayInflate
    } else if fraction < 0.3 {
        Recommendation::Modest
    } else {
        Recommendation::Good
    };
    let freq = analysis::frequency_table(dat);
    Ok(Analysis {
        file_size: dat.len(),
        unique_bytes: analysis::unique_bytes(&freq),
        run_distribution: distribution,
        long_runs,
        compressible_bytes: compressible,
        compressible_fraction: fraction,
        top_bytes: analysis::top_bytes(&freq,5),
        recommendation
    })
}

/// Convenience function, compresses one file into another
pub fn compress_file<P: AsRef<std::path::Path>>(input: P,output: P,threshold: usize) -> Result<CompressStats,Error> {
    let dat = std::fs::read(&input)?;
    let (artifact,stats) = compress(&dat,threshold)?;
    std::fs::write(&output,&artifact)?;
    log::debug!("rle packed {} bytes into {}",stats.original_size,stats.artifact_size);
    Ok(stats)
}

/// Convenience function, expands one file into another
pub fn expand_file<P: AsRef<std::path::Path>>(input: P,output: P) -> Result<ExpandStats,Error> {
    let dat = std::fs::read(&input)?;
    let (expanded,stats) = expand(&dat)?;
    std::fs::write(&output,&expanded)?;
    log::debug!("rle expanded {} bytes into {}",dat.len(),stats.expanded_size);
    Ok(stats)
}

/// Convenience function, analyzes a file at the given path
pub fn analyze_file<P: AsRef<std::path::Path>>(path: P,threshold: usize) -> Result<Analysis,Error> {
    let dat = std::fs::read(&path)?;
    analyze(&dat,threshold)
}

#[test]
fn run_dominant() {
    let mut dat = vec![b'A';10];
    dat.extend_from_slice(&[b'B';5]);
    let (artifact,stats) = compress(&dat,DEFAULT_THRESHOLD).expect("compression failed");
    let expected = "52 4C 45 31 0F 00 00 00 03 00 00 00 FF 0A 41 FF 05 42";
    assert_eq!(artifact,hex::decode(expected.replace(' ',"")).unwrap());
    assert_eq!(stats.run_segments,2);
    assert_eq!(stats.literal_segments,0);
    assert!(stats.compressed_size < 15);
    let (expanded,xstats) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,dat);
    assert_eq!(xstats.runs_processed,2);
}

#[test]
fn literal_dominant() {
    let (artifact,stats) = compress(b"abcdef",DEFAULT_THRESHOLD).expect("compression failed");
    assert_eq!(stats.run_segments,0);
    assert_eq!(stats.literal_segments,1);
    // one tag byte and one length byte of framing
    assert_eq!(stats.compressed_size,8);
    assert!(stats.compressed_size >= stats.original_size);
    let (expanded,_) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,b"abcdef");
}

#[test]
fn segments_obey_invariants() {
    let dat = b"xxabcddddefggxxxxyzzz";
    let segs = segment(dat,3);
    let mut prev_literal = false;
    for seg in &segs {
        match seg {
            Segment::Run { count, .. } => {
                assert!(*count >= 3);
                prev_literal = false;
            },
            Segment::Literal(bytes) => {
                assert!(!prev_literal,"two adjacent literals");
                assert!(!bytes.is_empty());
                // no run of threshold length hides inside a literal
                for i in 0..bytes.len() {
                    assert!(run_length(bytes,i) < 3);
                }
                prev_literal = true;
            }
        }
    }
}

#[test]
fn long_run_framing() {
    // counts crossing both varlen escape tiers
    for count in [254usize,255,256,300,65534,65535,70000] {
        let dat = vec![0x7A;count];
        let (artifact,stats) = compress(&dat,DEFAULT_THRESHOLD).expect("compression failed");
        assert_eq!(stats.run_segments,1);
        let (expanded,_) = expand(&artifact).expect("expansion failed");
        assert_eq!(expanded,dat);
    }
}

#[test]
fn invertibility() {
    let cases: Vec<Vec<u8>> = vec![
        (0..=255).collect(),
        b"aabbaabbaabb".to_vec(),
        b"mixed text with a looooooooong run and tails".to_vec(),
        vec![0xFF;50],
        vec![0xFE;50]
    ];
    for case in cases {
        let (artifact,_) = compress(&case,DEFAULT_THRESHOLD).expect("compression failed");
        let (expanded,_) = expand(&artifact).expect("expansion failed");
        assert_eq!(expanded,case);
    }
}

#[test]
fn rejects_bad_artifacts() {
    assert!(matches!(compress(b"",DEFAULT_THRESHOLD),Err(Error::EmptyInput)));
    assert!(matches!(compress(b"abc",0),Err(Error::InvalidParam(_))));

    let (artifact,_) = compress(b"aaaabbbb",DEFAULT_THRESHOLD).expect("compression failed");
    // clobber the first tag byte
    let mut bad = artifact.clone();
    bad[12] = 0x00;
    assert!(matches!(expand(&bad),Err(Error::Corrupt(_))));
    // shrink the recorded size so the stream overruns it
    let mut bad = artifact.clone();
    bad[4] = 0x03;
    assert!(matches!(expand(&bad),Err(Error::SizeMismatch { .. })));

    let png = [0x89,0x50,0x4E,0x47,0x0D,0x0A,0x1A,0x0A];
    assert!(matches!(expand(&png),Err(Error::WrongFormat(_))));
}

#[test]
fn analysis_histogram() {
    let mut dat = vec![b'A';10];
    dat.extend_from_slice(&[b'B';5]);
    dat.extend_from_slice(b"xyz");
    let ana = analyze(&dat,DEFAULT_THRESHOLD).expect("analysis failed");
    assert_eq!(ana.run_distribution[10-2],1);
    assert_eq!(ana.run_distribution[5-2],1);
    assert_eq!(ana.long_runs,0);
    assert_eq!(ana.compressible_bytes,15);
    assert_eq!(ana.recommendation,Recommendation::Good);

    let ana = analyze(b"abcdefgh",DEFAULT_THRESHOLD).expect("analysis failed");
    assert_eq!(ana.compressible_bytes,0);
    assert_eq!(ana.recommendation,Recommendation::NoRuns);

    let mut dat = vec![0u8;12];
    dat.extend((0..=255).cycle().take(500).map(|v| v as u8));
    let ana = analyze(&dat,DEFAULT_THRESHOLD).expect("analysis failed");
    assert_eq!(ana.long_runs,1);
    assert_eq!(ana.recommendation,Recommendation::MayInflate);
}
