//! LZ77 sliding-window compression
//!
//! Codec for data with repeated sequences.  The encoder walks the input
//! keeping a window of already-processed bytes behind the cursor; at
//! each position it looks for the longest match between the window and
//! the lookahead, emitting a fixed 4 byte triplet (distance, length,
//! following byte) for matches of 3 or more, and a literal triplet
//! `(0,0,byte)` otherwise.  Matches may run past the cursor into the
//! bytes being copied, which is what lets a 1 byte seed expand into a
//! long run, and the expander copies byte at a time for the same reason.
//!
//! Equal-length matches resolve to the smallest starting offset in the
//! window so the triplet stream is identical across runs.

use crate::analysis;
use crate::container;
use crate::tools::bytepack::ByteReader;
use crate::Error;

pub const DEFAULT_WINDOW: usize = 4096;
pub const DEFAULT_LOOKAHEAD: usize = 18;
const MAX_WINDOW: usize = 32768;
const MAX_LOOKAHEAD: usize = 255;
/// minimum match length that will be tokenized
const THRESHOLD: usize = 3;

/// analyzers sample at most this many leading bytes
const SAMPLE_LIMIT: usize = 10000;

/// Window and lookahead sizes, validated at construction
#[derive(Clone,Copy)]
pub struct Params {
    window_size: usize,
    lookahead_size: usize
}

impl Params {
    pub fn new(window_size: usize,lookahead_size: usize) -> Result<Self,Error> {
        if window_size < 1 || window_size > MAX_WINDOW {
            return Err(Error::InvalidParam(format!("window size must be between 1 and {}",MAX_WINDOW)));
        }
        if lookahead_size < 1 || lookahead_size > MAX_LOOKAHEAD {
            return Err(Error::InvalidParam(format!("lookahead size must be between 1 and {}",MAX_LOOKAHEAD)));
        }
        Ok(Self { window_size, lookahead_size })
    }
    pub fn window_size(&self) -> usize {
        self.window_size
    }
    pub fn lookahead_size(&self) -> usize {
        self.lookahead_size
    }
}

impl Default for Params {
    fn default() -> Self {
        Self { window_size: DEFAULT_WINDOW, lookahead_size: DEFAULT_LOOKAHEAD }
    }
}

/// Longest match between the window behind `pos` and the lookahead at
/// `pos`, as (distance,length).  Returns (0,0) when nothing reaches the
/// tokenization threshold.
fn find_longest_match(dat: &[u8],pos: usize,params: &Params) -> (usize,usize) {
    let window_start = pos.saturating_sub(params.window_size);
    let lookahead_end = std::cmp::min(dat.len(),pos + params.lookahead_size);
    let mut best_distance = 0;
    let mut best_length = 0;
    for start in window_start..pos {
        let mut len = 0;
        // the match may run past `pos` into the bytes being copied
        while pos + len < lookahead_end && dat[start+len] == dat[pos+len] {
            len += 1;
        }
        if len > best_length {
            best_length = len;
            best_distance = pos - start;
            if best_length >= params.lookahead_size {
                break;
            }
        }
    }
    match best_length >= THRESHOLD {
        true => (best_distance,best_length),
        false => (0,0)
    }
}

#[derive(Debug,Clone)]
pub struct CompressStats {
    pub original_size: usize,
    /// triplet stream only, excluding container metadata
    pub compressed_size: usize,
    pub artifact_size: usize,
    pub compression_ratio: f64,
    pub space_saved_percent: f64,
    pub triplet_count: usize,
    pub match_count: usize,
    pub literal_count: usize,
    pub average_match_length: f64,
    pub unique_bytes: usize,
    pub most_common_byte: Option<(u8,u64)>
}

#[derive(Debug,Clone)]
pub struct ExpandStats {
    pub original_size: usize,
    pub expanded_size: usize,
    pub triplets_processed: usize,
    pub matches_processed: usize,
    pub literals_processed: usize
}

/// A repeated substring found by the pattern miner.
#[derive(Debug,Clone)]
pub struct PatternHit {
    pub pattern: Vec<u8>,
    pub occurrences: usize,
    /// rough saving against the 4 byte triplet cost
    pub bytes_saved: usize
}

/// Sample-based analysis predicting codec effectiveness.
#[derive(Debug,Clone)]
pub struct Analysis {
    pub file_size: usize,
    pub sample_size: usize,
    pub unique_bytes: usize,
    /// entropy of the whole file, not just the sample
    pub entropy: f64,
    pub matches_found: usize,
    pub match_ratio: f64,
    pub average_match_length: f64,
    pub longest_match: usize,
    /// predicted ratio against the 4 byte triplet cost, with a tenth of
    /// the sample added back as framing overhead
    pub estimated_compression_ratio: f64,
    pub patterns: Vec<PatternHit>,
    pub top_bytes: Vec<(u8,u64)>,
    pub recommendation: Recommendation
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Recommendation {
    Random,
    FewPatterns,
    Modest,
    Good,
    HighlyRecommended
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self,f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            Self::Random => "lz77 not recommended - data appears random/already compressed",
            Self::FewPatterns => "lz77 may not be effective - few repeated patterns found",
            Self::Modest => "lz77 may provide modest compression - some patterns detected",
            Self::Good => "lz77 should provide good compression - many repeated patterns",
            Self::HighlyRecommended => "lz77 highly recommended - excellent pattern repetition detected"
        };
        write!(f,"{}",msg)
    }
}

/// Main compression function
pub fn compress(dat: &[u8],params: &Params) -> Result<(Vec<u8>,CompressStats),Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    if dat.len() > u32::MAX as usize {
        return Err(Error::InvalidParam("input exceeds the 4 GiB container limit".to_string()));
    }
    let mut triplets: Vec<(u16,u8,u8)> = Vec::new();
    let mut matches = 0;
    let mut total_match_length = 0;
    let mut pos = 0;
    while pos < dat.len() {
        let (distance,length) = find_longest_match(dat,pos,params);
        if distance > 0 && length > 0 {
            let next = match pos + length < dat.len() {
                true => dat[pos+length],
                // sentinel, the expander truncates to the recorded size
                false => 0
            };
            triplets.push((std::cmp::min(distance,65535) as u16,std::cmp::min(length,255) as u8,next));
            matches += 1;
            total_match_length += length;
            pos += length + 1;
        } else {
            triplets.push((0,0,dat[pos]));
            pos += 1;
        }
    }

    let mut artifact = Vec::new();
    artifact.extend_from_slice(&container::LZ77_MAGIC);
    artifact.extend_from_slice(&u32::to_le_bytes(dat.len() as u32));
    artifact.extend_from_slice(&u16::to_le_bytes(params.window_size as u16));
    artifact.push(params.lookahead_size as u8);
    artifact.extend_from_slice(&u32::to_le_bytes(triplets.len() as u32));
    for (distance,length,next) in &triplets {
        artifact.extend_from_slice(&u16::to_be_bytes(*distance));
        artifact.push(*length);
        artifact.push(*next);
    }

    let freq = analysis::frequency_table(dat);
    let compressed_size = triplets.len() * 4;
    let (ratio,saved) = analysis::ratios(dat.len(),compressed_size);
    let stats = CompressStats {
        original_size: dat.len(),
        compressed_size,
        artifact_size: artifact.len(),
        compression_ratio: ratio,
        space_saved_percent: saved,
        triplet_count: triplets.len(),
        match_count: matches,
        literal_count: triplets.len() - matches,
        average_match_length: match matches > 0 {
            true => total_match_length as f64 / matches as f64,
            false => 0.0
        },
        unique_bytes: analysis::unique_bytes(&freq),
        most_common_byte: analysis::most_common_byte(&freq)
    };
    Ok((artifact,stats))
}

/// Main expansion function
pub fn expand(dat: &[u8]) -> Result<(Vec<u8>,ExpandStats),Error> {
    let body = container::check_magic(dat,&container::LZ77_MAGIC,"lz77")?;
    let mut rd = ByteReader::new(body);
    let original_size = rd.get_u32_le()? as usize;
    let _window_size = rd.get_u16_le()? as usize;
    let _lookahead_size = rd.get_u8()? as usize;
    let triplet_count = rd.get_u32_le()? as usize;
    let mut ans: Vec<u8> = Vec::new();
    let mut matches = 0;
    for _k in 0..triplet_count {
        let distance = rd.get_u16_be()? as usize;
        let length = rd.get_u8()? as usize;
        let next = rd.get_u8()?;
        if distance > 0 && length > 0 {
            if distance > ans.len() {
                return Err(Error::Corrupt(format!("distance {} reaches beyond the {} bytes expanded so far",distance,ans.len())));
            }
            if ans.len() + length > original_size + 1 {
                return Err(Error::Corrupt("match overruns the recorded size".to_string()));
            }
            let start = ans.len() - distance;
            // byte at a time so the copy may overlap its own output
            for k in 0..length {
                let val = ans[start+k];
                ans.push(val);
            }
            if ans.len() < original_size {
                ans.push(next);
            }
            matches += 1;
        } else {
            ans.push(next);
        }
    }
    if ans.len() != original_size {
        return Err(Error::SizeMismatch { expected: original_size, actual: ans.len() });
    }
    let stats = ExpandStats {
        original_size,
        expanded_size: ans.len(),
        triplets_processed: triplet_count,
        matches_processed: matches,
        literals_processed: triplet_count - matches
    };
    Ok((ans,stats))
}

/// Repeated substrings of length 4 up to `min(20,sample/4)`, the five
/// most frequent first.
fn common_patterns(sample: &[u8]) -> Vec<PatternHit> {
    let mut counts: std::collections::HashMap<&[u8],usize> = std::collections::HashMap::new();
    let max_len = std::cmp::min(20,sample.len() / 4);
    for len in 4..max_len {
        for i in 0..=sample.len() - len {
            *counts.entry(&sample[i..i+len]).or_insert(0) += 1;
        }
    }
    let mut hits: Vec<(&[u8],usize)> = counts.into_iter().filter(|(_,c)| *c > 1).collect();
    hits.sort_by(|a,b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    hits.truncate(5);
    hits.into_iter().map(|(pattern,occurrences)| PatternHit {
        pattern: pattern.to_vec(),
        occurrences,
        bytes_saved: (pattern.len() - 4) * (occurrences - 1)
    }).collect()
}

/// Run the match search over a leading sample and predict codec
/// effectiveness for the whole file.
pub fn analyze(dat: &[u8],params: &Params) -> Result<Analysis,Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    let sample = &dat[..std::cmp::min(dat.len(),SAMPLE_LIMIT)];
    let mut matches_found = 0;
    let mut total_match_length = 0;
    let mut longest = 0;
    let mut saved_bytes = 0;
    for i in 0..sample.len() {
        let (distance,length) = find_longest_match(sample,i,params);
        if distance > 0 && length > 0 {
            matches_found += 1;
            total_match_length += length;
            longest = std::cmp::max(longest,length);
            saved_bytes += length.saturating_sub(4);
        }
    }
    // overlapping matches can save more than the sample holds, the
    // floor keeps the prediction finite
    let estimated_compressed = sample.len() as f64 - saved_bytes as f64 + sample.len() as f64 * 0.1;
    let estimated_compression_ratio = sample.len() as f64 / estimated_compressed.max(1.0);
    let freq = analysis::frequency_table(dat);
    let entropy = analysis::entropy(&freq,dat.len());
    let match_ratio = matches_found as f64 / sample.len() as f64;
    let recommendation = if entropy > 7.5 {
        Recommendation::Random
    } else if match_ratio < 0.05 {
        Recommendation::FewPatterns
    } else if match_ratio < 0.15 {
        Recommendation::Modest
    } else if match_ratio < 0.30 {
        Recommendation::Good
    } else {
        Recommendation::HighlyRecommended
    };
    Ok(Analysis {
        file_size: dat.len(),
        sample_size: sample.len(),
        unique_bytes: analysis::unique_bytes(&freq),
        entropy,
        matches_found,
        match_ratio,
        average_match_length: match matches_found > 0 {
            true => total_match_length as f64 / matches_found as f64,
            false => 0.0
        },
        longest_match: longest,
        estimated_compression_ratio,
        patterns: common_patterns(sample),
        top_bytes: analysis::top_bytes(&freq,5),
        recommendation
    })
}

/// Convenience function, compresses one file into another
pub fn compress_file<P: AsRef<std::path::Path>>(input: P,output: P,params: &Params) -> Result<CompressStats,Error> {
    let dat = std::fs::read(&input)?;
    let (artifact,stats) = compress(&dat,params)?;
    std::fs::write(&output,&artifact)?;
    log::debug!("lz77 packed {} bytes into {} triplets",stats.original_size,stats.triplet_count);
    Ok(stats)
}

/// Convenience function, expands one file into another
pub fn expand_file<P: AsRef<std::path::Path>>(input: P,output: P) -> Result<ExpandStats,Error> {
    let dat = std::fs::read(&input)?;
    let (expanded,stats) = expand(&dat)?;
    std::fs::write(&output,&expanded)?;
    log::debug!("lz77 expanded {} bytes into {}",dat.len(),stats.expanded_size);
    Ok(stats)
}

/// Convenience function, analyzes a file at the given path
pub fn analyze_file<P: AsRef<std::path::Path>>(path: P,params: &Params) -> Result<Analysis,Error> {
    let dat = std::fs::read(&path)?;
    analyze(&dat,params)
}

#[test]
fn parameter_bounds() {
    assert!(Params::new(4096,18).is_ok());
    assert!(Params::new(1,1).is_ok());
    assert!(Params::new(32768,255).is_ok());
    assert!(matches!(Params::new(0,18),Err(Error::InvalidParam(_))));
    assert!(matches!(Params::new(32769,18),Err(Error::InvalidParam(_))));
    assert!(matches!(Params::new(4096,0),Err(Error::InvalidParam(_))));
    assert!(matches!(Params::new(4096,256),Err(Error::InvalidParam(_))));
}

#[test]
fn repetition() {
    let (artifact,stats) = compress(b"ABCABCABCABC",&Params::default()).expect("compression failed");
    // three literals then one self-referential match covering the rest
    let expected = "4C 5A 37 37 0C 00 00 00 00 10 12 04 00 00 00 \
                    00 00 00 41 00 00 00 42 00 00 00 43 00 03 09 00";
    assert_eq!(artifact,hex::decode(expected.replace(' ',"")).unwrap());
    assert_eq!(stats.triplet_count,4);
    assert_eq!(stats.match_count,1);
    let (expanded,xstats) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,b"ABCABCABCABC");
    assert_eq!(xstats.matches_processed,1);
}

#[test]
fn overlapping_copy() {
    let dat = vec![b'a';20];
    let (artifact,stats) = compress(&dat,&Params::default()).expect("compression failed");
    assert_eq!(stats.triplet_count,2);
    let (expanded,_) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,dat);
}

#[test]
fn match_bounds_hold() {
    let params = Params::default();
    let dat = b"the cat sat on the mat, the cat sat on the hat";
    let (artifact,_) = compress(dat,&params).expect("compression failed");
    // walk the triplet stream checking the encoder invariants
    let mut rd = ByteReader::new(&artifact[15..]);
    let mut out_len = 0;
    while rd.remaining() > 0 {
        let distance = rd.get_u16_be().unwrap() as usize;
        let length = rd.get_u8().unwrap() as usize;
        let _next = rd.get_u8().unwrap();
        if length > 0 {
            assert!(distance >= 1 && distance <= params.window_size());
            assert!(distance <= out_len);
            assert!(length >= THRESHOLD && length <= params.lookahead_size());
            out_len += length + 1;
        } else {
            assert_eq!(distance,0);
            out_len += 1;
        }
    }
    let (expanded,_) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,dat);
}

#[test]
fn invertibility() {
    let mut cases: Vec<Vec<u8>> = vec![
        (0..=255).collect(),
        b"abababababababab".to_vec(),
        b"x".to_vec(),
        vec![0x00;300]
    ];
    // deterministic pseudo-random buffer
    let mut state: u32 = 0xDEADBEEF;
    cases.push((0..2000).map(|_| {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (state >> 16) as u8
    }).collect());
    for case in cases {
        let (artifact,_) = compress(&case,&Params::default()).expect("compression failed");
        let (again,_) = compress(&case,&Params::default()).expect("compression failed");
        assert_eq!(artifact,again);
        let (expanded,_) = expand(&artifact).expect("expansion failed");
        assert_eq!(expanded,case);
    }
}

#[test]
fn input_longer_than_window() {
    let params = Params::new(64,18).expect("params rejected");
    let pattern = b"0123456789abcdef";
    let dat: Vec<u8> = pattern.iter().cycle().take(params.window_size() * 3 + 5).copied().collect();
    let (artifact,stats) = compress(&dat,&params).expect("compression failed");
    assert!(stats.match_count > 0);
    let (expanded,_) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,dat);
}

#[test]
fn rejects_bad_artifacts() {
    assert!(matches!(compress(b"",&Params::default()),Err(Error::EmptyInput)));

    let (artifact,_) = compress(b"ABCABCABCABC",&Params::default()).expect("compression failed");
    // a distance pointing before the start of output
    let mut bad = artifact.clone();
    bad[15] = 0x7F;
    bad[16] = 0xFF;
    bad[17] = 0x03;
    assert!(matches!(expand(&bad),Err(Error::Corrupt(_))));
    // truncated triplet stream
    let mut bad = artifact.clone();
    bad.truncate(bad.len() - 2);
    assert!(matches!(expand(&bad),Err(Error::Corrupt(_))));
    // shrink the recorded size so the stream overruns it
    let mut bad = artifact.clone();
    bad[4] = 0x0B;
    assert!(matches!(expand(&bad),Err(Error::SizeMismatch { .. })));

    let jpeg = [0xFF,0xD8,0xFF,0xE0,0x00,0x10];
    assert!(matches!(expand(&jpeg),Err(Error::WrongFormat(_))));
}

#[test]
fn analysis_of_repetitive_data() {
    let dat = b"abcdefgh".repeat(40);
    let ana = analyze(&dat,&Params::default()).expect("analysis failed");
    assert!(ana.matches_found > 0);
    assert!(ana.match_ratio > 0.30);
    assert_eq!(ana.recommendation,Recommendation::HighlyRecommended);
    assert!(ana.estimated_compression_ratio > 1.0);
    assert!(!ana.patterns.is_empty());
    assert!(ana.patterns[0].occurrences > 1);
    assert!(ana.entropy < 7.5);
    assert_eq!(ana.sample_size,320);
}

#[test]
fn analysis_of_flat_data() {
    // every 256 byte value once, no repeats to find
    let dat: Vec<u8> = (0..=255).collect();
    let ana = analyze(&dat,&Params::default()).expect("analysis failed");
    assert_eq!(ana.matches_found,0);
    assert_eq!(ana.recommendation,Recommendation::Random);
    // nothing saved, only framing overhead predicted
    assert!(ana.estimated_compression_ratio < 1.0);
    assert!(ana.patterns.is_empty());
}
