//! Huffman coding
//!
//! Static Huffman codec.  The encoder counts byte frequencies, builds a
//! prefix tree with a min-priority queue, and bit-packs the per-byte
//! codes MSB first.  The artifact carries the tree itself, serialized
//! pre-order (`1` + 8 symbol bits for a leaf, `0` followed by both
//! children for an internal node), so the expander needs no side table.
//!
//! Heap ties are broken by an insertion counter, making the artifact
//! bit-identical across runs and across implementations.

use bit_vec::BitVec;
use std::collections::BinaryHeap;
use crate::analysis;
use crate::container;
use crate::tools::bytepack::ByteReader;
use crate::Error;

/// Node in the code tree.  Leaves carry a symbol, internal nodes only a
/// child pair.  The single-symbol tree is an internal root whose sole
/// left child is the unique leaf, giving that symbol the 1-bit code `0`.
struct Node {
    symbol: Option<u8>,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>
}

impl Node {
    fn leaf(symbol: u8) -> Self {
        Self { symbol: Some(symbol), left: None, right: None }
    }
    fn internal(left: Node,right: Node) -> Self {
        Self { symbol: None, left: Some(Box::new(left)), right: Some(Box::new(right)) }
    }
    fn solo_root(leaf: Node) -> Self {
        Self { symbol: None, left: Some(Box::new(leaf)), right: None }
    }
}

/// Entry in the construction queue.  Ordering is reversed so the
/// standard max-heap pops the lowest frequency, with the insertion
/// counter as the secondary key.
struct HeapItem {
    freq: u64,
    seq: u32,
    node: Node
}

impl PartialEq for HeapItem {
    fn eq(&self,other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self,other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self,other: &Self) -> std::cmp::Ordering {
        other.freq.cmp(&self.freq).then(other.seq.cmp(&self.seq))
    }
}

/// Build the code tree over the symbols present in `freq`.
/// The caller guarantees at least one nonzero count.
fn build_tree(freq: &[u64;256]) -> Node {
    let mut heap = BinaryHeap::new();
    let mut seq: u32 = 0;
    for val in 0..=255u8 {
        let f = freq[val as usize];
        if f > 0 {
            heap.push(HeapItem { freq: f, seq, node: Node::leaf(val) });
            seq += 1;
        }
    }
    if heap.len() == 1 {
        let only = heap.pop().expect("heap has one node");
        return Node::solo_root(only.node);
    }
    while heap.len() > 1 {
        let first = heap.pop().expect("heap has two nodes");
        let second = heap.pop().expect("heap has two nodes");
        heap.push(HeapItem {
            freq: first.freq + second.freq,
            seq,
            node: Node::internal(first.node,second.node)
        });
        seq += 1;
    }
    heap.pop().expect("heap has the root").node
}

/// Walk the tree assigning codes, `0` on left descent and `1` on right.
fn assign_codes(node: &Node,prefix: BitVec,table: &mut Vec<Option<BitVec>>) {
    if let Some(symbol) = node.symbol {
        table[symbol as usize] = Some(prefix);
        return;
    }
    if let Some(left) = &node.left {
        let mut code = prefix.clone();
        code.push(false);
        assign_codes(left,code,table);
    }
    if let Some(right) = &node.right {
        let mut code = prefix;
        code.push(true);
        assign_codes(right,code,table);
    }
}

fn serialize_tree(node: &Node,bits: &mut BitVec) {
    if let Some(symbol) = node.symbol {
        bits.push(true);
        for k in (0..8).rev() {
            bits.push(symbol & (1 << k) != 0);
        }
        return;
    }
    match (&node.left,&node.right) {
        (Some(left),Some(right)) => {
            bits.push(false);
            serialize_tree(left,bits);
            serialize_tree(right,bits);
        },
        // the sole-child root serializes as the bare leaf
        (Some(left),None) => serialize_tree(left,bits),
        _ => panic!("unexpected children")
    }
}

fn next_bit(bits: &BitVec,ptr: &mut usize) -> Result<bool,Error> {
    match bits.get(*ptr) {
        Some(b) => {
            *ptr += 1;
            Ok(b)
        },
        None => Err(Error::Corrupt("code tree truncated".to_string()))
    }
}

/// Rebuild the tree from its pre-order bit stream.
/// A valid code is at most 255 bits, so deeper nesting is corruption.
fn parse_tree(bits: &BitVec,ptr: &mut usize,depth: usize) -> Result<Node,Error> {
    if depth > 256 {
        return Err(Error::Corrupt("code tree deeper than the alphabet allows".to_string()));
    }
    if next_bit(bits,ptr)? {
        let mut symbol: u8 = 0;
        for _k in 0..8 {
            symbol = symbol << 1 | next_bit(bits,ptr)? as u8;
        }
        return Ok(Node::leaf(symbol));
    }
    let left = parse_tree(bits,ptr,depth+1)?;
    let right = parse_tree(bits,ptr,depth+1)?;
    Ok(Node::internal(left,right))
}

#[derive(Debug,Clone)]
pub struct CompressStats {
    pub original_size: usize,
    /// tree plus packed payload, excluding container metadata
    pub compressed_size: usize,
    pub artifact_size: usize,
    pub compression_ratio: f64,
    pub space_saved_percent: f64,
    pub symbol_count: usize,
    pub min_code_length: usize,
    pub max_code_length: usize,
    pub mean_code_length: f64
}

#[derive(Debug,Clone)]
pub struct ExpandStats {
    pub original_size: usize,
    pub expanded_size: usize,
    pub total_bits_in_file: usize,
    pub effective_bits: usize,
    pub bits_used: usize,
    pub padding_bits: u8,
    pub symbols_decoded: usize
}

/// Byte-distribution analysis predicting codec effectiveness.
/// The entropy is the lower bound on achievable bits per byte, so the
/// predicted saving is simply how far the distribution sits below 8.
#[derive(Debug,Clone)]
pub struct Analysis {
    pub file_size: usize,
    pub unique_bytes: usize,
    pub entropy: f64,
    pub predicted_bits_per_byte: f64,
    pub predicted_space_saved_percent: f64,
    pub top_bytes: Vec<(u8,u64)>,
    pub recommendation: Recommendation
}

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Recommendation {
    NotRecommended,
    Modest,
    Good,
    HighlyRecommended
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self,f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            Self::NotRecommended => "huffman not recommended - data appears random/already compressed",
            Self::Modest => "huffman may provide modest compression - fairly uniform byte distribution",
            Self::Good => "huffman should provide good compression - skewed byte distribution",
            Self::HighlyRecommended => "huffman highly recommended - highly skewed byte distribution"
        };
        write!(f,"{}",msg)
    }
}

/// Main compression function
pub fn compress(dat: &[u8]) -> Result<(Vec<u8>,CompressStats),Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    if dat.len() > u32::MAX as usize {
        return Err(Error::InvalidParam("input exceeds the 4 GiB container limit".to_string()));
    }
    let freq = analysis::frequency_table(dat);
    let root = build_tree(&freq);
    let mut table: Vec<Option<BitVec>> = vec![None;256];
    assign_codes(&root,BitVec::new(),&mut table);

    let mut payload = BitVec::new();
    for &b in dat {
        let code = table[b as usize].as_ref().expect("every present symbol has a code");
        for bit in code.iter() {
            payload.push(bit);
        }
    }
    let total_bits = payload.len();
    let pad = (8 - total_bits % 8) % 8;
    // to_bytes zero-fills the trailing partial byte
    let packed = payload.to_bytes();

    let mut tree_bits = BitVec::new();
    serialize_tree(&root,&mut tree_bits);
    let tree_bytes = tree_bits.to_bytes();

    let mut artifact = Vec::new();
    artifact.extend_from_slice(&container::HUFFMAN_MAGIC);
    artifact.extend_from_slice(&tree_bytes);
    artifact.extend_from_slice(&u32::to_le_bytes(dat.len() as u32));
    artifact.push(pad as u8);
    artifact.extend_from_slice(&u32::to_le_bytes(packed.len() as u32));
    artifact.extend_from_slice(&packed);

    let lengths: Vec<usize> = table.iter()
        .filter_map(|code| code.as_ref().map(|c| c.len()))
        .collect();
    let compressed_size = tree_bytes.len() + packed.len();
    let (ratio,saved) = analysis::ratios(dat.len(),compressed_size);
    let stats = CompressStats {
        original_size: dat.len(),
        compressed_size,
        artifact_size: artifact.len(),
        compression_ratio: ratio,
        space_saved_percent: saved,
        symbol_count: lengths.len(),
        min_code_length: lengths.iter().copied().min().unwrap_or(0),
        max_code_length: lengths.iter().copied().max().unwrap_or(0),
        mean_code_length: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };
    Ok((artifact,stats))
}

/// Main expansion function
pub fn expand(dat: &[u8]) -> Result<(Vec<u8>,ExpandStats),Error> {
    let body = container::check_magic(dat,&container::HUFFMAN_MAGIC,"huffman")?;
    let bits = BitVec::from_bytes(body);
    let mut ptr = 0;
    let root = parse_tree(&bits,&mut ptr,0)?;
    let root = match root.symbol.is_some() {
        true => Node::solo_root(root),
        false => root
    };
    let mut rd = ByteReader::new(&body[(ptr + 7) / 8..]);
    let original_size = rd.get_u32_le()? as usize;
    let padding = rd.get_u8()?;
    if padding > 7 {
        return Err(Error::Corrupt(format!("padding count {} out of range",padding)));
    }
    let payload_len = rd.get_u32_le()? as usize;
    let payload = BitVec::from_bytes(rd.get_slice(payload_len)?);
    let total_bits = payload.len();
    if padding as usize > total_bits {
        return Err(Error::Corrupt("padding exceeds payload".to_string()));
    }
    let effective = total_bits - padding as usize;

    // sized on demand, the recorded length is not yet trusted
    let mut ans = Vec::new();
    let mut node = &root;
    let mut used = 0;
    while ans.len() < original_size {
        if used >= effective {
            return Err(Error::Corrupt("payload exhausted before expected symbol count".to_string()));
        }
        let bit = payload[used];
        used += 1;
        node = match bit {
            false => node.left.as_deref(),
            true => node.right.as_deref()
        }.ok_or_else(|| Error::Corrupt("walked off the code tree".to_string()))?;
        if let Some(symbol) = node.symbol {
            ans.push(symbol);
            node = &root;
        }
    }
    let stats = ExpandStats {
        original_size,
        expanded_size: ans.len(),
        total_bits_in_file: total_bits,
        effective_bits: effective,
        bits_used: used,
        padding_bits: padding,
        symbols_decoded: ans.len()
    };
    Ok((ans,stats))
}

/// Predict codec effectiveness from the byte distribution alone.
pub fn analyze(dat: &[u8]) -> Result<Analysis,Error> {
    if dat.is_empty() {
        return Err(Error::EmptyInput);
    }
    let freq = analysis::frequency_table(dat);
    let entropy = analysis::entropy(&freq,dat.len());
    let recommendation = if entropy > 7.5 {
        Recommendation::NotRecommended
    } else if entropy >= 6.5 {
        Recommendation::Modest
    } else if entropy >= 4.0 {
        Recommendation::Good
    } else {
        Recommendation::HighlyRecommended
    };
    Ok(Analysis {
        file_size: dat.len(),
        unique_bytes: analysis::unique_bytes(&freq),
        entropy,
        predicted_bits_per_byte: entropy,
        predicted_space_saved_percent: (8.0 - entropy) / 8.0 * 100.0,
        top_bytes: analysis::top_bytes(&freq,5),
        recommendation
    })
}

/// Convenience function, compresses one file into another
pub fn compress_file<P: AsRef<std::path::Path>>(input: P,output: P) -> Result<CompressStats,Error> {
    let dat = std::fs::read(&input)?;
    let (artifact,stats) = compress(&dat)?;
    std::fs::write(&output,&artifact)?;
    log::debug!("huffman packed {} bytes into {}",stats.original_size,stats.artifact_size);
    Ok(stats)
}

/// Convenience function, expands one file into another
pub fn expand_file<P: AsRef<std::path::Path>>(input: P,output: P) -> Result<ExpandStats,Error> {
    let dat = std::fs::read(&input)?;
    let (expanded,stats) = expand(&dat)?;
    std::fs::write(&output,&expanded)?;
    log::debug!("huffman expanded {} bytes into {}",dat.len(),stats.expanded_size);
    Ok(stats)
}

/// Convenience function, analyzes a file at the given path
pub fn analyze_file<P: AsRef<std::path::Path>>(path: P) -> Result<Analysis,Error> {
    let dat = std::fs::read(&path)?;
    analyze(&dat)
}

#[test]
fn single_symbol() {
    let (artifact,stats) = compress(b"aaaa").expect("compression failed");
    // leaf-only tree, 4 one-bit codes, 4 pad bits, single payload byte
    let expected = "48 55 46 31 B0 80 04 00 00 00 04 01 00 00 00 00";
    assert_eq!(artifact,hex::decode(expected.replace(' ',"")).unwrap());
    assert_eq!(stats.symbol_count,1);
    assert_eq!(stats.min_code_length,1);
    assert_eq!(stats.max_code_length,1);

    let (expanded,xstats) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,b"aaaa");
    assert_eq!(xstats.padding_bits,4);
    assert_eq!(xstats.total_bits_in_file,8);
    assert_eq!(xstats.effective_bits,4);
    assert_eq!(xstats.symbols_decoded,4);
}

#[test]
fn two_symbols() {
    let (artifact,stats) = compress(b"abab").expect("compression failed");
    assert_eq!(stats.symbol_count,2);
    assert_eq!(stats.min_code_length,1);
    assert_eq!(stats.max_code_length,1);
    let (expanded,xstats) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,b"abab");
    assert_eq!(xstats.effective_bits,4);
}

#[test]
fn compression_works() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(4);
    let test_data = test_data.as_bytes();
    let (artifact,stats) = compress(test_data).expect("compression failed");
    let (again,_) = compress(test_data).expect("compression failed");
    assert_eq!(artifact,again);
    assert!(stats.compressed_size < stats.original_size);
    let (expanded,_) = expand(&artifact).expect("expansion failed");
    assert_eq!(expanded,test_data);
}

#[test]
fn invertibility() {
    let mut cases: Vec<Vec<u8>> = vec![
        (0..=255).collect(),
        b"abababababab".to_vec(),
        vec![0x00;1000],
        b"The quick brown fox jumps over the lazy dog".to_vec()
    ];
    // deterministic pseudo-random buffer
    let mut state: u32 = 0x2545F491;
    cases.push((0..4096).map(|_| {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (state >> 16) as u8
    }).collect());
    for case in cases {
        let (artifact,_) = compress(&case).expect("compression failed");
        let (expanded,xstats) = expand(&artifact).expect("expansion failed");
        assert_eq!(expanded,case);
        assert!(xstats.total_bits_in_file - xstats.bits_used <= 7);
    }
}

#[test]
fn codes_are_prefix_free() {
    let dat = b"this sentence exercises a reasonable spread of symbol frequencies";
    let freq = analysis::frequency_table(dat);
    let root = build_tree(&freq);
    let mut table: Vec<Option<BitVec>> = vec![None;256];
    assign_codes(&root,BitVec::new(),&mut table);
    let codes: Vec<&BitVec> = table.iter().flatten().collect();
    for (i,a) in codes.iter().enumerate() {
        for (j,b) in codes.iter().enumerate() {
            if i != j && a.len() <= b.len() {
                let prefix: Vec<bool> = b.iter().take(a.len()).collect();
                let full: Vec<bool> = a.iter().collect();
                assert_ne!(prefix,full,"code {} is a prefix of code {}",i,j);
            }
        }
    }
}

#[test]
fn rejects_empty_input() {
    assert!(matches!(compress(b""),Err(Error::EmptyInput)));
    assert!(matches!(analyze(b""),Err(Error::EmptyInput)));
}

#[test]
fn rejects_corrupt_payload() {
    let (mut artifact,_) = compress(b"abcdefgh").expect("compression failed");
    // truncate the payload so the symbol count cannot be reached
    artifact.truncate(artifact.len() - 1);
    match expand(&artifact) {
        Err(Error::Corrupt(_)) => {},
        other => panic!("expected corrupt error, got {:?}",other.map(|(d,_)| d))
    }
}

#[test]
fn missing_input_is_io_error() {
    match compress_file("this_file_does_not_exist","never_written") {
        Err(Error::Io(_)) => {},
        _ => panic!("expected an i/o error")
    }
}

#[test]
fn rejects_wrong_magic() {
    assert!(matches!(expand(b"RLE1whatever"),Err(Error::WrongFormat(_))));
}

#[test]
fn entropy_prediction() {
    let skewed = vec![b'x';900];
    let ana = analyze(&skewed).expect("analysis failed");
    assert_eq!(ana.recommendation,Recommendation::HighlyRecommended);
    assert_eq!(ana.unique_bytes,1);

    let spread: Vec<u8> = (0..=255).cycle().take(4096).collect();
    let ana = analyze(&spread).expect("analysis failed");
    assert_eq!(ana.recommendation,Recommendation::NotRecommended);
    assert!(ana.entropy > 7.5);
}
