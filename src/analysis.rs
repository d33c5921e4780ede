//! Byte-frequency analysis shared by the codecs and their analyzers.

/// Count of each byte value in the buffer; absent bytes stay zero.
pub fn frequency_table(dat: &[u8]) -> [u64;256] {
    let mut freq = [0u64;256];
    for &b in dat {
        freq[b as usize] += 1;
    }
    freq
}

pub fn unique_bytes(freq: &[u64;256]) -> usize {
    freq.iter().filter(|&&f| f > 0).count()
}

/// Most frequent byte value, lowest value winning ties.
pub fn most_common_byte(freq: &[u64;256]) -> Option<(u8,u64)> {
    let mut best: Option<(u8,u64)> = None;
    for (val,&count) in freq.iter().enumerate() {
        if count > 0 && best.map_or(true,|(_,c)| count > c) {
            best = Some((val as u8,count));
        }
    }
    best
}

/// The `n` most frequent byte values, highest count first,
/// lowest value winning ties.
pub fn top_bytes(freq: &[u64;256],n: usize) -> Vec<(u8,u64)> {
    let mut present: Vec<(u8,u64)> = freq.iter().enumerate()
        .filter(|(_,&f)| f > 0)
        .map(|(val,&f)| (val as u8,f))
        .collect();
    present.sort_by(|a,b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    present.truncate(n);
    present
}

/// Shannon entropy of the byte distribution in bits per byte.
/// Ranges over [0,8]: 0 for a constant buffer, 8 when all 256 values
/// are equiprobable.
pub fn entropy(freq: &[u64;256],total: usize) -> f64 {
    let mut ans = 0.0;
    for &count in freq.iter() {
        if count > 0 {
            let p = count as f64 / total as f64;
            ans -= p * p.log2();
        }
    }
    ans
}

/// Compression ratio (original over compressed) and space saved percent.
pub fn ratios(original: usize,compressed: usize) -> (f64,f64) {
    let ratio = match compressed > 0 {
        true => original as f64 / compressed as f64,
        false => 0.0
    };
    let saved = (original as f64 - compressed as f64) / original as f64 * 100.0;
    (ratio,saved)
}

/// Render a byte the way reports expect: printable ASCII as itself,
/// everything else as a hex escape.
pub fn display_byte(b: u8) -> String {
    match (32..=126).contains(&b) {
        true => (b as char).to_string(),
        false => format!("\\x{:02x}",b)
    }
}

#[test]
fn entropy_bounds() {
    let constant = vec![0x41u8;500];
    let freq = frequency_table(&constant);
    assert_eq!(entropy(&freq,constant.len()),0.0);

    let all: Vec<u8> = (0..=255).collect();
    let freq = frequency_table(&all);
    assert!((entropy(&freq,all.len()) - 8.0).abs() < 1e-9);

    let mixed = b"abcabcabd";
    let freq = frequency_table(mixed);
    let h = entropy(&freq,mixed.len());
    assert!(h > 0.0 && h < 8.0);
}

#[test]
fn frequency_ordering() {
    let dat = b"aaabbc";
    let freq = frequency_table(dat);
    assert_eq!(unique_bytes(&freq),3);
    assert_eq!(most_common_byte(&freq),Some((b'a',3)));
    assert_eq!(top_bytes(&freq,2),vec![(b'a',3),(b'b',2)]);
}

#[test]
fn tie_breaks_are_stable() {
    let dat = b"zzaa";
    let freq = frequency_table(dat);
    assert_eq!(most_common_byte(&freq),Some((b'a',2)));
    assert_eq!(top_bytes(&freq,5),vec![(b'a',2),(b'z',2)]);
}

#[test]
fn byte_rendering() {
    assert_eq!(display_byte(b'A'),"A");
    assert_eq!(display_byte(0x00),"\\x00");
    assert_eq!(display_byte(0xFF),"\\xff");
}
