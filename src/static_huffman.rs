//! Two-pass static Huffman coding with a canonical-code, self-describing
//! header. Mirrors `static_encoding.h`'s `buildTree`/`buildCodes`/
//! `transformCodes`/`encodeStatic`/`decodeStatic` pipeline, with the decode
//! side's index arithmetic replaced by the standard cumulative
//! `first_code[L]`/`first_symbol_index[L]` canonical-decode table (see
//! `DESIGN.md` for why).

use crate::bitio::{BitReader, BitWriter};
use crate::model::Model;
use crate::tools::tree::{Side, Tree};
use crate::Error;

struct NodeData {
    symbol: u16,
    weight: u64,
}

fn histogram(data: &[u8]) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    hist
}

/// Build a Huffman tree from a histogram. Ties among equal weights are
/// broken by insertion order (ascending symbol value, then by combination
/// order), which is deterministic but otherwise arbitrary, per spec §4.6.
fn build_tree(hist: &[u64; 256]) -> Tree<NodeData> {
    let mut heap: Vec<Tree<NodeData>> = Vec::new();
    for (sym, &w) in hist.iter().enumerate() {
        if w > 0 {
            heap.push(Tree::from_leaf(NodeData { symbol: sym as u16, weight: w }));
        }
    }
    if heap.len() == 1 {
        // Dummy leaf so a single-symbol image still has a code of length >= 1.
        // Its value must differ from the one real symbol or the two would
        // collide in the header's symbol table.
        let real = heap[0].value(heap[0].root()).symbol;
        let dummy = ((real as u16 + 1) % 256) as u16;
        heap.push(Tree::from_leaf(NodeData { symbol: dummy, weight: 1 }));
    }
    // Linear-scan "heap": image alphabets are at most 256 symbols, so an
    // O(n^2) selection is simpler than a real binary heap and fast enough.
    while heap.len() > 1 {
        let (mut ia, mut ib) = (0, 1);
        if heap[ib].value(heap[ib].root()).weight < heap[ia].value(heap[ia].root()).weight {
            std::mem::swap(&mut ia, &mut ib);
        }
        for i in 2..heap.len() {
            let w = heap[i].value(heap[i].root()).weight;
            if w < heap[ia].value(heap[ia].root()).weight {
                ib = ia;
                ia = i;
            } else if w < heap[ib].value(heap[ib].root()).weight {
                ib = i;
            }
        }
        let (hi, lo) = if ia > ib { (ia, ib) } else { (ib, ia) };
        let right = heap.remove(hi);
        let left = heap.remove(lo);
        let weight = left.value(left.root()).weight + right.value(right.root()).weight;
        let mut merged = Tree::from_leaf(NodeData { symbol: 0, weight });
        merged.graft(merged.root(), left, Side::Left);
        merged.graft(merged.root(), right, Side::Right);
        heap.push(merged);
    }
    heap.pop().expect("at least one symbol present")
}

fn build_codes(tree: &Tree<NodeData>) -> Vec<(u16, Vec<bool>)> {
    let mut out = Vec::new();
    tree.depth_first(|idx, data| {
        if tree.is_leaf(idx) {
            out.push((data.symbol, tree.path_from_root(idx)));
        }
    });
    out
}

/// Canonicalise: sort by code length ascending, then reassign codes so the
/// shortest is all zeros and each later code is `(prev + 1) << (len - prevlen)`.
fn canonicalize(mut codes: Vec<(u16, Vec<bool>)>) -> Vec<(u16, Vec<bool>)> {
    codes.sort_by_key(|(_, c)| c.len());
    if codes.is_empty() {
        return codes;
    }
    let shortest_len = codes[0].1.len();
    codes[0].1 = vec![false; shortest_len];
    if codes.len() == 1 {
        return codes;
    }
    let mut prev_len = codes[0].1.len();
    let mut prev_code: u64 = 0;
    for i in 1..codes.len() {
        let len = codes[i].1.len();
        let code = (prev_code + 1) << (len - prev_len);
        codes[i].1 = bits_of(code, len);
        prev_code = code;
        prev_len = len;
    }
    codes
}

fn bits_of(value: u64, len: usize) -> Vec<bool> {
    (0..len).rev().map(|i| (value >> i) & 1 == 1).collect()
}

pub fn encode(data: &[u8], mut model: Model) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let transformed: Vec<u8> = data.iter().map(|&v| model.apply(v)).collect();
    let hist = histogram(&transformed);
    let tree = build_tree(&hist);
    let codes = canonicalize(build_codes(&tree));

    let min_len = codes.iter().map(|(_, c)| c.len()).min().unwrap();
    let max_len = codes.iter().map(|(_, c)| c.len()).max().unwrap();

    let mut by_length: Vec<Vec<u16>> = vec![Vec::new(); max_len + 1];
    let mut table: std::collections::HashMap<u8, Vec<bool>> = std::collections::HashMap::new();
    for (sym, code) in &codes {
        by_length[code.len()].push(*sym);
        table.insert(*sym as u8, code.clone());
    }
    for bucket in by_length.iter_mut() {
        bucket.sort();
    }

    let mut header_counts = Vec::new();
    for len in min_len..=max_len {
        let count = by_length[len].len();
        // A single code length can only ever hold all 256 symbols once
        // length reaches 8 (2^8 == 256 distinct leaves); that is the one
        // length at which the stored count byte needs the 255-means-256
        // escape, since 256 itself does not fit in a u8.
        let byte = if count == 256 && len == 8 { 255 } else { count as u8 };
        header_counts.push(byte);
    }

    let mut body = BitWriter::new();
    for &v in &transformed {
        body.push_code(&table[&v]);
    }
    let padding = body.pad_to_byte() as u8;
    let payload = body.release();

    let mut out = Vec::with_capacity(2 + header_counts.len() + payload.len());
    out.push((max_len + 1) as u8);
    out.push(((padding << 5) & 0xE0) | ((min_len - 1) as u8 & 0x1F));
    out.extend_from_slice(&header_counts);
    for len in min_len..=max_len {
        for &sym in &by_length[len] {
            out.push(sym as u8);
        }
    }
    out.extend_from_slice(&payload);
    out
}

pub fn decode(data: &[u8], mut model: Model) -> Result<Vec<u8>, Error> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() < 2 {
        return Err(Error::UnexpectedEnd("static header truncated".into()));
    }
    if data[0] == 0 {
        return Err(Error::InvalidHeader("max_len_plus_one cannot be zero".into()));
    }
    let max_len = data[0] as usize - 1;
    if max_len == 0 {
        return Err(Error::InvalidHeader("max code length cannot be zero".into()));
    }
    let padding = (data[1] >> 5) as usize;
    let min_len = (data[1] & 0x1F) as usize + 1;
    if min_len > max_len {
        return Err(Error::InvalidHeader("min code length exceeds max".into()));
    }

    let num_lengths = max_len - min_len + 1;
    let mut pos = 2usize;
    if data.len() < pos + num_lengths {
        return Err(Error::UnexpectedEnd("length table truncated".into()));
    }
    let mut counts = Vec::with_capacity(num_lengths);
    for i in 0..num_lengths {
        let raw = data[pos + i];
        let len = min_len + i;
        let count = if raw == 255 && len == 8 { 256 } else { raw as usize };
        counts.push(count);
    }
    pos += num_lengths;

    let mut symbols = Vec::new();
    for &count in &counts {
        if data.len() < pos + count {
            return Err(Error::UnexpectedEnd("symbol table truncated".into()));
        }
        symbols.extend_from_slice(&data[pos..pos + count]);
        pos += count;
    }

    // Cumulative canonical-decode tables: for each length L, `first_code[L]`
    // is the smallest code value at that length and `first_symbol_index[L]`
    // is the index into `symbols` of the first symbol at that length.
    let mut first_code = vec![0u64; max_len + 1];
    let mut first_symbol_index = vec![0usize; max_len + 1];
    let mut code = 0u64;
    let mut index = 0usize;
    for len in min_len..=max_len {
        first_code[len] = code;
        first_symbol_index[len] = index;
        let count = counts[len - min_len];
        index += count;
        code = (code + count as u64) << 1;
    }

    let payload = &data[pos..];
    if payload.is_empty() {
        return Err(Error::UnexpectedEnd("no payload bytes".into()));
    }
    let total_bits = payload.len() * 8 - padding;
    let reader = BitReader::new(payload);

    let mut output = Vec::new();
    let mut bits_read = 0usize;
    let mut code_so_far = 0u64;
    let mut bit_pos = 0usize;
    while bit_pos < total_bits {
        let bit = reader.get_bit(bit_pos);
        bit_pos += 1;
        code_so_far = (code_so_far << 1) | (bit as u64);
        bits_read += 1;
        if bits_read > max_len {
            return Err(Error::CorruptCode("no code matched within max length".into()));
        }
        if bits_read >= min_len {
            let count = counts[bits_read - min_len] as u64;
            if code_so_far < first_code[bits_read] + count {
                let idx = first_symbol_index[bits_read] + (code_so_far - first_code[bits_read]) as usize;
                if idx >= symbols.len() {
                    return Err(Error::CorruptCode("decoded index exceeds symbol table".into()));
                }
                output.push(symbols[idx]);
                bits_read = 0;
                code_so_far = 0;
            }
        }
    }
    if bits_read != 0 {
        return Err(Error::UnexpectedEnd("payload ended mid-code".into()));
    }

    Ok(output.into_iter().map(|v| model.revert(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    #[test]
    fn round_trips_repeated_byte() {
        let data = vec![0x42u8; 64];
        let enc = encode(&data, Model::new(ModelKind::Identity));
        let dec = decode(&enc, Model::new(ModelKind::Identity)).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn round_trips_varied_bytes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2000).collect();
        let enc = encode(&data, Model::new(ModelKind::Identity));
        let dec = decode(&enc, Model::new(ModelKind::Identity)).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn round_trips_with_neighbour_difference_model() {
        let data: Vec<u8> = (0..200u8).map(|i| (i * 37) % 256u16 as u8).collect();
        let enc = encode(&data, Model::new(ModelKind::NeighbourDifference));
        let dec = decode(&enc, Model::new(ModelKind::NeighbourDifference)).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn empty_input_round_trips_to_empty() {
        let enc = encode(&[], Model::new(ModelKind::Identity));
        assert!(enc.is_empty());
        let dec = decode(&enc, Model::new(ModelKind::Identity)).unwrap();
        assert!(dec.is_empty());
    }

    #[test]
    fn single_symbol_255_does_not_collide_with_dummy() {
        let data = vec![255u8; 10];
        let enc = encode(&data, Model::new(ModelKind::Identity));
        let dec = decode(&enc, Model::new(ModelKind::Identity)).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn single_symbol_gets_dummy_second_leaf() {
        let data = vec![7u8; 10];
        let enc = encode(&data, Model::new(ModelKind::Identity));
        assert_eq!(enc[0], 2); // max_code_length + 1 == 2 => max_code_length == 1
        let dec = decode(&enc, Model::new(ModelKind::Identity)).unwrap();
        assert_eq!(dec, data);
    }

    #[test]
    fn zero_max_len_header_byte_is_invalid_header_not_a_panic() {
        let corrupt = vec![0u8, 0u8, 0u8];
        let err = decode(&corrupt, Model::new(ModelKind::Identity)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }
}
