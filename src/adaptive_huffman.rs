//! Adaptive Huffman coding: Vitter's sibling-property-preserving dynamic
//! tree with a Not-Yet-Transmitted (NYT) sentinel leaf. Mirrors the shape
//! of `adaptive_common.h`/`adaptive_encoding.h`/`adaptive_decoding.h`, using
//! the arena `Tree` from `tools::tree` in place of the original's
//! `unique_ptr`/`observer_ptr` graph.

use crate::bitio::{BitReader, BitWriter};
use crate::model::Model;
use crate::tools::tree::{Side, Tree};
use crate::Error;

/// Pseudo-end-of-stream symbol: the 257th member of the domain, only
/// reachable in non-block adaptive coding where no outer framing marks
/// the end of the payload.
pub const PEOF: u16 = 0x1FF;

/// Order of the sole NYT leaf at the start of a stream. Strictly greater
/// than 2*256-1 = 511, the largest order any node in a fully populated
/// 256-symbol tree can reach, so every order assigned during encoding fits
/// underneath it without renumbering.
const INITIAL_NYT_ORDER: i32 = 512;

struct Payload {
    value: u16,
    is_nyt: bool,
    weight: u64,
    order: i32,
}

/// Dynamic Huffman tree shared, unmodified in shape, by the encoder and
/// decoder: feeding the same symbol sequence through `update` on both sides
/// keeps them bit-identical.
pub struct AdaptiveTree {
    tree: Tree<Payload>,
    nyt: usize,
    symbol_nodes: Vec<Option<usize>>,
}

impl AdaptiveTree {
    pub fn new() -> Self {
        let tree = Tree::from_leaf(Payload { value: 0, is_nyt: true, weight: 0, order: INITIAL_NYT_ORDER });
        let nyt = tree.root();
        // Indexed by the raw 9-bit value, which includes PEOF (0x1FF) in
        // non-block mode, not just the 256 pixel values.
        Self { tree, nyt, symbol_nodes: vec![None; (PEOF as usize) + 1] }
    }

    pub fn root(&self) -> usize {
        self.tree.root()
    }

    pub fn nyt(&self) -> usize {
        self.nyt
    }

    fn node_for(&self, symbol: u16) -> Option<usize> {
        self.symbol_nodes[symbol as usize]
    }

    /// Split the NYT leaf to introduce `symbol` for the first time, then
    /// run `slide_and_increment` starting from the new symbol leaf.
    fn introduce(&mut self, symbol: u16) -> usize {
        let old_nyt = self.nyt;
        let old_order = self.tree.value(old_nyt).order;
        let new_nyt = self.tree.push_child(
            old_nyt,
            Payload { value: 0, is_nyt: true, weight: 0, order: old_order - 2 },
            Side::Left,
        );
        let symbol_leaf = self.tree.push_child(
            old_nyt,
            Payload { value: symbol, is_nyt: false, weight: 0, order: old_order - 1 },
            Side::Right,
        );
        self.tree.value_mut(old_nyt).is_nyt = false;
        self.nyt = new_nyt;
        self.symbol_nodes[symbol as usize] = Some(symbol_leaf);
        symbol_leaf
    }

    /// Find the highest-order node sharing `weight`, excluding the root and
    /// the given node's own parent. Mirrors `findNodeForSwap`.
    fn find_node_for_swap(&self, weight: u64, exclude_parent: Option<usize>, node: usize) -> usize {
        let root = self.tree.root();
        let mut best = node;
        let mut best_order = self.tree.value(node).order;
        self.tree.depth_first(|idx, data| {
            if idx == root || Some(idx) == exclude_parent {
                return;
            }
            if data.weight == weight && data.order > best_order {
                best = idx;
                best_order = data.order;
            }
        });
        best
    }

    /// Vitter's slide-and-increment, starting at `start` and walking to the root.
    fn update(&mut self, start: usize) -> Result<(), Error> {
        let mut current = start;
        loop {
            let weight = self.tree.value(current).weight;
            let parent = self.tree.parent(current);
            let swap_target = self.find_node_for_swap(weight, parent, current);
            if swap_target != current {
                self.tree.swap_subtrees(current, swap_target)?;
                let oa = self.tree.value(current).order;
                let ob = self.tree.value(swap_target).order;
                self.tree.value_mut(current).order = ob;
                self.tree.value_mut(swap_target).order = oa;
            }
            self.tree.value_mut(current).weight += 1;
            match self.tree.parent(current) {
                Some(p) => current = p,
                None => break,
            }
        }
        Ok(())
    }

    /// Encode one symbol (or `PEOF`), returning the bits to emit. `PEOF`
    /// is transmitted as the NYT path plus its raw 9-bit value like any
    /// other not-yet-seen symbol, but it never becomes part of the tree:
    /// it marks end-of-stream, so there is no further symbol whose coding
    /// needs it, and the decoder does not add it either.
    pub fn encode_symbol(&mut self, symbol: u16) -> Result<Vec<bool>, Error> {
        let mut bits = Vec::new();
        let leaf = match self.node_for(symbol) {
            Some(leaf) => {
                bits.extend(self.tree.path_from_root(leaf));
                leaf
            }
            None => {
                bits.extend(self.tree.path_from_root(self.nyt));
                for i in (0..9).rev() {
                    bits.push((symbol >> i) & 1 == 1);
                }
                if symbol == PEOF {
                    return Ok(bits);
                }
                self.introduce(symbol)
            }
        };
        self.update(leaf)?;
        Ok(bits)
    }
}

impl Default for AdaptiveTree {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode(data: &[u8], mut model: Model) -> Result<Vec<u8>, Error> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut tree = AdaptiveTree::new();
    let mut out = BitWriter::new();
    for &v in data {
        let symbol = model.apply(v) as u16;
        out.push_code(&tree.encode_symbol(symbol)?);
    }
    out.push_code(&tree.encode_symbol(PEOF)?);
    out.pad_to_byte();
    Ok(out.release())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WalkerState {
    Tree,
    Value,
}

/// Streaming decoder walker, reusable by both non-block and block decoding
/// (the latter carries the tree but drives the walker per-block).
pub struct Decoder {
    tree: AdaptiveTree,
    cursor: usize,
    state: WalkerState,
    value_bits: Vec<bool>,
}

impl Decoder {
    pub fn new() -> Self {
        let tree = AdaptiveTree::new();
        let root = tree.root();
        // The very first symbol of a fresh tree always starts in Value
        // state: the tree is a bare NYT leaf with no branches to descend,
        // so there is nothing for Tree state to walk until a symbol has
        // been introduced. Every later decode (after at least one symbol
        // exists) starts in Tree state, derived here from whether the root
        // is still that same lone NYT leaf.
        let state = if tree.tree.is_leaf(root) && tree.tree.value(root).is_nyt {
            WalkerState::Value
        } else {
            WalkerState::Tree
        };
        Self { tree, cursor: root, state, value_bits: Vec::new() }
    }

    /// Feed one bit; returns `Some(symbol)` when a full symbol (value or
    /// PEOF) has just been decoded, after which the tree is updated to stay
    /// synchronised with the encoder.
    pub fn feed_bit(&mut self, bit: bool) -> Result<Option<u16>, Error> {
        match self.state {
            WalkerState::Value => {
                self.value_bits.push(bit);
                if self.value_bits.len() < 9 {
                    return Ok(None);
                }
                let mut v: u16 = 0;
                for b in self.value_bits.drain(..) {
                    v = (v << 1) | (b as u16);
                }
                self.state = WalkerState::Tree;
                self.cursor = self.tree.root();
                if v != PEOF {
                    let leaf = self.tree.introduce(v);
                    self.tree.update(leaf)?;
                } else {
                    // PEOF never becomes part of the tree; nothing to update.
                }
                return Ok(Some(v));
            }
            WalkerState::Tree => {
                self.cursor = if bit { self.tree.tree.right(self.cursor) } else { self.tree.tree.left(self.cursor) }
                    .ok_or_else(|| Error::CorruptCode("adaptive walk fell off the tree".into()))?;
                if self.tree.tree.is_leaf(self.cursor) {
                    if self.tree.tree.value(self.cursor).is_nyt {
                        self.state = WalkerState::Value;
                        self.value_bits.clear();
                        return Ok(None);
                    }
                    let symbol = self.tree.tree.value(self.cursor).value;
                    self.tree.update(self.cursor)?;
                    self.state = WalkerState::Tree;
                    self.cursor = self.tree.root();
                    return Ok(Some(symbol));
                }
                Ok(None)
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode(data: &[u8], mut model: Model) -> Result<Vec<u8>, Error> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let reader = BitReader::new(data);
    let mut decoder = Decoder::new();
    let mut out = Vec::new();
    for i in 0..reader.len_bits() {
        if let Some(symbol) = decoder.feed_bit(reader.get_bit(i))? {
            if symbol == PEOF {
                return Ok(out);
            }
            out.push(model.revert(symbol as u8));
        }
    }
    Err(Error::UnexpectedEnd("adaptive stream ended without PEOF".into()))
}
