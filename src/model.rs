//! Stateful per-symbol preprocessing, applied before coding and reverted
//! after decoding. Mirrors `models.h`'s `IdentityModel`/`NeighborDifferenceModel`
//! pair, collapsed into one tagged type (the spec is indifferent between
//! dynamic dispatch and a tagged variant for this capability set).

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModelKind {
    Identity,
    NeighbourDifference,
}

#[derive(Clone, Copy, Debug)]
pub struct Model {
    kind: ModelKind,
    last: u8,
}

impl Model {
    pub fn new(kind: ModelKind) -> Self {
        Self { kind, last: 0 }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Forward transform, called once per symbol in input order.
    pub fn apply(&mut self, v: u8) -> u8 {
        match self.kind {
            ModelKind::Identity => v,
            ModelKind::NeighbourDifference => {
                let out = v.wrapping_sub(self.last);
                self.last = v;
                out
            }
        }
    }

    /// Inverse transform; must be fed the decoded stream in the same order
    /// `apply` saw the original stream.
    pub fn revert(&mut self, v: u8) -> u8 {
        match self.kind {
            ModelKind::Identity => v,
            ModelKind::NeighbourDifference => {
                let out = v.wrapping_add(self.last);
                self.last = out;
                out
            }
        }
    }

    /// Restore `last` to its initial value. Adaptive-blocks coding resets
    /// the model at the start of every block; static and non-block
    /// adaptive coding apply it once across the whole image and never call
    /// this mid-stream.
    pub fn reset(&mut self) {
        self.last = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_a_no_op() {
        let mut m = Model::new(ModelKind::Identity);
        for v in [0u8, 1, 127, 255] {
            assert_eq!(m.apply(v), v);
            assert_eq!(m.revert(v), v);
        }
    }

    #[test]
    fn neighbour_difference_round_trips() {
        let data = [0u8, 255, 0, 1, 200, 3, 3, 3];
        let mut enc = Model::new(ModelKind::NeighbourDifference);
        let applied: Vec<u8> = data.iter().map(|&v| enc.apply(v)).collect();
        let mut dec = Model::new(ModelKind::NeighbourDifference);
        let reverted: Vec<u8> = applied.iter().map(|&v| dec.revert(v)).collect();
        assert_eq!(&reverted[..], &data[..]);
    }

    #[test]
    fn neighbour_difference_wraps_modulo_256() {
        let mut m = Model::new(ModelKind::NeighbourDifference);
        assert_eq!(m.apply(0), 0);
        assert_eq!(m.apply(255), 255); // 255 - 0 = 255
        assert_eq!(m.apply(0), 1); // 0 - 255 mod 256 = 1
    }

    #[test]
    fn reset_clears_state() {
        let mut m = Model::new(ModelKind::NeighbourDifference);
        m.apply(200);
        m.reset();
        assert_eq!(m.apply(5), 5);
    }
}
