//! Tabulated transfer blocks
//!
//! Block `(i, j)` is an `xfer` code-model source controlled by the incident
//! node of port `j` and driving the link `(i, j)` of port `i`'s chain. The
//! chain links of port `i` are in series, so the reflected node of port `i`
//! sees the sum of `S_ij * a_j` over every `j`.

use std::fmt;

use ndarray::{ArrayView1, ArrayView3};
use num_complex::Complex64;

use super::element::{format_number, Element};
use super::nodes::{Node, NodeMap};

/// `.model xfer<k> xfer R_I=true table=[...]`, a view over one S entry
#[derive(Debug, Clone)]
pub struct TransferModel<'a> {
    index: usize,
    f: &'a [f64],
    values: ArrayView1<'a, Complex64>,
}

impl<'a> TransferModel<'a> {
    /// `f` and `values` must have the same length
    pub fn new(index: usize, f: &'a [f64], values: ArrayView1<'a, Complex64>) -> Self {
        debug_assert_eq!(f.len(), values.len());
        Self { index, f, values }
    }

    pub fn name(&self) -> String {
        format!("xfer{}", self.index)
    }

    /// Number of table rows
    #[inline]
    pub fn len(&self) -> usize {
        self.f.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.f.is_empty()
    }

    /// `(frequency, value)` rows in table order
    pub fn samples(&self) -> impl Iterator<Item = (f64, Complex64)> + '_ {
        self.f.iter().copied().zip(self.values.iter().copied())
    }
}

impl fmt::Display for TransferModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".model {} xfer R_I=true table=[", self.name())?;
        for (freq, v) in self.samples() {
            writeln!(
                f,
                "+ {} {} {}",
                format_number(freq),
                format_number(v.re),
                format_number(v.im)
            )?;
        }
        write!(f, "+ ]")
    }
}

/// The source element of block `(i, j)` and its model
#[derive(Debug, Clone)]
pub struct TransferBlock<'a> {
    /// Output port
    pub port: usize,
    /// Source port
    pub source: usize,
    pub element: Element,
    pub model: TransferModel<'a>,
}

impl<'a> TransferBlock<'a> {
    /// Block `(i, j)` over the `S[:, i-1, j-1]` column of `s`
    pub fn new(map: &NodeMap, i: usize, j: usize, f: &'a [f64], s: ArrayView3<'a, Complex64>) -> Self {
        let model = TransferModel::new(
            map.model_index(i, j),
            f,
            s.slice_move(ndarray::s![.., i - 1, j - 1]),
        );
        let out = map.id(Node::Chain(i, j));
        let element = Element::Xfer {
            name: out.to_string(),
            ctrl: (
                map.id(Node::Incident(j)).to_string(),
                map.id(Node::Reference).to_string(),
            ),
            out: (out.to_string(), map.id(map.block_output(i, j)).to_string()),
            model: model.name(),
        };

        Self {
            port: i,
            source: j,
            element,
            model,
        }
    }
}

impl fmt::Display for TransferBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.element)?;
        writeln!(f, "{}", self.model)
    }
}

/// Every block of an N-port, row-major over `(i, j)`
pub fn transfer_blocks<'a>(
    map: &NodeMap,
    f: &'a [f64],
    s: ArrayView3<'a, Complex64>,
) -> Vec<TransferBlock<'a>> {
    let n = map.nports();
    (1..=n)
        .flat_map(|i| (1..=n).map(move |j| (i, j)))
        .map(|(i, j)| TransferBlock::new(map, i, j, f, s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_block_wiring() {
        let f = [1e6, 2e6];
        let s = Array3::from_shape_fn((2, 2, 2), |(k, i, j)| {
            Complex64::new(k as f64 + 0.5, (10 * i + j) as f64)
        });
        let map = NodeMap::new(2, 100).unwrap();
        let blocks = transfer_blocks(&map, &f, s.view());

        assert_eq!(blocks.len(), 4);
        assert_eq!(
            blocks[0].element.to_string(),
            "A101 %vd(100 3) %vd(101, 102) xfer1"
        );
        assert_eq!(
            blocks[1].element.to_string(),
            "A102 %vd(200 3) %vd(102, 3) xfer2"
        );
        assert_eq!(
            blocks[2].element.to_string(),
            "A201 %vd(100 3) %vd(201, 202) xfer3"
        );
        assert_eq!((blocks[3].port, blocks[3].source), (2, 2));
    }

    #[test]
    fn test_model_table() {
        let f = [1e6, 2e6];
        let s = Array3::from_shape_fn((2, 2, 2), |(k, i, j)| {
            Complex64::new(k as f64 + 0.5, -((10 * i + j) as f64))
        });
        let map = NodeMap::new(2, 100).unwrap();
        let block = TransferBlock::new(&map, 2, 1, &f, s.view());

        assert_eq!(
            block.to_string(),
            "A201 %vd(100 3) %vd(201, 202) xfer3\n\
             .model xfer3 xfer R_I=true table=[\n\
             + 1000000.0 0.5 -10.0\n\
             + 2000000.0 1.5 -10.0\n\
             + ]\n"
        );
    }
}
