//! This helper function is part of the huffman encoding system.
//!
//! The main huffman encoding function accumulates symbol frequencies for each table. This helper
//! turns those frequencies into code lengths (depths in a huffman tree). The encoder keeps codes to
//! at most 17 bits. If the weights supplied create longer codes, the weights are flattened and
//! another attempt is made.
//!
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug)]
enum NodeData {
    Kids(Box<Node>, Box<Node>),
    Leaf(u16),
}

#[derive(Debug)]
struct Node {
    weight: u64,
    depth: u8,
    node_data: NodeData,
}

impl Node {
    fn new(weight: u64, depth: u8, node_data: NodeData) -> Node {
        Node {
            weight,
            depth,
            node_data,
        }
    }
}

// BinaryHeap is a max-heap; reverse so the lightest (then shallowest) node pops first.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then(other.depth.cmp(&self.depth))
    }
}
impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Node {}

/// Build code lengths for every symbol in `sym_weight` (one entry per symbol of the alphabet,
/// zero weights allowed) with no code longer than `max_len` bits.
pub fn code_len_from_weights(sym_weight: &[u32], max_len: u8) -> Vec<u8> {
    // A zero weight still needs a code, so every symbol starts with a weight of at least 1.
    let mut weight: Vec<u64> = sym_weight.iter().map(|&f| f.max(1) as u64).collect();
    let mut lengths = vec![0_u8; sym_weight.len()];
    if sym_weight.len() < 2 {
        lengths.iter_mut().for_each(|l| *l = 1);
        return lengths;
    }

    loop {
        let mut tree: BinaryHeap<Node> = weight
            .iter()
            .enumerate()
            .map(|(i, &w)| Node::new(w, 0, NodeData::Leaf(i as u16)))
            .collect();

        // Pare it down to one single node with child nodes.
        while tree.len() > 1 {
            let (Some(left), Some(right)) = (tree.pop(), tree.pop()) else {
                break;
            };
            tree.push(Node::new(
                left.weight + right.weight,
                left.depth.max(right.depth) + 1,
                NodeData::Kids(Box::new(left), Box::new(right)),
            ));
        }
        let Some(root) = tree.pop() else {
            return lengths;
        };

        if root.depth <= max_len {
            return_leaves(&root, 0, &mut lengths);
            return lengths;
        }
        // Too deep. Flatten the weights (divide by 2, add 1) and try again.
        for w in weight.iter_mut() {
            *w = 1 + *w / 2;
        }
    }
}

/// Recursively walk the tree and record how far (deep) from the root node each leaf is.
fn return_leaves(node: &Node, depth: u8, lengths: &mut [u8]) {
    match &node.node_data {
        NodeData::Kids(left_child, right_child) => {
            return_leaves(left_child, depth + 1, lengths);
            return_leaves(right_child, depth + 1, lengths);
        }
        NodeData::Leaf(sym) => {
            lengths[*sym as usize] = depth;
        }
    };
}

#[cfg(test)]
mod test {
    use super::code_len_from_weights;

    fn kraft(lengths: &[u8]) -> f64 {
        lengths.iter().map(|&l| 0.5_f64.powi(l as i32)).sum()
    }

    #[test]
    fn simple_lengths_test() {
        let lengths = code_len_from_weights(&[10, 1, 1, 20], 17);
        assert_eq!(lengths, vec![2, 3, 3, 1]);
        assert!((kraft(&lengths) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_still_get_codes_test() {
        let lengths = code_len_from_weights(&[0, 0, 0, 50, 0], 17);
        assert!(lengths.iter().all(|&l| l >= 1));
        assert!((kraft(&lengths) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn length_limit_test() {
        // Fibonacci weights make a maximally skewed tree.
        let mut fib = vec![1_u32, 1];
        while fib.len() < 30 {
            let n = fib[fib.len() - 1] + fib[fib.len() - 2];
            fib.push(n);
        }
        let lengths = code_len_from_weights(&fib, 17);
        assert!(lengths.iter().all(|&l| (1..=17).contains(&l)));
        assert!(kraft(&lengths) <= 1.0 + 1e-12);
    }
}
