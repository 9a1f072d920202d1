use std::borrow::Borrow;

use rand::Rng;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// Reciprocal of the per-level promotion probability.
const BRANCHING: u32 = 4;

/// Approximate heap footprint, used for memory accounting.
pub trait ApproxSize {
    fn approx_size(&self) -> usize;
}

impl ApproxSize for Vec<u8> {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

/// A single node in the skip list.
///
/// Each node has `height` forward links. Level 0 contains all nodes
/// (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
struct SkipNode<K, V> {
    key: K,
    value: V,
    forward: Vec<Option<usize>>,
}

/// Arena-allocated sorted map. Links are indices into `nodes`, so there is
/// no unsafe code and nodes are never freed individually; rebuild the list
/// to reclaim space.
///
/// Average case: O(log n) insert, lookup and predecessor search; O(n)
/// iteration along level 0.
pub struct SkipList<K, V> {
    nodes: Vec<SkipNode<K, V>>,
    head: [Option<usize>; MAX_HEIGHT],
    height: usize,
    size_bytes: usize,
}

impl<K: Ord + ApproxSize, V: ApproxSize> SkipList<K, V> {
    pub fn new() -> Self {
        SkipList {
            nodes: Vec::new(),
            head: [None; MAX_HEIGHT],
            height: 1,
            size_bytes: 0,
        }
    }

    fn link(&self, from: Option<usize>, level: usize) -> Option<usize> {
        match from {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    fn set_link(&mut self, from: Option<usize>, level: usize, to: Option<usize>) {
        match from {
            None => self.head[level] = to,
            Some(idx) => self.nodes[idx].forward[level] = to,
        }
    }

    /// For every level, the last node whose key is < `key` (`None` = head).
    fn predecessors<Q>(&self, key: &Q) -> [Option<usize>; MAX_HEIGHT]
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut preds = [None; MAX_HEIGHT];
        let mut current = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.link(current, level) {
                if self.nodes[next].key.borrow() < key {
                    current = Some(next);
                } else {
                    break;
                }
            }
            preds[level] = current;
        }
        preds
    }

    /// Insert `key`, returning the previous value if the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        // Levels above the current height keep `None`: their predecessor is the head.
        let preds = self.predecessors(&key);

        if let Some(existing) = self.link(preds[0], 0) {
            if self.nodes[existing].key == key {
                let node = &mut self.nodes[existing];
                self.size_bytes = self.size_bytes + value.approx_size() - node.value.approx_size();
                return Some(std::mem::replace(&mut node.value, value));
            }
        }

        let height = random_height();
        self.height = self.height.max(height);

        let idx = self.nodes.len();
        self.size_bytes += key.approx_size() + value.approx_size();
        let forward = (0..height).map(|level| self.link(preds[level], level)).collect();
        self.nodes.push(SkipNode { key, value, forward });
        for (level, pred) in preds.iter().enumerate().take(height) {
            self.set_link(*pred, level, Some(idx));
        }
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.seek(key)?;
        let node = &self.nodes[idx];
        (node.key.borrow() == key).then_some(&node.value)
    }

    /// Index of the first entry with key >= `key`.
    pub fn seek<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let preds = self.predecessors(key);
        self.link(preds[0], 0)
    }

    /// Index of the last entry with key < `key`.
    pub fn find_less_than<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.predecessors(key)[0]
    }

    pub fn first(&self) -> Option<usize> {
        self.head[0]
    }

    pub fn last(&self) -> Option<usize> {
        let mut current = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.link(current, level) {
                current = Some(next);
            }
        }
        current
    }

    pub fn next_of(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].forward[0]
    }

    pub fn entry(&self, idx: usize) -> (&K, &V) {
        let node = &self.nodes[idx];
        (&node.key, &node.value)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Key and value bytes held, plus a fixed per-node overhead.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes + self.nodes.len() * std::mem::size_of::<SkipNode<K, V>>()
    }

    /// In-order iterator along level 0.
    pub fn iter(&self) -> SkipListIterator<'_, K, V> {
        SkipListIterator {
            list: self,
            current: self.first(),
        }
    }

    /// Consume the list, yielding entries in key order.
    pub fn into_sorted_vec(self) -> Vec<(K, V)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut current = self.first();
        while let Some(idx) = current {
            order.push(idx);
            current = self.nodes[idx].forward[0];
        }
        let mut slots: Vec<Option<(K, V)>> = self
            .nodes
            .into_iter()
            .map(|node| Some((node.key, node.value)))
            .collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }
}

impl<K: Ord + ApproxSize, V: ApproxSize> Default for SkipList<K, V> {
    fn default() -> Self {
        SkipList::new()
    }
}

impl<K: Ord + ApproxSize, V: ApproxSize> FromIterator<(K, V)> for SkipList<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut list = SkipList::new();
        for (key, value) in iter {
            list.insert(key, value);
        }
        list
    }
}

/// Each extra level has a 1/4 chance, capped at `MAX_HEIGHT`.
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 1;
    while height < MAX_HEIGHT && rng.gen_ratio(1, BRANCHING) {
        height += 1;
    }
    height
}

/// Follows level 0 links; level 0 is a sorted list of every entry.
pub struct SkipListIterator<'a, K, V> {
    list: &'a SkipList<K, V>,
    current: Option<usize>,
}

impl<'a, K, V> Iterator for SkipListIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.current?];
        self.current = node.forward[0];
        Some((&node.key, &node.value))
    }
}
