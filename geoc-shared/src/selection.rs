/// Indices selected in the UI, per entity category, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    pub vectors: Vec<u32>,
    pub shapes: Vec<u32>,
    pub cameras: Vec<u32>,
}

impl SelectionSet {
    pub fn new(vectors: Vec<u32>, shapes: Vec<u32>, cameras: Vec<u32>) -> Self {
        Self { vectors, shapes, cameras }
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty() && self.shapes.is_empty() && self.cameras.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vectors.len() + self.shapes.len() + self.cameras.len()
    }

    /// Vectors, then shapes, then cameras: the array the guest receives.
    pub fn combined(&self) -> Vec<u32> {
        let mut all = Vec::with_capacity(self.len());
        all.extend_from_slice(&self.vectors);
        all.extend_from_slice(&self.shapes);
        all.extend_from_slice(&self.cameras);
        all
    }

    /// `(vector_count << 16) + shape_count`, letting the guest split the
    /// combined array back into categories.
    pub fn packed_counts(&self) -> u32 {
        ((self.vectors.len() as u32) << 16).wrapping_add(self.shapes.len() as u32)
    }

    /// Camera the view should follow, or -1 when none is selected.
    pub fn last_camera(&self) -> i32 {
        self.cameras.last().map_or(-1, |&c| c as i32)
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
        self.shapes.clear();
        self.cameras.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_order_and_counts() {
        let sel = SelectionSet::new(vec![0, 2], vec![1], vec![3, 0]);
        assert_eq!(sel.combined(), vec![0, 2, 1, 3, 0]);
        assert_eq!(sel.packed_counts(), (2 << 16) + 1);
        assert_eq!(sel.last_camera(), 0);
        assert_eq!(sel.len(), 5);
    }

    #[test]
    fn test_empty_selection() {
        let mut sel = SelectionSet::new(vec![4], vec![], vec![]);
        assert!(!sel.is_empty());
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.packed_counts(), 0);
        assert_eq!(sel.last_camera(), -1);
    }
}
