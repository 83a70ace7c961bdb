use crate::types::Color;

/// A raster being composited; one packed RGBA color per pixel.
pub type Canvas = Grid<Color>;

/// Row-major rectangular buffer. Every access is bounds-checked: reads outside
/// the grid return `None`, writes outside the grid are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Reallocates to the new dimensions. Prior contents are discarded.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, T::default());
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    pub fn fill(&mut self, value: T) {
        for cell in &mut self.cells {
            *cell = value.clone();
        }
    }
}

impl<T> Grid<T> {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
        }
    }

    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Option<Self> {
        if cells.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_valid(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some()
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        self.index(x, y).map(|idx| &self.cells[idx])
    }

    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut T> {
        self.index(x, y).map(|idx| &mut self.cells[idx])
    }

    /// Returns false when `(x, y)` is outside the grid and nothing was written.
    pub fn set(&mut self, x: i64, y: i64, value: T) -> bool {
        match self.get_mut(x, y) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, y: usize) -> Option<&[T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        Some(&self.cells[start..start + self.width])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn into_vec(self) -> Vec<T> {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_is_checked_on_every_coordinate() {
        let mut grid: Grid<u8> = Grid::new(3, 2);
        for y in -3i64..6 {
            for x in -3i64..6 {
                let inside = (0..3).contains(&x) && (0..2).contains(&y);
                assert_eq!(grid.is_valid(x, y), inside, "({x},{y})");
                assert_eq!(grid.get(x, y).is_some(), inside);
                assert_eq!(grid.set(x, y, 9), inside);
            }
        }
        assert!(grid.as_slice().iter().all(|v| *v == 9));
    }

    #[test]
    fn storage_is_row_major() {
        let mut grid: Grid<u32> = Grid::new(4, 3);
        grid.set(1, 2, 42);
        assert_eq!(grid.as_slice()[2 * 4 + 1], 42);
        assert_eq!(grid.row(2), Some(&[0, 42, 0, 0][..]));
        assert_eq!(grid.row(3), None);
    }

    #[test]
    fn resize_discards_contents() {
        let mut grid = Grid::filled(2, 2, 7u8);
        grid.resize(3, 1);
        assert_eq!((grid.width(), grid.height()), (3, 1));
        assert_eq!(grid.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn empty_grid_rejects_all_access() {
        let grid: Grid<String> = Grid::empty();
        assert!(grid.is_empty());
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.rows().count(), 0);
    }

    #[test]
    fn from_vec_requires_matching_length() {
        assert!(Grid::from_vec(2, 2, vec![1, 2, 3]).is_none());
        let grid = Grid::from_vec(2, 2, vec![1, 2, 3, 4]).expect("grid");
        assert_eq!(grid.get(1, 1), Some(&4));
    }
}
