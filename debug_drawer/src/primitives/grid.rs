use std::sync::Arc;

use glam::{Mat4, Quat, UVec3, Vec3};

use super::impl_primitive;
use crate::allocator::DrawAllocator;
use crate::deck::Deck;
use crate::options::DrawOptions;
use crate::output::{Output, ShaderOutput};
use crate::vertex::InstanceData;

/// Chunk shift of resident-cell lists.
const CELL_CHUNK_SHIFT: u32 = 10;

/// Predicate deciding whether a grid cell is resident.
pub type ResidencyFn = Arc<dyn Fn(UVec3) -> bool + Send + Sync>;

/// A 3D grid of `dims` cells starting at `origin`, drawn one box per cell.
///
/// By default every cell is drawn. Cells can be restricted either eagerly
/// ([`with_cells`](Self::with_cells)) or through a residency predicate that
/// is evaluated lazily, or once and cached by
/// [`extract_resident_cells`](Self::extract_resident_cells).
#[derive(Clone)]
pub struct DebugGrid {
    pub origin: Vec3,
    pub cell_size: Vec3,
    pub dims: UVec3,
    pub output: Output,
    pub options: DrawOptions,
    residency: Option<ResidencyFn>,
    valid_cells: Option<Deck<UVec3>>,
    has_valid_cells: bool,
}

impl DebugGrid {
    pub fn new(origin: Vec3, cell_size: Vec3, dims: UVec3) -> Self {
        Self {
            origin,
            cell_size,
            dims,
            output: Output::default(),
            options: DrawOptions::wireframe(),
            residency: None,
            valid_cells: None,
            has_valid_cells: false,
        }
    }

    /// Draw only the cells for which `residency` returns `true`.
    pub fn with_residency<F>(mut self, residency: F) -> Self
    where
        F: Fn(UVec3) -> bool + Send + Sync + 'static,
    {
        self.residency = Some(Arc::new(residency));
        self
    }

    /// Draw exactly `cells`.
    pub fn with_cells(mut self, cells: &[UVec3], allocator: &Arc<DrawAllocator>) -> Self {
        self.valid_cells = (!cells.is_empty()).then(|| {
            let mut deck = Deck::new(CELL_CHUNK_SHIFT, Arc::clone(allocator));
            deck.add_stream(cells);
            deck
        });
        self.has_valid_cells = true;
        self
    }

    /// Whether the resident cell list has been computed or supplied.
    pub fn has_valid_cells(&self) -> bool {
        self.has_valid_cells
    }

    pub fn has_residency(&self) -> bool {
        self.residency.is_some()
    }

    /// Number of resident cells, once computed.
    pub fn valid_cell_count(&self) -> Option<usize> {
        self.has_valid_cells
            .then(|| self.valid_cells.as_ref().map_or(0, Deck::len))
    }

    /// Evaluate the residency predicate over every cell and cache the result.
    ///
    /// Does nothing without a predicate. An empty result releases the list
    /// storage; [`has_valid_cells`](Self::has_valid_cells) is set either way.
    pub fn extract_resident_cells(&mut self, allocator: &Arc<DrawAllocator>) {
        let Some(residency) = self.residency.clone() else {
            return;
        };
        let mut deck = Deck::new(CELL_CHUNK_SHIFT, Arc::clone(allocator));
        deck.extend(CellRange::new(self.dims).filter(|cell| residency(*cell)));
        log::trace!(
            "DebugGrid: {} of {} cells resident",
            deck.len(),
            self.total_cells()
        );
        self.valid_cells = (!deck.is_empty()).then_some(deck);
        self.has_valid_cells = true;
    }

    /// Total cells in the grid volume.
    pub fn total_cells(&self) -> u64 {
        self.dims.x as u64 * self.dims.y as u64 * self.dims.z as u64
    }

    /// Lazily enumerate the cells to draw.
    pub fn cells(&self) -> GridCells<'_> {
        let source = if self.has_valid_cells {
            CellSource::Resident {
                cells: self.valid_cells.as_ref(),
                next: 0,
            }
        } else {
            CellSource::Range {
                range: CellRange::new(self.dims),
                residency: self.residency.as_deref(),
            }
        };
        GridCells { source }
    }

    /// Model matrix mapping the unit cube onto `cell`.
    pub fn cell_transform(&self, cell: UVec3) -> Mat4 {
        let half = self.cell_size * 0.5;
        let center = self.origin + cell.as_vec3() * self.cell_size + half;
        Mat4::from_scale_rotation_translation(half, Quat::IDENTITY, center)
    }

    /// Lazily produce one instance per drawn cell.
    ///
    /// Empty in index mode when the grid carries no picking id.
    pub fn cell_instances(&self, mode: ShaderOutput) -> impl Iterator<Item = InstanceData> + '_ {
        let writes = match mode {
            ShaderOutput::Color => true,
            ShaderOutput::Index => self.output.picking_id(&self.options).is_some(),
        };
        self.cells()
            .take_while(move |_| writes)
            .filter_map(move |cell| {
                InstanceData::new(self.cell_transform(cell), &self.output, &self.options, mode)
            })
    }
}

impl std::fmt::Debug for DebugGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugGrid")
            .field("origin", &self.origin)
            .field("cell_size", &self.cell_size)
            .field("dims", &self.dims)
            .field("output", &self.output)
            .field("options", &self.options)
            .field("has_residency", &self.residency.is_some())
            .field("valid_cells", &self.valid_cell_count())
            .finish()
    }
}

impl_primitive!(DebugGrid, Grid, grids);

/// Every cell of a `dims` volume, x fastest.
#[derive(Debug, Clone)]
struct CellRange {
    dims: UVec3,
    next: u64,
    total: u64,
}

impl CellRange {
    fn new(dims: UVec3) -> Self {
        Self {
            dims,
            next: 0,
            total: dims.x as u64 * dims.y as u64 * dims.z as u64,
        }
    }
}

impl Iterator for CellRange {
    type Item = UVec3;

    fn next(&mut self) -> Option<UVec3> {
        if self.next >= self.total {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let dx = self.dims.x as u64;
        let dy = self.dims.y as u64;
        Some(UVec3::new(
            (i % dx) as u32,
            ((i / dx) % dy) as u32,
            (i / (dx * dy)) as u32,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.next) as usize;
        (remaining, Some(remaining))
    }
}

enum CellSource<'a> {
    Resident {
        cells: Option<&'a Deck<UVec3>>,
        next: usize,
    },
    Range {
        range: CellRange,
        residency: Option<&'a (dyn Fn(UVec3) -> bool + Send + Sync)>,
    },
}

/// Lazy, finite, non-restartable sequence of a grid's drawn cells.
pub struct GridCells<'a> {
    source: CellSource<'a>,
}

impl Iterator for GridCells<'_> {
    type Item = UVec3;

    fn next(&mut self) -> Option<UVec3> {
        match &mut self.source {
            CellSource::Resident { cells, next } => {
                let cell = cells.and_then(|deck| deck.get_flat(*next)).copied()?;
                *next += 1;
                Some(cell)
            }
            CellSource::Range { range, residency } => match residency {
                Some(resident) => range.find(|cell| resident(*cell)),
                None => range.next(),
            },
        }
    }
}
