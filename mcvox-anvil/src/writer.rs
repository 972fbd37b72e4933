use mcvox_grid::VoxelAccessor;

/// The seam between decoding and storage: forwards voxels into whatever
/// accessor the caller supplied, dropping air (global id 0) so only real
/// blocks ever reach the sparse grid.
#[derive(Debug)]
pub struct VoxelWriter<'a, A: VoxelAccessor> {
    accessor: &'a mut A,
    written: u64,
}

impl<'a, A: VoxelAccessor> VoxelWriter<'a, A> {
    pub fn new(accessor: &'a mut A) -> Self {
        Self {
            accessor,
            written: 0,
        }
    }

    pub fn write(&mut self, x: i32, y: i32, z: i32, value: i32) {
        if value == 0 {
            return;
        }
        self.accessor.set_voxel(x, y, z, value);
        self.written += 1;
    }

    /// Number of voxels that actually reached the accessor.
    pub fn written(&self) -> u64 {
        self.written
    }
}
