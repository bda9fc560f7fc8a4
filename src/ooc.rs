//! Out-of-core serialization of a built tree.
//!
//! Nodes and leaf indices are streamed to a pair of temporary files first,
//! then copied into the final `<name>.node` / `<name>.idx` files, with the
//! header (`<name>`: magic string, version byte, stats) written last so a
//! build that dies partway through leaves an unreadable header rather than a
//! file set that looks complete. Mirrors `VoxelBVH::saveToFile`'s staging
//! through `tempnodes.tmp`/`tempindex.tmp`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};

use crate::error::{BspError, BspResult};
use crate::stats::TreeStats;

pub const MAGIC: &[u8; 8] = b"SUPBSP01";
pub const FILE_VERSION: u8 = 1;

/// Fixed-layout mirror of [`TreeStats`] for the on-disk header. `TreeStats`
/// itself carries a `build_time: Option<Duration>` that has no stable
/// byte representation, so the file format stores milliseconds instead.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FileStats {
    num_nodes: u32,
    num_leaves: u32,
    num_indices: u32,
    num_primitives: u32,
    sum_leaf_depth: u64,
    max_leaf_depth: u32,
    max_leaf_count: u32,
    max_list_length: u32,
    build_time_millis: u64,
}

impl From<TreeStats> for FileStats {
    fn from(s: TreeStats) -> Self {
        FileStats {
            num_nodes: s.num_nodes,
            num_leaves: s.num_leaves,
            num_indices: s.num_indices,
            num_primitives: s.num_primitives,
            sum_leaf_depth: s.sum_leaf_depth,
            max_leaf_depth: s.max_leaf_depth,
            max_leaf_count: s.max_leaf_count,
            max_list_length: s.max_list_length,
            build_time_millis: s.build_time.map_or(0, |d| d.as_millis() as u64),
        }
    }
}

impl FileStats {
    fn into_stats(self) -> TreeStats {
        TreeStats {
            num_nodes: self.num_nodes,
            num_leaves: self.num_leaves,
            num_indices: self.num_indices,
            num_primitives: self.num_primitives,
            sum_leaf_depth: self.sum_leaf_depth,
            max_leaf_depth: self.max_leaf_depth,
            max_leaf_count: self.max_leaf_count,
            max_list_length: self.max_list_length,
            build_time: if self.build_time_millis == 0 {
                None
            } else {
                Some(std::time::Duration::from_millis(self.build_time_millis))
            },
        }
    }
}

fn node_path(base: &Path) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(".node");
    PathBuf::from(s)
}

fn idx_path(base: &Path) -> PathBuf {
    let mut s = base.as_os_str().to_owned();
    s.push(".idx");
    PathBuf::from(s)
}

fn open_failed(path: &Path, source: std::io::Error) -> BspError {
    BspError::IoOpenFailed {
        path: path.display().to_string(),
        source,
    }
}

/// Streams `nodes`/`indices` through temporary files, then writes the final
/// `<base>`, `<base>.node`, `<base>.idx` triad.
pub fn write_tree<N: Pod>(base: &Path, nodes: &[N], indices: &[u32], stats: &TreeStats) -> BspResult<()> {
    let mut tmp_nodes = tempfile::NamedTempFile::new().map_err(|e| open_failed(Path::new("tempnodes.tmp"), e))?;
    let mut tmp_index = tempfile::NamedTempFile::new().map_err(|e| open_failed(Path::new("tempindex.tmp"), e))?;

    tmp_nodes.write_all(bytemuck::cast_slice(nodes)).map_err(BspError::Io)?;
    tmp_index.write_all(bytemuck::cast_slice(indices)).map_err(BspError::Io)?;
    tmp_nodes.flush().map_err(BspError::Io)?;
    tmp_index.flush().map_err(BspError::Io)?;

    log::info!(
        "streamed {} nodes ({} bytes), {} indices ({} bytes) to temp files",
        nodes.len(),
        std::mem::size_of::<N>() * nodes.len(),
        indices.len(),
        std::mem::size_of::<u32>() * indices.len()
    );

    let node_dst = node_path(base);
    let idx_dst = idx_path(base);
    std::fs::copy(tmp_nodes.path(), &node_dst).map_err(|e| open_failed(&node_dst, e))?;
    std::fs::copy(tmp_index.path(), &idx_dst).map_err(|e| open_failed(&idx_dst, e))?;

    let mut header = File::create(base).map_err(|e| open_failed(base, e))?;
    header.write_all(MAGIC).map_err(BspError::Io)?;
    header.write_all(&[FILE_VERSION]).map_err(BspError::Io)?;
    let file_stats = FileStats::from(*stats);
    header.write_all(bytemuck::bytes_of(&file_stats)).map_err(BspError::Io)?;

    log::info!("wrote tree header to {}", base.display());
    Ok(())
}

/// A tree loaded back from the `<base>`/`<base>.node`/`<base>.idx` triad.
pub struct LoadedTree<N> {
    pub nodes: Vec<N>,
    pub indices: Vec<u32>,
    pub stats: TreeStats,
}

fn read_exact_checked(file: &mut File, buf: &mut [u8], path: &Path) -> BspResult<()> {
    let n = file.read(buf).map_err(BspError::Io)?;
    if n != buf.len() {
        return Err(BspError::IoShortRead {
            path: path.display().to_string(),
            expected: buf.len(),
            got: n,
        });
    }
    Ok(())
}

/// Reads back a tree previously written by [`write_tree`].
pub fn read_tree<N: Pod + Zeroable>(base: &Path) -> BspResult<LoadedTree<N>> {
    let mut header = File::open(base).map_err(|e| open_failed(base, e))?;

    let mut magic = [0u8; 8];
    read_exact_checked(&mut header, &mut magic, base)?;
    if &magic != MAGIC {
        return Err(BspError::BadMagic {
            path: base.display().to_string(),
            expected: *MAGIC,
            found: magic,
        });
    }

    let mut version = [0u8; 1];
    read_exact_checked(&mut header, &mut version, base)?;
    if version[0] != FILE_VERSION {
        return Err(BspError::UnsupportedVersion {
            found: version[0] as u32,
            supported: FILE_VERSION as u32,
        });
    }

    let mut stats_bytes = vec![0u8; std::mem::size_of::<FileStats>()];
    read_exact_checked(&mut header, &mut stats_bytes, base)?;
    // `stats_bytes` is a heap `Vec<u8>` with no alignment guarantee relative
    // to `FileStats` (which has 8-byte-aligned `u64` fields); `from_bytes`
    // would panic on a misaligned buffer, so read unaligned instead.
    let file_stats: FileStats = bytemuck::pod_read_unaligned(&stats_bytes);
    let stats = file_stats.into_stats();

    let node_src = node_path(base);
    let idx_src = idx_path(base);

    let mut node_bytes = Vec::new();
    File::open(&node_src)
        .map_err(|e| open_failed(&node_src, e))?
        .read_to_end(&mut node_bytes)
        .map_err(BspError::Io)?;
    let nodes: Vec<N> = bytemuck::pod_collect_to_vec(&node_bytes);

    let mut idx_bytes = Vec::new();
    File::open(&idx_src)
        .map_err(|e| open_failed(&idx_src, e))?
        .read_to_end(&mut idx_bytes)
        .map_err(BspError::Io)?;
    let indices: Vec<u32> = bytemuck::pod_collect_to_vec(&idx_bytes);

    log::info!("loaded {} nodes, {} indices from {}", nodes.len(), indices.len(), base.display());

    Ok(LoadedTree { nodes, indices, stats })
}
