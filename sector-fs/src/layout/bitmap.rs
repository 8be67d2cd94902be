use alloc::vec::Vec;
use core::fmt;

use crate::config::{FREE_MAP_FILE_SIZE, NUM_SECTORS};
use crate::OpenFile;

/// 位图内的比特组
type BitGroup = u64;

const GROUP_BITS: usize = BitGroup::BITS as usize;
const GROUP_BYTES: usize = GROUP_BITS / 8;
const GROUPS: usize = NUM_SECTORS / GROUP_BITS;

const _: () = assert!(NUM_SECTORS % GROUP_BITS == 0);
const _: () = assert!(GROUPS * GROUP_BYTES == FREE_MAP_FILE_SIZE);

/// 空闲扇区位图，比特置位表示扇区已分配。
///
/// 内存中的位图只是磁盘上位图文件的快照，
/// 修改后需 [`Bitmap::write_back`] 才会生效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    groups: [BitGroup; GROUPS],
}

/// 扇区号
struct SectorBit(u32);

impl Bitmap {
    /// 全部扇区空闲
    #[inline]
    pub fn new() -> Self {
        Self { groups: [0; GROUPS] }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        GROUPS * GROUP_BITS
    }

    pub fn mark(&mut self, sector: u32) {
        let (group_index, ingroup_index) = SectorBit(sector).decode();
        self.groups[group_index] |= 1 << ingroup_index;
    }

    pub fn clear(&mut self, sector: u32) {
        let (group_index, ingroup_index) = SectorBit(sector).decode();
        self.groups[group_index] &= !(1 << ingroup_index);
    }

    pub fn test(&self, sector: u32) -> bool {
        let (group_index, ingroup_index) = SectorBit(sector).decode();
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    /// 找到编号最小的空闲扇区，标记为已分配并返回其编号。
    /// 若位图已满，则返回空。
    pub fn find_and_set(&mut self) -> Option<u32> {
        let (group_index, ingroup_index) = self
            .groups
            .iter()
            .enumerate()
            .find_map(|(group_index, &bits)| {
                (bits != BitGroup::MAX).then_some((group_index, bits.trailing_ones()))
            })?;

        self.groups[group_index] |= 1 << ingroup_index;
        Some(SectorBit::encode(group_index, ingroup_index as usize))
    }

    pub fn num_clear(&self) -> usize {
        self.groups
            .iter()
            .map(|bits| bits.count_zeros() as usize)
            .sum()
    }

    /// 所有已分配扇区的编号，从小到大
    pub fn allocated(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.capacity() as u32).filter(|&sector| self.test(sector))
    }

    pub fn fetch_from(file: &OpenFile) -> Self {
        let mut bytes = [0; FREE_MAP_FILE_SIZE];
        file.read_at(&mut bytes, 0);

        let mut bitmap = Self::new();
        for (group, chunk) in bitmap.groups.iter_mut().zip(bytes.chunks_exact(GROUP_BYTES)) {
            let mut word = [0; GROUP_BYTES];
            word.copy_from_slice(chunk);
            *group = BitGroup::from_le_bytes(word);
        }
        bitmap
    }

    pub fn write_back(&self, file: &OpenFile) {
        let bytes: Vec<u8> = self
            .groups
            .iter()
            .flat_map(|group| group.to_le_bytes())
            .collect();
        file.write_at(&bytes, 0);
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap set:")?;
        for sector in self.allocated() {
            write!(f, " {sector}")?;
        }
        writeln!(f)
    }
}

impl SectorBit {
    /// 线性映射编码得到扇区号
    #[inline]
    fn encode(group_index: usize, ingroup_index: usize) -> u32 {
        (group_index * GROUP_BITS + ingroup_index) as u32
    }

    #[inline]
    fn decode(self) -> (usize, usize) {
        let sector = self.0 as usize;
        (sector / GROUP_BITS, sector % GROUP_BITS)
    }
}
