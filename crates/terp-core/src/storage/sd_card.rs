use core::fmt::Write as _;

use embedded_sdmmc::{BlockDevice, Mode, TimeSource, VolumeIdx, VolumeManager};
use log::{debug, error};

extern crate alloc;
use alloc::vec::Vec;

use super::{StorageBackend, StoreError};

/// Upper bound on a namespace file. Settings records are a few hundred
/// bytes; anything bigger than this is not ours.
pub const MAX_NAMESPACE_BYTES: usize = 1024;

const NAMESPACE_EXTENSION: &str = "KV";

/// Namespace storage on a FAT-formatted SD card.
///
/// Works over any [`BlockDevice`]; on the device that is an
/// [`embedded_sdmmc::SdCard`] on the shared SPI bus.
///
/// Each namespace is one `NAME.KV` file in the root directory. Every call
/// opens the volume, the root directory and the file, and closes all three
/// before returning, so nothing stays open between user-driven saves.
///
/// These operations are blocking, like the display writes sharing the SPI
/// bus. Saves only happen on user confirmation, so the stall is acceptable.
pub struct SdCardBackend<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
}

impl<D, T> SdCardBackend<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub fn new(device: D, ts: T) -> Self {
        let volume_mgr = VolumeManager::new(device, ts);

        Self { volume_mgr }
    }

    fn read_file(
        &self,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, embedded_sdmmc::Error<D::Error>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let file = match root_dir.open_file_in_dir(file_name, Mode::ReadOnly) {
            Ok(file) => file,
            Err(embedded_sdmmc::Error::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut contents = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let bytes_read = file.read(&mut chunk)?;
            if bytes_read == 0 {
                break; // EOF
            }
            contents.extend_from_slice(&chunk[..bytes_read]);
            if contents.len() > MAX_NAMESPACE_BYTES {
                break;
            }
        }

        // Resources are closed on drop as well; close explicitly to surface errors.
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(Some(contents))
    }

    fn write_file(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<(), embedded_sdmmc::Error<D::Error>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadWriteCreateOrTruncate)?;

        file.write(bytes)?;

        // Closing flushes the directory entry; the write is not durable before this.
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}

impl<D, T> StorageBackend for SdCardBackend<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn read(&mut self, namespace: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let file_name = namespace_file_name(namespace)?;
        let contents = self.read_file(&file_name).map_err(|e| {
            error!(" Failed to read {} from SD: {:?}", file_name, e);
            StoreError::ReadFailed
        })?;

        match contents {
            Some(bytes) if bytes.len() > MAX_NAMESPACE_BYTES => Err(StoreError::TooLarge {
                limit: MAX_NAMESPACE_BYTES,
            }),
            other => {
                debug!(" Read {} from SD", file_name);
                Ok(other)
            }
        }
    }

    fn write(&mut self, namespace: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if bytes.len() > MAX_NAMESPACE_BYTES {
            return Err(StoreError::TooLarge {
                limit: MAX_NAMESPACE_BYTES,
            });
        }

        let file_name = namespace_file_name(namespace)?;
        self.write_file(&file_name, bytes).map_err(|e| {
            error!(" Failed to write {} to SD: {:?}", file_name, e);
            StoreError::WriteFailed
        })
    }
}

/// Map a namespace onto an 8.3 file name (`settings` -> `SETTINGS.KV`).
fn namespace_file_name(namespace: &str) -> Result<heapless::String<12>, StoreError> {
    let valid = !namespace.is_empty()
        && namespace.len() <= 8
        && namespace.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(StoreError::OpenFailed {
            what: "namespace file name",
        });
    }

    let mut name = heapless::String::new();
    for c in namespace.chars() {
        name.push(c.to_ascii_uppercase())
            .map_err(|_| StoreError::OpenFailed {
                what: "namespace file name",
            })?;
    }
    write!(name, ".{}", NAMESPACE_EXTENSION).map_err(|_| StoreError::OpenFailed {
        what: "namespace file name",
    })?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use core::convert::Infallible;

    use embedded_sdmmc::{Block, BlockCount, BlockIdx, Timestamp};

    use super::*;

    const FAT_BLOCKS: u32 = 17;
    /// 512 root entries of 32 bytes.
    const ROOT_DIR_BLOCKS: u32 = 32;
    /// Just above the FAT12 cluster limit.
    const DATA_BLOCKS: u32 = 4_200;
    const PARTITION_BLOCKS: u32 = 1 + FAT_BLOCKS + ROOT_DIR_BLOCKS + DATA_BLOCKS;

    /// Blank FAT16 card: MBR in block 0, one partition from block 1.
    struct RamCard {
        bytes: RefCell<Vec<u8>>,
    }

    impl RamCard {
        fn formatted() -> Self {
            let mut disk = vec![0u8; (1 + PARTITION_BLOCKS as usize) * Block::LEN];

            let entry = 446;
            disk[entry + 4] = 0x06; // FAT16
            disk[entry + 8..entry + 12].copy_from_slice(&1u32.to_le_bytes());
            disk[entry + 12..entry + 16].copy_from_slice(&PARTITION_BLOCKS.to_le_bytes());
            disk[510..512].copy_from_slice(&[0x55, 0xAA]);

            let bpb = &mut disk[Block::LEN..2 * Block::LEN];
            bpb[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
            bpb[3..11].copy_from_slice(b"TERPMETR");
            bpb[11..13].copy_from_slice(&512u16.to_le_bytes());
            bpb[13] = 1; // blocks per cluster
            bpb[14..16].copy_from_slice(&1u16.to_le_bytes()); // reserved
            bpb[16] = 1; // FATs
            bpb[17..19].copy_from_slice(&((ROOT_DIR_BLOCKS * 16) as u16).to_le_bytes());
            bpb[19..21].copy_from_slice(&(PARTITION_BLOCKS as u16).to_le_bytes());
            bpb[21] = 0xF8;
            bpb[22..24].copy_from_slice(&(FAT_BLOCKS as u16).to_le_bytes());
            bpb[43..54].copy_from_slice(b"TERPMETER  ");
            bpb[510..512].copy_from_slice(&[0x55, 0xAA]);

            // Reserved FAT entries 0 and 1.
            let fat = 2 * Block::LEN;
            disk[fat..fat + 4].copy_from_slice(&[0xF8, 0xFF, 0xFF, 0xFF]);

            Self {
                bytes: RefCell::new(disk),
            }
        }
    }

    impl BlockDevice for RamCard {
        type Error = Infallible;

        fn read(&self, blocks: &mut [Block], start_block_idx: BlockIdx) -> Result<(), Infallible> {
            let bytes = self.bytes.borrow();
            for (i, block) in blocks.iter_mut().enumerate() {
                let offset = (start_block_idx.0 as usize + i) * Block::LEN;
                block.contents.copy_from_slice(&bytes[offset..offset + Block::LEN]);
            }
            Ok(())
        }

        fn write(&self, blocks: &[Block], start_block_idx: BlockIdx) -> Result<(), Infallible> {
            let mut bytes = self.bytes.borrow_mut();
            for (i, block) in blocks.iter().enumerate() {
                let offset = (start_block_idx.0 as usize + i) * Block::LEN;
                bytes[offset..offset + Block::LEN].copy_from_slice(&block.contents);
            }
            Ok(())
        }

        fn num_blocks(&self) -> Result<BlockCount, Infallible> {
            Ok(BlockCount(1 + PARTITION_BLOCKS))
        }
    }

    struct FixedClock;

    impl TimeSource for FixedClock {
        fn get_timestamp(&self) -> Timestamp {
            Timestamp {
                year_since_1970: 56,
                zero_indexed_month: 9,
                zero_indexed_day: 14,
                hours: 12,
                minutes: 0,
                seconds: 0,
            }
        }
    }

    fn backend() -> SdCardBackend<RamCard, FixedClock> {
        SdCardBackend::new(RamCard::formatted(), FixedClock)
    }

    #[test]
    fn namespace_maps_to_short_name() {
        assert_eq!(namespace_file_name("settings").unwrap().as_str(), "SETTINGS.KV");
    }

    #[test]
    fn long_or_odd_namespaces_are_rejected() {
        assert!(namespace_file_name("terpmeter").is_err());
        assert!(namespace_file_name("a.b").is_err());
        assert!(namespace_file_name("").is_err());
    }

    #[test]
    fn missing_namespace_reads_as_none() {
        let mut sd = backend();
        assert_eq!(sd.read("settings"), Ok(None));
    }

    #[test]
    fn write_then_read_back() {
        let mut sd = backend();
        sd.write("settings", &[1, 2, 3, 4]).unwrap();
        assert_eq!(sd.read("settings"), Ok(Some(vec![1, 2, 3, 4])));
    }

    #[test]
    fn rewrite_truncates_previous_contents() {
        let mut sd = backend();
        sd.write("settings", &[9; 200]).unwrap();
        sd.write("settings", &[7, 7]).unwrap();
        assert_eq!(sd.read("settings"), Ok(Some(vec![7, 7])));
    }

    #[test]
    fn oversized_namespace_is_refused() {
        let mut sd = backend();
        assert_eq!(
            sd.write("settings", &[0; MAX_NAMESPACE_BYTES + 1]),
            Err(StoreError::TooLarge {
                limit: MAX_NAMESPACE_BYTES
            })
        );
        assert_eq!(sd.read("settings"), Ok(None));
    }
}
