mod common;

use chainfs::{
    fs::{
        bitmap::PersistentBitmap, block::Block, config::block_data_size,
        file_header::FileHeader,
    },
    BlockDevice, FileSystemError, MemDisk,
};

const SECTORS: u32 = 64;

fn setup() -> (MemDisk, PersistentBitmap) {
    let disk = MemDisk::new(SECTORS, common::sector_size_for(16));
    let mut bitmap = PersistentBitmap::new(SECTORS);
    bitmap.mark(0);
    (disk, bitmap)
}

#[test]
fn allocate_links_sectors_in_draw_order() {
    let (disk, mut bitmap) = setup();
    bitmap.mark(2);
    bitmap.mark(4);

    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 50).unwrap();

    assert_eq!(header.file_length(), 50);
    assert_eq!(header.num_blocks(), 4);
    assert_eq!(header.first_block_sector(), Some(1));
    assert_eq!(header.chain(&disk).unwrap(), vec![1, 3, 5, 6]);

    let last = Block::fetch_from(&disk, 6).unwrap();
    assert_eq!(last.next_sector(), None);
    assert!(last.data().iter().all(|&b| b == 0));
}

#[test]
fn deallocate_frees_exactly_the_allocated_sectors() {
    let (disk, mut bitmap) = setup();
    let before = bitmap.clone();

    for size in [1usize, 16, 17, 100, 160] {
        let mut header = FileHeader::new();
        header.allocate(&disk, &mut bitmap, size).unwrap();

        let expected = size.div_ceil(block_data_size(disk.sector_size()));
        let drawn: Vec<u32> = (0..SECTORS)
            .filter(|&s| bitmap.test(s) && !before.test(s))
            .collect();
        assert_eq!(drawn.len(), expected);
        assert_eq!(bitmap.num_clear(), before.num_clear() - expected);

        let mut chain = header.chain(&disk).unwrap();
        chain.sort_unstable();
        assert_eq!(chain, drawn);

        header.deallocate(&disk, &mut bitmap).unwrap();
        assert_eq!(bitmap, before);
    }
}

#[test]
fn allocate_without_room_changes_nothing() {
    let (disk, mut bitmap) = setup();
    let before = bitmap.clone();

    let mut header = FileHeader::new();
    let too_big = (SECTORS as usize) * 16;
    assert!(matches!(
        header.allocate(&disk, &mut bitmap, too_big),
        Err(FileSystemError::OutOfSpace)
    ));
    assert_eq!(bitmap, before);
    assert_eq!(header, FileHeader::new());

    // 恰好用完所有空闲扇区是允许的
    let exact = bitmap.num_clear() * 16;
    header.allocate(&disk, &mut bitmap, exact).unwrap();
    assert_eq!(bitmap.num_clear(), 0);
}

#[test]
fn empty_file_has_no_chain() {
    let (disk, mut bitmap) = setup();
    let before = bitmap.clone();

    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 0).unwrap();
    assert_eq!(header.first_block_sector(), None);
    assert!(header.chain(&disk).unwrap().is_empty());
    header.deallocate(&disk, &mut bitmap).unwrap();
    assert_eq!(bitmap, before);
}

#[test]
fn byte_offsets_map_to_chain_positions() {
    let (disk, mut bitmap) = setup();
    bitmap.mark(2);
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 40).unwrap();
    // chain: 1 -> 3 -> 4

    assert_eq!(
        header.byte_to_sector_and_next_sector(&disk, 0).unwrap(),
        (1, Some(3))
    );
    assert_eq!(
        header.byte_to_sector_and_next_sector(&disk, 15).unwrap(),
        (1, Some(3))
    );
    assert_eq!(
        header.byte_to_sector_and_next_sector(&disk, 16).unwrap(),
        (3, Some(4))
    );
    assert_eq!(
        header.byte_to_sector_and_next_sector(&disk, 39).unwrap(),
        (4, None)
    );
    assert!(matches!(
        header.byte_to_sector_and_next_sector(&disk, 48),
        Err(FileSystemError::CorruptChain(_))
    ));
}

#[test]
fn header_fits_in_one_sector() {
    let (disk, mut bitmap) = setup();
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 33).unwrap();
    header.write_back(&disk, 0).unwrap();

    assert_eq!(FileHeader::fetch_from(&disk, 0).unwrap(), header);
}

#[test]
fn cyclic_chain_is_reported_instead_of_looping() {
    let (disk, mut bitmap) = setup();
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 48).unwrap();
    let chain = header.chain(&disk).unwrap();

    let mut last = Block::fetch_from(&disk, chain[2]).unwrap();
    last.set_next_sector(Some(chain[0]));
    last.write_back(&disk).unwrap();

    assert!(matches!(
        header.chain(&disk),
        Err(FileSystemError::CorruptChain(_))
    ));
    let before = bitmap.clone();
    assert!(matches!(
        header.deallocate(&disk, &mut bitmap),
        Err(FileSystemError::CorruptChain(_))
    ));
    assert_eq!(bitmap, before);
}

#[test]
fn truncated_chain_is_reported() {
    let (disk, mut bitmap) = setup();
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 48).unwrap();
    let chain = header.chain(&disk).unwrap();

    let mut middle = Block::fetch_from(&disk, chain[1]).unwrap();
    middle.set_next_sector(None);
    middle.write_back(&disk).unwrap();

    assert!(matches!(
        header.chain(&disk),
        Err(FileSystemError::CorruptChain(_))
    ));
    assert!(matches!(
        header.byte_to_sector_and_next_sector(&disk, 40),
        Err(FileSystemError::CorruptChain(_))
    ));
}

#[test]
fn deallocating_an_unmarked_sector_is_corruption() {
    let (disk, mut bitmap) = setup();
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 48).unwrap();
    let chain = header.chain(&disk).unwrap();

    bitmap.clear(chain[1]);
    let before = bitmap.clone();
    assert!(matches!(
        header.deallocate(&disk, &mut bitmap),
        Err(FileSystemError::CorruptChain(_))
    ));
    assert_eq!(bitmap, before);
}

#[test]
fn describe_lists_blocks_and_contents() {
    let (disk, mut bitmap) = setup();
    let mut header = FileHeader::new();
    header.allocate(&disk, &mut bitmap, 3).unwrap();

    let text = header.describe(&disk).unwrap();
    log!("{}", text);
    assert!(text.contains("File size: 3."));
    assert!(text.contains("\\0\\0\\0"));
}

/// 读出全零、丢弃写入的大扇区设备
struct HugeSectorDisk;

impl BlockDevice for HugeSectorDisk {
    fn sector_size(&self) -> usize {
        (1 << 24) + 8
    }

    fn num_sectors(&self) -> u32 {
        256
    }

    fn read_sector(&self, _sector: u32, buf: &mut [u8]) -> std::io::Result<()> {
        buf.fill(0);
        Ok(())
    }

    fn write_sector(&self, _sector: u32, _buf: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn sizes_beyond_the_header_fields_are_out_of_space() {
    let disk = HugeSectorDisk;
    let mut bitmap = PersistentBitmap::new(disk.num_sectors());
    let before = bitmap.clone();

    // 只需 128 个块，但字节数放不进 i32
    let mut header = FileHeader::new();
    assert!(matches!(
        header.allocate(&disk, &mut bitmap, i32::MAX as usize + 1),
        Err(FileSystemError::OutOfSpace)
    ));
    assert_eq!(bitmap, before);
    assert_eq!(header, FileHeader::new());
}
