mod common;

use std::sync::Arc;

use chainfs::{
    fs::{config::MAX_OPEN_FILES, directory::DIRECTORY_FILE_SIZE},
    DirEntryType, FileDisk, FileSystem, FileSystemError,
};

#[test]
fn create_takes_header_plus_ceil_blocks() {
    // 数据区 64 字节
    let mut fs = common::fresh_volume(256, 64);
    let free_before = fs.free_sectors().unwrap();

    fs.create("/f", 100).unwrap();

    let stat = fs.stat("/f").unwrap();
    assert_eq!(stat.entry_type, DirEntryType::File);
    assert_eq!(stat.length, 100);
    assert_eq!(stat.blocks.len(), 2);
    // 两个数据块 + 一个文件头扇区
    assert_eq!(fs.free_sectors().unwrap(), free_before - 3);

    assert_eq!(fs.list("/", false).unwrap(), vec!["f"]);
    assert_eq!(fs.list("/", true).unwrap(), vec!["[F] f"]);
}

#[test]
fn fresh_volume_reserves_bitmap_and_root() {
    let fs = common::fresh_volume(256, 64);
    // 256 扇区：2 个文件头 + 位图 32 字节 1 块 + 目录 ceil(1216 / 64) = 19 块
    assert_eq!(fs.free_sectors().unwrap(), 256 - 2 - 1 - 19);
    assert!(fs.list("/", true).unwrap().is_empty());

    let root = fs.stat("/").unwrap();
    assert_eq!(root.entry_type, DirEntryType::Directory);
    assert_eq!(root.length, DIRECTORY_FILE_SIZE);
}

#[test]
fn remove_returns_every_sector() {
    let mut fs = common::fresh_volume(256, 64);
    let free_before = fs.free_sectors().unwrap();

    fs.create("/f", 1000).unwrap();
    assert!(fs.free_sectors().unwrap() < free_before);
    fs.remove("/f", false).unwrap();

    assert_eq!(fs.free_sectors().unwrap(), free_before);
    assert!(matches!(fs.open("/f"), Err(FileSystemError::NotFound(_))));
    assert!(matches!(
        fs.remove("/f", false),
        Err(FileSystemError::NotFound(_))
    ));
}

#[test]
fn nested_directories_and_files() {
    let mut fs = common::fresh_volume(512, 64);
    fs.make_directory("/a").unwrap();
    fs.make_directory("/a/b").unwrap();
    fs.create("/a/b/c", 10).unwrap();
    fs.create("/a/d", 10).unwrap();

    let root = fs.root_directory().unwrap();
    assert_eq!(
        root.find(fs.device(), "/a/b/c").unwrap(),
        fs.stat("/a/b/c").unwrap().header_sector
    );
    assert!(matches!(
        root.find(fs.device(), "/a/x"),
        Err(FileSystemError::NotFound(_))
    ));

    assert_eq!(fs.list("/a", false).unwrap(), vec!["b", "d"]);
    assert_eq!(
        fs.list("/", true).unwrap(),
        vec!["[D] a", "    [D] b", "        [F] c", "    [F] d"]
    );
    assert!(matches!(
        fs.list("/a/d", false),
        Err(FileSystemError::NotADirectory(_))
    ));
}

#[test]
fn non_empty_directory_needs_recursive_remove() {
    let mut fs = common::fresh_volume(512, 64);
    let free_before = fs.free_sectors().unwrap();

    fs.make_directory("/a").unwrap();
    fs.make_directory("/a/b").unwrap();
    fs.create("/a/b/c", 300).unwrap();

    assert!(matches!(
        fs.remove("/a", false),
        Err(FileSystemError::DirectoryNotEmpty(_))
    ));
    fs.remove("/a", true).unwrap();

    assert_eq!(fs.free_sectors().unwrap(), free_before);
    assert!(fs.list("/", true).unwrap().is_empty());
}

#[test]
fn failed_create_leaves_bitmap_and_directory_alone() {
    let mut fs = common::fresh_volume(64, 64);
    let free_before = fs.free_sectors().unwrap();

    assert!(matches!(
        fs.create("/big", 64 * 64),
        Err(FileSystemError::OutOfSpace)
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_before);

    assert!(matches!(
        fs.create("/nope/f", 10),
        Err(FileSystemError::NotFound(_))
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_before);
    assert!(fs.list("/", false).unwrap().is_empty());

    fs.create("/f", 10).unwrap();
    let free_after = fs.free_sectors().unwrap();
    assert!(matches!(
        fs.create("/f", 10),
        Err(FileSystemError::AlreadyExists(_))
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_after);
}

#[test]
fn full_directory_rolls_back_allocation() {
    let mut fs = common::fresh_volume(1024, 64);
    fs.make_directory("/d").unwrap();
    for i in 0..chainfs::fs::config::NUM_DIR_ENTRIES {
        fs.create(&format!("/d/f{}", i), 0).unwrap();
    }
    let free_before = fs.free_sectors().unwrap();

    assert!(matches!(
        fs.create("/d/extra", 500),
        Err(FileSystemError::DirectoryFull(_))
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_before);
}

#[test]
fn file_contents_persist_across_mount() {
    let device = common::mem_device(256, 64);
    {
        let mut fs = FileSystem::format(Arc::clone(&device)).unwrap();
        fs.make_directory("/docs").unwrap();
        fs.create("/docs/note", 150).unwrap();
        let file = fs.open("/docs/note").unwrap();
        file.write_at(b"linked sectors", 60).unwrap();
    }

    let fs = FileSystem::mount(device).unwrap();
    let file = fs.open("/docs/note").unwrap();
    assert_eq!(file.length(), 150);
    let mut out = [0u8; 14];
    file.read_at(&mut out, 60).unwrap();
    assert_eq!(&out, b"linked sectors");
}

#[test]
fn open_file_ids() {
    let mut fs = common::fresh_volume(256, 64);
    fs.create("/f", 20).unwrap();

    let id = fs.open_file_id("/f").unwrap();
    assert_eq!(fs.write_file(id, b"abcdef").unwrap(), 6);
    fs.seek_file(id, 2).unwrap();
    let mut out = [0u8; 3];
    assert_eq!(fs.read_file(id, &mut out).unwrap(), 3);
    assert_eq!(&out, b"cde");
    assert_eq!(fs.remaining_bytes(id).unwrap(), 15);
    fs.seek_file(id, 50).unwrap();
    assert_eq!(fs.remaining_bytes(id).unwrap(), 0);

    fs.close_file(id).unwrap();
    assert!(matches!(
        fs.read_file(id, &mut out),
        Err(FileSystemError::BadFileId(_))
    ));
    assert!(matches!(
        fs.close_file(id),
        Err(FileSystemError::BadFileId(_))
    ));
    assert!(matches!(
        fs.write_file(MAX_OPEN_FILES + 5, b"x"),
        Err(FileSystemError::BadFileId(_))
    ));
    assert!(matches!(
        fs.open_file_id("/missing"),
        Err(FileSystemError::NotFound(_))
    ));
}

#[test]
fn open_file_table_is_bounded() {
    let mut fs = common::fresh_volume(256, 64);
    fs.create("/f", 20).unwrap();

    let ids: Vec<_> = (0..MAX_OPEN_FILES)
        .map(|_| fs.open_file_id("/f").unwrap())
        .collect();
    assert!(matches!(
        fs.open_file_id("/f"),
        Err(FileSystemError::TooManyOpenFiles)
    ));

    fs.close_file(ids[4]).unwrap();
    assert_eq!(fs.open_file_id("/f").unwrap(), ids[4]);
}

#[test]
fn print_dumps_headers_and_contents() {
    let mut fs = common::fresh_volume(256, 64);
    fs.create("/hello", 5).unwrap();
    fs.open("/hello").unwrap().write_at(b"hi!!!", 0).unwrap();

    let dump = fs.print().unwrap();
    log!("{}", dump);
    assert!(dump.contains("Name: hello"));
    assert!(dump.contains("hi!!!"));
}

#[test]
fn image_file_round_trip() {
    let path = std::env::temp_dir().join(format!("chainfs-test-{}.img", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let (disk, fresh) = FileDisk::open(&path, 128, 128).unwrap();
    assert!(fresh);
    {
        let mut fs = FileSystem::format(Arc::new(disk)).unwrap();
        fs.create("/f", 300).unwrap();
        fs.open("/f").unwrap().write_at(b"on disk", 250).unwrap();
    }

    let (disk, fresh) = FileDisk::open(&path, 128, 128).unwrap();
    assert!(!fresh);
    let fs = FileSystem::mount(Arc::new(disk)).unwrap();
    let mut out = [0u8; 7];
    fs.open("/f").unwrap().read_at(&mut out, 250).unwrap();
    assert_eq!(&out, b"on disk");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn open_ids_pin_their_files() {
    let mut fs = common::fresh_volume(256, 64);
    fs.create("/a", 64).unwrap();
    let id = fs.open_file_id("/a").unwrap();
    let free_before = fs.free_sectors().unwrap();

    assert!(matches!(
        fs.remove("/a", false),
        Err(FileSystemError::FileInUse(p)) if p == "/a"
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_before);

    // 还在的文件可以继续通过 id 写，不会碰到别的文件
    fs.create("/b", 64).unwrap();
    fs.open("/b").unwrap().write_at(b"BBBB", 0).unwrap();
    assert_eq!(fs.write_file(id, b"AAAA").unwrap(), 4);
    let mut out = [0u8; 4];
    fs.open("/b").unwrap().read_at(&mut out, 0).unwrap();
    assert_eq!(&out, b"BBBB");

    fs.close_file(id).unwrap();
    fs.remove("/a", false).unwrap();
    assert_eq!(fs.list("/", false).unwrap(), vec!["b"]);
}

#[test]
fn recursive_remove_refuses_open_descendants() {
    let mut fs = common::fresh_volume(512, 64);
    fs.make_directory("/d").unwrap();
    fs.make_directory("/d/e").unwrap();
    fs.create("/d/e/f", 100).unwrap();
    let id = fs.open_file_id("/d/e/f").unwrap();
    let free_before = fs.free_sectors().unwrap();

    assert!(matches!(
        fs.remove("/d", true),
        Err(FileSystemError::FileInUse(p)) if p == "/d/e/f"
    ));
    assert_eq!(fs.free_sectors().unwrap(), free_before);
    assert_eq!(
        fs.list("/", true).unwrap(),
        vec!["[D] d", "    [D] e", "        [F] f"]
    );

    fs.close_file(id).unwrap();
    fs.remove("/d", true).unwrap();
    assert!(fs.list("/", true).unwrap().is_empty());
}
