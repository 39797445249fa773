use std::{path::PathBuf, sync::mpsc::Sender, sync::Arc};

use log::info;

use crate::{
    disk::{file_disk::FileDisk, types::SECTOR_SIZE},
    fs::FileSystem,
    shell::BootProgress,
};

/// 启动时打开磁盘镜像所需的参数
#[derive(Debug, Clone)]
pub struct DiskOptions {
    pub path: PathBuf,
    pub num_sectors: u32,
    pub force_format: bool,
}

pub fn perform_disk_initialization(tx: Sender<BootProgress>, options: DiskOptions) {
    let _ = tx.send(BootProgress::Step("🧠 Initializing virtual disk..."));

    let (disk, fresh) = match FileDisk::open(&options.path, options.num_sectors, SECTOR_SIZE) {
        Ok(d) => d,
        Err(e) => {
            let _ = tx.send(BootProgress::Finished(Err(e.into())));
            return;
        }
    };
    let _ = tx.send(BootProgress::Progress(40));

    let device = Arc::new(disk);

    // 只有新盘或者用户明确要求时才格式化
    let result = if fresh || options.force_format {
        let _ = tx.send(BootProgress::Step(
            "🔧 No file system found, formatting new disk...",
        ));
        info!("formatting {}", options.path.display());
        FileSystem::format(device)
    } else {
        let _ = tx.send(BootProgress::Step("⚙️ Mounting file system..."));
        info!("mounting {}", options.path.display());
        FileSystem::mount(device)
    };

    if result.is_ok() {
        for i in 40..=100 {
            let _ = tx.send(BootProgress::Progress(i));
        }
    }

    let _ = tx.send(BootProgress::Finished(result));
}
