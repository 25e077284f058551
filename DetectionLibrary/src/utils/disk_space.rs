use std::path::Path;
use sysinfo::Disks;
use crate::utils::logging::*;

const MEGABYTE: u64 = 1024 * 1024;

pub struct DiskSpace;

impl DiskSpace {
    /// Free space, in whole megabytes, on the disk whose mount point is the
    /// longest prefix of `path`.
    pub fn free_megabytes(path: &Path) -> Result<u64, LogEntry> {
        let absolute_path = path.canonicalize()
            .map_err(|err| error_entry!(IOEntry::GetAbsolutePathError(path.display(), err)))?;
        let disks = Disks::new_with_refreshed_list();
        disks.list().iter()
            .filter(|disk| absolute_path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space() / MEGABYTE)
            .ok_or_else(|| error_entry!(IOEntry::DiskNotFoundError(absolute_path.display())))
    }
}
