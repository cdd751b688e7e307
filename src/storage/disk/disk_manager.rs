use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::common::{FileId, PageId, QuarryError, Result, PAGE_SIZE};

struct FileEntry {
    file: Mutex<File>,
    name: String,
}

/// DiskManager is responsible for reading and writing pages to/from disk.
/// It manages a directory of page files, each registered under a `FileId`;
/// a page is addressed by the `(file_id, page_id)` pair.
pub struct DiskManager {
    /// Base directory for database files
    db_dir: PathBuf,
    /// Registered files, keyed by file ID.
    /// Outer RwLock allows concurrent access to different files;
    /// inner Mutex ensures exclusive access to a specific file cursor.
    files: RwLock<HashMap<FileId, FileEntry>>,
    /// Next file ID to hand out
    next_file_id: AtomicU32,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Creates a new DiskManager rooted at the given directory.
    /// The directory is created if it does not exist.
    pub fn new<P: AsRef<Path>>(db_dir: P) -> Result<Self> {
        let db_dir = db_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&db_dir)?;

        Ok(Self {
            db_dir,
            files: RwLock::new(HashMap::new()),
            next_file_id: AtomicU32::new(0),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Creates a new file and registers it. Fails if the file already exists.
    pub fn create_file(&self, name: &str) -> Result<FileId> {
        let path = self.db_dir.join(name);
        if path.exists() {
            return Err(QuarryError::FileExists(name.to_string()));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(self.register(file, name))
    }

    /// Opens an existing file and registers it.
    pub fn open_file(&self, name: &str) -> Result<FileId> {
        let path = self.db_dir.join(name);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(self.register(file, name))
    }

    fn register(&self, file: File, name: &str) -> FileId {
        let fid = FileId::new(self.next_file_id.fetch_add(1, Ordering::SeqCst));
        self.files.write().insert(
            fid,
            FileEntry {
                file: Mutex::new(file),
                name: name.to_string(),
            },
        );
        log::debug!("registered file {:?} as {}", name, fid);
        fid
    }

    /// Unregisters a file, syncing it first.
    pub fn close_file(&self, fid: FileId) -> Result<()> {
        let entry = self
            .files
            .write()
            .remove(&fid)
            .ok_or(QuarryError::FileNotFound(fid))?;
        entry.file.lock().sync_all()?;
        Ok(())
    }

    /// Reads a page from disk into the provided buffer.
    /// Reads past the end of the file yield zeroed bytes.
    pub fn read_page(&self, fid: FileId, pid: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let files = self.files.read();
        let entry = files.get(&fid).ok_or(QuarryError::FileNotFound(fid))?;

        let mut file = entry.file.lock();
        file.seek(SeekFrom::Start(pid.as_u32() as u64 * PAGE_SIZE as u64))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    pub fn write_page(&self, fid: FileId, pid: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let files = self.files.read();
        let entry = files.get(&fid).ok_or(QuarryError::FileNotFound(fid))?;

        let mut file = entry.file.lock();
        file.seek(SeekFrom::Start(pid.as_u32() as u64 * PAGE_SIZE as u64))?;
        file.write_all(data)?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the name a file was registered under.
    pub fn file_name(&self, fid: FileId) -> Result<String> {
        let files = self.files.read();
        files
            .get(&fid)
            .map(|e| e.name.clone())
            .ok_or(QuarryError::FileNotFound(fid))
    }

    /// Syncs all registered files to disk.
    pub fn sync(&self) -> Result<()> {
        let files = self.files.read();
        for entry in files.values() {
            entry.file.lock().sync_all()?;
        }
        Ok(())
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let files = self.files.get_mut();
        for entry in files.values_mut() {
            let _ = entry.file.get_mut().sync_all();
        }
    }
}
