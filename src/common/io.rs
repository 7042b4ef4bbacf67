use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

use memmap2::MmapOptions;

/// Input bytes, either memory-mapped or owned.
/// Dereferences to `&[u8]` so record slices can borrow from either.
pub enum FileData {
    Mmap(memmap2::Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

/// Files below this size are read into a Vec; mmap setup costs more than it saves.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Read a whole file. Large regular files are mapped read-only, everything
/// else is read into memory.
pub fn read_file(path: &Path) -> io::Result<FileData> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    let len = metadata.len();

    if len >= MMAP_THRESHOLD && metadata.file_type().is_file() {
        // SAFETY: read-only mapping; records borrow from it only while the
        // FileData is alive.
        if let Ok(mmap) = unsafe { MmapOptions::new().map(&file) } {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
            }
            return Ok(FileData::Mmap(mmap));
        }
    }

    let mut buf = Vec::with_capacity(len as usize);
    let mut reader = file;
    reader.read_to_end(&mut buf)?;
    Ok(FileData::Owned(buf))
}

/// Read all of stdin.
pub fn read_stdin() -> io::Result<Vec<u8>> {
    #[cfg(target_os = "linux")]
    return read_stdin_raw();

    #[cfg(not(target_os = "linux"))]
    {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Raw read(2) loop on fd 0, skipping StdinLock's internal buffer.
#[cfg(target_os = "linux")]
fn read_stdin_raw() -> io::Result<Vec<u8>> {
    const CHUNK: usize = 1024 * 1024;

    let mut buf: Vec<u8> = Vec::with_capacity(CHUNK);
    loop {
        if buf.capacity() - buf.len() < CHUNK / 4 {
            buf.reserve(buf.capacity().max(CHUNK));
        }
        let start = buf.len();
        let spare = buf.capacity() - start;

        // SAFETY: read() writes at most `spare` bytes into the spare capacity,
        // and set_len only covers the bytes it reported.
        let ret = unsafe { libc::read(0, buf.as_mut_ptr().add(start) as *mut libc::c_void, spare) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if ret == 0 {
            break;
        }
        unsafe { buf.set_len(start + ret as usize) };
    }
    Ok(buf)
}
