use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info, trace};

use crate::constants::PAGE_SIZE;
use crate::error::{consistency, DbError, Result};

pub type Page = [u8; PAGE_SIZE];

/// Page cache over a single database file. Pages are loaded on first access
/// and stay cached until the pager is dropped.
pub struct Pager {
    file: File,
    file_length: u64,
    num_pages: u32,
    pages: Vec<Option<Box<Page>>>,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let file_length = file.seek(SeekFrom::End(0))?;
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(DbError::Corrupt(format!(
                "file length {} is not a whole number of pages",
                file_length
            )));
        }

        let num_pages = u32::try_from(file_length / PAGE_SIZE as u64)
            .map_err(|_| DbError::Corrupt(format!("file length {} is too large", file_length)))?;
        info!(
            "opened {} ({} pages)",
            path.as_ref().display(),
            num_pages
        );

        Ok(Pager {
            file,
            file_length,
            num_pages,
            pages: (0..num_pages).map(|_| None).collect(),
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn is_cached(&self, page_num: u32) -> bool {
        matches!(self.pages.get(page_num as usize), Some(Some(_)))
    }

    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Page> {
        if page_num >= self.num_pages {
            return Err(consistency!(
                "page {} requested but only {} pages exist",
                page_num,
                self.num_pages
            ));
        }

        let index = page_num as usize;
        let page = match self.pages[index].take() {
            Some(page) => page,
            None => self.load(page_num)?,
        };
        Ok(&mut **self.pages[index].insert(page))
    }

    /// Hands out the page after the last one in use. Pages are never reused.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let page_num = self.num_pages;
        self.num_pages = page_num
            .checked_add(1)
            .ok_or_else(|| consistency!("page numbers exhausted"))?;
        self.pages.push(Some(Box::new([0u8; PAGE_SIZE])));
        debug!("allocated page {}", page_num);
        Ok(page_num)
    }

    /// Writes every cached page back to the file and syncs it.
    pub fn flush_all(&mut self) -> Result<()> {
        for page_num in 0..self.num_pages {
            self.flush(page_num)?;
        }
        self.file.sync_all()?;
        info!("flushed {} pages", self.num_pages);
        Ok(())
    }

    fn flush(&mut self, page_num: u32) -> Result<()> {
        let page = match self.pages[page_num as usize].as_deref() {
            Some(page) => page,
            None => return Ok(()),
        };

        let offset = page_num as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page)?;
        self.file_length = self.file_length.max(offset + PAGE_SIZE as u64);
        trace!("flushed page {}", page_num);
        Ok(())
    }

    fn load(&mut self, page_num: u32) -> Result<Box<Page>> {
        let mut page = Box::new([0u8; PAGE_SIZE]);
        let offset = page_num as u64 * PAGE_SIZE as u64;

        if offset < self.file_length {
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.read_exact(&mut page[..])?;
            debug!("loaded page {} from disk", page_num);
        }

        Ok(page)
    }
}
