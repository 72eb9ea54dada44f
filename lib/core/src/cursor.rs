// ============ Byte Source / Cursor ============
// Lazy, bounded-memory access to cell data and witnesses.
//
// A cursor is only (source, offset, size). Structured values are decoded by
// the molecule views in `mol` straight from the source, so a 32 KB witness
// never has to be materialized to read a 33-byte rule out of it.

use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp::min;

use rce_types::{Error, Source, READ_CACHE_SIZE};

use crate::syscalls::Transaction;

// ============ Source Interface ============

pub trait ByteSource {
    /// Copy bytes starting at `offset` into `buf` and return how many were
    /// copied. Reads at or past `total_size` copy nothing.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, Error>;

    fn total_size(&self) -> usize;
}

// ============ In-Memory Backend ============

/// Bytes that are already loaded, e.g. script args
pub struct SliceSource<'a> {
    data: &'a [u8],
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, Error> {
        if offset >= self.data.len() {
            return Ok(0);
        }
        let n = min(buf.len(), self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        Ok(n)
    }

    fn total_size(&self) -> usize {
        self.data.len()
    }
}

// ============ Transaction Backend ============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    CellData,
    Witness,
}

struct ReadCache {
    buf: [u8; READ_CACHE_SIZE],
    start: usize,
    len: usize,
}

/// Cell data or a witness of the running transaction, read on demand
/// through a small forward cache
pub struct TxDataSource<'t, T: Transaction> {
    tx: &'t T,
    kind: DataKind,
    index: usize,
    source: Source,
    total_size: usize,
    cache: RefCell<ReadCache>,
}

impl<'t, T: Transaction> TxDataSource<'t, T> {
    pub fn cell_data(tx: &'t T, index: usize, source: Source) -> Result<Self, Error> {
        Self::open(tx, DataKind::CellData, index, source)
    }

    pub fn witness(tx: &'t T, index: usize, source: Source) -> Result<Self, Error> {
        Self::open(tx, DataKind::Witness, index, source)
    }

    fn open(tx: &'t T, kind: DataKind, index: usize, source: Source) -> Result<Self, Error> {
        let mut data_source = Self {
            tx,
            kind,
            index,
            source,
            total_size: 0,
            cache: RefCell::new(ReadCache {
                buf: [0u8; READ_CACHE_SIZE],
                start: 0,
                len: 0,
            }),
        };
        // the first load both fills the cache and reports the full size
        let cache = data_source.cache.get_mut();
        let total = match kind {
            DataKind::CellData => tx.load_cell_data(&mut cache.buf, 0, index, source)?,
            DataKind::Witness => tx.load_witness(&mut cache.buf, 0, index, source)?,
        };
        cache.len = min(total, READ_CACHE_SIZE);
        data_source.total_size = total;
        Ok(data_source)
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }

    fn load(&self, buf: &mut [u8], offset: usize) -> Result<usize, Error> {
        let available = match self.kind {
            DataKind::CellData => self.tx.load_cell_data(buf, offset, self.index, self.source)?,
            DataKind::Witness => self.tx.load_witness(buf, offset, self.index, self.source)?,
        };
        Ok(min(available, buf.len()))
    }
}

impl<T: Transaction> ByteSource for TxDataSource<'_, T> {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, Error> {
        if offset >= self.total_size || buf.is_empty() {
            return Ok(0);
        }
        let want = min(buf.len(), self.total_size - offset);
        let mut cache = self.cache.borrow_mut();

        if offset >= cache.start && offset + want <= cache.start + cache.len {
            let from = offset - cache.start;
            buf[..want].copy_from_slice(&cache.buf[from..from + want]);
            return Ok(want);
        }

        if want > READ_CACHE_SIZE {
            // too large to be worth caching
            let loaded = self.load(&mut buf[..want], offset)?;
            if loaded < want {
                return Err(Error::Eof);
            }
            return Ok(want);
        }

        let loaded = self.load(&mut cache.buf, offset)?;
        cache.start = offset;
        cache.len = loaded;
        if loaded < want {
            return Err(Error::Eof);
        }
        buf[..want].copy_from_slice(&cache.buf[..want]);
        Ok(want)
    }

    fn total_size(&self) -> usize {
        self.total_size
    }
}

// ============ Cursor ============

#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    source: &'a dyn ByteSource,
    offset: usize,
    size: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a dyn ByteSource) -> Self {
        Self {
            source,
            offset: 0,
            size: source.total_size(),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Read from the start of the cursor into `buf`, returning bytes read
    pub fn read_at(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = min(buf.len(), self.size);
        self.source.read(self.offset, &mut buf[..n])
    }

    /// Fill `buf` completely or fail
    pub fn read_exact(&self, buf: &mut [u8]) -> Result<(), Error> {
        if self.size < buf.len() {
            return Err(Error::InvalidMolFormat);
        }
        if self.read_at(buf)? != buf.len() {
            return Err(Error::Eof);
        }
        Ok(())
    }

    /// The cursor's content, which must be exactly `N` bytes
    pub fn to_array<const N: usize>(&self) -> Result<[u8; N], Error> {
        if self.size != N {
            return Err(Error::InvalidMolFormat);
        }
        let mut out = [0u8; N];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn read_u8(&self) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// Little-endian molecule number at the start of the cursor
    pub fn unpack_number(&self) -> Result<usize, Error> {
        let mut b = [0u8; molecule::NUMBER_SIZE];
        self.read_exact(&mut b)?;
        Ok(molecule::unpack_number(&b) as usize)
    }

    pub fn number_at(&self, offset: usize) -> Result<usize, Error> {
        self.slice(offset, molecule::NUMBER_SIZE)?.unpack_number()
    }

    /// Sub-range `[offset, offset + size)` of this cursor
    pub fn slice(&self, offset: usize, size: usize) -> Result<Cursor<'a>, Error> {
        let end = offset.checked_add(size).ok_or(Error::InvalidMolFormat)?;
        if end > self.size {
            return Err(Error::InvalidMolFormat);
        }
        Ok(Cursor {
            source: self.source,
            offset: self.offset + offset,
            size,
        })
    }

    /// Everything after the first `n` bytes
    pub fn skip(&self, n: usize) -> Result<Cursor<'a>, Error> {
        if n > self.size {
            return Err(Error::InvalidMolFormat);
        }
        self.slice(n, self.size - n)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut out = vec![0u8; self.size];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    /// Feed the whole range to `f` in pieces of at most `chunk.len()` bytes
    pub fn for_each_chunk<F>(&self, chunk: &mut [u8], mut f: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]),
    {
        if chunk.is_empty() {
            return Err(Error::NotEnoughBuff);
        }
        let mut done = 0;
        while done < self.size {
            let n = min(chunk.len(), self.size - done);
            self.slice(done, n)?.read_exact(&mut chunk[..n])?;
            f(&chunk[..n]);
            done += n;
        }
        Ok(())
    }
}

impl core::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cursor")
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}

// ============ Tests ============
