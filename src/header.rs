//! Access to file headers, for debug listings of a directory

use crate::directory::Location;
use positioned_io::ReadAt;
use repr::SECTOR_SIZE;
use std::{fmt, io};

/// Fetches the header stored at a location
pub trait HeaderSource {
    type Header: fmt::Display;

    fn fetch(&self, location: Location) -> io::Result<Self::Header>;
}

impl<H: HeaderSource + ?Sized> HeaderSource for &H {
    type Header = H::Header;

    fn fetch(&self, location: Location) -> io::Result<Self::Header> {
        (**self).fetch(location)
    }
}

/// Reads headers as raw sectors of a disk image
#[derive(Debug)]
pub struct SectorHeaders<R> {
    disk: R,
}

impl<R: ReadAt> SectorHeaders<R> {
    pub fn new(disk: R) -> Self {
        Self { disk }
    }

    pub fn into_inner(self) -> R {
        self.disk
    }
}

impl<R: ReadAt> HeaderSource for SectorHeaders<R> {
    type Header = RawHeader;

    fn fetch(&self, location: Location) -> io::Result<RawHeader> {
        let mut data = [0; SECTOR_SIZE];
        self.disk.read_exact_at(location.offset(), &mut data)?;
        Ok(RawHeader { location, data })
    }
}

/// An uninterpreted header sector, displayed as a hex dump
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawHeader {
    pub location: Location,
    pub data: [u8; SECTOR_SIZE],
}

const BYTES_PER_LINE: usize = 16;

impl fmt::Display for RawHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Header at sector {}:", self.location.0)?;
        for (i, line) in self.data.chunks(BYTES_PER_LINE).enumerate() {
            write!(f, "\n    {:04x}:", i * BYTES_PER_LINE)?;
            for byte in line {
                write!(f, " {:02x}", byte)?;
            }
        }
        Ok(())
    }
}
